//! Tests for test-harness logging setup.

use vkstate_common::logging::init_test_logging;

#[test]
fn test_test_logging_can_be_installed_repeatedly() {
    init_test_logging();
    init_test_logging();
    tracing::warn!(target: "vkstate_common", "logged after repeated setup");
}
