//! Tests for error classification and handle allocation.

use vkstate_api::handle::{Handle, HandleKind, VkBuffer, VkDevice};
use vkstate_api::{BlobHash, ModelError};
use vkstate_core::{HandleAllocator, RebuildError};

#[test]
fn test_fatal_classification() {
    assert!(RebuildError::UnsupportedVariant("surface".into()).is_fatal());
    assert!(RebuildError::InvariantViolation("x".into()).is_fatal());
    assert!(RebuildError::Model(ModelError::UnknownFormat(12345)).is_fatal());

    assert!(!RebuildError::BadRequest("x".into()).is_fatal());
    assert!(!RebuildError::MissingBlob(BlobHash::of(b"gone")).is_fatal());
    assert!(!RebuildError::EmptyScratchTask.is_fatal());
    assert!(!RebuildError::NoEligibleQueue {
        flags: 1,
        device: VkDevice(3)
    }
    .is_fatal());
}

#[test]
fn test_dangling_reference() {
    match RebuildError::dangling(VkBuffer(0x42)) {
        RebuildError::DanglingReference { kind, handle } => {
            assert_eq!(kind, HandleKind::Buffer);
            assert_eq!(handle, 0x42);
        }
        other => panic!("expected DanglingReference, got {:?}", other),
    }
}

#[test]
fn test_model_error_converts() {
    let err: RebuildError = ModelError::UnobservedRead { addr: 16, size: 4 }.into();
    match err {
        RebuildError::Model(ModelError::UnobservedRead { addr, size }) => {
            assert_eq!((addr, size), (16, 4));
        }
        other => panic!("expected Model, got {:?}", other),
    }
}

#[test]
fn test_allocator_starts_above_captured() {
    let alloc = HandleAllocator::above(100);
    assert_eq!(alloc.peek(), 101);
    let a: VkBuffer = alloc.alloc();
    let b: VkDevice = alloc.alloc();
    assert_eq!(a.raw(), 101);
    assert_eq!(b.raw(), 102);
    assert_eq!(alloc.peek(), 103);
}

#[test]
fn test_allocator_never_returns_null() {
    let alloc = HandleAllocator::default();
    assert_eq!(alloc.alloc_raw(), 1);
    assert!(!HandleAllocator::above(0).alloc::<VkBuffer>().is_null());
}
