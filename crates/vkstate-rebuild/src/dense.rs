//! Unpacking of captured `u32`-keyed arrays.

use vkstate_api::{DenseMap, ModelError};
use vkstate_core::RebuildError;

/// Values of `map` in key order. The keys must be exactly `0..len`.
pub fn unpack<T: Clone>(map: &DenseMap<T>) -> Result<Vec<T>, RebuildError> {
    unpack_with(map, T::clone)
}

/// Like [`unpack`], converting each element with `f`.
pub fn unpack_with<T, U>(map: &DenseMap<T>, f: impl Fn(&T) -> U) -> Result<Vec<U>, RebuildError> {
    let mut out = Vec::with_capacity(map.len());
    for (expected, (key, value)) in map.iter().enumerate() {
        if *key as usize != expected {
            return Err(ModelError::SparseDenseMap {
                missing: expected as u32,
                len: map.len(),
            }
            .into());
        }
        out.push(f(value));
    }
    Ok(out)
}
