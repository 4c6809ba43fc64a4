use core::hash::Hash;
use std::hash::Hasher;

#[cfg(feature = "std-hash")]
pub mod default {
    pub use std::collections::hash_map::DefaultHasher;

    #[inline]
    pub fn new() -> DefaultHasher {
        DefaultHasher::new()
    }
}

#[cfg(not(feature = "std-hash"))]
pub mod default {
    pub use ahash::AHasher as DefaultHasher;

    #[inline]
    pub fn new() -> DefaultHasher {
        DefaultHasher::default()
    }
}

/// convenience: hash a single value with whichever default is active
#[inline]
pub fn hash_one<T: Hash + ?Sized>(v: &T) -> u64 {
    let mut h = default::new();
    v.hash(&mut h);
    h.finish()
}

/// Content equality through the active hasher.
///
/// Used where two values are compared structurally but the comparison must
/// not depend on how they were built up (sets and maps hash in key order).
#[inline]
pub fn content_eq<T: Hash + ?Sized>(a: &T, b: &T) -> bool {
    hash_one(a) == hash_one(b)
}
