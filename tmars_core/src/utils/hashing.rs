//! Utility functions for getting hashes
use std::hash::{DefaultHasher, Hash, Hasher};

/// Hash a value with the std [`DefaultHasher`], formatted as lower case hexadecimal
///
/// Used to derive variable ids which can't collide with user supplied ids.
pub(crate) fn hash_as_hex_string<T: Hash + ?Sized>(t: &T) -> String {
    let mut s = DefaultHasher::new();
    t.hash(&mut s);
    format!("{:x}", s.finish())
}
