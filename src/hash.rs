//! Hash map selection for the sparse tick, bitmap, and position stores.
//!
//! The engine only ever keys by small integers and addresses, so a fast
//! non-cryptographic hasher is the default. Exactly one of the hasher
//! features should be enabled; conflicting or absent selections fall
//! back to the standard library map.

#[cfg(all(
    feature = "rustc-hash",
    not(any(feature = "ahash", feature = "std-hash"))
))]
pub type FastMap<K, V> = rustc_hash::FxHashMap<K, V>;

#[cfg(all(
    feature = "ahash",
    not(any(feature = "rustc-hash", feature = "std-hash"))
))]
pub type FastMap<K, V> = ahash::AHashMap<K, V>;

#[cfg(not(any(
    all(
        feature = "rustc-hash",
        not(any(feature = "ahash", feature = "std-hash"))
    ),
    all(
        feature = "ahash",
        not(any(feature = "rustc-hash", feature = "std-hash"))
    ),
)))]
pub type FastMap<K, V> = std::collections::HashMap<K, V>;
