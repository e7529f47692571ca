//! The SHA-1 running hash that labels database state.
//!
//! After commit `k`, the database state is named by
//! `hash_k = SHA1(hash_{k-1} ++ query_k)` where `hash_0` is the empty
//! string and `query_k` is the exact concatenated write query of commit
//! `k`. Peers compare these labels to detect divergence, so the encoding
//! (lowercase hex over the UTF-8 bytes of parent-hash-then-query) is part
//! of the replication contract and must never change.

use std::fmt::Write;

use sha1::{Digest, Sha1};

/// Hash of the database state after applying `query` on top of the state
/// named by `parent`.
#[must_use]
pub fn chain_hash(parent: &str, query: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(parent.as_bytes());
    hasher.update(query.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// Fold a sequence of commit queries into the hash the chain ends on.
/// Starting point is the empty pre-commit state.
#[must_use]
pub fn recompute_chain<'a, I>(queries: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    queries
        .into_iter()
        .fold(String::new(), |parent, query| chain_hash(&parent, query))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    // Reference values computed with an independent SHA-1 implementation.
    const SHA1_EMPTY: &str = "da39a3ee5e6b4b0d3255bfef95601890afd80709";
    const SHA1_INSERT_1: &str = "1bdcad5893908b48a199bc0e19bdc3418cd7465e";
    const SHA1_CHAIN_2: &str = "cac62a296faae91dfff6aebce7da2ef6029c5f32";

    #[test]
    fn empty_chain_start() {
        assert_eq!(chain_hash("", ""), SHA1_EMPTY);
        assert_eq!(recompute_chain([]), "");
    }

    #[test]
    fn known_vectors() {
        let hash_1 = chain_hash("", "INSERT INTO t VALUES(1);");
        assert_eq!(hash_1, SHA1_INSERT_1);

        let hash_2 = chain_hash(&hash_1, "INSERT INTO t VALUES(2);");
        assert_eq!(hash_2, SHA1_CHAIN_2);

        assert_eq!(
            chain_hash(SHA1_EMPTY, "abc"),
            "c86adab6c72643087418004f15e2518ed845a676"
        );
    }

    #[test]
    fn recompute_matches_stepwise() {
        let queries = ["INSERT INTO t VALUES(1);", "INSERT INTO t VALUES(2);"];
        assert_eq!(recompute_chain(queries), SHA1_CHAIN_2);
    }

    #[test]
    fn output_shape() {
        let hash = chain_hash("parent", "query");
        assert_eq!(hash.len(), 40);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, hash.to_lowercase());
    }

    proptest! {
        #[test]
        fn recompute_is_a_left_fold(queries in proptest::collection::vec(".*", 0..8)) {
            let mut parent = String::new();
            for query in &queries {
                parent = chain_hash(&parent, query);
            }
            let refs: Vec<&str> = queries.iter().map(String::as_str).collect();
            prop_assert_eq!(recompute_chain(refs), parent);
        }

        #[test]
        fn chain_is_order_sensitive(a in "[a-z]{1,16}", b in "[a-z]{1,16}") {
            prop_assume!(a != b);
            prop_assert_ne!(recompute_chain([a.as_str(), b.as_str()]),
                            recompute_chain([b.as_str(), a.as_str()]));
        }
    }
}
