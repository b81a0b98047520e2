//! Property-based tests for proposal records and tokens

use super::record::{hash_token, token_fingerprint, Proposal, ProposalId, FINGERPRINT_LEN};
use proptest::prelude::*;
use std::time::Duration;

proptest! {
    /// Property: the stored hash never equals the plaintext token
    #[test]
    fn token_hash_never_equals_token(token in ".{0,128}") {
        prop_assert_ne!(hash_token(&token), token);
    }

    /// Property: hashing is deterministic and always 64 lowercase hex chars
    #[test]
    fn token_hash_is_stable_hex(token in ".{0,128}") {
        let h1 = hash_token(&token);
        let h2 = hash_token(&token);
        prop_assert_eq!(&h1, &h2);
        prop_assert_eq!(h1.len(), 64);
        prop_assert!(h1.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    /// Property: the fingerprint is a strict prefix of the hash
    #[test]
    fn fingerprint_is_hash_prefix(token in ".{0,128}") {
        let hash = hash_token(&token);
        let fp = token_fingerprint(&hash);
        prop_assert_eq!(fp.len(), FINGERPRINT_LEN);
        prop_assert!(hash.starts_with(&fp));
    }

    /// Property: field encoding preserves every proposal, including opaque
    /// identifiers with arbitrary content
    #[test]
    fn field_encoding_preserves_proposal(
        table in ".{0,64}",
        record_id in ".{0,64}",
        created_at in any::<u64>(),
        used in any::<bool>(),
    ) {
        let proposal = Proposal {
            proposal_id: ProposalId::generate(),
            table,
            record_id,
            token_hash: hash_token("t"),
            confirm_phrase: "CONFIRM DELETE".to_string(),
            created_at,
            used,
        };
        let decoded = Proposal::from_fields("k", &proposal.to_fields()).unwrap();
        prop_assert_eq!(decoded, proposal);
    }

    /// Property: a proposal is expired exactly when its age exceeds the window
    #[test]
    fn expiry_matches_age(
        created_at in 0u64..1_000_000_000,
        elapsed in 0u64..1_000_000,
        window_ms in 0u64..1_000_000,
    ) {
        let proposal = Proposal {
            proposal_id: ProposalId::from("p"),
            table: "t".to_string(),
            record_id: "r".to_string(),
            token_hash: hash_token("t"),
            confirm_phrase: "CONFIRM DELETE".to_string(),
            created_at,
            used: false,
        };
        let window = Duration::from_millis(window_ms);
        prop_assert_eq!(
            proposal.is_expired(created_at + elapsed, window),
            window_ms == 0 || elapsed > window_ms
        );
    }
}
