//! End-to-end confirmation flow against the in-memory store.
//!
//! Covers the full lifecycle:
//! 1. Propose → token handed out once, only its hash stored
//! 2. Confirm within the window → consumed, target returned
//! 3. Replay, wrong token, wrong phrase → proposal burned
//! 4. Aged-out proposal → Expired and removed
//! 5. Concurrent confirms → exactly one winner

use confirmgate::proposals::{
    hash_token, ConfirmError, ConfirmationProtocol, ManualClock, ProposalSettings,
    ProposalStore, CONFIRM_PHRASE,
};
use confirmgate::store::MemoryStore;
use std::sync::Arc;
use std::time::Duration;

const GUID: &str = "a1b2c3d4-e5f6-7890-abcd-ef1234567890";

fn protocol() -> ConfirmationProtocol<MemoryStore> {
    let proposals = ProposalStore::new(MemoryStore::new(), ProposalSettings::default());
    ConfirmationProtocol::new(proposals)
}

fn protocol_with_clock(window: Duration) -> (ConfirmationProtocol<MemoryStore>, ManualClock) {
    let clock = ManualClock::starting_now();
    let proposals = ProposalStore::with_clock(
        MemoryStore::new(),
        ProposalSettings::default().with_confirm_window(window),
        Arc::new(clock.clone()),
    );
    (ConfirmationProtocol::new(proposals), clock)
}

#[tokio::test]
async fn test_fresh_proposal_is_pending() {
    let protocol = protocol();
    let created = protocol.propose("contacts", GUID).await.unwrap();

    let stored = protocol
        .proposals()
        .read(&created.proposal_id)
        .await
        .unwrap()
        .expect("proposal should be stored");

    assert!(!stored.used);
    assert_eq!(stored.table, "contacts");
    assert_eq!(stored.record_id, GUID);
    assert_eq!(stored.confirm_phrase, CONFIRM_PHRASE);

    let now = protocol.proposals().now_millis();
    assert!(stored.age(now) <= Duration::from_secs(120));
    assert!(!stored.is_expired(now, Duration::from_secs(120)));

    // Only the hash is persisted
    let token = created.confirm_token.expose_secret();
    assert_ne!(stored.token_hash, token);
    assert_eq!(stored.token_hash, hash_token(token));
}

#[tokio::test]
async fn test_happy_path_then_replay() {
    let protocol = protocol();
    let created = protocol.propose("contacts", GUID).await.unwrap();
    assert_eq!(created.confirm_phrase, "CONFIRM DELETE");

    let token = created.confirm_token.expose_secret().to_string();

    let proposal = protocol
        .validate_and_consume(&created.proposal_id, &token, CONFIRM_PHRASE)
        .await
        .unwrap();
    assert_eq!(proposal.table, "contacts");
    assert_eq!(proposal.record_id, GUID);
    assert!(proposal.used);

    // Same arguments again
    let err = protocol
        .validate_and_consume(&created.proposal_id, &token, CONFIRM_PHRASE)
        .await
        .unwrap_err();
    assert!(matches!(err, ConfirmError::AlreadyUsed { .. }));
}

#[tokio::test]
async fn test_wrong_token_burns_proposal() {
    let protocol = protocol();
    let created = protocol.propose("contacts", GUID).await.unwrap();

    let err = protocol
        .validate_and_consume(&created.proposal_id, "wrong-token", CONFIRM_PHRASE)
        .await
        .unwrap_err();
    assert!(matches!(err, ConfirmError::TokenMismatch { .. }));

    let err = protocol
        .validate_and_consume(
            &created.proposal_id,
            created.confirm_token.expose_secret(),
            CONFIRM_PHRASE,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ConfirmError::AlreadyUsed { .. }));
}

#[tokio::test]
async fn test_wrong_phrase_burns_proposal() {
    let protocol = protocol();
    let created = protocol.propose("contacts", GUID).await.unwrap();
    let token = created.confirm_token.expose_secret().to_string();

    let err = protocol
        .validate_and_consume(&created.proposal_id, &token, "confirm delete")
        .await
        .unwrap_err();
    assert!(matches!(err, ConfirmError::PhraseMismatch { .. }));
    assert!(!err.to_string().contains(CONFIRM_PHRASE));

    let err = protocol
        .validate_and_consume(&created.proposal_id, &token, CONFIRM_PHRASE)
        .await
        .unwrap_err();
    assert!(matches!(err, ConfirmError::AlreadyUsed { .. }));
}

#[tokio::test]
async fn test_clock_past_window_expires_and_removes() {
    let (protocol, clock) = protocol_with_clock(Duration::from_secs(120));
    let created = protocol.propose("contacts", GUID).await.unwrap();

    clock.advance(Duration::from_secs(121));

    let err = protocol
        .validate_and_consume(
            &created.proposal_id,
            created.confirm_token.expose_secret(),
            CONFIRM_PHRASE,
        )
        .await
        .unwrap_err();
    match err {
        ConfirmError::Expired { age, ttl, .. } => {
            assert_eq!(age, Duration::from_secs(121));
            assert_eq!(ttl, Duration::from_secs(120));
        }
        other => panic!("expected Expired, got {:?}", other),
    }

    assert!(protocol
        .proposals()
        .read(&created.proposal_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_zero_window_expires() {
    let (protocol, clock) = protocol_with_clock(Duration::ZERO);
    let created = protocol.propose("contacts", GUID).await.unwrap();

    clock.advance(Duration::from_millis(1));

    let err = protocol
        .validate_and_consume(
            &created.proposal_id,
            created.confirm_token.expose_secret(),
            CONFIRM_PHRASE,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ConfirmError::Expired { .. }));
    assert!(protocol
        .proposals()
        .read(&created.proposal_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_zero_window_expires_without_clock_advance() {
    let (protocol, _clock) = protocol_with_clock(Duration::ZERO);
    let created = protocol.propose("contacts", GUID).await.unwrap();

    // Same millisecond as creation
    let err = protocol
        .validate_and_consume(
            &created.proposal_id,
            created.confirm_token.expose_secret(),
            CONFIRM_PHRASE,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ConfirmError::Expired { .. }));
    assert!(protocol
        .proposals()
        .read(&created.proposal_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_zero_window_immediate_confirm_on_system_clock() {
    let protocol = ConfirmationProtocol::new(ProposalStore::new(
        MemoryStore::new(),
        ProposalSettings::default().with_confirm_window(Duration::ZERO),
    ));

    for _ in 0..200 {
        let created = protocol.propose("contacts", GUID).await.unwrap();
        let err = protocol
            .validate_and_consume(
                &created.proposal_id,
                created.confirm_token.expose_secret(),
                CONFIRM_PHRASE,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ConfirmError::Expired { .. }));
        assert!(protocol
            .proposals()
            .read(&created.proposal_id)
            .await
            .unwrap()
            .is_none());
    }
}

#[tokio::test(start_paused = true)]
async fn test_store_ttl_evicts_record() {
    let protocol = protocol();
    let created = protocol.propose("contacts", GUID).await.unwrap();

    tokio::time::advance(Duration::from_secs(121)).await;

    // Evicted by the store before the defensive check can see it
    let err = protocol
        .validate_and_consume(
            &created.proposal_id,
            created.confirm_token.expose_secret(),
            CONFIRM_PHRASE,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ConfirmError::NotFound { .. }));
}

#[tokio::test]
async fn test_same_target_gets_distinct_proposals() {
    let protocol = protocol();
    let first = protocol.propose("contacts", GUID).await.unwrap();
    let second = protocol.propose("contacts", GUID).await.unwrap();

    assert_ne!(first.proposal_id, second.proposal_id);
    assert_ne!(
        first.confirm_token.expose_secret(),
        second.confirm_token.expose_secret()
    );

    // Consuming one leaves the other confirmable
    protocol
        .validate_and_consume(
            &first.proposal_id,
            first.confirm_token.expose_secret(),
            CONFIRM_PHRASE,
        )
        .await
        .unwrap();
    protocol
        .validate_and_consume(
            &second.proposal_id,
            second.confirm_token.expose_secret(),
            CONFIRM_PHRASE,
        )
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_confirms_single_winner() {
    const ATTEMPTS: usize = 32;

    let protocol = protocol();
    let created = protocol.propose("contacts", GUID).await.unwrap();
    let token = created.confirm_token.expose_secret().to_string();

    let handles: Vec<_> = (0..ATTEMPTS)
        .map(|_| {
            let protocol = protocol.clone();
            let id = created.proposal_id.clone();
            let token = token.clone();
            tokio::spawn(async move {
                protocol
                    .validate_and_consume(&id, &token, CONFIRM_PHRASE)
                    .await
            })
        })
        .collect();

    let results: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let already_used = results
        .iter()
        .filter(|r| matches!(r, Err(ConfirmError::AlreadyUsed { .. })))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(already_used, ATTEMPTS - 1);
}

#[tokio::test]
async fn test_unknown_proposal_not_found() {
    let protocol = protocol();
    let err = protocol
        .validate_and_consume(&"does-not-exist".into(), "tok", CONFIRM_PHRASE)
        .await
        .unwrap_err();

    assert!(matches!(err, ConfirmError::NotFound { .. }));
    assert!(err.to_string().contains("does-not-exist"));
}

#[tokio::test]
async fn test_store_outage_surfaces_and_recovers() {
    let store = MemoryStore::new();
    let protocol = ConfirmationProtocol::new(ProposalStore::new(
        store.clone(),
        ProposalSettings::default(),
    ));
    let created = protocol.propose("contacts", GUID).await.unwrap();

    store.set_offline(true);
    let err = protocol
        .validate_and_consume(
            &created.proposal_id,
            created.confirm_token.expose_secret(),
            CONFIRM_PHRASE,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ConfirmError::StoreUnavailable(_)));

    store.set_offline(false);
    protocol
        .validate_and_consume(
            &created.proposal_id,
            created.confirm_token.expose_secret(),
            CONFIRM_PHRASE,
        )
        .await
        .unwrap();
}
