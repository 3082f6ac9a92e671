//! Test the KYC workflow against the emulated contracts.

use std::time::Duration;

use kyc_crowdfund_client::*;
use kyc_crowdfund_test_utils::*;

#[async_std::test]
async fn submit_and_approve() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    let admin = admin_session(&emulator);
    let user = session(&emulator, funded_account(&emulator));
    let address = user.account().unwrap();

    let submitted = user.submit_kyc("Ada Lovelace", "AL-1815").await.unwrap();
    assert_eq!(
        submitted.events(),
        &[Event::KycSubmitted {
            user: address,
            full_name: "Ada Lovelace".into(),
            national_id: "AL-1815".into(),
        }]
    );

    let pending = admin.scheduler().kyc().refresh_pending().await.unwrap();
    assert_eq!(
        pending,
        vec![kyc::PendingRequest {
            address,
            full_name: "Ada Lovelace".into(),
            national_id: "AL-1815".into(),
        }]
    );

    admin.approve(address).await.unwrap();

    let pending = admin.scheduler().kyc().refresh_pending().await.unwrap();
    assert!(pending.is_empty());
    let status = user.scheduler().kyc().refresh_self(address).await.unwrap();
    assert_eq!(status, KycStatus::Approved);
    assert!(user.client().is_verified(address).await.unwrap());
}

#[async_std::test]
async fn reject_records_reason_and_allows_resubmission() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    let admin = admin_session(&emulator);
    let user = pending_user(&emulator).await;
    let address = user.account().unwrap();

    admin.reject(address, "document unreadable").await.unwrap();

    assert!(!user.client().is_verified(address).await.unwrap());
    let identity = admin.scheduler().kyc().identity(address).await.unwrap();
    assert_eq!(
        identity.status,
        KycStatus::Rejected {
            reason: Some("document unreadable".into())
        }
    );
    // The user session did not observe the rejection event.
    let identity = user.scheduler().kyc().identity(address).await.unwrap();
    assert_eq!(identity.status, KycStatus::Rejected { reason: None });

    user.submit_kyc("Ada Lovelace", "AL-1815-B").await.unwrap();
    let identity = user.client().get_kyc(address).await.unwrap();
    assert_eq!(identity.status, KycStatus::Pending);
    assert_eq!(identity.national_id, "AL-1815-B");
}

#[async_std::test]
async fn blank_reject_reason_is_replaced() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    let admin = admin_session(&emulator);
    let user = pending_user(&emulator).await;

    let reconciled = admin.reject(user.account().unwrap(), "  ").await.unwrap();
    assert_eq!(
        reconciled.events(),
        &[Event::KycRejected {
            user: user.account().unwrap(),
            reason: DEFAULT_REJECT_REASON.into(),
        }]
    );
}

#[async_std::test]
async fn resubmission_while_pending_is_not_permitted() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    let user = pending_user(&emulator).await;
    let submitted = emulator.submitted_count();

    let error = user.submit_kyc("Ada", "1").await.unwrap_err();
    match error {
        Error::NotPermitted { action, .. } => assert_eq!(action, "submitKyc"),
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(emulator.submitted_count(), submitted);
}

#[async_std::test]
async fn empty_fields_are_not_submitted() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    let user = session(&emulator, funded_account(&emulator));

    let error = user.submit_kyc("", "AL-1815").await.unwrap_err();
    assert!(matches!(error, Error::NotPermitted { .. }));
    assert_eq!(emulator.submitted_count(), 0);
}

#[async_std::test]
async fn rejected_is_never_verified() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    let admin = admin_session(&emulator);
    let user = verified_user(&emulator).await;
    let address = user.account().unwrap();

    // Approved identities cannot be rejected afterwards.
    let error = admin.reject(address, "changed my mind").await.unwrap_err();
    match error {
        Error::Confirmation(ConfirmationError::Reverted { reason, .. }) => {
            assert_eq!(reason, ContractError::NotPending)
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(user.client().is_verified(address).await.unwrap());

    let other = pending_user(&emulator).await;
    let other_address = other.account().unwrap();
    admin.reject(other_address, "no").await.unwrap();
    assert!(!other.client().is_verified(other_address).await.unwrap());
}

#[async_std::test]
async fn non_admin_review_is_reverted_by_registry() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    let user = pending_user(&emulator).await;
    let address = user.account().unwrap();

    let error = user.approve(address).await.unwrap_err();
    match error {
        Error::Confirmation(ConfirmationError::Reverted { reason, .. }) => {
            assert_eq!(reason, ContractError::NotAdmin)
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(
        user.client().get_kyc(address).await.unwrap().status,
        KycStatus::Pending
    );
}

#[async_std::test]
async fn refresh_pending_is_idempotent() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    let admin = admin_session(&emulator);
    for _ in 0..5 {
        pending_user(&emulator).await;
    }

    let first = admin.scheduler().kyc().refresh_pending().await.unwrap();
    let second = admin.scheduler().kyc().refresh_pending().await.unwrap();
    assert_eq!(first.len(), 5);
    assert_eq!(first, second);
}

#[async_std::test]
async fn refresh_pending_keeps_submission_order() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    let admin = admin_session(&emulator);
    let mut expected = Vec::new();
    for _ in 0..6 {
        expected.push(pending_user(&emulator).await.account().unwrap());
    }

    let pending = admin.scheduler().kyc().refresh_pending().await.unwrap();
    let addresses: Vec<Address> = pending.into_iter().map(|request| request.address).collect();
    assert_eq!(addresses, expected);
}

#[async_std::test]
async fn refresh_pending_drops_stale_entries() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    let admin = admin_session(&emulator);
    let approved = verified_user(&emulator).await.account().unwrap();
    let unreadable = pending_user(&emulator).await.account().unwrap();
    let waiting = pending_user(&emulator).await.account().unwrap();

    // The pending set was read before `approved` left it.
    emulator.override_pending(Some(vec![approved, unreadable, waiting, waiting]));
    emulator.fail_queries(move |query| *query == Query::GetKyc(unreadable));

    let pending = admin.scheduler().kyc().refresh_pending().await.unwrap();
    let addresses: Vec<Address> = pending.into_iter().map(|request| request.address).collect();
    assert_eq!(addresses, vec![waiting]);
}

#[async_std::test]
async fn refresh_pending_fails_if_pending_set_is_unreadable() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    let admin = admin_session(&emulator);
    pending_user(&emulator).await;

    emulator.fail_queries(|query| *query == Query::GetAllPending);
    let error = admin.scheduler().kyc().refresh_pending().await.unwrap_err();
    assert!(matches!(error, QueryError::Unreachable(_)));
}

#[async_std::test]
async fn is_admin_ignores_address_case() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    let user = session(&emulator, funded_account(&emulator));

    let upper = emulator.admin().to_string().to_uppercase().replacen("0X", "0x", 1);
    let admin: Address = upper.parse().unwrap();
    let kyc = user.scheduler().kyc();
    assert!(kyc.is_admin(admin).await.unwrap());
    assert!(!kyc.is_admin(user.account().unwrap()).await.unwrap());
}

#[async_std::test]
async fn admin_is_read_once() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    let user = session(&emulator, funded_account(&emulator));
    let kyc = user.scheduler().kyc();

    assert_eq!(kyc.admin().await.unwrap(), emulator.admin());
    emulator.fail_queries(|query| *query == Query::Admin);
    assert_eq!(kyc.admin().await.unwrap(), emulator.admin());
}

#[async_std::test]
async fn refresh_pending_bounds_concurrent_detail_reads() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    for _ in 0..10 {
        pending_user(&emulator).await;
    }
    let backend = InstrumentedBackend::new(emulator.clone());
    let config = test_config();
    let limit = config.pending_fetch_concurrency;
    let admin = Session::new(backend.clone(), Some(emulator.admin()), config);
    backend.delay_queries(
        |query| matches!(query, Query::GetKyc(_)),
        Duration::from_millis(20),
        None,
    );

    let pending = admin.scheduler().kyc().refresh_pending().await.unwrap();
    assert_eq!(pending.len(), 10);
    assert!(backend.max_in_flight() <= limit, "{} reads in flight", backend.max_in_flight());
    assert!(backend.max_in_flight() > 1, "detail reads were not concurrent");
}
