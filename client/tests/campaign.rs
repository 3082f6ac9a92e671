//! Test campaign creation, funding and withdrawal against the emulated contracts.

use kyc_crowdfund_client::*;
use kyc_crowdfund_test_utils::*;

#[async_std::test]
async fn create_campaign() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    let creator = verified_user(&emulator).await;

    let reconciled = creator
        .create_campaign("Water wells", "Drill two wells", 1_000)
        .await
        .unwrap();
    assert_eq!(
        reconciled.events(),
        &[Event::CampaignCreated {
            id: CampaignId(0),
            creator: creator.account().unwrap(),
            title: "Water wells".into(),
            goal: 1_000,
        }]
    );

    let campaign = creator.client().get_campaign(CampaignId(0)).await.unwrap();
    assert_eq!(campaign.title, "Water wells");
    assert_eq!(campaign.description, "Drill two wells");
    assert_eq!(campaign.raised, 0);
    assert_eq!(campaign.status, CampaignStatus::Active);
}

#[async_std::test]
async fn unverified_creator_is_not_permitted() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    let user = pending_user(&emulator).await;
    let submitted = emulator.submitted_count();

    let error = user.create_campaign("Title", "", 100).await.unwrap_err();
    assert!(matches!(error, Error::NotPermitted { action: "createCampaign", .. }));
    assert_eq!(emulator.submitted_count(), submitted);
}

#[async_std::test]
async fn zero_goal_is_not_permitted() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    let creator = verified_user(&emulator).await;
    let submitted = emulator.submitted_count();

    let error = creator.create_campaign("Title", "", 0).await.unwrap_err();
    assert!(matches!(error, Error::NotPermitted { .. }));
    assert_eq!(emulator.submitted_count(), submitted);
}

#[async_std::test]
async fn contributions_complete_campaign() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    let creator = verified_user(&emulator).await;
    let id = kyc_crowdfund_test_utils::create_campaign(&creator, 100).await;
    let backer = session(&emulator, funded_account(&emulator));

    backer.contribute(id, 40).await.unwrap();
    let campaign = backer.client().get_campaign(id).await.unwrap();
    assert_eq!(campaign.raised, 40);
    assert_eq!(campaign.status, CampaignStatus::Active);

    let reconciled = backer.contribute(id, 60).await.unwrap();
    assert_eq!(
        reconciled.events(),
        &[Event::Contributed {
            id,
            from: backer.account().unwrap(),
            amount: 60,
            total_raised: 100,
        }]
    );
    let campaign = backer.client().get_campaign(id).await.unwrap();
    assert_eq!(campaign.status, CampaignStatus::Completed);
    assert_eq!(
        emulator.balance(&backer.account().unwrap()),
        INITIAL_BALANCE - 100
    );
}

#[async_std::test]
async fn contribution_to_inactive_campaign_is_gated() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    let creator = verified_user(&emulator).await;
    let id = kyc_crowdfund_test_utils::create_campaign(&creator, 10).await;
    let backer = session(&emulator, funded_account(&emulator));
    backer.contribute(id, 10).await.unwrap();
    let submitted = emulator.submitted_count();

    let error = backer.contribute(id, 5).await.unwrap_err();
    match error {
        Error::NotPermitted { action, reason } => {
            assert_eq!(action, "contribute");
            assert!(reason.contains("completed"), "reason: {}", reason);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(emulator.submitted_count(), submitted);
}

#[async_std::test]
async fn zero_contribution_is_gated() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    let creator = verified_user(&emulator).await;
    let id = kyc_crowdfund_test_utils::create_campaign(&creator, 10).await;
    let submitted = emulator.submitted_count();

    let error = creator.contribute(id, 0).await.unwrap_err();
    assert!(matches!(error, Error::NotPermitted { .. }));
    assert_eq!(emulator.submitted_count(), submitted);
}

#[async_std::test]
async fn contribution_beyond_balance_fails_submission() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    let creator = verified_user(&emulator).await;
    let id = kyc_crowdfund_test_utils::create_campaign(&creator, INITIAL_BALANCE * 10).await;
    let backer = session(&emulator, funded_account(&emulator));

    let error = backer.contribute(id, INITIAL_BALANCE + 1).await.unwrap_err();
    assert_eq!(
        error,
        Error::Submission(SubmissionError::InsufficientFunds {
            required: INITIAL_BALANCE + 1,
            available: INITIAL_BALANCE,
        })
    );
}

#[async_std::test]
async fn creator_withdraws_once() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    let creator = verified_user(&emulator).await;
    let creator_address = creator.account().unwrap();
    let id = kyc_crowdfund_test_utils::create_campaign(&creator, 50).await;
    let backer = session(&emulator, funded_account(&emulator));
    backer.contribute(id, 70).await.unwrap();

    let reconciled = creator.withdraw(id).await.unwrap();
    assert_eq!(
        reconciled.events(),
        &[Event::Withdrawn {
            id,
            to: creator_address,
            amount: 70,
        }]
    );
    let campaign = creator.client().get_campaign(id).await.unwrap();
    assert_eq!(campaign.status, CampaignStatus::Withdrawn);
    assert_eq!(emulator.balance(&creator_address), INITIAL_BALANCE + 70);

    // The client-side gate refuses a second withdrawal.
    let error = creator.withdraw(id).await.unwrap_err();
    assert!(matches!(error, Error::NotPermitted { action: "withdraw", .. }));

    // Without the gate the ledger still refuses to pay twice.
    let handle = creator
        .client()
        .transact(message::Withdraw { campaign: id })
        .await
        .unwrap();
    let error = creator.client().await_confirmation(handle).await.unwrap_err();
    match error {
        ConfirmationError::Reverted { reason, .. } => {
            assert_eq!(reason, ContractError::AlreadyWithdrawn)
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(emulator.balance(&creator_address), INITIAL_BALANCE + 70);
}

#[async_std::test]
async fn only_creator_withdraws() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    let creator = verified_user(&emulator).await;
    let id = kyc_crowdfund_test_utils::create_campaign(&creator, 10).await;
    let backer = session(&emulator, funded_account(&emulator));
    backer.contribute(id, 10).await.unwrap();

    let error = backer.withdraw(id).await.unwrap_err();
    assert!(matches!(error, Error::NotPermitted { .. }));
    let campaign = backer.client().get_campaign(id).await.unwrap();
    assert_eq!(campaign.status, CampaignStatus::Completed);
}

#[async_std::test]
async fn active_campaign_cannot_be_withdrawn() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    let creator = verified_user(&emulator).await;
    let id = kyc_crowdfund_test_utils::create_campaign(&creator, 10).await;

    let error = creator.withdraw(id).await.unwrap_err();
    assert!(matches!(error, Error::NotPermitted { .. }));
}

#[async_std::test]
async fn refresh_all_lists_campaigns_in_id_order() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    let creator = verified_user(&emulator).await;
    for goal in &[10, 20, 30] {
        kyc_crowdfund_test_utils::create_campaign(&creator, *goal).await;
    }

    let campaigns = creator.scheduler().campaigns().refresh_all().await.unwrap();
    let ids: Vec<CampaignId> = campaigns.iter().map(|campaign| campaign.id).collect();
    let goals: Vec<Balance> = campaigns.iter().map(|campaign| campaign.goal).collect();
    assert_eq!(ids, vec![CampaignId(0), CampaignId(1), CampaignId(2)]);
    assert_eq!(goals, vec![10, 20, 30]);
}

#[async_std::test]
async fn views_derive_progress_and_actions() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    let creator = verified_user(&emulator).await;
    let backer = session(&emulator, funded_account(&emulator));
    let half = kyc_crowdfund_test_utils::create_campaign(&creator, 100).await;
    let full = kyc_crowdfund_test_utils::create_campaign(&creator, 30).await;
    backer.contribute(half, 50).await.unwrap();
    backer.contribute(full, 30).await.unwrap();

    let creator_address = creator.account().unwrap();
    let views = creator
        .scheduler()
        .campaigns()
        .views(Some(&creator_address))
        .await
        .unwrap();
    assert_eq!(views[0].progress.percent, Some(50));
    assert_eq!(views[0].progress.bar, 50);
    assert!(views[0].can_contribute);
    assert!(!views[0].can_withdraw);
    assert_eq!(views[1].progress.percent, Some(100));
    assert!(!views[1].can_contribute);
    assert!(views[1].can_withdraw);

    let backer_address = backer.account().unwrap();
    let views = backer
        .scheduler()
        .campaigns()
        .views(Some(&backer_address))
        .await
        .unwrap();
    assert!(!views[1].can_withdraw);
}

#[async_std::test]
async fn unknown_status_code_fails_loudly() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    let creator = verified_user(&emulator).await;
    let id = kyc_crowdfund_test_utils::create_campaign(&creator, 10).await;
    emulator.set_campaign_status_code(id, 9);

    let error = creator.client().get_campaign(id).await.unwrap_err();
    assert_eq!(
        error,
        QueryError::UnknownStatusCode(UnknownStatusCode {
            entity: "campaign",
            code: 9,
        })
    );
    assert!(creator.scheduler().campaigns().refresh_all().await.is_err());

    let error = creator.contribute(id, 1).await.unwrap_err();
    assert!(matches!(error, Error::Query(QueryError::UnknownStatusCode(_))));
}

#[async_std::test]
async fn unknown_campaign_read_reverts() {
    let _ = env_logger::try_init();
    let emulator = new_emulator();
    let user = session(&emulator, funded_account(&emulator));

    let error = user.client().get_campaign(CampaignId(3)).await.unwrap_err();
    match error {
        QueryError::Reverted { reason, .. } => assert_eq!(reason, ContractError::UnknownCampaign),
        other => panic!("unexpected error {:?}", other),
    }
}
