// KYC Crowdfund Client
// Copyright (C) 2019 Monadic GmbH <radicle@monadic.xyz>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License version 3 as
// published by the Free Software Foundation.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Transaction lifecycle controller.
//!
//! Every state changing action runs through
//!
//! ```text
//! Idle -> Submitting -> AwaitingConfirmation -> Verifying -> Reconciled
//!   \          \                \                   \
//!    `----------`----------------`-------------------`---> Failed
//! ```
//!
//! * `Idle` checks the client-side gates on fresh reads. Nothing is submitted if they fail.
//! * `Submitting` signs and sends the transaction. Submission errors are never retried.
//! * `AwaitingConfirmation` waits for the outcome. A timeout leaves the outcome unknown.
//! * `Verifying` reads back the expected effect where one can be checked.
//! * `Reconciled` refreshes the affected projection and reports success.
//!
//! Admin reviews that are already in effect skip submission: `Idle -> Verifying -> Reconciled`.
//!
//! Actions on the same entity are queued behind each other. Actions on different entities run
//! independently.

use futures::lock::Mutex as AsyncMutex;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::interface::*;
use crate::scheduler::{EntityClass, Scheduler};
use crate::Client;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum LifecycleState {
    Idle,
    Submitting,
    AwaitingConfirmation,
    Verifying,
    Reconciled,
    Failed,
}

impl LifecycleState {
    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Reconciled | LifecycleState::Failed)
    }

    fn can_advance_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        match (self, next) {
            (Idle, Submitting)
            | (Idle, Verifying)
            | (Submitting, AwaitingConfirmation)
            | (AwaitingConfirmation, Verifying)
            | (Verifying, Reconciled) => true,
            (state, Failed) => !state.is_terminal(),
            _ => false,
        }
    }
}

/// The ledger entity an action mutates. Actions on the same key are serialized.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EntityKey {
    Identity(Address),
    Campaign(CampaignId),
    /// Campaign creation appends to the campaign list.
    CampaignList,
}

impl EntityKey {
    fn of(call: &Call, author: Address) -> Self {
        match call {
            Call::SubmitKyc(_) => EntityKey::Identity(author),
            Call::Approve(message) => EntityKey::Identity(message.user),
            Call::Reject(message) => EntityKey::Identity(message.user),
            Call::CreateCampaign(_) => EntityKey::CampaignList,
            Call::Contribute(message) => EntityKey::Campaign(message.campaign),
            Call::Withdraw(message) => EntityKey::Campaign(message.campaign),
        }
    }

    pub fn class(self) -> EntityClass {
        match self {
            EntityKey::Identity(_) => EntityClass::Kyc,
            EntityKey::Campaign(_) | EntityKey::CampaignList => EntityClass::Campaigns,
        }
    }
}

/// A lifecycle state change, as published to observers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Transition {
    pub action: &'static str,
    pub entity: EntityKey,
    pub from: LifecycleState,
    pub to: LifecycleState,
}

pub type Observer = Arc<dyn Fn(&Transition) + Send + Sync>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Completion {
    /// The transaction was confirmed and its effect verified.
    Applied(TransactionIncluded),
    /// The intended state was already in effect. Nothing was submitted.
    AlreadyApplied,
}

/// Successful outcome of [Controller::execute].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Reconciled {
    pub action: &'static str,
    pub completion: Completion,
    /// Every state the action went through, starting with `Idle`.
    pub trace: Vec<LifecycleState>,
}

impl Reconciled {
    pub fn tx_hash(&self) -> Option<TxHash> {
        match &self.completion {
            Completion::Applied(included) => Some(included.tx_hash),
            Completion::AlreadyApplied => None,
        }
    }

    pub fn events(&self) -> &[Event] {
        match &self.completion {
            Completion::Applied(included) => &included.events,
            Completion::AlreadyApplied => &[],
        }
    }
}

/// Result of the client-side gates.
enum Gate {
    Submit { campaign_count: Option<u64> },
    AlreadyApplied,
}

/// Why the effect of a confirmed transaction could not be confirmed.
enum VerifyFailure {
    Mismatch { expected: String, observed: String },
    Unavailable(QueryError),
}

impl From<QueryError> for VerifyFailure {
    fn from(error: QueryError) -> Self {
        VerifyFailure::Unavailable(error)
    }
}

pub struct Controller {
    client: Client,
    scheduler: Arc<Scheduler>,
    locks: Mutex<HashMap<EntityKey, Arc<AsyncMutex<()>>>>,
    observers: Mutex<Vec<Observer>>,
}

impl Controller {
    pub fn new(client: Client, scheduler: Arc<Scheduler>) -> Self {
        Controller {
            client,
            scheduler,
            locks: Mutex::new(HashMap::new()),
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Publish every state transition to `observer`.
    pub fn observe(&self, observer: Observer) {
        self.observers.lock().unwrap().push(observer);
    }

    /// Drive `call` through the lifecycle.
    ///
    /// Without a connected account the action is not attributed to any entity. It fails with
    /// [SubmissionError::NoAccount] before `Idle` and observers are not notified.
    pub async fn execute(&self, call: impl Into<Call>) -> Result<Reconciled, Error> {
        let call = call.into();
        let author = self.client.account().ok_or(SubmissionError::NoAccount)?;
        let entity = EntityKey::of(&call, author);

        let lock = self.entity_lock(entity);
        let guard = lock.lock().await;
        let result = self.execute_locked(entity, author, call).await;
        drop(guard);
        self.release_entity_lock(entity, lock);
        result
    }

    async fn execute_locked(
        &self,
        entity: EntityKey,
        author: Address,
        call: Call,
    ) -> Result<Reconciled, Error> {
        let action = call.selector();
        let mut run = Run {
            action,
            entity,
            trace: vec![LifecycleState::Idle],
            observers: self.observers.lock().unwrap().clone(),
        };
        match self.drive(&mut run, author, call).await {
            Ok(completion) => {
                run.advance(LifecycleState::Reconciled);
                let events: &[Event] = match &completion {
                    Completion::Applied(included) => included.events.as_slice(),
                    Completion::AlreadyApplied => &[],
                };
                self.scheduler.on_reconciled(entity.class(), events).await;
                Ok(Reconciled {
                    action,
                    completion,
                    trace: run.trace,
                })
            }
            Err(error) => {
                log::warn!("{} on {:?} failed: {}", action, entity, error);
                run.advance(LifecycleState::Failed);
                Err(error)
            }
        }
    }

    async fn drive(&self, run: &mut Run, author: Address, call: Call) -> Result<Completion, Error> {
        let campaign_count = match self.gate(author, &call).await? {
            Gate::AlreadyApplied => {
                log::info!("{} on {:?} is already in effect", run.action, run.entity);
                run.advance(LifecycleState::Verifying);
                return Ok(Completion::AlreadyApplied);
            }
            Gate::Submit { campaign_count } => campaign_count,
        };

        run.advance(LifecycleState::Submitting);
        let handle = self.client.transact(call.clone()).await?;
        let tx_hash = handle.tx_hash();

        run.advance(LifecycleState::AwaitingConfirmation);
        let included = self.client.await_confirmation(handle).await?;

        run.advance(LifecycleState::Verifying);
        match self.verify(author, &call, campaign_count).await {
            Ok(()) => Ok(Completion::Applied(included)),
            Err(VerifyFailure::Mismatch { expected, observed }) => {
                Err(Error::ReconciliationMismatch {
                    action: run.action,
                    tx_hash,
                    expected,
                    observed,
                })
            }
            Err(VerifyFailure::Unavailable(source)) => Err(Error::VerificationUnavailable {
                action: run.action,
                tx_hash,
                source,
            }),
        }
    }

    /// Client-side gates. These mirror the contract rules so that doomed transactions are not
    /// submitted. The contracts still enforce their rules independently.
    async fn gate(&self, author: Address, call: &Call) -> Result<Gate, Error> {
        let action = call.selector();
        let refuse = |reason: String| Err(Error::NotPermitted { action, reason });
        match call {
            Call::SubmitKyc(message) => {
                if message.full_name.trim().is_empty() || message.national_id.trim().is_empty() {
                    return refuse("full name and national id are required".into());
                }
                let status = self.client.get_kyc(author).await?.status;
                if !status.accepts_submission() {
                    return refuse(format!("identity is already {}", status));
                }
            }
            Call::Approve(message) => {
                if self.client.get_kyc(message.user).await?.status == KycStatus::Approved {
                    return Ok(Gate::AlreadyApplied);
                }
            }
            Call::Reject(message) => {
                if self.client.get_kyc(message.user).await?.status.is_rejected() {
                    return Ok(Gate::AlreadyApplied);
                }
            }
            Call::CreateCampaign(message) => {
                if message.goal == 0 {
                    return refuse("goal must be greater than zero".into());
                }
                if !self.client.is_verified(author).await? {
                    return refuse("identity is not verified".into());
                }
                let count = self.client.get_campaign_count().await?;
                return Ok(Gate::Submit {
                    campaign_count: Some(count),
                });
            }
            Call::Contribute(message) => {
                if message.amount == 0 {
                    return refuse("amount must be greater than zero".into());
                }
                let campaign = self.client.get_campaign(message.campaign).await?;
                if !campaign.accepts_contributions() {
                    return refuse(format!("campaign {} is {}", campaign.id, campaign.status));
                }
            }
            Call::Withdraw(message) => {
                let campaign = self.client.get_campaign(message.campaign).await?;
                if campaign.status != CampaignStatus::Completed {
                    return refuse(format!("campaign {} is {}", campaign.id, campaign.status));
                }
                if campaign.creator != author {
                    return refuse(format!("only {} may withdraw", campaign.creator.short()));
                }
            }
        }
        Ok(Gate::Submit {
            campaign_count: None,
        })
    }

    /// Read back the effect of a confirmed transaction.
    ///
    /// Contributions are not checked: other accounts contribute concurrently, so no read can tell
    /// this contribution apart.
    async fn verify(
        &self,
        author: Address,
        call: &Call,
        campaign_count: Option<u64>,
    ) -> Result<(), VerifyFailure> {
        match call {
            Call::SubmitKyc(message) => {
                let identity = self.client.get_kyc(author).await?;
                if identity.status == KycStatus::Unsubmitted
                    || identity.full_name != message.full_name
                    || identity.national_id != message.national_id
                {
                    return mismatch(
                        format!("submitted details of {}", message.full_name),
                        format!("{} details of {}", identity.status, identity.full_name),
                    );
                }
            }
            Call::Approve(message) => {
                let verified = self.client.is_verified(message.user).await?;
                let status = self.client.get_kyc(message.user).await?.status;
                if !verified || status != KycStatus::Approved {
                    return mismatch(
                        "approved and verified".into(),
                        format!("{} (verified: {})", status, verified),
                    );
                }
            }
            Call::Reject(message) => {
                let status = self.client.get_kyc(message.user).await?.status;
                if !status.is_rejected() {
                    return mismatch("rejected".into(), status.to_string());
                }
            }
            Call::CreateCampaign(_) => {
                let before = campaign_count.unwrap_or(0);
                let count = self.client.get_campaign_count().await?;
                if count <= before {
                    return mismatch(
                        format!("more than {} campaigns", before),
                        format!("{} campaigns", count),
                    );
                }
            }
            Call::Contribute(_) => {}
            Call::Withdraw(message) => {
                let campaign = self.client.get_campaign(message.campaign).await?;
                if campaign.status != CampaignStatus::Withdrawn {
                    return mismatch(
                        CampaignStatus::Withdrawn.to_string(),
                        campaign.status.to_string(),
                    );
                }
            }
        }
        Ok(())
    }

    fn entity_lock(&self, entity: EntityKey) -> Arc<AsyncMutex<()>> {
        self.locks
            .lock()
            .unwrap()
            .entry(entity)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Forget the lock of `entity` unless another action holds or waits for it.
    fn release_entity_lock(&self, entity: EntityKey, lock: Arc<AsyncMutex<()>>) {
        let mut locks = self.locks.lock().unwrap();
        // One reference is owned by the map, the other one is `lock`.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&entity);
        }
    }
}

fn mismatch(expected: String, observed: String) -> Result<(), VerifyFailure> {
    Err(VerifyFailure::Mismatch { expected, observed })
}

/// State of one action while it is driven.
struct Run {
    action: &'static str,
    entity: EntityKey,
    trace: Vec<LifecycleState>,
    observers: Vec<Observer>,
}

impl Run {
    fn advance(&mut self, to: LifecycleState) {
        let from = self.current();
        debug_assert!(
            from.can_advance_to(to),
            "illegal lifecycle transition {:?} -> {:?}",
            from,
            to
        );
        log::debug!("{} on {:?}: {:?} -> {:?}", self.action, self.entity, from, to);
        self.trace.push(to);
        let transition = Transition {
            action: self.action,
            entity: self.entity,
            from,
            to,
        };
        for observer in &self.observers {
            observer(&transition);
        }
    }

    fn current(&self) -> LifecycleState {
        self.trace
            .last()
            .copied()
            .unwrap_or(LifecycleState::Idle)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use LifecycleState::*;

    #[test]
    fn transitions() {
        assert!(Idle.can_advance_to(Submitting));
        assert!(Idle.can_advance_to(Verifying));
        assert!(Submitting.can_advance_to(AwaitingConfirmation));
        assert!(AwaitingConfirmation.can_advance_to(Verifying));
        assert!(Verifying.can_advance_to(Reconciled));
        assert!(Idle.can_advance_to(Failed));
        assert!(AwaitingConfirmation.can_advance_to(Failed));

        assert!(!Idle.can_advance_to(Reconciled));
        assert!(!Submitting.can_advance_to(Verifying));
        assert!(!Reconciled.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(Submitting));
    }

    #[async_std::test]
    async fn entity_locks_are_released() {
        let admin = Address::from_bytes([9u8; 20]);
        let user = Address::from_bytes([3u8; 20]);
        let client = Client::new(
            crate::backend::Emulator::new(admin),
            Some(user),
            crate::Config::default(),
        );
        let scheduler = Arc::new(Scheduler::new(client.clone()));
        let controller = Controller::new(client, scheduler);
        let submit = || message::SubmitKyc {
            full_name: "Ada".into(),
            national_id: "1815".into(),
        };

        let (first, second) = futures::future::join(
            controller.execute(submit()),
            controller.execute(submit()),
        )
        .await;
        first.unwrap();
        assert!(matches!(second, Err(Error::NotPermitted { .. })));
        assert!(controller.locks.lock().unwrap().is_empty());

        let error = controller.execute(submit()).await.unwrap_err();
        assert!(matches!(error, Error::NotPermitted { .. }));
        assert!(controller.locks.lock().unwrap().is_empty());
    }

    #[test]
    fn entity_keys() {
        let author = Address::from_bytes([1u8; 20]);
        let user = Address::from_bytes([2u8; 20]);

        let approve: Call = message::Approve { user }.into();
        assert_eq!(EntityKey::of(&approve, author), EntityKey::Identity(user));

        let submit: Call = message::SubmitKyc {
            full_name: "Ada".into(),
            national_id: "1".into(),
        }
        .into();
        assert_eq!(EntityKey::of(&submit, author), EntityKey::Identity(author));

        let withdraw: Call = message::Withdraw {
            campaign: CampaignId(4),
        }
        .into();
        let key = EntityKey::of(&withdraw, author);
        assert_eq!(key, EntityKey::Campaign(CampaignId(4)));
        assert_eq!(key.class(), EntityClass::Campaigns);
    }
}
