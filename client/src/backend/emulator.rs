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

//! Provides [Emulator] backend to run both contracts in memory.

use futures::channel::oneshot;
use futures::future::{self, FutureExt as _};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::backend::{self, PendingTransaction};
use crate::interface::*;

/// [backend::Backend] implementation that keeps the contract state in memory and applies the
/// contract rules natively.
///
/// Clones share the same ledger, so several sessions (for example an admin and a user) can act on
/// it concurrently.
///
/// # Differences with a real node
///
/// * Every confirmed transaction gets its own block.
/// * Contract rules are checked when the transaction is applied. A violation is reported as a
///   revert on confirmation, never as a submission error.
/// * Faults can be injected to exercise error handling, see the `set_*` and `*_next_*` methods.
#[derive(Clone)]
pub struct Emulator {
    state: Arc<Mutex<EmulatorState>>,
}

/// Mutable state of the emulator.
struct EmulatorState {
    ledger: Ledger,
    block_number: u64,
    submitted: usize,
    held: Vec<HeldTransaction>,
    faults: Faults,
}

/// Transaction waiting for [Emulator::release_held].
struct HeldTransaction {
    tx_hash: TxHash,
    author: Address,
    call: Call,
    sender: oneshot::Sender<Result<TransactionIncluded, ConfirmationError>>,
}

#[derive(Default)]
struct Faults {
    unreachable: bool,
    stalled: bool,
    reject_next_signature: bool,
    hold_confirmations: bool,
    drop_next_effects: bool,
    failing_queries: Vec<Box<dyn Fn(&Query) -> bool + Send>>,
    pending_override: Option<Vec<Address>>,
}

/// Contract storage.
struct Ledger {
    admin: Address,
    identities: HashMap<Address, KycRecord>,
    /// Addresses with a pending review, in submission order.
    pending: Vec<Address>,
    campaigns: Vec<CampaignRecord>,
    balances: HashMap<Address, Balance>,
}

impl Emulator {
    /// Creates an emulator with empty contracts administered by `admin`.
    pub fn new(admin: Address) -> Self {
        Emulator {
            state: Arc::new(Mutex::new(EmulatorState {
                ledger: Ledger {
                    admin,
                    identities: HashMap::new(),
                    pending: Vec::new(),
                    campaigns: Vec::new(),
                    balances: HashMap::new(),
                },
                block_number: 0,
                submitted: 0,
                held: Vec::new(),
                faults: Faults::default(),
            })),
        }
    }

    pub fn admin(&self) -> Address {
        self.state.lock().unwrap().ledger.admin
    }

    /// Credit `amount` to the native balance of `account`.
    pub fn fund(&self, account: Address, amount: Balance) {
        let mut state = self.state.lock().unwrap();
        let balance = state.ledger.balances.entry(account).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    pub fn balance(&self, account: &Address) -> Balance {
        self.state.lock().unwrap().ledger.balance(account)
    }

    /// Number of transactions accepted for submission so far.
    pub fn submitted_count(&self) -> usize {
        self.state.lock().unwrap().submitted
    }

    pub fn block_number(&self) -> u64 {
        self.state.lock().unwrap().block_number
    }

    /// Fail every query and submission with an unreachable error.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unwrap().faults.unreachable = unreachable;
    }

    /// Never answer queries.
    pub fn set_stalled(&self, stalled: bool) {
        self.state.lock().unwrap().faults.stalled = stalled;
    }

    /// The next signature request is declined by the user.
    pub fn reject_next_signature(&self) {
        self.state.lock().unwrap().faults.reject_next_signature = true;
    }

    /// Keep submitted transactions unconfirmed until [Emulator::release_held] is called.
    pub fn set_hold_confirmations(&self, hold: bool) {
        self.state.lock().unwrap().faults.hold_confirmations = hold;
    }

    /// Apply all held transactions in submission order. Returns how many were released.
    pub fn release_held(&self) -> usize {
        let mut state = self.state.lock().unwrap();
        let held = std::mem::take(&mut state.held);
        let count = held.len();
        for tx in held {
            let outcome = state.execute(tx.tx_hash, tx.author, tx.call);
            // Ignore errors: the submitter may have stopped waiting.
            let _ = tx.sender.send(outcome);
        }
        count
    }

    /// The next transaction is confirmed without emitting events or changing any state.
    pub fn drop_next_effects(&self) {
        self.state.lock().unwrap().faults.drop_next_effects = true;
    }

    /// Fail every query matching `predicate` with an unreachable error.
    pub fn fail_queries(&self, predicate: impl Fn(&Query) -> bool + Send + 'static) {
        self.state
            .lock()
            .unwrap()
            .faults
            .failing_queries
            .push(Box::new(predicate));
    }

    pub fn clear_query_failures(&self) {
        self.state.lock().unwrap().faults.failing_queries.clear();
    }

    /// Answer `getAllPending` with `addresses` instead of the actual pending set.
    pub fn override_pending(&self, addresses: Option<Vec<Address>>) {
        self.state.lock().unwrap().faults.pending_override = addresses;
    }

    /// Overwrite the raw status code stored for a campaign.
    pub fn set_campaign_status_code(&self, id: CampaignId, code: u8) {
        let mut state = self.state.lock().unwrap();
        if let Some(campaign) = state.ledger.campaigns.get_mut(id.0 as usize) {
            campaign.status = code;
        }
    }

    fn read(&self, query: &Query) -> Result<QueryValue, QueryError> {
        let state = self.state.lock().unwrap();
        if state.faults.unreachable {
            return Err(QueryError::Unreachable("emulated node is offline".into()));
        }
        if state.faults.failing_queries.iter().any(|fails| fails(query)) {
            return Err(QueryError::Unreachable(format!(
                "injected failure for {}",
                query.selector()
            )));
        }
        let ledger = &state.ledger;
        let value = match query {
            Query::Admin => QueryValue::Address(ledger.admin),
            Query::IsVerified(user) => QueryValue::Bool(
                ledger.identity(user).status == KycStatus::Approved.code(),
            ),
            Query::GetKyc(user) => QueryValue::Kyc(ledger.identity(user)),
            Query::GetAllPending => QueryValue::Addresses(
                state
                    .faults
                    .pending_override
                    .clone()
                    .unwrap_or_else(|| ledger.pending.clone()),
            ),
            Query::GetCampaign(id) => match ledger.campaigns.get(id.0 as usize) {
                Some(campaign) => QueryValue::Campaign(campaign.clone()),
                None => {
                    return Err(QueryError::Reverted {
                        selector: query.selector(),
                        reason: ContractError::UnknownCampaign,
                    })
                }
            },
            Query::GetCampaignCount => QueryValue::Count(ledger.campaigns.len() as u64),
        };
        Ok(value)
    }
}

#[async_trait::async_trait]
impl backend::Backend for Emulator {
    async fn submit(
        &self,
        author: Address,
        call: Call,
    ) -> Result<PendingTransaction, SubmissionError> {
        let mut state = self.state.lock().unwrap();
        if state.faults.unreachable {
            return Err(SubmissionError::Unreachable(
                "emulated node is offline".into(),
            ));
        }
        if std::mem::take(&mut state.faults.reject_next_signature) {
            return Err(SubmissionError::UserRejected);
        }
        let required = call.value();
        let available = state.ledger.balance(&author);
        if required > available {
            return Err(SubmissionError::InsufficientFunds {
                required,
                available,
            });
        }

        let tx_hash = TxHash(rand::random());
        state.submitted += 1;
        log::debug!(
            "emulator accepted {} {} from {} as {}",
            call.contract(),
            call.selector(),
            author.short(),
            tx_hash
        );

        if state.faults.hold_confirmations {
            let (sender, receiver) = oneshot::channel();
            state.held.push(HeldTransaction {
                tx_hash,
                author,
                call,
                sender,
            });
            let included = receiver.map(move |outcome| {
                outcome.unwrap_or_else(|_| {
                    Err(ConfirmationError::Lost {
                        tx_hash,
                        cause: "emulator dropped the transaction".into(),
                    })
                })
            });
            return Ok(PendingTransaction {
                tx_hash,
                included: included.boxed(),
            });
        }

        let outcome = state.execute(tx_hash, author, call);
        Ok(PendingTransaction {
            tx_hash,
            included: future::ready(outcome).boxed(),
        })
    }

    async fn query(&self, query: Query) -> Result<QueryValue, QueryError> {
        let stalled = self.state.lock().unwrap().faults.stalled;
        if stalled {
            future::pending::<()>().await;
        }
        self.read(&query)
    }
}

impl EmulatorState {
    /// Apply a transaction and produce its confirmation outcome.
    fn execute(
        &mut self,
        tx_hash: TxHash,
        author: Address,
        call: Call,
    ) -> Result<TransactionIncluded, ConfirmationError> {
        if std::mem::take(&mut self.faults.drop_next_effects) {
            self.block_number += 1;
            return Ok(TransactionIncluded {
                tx_hash,
                block_number: self.block_number,
                events: Vec::new(),
            });
        }
        match self.ledger.apply(author, call) {
            Ok(events) => {
                self.block_number += 1;
                Ok(TransactionIncluded {
                    tx_hash,
                    block_number: self.block_number,
                    events,
                })
            }
            Err(reason) => Err(ConfirmationError::Reverted { tx_hash, reason }),
        }
    }
}

impl Ledger {
    fn balance(&self, account: &Address) -> Balance {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn identity(&self, user: &Address) -> KycRecord {
        self.identities.get(user).cloned().unwrap_or(KycRecord {
            full_name: String::new(),
            national_id: String::new(),
            status: KycStatus::Unsubmitted.code(),
        })
    }

    /// Check the contract rules for `call` and apply it. Nothing is changed on error.
    fn apply(&mut self, author: Address, call: Call) -> Result<Vec<Event>, ContractError> {
        match call {
            Call::SubmitKyc(message) => {
                if message.full_name.trim().is_empty() || message.national_id.trim().is_empty() {
                    return Err(ContractError::EmptyField);
                }
                let status = self.identity(&author).status;
                if status != KycStatus::Unsubmitted.code()
                    && status != (KycStatus::Rejected { reason: None }).code()
                {
                    return Err(ContractError::AlreadySubmitted);
                }
                self.identities.insert(
                    author,
                    KycRecord {
                        full_name: message.full_name.clone(),
                        national_id: message.national_id.clone(),
                        status: KycStatus::Pending.code(),
                    },
                );
                if !self.pending.contains(&author) {
                    self.pending.push(author);
                }
                Ok(vec![Event::KycSubmitted {
                    user: author,
                    full_name: message.full_name,
                    national_id: message.national_id,
                }])
            }
            Call::Approve(message) => {
                let record = self.review(author, &message.user, KycStatus::Approved)?;
                Ok(vec![Event::KycApproved {
                    user: message.user,
                    full_name: record.full_name,
                }])
            }
            Call::Reject(message) => {
                self.review(author, &message.user, KycStatus::Rejected { reason: None })?;
                Ok(vec![Event::KycRejected {
                    user: message.user,
                    reason: message.reason,
                }])
            }
            Call::CreateCampaign(message) => {
                if self.identity(&author).status != KycStatus::Approved.code() {
                    return Err(ContractError::NotVerified);
                }
                if message.goal == 0 {
                    return Err(ContractError::InvalidGoal);
                }
                let id = CampaignId(self.campaigns.len() as u64);
                self.campaigns.push(CampaignRecord {
                    title: message.title.clone(),
                    description: message.description,
                    creator: author,
                    goal: message.goal,
                    raised: 0,
                    status: CampaignStatus::Active.code(),
                });
                Ok(vec![Event::CampaignCreated {
                    id,
                    creator: author,
                    title: message.title,
                    goal: message.goal,
                }])
            }
            Call::Contribute(message) => {
                let available = self.balance(&author);
                let campaign = self
                    .campaigns
                    .get_mut(message.campaign.0 as usize)
                    .ok_or(ContractError::UnknownCampaign)?;
                if campaign.status != CampaignStatus::Active.code() {
                    return Err(ContractError::CampaignNotActive);
                }
                if message.amount == 0 {
                    return Err(ContractError::ZeroContribution);
                }
                if available < message.amount {
                    return Err(ContractError::InsufficientBalance);
                }
                campaign.raised = campaign.raised.saturating_add(message.amount);
                if campaign.raised >= campaign.goal {
                    campaign.status = CampaignStatus::Completed.code();
                }
                let total_raised = campaign.raised;
                self.balances.insert(author, available - message.amount);
                Ok(vec![Event::Contributed {
                    id: message.campaign,
                    from: author,
                    amount: message.amount,
                    total_raised,
                }])
            }
            Call::Withdraw(message) => {
                let campaign = self
                    .campaigns
                    .get_mut(message.campaign.0 as usize)
                    .ok_or(ContractError::UnknownCampaign)?;
                if campaign.creator != author {
                    return Err(ContractError::NotCreator);
                }
                if campaign.status == CampaignStatus::Withdrawn.code() {
                    return Err(ContractError::AlreadyWithdrawn);
                }
                if campaign.status != CampaignStatus::Completed.code() {
                    return Err(ContractError::NotCompleted);
                }
                if campaign.raised == 0 {
                    return Err(ContractError::NothingToWithdraw);
                }
                campaign.status = CampaignStatus::Withdrawn.code();
                let amount = campaign.raised;
                let balance = self.balances.entry(author).or_insert(0);
                *balance = balance.saturating_add(amount);
                Ok(vec![Event::Withdrawn {
                    id: message.campaign,
                    to: author,
                    amount,
                }])
            }
        }
    }

    /// Move a pending identity to `outcome`. Admin only.
    fn review(
        &mut self,
        author: Address,
        user: &Address,
        outcome: KycStatus,
    ) -> Result<KycRecord, ContractError> {
        if author != self.admin {
            return Err(ContractError::NotAdmin);
        }
        let record = self
            .identities
            .get_mut(user)
            .filter(|record| record.status == KycStatus::Pending.code())
            .ok_or(ContractError::NotPending)?;
        record.status = outcome.code();
        let record = record.clone();
        self.pending.retain(|pending| pending != user);
        Ok(record)
    }
}
