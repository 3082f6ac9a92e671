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

//! Client library that keeps a user session in sync with the KYC registry and crowdfunding
//! contracts.
//!
//! The chain is the only authority. This crate holds projections of it and drives writes through
//! a fixed lifecycle:
//!
//! * [Client] is the gateway to the contracts. It reads state, submits transactions and waits for
//!   their confirmation.
//! * [lifecycle::Controller] runs every state changing action through
//!   submit, confirm, verify and reconcile.
//! * [kyc::KycProjector] and [campaign::CampaignProjector] derive the client view from reads.
//! * [scheduler::Scheduler] decides when projections are refreshed and keeps the last snapshot.
//! * [Session] wires all of the above together for one connected account.
//!
//! [backend::Emulator] runs both contracts in memory. This is useful for developing and testing.

use std::sync::Arc;

pub mod backend;
pub mod campaign;
pub mod kyc;
pub mod lifecycle;
pub mod scheduler;
pub mod transaction;

mod config;
mod error;
mod interface;
mod session;

pub use crate::config::{Config, ConfigError};
pub use crate::interface::*;
pub use crate::session::{Session, DEFAULT_REJECT_REASON};
pub use crate::transaction::{TransactionHandle, TransactionLog, TransactionStatus};

/// Gateway to the two contracts on behalf of one (optionally) connected account.
///
/// Reads are bounded by [Config::query_timeout]. Writes are split into [Client::transact], which
/// returns once the transaction is signed and sent, and [Client::await_confirmation].
#[derive(Clone)]
pub struct Client {
    backend: Arc<dyn backend::Backend>,
    account: Option<Address>,
    config: Config,
    transactions: TransactionLog,
}

impl Client {
    pub fn new(
        backend: impl backend::Backend + 'static,
        account: Option<Address>,
        config: Config,
    ) -> Self {
        Client {
            backend: Arc::new(backend),
            account,
            config,
            transactions: TransactionLog::default(),
        }
    }

    /// Account that signs transactions. `None` if no wallet account is connected.
    pub fn account(&self) -> Option<Address> {
        self.account
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transactions(&self) -> &TransactionLog {
        &self.transactions
    }

    /// Run a read against the contracts.
    ///
    /// Fails with [QueryError::Timeout] if the node does not answer in time.
    pub async fn query(&self, query: Query) -> Result<QueryValue, QueryError> {
        let selector = query.selector();
        let after = self.config.query_timeout();
        log::trace!("querying {} {}", query.contract(), selector);
        async_std::future::timeout(after, self.backend.query(query))
            .await
            .map_err(|_| QueryError::Timeout { selector, after })?
    }

    pub async fn admin(&self) -> Result<Address, QueryError> {
        match self.query(Query::Admin).await? {
            QueryValue::Address(admin) => Ok(admin),
            other => Err(unexpected("admin", &other)),
        }
    }

    pub async fn is_verified(&self, user: Address) -> Result<bool, QueryError> {
        match self.query(Query::IsVerified(user)).await? {
            QueryValue::Bool(verified) => Ok(verified),
            other => Err(unexpected("isVerified", &other)),
        }
    }

    pub async fn get_kyc(&self, user: Address) -> Result<Identity, QueryError> {
        match self.query(Query::GetKyc(user)).await? {
            QueryValue::Kyc(record) => Ok(record.into_identity(user)?),
            other => Err(unexpected("getKyc", &other)),
        }
    }

    pub async fn get_all_pending(&self) -> Result<Vec<Address>, QueryError> {
        match self.query(Query::GetAllPending).await? {
            QueryValue::Addresses(addresses) => Ok(addresses),
            other => Err(unexpected("getAllPending", &other)),
        }
    }

    pub async fn get_campaign(&self, id: CampaignId) -> Result<Campaign, QueryError> {
        match self.query(Query::GetCampaign(id)).await? {
            QueryValue::Campaign(record) => Ok(record.into_campaign(id)?),
            other => Err(unexpected("getCampaign", &other)),
        }
    }

    pub async fn get_campaign_count(&self) -> Result<u64, QueryError> {
        match self.query(Query::GetCampaignCount).await? {
            QueryValue::Count(count) => Ok(count),
            other => Err(unexpected("getCampaignCount", &other)),
        }
    }

    /// Sign and submit `call` from the connected account.
    ///
    /// ```no_run
    /// # use kyc_crowdfund_client::*;
    /// # async fn example(client: Client, campaign: CampaignId) -> Result<(), Error> {
    /// // Fails if no account is connected, the user declines to sign, or the account cannot
    /// // pay for the transaction.
    /// let handle = client.transact(message::Withdraw { campaign }).await?;
    ///
    /// // Fails if the transaction reverted or if it was not confirmed in time. In the latter case
    /// // the transaction may still be applied later.
    /// let included = client.await_confirmation(handle).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn transact(
        &self,
        call: impl Into<Call>,
    ) -> Result<TransactionHandle, SubmissionError> {
        let call = call.into();
        let author = self.account.ok_or(SubmissionError::NoAccount)?;
        let selector = call.selector();
        log::debug!(
            "submitting {} {} from {}",
            call.contract(),
            selector,
            author.short()
        );
        let pending = self.backend.submit(author, call).await?;
        Ok(transaction::track(
            self.transactions.clone(),
            selector,
            pending,
        ))
    }

    /// Wait for a submitted transaction for at most [Config::confirmation_timeout].
    ///
    /// This is the only point where a session blocks on the chain. Giving up here does not stop
    /// tracking: the eventual outcome still lands in [Client::transactions].
    pub async fn await_confirmation(
        &self,
        handle: TransactionHandle,
    ) -> Result<TransactionIncluded, ConfirmationError> {
        handle.wait(self.config.confirmation_timeout()).await
    }
}

fn unexpected(selector: &'static str, value: &QueryValue) -> QueryError {
    QueryError::UnexpectedResponse {
        selector,
        actual: value.kind(),
    }
}
