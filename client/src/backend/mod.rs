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

//! Define trait for client backends and provide the emulator implementation.
//!
//! A [Backend] is the raw capability supplied by the wallet connection: a read-only query channel
//! and a write channel that submits transactions on behalf of an account. Everything above it in
//! this crate only talks to the ledger through this trait.

use futures::future::BoxFuture;

use crate::interface::*;

mod emulator;

pub use emulator::Emulator;

/// Indicator that a transaction has been confirmed and applied.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransactionIncluded {
    pub tx_hash: TxHash,
    /// Number of the block the transaction is included in.
    pub block_number: u64,
    /// Events emitted by the transaction.
    pub events: Vec<Event>,
}

/// A transaction that was accepted for submission but not yet confirmed.
pub struct PendingTransaction {
    pub tx_hash: TxHash,
    /// Resolves once the transaction is finalized. Backends do not apply a timeout.
    pub included: BoxFuture<'static, Result<TransactionIncluded, ConfirmationError>>,
}

/// Backend for talking to the contracts.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// Sign and submit `call` as a transaction from `author`.
    ///
    /// Returns as soon as the transaction has been handed to the network.
    async fn submit(
        &self,
        author: Address,
        call: Call,
    ) -> Result<PendingTransaction, SubmissionError>;

    /// Read a value from the contract state.
    async fn query(&self, query: Query) -> Result<QueryValue, QueryError>;
}
