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

//! Errors returned by the gateway and by lifecycle actions.
//!
//! The error types follow how the caller has to react:
//!
//! * [QueryError] is transient. Reads are simply repeated on the next refresh.
//! * [SubmissionError] is account level and never retried automatically.
//! * [ConfirmationError] may leave the outcome unknown. The transaction may still land.
//! * [Error::ReconciliationMismatch] means the chain reported success but the ledger state does
//!   not show the expected effect.

use std::time::Duration;

use kyc_crowdfund_core::{Balance, ContractError, TxHash, UnknownStatusCode};

/// Error of a side-effect free read.
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
pub enum QueryError {
    #[error("node is unreachable: {0}")]
    Unreachable(String),

    #[error("query {selector} timed out after {after:?}")]
    Timeout {
        selector: &'static str,
        after: Duration,
    },

    #[error("query {selector} reverted: {reason}")]
    Reverted {
        selector: &'static str,
        reason: ContractError,
    },

    #[error("query {selector} returned an unexpected {actual}")]
    UnexpectedResponse {
        selector: &'static str,
        actual: &'static str,
    },

    #[error(transparent)]
    UnknownStatusCode(#[from] UnknownStatusCode),
}

/// Error raised before a transaction reached the network.
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
pub enum SubmissionError {
    #[error("no account is connected")]
    NoAccount,

    #[error("signature request was rejected by the user")]
    UserRejected,

    #[error("insufficient funds: {required} required but {available} available")]
    InsufficientFunds {
        required: Balance,
        available: Balance,
    },

    #[error("network is unreachable: {0}")]
    Unreachable(String),
}

/// Error raised while waiting for a submitted transaction.
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
pub enum ConfirmationError {
    #[error("transaction {tx_hash} reverted: {reason}")]
    Reverted {
        tx_hash: TxHash,
        reason: ContractError,
    },

    #[error("transaction {tx_hash} was not confirmed within {after:?}; outcome unknown, re-check later")]
    Timeout { tx_hash: TxHash, after: Duration },

    #[error("lost track of transaction {tx_hash}: {cause}; outcome unknown, re-check later")]
    Lost { tx_hash: TxHash, cause: String },
}

impl ConfirmationError {
    pub fn tx_hash(&self) -> TxHash {
        match self {
            ConfirmationError::Reverted { tx_hash, .. }
            | ConfirmationError::Timeout { tx_hash, .. }
            | ConfirmationError::Lost { tx_hash, .. } => *tx_hash,
        }
    }

    /// True if the transaction may still be applied. Callers must not assume it was reverted.
    pub fn is_outcome_unknown(&self) -> bool {
        !matches!(self, ConfirmationError::Reverted { .. })
    }
}

/// Error returned by lifecycle actions and refreshes.
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Confirmation(#[from] ConfirmationError),

    /// A client-side gate refused the action. Nothing was submitted.
    #[error("{action} is not permitted: {reason}")]
    NotPermitted { action: &'static str, reason: String },

    #[error("{action} was confirmed in {tx_hash} but the ledger disagrees: expected {expected}, observed {observed}")]
    ReconciliationMismatch {
        action: &'static str,
        tx_hash: TxHash,
        expected: String,
        observed: String,
    },

    #[error("{action} was confirmed in {tx_hash} but its effect could not be read back")]
    VerificationUnavailable {
        action: &'static str,
        tx_hash: TxHash,
        #[source]
        source: QueryError,
    },
}
