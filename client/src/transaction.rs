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

//! Provides [TransactionHandle] and the session [TransactionLog].
//!
//! Once a transaction is signed it cannot be cancelled. Its confirmation is therefore driven by a
//! detached task that records the final outcome in the [TransactionLog], whether or not anyone is
//! still waiting on the handle.

use futures::channel::oneshot;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::backend::PendingTransaction;
use crate::interface::*;

type Outcome = Result<TransactionIncluded, ConfirmationError>;

/// Opaque reference to a submitted transaction. Consumed by
/// [crate::Client::await_confirmation].
#[derive(Debug)]
pub struct TransactionHandle {
    tx_hash: TxHash,
    selector: &'static str,
    outcome: oneshot::Receiver<Outcome>,
}

impl TransactionHandle {
    pub fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    /// Name of the contract function the transaction calls.
    pub fn selector(&self) -> &'static str {
        self.selector
    }

    /// Wait at most `after` for the outcome.
    pub(crate) async fn wait(self, after: Duration) -> Outcome {
        let tx_hash = self.tx_hash;
        match async_std::future::timeout(after, self.outcome).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_canceled)) => Err(ConfirmationError::Lost {
                tx_hash,
                cause: "confirmation task stopped".into(),
            }),
            Err(_elapsed) => {
                log::warn!(
                    "{} ({}) not confirmed after {:?}, outcome unknown",
                    self.selector,
                    tx_hash,
                    after
                );
                Err(ConfirmationError::Timeout { tx_hash, after })
            }
        }
    }
}

/// Last known state of a transaction submitted in this session.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TransactionStatus {
    Pending,
    Confirmed { block_number: u64 },
    Reverted(ContractError),
    Lost(String),
}

impl TransactionStatus {
    fn from_outcome(outcome: &Outcome) -> Self {
        match outcome {
            Ok(included) => TransactionStatus::Confirmed {
                block_number: included.block_number,
            },
            Err(ConfirmationError::Reverted { reason, .. }) => {
                TransactionStatus::Reverted(reason.clone())
            }
            Err(error) => TransactionStatus::Lost(error.to_string()),
        }
    }
}

/// Outcomes of every transaction submitted through a [crate::Client].
#[derive(Clone, Default)]
pub struct TransactionLog {
    entries: Arc<Mutex<HashMap<TxHash, TransactionStatus>>>,
}

impl TransactionLog {
    pub fn status(&self, tx_hash: &TxHash) -> Option<TransactionStatus> {
        self.entries.lock().unwrap().get(tx_hash).cloned()
    }

    /// Transactions whose outcome is not known yet.
    pub fn pending(&self) -> Vec<TxHash> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, status)| **status == TransactionStatus::Pending)
            .map(|(tx_hash, _)| *tx_hash)
            .collect()
    }

    fn record(&self, tx_hash: TxHash, status: TransactionStatus) {
        self.entries.lock().unwrap().insert(tx_hash, status);
    }
}

/// Spawn the task that drives `pending` to its outcome and return a handle to it.
pub(crate) fn track(
    log: TransactionLog,
    selector: &'static str,
    pending: PendingTransaction,
) -> TransactionHandle {
    let PendingTransaction { tx_hash, included } = pending;
    let (sender, receiver) = oneshot::channel();
    log.record(tx_hash, TransactionStatus::Pending);

    async_std::task::spawn(async move {
        let outcome = included.await;
        match &outcome {
            Ok(included) => log::info!(
                "{} ({}) confirmed in block {}",
                selector,
                tx_hash,
                included.block_number
            ),
            Err(error) => log::warn!("{} failed: {}", selector, error),
        }
        log.record(tx_hash, TransactionStatus::from_outcome(&outcome));
        // Ignore errors: We don’t care if the receiver was dropped
        let _ = sender.send(outcome);
    });

    TransactionHandle {
        tx_hash,
        selector,
        outcome: receiver,
    }
}
