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

//! KYC state projector.
//!
//! Derives an account's verification status and the admin's review queue from registry reads.

use futures::stream::{self, StreamExt as _};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::interface::*;
use crate::Client;

/// An identity waiting for review, as shown in the admin queue.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PendingRequest {
    pub address: Address,
    pub full_name: String,
    pub national_id: String,
}

pub struct KycProjector {
    client: Client,
    /// The registry admin is fixed at deployment and read once.
    admin: Mutex<Option<Address>>,
    /// Rejection reasons are only observable through `KycRejected` events.
    rejection_reasons: Mutex<HashMap<Address, String>>,
}

impl KycProjector {
    pub fn new(client: Client) -> Self {
        KycProjector {
            client,
            admin: Mutex::new(None),
            rejection_reasons: Mutex::new(HashMap::new()),
        }
    }

    /// Verification status of `address`.
    pub async fn refresh_self(&self, address: Address) -> Result<KycStatus, QueryError> {
        Ok(self.identity(address).await?.status)
    }

    /// Identity of `address`, including the rejection reason if one was observed.
    pub async fn identity(&self, address: Address) -> Result<Identity, QueryError> {
        let mut identity = self.client.get_kyc(address).await?;
        if let KycStatus::Rejected { reason } = &mut identity.status {
            *reason = self
                .rejection_reasons
                .lock()
                .unwrap()
                .get(&address)
                .cloned();
        }
        Ok(identity)
    }

    /// Read the review queue.
    ///
    /// Details are fetched with bounded concurrency and the list is only returned once every
    /// entry is resolved. An address that left the pending set between the two reads, or whose
    /// details cannot be read, is dropped instead of failing the whole refresh.
    pub async fn refresh_pending(&self) -> Result<Vec<PendingRequest>, QueryError> {
        let mut seen = HashSet::new();
        let addresses: Vec<Address> = self
            .client
            .get_all_pending()
            .await?
            .into_iter()
            .filter(|address| seen.insert(*address))
            .collect();

        let client = &self.client;
        let details: Vec<(Address, Result<Identity, QueryError>)> = stream::iter(addresses)
            .map(|address| async move { (address, client.get_kyc(address).await) })
            .buffered(client.config().pending_fan_out())
            .collect()
            .await;

        Ok(details
            .into_iter()
            .filter_map(|(address, detail)| match detail {
                Ok(identity) if identity.status == KycStatus::Pending => Some(PendingRequest {
                    address,
                    full_name: identity.full_name,
                    national_id: identity.national_id,
                }),
                Ok(identity) => {
                    log::debug!(
                        "dropping {} from pending list: now {}",
                        address.short(),
                        identity.status
                    );
                    None
                }
                Err(error) => {
                    log::warn!(
                        "dropping {} from pending list: {}",
                        address.short(),
                        error
                    );
                    None
                }
            })
            .collect())
    }

    /// Registry admin address.
    pub async fn admin(&self) -> Result<Address, QueryError> {
        let cached = *self.admin.lock().unwrap();
        if let Some(admin) = cached {
            return Ok(admin);
        }
        let admin = self.client.admin().await?;
        *self.admin.lock().unwrap() = Some(admin);
        Ok(admin)
    }

    /// Whether `address` administers the registry.
    ///
    /// This only decides what a client offers. The registry enforces access itself.
    pub async fn is_admin(&self, address: Address) -> Result<bool, QueryError> {
        Ok(self.admin().await? == address)
    }

    /// Learn from the events of a confirmed transaction.
    pub fn note_events(&self, events: &[Event]) {
        let mut reasons = self.rejection_reasons.lock().unwrap();
        let registry_events = events
            .iter()
            .filter(|event| event.contract() == Contract::KycRegistry);
        for event in registry_events {
            match event {
                Event::KycRejected { user, reason } => {
                    reasons.insert(*user, reason.clone());
                }
                Event::KycSubmitted { user, .. } | Event::KycApproved { user, .. } => {
                    reasons.remove(user);
                }
                _ => {}
            }
        }
    }
}
