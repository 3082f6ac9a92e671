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

//! Reconciliation scheduler.
//!
//! Projections are refreshed on three triggers only: the initial load, a reconciled transaction
//! that affects the projection, and an explicit user request. There is no polling. Between
//! triggers the last snapshot is served together with its age.
//!
//! Refreshes of the same class run one at a time, so a refresh that started before an action was
//! reconciled never replaces the snapshot taken after it.

use futures::lock::Mutex as AsyncMutex;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::campaign::{CampaignProjector, CampaignView};
use crate::interface::*;
use crate::kyc::{KycProjector, PendingRequest};
use crate::Client;

/// Group of projections refreshed together.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EntityClass {
    Kyc,
    Campaigns,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RefreshTrigger {
    InitialLoad,
    Reconciled(EntityClass),
    Manual,
}

/// A projection as of its last successful refresh.
///
/// `refreshed_at` is the instant the reads of that refresh started.
#[derive(Clone, Debug)]
pub struct Snapshot<T> {
    pub value: T,
    pub trigger: RefreshTrigger,
    pub refreshed_at: Instant,
}

impl<T> Snapshot<T> {
    fn new(value: T, trigger: RefreshTrigger, refreshed_at: Instant) -> Self {
        Snapshot {
            value,
            trigger,
            refreshed_at,
        }
    }

    pub fn age(&self) -> Duration {
        self.refreshed_at.elapsed()
    }

    pub fn is_stale(&self, tolerance: Duration) -> bool {
        self.age() > tolerance
    }
}

/// KYC projection for the session account.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KycView {
    pub admin: Address,
    /// Whether the session account is the registry admin.
    pub is_admin: bool,
    /// `None` if no account is connected.
    pub identity: Option<Identity>,
    /// Review queue. Only read for the admin.
    pub pending: Option<Vec<PendingRequest>>,
}

#[derive(Default)]
struct Snapshots {
    kyc: Option<Snapshot<KycView>>,
    campaigns: Option<Snapshot<Vec<CampaignView>>>,
}

/// Store `snapshot` unless `slot` holds one whose reads started later.
fn replace<T>(slot: &mut Option<Snapshot<T>>, snapshot: Snapshot<T>) {
    match slot {
        Some(current) if current.refreshed_at > snapshot.refreshed_at => {
            log::debug!("discarding refresh superseded by a later one");
        }
        _ => *slot = Some(snapshot),
    }
}

pub struct Scheduler {
    account: Option<Address>,
    kyc: KycProjector,
    campaigns: CampaignProjector,
    staleness_tolerance: Duration,
    snapshots: Mutex<Snapshots>,
    kyc_refresh: AsyncMutex<()>,
    campaigns_refresh: AsyncMutex<()>,
}

impl Scheduler {
    pub fn new(client: Client) -> Self {
        Scheduler {
            account: client.account(),
            staleness_tolerance: client.config().staleness_tolerance(),
            kyc: KycProjector::new(client.clone()),
            campaigns: CampaignProjector::new(client),
            snapshots: Mutex::new(Snapshots::default()),
            kyc_refresh: AsyncMutex::new(()),
            campaigns_refresh: AsyncMutex::new(()),
        }
    }

    pub fn kyc(&self) -> &KycProjector {
        &self.kyc
    }

    pub fn campaigns(&self) -> &CampaignProjector {
        &self.campaigns
    }

    /// Refresh every projection. Both are attempted even if the first one fails.
    pub async fn initial_load(&self) -> Result<(), QueryError> {
        let kyc = self.refresh(EntityClass::Kyc, RefreshTrigger::InitialLoad).await;
        let campaigns = self
            .refresh(EntityClass::Campaigns, RefreshTrigger::InitialLoad)
            .await;
        kyc.and(campaigns)
    }

    /// Refresh one projection. On error the previous snapshot is kept.
    ///
    /// Waits for a refresh of the same class that is already running.
    pub async fn refresh(
        &self,
        class: EntityClass,
        trigger: RefreshTrigger,
    ) -> Result<(), QueryError> {
        match class {
            EntityClass::Kyc => {
                let _running = self.kyc_refresh.lock().await;
                log::debug!("refreshing {:?} ({:?})", class, trigger);
                let started = Instant::now();
                let view = self.read_kyc().await?;
                let snapshot = Snapshot::new(view, trigger, started);
                replace(&mut self.snapshots.lock().unwrap().kyc, snapshot);
            }
            EntityClass::Campaigns => {
                let _running = self.campaigns_refresh.lock().await;
                log::debug!("refreshing {:?} ({:?})", class, trigger);
                let started = Instant::now();
                let views = self.campaigns.views(self.account.as_ref()).await?;
                let snapshot = Snapshot::new(views, trigger, started);
                replace(&mut self.snapshots.lock().unwrap().campaigns, snapshot);
            }
        }
        Ok(())
    }

    /// Called once a transaction affecting `class` is reconciled.
    ///
    /// A failed refresh is logged and not reported. The next trigger reads again.
    pub async fn on_reconciled(&self, class: EntityClass, events: &[Event]) {
        self.kyc.note_events(events);
        if let Err(error) = self
            .refresh(class, RefreshTrigger::Reconciled(class))
            .await
        {
            log::warn!("refresh of {:?} after reconciliation failed: {}", class, error);
        }
    }

    pub fn kyc_snapshot(&self) -> Option<Snapshot<KycView>> {
        self.snapshots.lock().unwrap().kyc.clone()
    }

    pub fn campaigns_snapshot(&self) -> Option<Snapshot<Vec<CampaignView>>> {
        self.snapshots.lock().unwrap().campaigns.clone()
    }

    /// True if `class` was never loaded or its snapshot is older than the configured tolerance.
    pub fn is_stale(&self, class: EntityClass) -> bool {
        let snapshots = self.snapshots.lock().unwrap();
        let refreshed_at = match class {
            EntityClass::Kyc => snapshots.kyc.as_ref().map(|s| s.refreshed_at),
            EntityClass::Campaigns => snapshots.campaigns.as_ref().map(|s| s.refreshed_at),
        };
        refreshed_at.map_or(true, |at| at.elapsed() > self.staleness_tolerance)
    }

    async fn read_kyc(&self) -> Result<KycView, QueryError> {
        let admin = self.kyc.admin().await?;
        let is_admin = self.account == Some(admin);
        let identity = match self.account {
            Some(account) => Some(self.kyc.identity(account).await?),
            None => None,
        };
        let pending = if is_admin {
            Some(self.kyc.refresh_pending().await?)
        } else {
            None
        };
        Ok(KycView {
            admin,
            is_admin,
            identity,
            pending,
        })
    }
}
