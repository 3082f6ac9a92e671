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

//! A user session: one connected account, its projections and the actions it can take.

use std::sync::Arc;

use crate::backend::Backend;
use crate::campaign::CampaignView;
use crate::interface::*;
use crate::lifecycle::{Controller, Observer, Reconciled, Transition};
use crate::scheduler::{EntityClass, KycView, RefreshTrigger, Scheduler, Snapshot};
use crate::{Client, Config};

/// Reason recorded when an admin rejects without giving one.
pub const DEFAULT_REJECT_REASON: &str = "Rejected by admin";

pub struct Session {
    client: Client,
    scheduler: Arc<Scheduler>,
    controller: Controller,
}

impl Session {
    pub fn new(backend: impl Backend + 'static, account: Option<Address>, config: Config) -> Self {
        let client = Client::new(backend, account, config);
        let scheduler = Arc::new(Scheduler::new(client.clone()));
        let controller = Controller::new(client.clone(), scheduler.clone());
        Session {
            client,
            scheduler,
            controller,
        }
    }

    pub fn account(&self) -> Option<Address> {
        self.client.account()
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Load both projections. Call once after connecting.
    pub async fn load(&self) -> Result<(), QueryError> {
        self.scheduler.initial_load().await
    }

    /// Re-read one projection on user request.
    pub async fn refresh(&self, class: EntityClass) -> Result<(), QueryError> {
        self.scheduler.refresh(class, RefreshTrigger::Manual).await
    }

    pub async fn submit_kyc(
        &self,
        full_name: impl Into<String>,
        national_id: impl Into<String>,
    ) -> Result<Reconciled, Error> {
        self.controller
            .execute(message::SubmitKyc {
                full_name: full_name.into(),
                national_id: national_id.into(),
            })
            .await
    }

    pub async fn approve(&self, user: Address) -> Result<Reconciled, Error> {
        self.controller.execute(message::Approve { user }).await
    }

    /// Reject `user`. A blank reason is replaced by [DEFAULT_REJECT_REASON].
    pub async fn reject(&self, user: Address, reason: &str) -> Result<Reconciled, Error> {
        let reason = match reason.trim() {
            "" => DEFAULT_REJECT_REASON.to_string(),
            reason => reason.to_string(),
        };
        self.controller
            .execute(message::Reject { user, reason })
            .await
    }

    pub async fn create_campaign(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
        goal: Balance,
    ) -> Result<Reconciled, Error> {
        self.controller
            .execute(message::CreateCampaign {
                title: title.into(),
                description: description.into(),
                goal,
            })
            .await
    }

    pub async fn contribute(
        &self,
        campaign: CampaignId,
        amount: Balance,
    ) -> Result<Reconciled, Error> {
        self.controller
            .execute(message::Contribute { campaign, amount })
            .await
    }

    pub async fn withdraw(&self, campaign: CampaignId) -> Result<Reconciled, Error> {
        self.controller.execute(message::Withdraw { campaign }).await
    }

    /// Latest KYC snapshot. `None` before the first successful load.
    pub fn kyc_view(&self) -> Option<Snapshot<KycView>> {
        self.scheduler.kyc_snapshot()
    }

    pub fn campaigns(&self) -> Option<Snapshot<Vec<CampaignView>>> {
        self.scheduler.campaigns_snapshot()
    }

    /// Publish every lifecycle transition of this session's actions to `observer`.
    pub fn observe(&self, observer: impl Fn(&Transition) + Send + Sync + 'static) {
        let observer: Observer = Arc::new(observer);
        self.controller.observe(observer);
    }
}
