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

//! Campaign state projector.
//!
//! Only `goal` and `raised` are taken from the chain as numbers. Progress and the actions offered
//! to a viewer are derived locally on every refresh and never stored.

use serde::Serialize;

use crate::interface::*;
use crate::Client;

/// Funding progress of a campaign.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Progress {
    /// `raised / goal` in percent, rounded half up. May exceed 100. `None` for a zero goal.
    pub percent: Option<u128>,
    /// Percentage clamped to `0..=100` for display. A zero goal shows as full.
    pub bar: u8,
}

impl Progress {
    pub fn new(raised: Balance, goal: Balance) -> Self {
        if goal == 0 {
            return Progress {
                percent: None,
                bar: 100,
            };
        }
        let percent = match raised.checked_mul(100) {
            Some(scaled) => {
                let quotient = scaled / goal;
                let remainder = scaled % goal;
                if remainder >= goal - remainder {
                    quotient + 1
                } else {
                    quotient
                }
            }
            None => (raised / goal).saturating_mul(100),
        };
        Progress {
            percent: Some(percent),
            bar: percent.min(100) as u8,
        }
    }
}

/// A campaign together with what the viewing account may do with it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CampaignView {
    pub campaign: Campaign,
    pub progress: Progress,
    pub can_contribute: bool,
    /// Only the creator of a completed campaign sees this.
    pub can_withdraw: bool,
}

impl CampaignView {
    pub fn new(campaign: Campaign, viewer: Option<&Address>) -> Self {
        let progress = Progress::new(campaign.raised, campaign.goal);
        let can_contribute = campaign.accepts_contributions();
        let can_withdraw = viewer.map_or(false, |viewer| campaign.withdrawable_by(viewer));
        CampaignView {
            campaign,
            progress,
            can_contribute,
            can_withdraw,
        }
    }
}

pub struct CampaignProjector {
    client: Client,
}

impl CampaignProjector {
    pub fn new(client: Client) -> Self {
        CampaignProjector { client }
    }

    /// Read every campaign in ascending id order.
    ///
    /// The count is read once and bounds the iteration. Campaigns created while iterating are
    /// picked up by the next refresh.
    pub async fn refresh_all(&self) -> Result<Vec<Campaign>, QueryError> {
        let count = self.client.get_campaign_count().await?;
        let mut campaigns = Vec::new();
        for index in 0..count {
            campaigns.push(self.client.get_campaign(CampaignId(index)).await?);
        }
        log::debug!("read {} campaigns", campaigns.len());
        Ok(campaigns)
    }

    /// [CampaignProjector::refresh_all] with progress and permitted actions for `viewer`.
    pub async fn views(&self, viewer: Option<&Address>) -> Result<Vec<CampaignView>, QueryError> {
        Ok(self
            .refresh_all()
            .await?
            .into_iter()
            .map(|campaign| CampaignView::new(campaign, viewer))
            .collect())
    }
}
