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

use serde::{Deserialize, Serialize};

use crate::message::Contract;
use crate::{Address, Balance, CampaignId};

/// Events emitted by the contracts.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Event {
    KycSubmitted {
        user: Address,
        full_name: String,
        national_id: String,
    },
    KycApproved {
        user: Address,
        full_name: String,
    },
    KycRejected {
        user: Address,
        reason: String,
    },
    CampaignCreated {
        id: CampaignId,
        creator: Address,
        title: String,
        goal: Balance,
    },
    Contributed {
        id: CampaignId,
        from: Address,
        amount: Balance,
        total_raised: Balance,
    },
    Withdrawn {
        id: CampaignId,
        to: Address,
        amount: Balance,
    },
}

impl Event {
    pub fn contract(&self) -> Contract {
        match self {
            Event::KycSubmitted { .. } | Event::KycApproved { .. } | Event::KycRejected { .. } => {
                Contract::KycRegistry
            }
            Event::CampaignCreated { .. } | Event::Contributed { .. } | Event::Withdrawn { .. } => {
                Contract::Crowdfunding
            }
        }
    }
}
