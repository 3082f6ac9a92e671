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

//! Messages that change the ledger state.
//!
//! Every message is sent to exactly one [Contract]. [Call] wraps all messages so that backends
//! can dispatch them uniformly.

use serde::{Deserialize, Serialize};

use crate::{Address, Balance, CampaignId};

/// The two contracts the client talks to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, derive_more::Display)]
pub enum Contract {
    #[display(fmt = "kyc-registry")]
    KycRegistry,
    #[display(fmt = "crowdfunding")]
    Crowdfunding,
}

/// Submit identity details for review. Resubmission is allowed after a rejection.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SubmitKyc {
    pub full_name: String,
    pub national_id: String,
}

/// Approve a pending identity. Admin only.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Approve {
    pub user: Address,
}

/// Reject a pending identity. Admin only.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Reject {
    pub user: Address,
    pub reason: String,
}

/// Create a campaign. The sender must be a verified identity.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CreateCampaign {
    pub title: String,
    pub description: String,
    pub goal: Balance,
}

/// Contribute `amount` to an active campaign. The amount is sent as the transaction value.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Contribute {
    pub campaign: CampaignId,
    pub amount: Balance,
}

/// Withdraw the funds of a completed campaign to its creator.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Withdraw {
    pub campaign: CampaignId,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, derive_more::From)]
pub enum Call {
    SubmitKyc(SubmitKyc),
    Approve(Approve),
    Reject(Reject),
    CreateCampaign(CreateCampaign),
    Contribute(Contribute),
    Withdraw(Withdraw),
}

impl Call {
    pub fn contract(&self) -> Contract {
        match self {
            Call::SubmitKyc(_) | Call::Approve(_) | Call::Reject(_) => Contract::KycRegistry,
            Call::CreateCampaign(_) | Call::Contribute(_) | Call::Withdraw(_) => {
                Contract::Crowdfunding
            }
        }
    }

    /// Name of the contract function invoked by the call.
    pub fn selector(&self) -> &'static str {
        match self {
            Call::SubmitKyc(_) => "submitKyc",
            Call::Approve(_) => "approve",
            Call::Reject(_) => "reject",
            Call::CreateCampaign(_) => "createCampaign",
            Call::Contribute(_) => "contribute",
            Call::Withdraw(_) => "withdraw",
        }
    }

    /// Native currency attached to the transaction.
    pub fn value(&self) -> Balance {
        match self {
            Call::Contribute(contribute) => contribute.amount,
            _ => 0,
        }
    }
}
