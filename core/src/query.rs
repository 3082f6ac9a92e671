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

//! Side-effect free reads of the contract state.

use serde::{Deserialize, Serialize};

use crate::message::Contract;
use crate::state::{CampaignRecord, KycRecord};
use crate::{Address, CampaignId};

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Query {
    /// `admin() -> address`
    Admin,
    /// `isVerified(address) -> bool`
    IsVerified(Address),
    /// `getKyc(address) -> {fullName, nationalId, status}`
    GetKyc(Address),
    /// `getAllPending() -> address[]`
    GetAllPending,
    /// `getCampaign(id) -> {title, description, creator, goal, raised, status}`
    GetCampaign(CampaignId),
    /// `getCampaignCount() -> uint`
    GetCampaignCount,
}

impl Query {
    pub fn contract(&self) -> Contract {
        match self {
            Query::Admin | Query::IsVerified(_) | Query::GetKyc(_) | Query::GetAllPending => {
                Contract::KycRegistry
            }
            Query::GetCampaign(_) | Query::GetCampaignCount => Contract::Crowdfunding,
        }
    }

    pub fn selector(&self) -> &'static str {
        match self {
            Query::Admin => "admin",
            Query::IsVerified(_) => "isVerified",
            Query::GetKyc(_) => "getKyc",
            Query::GetAllPending => "getAllPending",
            Query::GetCampaign(_) => "getCampaign",
            Query::GetCampaignCount => "getCampaignCount",
        }
    }
}

/// Decoded return value of a [Query].
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum QueryValue {
    Address(Address),
    Bool(bool),
    Kyc(KycRecord),
    Addresses(Vec<Address>),
    Campaign(CampaignRecord),
    Count(u64),
}

impl QueryValue {
    /// Short name of the value shape, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            QueryValue::Address(_) => "address",
            QueryValue::Bool(_) => "bool",
            QueryValue::Kyc(_) => "kyc record",
            QueryValue::Addresses(_) => "address list",
            QueryValue::Campaign(_) => "campaign record",
            QueryValue::Count(_) => "count",
        }
    }
}
