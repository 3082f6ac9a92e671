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

//! Type definitions for all entities stored in the ledger state.
//!
//! The contracts return status fields as small integer codes. The `*Record` types hold the raw
//! values exactly as read. Converting a record into its entity decodes the code and fails with
//! [UnknownStatusCode] for codes the client does not know, instead of guessing a status.

use serde::{Deserialize, Serialize};

use crate::{Address, Balance, CampaignId, UnknownStatusCode};

/// Identity attestation as returned by `getKyc`.
///
/// Addresses that never submitted are returned with empty fields and status code `0`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct KycRecord {
    pub full_name: String,
    pub national_id: String,
    pub status: u8,
}

impl KycRecord {
    pub fn into_identity(self, address: Address) -> Result<Identity, UnknownStatusCode> {
        Ok(Identity {
            address,
            full_name: self.full_name,
            national_id: self.national_id,
            status: KycStatus::from_code(self.status)?,
        })
    }
}

/// Verification status of an [Identity].
///
/// # Transitions
///
/// * `Unsubmitted -> Pending` and `Rejected -> Pending` by the owner submitting details.
/// * `Pending -> Approved` and `Pending -> Rejected` by the registry admin.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, derive_more::Display)]
pub enum KycStatus {
    #[display(fmt = "unsubmitted")]
    Unsubmitted,
    #[display(fmt = "pending")]
    Pending,
    #[display(fmt = "approved")]
    Approved,
    /// The registry does not return the reason on reads. It is only known when the rejection
    /// event was observed.
    #[display(fmt = "rejected")]
    Rejected { reason: Option<String> },
}

impl KycStatus {
    pub fn from_code(code: u8) -> Result<Self, UnknownStatusCode> {
        match code {
            0 => Ok(KycStatus::Unsubmitted),
            1 => Ok(KycStatus::Pending),
            2 => Ok(KycStatus::Approved),
            3 => Ok(KycStatus::Rejected { reason: None }),
            _ => Err(UnknownStatusCode {
                entity: "kyc",
                code,
            }),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            KycStatus::Unsubmitted => 0,
            KycStatus::Pending => 1,
            KycStatus::Approved => 2,
            KycStatus::Rejected { .. } => 3,
        }
    }

    pub fn is_verified(&self) -> bool {
        *self == KycStatus::Approved
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, KycStatus::Rejected { .. })
    }

    /// Whether the owner may submit (or resubmit) identity details.
    pub fn accepts_submission(&self) -> bool {
        matches!(self, KycStatus::Unsubmitted | KycStatus::Rejected { .. })
    }
}

/// # Invariants
///
/// * `address` is immutable.
/// * The status is only changed by the registry. Clients hold projections of it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub address: Address,
    pub full_name: String,
    pub national_id: String,
    pub status: KycStatus,
}

/// Campaign as returned by `getCampaign`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CampaignRecord {
    pub title: String,
    pub description: String,
    pub creator: Address,
    pub goal: Balance,
    pub raised: Balance,
    pub status: u8,
}

impl CampaignRecord {
    pub fn into_campaign(self, id: CampaignId) -> Result<Campaign, UnknownStatusCode> {
        Ok(Campaign {
            id,
            title: self.title,
            description: self.description,
            creator: self.creator,
            goal: self.goal,
            raised: self.raised,
            status: CampaignStatus::from_code(self.status)?,
        })
    }
}

/// Lifecycle status of a [Campaign].
///
/// # Transitions
///
/// * `Active -> Completed` when a contribution makes `raised` reach `goal`.
/// * `Completed -> Withdrawn` when the creator withdraws the funds. This happens at most once.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, derive_more::Display)]
pub enum CampaignStatus {
    #[display(fmt = "active")]
    Active,
    #[display(fmt = "completed")]
    Completed,
    #[display(fmt = "withdrawn")]
    Withdrawn,
}

impl CampaignStatus {
    pub fn from_code(code: u8) -> Result<Self, UnknownStatusCode> {
        match code {
            0 => Ok(CampaignStatus::Active),
            1 => Ok(CampaignStatus::Completed),
            2 => Ok(CampaignStatus::Withdrawn),
            _ => Err(UnknownStatusCode {
                entity: "campaign",
                code,
            }),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            CampaignStatus::Active => 0,
            CampaignStatus::Completed => 1,
            CampaignStatus::Withdrawn => 2,
        }
    }
}

/// # Invariants
///
/// * `id`, `creator` and `goal` are fixed at creation.
/// * `raised` never decreases. It may exceed `goal`.
/// * Only `creator` can move the campaign to [CampaignStatus::Withdrawn], and only once.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub title: String,
    pub description: String,
    pub creator: Address,
    pub goal: Balance,
    pub raised: Balance,
    pub status: CampaignStatus,
}

impl Campaign {
    pub fn accepts_contributions(&self) -> bool {
        self.status == CampaignStatus::Active
    }

    /// Whether `account` may withdraw the raised funds.
    pub fn withdrawable_by(&self, account: &Address) -> bool {
        self.status == CampaignStatus::Completed && self.creator == *account
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn creator() -> Address {
        Address::from_bytes([7u8; 20])
    }

    fn record(status: u8) -> CampaignRecord {
        CampaignRecord {
            title: "Well".into(),
            description: "A village well".into(),
            creator: creator(),
            goal: 100,
            raised: 0,
            status,
        }
    }

    #[test]
    fn kyc_status_codes() {
        for code in 0..4 {
            assert_eq!(KycStatus::from_code(code).unwrap().code(), code);
        }
        assert_eq!(
            KycStatus::from_code(4),
            Err(UnknownStatusCode {
                entity: "kyc",
                code: 4
            })
        );
    }

    #[test]
    fn campaign_status_codes_fail_loudly() {
        assert_eq!(
            record(0).into_campaign(CampaignId(0)).unwrap().status,
            CampaignStatus::Active
        );
        assert_eq!(
            record(2).into_campaign(CampaignId(0)).unwrap().status,
            CampaignStatus::Withdrawn
        );
        let err = record(9).into_campaign(CampaignId(0)).unwrap_err();
        assert_eq!(err.code, 9);
    }

    #[test]
    fn rejected_may_resubmit() {
        assert!(KycStatus::Unsubmitted.accepts_submission());
        assert!(KycStatus::Rejected { reason: None }.accepts_submission());
        assert!(!KycStatus::Pending.accepts_submission());
        assert!(!KycStatus::Approved.accepts_submission());
        assert!(!KycStatus::Rejected { reason: None }.is_verified());
    }

    #[test]
    fn withdrawal_requires_completed_and_creator() {
        let mut campaign = record(1).into_campaign(CampaignId(3)).unwrap();
        assert!(campaign.withdrawable_by(&creator()));
        assert!(!campaign.withdrawable_by(&Address::from_bytes([8u8; 20])));
        assert!(!campaign.accepts_contributions());

        campaign.status = CampaignStatus::Active;
        assert!(!campaign.withdrawable_by(&creator()));
        assert!(campaign.accepts_contributions());
    }
}
