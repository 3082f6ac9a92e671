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

/// A status code read from a contract that does not map to any known status.
#[derive(thiserror::Error, Clone, Copy, Debug, Eq, PartialEq)]
#[error("unrecognized {entity} status code {code}")]
pub struct UnknownStatusCode {
    pub entity: &'static str,
    pub code: u8,
}

/// Reasons for which the contracts revert a transaction.
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ContractError {
    #[error("sender is not the registry admin")]
    NotAdmin,
    #[error("identity details were already submitted")]
    AlreadySubmitted,
    #[error("identity is not pending review")]
    NotPending,
    #[error("full name and national id must not be empty")]
    EmptyField,
    #[error("sender is not a verified identity")]
    NotVerified,
    #[error("campaign goal must be greater than zero")]
    InvalidGoal,
    #[error("campaign does not exist")]
    UnknownCampaign,
    #[error("campaign is not active")]
    CampaignNotActive,
    #[error("contribution must be greater than zero")]
    ZeroContribution,
    #[error("sender is not the campaign creator")]
    NotCreator,
    #[error("campaign has not reached its goal")]
    NotCompleted,
    #[error("funds were already withdrawn")]
    AlreadyWithdrawn,
    #[error("campaign has no funds to withdraw")]
    NothingToWithdraw,
    #[error("sender balance is insufficient")]
    InsufficientBalance,
    /// Revert reason reported by a node that the client does not recognize.
    #[error("reverted: {0}")]
    Other(String),
}
