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

//! Types shared by the backends and the synchronization core.

pub use kyc_crowdfund_core::*;

pub use kyc_crowdfund_core::message::{Call, Contract};
pub use kyc_crowdfund_core::query::{Query, QueryValue};
pub use kyc_crowdfund_core::state::{
    Campaign, CampaignRecord, CampaignStatus, Identity, KycRecord, KycStatus,
};

pub use crate::backend::TransactionIncluded;
pub use crate::error::{ConfirmationError, Error, QueryError, SubmissionError};
