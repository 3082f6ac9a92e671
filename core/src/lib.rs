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

//! Basic types used by the KYC crowdfunding clients.
//!
//! The ledger is made of two contracts: a KYC registry that records identity attestations and
//! their review by an admin, and a crowdfunding contract that holds campaigns created by
//! verified identities. This crate defines the values read from and sent to both contracts.

pub mod message;
pub mod query;
pub mod state;

mod address;
pub use address::{Address, InvalidAddressError};

mod error;
pub use error::{ContractError, UnknownStatusCode};

mod event;
pub use event::Event;

use serde::{Deserialize, Serialize};

/// Amount of the native currency in its smallest unit.
pub type Balance = u128;

/// Identifier of a campaign.
///
/// Assigned by the crowdfunding contract in creation order, starting at zero.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    Hash,
    Ord,
    PartialOrd,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[display(fmt = "#{}", _0)]
pub struct CampaignId(pub u64);

/// The hash of a transaction. Uniquely identifies a submitted transaction.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub [u8; 32]);

impl std::fmt::Display for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "TxHash({})", self)
    }
}
