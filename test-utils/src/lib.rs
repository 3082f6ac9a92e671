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

//! Miscellaneous helpers used throughout the client tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::distributions::Alphanumeric;
use rand::Rng;

use kyc_crowdfund_client::backend::{Backend, Emulator, PendingTransaction};
use kyc_crowdfund_client::*;

/// Balance credited to every account created by these helpers.
pub const INITIAL_BALANCE: Balance = 1_000_000;

/// Configuration with short timeouts so that timeout tests finish quickly.
pub fn test_config() -> Config {
    Config {
        query_timeout_ms: 200,
        confirmation_timeout_ms: 300,
        pending_fetch_concurrency: 4,
        staleness_tolerance_ms: 60_000,
    }
}

pub fn random_address() -> Address {
    Address::from_bytes(rand::random())
}

pub fn random_alnum_string(size: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(size)
        .collect::<String>()
}

/// Create an emulator with a random, funded admin.
pub fn new_emulator() -> Emulator {
    let admin = random_address();
    let emulator = Emulator::new(admin);
    emulator.fund(admin, INITIAL_BALANCE);
    emulator
}

/// Create a random account and equip it with [INITIAL_BALANCE].
pub fn funded_account(emulator: &Emulator) -> Address {
    let account = random_address();
    emulator.fund(account, INITIAL_BALANCE);
    account
}

/// Session for `account` on the shared `emulator` ledger.
pub fn session(emulator: &Emulator, account: Address) -> Session {
    Session::new(emulator.clone(), Some(account), test_config())
}

pub fn admin_session(emulator: &Emulator) -> Session {
    session(emulator, emulator.admin())
}

/// Create a funded account with a pending KYC submission and return its session.
///
/// Panics if the submission fails.
pub async fn pending_user(emulator: &Emulator) -> Session {
    let user = session(emulator, funded_account(emulator));
    user.submit_kyc(random_alnum_string(12), random_alnum_string(8))
        .await
        .unwrap();
    user
}

/// Create a funded account whose KYC was approved by the admin and return its session.
///
/// Panics if any step fails.
pub async fn verified_user(emulator: &Emulator) -> Session {
    let user = pending_user(emulator).await;
    let address = user.account().unwrap();
    admin_session(emulator).approve(address).await.unwrap();
    user
}

/// Create a campaign from `creator` and return its id.
///
/// Panics if the creation fails.
pub async fn create_campaign(creator: &Session, goal: Balance) -> CampaignId {
    let reconciled = creator
        .create_campaign(random_alnum_string(10), random_alnum_string(30), goal)
        .await
        .unwrap();
    reconciled
        .events()
        .iter()
        .find_map(|event| match event {
            Event::CampaignCreated { id, .. } => Some(*id),
            _ => None,
        })
        .unwrap()
}

/// Wait until the transaction log of `session` has no pending transactions.
///
/// Panics if this does not happen within one second.
pub async fn wait_for_settlement(session: &Session) {
    for _ in 0..100 {
        if session.client().transactions().pending().is_empty() {
            return;
        }
        async_std::task::sleep(Duration::from_millis(10)).await;
    }
    panic!("transactions did not settle")
}

/// [Backend] wrapping an [Emulator] that slows down selected reads and counts how many reads are
/// in flight at the same time.
///
/// Clones share the delays and the counters.
#[derive(Clone)]
pub struct InstrumentedBackend {
    inner: Emulator,
    delays: Arc<Mutex<Vec<QueryDelay>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

struct QueryDelay {
    matches: Box<dyn Fn(&Query) -> bool + Send>,
    duration: Duration,
    /// `None` delays every matching read.
    remaining: Option<usize>,
}

impl InstrumentedBackend {
    pub fn new(inner: Emulator) -> Self {
        InstrumentedBackend {
            inner,
            delays: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Answer reads matching `matches` only after `duration`. Only the next `times` matching reads
    /// are delayed, or all of them if `times` is `None`.
    pub fn delay_queries(
        &self,
        matches: impl Fn(&Query) -> bool + Send + 'static,
        duration: Duration,
        times: Option<usize>,
    ) {
        self.delays.lock().unwrap().push(QueryDelay {
            matches: Box::new(matches),
            duration,
            remaining: times,
        });
    }

    /// Highest number of reads that were in flight at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn reset_max_in_flight(&self) {
        self.max_in_flight.store(0, Ordering::SeqCst);
    }

    fn take_delay(&self, query: &Query) -> Option<Duration> {
        let mut delays = self.delays.lock().unwrap();
        let delay = delays
            .iter_mut()
            .find(|delay| delay.remaining != Some(0) && (delay.matches)(query))?;
        if let Some(remaining) = &mut delay.remaining {
            *remaining -= 1;
        }
        Some(delay.duration)
    }
}

#[async_trait::async_trait]
impl Backend for InstrumentedBackend {
    async fn submit(
        &self,
        author: Address,
        call: Call,
    ) -> Result<PendingTransaction, SubmissionError> {
        self.inner.submit(author, call).await
    }

    async fn query(&self, query: Query) -> Result<QueryValue, QueryError> {
        let delay = self.take_delay(&query);
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        if let Some(duration) = delay {
            async_std::task::sleep(duration).await;
        }
        let result = self.inner.query(query).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
