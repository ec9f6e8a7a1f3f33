// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! # Donation Ledger
//!
//! This library provides a charitable donation ledger and a low-income
//! assistance queue: an append-only record of donor-to-recipient transfers,
//! a fairness queue that hands out "next recipient" assignments without
//! letting two concurrent donors pay the same applicant, and contribution
//! statistics derived from the ledger.
//!
//! ## Core Components
//!
//! - [`LedgerStore`]: Append-only source of truth for all donation records
//! - [`AssistanceQueue`]: FIFO applicant queue with atomic claim/resolve
//! - [`MatchingCoordinator`]: Orchestrates a donation end to end
//! - [`AggregationEngine`]: Per-donor totals, percentage share, and tier
//! - [`DonationError`]: Error types for every failure in the flow
//!
//! ## Example
//!
//! ```
//! use donation_ledger_rs::{
//!     AggregationEngine, AssistanceQueue, Identity, LedgerStore, MatchingCoordinator, Tier,
//! };
//! use rust_decimal_macros::dec;
//! use std::sync::Arc;
//!
//! let queue = Arc::new(AssistanceQueue::new());
//! let ledger = Arc::new(LedgerStore::new());
//!
//! // An applicant joins the queue.
//! let position = queue
//!     .submit(Identity::from("applicant@example.com"), "rent assistance", None)
//!     .unwrap();
//! assert_eq!(position.0, 1);
//!
//! // A donor is matched to the queue head.
//! let coordinator = MatchingCoordinator::new(Arc::clone(&queue), Arc::clone(&ledger));
//! let record = coordinator
//!     .donate(&Identity::from("donor@example.com"), dec!(50.00))
//!     .unwrap();
//! assert_eq!(record.recipient.as_str(), "applicant@example.com");
//!
//! // Contribution statistics come straight from the ledger.
//! let stats = AggregationEngine::new(ledger);
//! let summary = stats.summary(&Identity::from("donor@example.com"));
//! assert_eq!(summary.percentage, dec!(100));
//! assert_eq!(summary.tier, Tier::Gold);
//! ```
//!
//! ## Thread Safety
//!
//! All components are safe to share across threads. Claiming is the single
//! point of mutual exclusion: of any number of concurrent donors aiming at
//! the same applicant, exactly one wins and the rest retry against the next
//! queue head.

mod base;
mod coordinator;
pub mod error;
pub mod queue;
mod record;
mod store;
mod summary;

pub use base::{Identity, RecordId};
pub use coordinator::MatchingCoordinator;
pub use error::DonationError;
pub use queue::{
    AssistanceQueue, ClaimOutcome, ClaimToken, EntrySnapshot, EntryStatus, QueueConfig,
    QueuePosition,
};
pub use record::{DonationDraft, DonationRecord};
pub use store::{Ledger, LedgerStore};
pub use summary::{AggregationEngine, DonationSummary, Tier};
