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

//! Contribution statistics derived from the ledger.
//!
//! Everything here is computed on demand by a single pass over
//! [`scan_all`](crate::LedgerStore::scan_all); nothing is stored. Results may
//! be stale relative to concurrent donations, which is acceptable for a
//! read-mostly reporting view.

use crate::base::Identity;
use crate::store::LedgerStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Donor tier by share of global donations.
///
/// Lower bounds are inclusive and checked in descending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tier {
    Gold,
    Silver,
    Bronze,
}

impl Tier {
    /// Tier for a contribution percentage: Gold at 15% and up, Silver at 5%,
    /// Bronze below.
    pub fn from_percentage(percentage: Decimal) -> Self {
        if percentage >= dec!(15) {
            Tier::Gold
        } else if percentage >= dec!(5) {
            Tier::Silver
        } else {
            Tier::Bronze
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Gold => "Gold",
            Tier::Silver => "Silver",
            Tier::Bronze => "Bronze",
        };
        write!(f, "{name}")
    }
}

/// Per-donor contribution figures, derived and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationSummary {
    pub donor_total: Decimal,
    pub global_total: Decimal,
    /// `donor_total / global_total * 100`; zero when the ledger is empty.
    pub percentage: Decimal,
    pub tier: Tier,
}

/// Computes contribution statistics from the ledger store.
pub struct AggregationEngine {
    ledger: Arc<LedgerStore>,
}

impl AggregationEngine {
    pub fn new(ledger: Arc<LedgerStore>) -> Self {
        Self { ledger }
    }

    /// Totals, percentage share, and tier for one donor.
    ///
    /// Idempotent; two calls with no intervening donation yield identical
    /// results.
    pub fn summary(&self, donor: &Identity) -> DonationSummary {
        let mut donor_total = Decimal::ZERO;
        let mut global_total = Decimal::ZERO;
        for record in self.ledger.scan_all() {
            global_total += record.amount;
            if record.donor == *donor {
                donor_total += record.amount;
            }
        }

        let percentage = if global_total > Decimal::ZERO {
            donor_total / global_total * dec!(100)
        } else {
            Decimal::ZERO
        };

        DonationSummary {
            donor_total,
            global_total,
            percentage,
            tier: Tier::from_percentage(percentage),
        }
    }

    /// Distinct donor identities in first-appearance order.
    pub fn donors(&self) -> Vec<Identity> {
        let mut seen = HashSet::new();
        let mut donors = Vec::new();
        for record in self.ledger.scan_all() {
            if seen.insert(record.donor.clone()) {
                donors.push(record.donor.clone());
            }
        }
        donors
    }
}
