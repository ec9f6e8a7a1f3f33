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

//! Ledger record types.
//!
//! A [`DonationDraft`] is what callers hand to the store; the store assigns
//! `id` and `timestamp` and hands back a [`DonationRecord`], which is never
//! mutated afterwards.

use crate::base::{Identity, RecordId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A completed donation, immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationRecord {
    pub id: RecordId,
    #[serde(rename = "donorIdentity")]
    pub donor: Identity,
    #[serde(rename = "recipientIdentity")]
    pub recipient: Identity,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Input to [`append`](crate::LedgerStore::append).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonationDraft {
    pub donor: Identity,
    pub recipient: Identity,
    pub amount: Decimal,
}

impl DonationDraft {
    pub fn new(donor: Identity, recipient: Identity, amount: Decimal) -> Self {
        Self {
            donor,
            recipient,
            amount,
        }
    }
}
