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

//! Append-only ledger store.
//!
//! The [`LedgerStore`] is the source of truth for all donation aggregates.
//! Records are validated on the way in, assigned a monotonic id and
//! timestamp, and never mutated or removed. Scans take a snapshot under the
//! lock and iterate outside it, so readers never observe a partially written
//! record and never block the writer for long.

use crate::base::{Identity, RecordId};
use crate::error::DonationError;
use crate::record::{DonationDraft, DonationRecord};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

/// Write seam between the matching coordinator and durable storage.
///
/// [`LedgerStore`] is the in-memory implementation; tests substitute a
/// faulting store to exercise the coordinator's release-on-failure path.
pub trait Ledger: Send + Sync {
    fn append(&self, draft: DonationDraft) -> Result<DonationRecord, DonationError>;
}

#[derive(Debug)]
struct StoreData {
    records: Vec<Arc<DonationRecord>>,
    next_id: u64,
}

/// Durable, append-only collection of donation records.
///
/// # Invariants
///
/// - Record ids are unique and strictly increasing in insertion order.
/// - Timestamps are non-decreasing in insertion order.
/// - No record is ever mutated or deleted after `append` returns.
#[derive(Debug)]
pub struct LedgerStore {
    inner: RwLock<StoreData>,
}

impl LedgerStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreData {
                records: Vec::new(),
                next_id: 0,
            }),
        }
    }

    /// Validates and appends a record, assigning its id and timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`DonationError::InvalidRecord`] if either identity is empty
    /// or the amount is not strictly positive.
    pub fn append(&self, draft: DonationDraft) -> Result<DonationRecord, DonationError> {
        if draft.donor.is_empty() || draft.recipient.is_empty() {
            return Err(DonationError::InvalidRecord);
        }
        if draft.amount <= Decimal::ZERO {
            return Err(DonationError::InvalidRecord);
        }

        let mut data = self.inner.write();
        data.next_id += 1;
        let record = Arc::new(DonationRecord {
            id: RecordId(data.next_id),
            donor: draft.donor,
            recipient: draft.recipient,
            amount: draft.amount,
            timestamp: monotonic_now(data.records.last().map(|r| r.timestamp)),
        });
        data.records.push(Arc::clone(&record));
        drop(data);

        debug!(id = %record.id, donor = %record.donor, recipient = %record.recipient, "record appended");
        Ok((*record).clone())
    }

    /// Returns a snapshot iterator over all records in insertion order.
    ///
    /// Appends racing with the snapshot may or may not be visible; records
    /// already yielded are immutable either way.
    pub fn scan_all(&self) -> impl Iterator<Item = Arc<DonationRecord>> + use<> {
        let snapshot: Vec<Arc<DonationRecord>> = self.inner.read().records.clone();
        snapshot.into_iter()
    }

    /// Scans records whose donor matches `identity`.
    pub fn find_by_donor(
        &self,
        identity: &Identity,
    ) -> impl Iterator<Item = Arc<DonationRecord>> + use<> {
        let identity = identity.clone();
        self.scan_all().filter(move |record| record.donor == identity)
    }

    /// Number of records appended so far.
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger for LedgerStore {
    fn append(&self, draft: DonationDraft) -> Result<DonationRecord, DonationError> {
        LedgerStore::append(self, draft)
    }
}

/// Wall clock clamped against the previous record so the store's timestamp
/// sequence never runs backwards.
fn monotonic_now(last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match last {
        Some(previous) if previous > now => previous,
        _ => now,
    }
}
