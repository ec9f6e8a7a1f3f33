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

//! Assistance queue with atomic claims.
//!
//! Applicants enter the queue in FIFO order by submission time. Displaying
//! "who is next" goes through [`peek_next`](AssistanceQueue::peek_next),
//! which is read-only and cheap; the donation path funnels through
//! [`claim`](AssistanceQueue::claim), the single point of mutual exclusion.
//! Splitting the two keeps pollers off the hot path while ruling out the
//! double-donation race of a check-then-act sequence.
//!
//! # Thread Safety
//!
//! Entry state lives in a [`DashMap`] keyed by identity; status transitions
//! happen under the entry's shard lock, so two concurrent claims for the same
//! identity serialize and exactly one wins. The FIFO index is a separate
//! ordered set behind a mutex, always taken after the entry lock.

use crate::base::Identity;
use crate::error::DonationError;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Lifecycle of a queue entry.
///
//  Pending ──claim──► Claimed ──resolve(Served)──► Served
//                        │
//                        └──resolve(Released) / lease expiry──► Released ──claim──► Claimed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryStatus {
    Pending,
    Claimed,
    Served,
    Released,
}

impl EntryStatus {
    /// Pending and Released entries are both in line waiting for a donor.
    pub fn is_awaiting(self) -> bool {
        matches!(self, Self::Pending | Self::Released)
    }
}

/// Terminal verdict for a claimed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The donation went through; the entry leaves the queue for good.
    Served,
    /// The donation failed; the entry returns to the line at its original
    /// position.
    Released,
}

/// Proof of an exclusive claim on a queue entry.
///
/// Resolved exactly once; a token left over from an expired or already
/// resolved claim is rejected with [`DonationError::InvalidToken`].
#[derive(Debug, Clone)]
pub struct ClaimToken {
    identity: Identity,
    claim_id: u64,
}

impl ClaimToken {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

/// Queue tuning knobs.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// How long a claim may stay unresolved before it is auto-released.
    pub claim_lease: Duration,
    /// Whether an applicant who has already been served may submit again.
    pub allow_resubmission: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            claim_lease: Duration::from_secs(30),
            allow_resubmission: true,
        }
    }
}

/// 1-based place in line at submission time, counting awaiting entries only.
///
/// A snapshot for display; it is not updated as earlier entries are served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QueuePosition(pub usize);

#[derive(Debug, Clone, Copy)]
struct ActiveClaim {
    claim_id: u64,
    deadline: Instant,
}

/// One outstanding lease, queued in deadline order for lazy expiry.
///
/// Resolving a claim does not remove its lease record; a record whose claim
/// is no longer live is discarded when its deadline comes up.
#[derive(Debug)]
struct LeaseRecord {
    deadline: Instant,
    claim_id: u64,
    identity: Identity,
}

#[derive(Debug)]
struct EntryData {
    submitted_at: DateTime<Utc>,
    seq: u64,
    status: EntryStatus,
    description: String,
    proof_filename: Option<String>,
    claim: Option<ActiveClaim>,
}

/// Read-only view of a queue entry for intake and reporting surfaces.
///
/// `description` and `proof_filename` are opaque applicant metadata; the
/// queue stores them and hands them back, nothing more.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySnapshot {
    pub identity: Identity,
    pub submitted_at: DateTime<Utc>,
    pub status: EntryStatus,
    pub description: String,
    pub proof_filename: Option<String>,
}

/// FIFO key; the insertion sequence breaks submission-time ties.
type PendingKey = (DateTime<Utc>, u64, Identity);

/// Ordered collection of applicants awaiting assistance.
///
/// # Invariants
///
/// - At most one entry per identity is awaiting or claimed at any time.
/// - A released entry keeps its original `(submitted_at, seq)` key, so FIFO
///   order survives claim/release cycles.
/// - No entry stays `Claimed` past its lease; expiry reclaims run lazily on
///   every peek and claim.
#[derive(Debug)]
pub struct AssistanceQueue {
    /// Entry state per identity; transitions happen under the shard lock.
    entries: DashMap<Identity, EntryData>,
    /// Awaiting entries ordered by submission. Locked after the entry lock,
    /// never before it.
    pending: Mutex<BTreeSet<PendingKey>>,
    /// Outstanding leases in deadline order. Deadlines are claim time plus a
    /// fixed lease, and `Instant` is monotonic, so push order is expiry
    /// order. Locked after the entry lock, never before it.
    leases: Mutex<VecDeque<LeaseRecord>>,
    seq: AtomicU64,
    claim_seq: AtomicU64,
    config: QueueConfig,
}

impl AssistanceQueue {
    /// Creates an empty queue with the default [`QueueConfig`].
    pub fn new() -> Self {
        Self::with_config(QueueConfig::default())
    }

    pub fn with_config(config: QueueConfig) -> Self {
        Self {
            entries: DashMap::new(),
            pending: Mutex::new(BTreeSet::new()),
            leases: Mutex::new(VecDeque::new()),
            seq: AtomicU64::new(0),
            claim_seq: AtomicU64::new(0),
            config,
        }
    }

    /// Adds an applicant to the queue.
    ///
    /// Returns the 1-based position shown to the applicant.
    ///
    /// # Errors
    ///
    /// - [`DonationError::InvalidRequest`] - empty identity.
    /// - [`DonationError::DuplicateApplicant`] - an entry for this identity
    ///   is already awaiting or claimed, or the identity was served and
    ///   resubmission is disabled.
    pub fn submit(
        &self,
        identity: Identity,
        description: impl Into<String>,
        proof_filename: Option<String>,
    ) -> Result<QueuePosition, DonationError> {
        if identity.is_empty() {
            return Err(DonationError::InvalidRequest);
        }

        let data = EntryData {
            submitted_at: Utc::now(),
            seq: 0,
            status: EntryStatus::Pending,
            description: description.into(),
            proof_filename,
            claim: None,
        };

        // The pending index is updated while the entry's shard lock is still
        // held, so a concurrent claim cannot observe the entry without its key.
        let position = match self.entries.entry(identity.clone()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().status != EntryStatus::Served || !self.config.allow_resubmission {
                    return Err(DonationError::DuplicateApplicant);
                }
                occupied.insert(data);
                self.index_pending(occupied.get_mut(), &identity)
            }
            Entry::Vacant(vacant) => {
                let mut guard = vacant.insert(data);
                self.index_pending(&mut guard, &identity)
            }
        };

        debug!(identity = %identity, position = position.0, "applicant submitted");
        Ok(position)
    }

    /// Stamps the entry's FIFO key and inserts it into the pending index.
    ///
    /// The key is assigned under the index lock, so positions reported to
    /// concurrent submitters are distinct and match index order.
    fn index_pending(&self, entry: &mut EntryData, identity: &Identity) -> QueuePosition {
        let mut pending = self.pending.lock();
        entry.submitted_at = Utc::now();
        entry.seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let key = (entry.submitted_at, entry.seq, identity.clone());
        pending.insert(key.clone());
        // A fresh key sorts last unless the wall clock stepped backwards;
        // only that rare case pays for a rank scan.
        let position = if pending.last() == Some(&key) {
            pending.len()
        } else {
            pending.range(..=&key).count()
        };
        QueuePosition(position)
    }

    /// Returns the identity of the earliest awaiting entry without changing
    /// any state. `None` when nobody is waiting.
    pub fn peek_next(&self) -> Option<Identity> {
        self.reclaim_expired();
        let pending = self.pending.lock();
        pending.first().map(|(_, _, identity)| identity.clone())
    }

    /// Atomically claims the entry for `identity`.
    ///
    /// Claims are keyed by identity rather than "whoever is head" because the
    /// head observed through [`peek_next`](Self::peek_next) may have changed
    /// by the time the caller gets here. Of any number of concurrent claims
    /// for the same identity, exactly one succeeds.
    ///
    /// # Errors
    ///
    /// - [`DonationError::AlreadyClaimed`] - another claim holds the entry.
    /// - [`DonationError::NotFound`] - no awaiting entry for this identity.
    pub fn claim(&self, identity: &Identity) -> Result<ClaimToken, DonationError> {
        self.reclaim_expired();
        let mut entry = self
            .entries
            .get_mut(identity)
            .ok_or(DonationError::NotFound)?;

        match entry.status {
            EntryStatus::Pending | EntryStatus::Released => {
                let claim_id = self.claim_seq.fetch_add(1, Ordering::Relaxed) + 1;
                let deadline = Instant::now() + self.config.claim_lease;
                let key = (entry.submitted_at, entry.seq, identity.clone());
                entry.status = EntryStatus::Claimed;
                entry.claim = Some(ActiveClaim { claim_id, deadline });
                self.pending.lock().remove(&key);
                self.leases.lock().push_back(LeaseRecord {
                    deadline,
                    claim_id,
                    identity: identity.clone(),
                });

                debug!(identity = %identity, claim_id, "entry claimed");
                Ok(ClaimToken {
                    identity: identity.clone(),
                    claim_id,
                })
            }
            EntryStatus::Claimed => Err(DonationError::AlreadyClaimed),
            EntryStatus::Served => Err(DonationError::NotFound),
        }
    }

    /// Resolves a claim as [`Served`](ClaimOutcome::Served) (terminal) or
    /// [`Released`](ClaimOutcome::Released) (back in line at the original
    /// position).
    ///
    /// # Errors
    ///
    /// Returns [`DonationError::InvalidToken`] if the token does not match
    /// the entry's live claim: the claim was already resolved, its lease
    /// expired and the entry was reclaimed, or the entry no longer exists.
    pub fn resolve(&self, token: ClaimToken, outcome: ClaimOutcome) -> Result<(), DonationError> {
        let mut entry = self
            .entries
            .get_mut(&token.identity)
            .ok_or(DonationError::InvalidToken)?;

        let live = entry.status == EntryStatus::Claimed
            && entry
                .claim
                .as_ref()
                .is_some_and(|claim| claim.claim_id == token.claim_id);
        if !live {
            return Err(DonationError::InvalidToken);
        }

        entry.claim = None;
        match outcome {
            ClaimOutcome::Served => {
                entry.status = EntryStatus::Served;
                debug!(identity = %token.identity, "entry served");
            }
            ClaimOutcome::Released => {
                entry.status = EntryStatus::Released;
                let key = (entry.submitted_at, entry.seq, token.identity.clone());
                self.pending.lock().insert(key);
                warn!(identity = %token.identity, "entry released back to the queue");
            }
        }
        Ok(())
    }

    /// Releases claimed entries whose lease has expired.
    ///
    /// Runs lazily from [`peek_next`](Self::peek_next) and
    /// [`claim`](Self::claim); exposed for callers that want to bound the
    /// exposure of an abandoned claim themselves. Returns the number of
    /// entries reclaimed.
    pub fn reclaim_expired(&self) -> usize {
        let now = Instant::now();

        // Expired lease records come off the front of the deque first; the
        // lock is dropped before any entry lock is taken.
        let mut expired = Vec::new();
        {
            let mut leases = self.leases.lock();
            while leases.front().is_some_and(|lease| lease.deadline <= now) {
                if let Some(lease) = leases.pop_front() {
                    expired.push(lease);
                }
            }
        }

        let mut reclaimed = 0;
        for lease in expired {
            let Some(mut entry) = self.entries.get_mut(&lease.identity) else {
                continue;
            };
            // A resolved claim leaves a stale lease record behind; only a
            // still-live claim gets released.
            let live = entry.status == EntryStatus::Claimed
                && entry
                    .claim
                    .as_ref()
                    .is_some_and(|claim| claim.claim_id == lease.claim_id);
            if live {
                entry.status = EntryStatus::Released;
                entry.claim = None;
                let key = (entry.submitted_at, entry.seq, lease.identity.clone());
                self.pending.lock().insert(key);
                reclaimed += 1;
                warn!(identity = %lease.identity, "claim lease expired, entry released");
            }
        }
        reclaimed
    }

    /// Current status of the entry for `identity`, if one exists.
    pub fn status_of(&self, identity: &Identity) -> Option<EntryStatus> {
        self.entries.get(identity).map(|entry| entry.status)
    }

    /// Full read-only view of the entry for `identity`.
    pub fn snapshot_of(&self, identity: &Identity) -> Option<EntrySnapshot> {
        self.entries.get(identity).map(|entry| EntrySnapshot {
            identity: identity.clone(),
            submitted_at: entry.submitted_at,
            status: entry.status,
            description: entry.description.clone(),
            proof_filename: entry.proof_filename.clone(),
        })
    }

    /// Number of entries currently awaiting assistance.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Current 1-based place in line for an awaiting entry.
    pub fn position_of(&self, identity: &Identity) -> Option<QueuePosition> {
        let entry = self.entries.get(identity)?;
        if !entry.status.is_awaiting() {
            return None;
        }
        let key = (entry.submitted_at, entry.seq, identity.clone());
        drop(entry);
        let pending = self.pending.lock();
        pending
            .contains(&key)
            .then(|| QueuePosition(pending.range(..=&key).count()))
    }
}

impl Default for AssistanceQueue {
    fn default() -> Self {
        Self::new()
    }
}
