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

//! Donation orchestration.
//!
//! The [`MatchingCoordinator`] is the only component allowed to transition a
//! queue entry's status or append to the ledger. A donation claims the queue
//! head, validates inputs, appends the record, and resolves the claim; every
//! exit path after a successful claim pairs it with a resolve, so no entry is
//! ever left dangling in `Claimed`.

use crate::base::Identity;
use crate::error::DonationError;
use crate::queue::{AssistanceQueue, ClaimOutcome};
use crate::record::{DonationDraft, DonationRecord};
use crate::store::{Ledger, LedgerStore};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, warn};

/// Orchestrates donations against the shared queue and ledger.
///
/// Generic over the [`Ledger`] write seam so the storage-failure path can be
/// exercised without a real store fault.
pub struct MatchingCoordinator<L = LedgerStore> {
    queue: Arc<AssistanceQueue>,
    ledger: Arc<L>,
    max_attempts: usize,
}

impl<L: Ledger> MatchingCoordinator<L> {
    const DEFAULT_MAX_ATTEMPTS: usize = 3;

    pub fn new(queue: Arc<AssistanceQueue>, ledger: Arc<L>) -> Self {
        Self {
            queue,
            ledger,
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Overrides the claim-race retry bound.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Matches a donation to the queue head and records it.
    ///
    /// | Step | Failure | Effect |
    /// |------|---------|--------|
    /// | peek | [`QueueEmpty`](DonationError::QueueEmpty) | nothing claimed |
    /// | claim | race lost | retry from peek, bounded by `max_attempts` |
    /// | validate | [`InvalidRequest`](DonationError::InvalidRequest) | entry released |
    /// | append | [`StorageFailure`](DonationError::StorageFailure) | entry released |
    /// | resolve | — | entry served, record returned |
    ///
    /// A recipient is matched to at most one successful donation; any failure
    /// after the claim restores the recipient to its original queue position.
    pub fn donate(
        &self,
        donor: &Identity,
        amount: Decimal,
    ) -> Result<DonationRecord, DonationError> {
        for attempt in 1..=self.max_attempts {
            let Some(recipient) = self.queue.peek_next() else {
                return Err(DonationError::QueueEmpty);
            };

            let token = match self.queue.claim(&recipient) {
                Ok(token) => token,
                Err(DonationError::AlreadyClaimed) | Err(DonationError::NotFound) => {
                    // Another coordinator won the race for this head.
                    debug!(attempt, recipient = %recipient, "claim race lost, retrying");
                    continue;
                }
                Err(err) => return Err(err),
            };

            if donor.is_empty() || amount <= Decimal::ZERO {
                self.queue.resolve(token, ClaimOutcome::Released)?;
                return Err(DonationError::InvalidRequest);
            }

            let draft = DonationDraft::new(donor.clone(), recipient.clone(), amount);
            return match self.ledger.append(draft) {
                Ok(record) => {
                    self.queue.resolve(token, ClaimOutcome::Served)?;
                    debug!(donor = %donor, recipient = %recipient, %amount, "donation recorded");
                    Ok(record)
                }
                Err(err) => {
                    warn!(recipient = %recipient, error = %err, "append failed, claim released");
                    self.queue.resolve(token, ClaimOutcome::Released)?;
                    Err(match err {
                        DonationError::InvalidRecord => DonationError::InvalidRequest,
                        _ => DonationError::StorageFailure,
                    })
                }
            };
        }

        Err(DonationError::Contended)
    }
}
