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

//! Error types for the donation ledger and assistance queue.

use thiserror::Error;

/// Donation processing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DonationError {
    /// Donor-side input is unusable (empty donor, non-positive amount)
    #[error("invalid donation request")]
    InvalidRequest,

    /// Record failed ledger validation (empty identity, non-positive amount)
    #[error("invalid ledger record")]
    InvalidRecord,

    /// An entry for this applicant is already awaiting or claimed
    #[error("applicant already in the queue")]
    DuplicateApplicant,

    /// Another donation holds the claim on this entry
    #[error("entry already claimed")]
    AlreadyClaimed,

    /// Claim retries exhausted under contention
    #[error("queue head contended, try again")]
    Contended,

    /// No applicant is awaiting assistance
    #[error("no applicants in the queue")]
    QueueEmpty,

    /// No claimable entry exists for the identity
    #[error("applicant not found")]
    NotFound,

    /// The ledger store could not persist the record
    #[error("ledger storage unavailable")]
    StorageFailure,

    /// Token does not match a live claim
    #[error("claim token is not valid")]
    InvalidToken,
}
