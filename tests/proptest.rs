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

//! Property-based tests for the queue and the aggregation engine.
//!
//! These tests verify invariants that should hold for any sequence of
//! valid submissions and donations.

use donation_ledger_rs::{
    AggregationEngine, AssistanceQueue, ClaimOutcome, DonationError, Identity, LedgerStore,
    MatchingCoordinator,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;

// =============================================================================
// Arbitrary Strategies
// =============================================================================

/// Generate a positive amount (0.0001 to 1000 with 4 decimal places).
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..=10_000_000i64).prop_map(|cents| Decimal::new(cents, 4))
}

/// Generate a count of distinct applicant identities.
fn arb_applicant_count() -> impl Strategy<Value = usize> {
    1usize..12
}

fn applicant(i: usize) -> Identity {
    Identity::from(format!("applicant{i}@x.com"))
}

fn fill_queue(queue: &AssistanceQueue, count: usize) {
    for i in 0..count {
        queue
            .submit(applicant(i), "needs assistance", None)
            .unwrap();
    }
}

// =============================================================================
// Queue FIFO Invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Peek always returns the earliest awaiting submission.
    #[test]
    fn peek_returns_earliest_submission(count in arb_applicant_count()) {
        let queue = AssistanceQueue::new();
        fill_queue(&queue, count);

        prop_assert_eq!(queue.peek_next(), Some(applicant(0)));
    }

    /// Positions reported at submission time are 1..=n in submission order.
    #[test]
    fn positions_follow_submission_order(count in arb_applicant_count()) {
        let queue = AssistanceQueue::new();

        for i in 0..count {
            let position = queue
                .submit(applicant(i), "needs assistance", None)
                .unwrap();
            prop_assert_eq!(position.0, i + 1);
        }
    }

    /// Serving the head advances the line one entry at a time, in order.
    #[test]
    fn serving_advances_fifo(count in arb_applicant_count()) {
        let queue = AssistanceQueue::new();
        fill_queue(&queue, count);

        for i in 0..count {
            prop_assert_eq!(queue.peek_next(), Some(applicant(i)));
            let token = queue.claim(&applicant(i)).unwrap();
            queue.resolve(token, ClaimOutcome::Served).unwrap();
        }
        prop_assert_eq!(queue.peek_next(), None);
    }

    /// Any number of claim/release cycles leaves the line order untouched.
    #[test]
    fn release_cycles_preserve_order(
        count in arb_applicant_count(),
        cycles in 1usize..5,
    ) {
        let queue = AssistanceQueue::new();
        fill_queue(&queue, count);

        for _ in 0..cycles {
            let head = queue.peek_next().unwrap();
            let token = queue.claim(&head).unwrap();
            queue.resolve(token, ClaimOutcome::Released).unwrap();
        }

        // The original head is still first in line.
        prop_assert_eq!(queue.peek_next(), Some(applicant(0)));
        prop_assert_eq!(queue.pending_len(), count);
    }

    /// Duplicate submissions never grow the line.
    #[test]
    fn duplicates_never_grow_the_line(count in arb_applicant_count()) {
        let queue = AssistanceQueue::new();
        fill_queue(&queue, count);

        for i in 0..count {
            let result = queue.submit(applicant(i), "again", None);
            prop_assert_eq!(result, Err(DonationError::DuplicateApplicant));
        }
        prop_assert_eq!(queue.pending_len(), count);
    }
}

// =============================================================================
// Ledger / Aggregation Invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// The global total equals the sum of every donated amount.
    #[test]
    fn global_total_is_sum_of_donations(
        amounts in prop::collection::vec(arb_amount(), 1..10),
    ) {
        let queue = Arc::new(AssistanceQueue::new());
        let ledger = Arc::new(LedgerStore::new());
        fill_queue(&queue, amounts.len());

        let coordinator = MatchingCoordinator::new(Arc::clone(&queue), Arc::clone(&ledger));
        for amount in &amounts {
            coordinator
                .donate(&Identity::from("donor@x.com"), *amount)
                .unwrap();
        }

        let expected: Decimal = amounts.iter().copied().sum();
        let stats = AggregationEngine::new(Arc::clone(&ledger));
        let summary = stats.summary(&Identity::from("donor@x.com"));

        prop_assert_eq!(summary.global_total, expected);
        prop_assert_eq!(summary.donor_total, expected);
        prop_assert_eq!(summary.percentage, Decimal::new(100, 0));

        let scanned: Decimal = ledger.scan_all().map(|record| record.amount).sum();
        prop_assert_eq!(scanned, expected);
    }

    /// Per-donor figures are bounded by the global figures.
    #[test]
    fn donor_share_is_bounded(
        amounts in prop::collection::vec(arb_amount(), 2..10),
        donor_count in 2usize..4,
    ) {
        let queue = Arc::new(AssistanceQueue::new());
        let ledger = Arc::new(LedgerStore::new());
        fill_queue(&queue, amounts.len());

        let coordinator = MatchingCoordinator::new(Arc::clone(&queue), Arc::clone(&ledger));
        for (i, amount) in amounts.iter().enumerate() {
            let donor = Identity::from(format!("donor{}@x.com", i % donor_count));
            coordinator.donate(&donor, *amount).unwrap();
        }

        let stats = AggregationEngine::new(Arc::clone(&ledger));
        for i in 0..donor_count {
            let summary = stats.summary(&Identity::from(format!("donor{i}@x.com")));
            prop_assert!(summary.donor_total <= summary.global_total);
            prop_assert!(summary.percentage >= Decimal::ZERO);
            prop_assert!(summary.percentage <= Decimal::new(100, 0));
        }
    }

    /// Summaries are idempotent when nothing donates in between.
    #[test]
    fn summary_is_idempotent(
        amounts in prop::collection::vec(arb_amount(), 1..10),
    ) {
        let queue = Arc::new(AssistanceQueue::new());
        let ledger = Arc::new(LedgerStore::new());
        fill_queue(&queue, amounts.len());

        let coordinator = MatchingCoordinator::new(Arc::clone(&queue), Arc::clone(&ledger));
        for amount in &amounts {
            coordinator
                .donate(&Identity::from("donor@x.com"), *amount)
                .unwrap();
        }

        let stats = AggregationEngine::new(Arc::clone(&ledger));
        let donor = Identity::from("donor@x.com");
        prop_assert_eq!(stats.summary(&donor), stats.summary(&donor));
    }

    /// Record ids and timestamps are monotonic in insertion order.
    #[test]
    fn records_are_monotonic(
        amounts in prop::collection::vec(arb_amount(), 2..10),
    ) {
        let queue = Arc::new(AssistanceQueue::new());
        let ledger = Arc::new(LedgerStore::new());
        fill_queue(&queue, amounts.len());

        let coordinator = MatchingCoordinator::new(Arc::clone(&queue), Arc::clone(&ledger));
        for amount in &amounts {
            coordinator
                .donate(&Identity::from("donor@x.com"), *amount)
                .unwrap();
        }

        let records: Vec<_> = ledger.scan_all().collect();
        for pair in records.windows(2) {
            prop_assert!(pair[0].id < pair[1].id);
            prop_assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }
}
