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

//! Benchmarks for the donation matching core.
//!
//! Run with: cargo bench
//!
//! Benchmarks include:
//! - Queue submission throughput
//! - Single-threaded donation throughput
//! - Multi-threaded donation contention
//! - Summary computation against growing ledger history

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use donation_ledger_rs::{
    AggregationEngine, AssistanceQueue, ClaimOutcome, Identity, LedgerStore, MatchingCoordinator,
};
use rayon::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;

// =============================================================================
// Helper Functions
// =============================================================================

fn applicant(i: usize) -> Identity {
    Identity::from(format!("applicant{i}@x.com"))
}

fn donor(i: usize) -> Identity {
    Identity::from(format!("donor{i}@x.com"))
}

fn amount() -> Decimal {
    Decimal::new(10_000, 4)
}

fn filled_queue(count: usize) -> Arc<AssistanceQueue> {
    let queue = Arc::new(AssistanceQueue::new());
    for i in 0..count {
        queue.submit(applicant(i), "assistance", None).unwrap();
    }
    queue
}

// =============================================================================
// Queue Benchmarks
// =============================================================================

fn bench_submit_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_throughput");

    for count in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let queue = AssistanceQueue::new();
                for i in 0..count {
                    queue.submit(applicant(i), "assistance", None).unwrap();
                }
                black_box(&queue);
            })
        });
    }
    group.finish();
}

fn bench_claim_release_cycle(c: &mut Criterion) {
    c.bench_function("claim_release_cycle", |b| {
        let queue = filled_queue(1);
        let head = applicant(0);
        b.iter(|| {
            let token = queue.claim(black_box(&head)).unwrap();
            queue.resolve(token, ClaimOutcome::Released).unwrap();
        })
    });
}

fn bench_peek_with_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("peek_with_depth");

    for depth in [10, 1_000, 100_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(depth), depth, |b, &depth| {
            let queue = filled_queue(depth);
            b.iter(|| black_box(queue.peek_next()))
        });
    }
    group.finish();
}

// =============================================================================
// Donation Benchmarks
// =============================================================================

fn bench_single_donation(c: &mut Criterion) {
    c.bench_function("single_donation", |b| {
        b.iter_batched(
            || {
                let queue = filled_queue(1);
                let ledger = Arc::new(LedgerStore::new());
                MatchingCoordinator::new(queue, ledger)
            },
            |coordinator| {
                coordinator
                    .donate(black_box(&donor(0)), black_box(amount()))
                    .unwrap();
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_donation_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("donation_throughput");

    for count in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter_batched(
                || {
                    let queue = filled_queue(count);
                    let ledger = Arc::new(LedgerStore::new());
                    MatchingCoordinator::new(queue, ledger)
                },
                |coordinator| {
                    for i in 0..count {
                        coordinator.donate(&donor(i), amount()).unwrap();
                    }
                    black_box(&coordinator);
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_parallel_donations(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_donations");

    for count in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter_batched(
                || {
                    let queue = filled_queue(count);
                    let ledger = Arc::new(LedgerStore::new());
                    (queue, ledger)
                },
                |(queue, ledger)| {
                    // Every donor fights for the current head, so this
                    // measures the claim path under maximum contention.
                    (0..count).into_par_iter().for_each(|i| {
                        let coordinator = MatchingCoordinator::new(
                            Arc::clone(&queue),
                            Arc::clone(&ledger),
                        )
                        .with_max_attempts(count);
                        let _ = coordinator.donate(&donor(i), amount());
                    });
                    black_box(&ledger);
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

// =============================================================================
// Aggregation Benchmarks
// =============================================================================

fn bench_summary_history_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("summary_history_scaling");

    for history_size in [100, 1_000, 10_000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(history_size),
            history_size,
            |b, &history_size| {
                let queue = filled_queue(history_size);
                let ledger = Arc::new(LedgerStore::new());
                let coordinator =
                    MatchingCoordinator::new(Arc::clone(&queue), Arc::clone(&ledger));
                for i in 0..history_size {
                    coordinator.donate(&donor(i % 10), amount()).unwrap();
                }

                let stats = AggregationEngine::new(Arc::clone(&ledger));
                let target = donor(0);
                b.iter(|| black_box(stats.summary(&target)))
            },
        );
    }
    group.finish();
}

// =============================================================================
// Criterion Groups
// =============================================================================

criterion_group!(
    queue,
    bench_submit_throughput,
    bench_claim_release_cycle,
    bench_peek_with_depth,
);

criterion_group!(
    donations,
    bench_single_donation,
    bench_donation_throughput,
    bench_parallel_donations,
);

criterion_group!(aggregation, bench_summary_history_scaling,);

criterion_main!(queue, donations, aggregation);
