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

use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use donation_ledger_rs::{
    AggregationEngine, AssistanceQueue, Identity, LedgerStore, MatchingCoordinator, Tier,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::warn;

/// Donation Ledger - Process operation CSV files
///
/// Reads queue submissions and donations from a CSV file and outputs either
/// per-donor contribution summaries or the raw ledger to stdout.
#[derive(Parser, Debug)]
#[command(name = "donation-ledger-rs")]
#[command(about = "Replays donation operation CSVs against the assistance queue", long_about = None)]
struct Args {
    /// Path to CSV file with operations
    ///
    /// Expected format: op,identity,amount,description,proof
    /// Example: cargo run -- operations.csv > summaries.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output every ledger record instead of per-donor summaries
    #[arg(long)]
    records: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "donation_ledger_rs=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let (_queue, ledger) = match process_operations(BufReader::new(file)) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Error processing operations: {}", e);
            process::exit(1);
        }
    };

    let result = if args.records {
        write_records(&ledger, std::io::stdout())
    } else {
        write_summaries(&ledger, std::io::stdout())
    };
    if let Err(e) = result {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `op, identity, amount, description, proof`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    op: String,
    identity: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    amount: Option<Decimal>,
    description: Option<String>,
    proof: Option<String>,
}

/// One replayable operation against the core.
#[derive(Debug)]
enum Operation {
    Submit {
        identity: Identity,
        description: String,
        proof: Option<String>,
    },
    Donate {
        donor: Identity,
        amount: Decimal,
    },
}

impl CsvRecord {
    /// Converts a CSV record to an operation.
    ///
    /// Returns `None` for unknown operations or missing required fields.
    fn into_operation(self) -> Option<Operation> {
        match self.op.to_lowercase().as_str() {
            "submit" => Some(Operation::Submit {
                identity: Identity::from(self.identity),
                description: self.description.unwrap_or_default(),
                proof: self.proof.filter(|name| !name.is_empty()),
            }),
            "donate" => {
                let amount = self.amount?;
                Some(Operation::Donate {
                    donor: Identity::from(self.identity),
                    amount,
                })
            }
            _ => None,
        }
    }
}

/// Replays operations from a CSV reader against a fresh queue and ledger.
///
/// Streaming parse, so arbitrarily large files never load fully into memory.
/// Malformed rows and rejected operations are logged and skipped.
///
/// # CSV Format
///
/// Expected columns: `op, identity, amount, description, proof`
/// - `op`: Operation (submit, donate)
/// - `identity`: Applicant email for submit, donor email for donate
/// - `amount`: Decimal donation amount (donate only)
/// - `description`, `proof`: Applicant metadata (submit only)
///
/// # Example
///
/// ```csv
/// op,identity,amount,description,proof
/// submit,applicant@x.com,,needs rent assistance,paystub.pdf
/// donate,donor@x.com,50.00,,
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is invalid.
pub fn process_operations<R: Read>(
    reader: R,
) -> Result<(Arc<AssistanceQueue>, Arc<LedgerStore>), csv::Error> {
    let queue = Arc::new(AssistanceQueue::new());
    let ledger = Arc::new(LedgerStore::new());
    let coordinator = MatchingCoordinator::new(Arc::clone(&queue), Arc::clone(&ledger));

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    for result in rdr.deserialize::<CsvRecord>() {
        match result {
            Ok(record) => {
                let Some(op) = record.into_operation() else {
                    warn!("skipping invalid operation record");
                    continue;
                };

                let outcome = match op {
                    Operation::Submit {
                        identity,
                        description,
                        proof,
                    } => queue.submit(identity, description, proof).map(|_| ()),
                    Operation::Donate { donor, amount } => {
                        coordinator.donate(&donor, amount).map(|_| ())
                    }
                };
                if let Err(e) = outcome {
                    warn!("skipping operation: {}", e);
                }
            }
            Err(e) => {
                warn!("skipping malformed row: {}", e);
                continue;
            }
        }
    }

    Ok((queue, ledger))
}

/// Output row for per-donor summaries, percentage rounded for display.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryRow {
    donor: Identity,
    donor_total: Decimal,
    global_total: Decimal,
    percentage: Decimal,
    tier: Tier,
}

/// Writes per-donor contribution summaries as CSV.
///
/// Columns: `donor, donorTotal, globalTotal, percentage, tier`
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_summaries<W: Write>(ledger: &Arc<LedgerStore>, writer: W) -> Result<(), csv::Error> {
    let stats = AggregationEngine::new(Arc::clone(ledger));
    let mut wtr = Writer::from_writer(writer);

    for donor in stats.donors() {
        let summary = stats.summary(&donor);
        wtr.serialize(SummaryRow {
            donor,
            donor_total: summary.donor_total,
            global_total: summary.global_total,
            percentage: summary.percentage.round_dp(2),
            tier: summary.tier,
        })?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes the raw ledger as CSV in insertion order.
///
/// Columns: `id, donorIdentity, recipientIdentity, amount, timestamp`
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_records<W: Write>(ledger: &Arc<LedgerStore>, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    for record in ledger.scan_all() {
        wtr.serialize(&*record)?;
    }

    wtr.flush()?;
    Ok(())
}
