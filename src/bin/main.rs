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
use serde::Deserialize;
use settlement_engine_rs::money::parse_amount;
use settlement_engine_rs::{
    CashierId, EngineConfig, MemoryStore, NoopPublisher, PaymentMode, SettlementEngine,
    SettlementError, TransactionId,
};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Settlement Engine - Replay sales and settlements from a CSV file
///
/// Reads sales and settlements from a CSV file and outputs the final state
/// of every transaction to stdout.
#[derive(Parser, Debug)]
#[command(name = "settlement-engine-rs")]
#[command(about = "Replays sale and settlement CSVs through the settlement engine", long_about = None)]
struct Args {
    /// Path to CSV file with operations
    ///
    /// Expected format: type,transaction,amount,mode,cashier
    /// Example: cargo run -- operations.csv > transactions.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Maximum wait for a transaction's lock, in milliseconds
    #[arg(long, env = "SETTLEMENT_LOCK_TIMEOUT_MS", default_value_t = EngineConfig::DEFAULT_LOCK_TIMEOUT_MS)]
    lock_timeout_ms: u64,

    /// Log every step of every settlement at debug level
    #[arg(long, env = "SETTLEMENT_TRACING")]
    trace_settlements: bool,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = EngineConfig::default()
        .with_lock_timeout(Duration::from_millis(args.lock_timeout_ms))
        .with_settlement_tracing(args.trace_settlements);

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            tracing::error!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let engine = match process_operations(BufReader::new(file), config) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("Error processing operations: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = write_transactions(&engine, std::io::stdout()) {
        tracing::error!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `type, transaction, amount, mode, cashier`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(rename = "type")]
    op_type: String,
    transaction: u64,
    amount: String,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    cashier: Option<u32>,
}

#[derive(Debug)]
enum Operation {
    Sale {
        transaction_id: TransactionId,
        amount_due: rust_decimal::Decimal,
    },
    Settlement {
        transaction_id: TransactionId,
        amount: rust_decimal::Decimal,
        payment_mode: PaymentMode,
        cashier_id: CashierId,
    },
}

impl CsvRecord {
    /// Converts the record into an operation, validating amount and payment mode.
    fn into_operation(self) -> Result<Operation, String> {
        let transaction_id = TransactionId(self.transaction);
        let amount = parse_amount(&self.amount).map_err(|e| e.to_string())?;

        match self.op_type.to_lowercase().as_str() {
            "sale" => Ok(Operation::Sale {
                transaction_id,
                amount_due: amount,
            }),
            "settlement" => {
                let payment_mode = self
                    .mode
                    .as_deref()
                    .ok_or("missing payment mode")?
                    .parse::<PaymentMode>()
                    .map_err(|e| e.to_string())?;
                let cashier_id = CashierId(self.cashier.ok_or("missing cashier")?);
                Ok(Operation::Settlement {
                    transaction_id,
                    amount,
                    payment_mode,
                    cashier_id,
                })
            }
            other => Err(format!("unknown operation type '{}'", other)),
        }
    }
}

/// Process operations from a CSV reader.
///
/// Rows are streamed, so arbitrarily large files are processed without
/// loading them into memory. Malformed rows and rejected operations are
/// logged and skipped.
///
/// # CSV Format
///
/// Expected columns: `type, transaction, amount, mode, cashier`
/// - `type`: `sale` or `settlement`
/// - `transaction`: Transaction ID (u64)
/// - `amount`: Amount due for a sale, amount paid for a settlement
/// - `mode`: Payment mode (settlements only)
/// - `cashier`: Cashier ID (settlements only)
///
/// # Example
///
/// ```csv
/// type,transaction,amount,mode,cashier
/// sale,1,1000.00,,
/// settlement,1,600.00,cash,7
/// settlement,1,500.00,gcash,7
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is invalid.
pub fn process_operations<R: Read>(
    reader: R,
    config: EngineConfig,
) -> Result<SettlementEngine<MemoryStore, NoopPublisher>, csv::Error> {
    let engine = SettlementEngine::with_parts(MemoryStore::new(), NoopPublisher, config);

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true) // Sales leave mode and cashier empty
        .has_headers(true)
        .from_reader(reader);

    for result in rdr.deserialize::<CsvRecord>() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!("Skipping malformed row: {}", e);
                continue;
            }
        };

        let operation = match record.into_operation() {
            Ok(operation) => operation,
            Err(e) => {
                tracing::debug!("Skipping invalid record: {}", e);
                continue;
            }
        };

        if let Err(e) = apply(&engine, operation) {
            tracing::info!("Skipping operation: {}", e);
        }
    }

    Ok(engine)
}

fn apply(
    engine: &SettlementEngine<MemoryStore, NoopPublisher>,
    operation: Operation,
) -> Result<(), SettlementError> {
    match operation {
        Operation::Sale {
            transaction_id,
            amount_due,
        } => {
            engine.create_transaction(transaction_id, amount_due)?;
        }
        Operation::Settlement {
            transaction_id,
            amount,
            payment_mode,
            cashier_id,
        } => {
            engine.create_settlement(transaction_id, amount, payment_mode, cashier_id)?;
        }
    }
    Ok(())
}

/// Write transaction states to a CSV writer, ordered by transaction id.
///
/// # CSV Format
///
/// Columns: `transaction, amount_due, paid_amount, balance_amount, payment_status`
///
/// ```csv
/// transaction,amount_due,paid_amount,balance_amount,payment_status
/// 1,1000.00,600.00,400.00,partial
/// ```
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_transactions<W: Write>(
    engine: &SettlementEngine<MemoryStore, NoopPublisher>,
    writer: W,
) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    for transaction in engine.store().transactions() {
        wtr.serialize(&transaction)?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use settlement_engine_rs::PaymentStatus;
    use std::io::Cursor;

    fn run(csv: &str) -> SettlementEngine<MemoryStore, NoopPublisher> {
        process_operations(Cursor::new(csv.to_string()), EngineConfig::default()).unwrap()
    }

    #[test]
    fn parse_sale_and_settlement() {
        let engine = run("type,transaction,amount,mode,cashier\n\
                          sale,1,1000.00,,\n\
                          settlement,1,600.00,cash,7\n");

        let tx = engine.get_transaction(TransactionId(1)).unwrap();
        assert_eq!(tx.paid_amount(), dec!(600.00));
        assert_eq!(tx.payment_status(), PaymentStatus::Partial);
    }

    #[test]
    fn overpayment_row_is_skipped() {
        let engine = run("type,transaction,amount,mode,cashier\n\
                          sale,1,1000.00,,\n\
                          settlement,1,300.00,cash,1\n\
                          settlement,1,350.00,gcash,1\n\
                          settlement,1,400.00,maya,1\n");

        let tx = engine.get_transaction(TransactionId(1)).unwrap();
        assert_eq!(tx.paid_amount(), dec!(650.00));
        assert_eq!(engine.get_settlements(TransactionId(1)).unwrap().len(), 2);
    }

    #[test]
    fn parse_with_whitespace() {
        let engine = run("type,transaction,amount,mode,cashier\n \
                          sale , 1 , 50.00 , , \n \
                          settlement , 1 , 50.00 , Credit_Card , 2 \n");

        let tx = engine.get_transaction(TransactionId(1)).unwrap();
        assert_eq!(tx.payment_status(), PaymentStatus::Paid);
    }

    #[test]
    fn skip_invalid_rows() {
        let engine = run("type,transaction,amount,mode,cashier\n\
                          sale,1,100.00,,\n\
                          settlement,1,10.00,cheque,1\n\
                          settlement,1,10.001,cash,1\n\
                          settlement,1,10.00,cash,\n\
                          refund,1,10.00,cash,1\n\
                          settlement,abc,10.00,cash,1\n\
                          settlement,2,10.00,cash,1\n\
                          sale,3,100.00,,\n");

        assert!(engine.get_settlements(TransactionId(1)).unwrap().is_empty());
        assert!(engine.get_transaction(TransactionId(2)).is_err());
        assert_eq!(engine.store().len(), 2);
    }

    #[test]
    fn write_transactions_to_csv() {
        let engine = run("type,transaction,amount,mode,cashier\n\
                          sale,2,999.99,,\n\
                          sale,1,1000,,\n\
                          settlement,2,333.33,cash,1\n\
                          settlement,2,333.33,cash,1\n\
                          settlement,2,333.33,cash,1\n");

        let mut output = Vec::new();
        write_transactions(&engine, &mut output).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_eq!(
            output,
            "transaction,amount_due,paid_amount,balance_amount,payment_status\n\
             1,1000.00,0.00,1000.00,unpaid\n\
             2,999.99,999.99,0.00,paid\n"
        );
    }
}
