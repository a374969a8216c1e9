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

//! # Settlement Engine
//!
//! This library tracks how much of a sale has been paid across one or more
//! partial payments ("settlements"), and guarantees that concurrently
//! submitted settlements never push the paid total past the amount due.
//!
//! ## Core Components
//!
//! - [`SettlementEngine`]: Validates and commits settlements, one at a time per transaction
//! - [`Transaction`]: Sale record with cached `paid_amount`, `balance_amount` and status
//! - [`Settlement`]: Immutable ledger row for one payment
//! - [`PaymentStatus`]: Derived `unpaid` / `partial` / `paid` state
//! - [`LedgerStore`]: Storage seam, with [`MemoryStore`] as the default backend
//! - [`EventPublisher`]: Sink notified after every committed settlement
//! - [`AuditRecorder`]: Audit trail of every settlement request, successful or not
//! - [`SettlementError`]: Error types for settlement failures
//!
//! ## Example
//!
//! ```
//! use settlement_engine_rs::{
//!     CashierId, PaymentMode, PaymentStatus, SettlementEngine, SettlementError, TransactionId,
//! };
//! use rust_decimal_macros::dec;
//!
//! let engine = SettlementEngine::new();
//! engine.create_transaction(TransactionId(1), dec!(1000.00)).unwrap();
//!
//! // Pay part of it
//! let receipt = engine
//!     .create_settlement(TransactionId(1), dec!(600.00), PaymentMode::Cash, CashierId(7))
//!     .unwrap();
//! assert_eq!(receipt.transaction.payment_status(), PaymentStatus::Partial);
//!
//! // Overpaying is rejected with the remaining balance
//! let err = engine
//!     .create_settlement(TransactionId(1), dec!(500.00), PaymentMode::Gcash, CashierId(7))
//!     .unwrap_err();
//! assert_eq!(
//!     err,
//!     SettlementError::Overpayment { amount: dec!(500.00), remaining: dec!(400.00) }
//! );
//! ```
//!
//! ## Thread Safety
//!
//! The engine is `Sync`. Settlements for the same transaction are serialized
//! behind a per-transaction lock with a bounded wait; settlements for
//! different transactions run in parallel.

pub mod audit;
mod base;
pub mod config;
mod engine;
pub mod error;
pub mod event;
pub mod guard;
mod memory_store;
pub mod money;
mod settlement;
mod status;
pub mod store;
mod transaction;

pub use audit::{AuditRecord, AuditRecorder, AuditStage, ChannelAuditRecorder, NoopAuditRecorder};
pub use base::{CashierId, SettlementId, TraceId, TransactionId};
pub use config::EngineConfig;
pub use engine::{SettlementEngine, SettlementReceipt};
pub use error::{ErrorKind, SettlementError, StoreError};
pub use event::{ChannelPublisher, EventPublisher, NoopPublisher, SettlementEvent, SettlementEventKind};
pub use guard::ConcurrencyGuard;
pub use memory_store::MemoryStore;
pub use settlement::{PaymentMode, Settlement};
pub use status::PaymentStatus;
pub use store::{LedgerSnapshot, LedgerStore, SettlementCommit};
pub use transaction::Transaction;
