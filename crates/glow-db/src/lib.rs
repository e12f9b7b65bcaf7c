//! # glow-db: Ledger Store for GLOW
//!
//! SQLite-backed ledger for the GLOW sales dashboard. Every operation that
//! touches more than one record (a sale, a payment, an assignment rotation)
//! runs as a single transaction that is re-run from scratch when a
//! concurrent writer wins.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        GLOW Data Flow                                   │
//! │                                                                         │
//! │  Dashboard handler (New Sale, Record Payment, Assign Plan)             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     glow-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ SaleRepo      │    │ 001_initial  │  │   │
//! │  │   │ SqlitePool    │◄───│ PaymentRepo   │    │   _schema    │  │   │
//! │  │   │ Clock         │    │ AssignmentRepo│    └──────────────┘  │   │
//! │  │   │ Identity      │    │ Product, ...  │                      │   │
//! │  │   │ RetryPolicy   │    └───────────────┘                      │   │
//! │  │   └───────────────┘                                            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL)                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool and the [`Database`] handle
//! - [`config`] - Layered TOML / environment configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - [`DbError`] and the UI-facing [`ApiError`]
//! - [`retry`] - Conflict retry loop for ledger transactions
//! - [`services`] - Identity, clock and photo collaborators
//! - [`repository`] - Ledger and CRUD repositories
//! - [`settings`] - App settings cache
//!
//! ## Usage
//!
//! ```rust,ignore
//! use glow_db::{Database, LedgerConfig};
//!
//! let config = LedgerConfig::load(None)?;
//! let db = Database::new(config.db_config())
//!     .await?
//!     .with_retry_policy(config.retry_policy());
//!
//! let sale_id = db.sales().record_sale(&draft, &salesman_uid).await?;
//! db.payments().record_payment(&sale_id, 2000, &cashier_uid).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod retry;
pub mod services;
pub mod settings;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::LedgerConfig;
pub use error::{ApiError, DbError, DbResult, ErrorCode};
pub use pool::{Database, DbConfig};
pub use retry::{with_retry, RetryPolicy};
pub use services::{Clock, FixedClock, IdentityResolver, PhotoStore, SystemClock};
pub use settings::{SettingsCache, SettingsRepository};

pub use repository::assignment::AssignmentRepository;
pub use repository::customer::CustomerRepository;
pub use repository::expense::ExpenseRepository;
pub use repository::payment::PaymentRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
pub use repository::user::UserRepository;
pub use repository::worker_task::WorkerTaskRepository;
