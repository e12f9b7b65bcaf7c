//! # glow-core: Pure Business Logic for the GLOW Ledger
//!
//! Domain types and rules for the sales ledger: products with stock,
//! customers with a running balance, sales, payments and daily plans.
//! Everything here is pure; the ledger store lives in `glow-db`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        GLOW Ledger Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Dashboard (UI event handlers)                   │   │
//! │  │   New Sale form ──► Payment dialog ──► Assignment form         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ glow-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   draft   │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │ DraftSale │  │   rules   │  │   │
//! │  │   │   Sale    │  │           │  │  totals   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  glow-db (Ledger Store)                         │   │
//! │  │        transactions, retries, repositories, migrations          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Customer, Sale, Payment, Assignment, ...)
//! - [`draft`] - Unpersisted sale/payment/assignment payloads and their math
//! - [`money`] - Money type with integer arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use glow_core::draft::{DraftLineItem, DraftSale};
//!
//! let draft = DraftSale {
//!     customer_id: "C1".to_string(),
//!     date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
//!     items: vec![DraftLineItem::new("P1", 5, 1000)],
//!     discount_cents: 0,
//!     amount_paid_cents: 3000,
//!     photo_ref: None,
//! };
//!
//! assert_eq!(draft.total().cents(), 5000);
//! assert_eq!(draft.pending_amount().cents(), 2000);
//! ```

pub mod draft;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

pub use draft::{
    AssignmentUpdate, DraftLineItem, DraftSale, NewAssignment, NewCustomer, NewExpense,
    NewProduct, NewWorkerTask, ProductUpdate, WorkerTaskUpdate,
};
pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use types::*;

/// Display name recorded when the identity lookup has nothing for a user.
pub const UNKNOWN_USER_NAME: &str = "N/A";

/// Hour of day (UTC) after which yesterday's pending worker tasks expire.
pub const TASK_EXPIRY_HOUR: u32 = 13;

/// Maximum line items in a single sale.
pub const MAX_SALE_ITEMS: usize = 500;

/// Maximum quantity of one product on a single line item.
pub const MAX_ITEM_QUANTITY: i64 = 100_000;

/// Maximum unit price in cents (100 million in major units).
pub const MAX_UNIT_PRICE_CENTS: i64 = 10_000_000_000;
