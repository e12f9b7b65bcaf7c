//! # Collaborator Services
//!
//! The ledger consumes three things it does not own: a user directory, a
//! clock, and (for sales with a receipt photo) a blob uploader.
//!
//! ```text
//! ┌──────────────────────┐    resolve_user_name(uid)    ┌──────────────────┐
//! │  Sale / Payment /    │ ───────────────────────────► │ IdentityResolver │
//! │  Assignment flows    │                              │ (UserRepository) │
//! │                      │    now()                     ├──────────────────┤
//! │                      │ ───────────────────────────► │ Clock            │
//! │                      │    upload_photo(bytes, path) ├──────────────────┤
//! │                      │ ───────────────────────────► │ PhotoStore       │
//! └──────────────────────┘                              └──────────────────┘
//! ```
//!
//! Identity lookups and uploads always happen before a ledger transaction
//! opens, never inside a retried attempt.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DbResult;

/// Maps a user id to a display name.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// `Ok(None)` when the user is unknown or has neither a name nor an email.
    async fn resolve_user_name(&self, uid: &str) -> DbResult<Option<String>>;
}

/// Stores a receipt photo and returns a URL the dashboard can load.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn upload_photo(&self, bytes: &[u8], path: &str) -> DbResult<String>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant. Used by tests and the seeder.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
