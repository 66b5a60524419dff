//! Lead and conversation persistence.
//!
//! A small, flat data-access layer over a single-file SQLite database.
//! Leads are keyed by canonical phone number; conversation entries are
//! append-only and belong to exactly one lead.

mod import;
mod leads;

pub use import::{import_csv, ImportSummary};
pub use leads::{ConversationEntry, Lead, LeadStatus, LeadStore, NewLead};

use thiserror::Error;

/// Errors from the lead store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Import error: {0}")]
    Import(String),
}
