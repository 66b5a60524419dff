//! Bulk contact import.
//!
//! Accepts CSV with a header row; the `phone` column is required, `name`,
//! `email` and `notes` are carried when present. Rows whose phone number has
//! no canonical form, and rows for leads that already exist, are counted as
//! skipped rather than failing the import.

use tracing::{info, warn};

use crate::utils::canonicalize_phone;

use super::{LeadStore, NewLead, StoreError};

/// Outcome of a bulk import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

/// Import contacts from CSV text into the store.
pub async fn import_csv(store: &LeadStore, data: &str) -> Result<ImportSummary, StoreError> {
    let mut lines = data.lines().filter(|l| !l.trim().is_empty());

    let header = lines
        .next()
        .ok_or_else(|| StoreError::Import("empty input".to_string()))?;
    let columns = Columns::from_header(header)?;

    let mut summary = ImportSummary::default();

    for line in lines {
        let fields = split_record(line);

        let Some(raw_phone) = fields.get(columns.phone) else {
            summary.skipped += 1;
            continue;
        };
        let Some(phone) = canonicalize_phone(raw_phone) else {
            warn!(raw = %raw_phone, "Skipping row with non-canonicalizable phone");
            summary.skipped += 1;
            continue;
        };

        if store.get(&phone).await?.is_some() {
            summary.skipped += 1;
            continue;
        }

        let lead = NewLead {
            phone,
            name: columns.name.and_then(|i| non_empty(fields.get(i))),
            email: columns.email.and_then(|i| non_empty(fields.get(i))),
            notes: columns.notes.and_then(|i| non_empty(fields.get(i))),
        };

        match store.add(lead).await {
            Ok(_) => summary.imported += 1,
            Err(e) => {
                warn!("Skipping row that failed to insert: {}", e);
                summary.skipped += 1;
            }
        }
    }

    info!(
        imported = summary.imported,
        skipped = summary.skipped,
        "Contact import finished"
    );
    Ok(summary)
}

struct Columns {
    phone: usize,
    name: Option<usize>,
    email: Option<usize>,
    notes: Option<usize>,
}

impl Columns {
    fn from_header(header: &str) -> Result<Self, StoreError> {
        let names: Vec<String> = split_record(header)
            .into_iter()
            .map(|c| c.trim().to_ascii_lowercase())
            .collect();

        let find = |wanted: &[&str]| names.iter().position(|n| wanted.contains(&n.as_str()));

        let phone = find(&["phone", "phone_number", "number"])
            .ok_or_else(|| StoreError::Import("missing phone column".to_string()))?;

        Ok(Self {
            phone,
            name: find(&["name", "full_name"]),
            email: find(&["email", "email_address"]),
            notes: find(&["notes", "note", "comments"]),
        })
    }
}

/// Split one CSV record, honoring double-quoted fields with `""` escapes.
fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim_end_matches('\r').chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

fn non_empty(field: Option<&String>) -> Option<String> {
    field
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
