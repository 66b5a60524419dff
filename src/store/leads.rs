//! Lead store over SQLite.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{info, warn};

use super::StoreError;

/// Lead lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Called,
    CallCompleted,
    Failed,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Called => "called",
            LeadStatus::CallCompleted => "call_completed",
            LeadStatus::Failed => "failed",
        }
    }
}

/// A persisted lead, keyed by canonical phone number.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lead {
    pub phone: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub status: LeadStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a lead.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewLead {
    pub phone: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// One conversation entry. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConversationEntry {
    pub id: i64,
    pub phone: String,
    pub content: String,
    pub from_ai: bool,
    pub created_at: DateTime<Utc>,
}

/// CRUD over leads and conversation history.
#[derive(Debug, Clone)]
pub struct LeadStore {
    pool: SqlitePool,
}

impl LeadStore {
    /// Open (creating if missing) the database at `url` and ensure the
    /// schema exists.
    ///
    /// A single pooled connection keeps all writes serialized, which is all
    /// SQLite supports anyway and makes `sqlite::memory:` databases behave.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS leads (
                phone      TEXT PRIMARY KEY,
                name       TEXT,
                email      TEXT,
                status     TEXT NOT NULL DEFAULT 'new',
                notes      TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                phone      TEXT NOT NULL REFERENCES leads(phone),
                content    TEXT NOT NULL,
                from_ai    BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        info!(url, "Lead store ready");
        Ok(Self { pool })
    }

    pub async fn get(&self, phone: &str) -> Result<Option<Lead>, StoreError> {
        let lead = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE phone = ?")
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;
        Ok(lead)
    }

    pub async fn list(&self) -> Result<Vec<Lead>, StoreError> {
        let leads = sqlx::query_as::<_, Lead>("SELECT * FROM leads ORDER BY created_at, phone")
            .fetch_all(&self.pool)
            .await?;
        Ok(leads)
    }

    /// Leads that have not been dialed yet, oldest first.
    pub async fn pending(&self) -> Result<Vec<Lead>, StoreError> {
        let leads = sqlx::query_as::<_, Lead>(
            "SELECT * FROM leads WHERE status = 'new' ORDER BY created_at, phone",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(leads)
    }

    /// Insert a lead with status `new`. `phone` must already be canonical.
    pub async fn add(&self, lead: NewLead) -> Result<Lead, StoreError> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO leads (phone, name, email, status, notes, created_at)
             VALUES (?, ?, ?, 'new', ?, ?)",
        )
        .bind(&lead.phone)
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.notes)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Lead {
            phone: lead.phone,
            name: lead.name,
            email: lead.email,
            status: LeadStatus::New,
            notes: lead.notes,
            created_at: now,
        })
    }

    pub async fn update_status(&self, phone: &str, status: LeadStatus) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE leads SET status = ? WHERE phone = ?")
            .bind(status)
            .bind(phone)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            warn!(phone, status = status.as_str(), "Status update for unknown lead");
        }
        Ok(())
    }

    /// Record the email captured for a lead, creating the lead when it is
    /// missing (calls can come from numbers that were never imported).
    pub async fn update_email(&self, phone: &str, email: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE leads SET email = ? WHERE phone = ?")
            .bind(email)
            .bind(phone)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            warn!(phone, "Email captured for unknown lead, creating it");
            sqlx::query(
                "INSERT INTO leads (phone, email, status, created_at) VALUES (?, ?, 'new', ?)",
            )
            .bind(phone)
            .bind(email)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    pub async fn append_conversation(
        &self,
        phone: &str,
        content: &str,
        from_ai: bool,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO conversations (phone, content, from_ai, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(phone)
        .bind(content)
        .bind(from_ai)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn conversations(&self, phone: &str) -> Result<Vec<ConversationEntry>, StoreError> {
        let entries = sqlx::query_as::<_, ConversationEntry>(
            "SELECT * FROM conversations WHERE phone = ? ORDER BY id",
        )
        .bind(phone)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> LeadStore {
        LeadStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_add_and_get() {
        let store = store().await;
        store
            .add(NewLead {
                phone: "+15551234567".to_string(),
                name: Some("Jane".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let lead = store.get("+15551234567").await.unwrap().unwrap();
        assert_eq!(lead.name.as_deref(), Some("Jane"));
        assert_eq!(lead.status, LeadStatus::New);
        assert!(lead.email.is_none());

        assert!(store.get("+15550000000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_phone_rejected() {
        let store = store().await;
        let lead = NewLead {
            phone: "+15551234567".to_string(),
            ..Default::default()
        };
        store.add(lead.clone()).await.unwrap();
        assert!(store.add(lead).await.is_err());
    }

    #[tokio::test]
    async fn test_update_status() {
        let store = store().await;
        store
            .add(NewLead {
                phone: "+15551234567".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        store
            .update_status("+15551234567", LeadStatus::CallCompleted)
            .await
            .unwrap();
        let lead = store.get("+15551234567").await.unwrap().unwrap();
        assert_eq!(lead.status, LeadStatus::CallCompleted);

        // Unknown lead is a logged no-op, not an error
        store
            .update_status("+15550000000", LeadStatus::Called)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_email_existing_lead() {
        let store = store().await;
        store
            .add(NewLead {
                phone: "+15551234567".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        store
            .update_email("+15551234567", "jane@example.com")
            .await
            .unwrap();
        let lead = store.get("+15551234567").await.unwrap().unwrap();
        assert_eq!(lead.email.as_deref(), Some("jane@example.com"));
    }

    #[tokio::test]
    async fn test_update_email_upserts_missing_lead() {
        let store = store().await;
        store
            .update_email("+15559998888", "new@example.com")
            .await
            .unwrap();

        let lead = store.get("+15559998888").await.unwrap().unwrap();
        assert_eq!(lead.email.as_deref(), Some("new@example.com"));
        assert_eq!(lead.status, LeadStatus::New);
    }

    #[tokio::test]
    async fn test_conversations_append_only_in_order() {
        let store = store().await;
        store
            .add(NewLead {
                phone: "+15551234567".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        store
            .append_conversation("+15551234567", "[caller audio]", false)
            .await
            .unwrap();
        store
            .append_conversation("+15551234567", "Happy to help!", true)
            .await
            .unwrap();

        let entries = store.conversations("+15551234567").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(!entries[0].from_ai);
        assert!(entries[1].from_ai);
        assert_eq!(entries[1].content, "Happy to help!");
    }

    #[tokio::test]
    async fn test_pending_filters_by_status() {
        let store = store().await;
        for phone in ["+15551110001", "+15551110002", "+15551110003"] {
            store
                .add(NewLead {
                    phone: phone.to_string(),
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        store
            .update_status("+15551110002", LeadStatus::Called)
            .await
            .unwrap();

        let pending = store.pending().await.unwrap();
        let phones: Vec<_> = pending.iter().map(|l| l.phone.as_str()).collect();
        assert_eq!(phones, vec!["+15551110001", "+15551110003"]);
    }
}
