use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use lexmetric_core::{
    AuditFlag, AuditSession, FlagId, Money, SessionId, SessionStatus, Transaction, TransactionId,
};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use thiserror::Error;

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("Corrupt {column} value '{value}': {reason}")]
    Corrupt {
        column: &'static str,
        value: String,
        reason: String,
    },
}

pub async fn create_db(path: &Path) -> Result<DbPool, StorageError> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_sessions (
            id TEXT PRIMARY KEY,
            client_name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'DRAFT',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            session_id TEXT NOT NULL,
            id TEXT NOT NULL,
            position INTEGER NOT NULL,
            date TEXT NOT NULL,
            description TEXT NOT NULL,
            amount TEXT NOT NULL,
            category TEXT,
            source_file TEXT NOT NULL,
            page_number INTEGER NOT NULL,
            PRIMARY KEY (session_id, id),
            FOREIGN KEY (session_id) REFERENCES audit_sessions(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_flags (
            session_id TEXT NOT NULL,
            id TEXT NOT NULL,
            position INTEGER NOT NULL,
            transaction_id TEXT NOT NULL,
            rule_id TEXT NOT NULL,
            risk_level TEXT NOT NULL,
            label TEXT NOT NULL,
            description TEXT NOT NULL,
            caseworker_insight TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'PENDING',
            notes TEXT,
            PRIMARY KEY (session_id, id),
            FOREIGN KEY (session_id) REFERENCES audit_sessions(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ingested_files (
            session_id TEXT NOT NULL,
            hash_hex TEXT NOT NULL,
            position INTEGER NOT NULL,
            PRIMARY KEY (session_id, hash_hex),
            FOREIGN KEY (session_id) REFERENCES audit_sessions(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_flags_session ON audit_flags(session_id, position)")
        .execute(pool)
        .await?;

    Ok(())
}

fn parse<T>(column: &'static str, value: &str) -> Result<T, StorageError>
where
    T: FromStr,
    T::Err: Display,
{
    value.parse::<T>().map_err(|e| StorageError::Corrupt {
        column,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

// ── Sessions ──────────────────────────────────────────────────────────────────

/// Write the whole session. The session row is upserted; its transactions,
/// flags and ingested hashes are replaced in the same database transaction.
pub async fn save_session(pool: &DbPool, session: &AuditSession) -> Result<(), StorageError> {
    let session_id = session.id.to_string();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"INSERT INTO audit_sessions (id, client_name, status, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?)
           ON CONFLICT(id) DO UPDATE SET
               client_name = excluded.client_name,
               status = excluded.status,
               updated_at = excluded.updated_at"#,
    )
    .bind(&session_id)
    .bind(&session.client_name)
    .bind(session.status.to_string())
    .bind(session.created_at)
    .bind(session.updated_at)
    .execute(&mut *tx)
    .await?;

    for table in ["transactions", "audit_flags", "ingested_files"] {
        sqlx::query(&format!("DELETE FROM {table} WHERE session_id = ?"))
            .bind(&session_id)
            .execute(&mut *tx)
            .await?;
    }

    for (position, t) in session.transactions.iter().enumerate() {
        sqlx::query(
            r#"INSERT INTO transactions
               (session_id, id, position, date, description, amount, category, source_file, page_number)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&session_id)
        .bind(t.id.to_string())
        .bind(position as i64)
        .bind(&t.date)
        .bind(&t.description)
        .bind(t.amount.as_decimal().to_string())
        .bind(&t.category)
        .bind(&t.source_file)
        .bind(t.page_number as i64)
        .execute(&mut *tx)
        .await?;
    }

    for (position, f) in session.flags.iter().enumerate() {
        sqlx::query(
            r#"INSERT INTO audit_flags
               (session_id, id, position, transaction_id, rule_id, risk_level, label,
                description, caseworker_insight, status, notes)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&session_id)
        .bind(f.id.to_string())
        .bind(position as i64)
        .bind(f.transaction_id.to_string())
        .bind(f.rule_id.as_str())
        .bind(f.risk_level.to_string())
        .bind(&f.label)
        .bind(&f.description)
        .bind(&f.caseworker_insight)
        .bind(f.status.to_string())
        .bind(&f.notes)
        .execute(&mut *tx)
        .await?;
    }

    for (position, hash) in session.ingested_hashes.iter().enumerate() {
        sqlx::query("INSERT OR IGNORE INTO ingested_files (session_id, hash_hex, position) VALUES (?, ?, ?)")
            .bind(&session_id)
            .bind(hash)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::debug!(
        session = %session.id,
        transactions = session.transactions.len(),
        flags = session.flags.len(),
        "Session saved"
    );
    Ok(())
}

pub async fn get_session(pool: &DbPool, id: SessionId) -> Result<Option<AuditSession>, StorageError> {
    let session_id = id.to_string();
    let row = sqlx::query_as::<_, (String, String, DateTime<Utc>, DateTime<Utc>)>(
        "SELECT client_name, status, created_at, updated_at FROM audit_sessions WHERE id = ?",
    )
    .bind(&session_id)
    .fetch_optional(pool)
    .await?;

    let Some((client_name, status, created_at, updated_at)) = row else {
        return Ok(None);
    };

    let tx_rows = sqlx::query_as::<_, (String, String, String, String, Option<String>, String, i64)>(
        r#"SELECT id, date, description, amount, category, source_file, page_number
           FROM transactions WHERE session_id = ? ORDER BY position"#,
    )
    .bind(&session_id)
    .fetch_all(pool)
    .await?;

    let mut transactions = Vec::with_capacity(tx_rows.len());
    for (tid, date, description, amount, category, source_file, page_number) in tx_rows {
        let amount: Decimal = parse("transactions.amount", &amount)?;
        transactions.push(Transaction {
            id: parse::<TransactionId>("transactions.id", &tid)?,
            date,
            description,
            amount: Money::from_decimal(amount),
            category,
            source_file,
            page_number: page_number as u32,
        });
    }

    let flag_rows = sqlx::query_as::<
        _,
        (String, String, String, String, String, String, String, String, Option<String>),
    >(
        r#"SELECT id, transaction_id, rule_id, risk_level, label, description,
                  caseworker_insight, status, notes
           FROM audit_flags WHERE session_id = ? ORDER BY position"#,
    )
    .bind(&session_id)
    .fetch_all(pool)
    .await?;

    let mut flags = Vec::with_capacity(flag_rows.len());
    for (fid, tid, rule_id, risk_level, label, description, insight, status, notes) in flag_rows {
        flags.push(AuditFlag {
            id: parse::<FlagId>("audit_flags.id", &fid)?,
            transaction_id: parse("audit_flags.transaction_id", &tid)?,
            rule_id: parse("audit_flags.rule_id", &rule_id)?,
            risk_level: parse("audit_flags.risk_level", &risk_level)?,
            label,
            description,
            caseworker_insight: insight,
            status: parse("audit_flags.status", &status)?,
            notes,
        });
    }

    let ingested_hashes = sqlx::query_scalar::<_, String>(
        "SELECT hash_hex FROM ingested_files WHERE session_id = ? ORDER BY position",
    )
    .bind(&session_id)
    .fetch_all(pool)
    .await?;

    Ok(Some(AuditSession {
        id,
        client_name,
        created_at,
        updated_at,
        status: parse("audit_sessions.status", &status)?,
        transactions,
        flags,
        ingested_hashes,
    }))
}

/// A session as listed, without its transactions and flags.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub id: SessionId,
    pub client_name: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub transaction_count: i64,
    pub flag_count: i64,
    /// Flags still `PENDING` or `CONFIRMED`.
    pub open_flag_count: i64,
}

/// All sessions, most recently updated first.
pub async fn list_sessions(pool: &DbPool) -> Result<Vec<SessionSummary>, StorageError> {
    let rows = sqlx::query_as::<_, (String, String, String, DateTime<Utc>, DateTime<Utc>, i64, i64, i64)>(
        r#"SELECT s.id, s.client_name, s.status, s.created_at, s.updated_at,
                  (SELECT COUNT(*) FROM transactions t WHERE t.session_id = s.id),
                  (SELECT COUNT(*) FROM audit_flags f WHERE f.session_id = s.id),
                  (SELECT COUNT(*) FROM audit_flags f
                    WHERE f.session_id = s.id AND f.status IN ('PENDING', 'CONFIRMED'))
           FROM audit_sessions s
           ORDER BY s.updated_at DESC"#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|r| {
            Ok(SessionSummary {
                id: parse("audit_sessions.id", &r.0)?,
                client_name: r.1,
                status: parse("audit_sessions.status", &r.2)?,
                created_at: r.3,
                updated_at: r.4,
                transaction_count: r.5,
                flag_count: r.6,
                open_flag_count: r.7,
            })
        })
        .collect()
}

/// Returns `false` when no session had that id.
pub async fn delete_session(pool: &DbPool, id: SessionId) -> Result<bool, StorageError> {
    let result = sqlx::query("DELETE FROM audit_sessions WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use lexmetric_core::{FlagStatus, RuleId};

    async fn test_db() -> (tempfile::TempDir, DbPool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_db(&dir.path().join("audits.db")).await.unwrap();
        (dir, pool)
    }

    fn sample_session() -> AuditSession {
        let mut session = AuditSession::new("Jane Doe");
        let mut church = Transaction::new(
            "01/20/2025",
            "ST. MARY'S CHURCH DONATION",
            Money::from_cents(-10_000),
            "jan.txt",
            1,
        );
        church.category = Some("Gifts".into());
        let atm = Transaction::new(
            "02/01/2025",
            "ATM WITHDRAWAL - MAIN ST BRANCH",
            Money::from_cents(-49_012),
            "jan.txt",
            2,
        );
        let mut tithe = AuditFlag::pending(church.id, RuleId::TitheTrap, "Donation detected".into());
        tithe.status = FlagStatus::Safe;
        tithe.notes = Some("Receipt on file".into());
        let smurf = AuditFlag::pending(atm.id, RuleId::SmurfCash, "Large cash".into());

        session.append_transactions([church, atm]);
        session.replace_flags(vec![tithe, smurf]);
        session.record_hash("abc123");
        session
    }

    #[tokio::test]
    async fn save_then_get_restores_everything() {
        let (_dir, pool) = test_db().await;
        let session = sample_session();
        save_session(&pool, &session).await.unwrap();

        let loaded = get_session(&pool, session.id).await.unwrap().unwrap();
        assert_eq!(loaded.client_name, "Jane Doe");
        assert_eq!(loaded.status, SessionStatus::Draft);
        assert_eq!(loaded.transactions, session.transactions);
        assert_eq!(loaded.flags, session.flags);
        assert_eq!(loaded.ingested_hashes, vec!["abc123".to_string()]);
        assert_eq!(loaded.transactions[1].amount, Money::from_cents(-49_012));
    }

    #[tokio::test]
    async fn missing_session_is_none() {
        let (_dir, pool) = test_db().await;
        assert!(get_session(&pool, SessionId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resave_replaces_children() {
        let (_dir, pool) = test_db().await;
        let mut session = sample_session();
        save_session(&pool, &session).await.unwrap();

        session.transactions.truncate(1);
        session.flags.clear();
        session.status = SessionStatus::Reviewed;
        save_session(&pool, &session).await.unwrap();

        let loaded = get_session(&pool, session.id).await.unwrap().unwrap();
        assert_eq!(loaded.transactions.len(), 1);
        assert!(loaded.flags.is_empty());
        assert_eq!(loaded.status, SessionStatus::Reviewed);
    }

    #[tokio::test]
    async fn list_orders_by_last_update() {
        let (_dir, pool) = test_db().await;
        let mut older = AuditSession::new("Older");
        older.updated_at = older.updated_at - Duration::hours(2);
        let newer = sample_session();
        save_session(&pool, &older).await.unwrap();
        save_session(&pool, &newer).await.unwrap();

        let listed = list_sessions(&pool).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer.id);
        assert_eq!(listed[0].transaction_count, 2);
        assert_eq!(listed[0].flag_count, 2);
        // The SAFE flag is closed.
        assert_eq!(listed[0].open_flag_count, 1);
        assert_eq!(listed[1].client_name, "Older");
    }

    #[tokio::test]
    async fn delete_cascades() {
        let (_dir, pool) = test_db().await;
        let session = sample_session();
        save_session(&pool, &session).await.unwrap();

        assert!(delete_session(&pool, session.id).await.unwrap());
        assert!(!delete_session(&pool, session.id).await.unwrap());
        assert!(get_session(&pool, session.id).await.unwrap().is_none());

        let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn corrupt_amount_is_reported() {
        let (_dir, pool) = test_db().await;
        let session = sample_session();
        save_session(&pool, &session).await.unwrap();
        sqlx::query("UPDATE transactions SET amount = 'lots'")
            .execute(&pool)
            .await
            .unwrap();

        assert!(matches!(
            get_session(&pool, session.id).await,
            Err(StorageError::Corrupt { column: "transactions.amount", .. })
        ));
    }
}
