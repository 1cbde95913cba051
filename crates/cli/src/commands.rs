use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use lexmetric_core::{
    pending_flags, AuditFlag, AuditSession, AuditSummary, FlagId, FlagStatus, SessionId,
    SessionStatus, Transaction, TransactionId,
};
use lexmetric_extract::{ingest_batch, DocumentSource, StatementPipeline};
use lexmetric_rules::{reconcile_reviews, RuleEngine};
use lexmetric_storage::{DbPool, SessionSummary};
use serde::Serialize;

use crate::demo::demo_transactions;
use crate::settings::Settings;

const DB_FILE: &str = "audits.db";

/// Everything a command needs: the audit database and the user's settings.
pub struct App {
    pub db: DbPool,
    pub settings: Settings,
    data_dir: PathBuf,
}

impl App {
    pub async fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;
        let settings = Settings::load(data_dir).context("Failed to load settings")?;
        let db = lexmetric_storage::create_db(&data_dir.join(DB_FILE))
            .await
            .context("Failed to open audit database")?;
        Ok(Self {
            db,
            settings,
            data_dir: data_dir.to_path_buf(),
        })
    }

    fn engine(&self) -> RuleEngine {
        RuleEngine::new(self.settings.engine.clone())
    }

    async fn load(&self, id: SessionId) -> Result<AuditSession> {
        lexmetric_storage::get_session(&self.db, id)
            .await?
            .with_context(|| format!("No audit session with id {id}"))
    }

    async fn save(&self, session: &AuditSession) -> Result<()> {
        lexmetric_storage::save_session(&self.db, session)
            .await
            .with_context(|| format!("Failed to save audit session {}", session.id))
    }

    /// Regenerate every flag over the full transaction list, keeping prior
    /// reviewer decisions that still apply. Returns how many were kept.
    fn rerun_rules(&self, session: &mut AuditSession) -> usize {
        let mut flags = self.engine().run(&session.transactions);
        let carried = reconcile_reviews(&session.flags, &mut flags);
        session.replace_flags(flags);
        carried
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    pub async fn new_session(&self, client_name: &str) -> Result<AuditSession> {
        let session = AuditSession::new(client_name);
        self.save(&session).await?;
        tracing::info!(session = %session.id, client = client_name, "Audit session created");
        Ok(session)
    }

    pub async fn ingest(&self, id: SessionId, files: &[PathBuf]) -> Result<IngestReport> {
        let mut session = self.load(id).await?;
        let known: HashSet<String> = session.ingested_hashes.iter().cloned().collect();

        let pipeline = Arc::new(StatementPipeline::new(DocumentSource));
        let outcome = ingest_batch(pipeline, files, &known).await?;

        let mut report = IngestReport {
            duplicates: outcome.duplicates.into_iter().map(|(path, _)| path).collect(),
            failures: outcome
                .failures
                .into_iter()
                .map(|(path, e)| (path, e.to_string()))
                .collect(),
            ..IngestReport::default()
        };

        for file in outcome.files {
            session.record_hash(file.hash_hex);
            report.new_transactions += file.transactions.len();
            report.files.push((file.file_name, file.transactions.len()));
            session.append_transactions(file.transactions);
        }

        report.carried_reviews = self.rerun_rules(&mut session);
        report.flag_count = session.flags.len();
        self.save(&session).await?;
        Ok(report)
    }

    pub async fn analyze(&self, id: SessionId) -> Result<AuditSession> {
        let mut session = self.load(id).await?;
        self.rerun_rules(&mut session);
        self.save(&session).await?;
        Ok(session)
    }

    /// Record a decision. A draft whose last pending flag gets reviewed moves
    /// to `REVIEWED`.
    pub async fn review(
        &self,
        id: SessionId,
        flag_id: FlagId,
        status: FlagStatus,
        notes: Option<String>,
    ) -> Result<AuditFlag> {
        let mut session = self.load(id).await?;
        let flag = lexmetric_core::review(&mut session.flags, flag_id, status, notes)?.clone();

        if session.status == SessionStatus::Draft && pending_flags(&session.flags).next().is_none() {
            session.status = SessionStatus::Reviewed;
        }
        session.touch();
        self.save(&session).await?;
        Ok(flag)
    }

    pub async fn summary(&self, id: SessionId) -> Result<(AuditSession, AuditSummary)> {
        let session = self.load(id).await?;
        let summary = AuditSummary::compute(&session.transactions, &session.flags, self.settings.divisor);
        Ok((session, summary))
    }

    pub async fn list(&self) -> Result<Vec<SessionSummary>> {
        Ok(lexmetric_storage::list_sessions(&self.db).await?)
    }

    pub async fn delete(&self, id: SessionId) -> Result<bool> {
        Ok(lexmetric_storage::delete_session(&self.db, id).await?)
    }

    /// Write the full session document plus its summary as pretty JSON.
    /// Defaults to `exports/audit-<id>.json` under the data directory.
    pub async fn export(&self, id: SessionId, out: Option<PathBuf>) -> Result<PathBuf> {
        let (session, summary) = self.summary(id).await?;
        let path = out.unwrap_or_else(|| {
            self.data_dir
                .join("exports")
                .join(format!("audit-{id}.json"))
        });
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let report = AuditReport {
            session: &session,
            summary,
        };
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!(session = %id, path = %path.display(), "Audit exported");
        Ok(path)
    }
}

/// Export document: the stored session with its computed summary alongside.
#[derive(Serialize)]
struct AuditReport<'a> {
    #[serde(flatten)]
    session: &'a AuditSession,
    summary: AuditSummary,
}

/// Runs the built-in demo set through the engine without touching storage.
pub fn demo(settings: &Settings) -> (Vec<Transaction>, Vec<AuditFlag>, AuditSummary) {
    let transactions = demo_transactions();
    let flags = RuleEngine::new(settings.engine.clone()).run(&transactions);
    let summary = AuditSummary::compute(&transactions, &flags, settings.divisor);
    (transactions, flags, summary)
}

#[derive(Debug, Default)]
pub struct IngestReport {
    /// Accepted files with their transaction counts.
    pub files: Vec<(String, usize)>,
    pub duplicates: Vec<PathBuf>,
    pub failures: Vec<(PathBuf, String)>,
    pub new_transactions: usize,
    pub flag_count: usize,
    pub carried_reviews: usize,
}

// ── Output ────────────────────────────────────────────────────────────────────

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

pub fn print_flags(transactions: &[Transaction], flags: &[AuditFlag]) {
    if flags.is_empty() {
        println!("No flags.");
        return;
    }
    let by_id: HashMap<TransactionId, &Transaction> =
        transactions.iter().map(|t| (t.id, t)).collect();

    println!(
        "{:<36}  {:<10}  {:<34}  {:>12}  {:<6}  {:<17}  {}",
        "FLAG", "DATE", "DESCRIPTION", "AMOUNT", "RISK", "RULE", "STATUS"
    );
    for flag in flags {
        let (date, description, amount) = match by_id.get(&flag.transaction_id) {
            Some(t) => (t.date.as_str(), t.description.as_str(), t.amount.to_string()),
            None => ("?", "(missing transaction)", String::new()),
        };
        println!(
            "{:<36}  {:<10}  {:<34}  {:>12}  {:<6}  {:<17}  {}",
            flag.id.to_string(),
            truncate(date, 10),
            truncate(description, 34),
            amount,
            flag.risk_level.to_string(),
            flag.rule_id.as_str(),
            flag.status,
        );
    }
}

pub fn print_summary(summary: &AuditSummary) {
    println!("Transactions:      {}", summary.transaction_count);
    println!(
        "Flags:             {} ({} open)",
        summary.flag_count, summary.open_flag_count
    );
    for (rule, count) in &summary.by_rule {
        println!("  {:<17} {count}", rule.as_str());
    }
    println!("Total exposure:    {}", summary.total_exposure);
    println!("Penalty divisor:   {}", summary.divisor);
    println!("Penalty period:    {} months", summary.penalty_period_months);
}

pub fn print_sessions(sessions: &[SessionSummary]) {
    if sessions.is_empty() {
        println!("No audit sessions.");
        return;
    }
    println!(
        "{:<36}  {:<24}  {:<8}  {:>6}  {:>10}  {}",
        "SESSION", "CLIENT", "STATUS", "TXNS", "OPEN FLAGS", "UPDATED"
    );
    for s in sessions {
        println!(
            "{:<36}  {:<24}  {:<8}  {:>6}  {:>10}  {}",
            s.id.to_string(),
            truncate(&s.client_name, 24),
            s.status.to_string(),
            s.transaction_count,
            s.open_flag_count,
            s.updated_at.format("%Y-%m-%d %H:%M"),
        );
    }
}

pub fn print_ingest(report: &IngestReport) {
    for (name, count) in &report.files {
        println!("Ingested {name}: {count} transactions");
    }
    for path in &report.duplicates {
        println!("Skipped {} (already ingested)", path.display());
    }
    for (path, error) in &report.failures {
        eprintln!("Failed {}: {error}", path.display());
    }
    println!(
        "{} new transactions, {} flags ({} prior reviews kept)",
        report.new_transactions, report.flag_count, report.carried_reviews
    );
}
