//! SQLite database with Diesel ORM
//!
//! Durable [`VersionStore`] for version records. Tables are created with
//! raw SQL on open, and the schema version is registered alongside them.

use crate::error::{Result, VcsError};
use crate::record::{VersionDraft, VersionRecord};
use crate::schema::*;
use crate::store::{check_draft, new_record_id, next_timestamp, next_version, VersionStore};
use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// Walk up directory tree to find .promptvc folder (like git finds .git)
/// Can be overridden with PROMPTVC_DB_PATH env var
fn get_db_path() -> PathBuf {
    // Check env var first - always takes priority
    if let Ok(path) = std::env::var("PROMPTVC_DB_PATH") {
        return PathBuf::from(path);
    }

    if let Ok(current_dir) = std::env::current_dir() {
        let mut dir = current_dir.as_path();
        loop {
            let state_dir = dir.join(".promptvc");
            if state_dir.is_dir() {
                return state_dir.join("history.db");
            }
            match dir.parent() {
                Some(parent) => dir = parent,
                None => break,
            }
        }
    }

    // No .promptvc found - default to current directory
    PathBuf::from(".promptvc/history.db")
}

/// Current schema version for promptvc
pub const CURRENT_SCHEMA: HistorySchema = HistorySchema {
    major: 1,
    minor: 0,
    patch: 0,
    name: "version-history",
    features: &["version_records", "branches", "merge_from"],
};

/// Describes the version and capabilities of the schema
#[derive(Debug, Clone)]
pub struct HistorySchema {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub name: &'static str,
    pub features: &'static [&'static str],
}

impl HistorySchema {
    pub fn version_string(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl std::fmt::Display for HistorySchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{} ({})", self.version_string(), self.name)
    }
}

// ============================================================================
// Diesel Models
// ============================================================================

/// Insertable schema version
#[derive(Insertable)]
#[diesel(table_name = schema_versions)]
struct NewSchemaVersion<'a> {
    version: &'a str,
    name: &'a str,
    features: &'a str,
    introduced_at: &'a str,
}

/// Insertable version record
#[derive(Insertable)]
#[diesel(table_name = version_records)]
struct NewVersionRow<'a> {
    id: &'a str,
    config_group_id: &'a str,
    version: i32,
    parent_id: Option<&'a str>,
    branch: &'a str,
    merge_from: Option<&'a str>,
    message: &'a str,
    created_at: &'a str,
    prompt_content: &'a str,
    config_json: &'a str,
}

/// Queryable version record (column order matches the table)
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = version_records)]
struct StoredVersion {
    id: String,
    config_group_id: String,
    version: i32,
    parent_id: Option<String>,
    branch: String,
    merge_from: Option<String>,
    message: String,
    created_at: String,
    prompt_content: String,
    config_json: String,
}

impl TryFrom<StoredVersion> for VersionRecord {
    type Error = VcsError;

    fn try_from(row: StoredVersion) -> Result<Self> {
        let timestamp = DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|e| {
                VcsError::Transport(format!("Corrupt timestamp on record {}: {}", row.id, e))
            })?
            .with_timezone(&Utc);
        let version = u32::try_from(row.version).map_err(|_| {
            VcsError::Transport(format!("Corrupt version {} on record {}", row.version, row.id))
        })?;
        let config = serde_json::from_str(&row.config_json)?;

        Ok(VersionRecord {
            id: row.id,
            config_group_id: row.config_group_id,
            version,
            parent_id: row.parent_id,
            branch: row.branch,
            merge_from: row.merge_from,
            message: row.message,
            timestamp,
            prompt_content: row.prompt_content,
            config,
        })
    }
}

/// Per-group totals for listings
#[derive(QueryableByName, Debug, Clone, serde::Serialize)]
pub struct GroupSummary {
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub config_group_id: String,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub versions: i64,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub branches: i64,
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub last_saved: String,
}

// ============================================================================
// Database Connection
// ============================================================================

type DbPool = Pool<ConnectionManager<SqliteConnection>>;
type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

impl From<diesel::result::Error> for VcsError {
    fn from(e: diesel::result::Error) -> Self {
        VcsError::Transport(format!("Query error: {}", e))
    }
}

impl From<diesel::r2d2::PoolError> for VcsError {
    fn from(e: diesel::r2d2::PoolError) -> Self {
        VcsError::Transport(format!("Pool error: {}", e))
    }
}

/// Database connection wrapper with connection pool
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Get the database path that will be used
    pub fn db_path() -> PathBuf {
        get_db_path()
    }

    /// Open database at default path (respects PROMPTVC_DB_PATH env var)
    pub fn open() -> Result<Self> {
        let path = get_db_path();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    warn!("Could not create {}: {}", parent.display(), e);
                }
            }
        }
        Self::open_at(&path)
    }

    /// Open database at specified path
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let manager = ConnectionManager::<SqliteConnection>::new(&path_str);
        let pool = Pool::builder()
            .max_size(5)
            .build(manager)
            .map_err(|e| VcsError::Transport(format!("Connection error: {}", e)))?;

        let db = Self { pool };
        db.init_schema()?;
        debug!("Opened history database at {}", path_str);
        Ok(db)
    }

    fn get_conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    fn init_schema(&self) -> Result<()> {
        let mut conn = self.get_conn()?;

        diesel::sql_query(r#"
            CREATE TABLE IF NOT EXISTS schema_versions (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                version TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                features TEXT NOT NULL,
                introduced_at TEXT NOT NULL
            )
        "#).execute(&mut conn)?;

        diesel::sql_query(r#"
            CREATE TABLE IF NOT EXISTS version_records (
                id TEXT PRIMARY KEY NOT NULL,
                config_group_id TEXT NOT NULL,
                version INTEGER NOT NULL,
                parent_id TEXT,
                branch TEXT NOT NULL,
                merge_from TEXT,
                message TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                prompt_content TEXT NOT NULL,
                config_json TEXT NOT NULL,
                FOREIGN KEY (parent_id) REFERENCES version_records(id),
                UNIQUE(config_group_id, version)
            )
        "#).execute(&mut conn)?;

        diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_versions_group ON version_records(config_group_id)").execute(&mut conn)?;
        diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_versions_branch ON version_records(config_group_id, branch)").execute(&mut conn)?;

        self.register_schema(&CURRENT_SCHEMA)?;
        Ok(())
    }

    fn register_schema(&self, schema: &HistorySchema) -> Result<()> {
        let mut conn = self.get_conn()?;
        let now = Utc::now().to_rfc3339();
        let features_json = serde_json::to_string(&schema.features)?;

        let new_schema = NewSchemaVersion {
            version: &schema.version_string(),
            name: schema.name,
            features: &features_json,
            introduced_at: &now,
        };

        diesel::insert_or_ignore_into(schema_versions::table)
            .values(&new_schema)
            .execute(&mut conn)?;

        Ok(())
    }

    /// Schema versions recorded in this database, oldest first
    pub fn schema_versions(&self) -> Result<Vec<String>> {
        let mut conn = self.get_conn()?;
        let versions = schema_versions::table
            .order(schema_versions::id.asc())
            .select(schema_versions::version)
            .load::<String>(&mut conn)?;
        Ok(versions)
    }

    /// Every group with its version/branch counts
    pub fn list_groups(&self) -> Result<Vec<GroupSummary>> {
        let mut conn = self.get_conn()?;
        let groups = diesel::sql_query(
            "SELECT config_group_id, COUNT(*) AS versions, COUNT(DISTINCT branch) AS branches, \
             MAX(created_at) AS last_saved FROM version_records \
             GROUP BY config_group_id ORDER BY config_group_id",
        )
        .load::<GroupSummary>(&mut conn)?;
        Ok(groups)
    }
}

fn load_group(conn: &mut SqliteConnection, config_group_id: &str) -> Result<Vec<VersionRecord>> {
    version_records::table
        .filter(version_records::config_group_id.eq(config_group_id))
        .order(version_records::version.asc())
        .load::<StoredVersion>(conn)?
        .into_iter()
        .map(VersionRecord::try_from)
        .collect()
}

impl VersionStore for Database {
    fn load_versions(&self, config_group_id: &str) -> Result<Vec<VersionRecord>> {
        let mut conn = self.get_conn()?;
        let records = load_group(&mut conn, config_group_id)?;
        if records.is_empty() {
            return Err(VcsError::NotFound(format!("config group '{}'", config_group_id)));
        }
        Ok(records)
    }

    fn save_version(&mut self, draft: VersionDraft) -> Result<VersionRecord> {
        let mut conn = self.get_conn()?;

        let record = conn.immediate_transaction::<_, VcsError, _>(|conn| {
            let existing = load_group(conn, &draft.config_group_id)?;
            check_draft(&draft, &existing)?;

            let version = next_version(&existing);
            let timestamp = next_timestamp(existing.iter().map(|r| r.timestamp).max());
            let record = draft.into_record(new_record_id(), version, timestamp);

            let version_col = i32::try_from(record.version)
                .map_err(|_| VcsError::Validation(format!("Version {} out of range", record.version)))?;
            let created_at = record.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true);
            let config_json = serde_json::to_string(&record.config)?;

            let row = NewVersionRow {
                id: &record.id,
                config_group_id: &record.config_group_id,
                version: version_col,
                parent_id: record.parent_id.as_deref(),
                branch: &record.branch,
                merge_from: record.merge_from.as_deref(),
                message: &record.message,
                created_at: &created_at,
                prompt_content: &record.prompt_content,
                config_json: &config_json,
            };

            diesel::insert_into(version_records::table)
                .values(&row)
                .execute(conn)?;

            Ok(record)
        })?;

        info!(
            "Saved version {} of '{}' on branch '{}'",
            record.version, record.config_group_id, record.branch
        );
        Ok(record)
    }
}
