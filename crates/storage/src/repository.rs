//! Repository Implementation

use crate::StorageError;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use feature_engine::ClinicalInput;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS predictions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id),
        age INTEGER NOT NULL,
        sex TEXT NOT NULL,
        cp INTEGER NOT NULL,
        trestbps INTEGER NOT NULL,
        chol INTEGER NOT NULL,
        fbs TEXT NOT NULL,
        restecg INTEGER NOT NULL,
        thalach INTEGER NOT NULL,
        exang TEXT NOT NULL,
        oldpeak REAL NOT NULL,
        prediction_result INTEGER NOT NULL,
        probability REAL NOT NULL CHECK (probability >= 0.0 AND probability <= 1.0),
        risk_level TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_predictions_user ON predictions(user_id, created_at)",
    "CREATE TABLE IF NOT EXISTS sessions (
        token TEXT PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES users(id),
        created_at TEXT NOT NULL,
        expires_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_sessions_expiry ON sessions(expires_at)",
];

/// Registered user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Stored prediction, immutable once written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: i64,
    pub user_id: i64,
    #[serde(flatten)]
    pub input: ClinicalInput,
    /// Classifier label (0 or 1)
    pub prediction_result: i64,
    /// Probability in [0, 1]
    pub probability: f64,
    pub risk_level: String,
    pub created_at: DateTime<Utc>,
}

/// Prediction about to be written
#[derive(Debug, Clone)]
pub struct NewPrediction {
    pub user_id: i64,
    pub input: ClinicalInput,
    pub prediction_result: i64,
    pub probability: f64,
    pub risk_level: String,
}

/// Login session
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub token: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Repository for data access backed by a SQLite pool
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Open (or create) the database at `database_url` and apply the schema
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let in_memory = database_url.contains(":memory:");

        let mut options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| StorageError::DatabaseError(format!("Invalid database URL: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Each in-memory connection is its own database, so keep exactly one alive
        let pool = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(10)
                .connect_with(options)
                .await?
        };

        let repository = Self { pool };
        repository.run_migrations().await?;

        info!("Opened SQLite repository at {}", database_url);
        Ok(repository)
    }

    /// Create a fresh in-memory repository
    pub async fn in_memory() -> Result<Self, StorageError> {
        Self::connect("sqlite::memory:").await
    }

    async fn run_migrations(&self) -> Result<(), StorageError> {
        for statement in MIGRATIONS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::DatabaseError(format!("Migration failed: {e}")))?;
        }
        Ok(())
    }

    /// Check the database answers
    pub async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Insert a user; fails with `UsernameTaken` on duplicates
    pub async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<UserRecord, StorageError> {
        let created_at = Utc::now();

        let result = sqlx::query(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?)",
        )
        .bind(username)
        .bind(password_hash)
        .bind(format_timestamp(&created_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => {
                let id = done.last_insert_rowid();
                debug!("Created user {} with ID {}", username, id);
                Ok(UserRecord {
                    id,
                    username: username.to_string(),
                    password_hash: password_hash.to_string(),
                    created_at,
                })
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StorageError::UsernameTaken(username.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Look up a user by name
    pub async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, StorageError> {
        sqlx::query("SELECT id, username, password_hash, created_at FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| user_from_row(&row))
            .transpose()
    }

    /// Look up a user by ID
    pub async fn get_user(&self, id: i64) -> Result<Option<UserRecord>, StorageError> {
        sqlx::query("SELECT id, username, password_hash, created_at FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| user_from_row(&row))
            .transpose()
    }

    /// Insert a prediction record as a single atomic write
    pub async fn insert_prediction(&self, record: &NewPrediction) -> Result<i64, StorageError> {
        let created_at = Utc::now();

        let done = sqlx::query(
            "INSERT INTO predictions (
                user_id, age, sex, cp, trestbps, chol, fbs, restecg, thalach, exang, oldpeak,
                prediction_result, probability, risk_level, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.user_id)
        .bind(record.input.age)
        .bind(&record.input.sex)
        .bind(record.input.cp)
        .bind(record.input.trestbps)
        .bind(record.input.chol)
        .bind(&record.input.fbs)
        .bind(record.input.restecg)
        .bind(record.input.thalach)
        .bind(&record.input.exang)
        .bind(record.input.oldpeak)
        .bind(record.prediction_result)
        .bind(record.probability)
        .bind(&record.risk_level)
        .bind(format_timestamp(&created_at))
        .execute(&self.pool)
        .await?;

        let id = done.last_insert_rowid();
        debug!("Inserted prediction with ID {} for user {}", id, record.user_id);

        Ok(id)
    }

    /// Fetch one of a user's predictions
    pub async fn get_prediction(
        &self,
        user_id: i64,
        id: i64,
    ) -> Result<PredictionRecord, StorageError> {
        let row = sqlx::query("SELECT * FROM predictions WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StorageError::NotFound)?;

        prediction_from_row(&row)
    }

    /// A user's predictions, newest first, with optional risk level filter
    pub async fn recent_predictions(
        &self,
        user_id: i64,
        risk_level: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PredictionRecord>, StorageError> {
        let rows = sqlx::query(
            "SELECT * FROM predictions
             WHERE user_id = ? AND (? IS NULL OR risk_level = ?)
             ORDER BY created_at DESC, id DESC
             LIMIT ?",
        )
        .bind(user_id)
        .bind(risk_level)
        .bind(risk_level)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(prediction_from_row).collect()
    }

    /// Get total user count
    pub async fn user_count(&self) -> Result<i64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Get total prediction count
    pub async fn prediction_count(&self) -> Result<i64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM predictions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Open a session for a user
    pub async fn create_session(
        &self,
        user_id: i64,
        ttl: Duration,
    ) -> Result<SessionRecord, StorageError> {
        let created_at = Utc::now();
        let session = SessionRecord {
            token: Uuid::new_v4().simple().to_string(),
            user_id,
            created_at,
            expires_at: created_at + ttl,
        };

        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&session.token)
        .bind(session.user_id)
        .bind(format_timestamp(&session.created_at))
        .bind(format_timestamp(&session.expires_at))
        .execute(&self.pool)
        .await?;

        debug!("Opened session for user {}", user_id);
        Ok(session)
    }

    /// Resolve a session token to its user, ignoring expired sessions
    pub async fn session_user(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserRecord>, StorageError> {
        sqlx::query(
            "SELECT u.id, u.username, u.password_hash, u.created_at
             FROM sessions s JOIN users u ON u.id = s.user_id
             WHERE s.token = ? AND s.expires_at > ?",
        )
        .bind(token)
        .bind(format_timestamp(&now))
        .fetch_optional(&self.pool)
        .await?
        .map(|row| user_from_row(&row))
        .transpose()
    }

    /// End a session
    pub async fn delete_session(&self, token: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Drop sessions that expired before `now`
    pub async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, StorageError> {
        let done = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(format_timestamp(&now))
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected())
    }
}

/// Fixed-width RFC 3339 so TEXT ordering matches time ordering
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::SerializationError(format!("Invalid timestamp '{s}': {e}")))
}

fn user_from_row(row: &SqliteRow) -> Result<UserRecord, StorageError> {
    Ok(UserRecord {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
    })
}

fn prediction_from_row(row: &SqliteRow) -> Result<PredictionRecord, StorageError> {
    Ok(PredictionRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        input: ClinicalInput {
            age: row.try_get("age")?,
            sex: row.try_get("sex")?,
            cp: row.try_get("cp")?,
            trestbps: row.try_get("trestbps")?,
            chol: row.try_get("chol")?,
            fbs: row.try_get("fbs")?,
            restecg: row.try_get("restecg")?,
            thalach: row.try_get("thalach")?,
            exang: row.try_get("exang")?,
            oldpeak: row.try_get("oldpeak")?,
        },
        prediction_result: row.try_get("prediction_result")?,
        probability: row.try_get("probability")?,
        risk_level: row.try_get("risk_level")?,
        created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input() -> ClinicalInput {
        ClinicalInput {
            age: 55,
            sex: "1".to_string(),
            cp: 2,
            trestbps: 130,
            chol: 250,
            fbs: "0".to_string(),
            restecg: 0,
            thalach: 150,
            exang: "0".to_string(),
            oldpeak: 1.5,
        }
    }

    fn new_prediction(user_id: i64, probability: f64, risk_level: &str) -> NewPrediction {
        NewPrediction {
            user_id,
            input: sample_input(),
            prediction_result: (probability >= 0.5) as i64,
            probability,
            risk_level: risk_level.to_string(),
        }
    }

    #[tokio::test]
    async fn test_user_create_and_lookup() {
        let repo = Repository::in_memory().await.unwrap();

        let user = repo.create_user("alice", "hash").await.unwrap();
        assert!(user.id > 0);

        let found = repo.find_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.password_hash, "hash");

        assert!(repo.find_user_by_username("bob").await.unwrap().is_none());
        assert_eq!(repo.get_user(user.id).await.unwrap().unwrap().username, "alice");
        assert_eq!(repo.user_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let repo = Repository::in_memory().await.unwrap();
        repo.create_user("alice", "hash").await.unwrap();

        let err = repo.create_user("alice", "other").await.unwrap_err();
        assert!(matches!(err, StorageError::UsernameTaken(name) if name == "alice"));
    }

    #[tokio::test]
    async fn test_prediction_round_trip() {
        let repo = Repository::in_memory().await.unwrap();
        let user = repo.create_user("alice", "hash").await.unwrap();

        let record = new_prediction(user.id, 0.2950929855934513, "Moderate Risk");
        let id = repo.insert_prediction(&record).await.unwrap();

        let stored = repo.get_prediction(user.id, id).await.unwrap();
        assert_eq!(stored.user_id, user.id);
        assert_eq!(stored.input, record.input);
        assert_eq!(stored.prediction_result, 0);
        assert_eq!(stored.probability, record.probability);
        assert_eq!(stored.risk_level, "Moderate Risk");
    }

    #[tokio::test]
    async fn test_prediction_requires_existing_user() {
        let repo = Repository::in_memory().await.unwrap();
        let result = repo.insert_prediction(&new_prediction(999, 0.1, "Low Risk")).await;
        assert!(matches!(result, Err(StorageError::DatabaseError(_))));
        assert_eq!(repo.prediction_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_probability_outside_unit_interval_rejected() {
        let repo = Repository::in_memory().await.unwrap();
        let user = repo.create_user("alice", "hash").await.unwrap();
        let result = repo
            .insert_prediction(&new_prediction(user.id, 1.5, "Very High Risk"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_prediction_hidden_from_other_users() {
        let repo = Repository::in_memory().await.unwrap();
        let alice = repo.create_user("alice", "hash").await.unwrap();
        let bob = repo.create_user("bob", "hash").await.unwrap();

        let id = repo
            .insert_prediction(&new_prediction(alice.id, 0.1, "Low Risk"))
            .await
            .unwrap();

        let err = repo.get_prediction(bob.id, id).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn test_recent_predictions_newest_first() {
        let repo = Repository::in_memory().await.unwrap();
        let user = repo.create_user("alice", "hash").await.unwrap();

        let mut ids = Vec::new();
        for i in 0..7 {
            let p = 0.1 * i as f64;
            let level = if p < 0.25 { "Low Risk" } else { "Moderate Risk" };
            ids.push(repo.insert_prediction(&new_prediction(user.id, p, level)).await.unwrap());
        }

        let recent = repo.recent_predictions(user.id, None, 5).await.unwrap();
        let recent_ids: Vec<_> = recent.iter().map(|r| r.id).collect();
        let expected: Vec<_> = ids.iter().rev().take(5).copied().collect();
        assert_eq!(recent_ids, expected);

        let low = repo.recent_predictions(user.id, Some("Low Risk"), 50).await.unwrap();
        assert_eq!(low.len(), 3);
        assert!(low.iter().all(|r| r.risk_level == "Low Risk"));
    }

    #[tokio::test]
    async fn test_concurrent_users_never_cross_assigned() {
        let repo = Repository::in_memory().await.unwrap();
        let alice = repo.create_user("alice", "hash").await.unwrap();
        let bob = repo.create_user("bob", "hash").await.unwrap();

        let mut handles = Vec::new();
        for user_id in [alice.id, bob.id] {
            for _ in 0..10 {
                let repo = repo.clone();
                handles.push(tokio::spawn(async move {
                    repo.insert_prediction(&new_prediction(user_id, 0.3, "Moderate Risk"))
                        .await
                        .map(|id| (user_id, id))
                }));
            }
        }

        for handle in handles {
            let (user_id, id) = handle.await.unwrap().unwrap();
            let stored = repo.get_prediction(user_id, id).await.unwrap();
            assert_eq!(stored.user_id, user_id);
        }

        for user_id in [alice.id, bob.id] {
            let history = repo.recent_predictions(user_id, None, 100).await.unwrap();
            assert_eq!(history.len(), 10);
            assert!(history.iter().all(|r| r.user_id == user_id));
        }
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let repo = Repository::in_memory().await.unwrap();
        let user = repo.create_user("alice", "hash").await.unwrap();

        let session = repo.create_session(user.id, Duration::hours(1)).await.unwrap();
        let resolved = repo.session_user(&session.token, Utc::now()).await.unwrap();
        assert_eq!(resolved.unwrap().id, user.id);

        // Past expiry the token no longer resolves
        let later = Utc::now() + Duration::hours(2);
        assert!(repo.session_user(&session.token, later).await.unwrap().is_none());
        assert_eq!(repo.purge_expired_sessions(later).await.unwrap(), 1);

        let session = repo.create_session(user.id, Duration::hours(1)).await.unwrap();
        repo.delete_session(&session.token).await.unwrap();
        assert!(repo.session_user(&session.token, Utc::now()).await.unwrap().is_none());
        assert!(repo.session_user("bogus", Utc::now()).await.unwrap().is_none());
    }
}
