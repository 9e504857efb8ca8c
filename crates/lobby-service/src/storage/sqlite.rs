//! SQLite chat storage (feature-gated).

use async_trait::async_trait;
use lobby_core::{
    model::{BROADCAST, Message, MessageKind, Participant},
    traits::{ChatStore, MessageFilter, StoreError},
};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

// Column names follow the wire format. Messages are ordered by `rowid`,
// which only grows since messages are never deleted.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS participants (
    name         TEXT PRIMARY KEY NOT NULL,
    "lastStatus" INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS messages (
    "from" TEXT NOT NULL,
    "to"   TEXT NOT NULL,
    text   TEXT NOT NULL,
    "type" TEXT NOT NULL,
    time   TEXT NOT NULL
);
"#;

type MessageRow = (String, String, String, String, String);

fn store_err(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn into_message((from, to, text, kind, time): MessageRow) -> Result<Message, StoreError> {
    let kind = MessageKind::parse(&kind)
        .ok_or_else(|| StoreError::Unavailable(format!("unknown message kind in store: {kind}")))?;
    Ok(Message {
        from,
        to,
        text,
        kind,
        time,
    })
}

/// SQLite storage implementation.
///
/// Uniqueness of names comes from the primary key; the compound operations
/// run inside a single transaction.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to `database_url`, creating the file and schema if missing.
    ///
    /// # Errors
    /// Returns error if database connection or migration fails.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options: SqliteConnectOptions = database_url
            .parse::<SqliteConnectOptions>()
            .map_err(store_err)?
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new().max_connections(8);
        if database_url.contains(":memory:") {
            // An in-memory database lives and dies with its connection.
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(store_err)?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, applying the schema.
    ///
    /// # Errors
    /// Returns error if the schema cannot be created.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .map_err(store_err)?;
        Ok(Self { pool })
    }

    async fn insert_message<'e, E>(executor: E, message: &Message) -> Result<(), StoreError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        sqlx::query(
            r#"INSERT INTO messages ("from", "to", text, "type", time) VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(&message.from)
        .bind(&message.to)
        .bind(&message.text)
        .bind(message.kind.as_str())
        .bind(&message.time)
        .execute(executor)
        .await
        .map_err(store_err)?;
        Ok(())
    }
}

#[async_trait]
impl ChatStore for SqliteStore {
    async fn insert_participant(
        &self,
        participant: &Participant,
        notice: &Message,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        let inserted = sqlx::query(
            r#"INSERT INTO participants (name, "lastStatus") VALUES (?, ?) ON CONFLICT(name) DO NOTHING"#,
        )
        .bind(&participant.name)
        .bind(participant.last_seen)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?
        .rows_affected();

        if inserted == 0 {
            tx.rollback().await.map_err(store_err)?;
            return Ok(false);
        }

        Self::insert_message(&mut *tx, notice).await?;
        tx.commit().await.map_err(store_err)?;
        Ok(true)
    }

    async fn touch_participant(&self, name: &str, last_seen: i64) -> Result<bool, StoreError> {
        let updated = sqlx::query(r#"UPDATE participants SET "lastStatus" = ? WHERE name = ?"#)
            .bind(last_seen)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(store_err)?
            .rows_affected();
        Ok(updated > 0)
    }

    async fn list_participants(&self) -> Result<Vec<Participant>, StoreError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as(r#"SELECT name, "lastStatus" FROM participants"#)
                .fetch_all(&self.pool)
                .await
                .map_err(store_err)?;

        Ok(rows
            .into_iter()
            .map(|(name, last_seen)| Participant { name, last_seen })
            .collect())
    }

    async fn append_from_registered(&self, message: &Message) -> Result<bool, StoreError> {
        let inserted = sqlx::query(
            r#"INSERT INTO messages ("from", "to", text, "type", time)
             SELECT ?, ?, ?, ?, ?
             WHERE EXISTS (SELECT 1 FROM participants WHERE name = ?)"#,
        )
        .bind(&message.from)
        .bind(&message.to)
        .bind(&message.text)
        .bind(message.kind.as_str())
        .bind(&message.time)
        .bind(&message.from)
        .execute(&self.pool)
        .await
        .map_err(store_err)?
        .rows_affected();
        Ok(inserted > 0)
    }

    async fn list_messages(&self, filter: MessageFilter) -> Result<Vec<Message>, StoreError> {
        // SQLite treats a negative LIMIT as "no limit".
        let limit = filter
            .limit
            .and_then(|l| i64::try_from(l).ok())
            .unwrap_or(-1);

        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"SELECT "from", "to", text, "type", time FROM (
                 SELECT rowid AS seq, "from", "to", text, "type", time FROM messages
                 WHERE "to" = ? OR "from" = ? OR "to" = ?
                 ORDER BY seq DESC
                 LIMIT ?
             ) ORDER BY seq ASC"#,
        )
        .bind(BROADCAST)
        .bind(filter.viewer.as_deref())
        .bind(filter.viewer.as_deref())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.into_iter().map(into_message).collect()
    }

    async fn evict_if_stale(
        &self,
        name: &str,
        cutoff: i64,
        notice: &Message,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        let removed = sqlx::query(r#"DELETE FROM participants WHERE name = ? AND "lastStatus" < ?"#)
            .bind(name)
            .bind(cutoff)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?
            .rows_affected();

        if removed == 0 {
            tx.rollback().await.map_err(store_err)?;
            return Ok(false);
        }

        Self::insert_message(&mut *tx, notice).await?;
        tx.commit().await.map_err(store_err)?;
        Ok(true)
    }
}
