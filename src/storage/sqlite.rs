//! SQLite storage backend

use super::traits::{MessageStore, OpenStore, StorageError, StorageResult};
use crate::graph::{ArgType, Debate, DebateId, Message, MessageId, RelationType, SessionId};
use crate::session::SessionKey;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

const MESSAGE_COLUMNS: &str = "debate_id, session_id, id, content, author, arg_type, relation_type,
     target_id, feedback, created_at";

/// Columns of one `messages` row, in `MESSAGE_COLUMNS` order
type RawMessage = (
    i64,
    String,
    i64,
    String,
    String,
    String,
    String,
    Option<i64>,
    Option<String>,
    String,
);

/// SQLite-backed message store
///
/// One database file with a `debates` catalogue and a `messages` log keyed
/// by `(debate_id, session_id, id)`. Thread-safe via an internal mutex on
/// the connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS debates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                topic TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS messages (
                debate_id INTEGER NOT NULL,
                session_id TEXT NOT NULL,
                id INTEGER NOT NULL,
                content TEXT NOT NULL,
                author TEXT NOT NULL,
                arg_type TEXT NOT NULL DEFAULT 'claim',
                relation_type TEXT NOT NULL DEFAULT 'none',
                target_id INTEGER,
                feedback TEXT,
                created_at TEXT NOT NULL,
                PRIMARY KEY (debate_id, session_id, id)
            );

            CREATE INDEX IF NOT EXISTS idx_messages_session
                ON messages(debate_id, session_id);

            -- WAL keeps catalogue reads cheap while sessions append
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deserialize a message from database columns
    #[allow(clippy::too_many_arguments)]
    fn raw_row(row: &Row<'_>) -> rusqlite::Result<RawMessage> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
            row.get(7)?,
            row.get(8)?,
            row.get(9)?,
        ))
    }

    fn decode(raw: RawMessage) -> StorageResult<Message> {
        let (debate_id, session_id, id, content, author, arg_type, relation_type, target_id, feedback, created_at) =
            raw;
        let arg_type = ArgType::parse(&arg_type)
            .ok_or_else(|| StorageError::InvalidRow(format!("arg_type '{}'", arg_type)))?;
        let relation_type = RelationType::parse(&relation_type).ok_or_else(|| {
            StorageError::InvalidRow(format!("relation_type '{}'", relation_type))
        })?;

        Ok(Message {
            id: MessageId::new(to_u64(id)?),
            content,
            author,
            debate_id: DebateId::new(debate_id),
            session_id: SessionId::new(session_id),
            arg_type,
            relation_type,
            target_id: target_id.map(to_u64).transpose()?.map(MessageId::new),
            feedback,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| StorageError::DateParse(e.to_string()))?
                .with_timezone(&Utc),
            current_winners: None,
        })
    }
}

fn to_u64(value: i64) -> StorageResult<u64> {
    u64::try_from(value).map_err(|_| StorageError::InvalidRow(format!("negative id {}", value)))
}

fn to_i64(id: MessageId) -> StorageResult<i64> {
    i64::try_from(id.get()).map_err(|_| StorageError::InvalidRow(format!("id {} overflows", id)))
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl MessageStore for SqliteStore {
    fn list_debates(&self) -> StorageResult<Vec<Debate>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT id, topic FROM debates ORDER BY created_at DESC, id DESC")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;

        let mut debates = Vec::new();
        for row in rows {
            let (id, topic) = row?;
            debates.push(Debate {
                id: DebateId::new(id),
                topic,
            });
        }
        Ok(debates)
    }

    fn get_debate(&self, id: DebateId) -> StorageResult<Option<Debate>> {
        let conn = self.conn();
        let topic: Option<String> = conn
            .query_row(
                "SELECT topic FROM debates WHERE id = ?1",
                params![id.get()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(topic.map(|topic| Debate { id, topic }))
    }

    fn create_debate(&self, topic: &str) -> StorageResult<Debate> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO debates (topic, created_at) VALUES (?1, ?2)",
            params![topic, Utc::now().to_rfc3339()],
        )?;
        Ok(Debate {
            id: DebateId::new(conn.last_insert_rowid()),
            topic: topic.to_string(),
        })
    }

    fn append_message(&self, message: &Message) -> StorageResult<()> {
        let target_id = message.target_id.map(to_i64).transpose()?;
        let conn = self.conn();
        conn.execute(
            r#"
            INSERT INTO messages (debate_id, session_id, id, content, author, arg_type,
                                  relation_type, target_id, feedback, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                message.debate_id.get(),
                message.session_id.as_str(),
                to_i64(message.id)?,
                message.content,
                message.author,
                message.arg_type.as_str(),
                message.relation_type.as_str(),
                target_id,
                message.feedback,
                message.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn load_session(&self, key: &SessionKey) -> StorageResult<Vec<Message>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM messages WHERE debate_id = ?1 AND session_id = ?2 ORDER BY id ASC",
            MESSAGE_COLUMNS
        ))?;
        let rows = stmt.query_map(
            params![key.debate_id.get(), key.session_id.as_str()],
            Self::raw_row,
        )?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(Self::decode(row?)?);
        }
        Ok(messages)
    }

    fn find_message(&self, debate_id: DebateId, id: MessageId) -> StorageResult<Option<Message>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM messages WHERE debate_id = ?1 AND id = ?2
             ORDER BY created_at DESC, rowid DESC LIMIT 1",
            MESSAGE_COLUMNS
        ))?;
        // Ids past the storable range cannot be on disk
        let Ok(id) = i64::try_from(id.get()) else {
            return Ok(None);
        };
        let raw = stmt
            .query_row(params![debate_id.get(), id], Self::raw_row)
            .optional()?;
        raw.map(Self::decode).transpose()
    }

    fn clear_session(&self, key: &SessionKey) -> StorageResult<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let removed = tx.execute(
            "DELETE FROM messages WHERE debate_id = ?1 AND session_id = ?2",
            params![key.debate_id.get(), key.session_id.as_str()],
        )?;
        tx.commit()?;
        Ok(removed)
    }
}
