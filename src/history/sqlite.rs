use crate::error::RelayError;
use crate::models::chat::{ ChatTurn, ConversationEntry };
use log::debug;
use rusqlite::{ params, Connection, OptionalExtension };
use std::path::{ Path, PathBuf };

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS chats (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id TEXT NOT NULL,
        user       TEXT NOT NULL,
        bot        TEXT NOT NULL,
        timestamp  DATETIME DEFAULT CURRENT_TIMESTAMP
    );";

/// SQLite-backed chat turns. Every call opens its own connection and
/// commits before returning; nothing is shared between calls.
pub struct ConversationStore {
    path: PathBuf,
}

impl ConversationStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, RelayError> {
        Ok(Connection::open(&self.path)?)
    }

    /// Creates the `chats` table if it is missing. Safe on every start.
    pub fn initialize(&self) -> Result<(), RelayError> {
        let conn = self.connect()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    pub fn append(
        &self,
        session_id: &str,
        user_text: &str,
        bot_text: &str
    ) -> Result<(), RelayError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO chats (session_id, user, bot) VALUES (?1, ?2, ?3)",
            params![session_id, user_text, bot_text]
        )?;
        debug!("Stored turn {} for session {}", conn.last_insert_rowid(), session_id);
        Ok(())
    }

    /// The newest turn of every session, most recently active session first.
    pub fn latest_per_session(&self) -> Result<Vec<ChatTurn>, RelayError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.session_id, c.user, c.bot, c.timestamp
             FROM chats c
             INNER JOIN (
                 SELECT session_id, MAX(id) AS max_id
                 FROM chats
                 GROUP BY session_id
             ) AS latest ON c.session_id = latest.session_id AND c.id = latest.max_id
             ORDER BY c.id DESC"
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ChatTurn {
                id: row.get(0)?,
                session_id: row.get(1)?,
                user_text: row.get(2)?,
                bot_text: row.get(3)?,
                timestamp: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// All turns of one session in chronological order. Unknown sessions yield an empty list.
    pub fn turns_for_session(&self, session_id: &str) -> Result<Vec<ConversationEntry>, RelayError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT user, bot, timestamp FROM chats WHERE session_id = ?1 ORDER BY id ASC"
        )?;
        let rows = stmt.query_map(params![session_id], |row| {
            Ok(ConversationEntry {
                user_text: row.get(0)?,
                bot_text: row.get(1)?,
                timestamp: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Deletes the whole session that owns `turn_id`. Unknown ids are a no-op.
    pub fn delete_session_by_turn_id(&self, turn_id: i64) -> Result<(), RelayError> {
        let conn = self.connect()?;
        let session_id: Option<String> = conn
            .query_row("SELECT session_id FROM chats WHERE id = ?1", params![turn_id], |row|
                row.get(0)
            )
            .optional()?;

        if let Some(session_id) = session_id {
            let removed = conn.execute(
                "DELETE FROM chats WHERE session_id = ?1",
                params![session_id]
            )?;
            debug!("Deleted {} turns of session {}", removed, session_id);
        }
        Ok(())
    }

    pub fn clear_all(&self) -> Result<(), RelayError> {
        let conn = self.connect()?;
        conn.execute("DELETE FROM chats", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store(dir: &tempfile::TempDir) -> ConversationStore {
        let store = ConversationStore::new(dir.path().join("chats.db"));
        store.initialize().unwrap();
        store
    }

    #[test]
    fn initialize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        store.append("s1", "hi", "hello").unwrap();
        store.initialize().unwrap();
        assert_eq!(store.turns_for_session("s1").unwrap().len(), 1);
    }

    #[test]
    fn unknown_session_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        assert!(store.turns_for_session("never-seen").unwrap().is_empty());
    }

    #[test]
    fn append_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        store.append("s1", "hi", "hello").unwrap();

        let turns = store.turns_for_session("s1").unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].user_text, "hi");
        assert_eq!(turns[0].bot_text, "hello");
        assert!(!turns[0].timestamp.is_empty());
    }

    #[test]
    fn duplicate_content_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        store.append("s1", "same", "same").unwrap();
        store.append("s1", "same", "same").unwrap();
        assert_eq!(store.turns_for_session("s1").unwrap().len(), 2);
    }

    #[test]
    fn session_turns_are_chronological() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        store.append("s1", "first", "a").unwrap();
        store.append("s2", "other", "b").unwrap();
        store.append("s1", "second", "c").unwrap();

        let users: Vec<String> = store
            .turns_for_session("s1")
            .unwrap()
            .into_iter()
            .map(|t| t.user_text)
            .collect();
        assert_eq!(users, vec!["first", "second"]);
    }

    #[test]
    fn latest_per_session_picks_highest_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        store.append("s1", "s1-a", "x").unwrap();
        store.append("s2", "s2-a", "x").unwrap();
        store.append("s1", "s1-b", "x").unwrap();
        store.append("s3", "s3-a", "x").unwrap();
        store.append("s2", "s2-b", "x").unwrap();

        let latest = store.latest_per_session().unwrap();
        let summary: Vec<(&str, &str)> = latest
            .iter()
            .map(|t| (t.session_id.as_str(), t.user_text.as_str()))
            .collect();
        assert_eq!(summary, vec![("s2", "s2-b"), ("s3", "s3-a"), ("s1", "s1-b")]);
        assert!(latest.windows(2).all(|w| w[0].id > w[1].id));
    }

    #[test]
    fn delete_by_any_turn_removes_whole_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        store.append("s1", "a", "x").unwrap();
        store.append("s1", "b", "x").unwrap();
        store.append("s2", "c", "x").unwrap();

        let first_s1_turn = store
            .latest_per_session()
            .unwrap()
            .into_iter()
            .find(|t| t.session_id == "s1")
            .unwrap();
        // Any id of the session works, not just the newest one.
        store.delete_session_by_turn_id(first_s1_turn.id - 1).unwrap();

        assert!(store.turns_for_session("s1").unwrap().is_empty());
        assert_eq!(store.turns_for_session("s2").unwrap().len(), 1);
    }

    #[test]
    fn delete_unknown_turn_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        store.append("s1", "a", "x").unwrap();
        store.delete_session_by_turn_id(9999).unwrap();
        assert_eq!(store.turns_for_session("s1").unwrap().len(), 1);
    }

    #[test]
    fn clear_all_empties_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        store.append("s1", "a", "x").unwrap();
        store.append("s2", "b", "y").unwrap();
        store.clear_all().unwrap();
        assert!(store.latest_per_session().unwrap().is_empty());
    }

    #[test]
    fn unreachable_database_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConversationStore::new(dir.path().join("missing").join("chats.db"));
        assert!(matches!(store.initialize(), Err(RelayError::Storage(_))));
    }
}
