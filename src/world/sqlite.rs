use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::core::serialization::{SaveError, SaveState, SavedAnswer, SAVE_VERSION};
use crate::data::clues::{Character, ClueId};
use crate::data::questions::QuestionId;

const SAVE_SCHEMA_VERSION: i64 = 1;

const SAVE_DB_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS save_meta (
  id INTEGER PRIMARY KEY CHECK (id = 1),
  schema_version INTEGER NOT NULL,
  save_version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS session (
  id INTEGER PRIMARY KEY CHECK (id = 1),
  character TEXT NOT NULL,
  scene TEXT
);

CREATE TABLE IF NOT EXISTS flags (
  name TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS clues (
  clue_id INTEGER PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS revealed_questions (
  question_id INTEGER PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS answers (
  question_id INTEGER PRIMARY KEY,
  answer_text TEXT NOT NULL,
  correct INTEGER NOT NULL
);
"#;

/// Single-slot save store in SQLite.
pub struct SaveDb {
    conn: Connection,
}

impl SaveDb {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SaveError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, SaveError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, SaveError> {
        let mut db = Self { conn };
        db.conn.execute_batch(SAVE_DB_SCHEMA)?;
        db.ensure_save_meta()?;
        Ok(db)
    }

    pub fn load_state(&self) -> Result<Option<SaveState>, SaveError> {
        let session = self
            .conn
            .query_row(
                "SELECT character, scene FROM session WHERE id = 1",
                [],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)),
            )
            .optional()?;
        let Some((character, scene)) = session else {
            return Ok(None);
        };
        let character = Character::parse(&character).ok_or_else(|| {
            SaveError::InvalidData(format!("unknown character {}", character))
        })?;

        Ok(Some(SaveState {
            version: SAVE_VERSION,
            character,
            scene,
            flags: self.load_flags()?,
            clues: self.load_clues()?,
            revealed_questions: self.load_revealed_questions()?,
            answers: self.load_answers()?,
        }))
    }

    pub fn save_state(&mut self, state: &SaveState) -> Result<(), SaveError> {
        let tx = self.conn.transaction()?;

        tx.execute("DELETE FROM session", [])?;
        tx.execute(
            "INSERT INTO session (id, character, scene) VALUES (1, ?1, ?2)",
            params![state.character.as_str(), state.scene],
        )?;

        tx.execute("DELETE FROM flags", [])?;
        for flag in &state.flags {
            tx.execute("INSERT OR IGNORE INTO flags (name) VALUES (?1)", params![flag])?;
        }

        tx.execute("DELETE FROM clues", [])?;
        for clue in &state.clues {
            tx.execute(
                "INSERT OR IGNORE INTO clues (clue_id) VALUES (?1)",
                params![clue.0 as i64],
            )?;
        }

        tx.execute("DELETE FROM revealed_questions", [])?;
        for question in &state.revealed_questions {
            tx.execute(
                "INSERT OR IGNORE INTO revealed_questions (question_id) VALUES (?1)",
                params![question.0 as i64],
            )?;
        }

        tx.execute("DELETE FROM answers", [])?;
        for answer in &state.answers {
            tx.execute(
                "INSERT OR REPLACE INTO answers (question_id, answer_text, correct) VALUES (?1, ?2, ?3)",
                params![
                    answer.question.0 as i64,
                    answer.text,
                    if answer.correct { 1 } else { 0 }
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn ensure_save_meta(&mut self) -> Result<(), SaveError> {
        let meta = self
            .conn
            .query_row(
                "SELECT schema_version, save_version FROM save_meta WHERE id = 1",
                [],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        match meta {
            Some((schema_version, save_version)) => {
                if schema_version == SAVE_SCHEMA_VERSION && save_version == SAVE_VERSION as i64 {
                    return Ok(());
                }
                Err(SaveError::InvalidData(format!(
                    "save_meta version mismatch (schema {}, save {}, expected {}, {})",
                    schema_version, save_version, SAVE_SCHEMA_VERSION, SAVE_VERSION
                )))
            }
            None => {
                self.conn.execute(
                    "INSERT INTO save_meta (id, schema_version, save_version) VALUES (1, ?1, ?2)",
                    params![SAVE_SCHEMA_VERSION, SAVE_VERSION as i64],
                )?;
                Ok(())
            }
        }
    }

    fn load_flags(&self) -> Result<Vec<String>, SaveError> {
        let mut stmt = self.conn.prepare("SELECT name FROM flags ORDER BY name")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut flags = Vec::new();
        for row in rows {
            flags.push(row?);
        }
        Ok(flags)
    }

    fn load_clues(&self) -> Result<Vec<ClueId>, SaveError> {
        let mut stmt = self
            .conn
            .prepare("SELECT clue_id FROM clues ORDER BY clue_id")?;
        let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
        let mut clues = Vec::new();
        for row in rows {
            clues.push(ClueId(id_from_row(row?, "clue")?));
        }
        Ok(clues)
    }

    fn load_revealed_questions(&self) -> Result<Vec<QuestionId>, SaveError> {
        let mut stmt = self
            .conn
            .prepare("SELECT question_id FROM revealed_questions ORDER BY question_id")?;
        let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
        let mut questions = Vec::new();
        for row in rows {
            questions.push(QuestionId(id_from_row(row?, "question")?));
        }
        Ok(questions)
    }

    fn load_answers(&self) -> Result<Vec<SavedAnswer>, SaveError> {
        let mut stmt = self.conn.prepare(
            "SELECT question_id, answer_text, correct FROM answers ORDER BY question_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)? != 0,
            ))
        })?;
        let mut answers = Vec::new();
        for row in rows {
            let (question, text, correct) = row?;
            answers.push(SavedAnswer {
                question: QuestionId(id_from_row(question, "question")?),
                text,
                correct,
            });
        }
        Ok(answers)
    }
}

fn id_from_row(value: i64, kind: &str) -> Result<u32, SaveError> {
    u32::try_from(value)
        .map_err(|_| SaveError::InvalidData(format!("{} id {} out of range", kind, value)))
}

impl crate::world::repository::SaveRepository for SaveDb {
    fn load(&mut self) -> Result<Option<SaveState>, SaveError> {
        SaveDb::load_state(self)
    }

    fn save(&mut self, state: &SaveState) -> Result<(), SaveError> {
        SaveDb::save_state(self, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SaveState {
        SaveState {
            character: Character::Partner,
            scene: Some("cellar".to_string()),
            flags: vec!["found_key".to_string(), "met_butler".to_string()],
            clues: vec![ClueId(1), ClueId(3)],
            revealed_questions: vec![QuestionId(4)],
            answers: vec![SavedAnswer {
                question: QuestionId(1),
                text: "a hammer".to_string(),
                correct: true,
            }],
            ..SaveState::default()
        }
    }

    #[test]
    fn empty_database_has_no_state() {
        let db = SaveDb::open_in_memory().unwrap();
        assert!(db.load_state().unwrap().is_none());
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.db");
        {
            let mut db = SaveDb::open(&path).unwrap();
            db.save_state(&sample()).unwrap();
        }
        let db = SaveDb::open(&path).unwrap();
        assert_eq!(db.load_state().unwrap(), Some(sample()));
    }

    #[test]
    fn saving_replaces_previous_contents() {
        let mut db = SaveDb::open_in_memory().unwrap();
        db.save_state(&sample()).unwrap();
        let smaller = SaveState {
            flags: vec!["fresh".to_string()],
            ..SaveState::default()
        };
        db.save_state(&smaller).unwrap();
        assert_eq!(db.load_state().unwrap(), Some(smaller));
    }
}
