//! Study and user repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Create and read users and studies.
//! - Resolve which studies a user can see and which raw data a study holds.
//!
//! # Invariants
//! - `user_studies` contains owned and shared studies, each once, ascending.
//! - `raw_data_ids` is ascending by raw data id.

use crate::model::raw_data::RawDataId;
use crate::model::study::{Study, StudyId, StudyStatus, User, UserLevel};
use crate::repo::{ensure_tables, RepoError, RepoResult};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Repository interface for users and studies.
pub trait StudyRepository {
    fn create_user(&self, email: &str, name: Option<&str>, level: UserLevel) -> RepoResult<()>;
    fn get_user(&self, email: &str) -> RepoResult<Option<User>>;
    /// Owned and shared study ids of the user.
    fn user_studies(&self, email: &str) -> RepoResult<Vec<StudyId>>;
    fn create_study(&self, owner: &str, title: &str, status: StudyStatus) -> RepoResult<StudyId>;
    fn get_study(&self, id: StudyId) -> RepoResult<Option<Study>>;
    /// Grants `email` shared access to the study. Sharing twice is a no-op.
    fn share_study(&self, id: StudyId, email: &str) -> RepoResult<()>;
    fn set_study_status(&self, id: StudyId, status: StudyStatus) -> RepoResult<()>;
    /// Raw data linked to the study.
    fn raw_data_ids(&self, id: StudyId) -> RepoResult<Vec<RawDataId>>;
}

/// SQLite-backed study repository.
pub struct SqliteStudyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStudyRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["qiita_user", "study", "study_users", "study_raw_data"])?;
        Ok(Self { conn })
    }
}

impl StudyRepository for SqliteStudyRepository<'_> {
    fn create_user(&self, email: &str, name: Option<&str>, level: UserLevel) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO qiita_user (email, name, user_level) VALUES (?1, ?2, ?3);",
            params![email, name, level.as_db_str()],
        )?;
        Ok(())
    }

    fn get_user(&self, email: &str) -> RepoResult<Option<User>> {
        let row = self
            .conn
            .query_row(
                "SELECT email, name, user_level FROM qiita_user WHERE email = ?1;",
                [email],
                |row| Ok(parse_user_row(row)),
            )
            .optional()?;
        row.transpose()
    }

    fn user_studies(&self, email: &str) -> RepoResult<Vec<StudyId>> {
        let mut stmt = self.conn.prepare(
            "SELECT study_id FROM study WHERE email = ?1
             UNION
             SELECT study_id FROM study_users WHERE email = ?1
             ORDER BY study_id ASC;",
        )?;
        let ids = stmt
            .query_map([email], |row| row.get::<_, StudyId>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn create_study(&self, owner: &str, title: &str, status: StudyStatus) -> RepoResult<StudyId> {
        let id = self.conn.query_row(
            "INSERT INTO study (email, study_title, study_status)
             VALUES (?1, ?2, ?3)
             RETURNING study_id;",
            params![owner, title, status.as_db_str()],
            |row| row.get::<_, StudyId>(0),
        )?;
        info!("event=study_create module=repo status=ok study_id={id}");
        Ok(id)
    }

    fn get_study(&self, id: StudyId) -> RepoResult<Option<Study>> {
        let row = self
            .conn
            .query_row(
                "SELECT study_id, email, study_title, study_status
                 FROM study
                 WHERE study_id = ?1;",
                [id],
                |row| Ok(parse_study_row(row)),
            )
            .optional()?;
        row.transpose()
    }

    fn share_study(&self, id: StudyId, email: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO study_users (study_id, email) VALUES (?1, ?2);",
            params![id, email],
        )?;
        Ok(())
    }

    fn set_study_status(&self, id: StudyId, status: StudyStatus) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE study SET study_status = ?1 WHERE study_id = ?2;",
            params![status.as_db_str(), id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("study", id));
        }
        Ok(())
    }

    fn raw_data_ids(&self, id: StudyId) -> RepoResult<Vec<RawDataId>> {
        let mut stmt = self.conn.prepare(
            "SELECT raw_data_id FROM study_raw_data WHERE study_id = ?1 ORDER BY raw_data_id ASC;",
        )?;
        let ids = stmt
            .query_map([id], |row| row.get::<_, RawDataId>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let level_text: String = row.get("user_level")?;
    let level = UserLevel::parse(&level_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid user level `{level_text}` in qiita_user.user_level"
        ))
    })?;
    Ok(User {
        email: row.get("email")?,
        name: row.get("name")?,
        level,
    })
}

fn parse_study_row(row: &Row<'_>) -> RepoResult<Study> {
    let status_text: String = row.get("study_status")?;
    let status = StudyStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid study status `{status_text}` in study.study_status"
        ))
    })?;
    Ok(Study {
        id: row.get("study_id")?,
        owner: row.get("email")?,
        title: row.get("study_title")?,
        status,
    })
}
