//! Raw data repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Create raw data records and link them to studies and files.
//! - Track the file (un)linking status of each raw data record.
//!
//! # Invariants
//! - `studies` returns study ids in the order the links were made, so the
//!   last entry is the most recent study that adopted the raw data.
//! - `filepaths` and `prep_templates` are ascending by id.
//! - A file row is stored only together with its raw data link.

use crate::model::prep_template::PrepTemplateId;
use crate::model::raw_data::{Filepath, FilepathId, LinkStatus, RawData, RawDataId};
use crate::model::study::StudyId;
use crate::repo::{ensure_tables, RepoError, RepoResult};
use crate::util::convert_to_id;
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

/// Repository interface for raw data records.
pub trait RawDataRepository {
    /// Creates raw data of the named filetype (e.g. `FASTQ`).
    fn create_raw_data(&self, filetype: &str) -> RepoResult<RawDataId>;
    fn get_raw_data(&self, id: RawDataId) -> RepoResult<Option<RawData>>;
    fn link_to_study(&self, id: RawDataId, study_id: StudyId) -> RepoResult<()>;
    /// Studies holding the raw data, oldest link first.
    fn studies(&self, id: RawDataId) -> RepoResult<Vec<StudyId>>;
    /// Attaches a file of the named filepath type (e.g. `raw_barcodes`).
    fn add_filepath(&self, id: RawDataId, path: &str, filepath_type: &str)
        -> RepoResult<FilepathId>;
    fn filepaths(&self, id: RawDataId) -> RepoResult<Vec<Filepath>>;
    fn set_link_status(&self, id: RawDataId, status: &LinkStatus) -> RepoResult<()>;
    /// Prep templates describing the raw data.
    fn prep_templates(&self, id: RawDataId) -> RepoResult<Vec<PrepTemplateId>>;
}

/// SQLite-backed raw data repository.
pub struct SqliteRawDataRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRawDataRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(
            conn,
            &[
                "raw_data",
                "study_raw_data",
                "filepath",
                "raw_filepath",
                "prep_template",
            ],
        )?;
        Ok(Self { conn })
    }
}

impl RawDataRepository for SqliteRawDataRepository<'_> {
    fn create_raw_data(&self, filetype: &str) -> RepoResult<RawDataId> {
        let filetype_id = convert_to_id(self.conn, filetype, "filetype")?;
        let id = self.conn.query_row(
            "INSERT INTO raw_data (filetype_id) VALUES (?1) RETURNING raw_data_id;",
            [filetype_id],
            |row| row.get::<_, RawDataId>(0),
        )?;
        info!("event=raw_data_create module=repo status=ok raw_data_id={id}");
        Ok(id)
    }

    fn get_raw_data(&self, id: RawDataId) -> RepoResult<Option<RawData>> {
        let row = self
            .conn
            .query_row(
                "SELECT rd.raw_data_id, ft.type, rd.link_filepaths_status
                 FROM raw_data rd
                 INNER JOIN filetype ft ON ft.filetype_id = rd.filetype_id
                 WHERE rd.raw_data_id = ?1;",
                [id],
                |row| {
                    Ok((
                        row.get::<_, RawDataId>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(id, filetype, status)| -> RepoResult<RawData> {
            let link_status = LinkStatus::parse(&status).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "unknown link status `{status}` for raw data {id}"
                ))
            })?;
            Ok(RawData {
                id,
                filetype,
                link_status,
            })
        })
        .transpose()
    }

    fn link_to_study(&self, id: RawDataId, study_id: StudyId) -> RepoResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO study_raw_data (study_id, raw_data_id) VALUES (?1, ?2);",
            params![study_id, id],
        )?;
        Ok(())
    }

    fn studies(&self, id: RawDataId) -> RepoResult<Vec<StudyId>> {
        let mut stmt = self.conn.prepare(
            "SELECT study_id FROM study_raw_data WHERE raw_data_id = ?1 ORDER BY rowid ASC;",
        )?;
        let ids = stmt
            .query_map([id], |row| row.get::<_, StudyId>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn add_filepath(
        &self,
        id: RawDataId,
        path: &str,
        filepath_type: &str,
    ) -> RepoResult<FilepathId> {
        if self.get_raw_data(id)?.is_none() {
            return Err(RepoError::not_found("raw data", id));
        }
        let filepath_type_id = convert_to_id(self.conn, filepath_type, "filepath_type")?;
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let filepath_id = tx.query_row(
            "INSERT INTO filepath (filepath, filepath_type_id)
             VALUES (?1, ?2)
             RETURNING filepath_id;",
            params![path, filepath_type_id],
            |row| row.get::<_, FilepathId>(0),
        )?;
        tx.execute(
            "INSERT INTO raw_filepath (raw_data_id, filepath_id) VALUES (?1, ?2);",
            params![id, filepath_id],
        )?;
        tx.commit()?;
        Ok(filepath_id)
    }

    fn filepaths(&self, id: RawDataId) -> RepoResult<Vec<Filepath>> {
        let mut stmt = self.conn.prepare(
            "SELECT fp.filepath_id, fp.filepath, fpt.filepath_type
             FROM raw_filepath rf
             INNER JOIN filepath fp ON fp.filepath_id = rf.filepath_id
             INNER JOIN filepath_type fpt ON fpt.filepath_type_id = fp.filepath_type_id
             WHERE rf.raw_data_id = ?1
             ORDER BY fp.filepath_id ASC;",
        )?;
        let files = stmt
            .query_map([id], |row| {
                Ok(Filepath {
                    id: row.get(0)?,
                    path: row.get(1)?,
                    filepath_type: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(files)
    }

    fn set_link_status(&self, id: RawDataId, status: &LinkStatus) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE raw_data SET link_filepaths_status = ?1 WHERE raw_data_id = ?2;",
            params![status.as_db_string(), id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("raw data", id));
        }
        info!("event=raw_data_link_status module=repo status=ok raw_data_id={id}");
        Ok(())
    }

    fn prep_templates(&self, id: RawDataId) -> RepoResult<Vec<PrepTemplateId>> {
        let mut stmt = self.conn.prepare(
            "SELECT prep_template_id FROM prep_template
             WHERE raw_data_id = ?1
             ORDER BY prep_template_id ASC;",
        )?;
        let ids = stmt
            .query_map([id], |row| row.get::<_, PrepTemplateId>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}
