//! Prep template repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Create and read prep templates attached to raw data.
//! - Record the preprocessed data produced from a prep template, with the
//!   parameter set used to produce it.
//!
//! # Invariants
//! - A preprocessed data row is stored only together with its prep template
//!   link.

use crate::model::parameters::{ParamSetId, ParamTable};
use crate::model::prep_template::{PrepTemplate, PrepTemplateId, PreprocessedDataId};
use crate::model::raw_data::{Filepath, RawDataId};
use crate::repo::{ensure_tables, RepoError, RepoResult};
use crate::util::convert_to_id;
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

/// Repository interface for prep templates.
pub trait PrepTemplateRepository {
    /// Creates a prep template of the named data type (e.g. `16S`).
    fn create_prep_template(
        &self,
        raw_data_id: RawDataId,
        data_type: &str,
        investigation_type: Option<&str>,
    ) -> RepoResult<PrepTemplateId>;
    fn exists(&self, id: PrepTemplateId) -> RepoResult<bool>;
    fn get_prep_template(&self, id: PrepTemplateId) -> RepoResult<Option<PrepTemplate>>;
    fn filepaths(&self, id: PrepTemplateId) -> RepoResult<Vec<Filepath>>;
    fn set_preprocessing_status(&self, id: PrepTemplateId, status: &str) -> RepoResult<()>;
    /// Records preprocessed data produced with the given parameter set.
    fn add_preprocessed_data(
        &self,
        id: PrepTemplateId,
        params_table: ParamTable,
        params_id: ParamSetId,
    ) -> RepoResult<PreprocessedDataId>;
    /// Preprocessed data ids produced from the prep template, ascending.
    fn preprocessed_data(&self, id: PrepTemplateId) -> RepoResult<Vec<PreprocessedDataId>>;
}

/// SQLite-backed prep template repository.
pub struct SqlitePrepTemplateRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePrepTemplateRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(
            conn,
            &[
                "prep_template",
                "prep_template_filepath",
                "preprocessed_data",
                "prep_template_preprocessed_data",
            ],
        )?;
        Ok(Self { conn })
    }
}

impl PrepTemplateRepository for SqlitePrepTemplateRepository<'_> {
    fn create_prep_template(
        &self,
        raw_data_id: RawDataId,
        data_type: &str,
        investigation_type: Option<&str>,
    ) -> RepoResult<PrepTemplateId> {
        let data_type_id = convert_to_id(self.conn, data_type, "data_type")?;
        let id = self.conn.query_row(
            "INSERT INTO prep_template (raw_data_id, data_type_id, investigation_type)
             VALUES (?1, ?2, ?3)
             RETURNING prep_template_id;",
            params![raw_data_id, data_type_id, investigation_type],
            |row| row.get::<_, PrepTemplateId>(0),
        )?;
        info!(
            "event=prep_template_create module=repo status=ok prep_template_id={id} raw_data_id={raw_data_id}"
        );
        Ok(id)
    }

    fn exists(&self, id: PrepTemplateId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM prep_template WHERE prep_template_id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn get_prep_template(&self, id: PrepTemplateId) -> RepoResult<Option<PrepTemplate>> {
        let row = self
            .conn
            .query_row(
                "SELECT pt.prep_template_id, pt.raw_data_id, dt.data_type,
                        pt.investigation_type, pt.preprocessing_status
                 FROM prep_template pt
                 INNER JOIN data_type dt ON dt.data_type_id = pt.data_type_id
                 WHERE pt.prep_template_id = ?1;",
                [id],
                |row| {
                    Ok(PrepTemplate {
                        id: row.get(0)?,
                        raw_data_id: row.get(1)?,
                        data_type: row.get(2)?,
                        investigation_type: row.get(3)?,
                        preprocessing_status: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    fn filepaths(&self, id: PrepTemplateId) -> RepoResult<Vec<Filepath>> {
        let mut stmt = self.conn.prepare(
            "SELECT fp.filepath_id, fp.filepath, fpt.filepath_type
             FROM prep_template_filepath ptf
             INNER JOIN filepath fp ON fp.filepath_id = ptf.filepath_id
             INNER JOIN filepath_type fpt ON fpt.filepath_type_id = fp.filepath_type_id
             WHERE ptf.prep_template_id = ?1
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

    fn set_preprocessing_status(&self, id: PrepTemplateId, status: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE prep_template SET preprocessing_status = ?1 WHERE prep_template_id = ?2;",
            params![status, id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("prep template", id));
        }
        Ok(())
    }

    fn add_preprocessed_data(
        &self,
        id: PrepTemplateId,
        params_table: ParamTable,
        params_id: ParamSetId,
    ) -> RepoResult<PreprocessedDataId> {
        if !self.exists(id)? {
            return Err(RepoError::not_found("prep template", id));
        }
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let preprocessed_id = tx.query_row(
            "INSERT INTO preprocessed_data (preprocessed_params_table, preprocessed_params_id)
             VALUES (?1, ?2)
             RETURNING preprocessed_data_id;",
            params![params_table.table_name(), params_id],
            |row| row.get::<_, PreprocessedDataId>(0),
        )?;
        tx.execute(
            "INSERT INTO prep_template_preprocessed_data (prep_template_id, preprocessed_data_id)
             VALUES (?1, ?2);",
            params![id, preprocessed_id],
        )?;
        tx.commit()?;
        Ok(preprocessed_id)
    }

    fn preprocessed_data(&self, id: PrepTemplateId) -> RepoResult<Vec<PreprocessedDataId>> {
        let mut stmt = self.conn.prepare(
            "SELECT preprocessed_data_id FROM prep_template_preprocessed_data
             WHERE prep_template_id = ?1
             ORDER BY preprocessed_data_id ASC;",
        )?;
        let ids = stmt
            .query_map([id], |row| row.get::<_, PreprocessedDataId>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}
