//! Ontology repository contracts and SQLite implementation.
//!
//! Terms are either curated (shipped with the schema) or user-defined
//! (added by submitters who found no fitting curated term).

use crate::model::ontology::{Ontology, OntologyId};
use crate::repo::{bool_to_int, ensure_tables, RepoError, RepoResult};
use crate::util::convert_to_id;
use rusqlite::{params, Connection, OptionalExtension};

pub trait OntologyRepository {
    fn get_ontology(&self, id: OntologyId) -> RepoResult<Option<Ontology>>;
    /// Looks an ontology up by name, e.g. `ENA`.
    fn find_by_name(&self, name: &str) -> RepoResult<Ontology>;
    /// Curated terms, in insertion order.
    fn terms(&self, id: OntologyId) -> RepoResult<Vec<String>>;
    /// Submitter-added terms, in insertion order.
    fn user_defined_terms(&self, id: OntologyId) -> RepoResult<Vec<String>>;
    /// Adds a term. Adding an existing term is a no-op.
    fn add_term(&self, id: OntologyId, term: &str, user_defined: bool) -> RepoResult<()>;
}

pub struct SqliteOntologyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOntologyRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["ontology", "term"])?;
        Ok(Self { conn })
    }

    fn terms_by_origin(&self, id: OntologyId, user_defined: bool) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT term FROM term
             WHERE ontology_id = ?1 AND user_defined = ?2
             ORDER BY term_id ASC;",
        )?;
        let terms = stmt
            .query_map(params![id, bool_to_int(user_defined)], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(terms)
    }
}

impl OntologyRepository for SqliteOntologyRepository<'_> {
    fn get_ontology(&self, id: OntologyId) -> RepoResult<Option<Ontology>> {
        let row = self
            .conn
            .query_row(
                "SELECT ontology_id, ontology FROM ontology WHERE ontology_id = ?1;",
                [id],
                |row| {
                    Ok(Ontology {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Ontology> {
        let id = convert_to_id(self.conn, name, "ontology")?;
        self.get_ontology(id)?
            .ok_or_else(|| RepoError::not_found("ontology", name))
    }

    fn terms(&self, id: OntologyId) -> RepoResult<Vec<String>> {
        self.terms_by_origin(id, false)
    }

    fn user_defined_terms(&self, id: OntologyId) -> RepoResult<Vec<String>> {
        self.terms_by_origin(id, true)
    }

    fn add_term(&self, id: OntologyId, term: &str, user_defined: bool) -> RepoResult<()> {
        if self.get_ontology(id)?.is_none() {
            return Err(RepoError::not_found("ontology", id));
        }
        self.conn.execute(
            "INSERT OR IGNORE INTO term (ontology_id, term, user_defined) VALUES (?1, ?2, ?3);",
            params![id, term, bool_to_int(user_defined)],
        )?;
        Ok(())
    }
}
