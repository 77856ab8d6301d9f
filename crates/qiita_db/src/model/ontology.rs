//! Controlled-vocabulary ontologies (e.g. ENA investigation types).

use serde::Serialize;

pub type OntologyId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ontology {
    pub id: OntologyId,
    pub name: String,
}
