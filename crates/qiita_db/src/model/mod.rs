//! Domain model for studies, sequencing-data records and parameter sets.
//!
//! # Responsibility
//! - Define the read models returned by repositories.
//! - Own the text encodings of enumerated status columns.
//!
//! # Invariants
//! - Every record is identified by its table's integer surrogate key.
//! - Parameter sets are immutable once stored.

pub mod ontology;
pub mod parameters;
pub mod prep_template;
pub mod raw_data;
pub mod study;
