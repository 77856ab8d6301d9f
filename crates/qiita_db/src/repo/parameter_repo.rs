//! Parameter-set repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Introspect parameter table columns.
//! - Check value-set existence, insert new sets and decode stored rows.
//!
//! # Invariants
//! - Column names are checked with `ensure_identifier` before they reach
//!   SQL text.
//! - Existence checks compare with `IS`, so a NULL value matches a stored
//!   NULL.
//! - No update or delete path exists; stored sets are immutable.

use crate::model::parameters::{
    ParamSetId, ParamTable, ParamValue, ParamValues, ParameterSet, PARAM_SET_NAME_COLUMN,
};
use crate::repo::{ensure_tables, RepoError, RepoResult};
use crate::util::{ensure_identifier, get_table_cols_w_type, ColumnType, TableColumn};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};

const PARAMETER_TABLES: [&str; 3] = [
    "preprocessed_sequence_illumina_params",
    "preprocessed_sequence_454_params",
    "processed_params_sortmerna",
];

/// Repository interface for parameter tables.
pub trait ParameterRepository {
    /// All columns of `table`, key column included, in declaration order.
    fn table_columns(&self, table: ParamTable) -> RepoResult<Vec<TableColumn>>;
    /// Whether a row with exactly these column values exists.
    fn value_set_exists(&self, table: ParamTable, values: &ParamValues) -> RepoResult<bool>;
    /// Inserts a named set and returns its new key.
    fn insert_parameter_set(
        &self,
        table: ParamTable,
        name: &str,
        values: &ParamValues,
    ) -> RepoResult<ParamSetId>;
    /// Whether a row with this key exists.
    fn parameter_set_exists(&self, table: ParamTable, id: ParamSetId) -> RepoResult<bool>;
    fn get_parameter_set(
        &self,
        table: ParamTable,
        id: ParamSetId,
    ) -> RepoResult<Option<ParameterSet>>;
    /// All sets of `table` ordered by key.
    fn list_parameter_sets(&self, table: ParamTable) -> RepoResult<Vec<ParameterSet>>;
}

/// SQLite-backed parameter repository.
pub struct SqliteParameterRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteParameterRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &PARAMETER_TABLES)?;
        Ok(Self { conn })
    }
}

impl ParameterRepository for SqliteParameterRepository<'_> {
    fn table_columns(&self, table: ParamTable) -> RepoResult<Vec<TableColumn>> {
        Ok(get_table_cols_w_type(self.conn, table.table_name())?)
    }

    fn value_set_exists(&self, table: ParamTable, values: &ParamValues) -> RepoResult<bool> {
        let mut conditions = Vec::with_capacity(values.len());
        let mut bind_values = Vec::with_capacity(values.len());
        for (index, (column, value)) in values.iter().enumerate() {
            conditions.push(format!("{} IS ?{}", ensure_identifier(column)?, index + 1));
            bind_values.push(to_sql_value(value));
        }
        let where_clause = if conditions.is_empty() {
            "1 = 1".to_string()
        } else {
            conditions.join(" AND ")
        };

        let exists: i64 = self.conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE {where_clause});",
                table.table_name()
            ),
            params_from_iter(bind_values),
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn insert_parameter_set(
        &self,
        table: ParamTable,
        name: &str,
        values: &ParamValues,
    ) -> RepoResult<ParamSetId> {
        let mut columns = vec![PARAM_SET_NAME_COLUMN];
        let mut placeholders = vec!["?1".to_string()];
        let mut bind_values = vec![Value::Text(name.to_string())];
        for (index, (column, value)) in values.iter().enumerate() {
            columns.push(ensure_identifier(column)?);
            placeholders.push(format!("?{}", index + 2));
            bind_values.push(to_sql_value(value));
        }

        let id = self.conn.query_row(
            &format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING {};",
                table.table_name(),
                columns.join(", "),
                placeholders.join(", "),
                table.id_column()
            ),
            params_from_iter(bind_values),
            |row| row.get::<_, ParamSetId>(0),
        )?;
        Ok(id)
    }

    fn parameter_set_exists(&self, table: ParamTable, id: ParamSetId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1);",
                table.table_name(),
                table.id_column()
            ),
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn get_parameter_set(
        &self,
        table: ParamTable,
        id: ParamSetId,
    ) -> RepoResult<Option<ParameterSet>> {
        let columns = self.table_columns(table)?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ?1;",
            table.table_name(),
            table.id_column()
        ))?;
        let row = stmt
            .query_row([id], |row| Ok(parse_parameter_row(row, table, &columns)))
            .optional()?;
        row.transpose()
    }

    fn list_parameter_sets(&self, table: ParamTable) -> RepoResult<Vec<ParameterSet>> {
        let columns = self.table_columns(table)?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT * FROM {} ORDER BY {} ASC;",
            table.table_name(),
            table.id_column()
        ))?;
        let mut rows = stmt.query([])?;
        let mut sets = Vec::new();
        while let Some(row) = rows.next()? {
            sets.push(parse_parameter_row(row, table, &columns)?);
        }
        Ok(sets)
    }
}

fn parse_parameter_row(
    row: &Row<'_>,
    table: ParamTable,
    columns: &[TableColumn],
) -> RepoResult<ParameterSet> {
    let id: ParamSetId = row.get(table.id_column())?;
    let name: String = row.get(PARAM_SET_NAME_COLUMN)?;

    let mut values = ParamValues::new();
    for column in columns {
        if column.name == table.id_column() || column.name == PARAM_SET_NAME_COLUMN {
            continue;
        }
        let raw = row.get_ref(column.name.as_str())?;
        let value = decode_value(column.kind, raw).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "unexpected {:?} value in {}.{}",
                raw.data_type(),
                table.table_name(),
                column.name
            ))
        })?;
        values.insert(column.name.clone(), value);
    }

    Ok(ParameterSet {
        id,
        table,
        name,
        values,
    })
}

fn decode_value(kind: ColumnType, raw: ValueRef<'_>) -> Option<ParamValue> {
    match (kind, raw) {
        (_, ValueRef::Null) => Some(ParamValue::Null),
        (ColumnType::Boolean, ValueRef::Integer(0)) => Some(ParamValue::Bool(false)),
        (ColumnType::Boolean, ValueRef::Integer(1)) => Some(ParamValue::Bool(true)),
        (ColumnType::Integer, ValueRef::Integer(value)) => Some(ParamValue::Integer(value)),
        (ColumnType::Float, ValueRef::Real(value)) => Some(ParamValue::Float(value)),
        (ColumnType::Float, ValueRef::Integer(value)) => Some(ParamValue::Float(value as f64)),
        (ColumnType::Text, ValueRef::Text(bytes)) => std::str::from_utf8(bytes)
            .ok()
            .map(|text| ParamValue::Text(text.to_string())),
        _ => None,
    }
}

fn to_sql_value(value: &ParamValue) -> Value {
    match value {
        ParamValue::Bool(flag) => Value::Integer(i64::from(*flag)),
        ParamValue::Integer(number) => Value::Integer(*number),
        ParamValue::Float(number) => Value::Real(*number),
        ParamValue::Text(text) => Value::Text(text.clone()),
        ParamValue::Null => Value::Null,
    }
}
