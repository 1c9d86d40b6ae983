//! Entity mapping
//!
//! Each mapped type declares its table and an explicit column schema through
//! the [`Entity`] trait. SQL for lookups, inserts, single-column updates and
//! deletes is generated from that schema; the functions doing so are pure and
//! never touch a connection.

use tiberius::Row;

use super::params::SqlValue;
use crate::error::{CoreError, Result};

/// Reference from a column to another table's column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: &'static str,
    pub column: &'static str,
}

/// One mapped column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub primary_key: bool,
    /// Value generated by the database on insert
    pub auto_increment: bool,
    pub references: Option<ForeignKey>,
}

impl Column {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            primary_key: false,
            auto_increment: false,
            references: None,
        }
    }

    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub const fn references(mut self, table: &'static str, column: &'static str) -> Self {
        self.references = Some(ForeignKey { table, column });
        self
    }
}

/// A type mapped to one table
///
/// `values` returns one value per column of `COLUMNS`, in the same order.
/// Values of auto-increment columns are ignored on insert.
pub trait Entity: Sized {
    /// Schema-qualified table name
    const TABLE: &'static str;
    const COLUMNS: &'static [Column];

    /// Decode a row selected with [`select_by_sql`] (columns in `COLUMNS` order)
    fn from_row(row: &Row) -> Result<Self>;

    fn values(&self) -> Vec<SqlValue>;

    /// Store the identifier generated on insert
    fn assign_key(&mut self, _key: i64) -> Result<()> {
        Ok(())
    }
}

/// Result shape of a joined select
pub trait Projection: Sized {
    /// Base table, optionally followed by join clauses
    const FROM: &'static str;
    /// Selected expressions, in decode order
    const SELECT: &'static [&'static str];
    /// Expression compared against the single parameter
    const FILTER: &'static str;

    fn from_row(row: &Row) -> Result<Self>;
}

/// Primary key column of `E`
pub fn primary_key<E: Entity>() -> Result<&'static Column> {
    E::COLUMNS
        .iter()
        .find(|c| c.primary_key)
        .ok_or_else(|| CoreError::Validation(format!("{} has no primary key column", E::TABLE)))
}

/// Column of `E` by name (case-insensitive)
pub fn column<E: Entity>(name: &str) -> Result<&'static Column> {
    E::COLUMNS
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| {
            CoreError::Validation(format!("unknown column '{}' on {}", name, E::TABLE))
        })
}

/// Value of the primary key of `entity`
pub fn key_value<E: Entity>(entity: &E) -> Result<SqlValue> {
    let position = E::COLUMNS
        .iter()
        .position(|c| c.primary_key)
        .ok_or_else(|| CoreError::Validation(format!("{} has no primary key column", E::TABLE)))?;
    entity.values().into_iter().nth(position).ok_or_else(|| {
        CoreError::Validation(format!(
            "{} returned fewer values than it has columns",
            E::TABLE
        ))
    })
}

fn column_list(columns: impl Iterator<Item = &'static Column>) -> String {
    columns
        .map(|c| format!("[{}]", c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `SELECT ... WHERE [column] = @P1`, at most `limit` rows
pub fn select_by_sql<E: Entity>(column: &Column, limit: Option<u32>) -> String {
    let top = limit.map(|n| format!("TOP ({}) ", n)).unwrap_or_default();
    format!(
        "SELECT {}{} FROM {} WHERE [{}] = @P1",
        top,
        column_list(E::COLUMNS.iter()),
        E::TABLE,
        column.name
    )
}

/// Insert of every non-generated column, returning the generated identity
pub fn insert_sql<E: Entity>() -> String {
    let writable: Vec<&'static Column> =
        E::COLUMNS.iter().filter(|c| !c.auto_increment).collect();
    let placeholders = (1..=writable.len())
        .map(|i| format!("@P{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SET NOCOUNT ON; INSERT INTO {} ({}) VALUES ({}); SELECT CONVERT(bigint, SCOPE_IDENTITY());",
        E::TABLE,
        column_list(writable.into_iter()),
        placeholders
    )
}

/// `UPDATE ... SET [column] = @P1 WHERE [key] = @P2`
///
/// The primary key and generated columns cannot be updated.
pub fn update_sql<E: Entity>(column_name: &str) -> Result<String> {
    let target = column::<E>(column_name)?;
    if target.primary_key || target.auto_increment {
        return Err(CoreError::Validation(format!(
            "column '{}' on {} is not updatable",
            target.name,
            E::TABLE
        )));
    }
    let key = primary_key::<E>()?;
    Ok(format!(
        "UPDATE {} SET [{}] = @P1 WHERE [{}] = @P2",
        E::TABLE,
        target.name,
        key.name
    ))
}

/// `DELETE ... WHERE [key] = @P1`
pub fn delete_sql<E: Entity>() -> Result<String> {
    let key = primary_key::<E>()?;
    Ok(format!("DELETE FROM {} WHERE [{}] = @P1", E::TABLE, key.name))
}

/// Joined select of a projection filtered on one value
pub fn projection_sql<P: Projection>() -> String {
    format!(
        "SELECT {} FROM {} WHERE {} = @P1",
        P::SELECT.join(", "),
        P::FROM,
        P::FILTER
    )
}

/// Map a decode failure of column `name` into a [`CoreError::Decode`]
/// Narrow a generated identity to an `int` key column
pub(crate) fn int_key<E: Entity>(key: i64) -> Result<i32> {
    i32::try_from(key).map_err(|_| {
        CoreError::Validation(format!(
            "identity {} returned for {} does not fit an int key",
            key,
            E::TABLE
        ))
    })
}

pub(crate) fn decode_error(name: &str, err: impl std::fmt::Display) -> CoreError {
    CoreError::Decode {
        column: name.to_string(),
        message: err.to_string(),
    }
}

/// Non-NULL column value of type `T`
pub(crate) fn required<'a, T>(row: &'a Row, index: usize, name: &str) -> Result<T>
where
    T: tiberius::FromSql<'a>,
{
    row.try_get::<T, _>(index)
        .map_err(|e| decode_error(name, e))?
        .ok_or_else(|| decode_error(name, "unexpected NULL"))
}
