//! Named statement parameters
//!
//! TDS binds parameters positionally as `@P1`, `@P2`, ... Statements here are
//! written against readable names instead: each name is declared as a local
//! variable initialized from its positional parameter, so `@name` can be used
//! (and reused) anywhere in the statement body.

use chrono::NaiveDateTime;
use tiberius::Query;

use crate::error::{CoreError, Result};

/// A bindable parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
    Null,
}

impl SqlValue {
    /// T-SQL type used when declaring the value as a variable
    pub fn sql_type(&self) -> &'static str {
        match self {
            SqlValue::SmallInt(_) => "SMALLINT",
            SqlValue::Int(_) => "INT",
            SqlValue::BigInt(_) => "BIGINT",
            SqlValue::Float(_) => "FLOAT",
            SqlValue::Text(_) => "NVARCHAR(MAX)",
            SqlValue::DateTime(_) => "DATETIME2",
            SqlValue::Null => "SQL_VARIANT",
        }
    }
}

impl From<i16> for SqlValue {
    fn from(value: i16) -> Self {
        SqlValue::SmallInt(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::BigInt(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::DateTime(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

/// Bind `value` as the next positional parameter of `query`
pub(crate) fn bind_value<'a>(query: &mut Query<'a>, value: &'a SqlValue) {
    match value {
        SqlValue::SmallInt(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::BigInt(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.as_str()),
        SqlValue::DateTime(v) => query.bind(*v),
        SqlValue::Null => query.bind(Option::<i32>::None),
    }
}

/// Ordered set of named parameters
///
/// # Example
///
/// ```rust
/// use azsqlctl_core::sql::NamedParams;
///
/// let params = NamedParams::new().bind("orderid", 71797);
/// let sql = params.statement("EXEC dbo.spGetOrder @orderid;").unwrap();
/// assert_eq!(sql, "DECLARE @orderid INT = @P1;\nEXEC dbo.spGetOrder @orderid;");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedParams {
    params: Vec<(String, SqlValue)>,
}

impl NamedParams {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Prefix `body` with one declaration per parameter
    ///
    /// Names must be plain identifiers and unique.
    pub fn statement(&self, body: &str) -> Result<String> {
        let mut sql = String::new();
        for (index, (name, value)) in self.params.iter().enumerate() {
            validate_name(name)?;
            if self.params[..index].iter().any(|(other, _)| other.eq_ignore_ascii_case(name)) {
                return Err(CoreError::Validation(format!(
                    "parameter @{} is bound twice",
                    name
                )));
            }
            sql.push_str(&format!(
                "DECLARE @{} {} = @P{};\n",
                name,
                value.sql_type(),
                index + 1
            ));
        }
        sql.push_str(body);
        Ok(sql)
    }

    /// Build a query for `body` with every parameter bound
    pub(crate) fn query(&self, body: &str) -> Result<Query<'_>> {
        let mut query = Query::new(self.statement(body)?);
        for (_, value) in &self.params {
            bind_value(&mut query, value);
        }
        Ok(query)
    }
}

fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "invalid parameter name '{}'",
            name
        )))
    }
}
