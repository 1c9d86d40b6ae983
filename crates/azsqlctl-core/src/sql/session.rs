//! Repository-style session over one connection

use futures::TryStreamExt;
use tiberius::{Query, QueryItem};
use tracing::debug;

use super::connection::{ConnectionSettings, SqlConnection, release};
use super::entity::{
    self, Entity, Projection, delete_sql, insert_sql, key_value, projection_sql, select_by_sql,
    update_sql,
};
use super::params::{SqlValue, bind_value};
use crate::error::{CoreError, Result};

/// Generic CRUD over [`Entity`] types, sharing one connection
pub struct Session {
    connection: SqlConnection,
}

impl Session {
    pub async fn open(settings: &ConnectionSettings) -> Result<Self> {
        Ok(Self {
            connection: SqlConnection::open(settings).await?,
        })
    }

    pub fn new(connection: SqlConnection) -> Self {
        Self { connection }
    }

    /// Entity by primary key
    pub async fn find<E: Entity>(&mut self, key: impl Into<SqlValue>) -> Result<Option<E>> {
        let key_column = entity::primary_key::<E>()?;
        let sql = select_by_sql::<E>(key_column, Some(1));
        let mut rows = self.select::<E>(sql, key.into()).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    /// Every entity whose `column` equals `value`
    pub async fn find_by<E: Entity>(
        &mut self,
        column: &str,
        value: impl Into<SqlValue>,
    ) -> Result<Vec<E>> {
        let column = entity::column::<E>(column)?;
        let sql = select_by_sql::<E>(column, None);
        self.select::<E>(sql, value.into()).await
    }

    /// Rows of a joined projection
    pub async fn project<P: Projection>(&mut self, filter: impl Into<SqlValue>) -> Result<Vec<P>> {
        let sql = projection_sql::<P>();
        let value = filter.into();
        debug!(sql = %sql, "Projection");

        let mut query = Query::new(sql);
        bind_value(&mut query, &value);
        let mut stream = query.query(self.connection.client()).await?;

        let mut rows = Vec::new();
        while let Some(item) = stream.try_next().await? {
            if let QueryItem::Row(row) = item {
                rows.push(P::from_row(&row)?);
            }
        }
        Ok(rows)
    }

    /// Insert `entity` and store the generated key on it
    pub async fn insert<E: Entity>(&mut self, entity: &mut E) -> Result<i64> {
        let sql = insert_sql::<E>();
        debug!(sql = %sql, "Insert");

        let values: Vec<SqlValue> = E::COLUMNS
            .iter()
            .zip(entity.values())
            .filter(|(column, _)| !column.auto_increment)
            .map(|(_, value)| value)
            .collect();

        let mut query = Query::new(sql);
        for value in &values {
            bind_value(&mut query, value);
        }

        let results = query
            .query(self.connection.client())
            .await?
            .into_results()
            .await?;
        let key = results
            .into_iter()
            .rev()
            .find_map(|set| set.into_iter().next())
            .and_then(|row| row.get::<i64, _>(0))
            .ok_or_else(|| CoreError::Decode {
                column: "identity".to_string(),
                message: format!("no identity value returned for {}", E::TABLE),
            })?;

        entity.assign_key(key)?;
        Ok(key)
    }

    /// Set one column of the row behind `entity`; returns rows affected
    pub async fn update<E: Entity>(
        &mut self,
        entity: &E,
        column: &str,
        value: impl Into<SqlValue>,
    ) -> Result<u64> {
        let sql = update_sql::<E>(column)?;
        let value = value.into();
        let key = key_value(entity)?;
        debug!(sql = %sql, "Update");

        let mut query = Query::new(sql);
        bind_value(&mut query, &value);
        bind_value(&mut query, &key);
        let result = query.execute(self.connection.client()).await?;
        Ok(result.total())
    }

    /// Delete the row behind `entity`; returns rows affected
    pub async fn delete<E: Entity>(&mut self, entity: &E) -> Result<u64> {
        let sql = delete_sql::<E>()?;
        let key = key_value(entity)?;
        debug!(sql = %sql, "Delete");

        let mut query = Query::new(sql);
        bind_value(&mut query, &key);
        let result = query.execute(self.connection.client()).await?;
        Ok(result.total())
    }

    /// Close the session's connection, handing back `outcome`
    pub async fn finish<T>(self, outcome: Result<T>) -> Result<T> {
        release(self.connection, outcome).await
    }

    async fn select<E: Entity>(&mut self, sql: String, value: SqlValue) -> Result<Vec<E>> {
        debug!(sql = %sql, "Select");
        let mut query = Query::new(sql);
        bind_value(&mut query, &value);
        let mut stream = query.query(self.connection.client()).await?;

        let mut rows = Vec::new();
        while let Some(item) = stream.try_next().await? {
            if let QueryItem::Row(row) = item {
                rows.push(E::from_row(&row)?);
            }
        }
        Ok(rows)
    }
}
