//! Generic CRUD execution against PostgreSQL.

use crate::error::AppError;
use crate::models::Entity;
use crate::sql::{self, Condition, OrderBy, Page, PgBindValue, QueryBuf};
use sqlx::{PgConnection, PgPool};

pub struct CrudService;

impl CrudService {
    /// List rows matching every condition, ordered, optionally paged.
    pub async fn list<E: Entity>(
        pool: &PgPool,
        conditions: &[Condition],
        order: &[OrderBy],
        page: Option<Page>,
    ) -> Result<Vec<E>, AppError> {
        let q = sql::select_list(E::TABLE, conditions, order, page);
        Self::fetch_all(pool, &q).await
    }

    /// Fetch one row by id.
    pub async fn read<E: Entity>(pool: &PgPool, id: i64) -> Result<Option<E>, AppError> {
        let q = sql::select_by_id(E::TABLE, id);
        Self::fetch_optional(pool, &q).await
    }

    /// Fetch one row by id; missing rows are a 404.
    pub async fn get<E: Entity>(pool: &PgPool, id: i64) -> Result<E, AppError> {
        Self::read::<E>(pool, id)
            .await?
            .ok_or_else(|| AppError::not_found(E::LABEL, id))
    }

    /// First row matching every condition.
    pub async fn find_one<E: Entity>(pool: &PgPool, conditions: &[Condition]) -> Result<Option<E>, AppError> {
        let q = sql::select_list(E::TABLE, conditions, &[], Some(Page { offset: 0, limit: 1 }));
        Self::fetch_optional(pool, &q).await
    }

    pub async fn exists<E: Entity>(pool: &PgPool, conditions: &[Condition]) -> Result<bool, AppError> {
        let q = sql::exists(E::TABLE, conditions);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_scalar::<_, bool>(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        Ok(query.fetch_one(pool).await?)
    }

    /// 404 unless a row with this id exists.
    pub async fn ensure_exists<E: Entity>(pool: &PgPool, id: i64) -> Result<(), AppError> {
        if Self::exists::<E>(pool, &[Condition::Eq("id", id.into())]).await? {
            Ok(())
        } else {
            Err(AppError::not_found(E::LABEL, id))
        }
    }

    /// Insert one row; omitted columns take their database default. Returns the created row.
    pub async fn create<E: Entity>(pool: &PgPool, fields: &[(&'static str, PgBindValue)]) -> Result<E, AppError> {
        let q = sql::insert(E::TABLE, fields);
        Self::fetch_optional(pool, &q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    /// Update the listed columns of one row. Returns the updated row.
    pub async fn update<E: Entity>(
        pool: &PgPool,
        id: i64,
        fields: &[(&'static str, PgBindValue)],
    ) -> Result<E, AppError> {
        let q = sql::update(E::TABLE, id, fields, E::TOUCHES_UPDATED_AT);
        Self::fetch_optional(pool, &q)
            .await?
            .ok_or_else(|| AppError::not_found(E::LABEL, id))
    }

    /// Soft delete when the entity has an active flag, otherwise remove the row. Returns the affected row.
    pub async fn delete<E: Entity>(pool: &PgPool, id: i64) -> Result<E, AppError> {
        match E::ACTIVE_COLUMN {
            Some(column) => Self::update::<E>(pool, id, &[(column, false.into())]).await,
            None => Self::delete_where::<E>(pool, &[Condition::Eq("id", id.into())])
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| AppError::not_found(E::LABEL, id)),
        }
    }

    /// Remove every row matching the conditions. An empty condition list is refused.
    pub async fn delete_where<E: Entity>(pool: &PgPool, conditions: &[Condition]) -> Result<Vec<E>, AppError> {
        let q = sql::delete_where(E::TABLE, conditions)
            .ok_or_else(|| AppError::Internal(format!("refusing unqualified delete on {}", E::TABLE)))?;
        Self::fetch_all(pool, &q).await
    }

    /// `create` inside a caller's transaction.
    pub async fn create_in<E: Entity>(
        conn: &mut PgConnection,
        fields: &[(&'static str, PgBindValue)],
    ) -> Result<E, AppError> {
        let q = sql::insert(E::TABLE, fields);
        Self::fetch_optional_in(conn, &q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    /// `find_one` inside a caller's transaction.
    pub async fn find_one_in<E: Entity>(conn: &mut PgConnection, conditions: &[Condition]) -> Result<Option<E>, AppError> {
        let q = sql::select_list(E::TABLE, conditions, &[], Some(Page { offset: 0, limit: 1 }));
        Self::fetch_optional_in(conn, &q).await
    }

    /// `exists` inside a caller's transaction.
    pub async fn exists_in<E: Entity>(conn: &mut PgConnection, conditions: &[Condition]) -> Result<bool, AppError> {
        let q = sql::exists(E::TABLE, conditions);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_scalar::<_, bool>(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        Ok(query.fetch_one(&mut *conn).await?)
    }

    /// `update` inside a caller's transaction.
    pub async fn update_in<E: Entity>(
        conn: &mut PgConnection,
        id: i64,
        fields: &[(&'static str, PgBindValue)],
    ) -> Result<E, AppError> {
        let q = sql::update(E::TABLE, id, fields, E::TOUCHES_UPDATED_AT);
        Self::fetch_optional_in(conn, &q)
            .await?
            .ok_or_else(|| AppError::not_found(E::LABEL, id))
    }

    async fn fetch_optional_in<E: Entity>(conn: &mut PgConnection, q: &QueryBuf) -> Result<Option<E>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_as::<_, E>(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        Ok(query.fetch_optional(&mut *conn).await?)
    }

    async fn fetch_all<E: Entity>(pool: &PgPool, q: &QueryBuf) -> Result<Vec<E>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_as::<_, E>(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        Ok(query.fetch_all(pool).await?)
    }

    async fn fetch_optional<E: Entity>(pool: &PgPool, q: &QueryBuf) -> Result<Option<E>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_as::<_, E>(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        Ok(query.fetch_optional(pool).await?)
    }
}
