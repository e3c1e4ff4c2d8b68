//! Apply the table definitions in `schema` to the database: tables, constraints and indexes.
//! Order follows foreign-key dependencies; a reset drops in reverse order first.

use crate::error::AppError;
use crate::schema::{ColumnDef, TableDef, TABLES};
use crate::sql::quoted;
use sqlx::PgPool;

fn column_sql(c: &ColumnDef) -> String {
    let mut def = format!("{} {}", quoted(c.name), c.sql_type);
    if !c.nullable {
        def.push_str(" NOT NULL");
    }
    if let Some(d) = c.default {
        def.push_str(" DEFAULT ");
        def.push_str(d);
    }
    if let Some(fk) = c.references {
        def.push_str(&format!(
            " REFERENCES {} ({}) ON DELETE {}",
            quoted(fk.table),
            quoted(fk.column),
            fk.on_delete
        ));
    }
    def
}

/// CREATE TABLE IF NOT EXISTS with columns, primary key, unique and check constraints.
pub fn render_create_table(t: &TableDef) -> String {
    let mut defs: Vec<String> = t.columns.iter().map(column_sql).collect();

    let pk: Vec<String> = t.primary_key.iter().map(|s| quoted(s)).collect();
    defs.push(format!("PRIMARY KEY ({})", pk.join(", ")));

    for u in t.unique {
        let cols: Vec<String> = u.iter().map(|s| quoted(s)).collect();
        defs.push(format!("UNIQUE ({})", cols.join(", ")));
    }
    for ch in t.checks {
        defs.push(format!("CONSTRAINT {} CHECK ({})", quoted(ch.name), ch.expression));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        quoted(t.name),
        defs.join(",\n  ")
    )
}

pub fn render_indexes(t: &TableDef) -> Vec<String> {
    t.indexes
        .iter()
        .map(|idx| {
            let cols: Vec<String> = idx.columns.iter().map(|s| quoted(s)).collect();
            format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                quoted(idx.name),
                quoted(t.name),
                cols.join(", ")
            )
        })
        .collect()
}

/// Create every table and index that does not exist yet, in one transaction.
/// With `reset`, existing tables are dropped first (development only: data is lost).
/// Returns the names of the tables in creation order.
pub async fn apply_migrations(pool: &PgPool, reset: bool) -> Result<Vec<&'static str>, AppError> {
    let mut tx = pool.begin().await?;

    if reset {
        for t in TABLES.iter().rev() {
            tracing::warn!(table = t.name, "dropping table");
            sqlx::query(&format!("DROP TABLE IF EXISTS {} CASCADE", quoted(t.name)))
                .execute(&mut *tx)
                .await?;
        }
    }

    let mut created = Vec::with_capacity(TABLES.len());
    for t in TABLES {
        sqlx::query(&render_create_table(t)).execute(&mut *tx).await?;
        for sql in render_indexes(t) {
            sqlx::query(&sql).execute(&mut *tx).await?;
        }
        created.push(t.name);
    }

    tx.commit().await?;
    tracing::info!(tables = ?created, "schema ready");
    Ok(created)
}

/// Names of the base tables in the `public` schema.
pub async fn list_tables(pool: &PgPool) -> Result<Vec<String>, AppError> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT table_name::text FROM information_schema.tables \
         WHERE table_schema = 'public' AND table_type = 'BASE TABLE' ORDER BY table_name",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(name,)| name).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{BOOK_AUTHORS, CATEGORIES};

    #[test]
    fn renders_link_table_with_composite_key_and_cascades() {
        let sql = render_create_table(&BOOK_AUTHORS);
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS \"book_authors\" (\n  \
             \"book_id\" BIGINT NOT NULL REFERENCES \"books\" (\"id\") ON DELETE CASCADE,\n  \
             \"author_id\" BIGINT NOT NULL REFERENCES \"authors\" (\"id\") ON DELETE CASCADE,\n  \
             \"position\" INTEGER NOT NULL DEFAULT 1,\n  \
             PRIMARY KEY (\"book_id\", \"author_id\")\n)"
        );
    }

    #[test]
    fn renders_self_reference_unique_and_check() {
        let sql = render_create_table(&CATEGORIES);
        assert!(sql.contains("\"parent_id\" BIGINT REFERENCES \"categories\" (\"id\") ON DELETE SET NULL"));
        assert!(sql.contains("UNIQUE (\"name\")"));
        assert!(sql.contains("CONSTRAINT \"categories_not_own_parent\" CHECK (parent_id IS NULL OR parent_id <> id)"));
        assert_eq!(
            render_indexes(&CATEGORIES),
            vec!["CREATE INDEX IF NOT EXISTS \"idx_categories_parent_id\" ON \"categories\" (\"parent_id\")".to_string()]
        );
    }
}
