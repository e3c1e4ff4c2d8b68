//! Builds parameterized SELECT, INSERT, UPDATE, DELETE. Identifiers come from code, values are parameters.

use crate::sql::PgBindValue;

/// Quote identifier for PostgreSQL (safe: only from code).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: PgBindValue) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// One WHERE predicate. Predicates are joined with AND.
#[derive(Clone, Debug)]
pub enum Condition {
    Eq(&'static str, PgBindValue),
    Ne(&'static str, PgBindValue),
    Gt(&'static str, PgBindValue),
    Gte(&'static str, PgBindValue),
    Lte(&'static str, PgBindValue),
    /// `column IS NULL OR column >= value`, for open-ended windows.
    GteOrNull(&'static str, PgBindValue),
    /// Case-insensitive substring match against any of the columns.
    Search(&'static [&'static str], String),
    /// `column IN (SELECT select_column FROM table WHERE where_column = value)`, for link tables.
    InLinked {
        column: &'static str,
        table: &'static str,
        select_column: &'static str,
        where_column: &'static str,
        value: PgBindValue,
    },
}

#[derive(Clone, Copy, Debug)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Clone, Copy, Debug)]
pub struct OrderBy {
    pub column: &'static str,
    pub direction: Direction,
}

impl OrderBy {
    pub const fn asc(column: &'static str) -> Self {
        OrderBy {
            column,
            direction: Direction::Asc,
        }
    }

    pub const fn desc(column: &'static str) -> Self {
        OrderBy {
            column,
            direction: Direction::Desc,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub offset: i64,
    pub limit: i64,
}

/// Escape LIKE wildcards so user input matches literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn where_clause(q: &mut QueryBuf, conditions: &[Condition]) -> String {
    let mut parts = Vec::with_capacity(conditions.len());
    for c in conditions {
        let part = match c {
            Condition::Eq(col, v) if v.is_null() => format!("{} IS NULL", quoted(col)),
            Condition::Eq(col, v) => {
                let n = q.push_param(v.clone());
                format!("{} = ${}", quoted(col), n)
            }
            Condition::Ne(col, v) => {
                let n = q.push_param(v.clone());
                format!("{} IS DISTINCT FROM ${}", quoted(col), n)
            }
            Condition::Gt(col, v) => {
                let n = q.push_param(v.clone());
                format!("{} > ${}", quoted(col), n)
            }
            Condition::Gte(col, v) => {
                let n = q.push_param(v.clone());
                format!("{} >= ${}", quoted(col), n)
            }
            Condition::Lte(col, v) => {
                let n = q.push_param(v.clone());
                format!("{} <= ${}", quoted(col), n)
            }
            Condition::GteOrNull(col, v) => {
                let n = q.push_param(v.clone());
                format!("({0} IS NULL OR {0} >= ${1})", quoted(col), n)
            }
            Condition::Search(cols, term) => {
                let n = q.push_param(PgBindValue::from(like_pattern(term)));
                let ors: Vec<String> = cols.iter().map(|col| format!("{} ILIKE ${}", quoted(col), n)).collect();
                format!("({})", ors.join(" OR "))
            }
            Condition::InLinked {
                column,
                table,
                select_column,
                where_column,
                value,
            } => {
                let n = q.push_param(value.clone());
                format!(
                    "{} IN (SELECT {} FROM {} WHERE {} = ${})",
                    quoted(column),
                    quoted(select_column),
                    quoted(table),
                    quoted(where_column),
                    n
                )
            }
        };
        parts.push(part);
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// SELECT * with filters, ordering and optional LIMIT/OFFSET (both bound as parameters).
pub fn select_list(table: &str, conditions: &[Condition], order: &[OrderBy], page: Option<Page>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, conditions);
    let order_sql = if order.is_empty() {
        String::new()
    } else {
        let cols: Vec<String> = order
            .iter()
            .map(|o| match o.direction {
                Direction::Asc => format!("{} ASC", quoted(o.column)),
                Direction::Desc => format!("{} DESC", quoted(o.column)),
            })
            .collect();
        format!(" ORDER BY {}", cols.join(", "))
    };
    let page_sql = match page {
        Some(p) => {
            let limit = q.push_param(p.limit.into());
            let offset = q.push_param(p.offset.into());
            format!(" LIMIT ${} OFFSET ${}", limit, offset)
        }
        None => String::new(),
    };
    q.sql = format!("SELECT * FROM {}{}{}{}", quoted(table), where_sql, order_sql, page_sql);
    q
}

/// SELECT by single-column primary key `id`.
pub fn select_by_id(table: &str, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(id.into());
    q.sql = format!("SELECT * FROM {} WHERE \"id\" = ${}", quoted(table), n);
    q
}

/// SELECT EXISTS(...) for the given predicates.
pub fn exists(table: &str, conditions: &[Condition]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, conditions);
    q.sql = format!("SELECT EXISTS(SELECT 1 FROM {}{})", quoted(table), where_sql);
    q
}

/// INSERT the given columns; columns not listed take their DB default.
pub fn insert(table: &str, fields: &[(&'static str, PgBindValue)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    if fields.is_empty() {
        q.sql = format!("INSERT INTO {} DEFAULT VALUES RETURNING *", quoted(table));
        return q;
    }
    let mut cols = Vec::with_capacity(fields.len());
    let mut placeholders = Vec::with_capacity(fields.len());
    for (col, v) in fields {
        let n = q.push_param(v.clone());
        cols.push(quoted(col));
        placeholders.push(format!("${}", n));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
        quoted(table),
        cols.join(", "),
        placeholders.join(", ")
    );
    q
}

/// UPDATE by id: SET only the listed columns. With no columns this degrades to a SELECT.
pub fn update(table: &str, id: i64, fields: &[(&'static str, PgBindValue)], touch_updated_at: bool) -> QueryBuf {
    if fields.is_empty() {
        return select_by_id(table, id);
    }
    let mut q = QueryBuf::new();
    let mut sets = Vec::with_capacity(fields.len() + 1);
    for (col, v) in fields {
        let n = q.push_param(v.clone());
        sets.push(format!("{} = ${}", quoted(col), n));
    }
    if touch_updated_at {
        sets.push(format!("{} = NOW()", quoted("updated_at")));
    }
    let id_param = q.push_param(id.into());
    q.sql = format!(
        "UPDATE {} SET {} WHERE \"id\" = ${} RETURNING *",
        quoted(table),
        sets.join(", "),
        id_param
    );
    q
}

/// DELETE rows matching every predicate. Refuses to build an unqualified DELETE.
pub fn delete_where(table: &str, conditions: &[Condition]) -> Option<QueryBuf> {
    if conditions.is_empty() {
        return None;
    }
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, conditions);
    q.sql = format!("DELETE FROM {}{} RETURNING *", quoted(table), where_sql);
    Some(q)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_with_filters_search_and_page() {
        let q = select_list(
            "books",
            &[
                Condition::Eq("is_active", true.into()),
                Condition::InLinked {
                    column: "id",
                    table: "book_authors",
                    select_column: "book_id",
                    where_column: "author_id",
                    value: 7i64.into(),
                },
                Condition::Search(&["title", "isbn"], "50%".into()),
            ],
            &[OrderBy::asc("id")],
            Some(Page { offset: 20, limit: 10 }),
        );
        assert_eq!(
            q.sql,
            "SELECT * FROM \"books\" WHERE \"is_active\" = $1 AND \"id\" IN (SELECT \"book_id\" FROM \"book_authors\" WHERE \"author_id\" = $2) AND (\"title\" ILIKE $3 OR \"isbn\" ILIKE $3) ORDER BY \"id\" ASC LIMIT $4 OFFSET $5"
        );
        assert_eq!(q.params.len(), 5);
        assert_eq!(q.params[2], PgBindValue::from("%50\\%%"));
        assert_eq!(q.params[3], PgBindValue::I64(Some(10)));
        assert_eq!(q.params[4], PgBindValue::I64(Some(20)));
    }

    #[test]
    fn null_equality_becomes_is_null() {
        let q = select_list("categories", &[Condition::Eq("parent_id", Option::<i64>::None.into())], &[], None);
        assert_eq!(q.sql, "SELECT * FROM \"categories\" WHERE \"parent_id\" IS NULL");
        assert!(q.params.is_empty());
    }

    #[test]
    fn open_ended_window() {
        let q = exists(
            "coupons",
            &[
                Condition::Eq("code", "SPRING10".into()),
                Condition::GteOrNull("expires_at", 5i64.into()),
            ],
        );
        assert_eq!(
            q.sql,
            "SELECT EXISTS(SELECT 1 FROM \"coupons\" WHERE \"code\" = $1 AND (\"expires_at\" IS NULL OR \"expires_at\" >= $2))"
        );
    }

    #[test]
    fn update_sets_listed_columns_and_touches_timestamp() {
        let q = update("authors", 3, &[("name", "Borges".into()), ("website", Option::<String>::None.into())], true);
        assert_eq!(
            q.sql,
            "UPDATE \"authors\" SET \"name\" = $1, \"website\" = $2, \"updated_at\" = NOW() WHERE \"id\" = $3 RETURNING *"
        );
        assert_eq!(q.params[2], PgBindValue::I64(Some(3)));
    }

    #[test]
    fn empty_update_reads_the_row() {
        let q = update("authors", 3, &[], true);
        assert_eq!(q.sql, "SELECT * FROM \"authors\" WHERE \"id\" = $1");
    }

    #[test]
    fn insert_and_delete() {
        let q = insert("book_authors", &[("book_id", 1i64.into()), ("author_id", 2i64.into()), ("position", 1i32.into())]);
        assert_eq!(
            q.sql,
            "INSERT INTO \"book_authors\" (\"book_id\", \"author_id\", \"position\") VALUES ($1, $2, $3) RETURNING *"
        );
        assert!(delete_where("book_authors", &[]).is_none());
        let d = delete_where("book_authors", &[Condition::Eq("book_id", 1i64.into())]).unwrap();
        assert_eq!(d.sql, "DELETE FROM \"book_authors\" WHERE \"book_id\" = $1 RETURNING *");
    }

    #[test]
    fn quotes_embedded_quotes() {
        assert_eq!(quoted("we\"ird"), "\"we\"\"ird\"");
    }
}
