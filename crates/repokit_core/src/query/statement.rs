//! SQL statement rendering for the repository's fixed statement shapes.
//!
//! Only the shapes the repository and session need are rendered here:
//! SELECT, COUNT, UPDATE, DELETE by filter, and INSERT/UPDATE/SELECT/DELETE
//! by primary key. Every statement addresses columns through entity metadata
//! and binds values as positional `?` parameters.

use crate::model::entity::{Attrs, EntityMeta};
use crate::query::filter::Filter;
use crate::repo::error::{RepoError, RepoResult};
use rusqlite::types::Value;

/// Store clock in epoch milliseconds (second resolution).
pub const NOW_EPOCH_MS: &str = "(CAST(strftime('%s', 'now') AS INTEGER) * 1000)";

/// SQL text plus positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Right-hand side of one `SET column = ...` entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    Value(Value),
    /// Store-side SQL expression, e.g. a clock stamp.
    Expr(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Ordering and paging applied after filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectOptions {
    pub order_by: Vec<(String, Order)>,
    pub limit: Option<u64>,
    pub offset: u64,
}

impl SelectOptions {
    pub fn limit(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn column_list(meta: &EntityMeta) -> String {
    meta.column_names()
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(", ")
}

/// `SELECT <all mapped columns> FROM <table> [WHERE ...] [ORDER BY ...] [LIMIT ...]`.
pub fn select(meta: &EntityMeta, filter: &Filter, options: &SelectOptions) -> RepoResult<Statement> {
    let clause = filter.where_clause(meta)?;
    let mut sql = format!("SELECT {} FROM {}", column_list(meta), quote_ident(meta.table));
    clause.append_to(&mut sql);
    let mut params = clause.params;

    if !options.order_by.is_empty() {
        let mut terms = Vec::with_capacity(options.order_by.len());
        for (column, order) in &options.order_by {
            meta.require_field(column)?;
            terms.push(format!("{} {}", quote_ident(column), order.as_sql()));
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(&terms.join(", "));
    }

    match options.limit {
        Some(limit) => {
            sql.push_str(" LIMIT ?");
            params.push(Value::Integer(to_sql_int(limit)));
            if options.offset > 0 {
                sql.push_str(" OFFSET ?");
                params.push(Value::Integer(to_sql_int(options.offset)));
            }
        }
        None if options.offset > 0 => {
            sql.push_str(" LIMIT -1 OFFSET ?");
            params.push(Value::Integer(to_sql_int(options.offset)));
        }
        None => {}
    }

    Ok(Statement::new(sql, params))
}

/// `SELECT count(*) FROM <table> [WHERE ...]`.
pub fn count(meta: &EntityMeta, filter: &Filter) -> RepoResult<Statement> {
    let clause = filter.where_clause(meta)?;
    let mut sql = format!("SELECT count(*) FROM {}", quote_ident(meta.table));
    clause.append_to(&mut sql);
    Ok(Statement::new(sql, clause.params))
}

/// `UPDATE <table> SET ... [WHERE ...]`.
///
/// Fields with an `on_update` expression that are not assigned explicitly
/// receive that expression.
pub fn update(
    meta: &EntityMeta,
    filter: &Filter,
    changes: &[(String, Assignment)],
) -> RepoResult<Statement> {
    if changes.is_empty() {
        return Err(RepoError::EmptyValues {
            entity: meta.name,
            operation: "update",
        });
    }

    let mut params = Vec::new();
    let set = render_set(meta, changes, &mut params)?;
    let clause = filter.where_clause(meta)?;

    let mut sql = format!("UPDATE {} SET {set}", quote_ident(meta.table));
    clause.append_to(&mut sql);
    params.extend(clause.params);
    Ok(Statement::new(sql, params))
}

/// `DELETE FROM <table> [WHERE ...]`.
pub fn delete(meta: &EntityMeta, filter: &Filter) -> RepoResult<Statement> {
    let clause = filter.where_clause(meta)?;
    let mut sql = format!("DELETE FROM {}", quote_ident(meta.table));
    clause.append_to(&mut sql);
    Ok(Statement::new(sql, clause.params))
}

/// `INSERT ... RETURNING <all mapped columns>`.
///
/// Store-assigned fields holding NULL are omitted so the column default applies.
pub fn insert(meta: &EntityMeta, record: &Attrs) -> RepoResult<Statement> {
    let mut columns = Vec::new();
    let mut params = Vec::new();

    for (name, value) in record {
        let field = meta.require_field(name)?;
        if field.store_assigned && *value == Value::Null {
            continue;
        }
        columns.push(quote_ident(name));
        params.push(value.clone());
    }

    let sql = if columns.is_empty() {
        format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}",
            quote_ident(meta.table),
            column_list(meta)
        )
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            quote_ident(meta.table),
            columns.join(", "),
            vec!["?"; params.len()].join(", "),
            column_list(meta)
        )
    };
    Ok(Statement::new(sql, params))
}

/// Equality filter over every primary-key field of `record`.
///
/// # Errors
/// - `MissingPrimaryKey` when the entity declares no key.
/// - `NotPersistent` when a key field is absent or NULL.
pub fn key_filter(meta: &EntityMeta, record: &Attrs) -> RepoResult<Filter> {
    meta.ensure_primary_key()?;
    let mut filter = Filter::new();
    for field in meta.primary_key() {
        match record.get(field.name) {
            Some(value) if *value != Value::Null => {
                filter = filter.filter_by(field.name, value.clone());
            }
            _ => return Err(RepoError::NotPersistent { entity: meta.name }),
        }
    }
    Ok(filter)
}

/// `UPDATE ... WHERE <key> RETURNING <all mapped columns>`.
pub fn update_by_key(
    meta: &EntityMeta,
    key: &Filter,
    changes: &[(String, Assignment)],
) -> RepoResult<Statement> {
    let mut statement = update(meta, key, changes)?;
    statement.sql.push_str(" RETURNING ");
    statement.sql.push_str(&column_list(meta));
    Ok(statement)
}

fn render_set(
    meta: &EntityMeta,
    changes: &[(String, Assignment)],
    params: &mut Vec<Value>,
) -> RepoResult<String> {
    let mut terms = Vec::with_capacity(changes.len());

    for (column, assignment) in changes {
        meta.require_field(column)?;
        match assignment {
            Assignment::Value(value) => {
                terms.push(format!("{} = ?", quote_ident(column)));
                params.push(value.clone());
            }
            Assignment::Expr(expression) => {
                terms.push(format!("{} = {expression}", quote_ident(column)));
            }
        }
    }

    for field in meta.fields {
        let Some(expression) = field.on_update else {
            continue;
        };
        if changes.iter().any(|(column, _)| column == field.name) {
            continue;
        }
        terms.push(format!("{} = {expression}", quote_ident(field.name)));
    }

    Ok(terms.join(", "))
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::{
        count, delete, insert, key_filter, select, update, Assignment, Order, SelectOptions,
    };
    use crate::model::entity::{attrs, EntityMeta, FieldMeta};
    use crate::query::filter::Filter;
    use crate::repo::error::RepoError;
    use rusqlite::types::Value;

    const META: EntityMeta = EntityMeta {
        name: "Sample",
        table: "sample",
        fields: &[
            FieldMeta::generated_key("id"),
            FieldMeta::column("name"),
            FieldMeta::generated("updated_at").with_on_update("42"),
        ],
    };

    #[test]
    fn select_lists_columns_and_paging() {
        let options = SelectOptions {
            order_by: vec![("name".to_string(), Order::Desc)],
            limit: Some(10),
            offset: 5,
        };
        let stmt = select(&META, &Filter::by("name", "x".to_string()), &options).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT \"id\", \"name\", \"updated_at\" FROM \"sample\" WHERE \"name\" = ? ORDER BY \"name\" DESC LIMIT ? OFFSET ?"
        );
        assert_eq!(stmt.params.len(), 3);
    }

    #[test]
    fn offset_without_limit_uses_unbounded_limit() {
        let options = SelectOptions {
            offset: 2,
            ..SelectOptions::default()
        };
        let stmt = select(&META, &Filter::all(), &options).unwrap();
        assert!(stmt.sql.ends_with("LIMIT -1 OFFSET ?"));
    }

    #[test]
    fn count_and_delete_share_filter_rendering() {
        let filter = Filter::by("name", "x".to_string());
        assert_eq!(
            count(&META, &filter).unwrap().sql,
            "SELECT count(*) FROM \"sample\" WHERE \"name\" = ?"
        );
        assert_eq!(
            delete(&META, &Filter::all()).unwrap().sql,
            "DELETE FROM \"sample\""
        );
    }

    #[test]
    fn update_applies_on_update_expressions_unless_assigned() {
        let stmt = update(
            &META,
            &Filter::all(),
            &[("name".to_string(), Assignment::Value(Value::from("y".to_string())))],
        )
        .unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE \"sample\" SET \"name\" = ?, \"updated_at\" = 42"
        );

        let stmt = update(
            &META,
            &Filter::all(),
            &[("updated_at".to_string(), Assignment::Value(Value::Integer(1)))],
        )
        .unwrap();
        assert_eq!(stmt.sql, "UPDATE \"sample\" SET \"updated_at\" = ?");
    }

    #[test]
    fn update_without_values_is_rejected() {
        let err = update(&META, &Filter::all(), &[]).unwrap_err();
        assert!(matches!(err, RepoError::EmptyValues { operation: "update", .. }));
    }

    #[test]
    fn insert_skips_null_store_assigned_columns() {
        let record = attrs([
            ("id", Value::Null),
            ("name", Value::from("n".to_string())),
            ("updated_at", Value::Null),
        ]);
        let stmt = insert(&META, &record).unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"sample\" (\"name\") VALUES (?) RETURNING \"id\", \"name\", \"updated_at\""
        );

        let stmt = insert(&META, &attrs([("id", Value::Null)])).unwrap();
        assert!(stmt.sql.contains("DEFAULT VALUES"));
    }

    #[test]
    fn key_filter_requires_every_key_value() {
        let filter = key_filter(&META, &attrs([("id", Value::Integer(3))])).unwrap();
        assert_eq!(filter.equals()["id"], Value::Integer(3));

        let err = key_filter(&META, &attrs([("id", Value::Null)])).unwrap_err();
        assert!(matches!(err, RepoError::NotPersistent { entity: "Sample" }));
    }
}
