//! Composite filters: positional conditions AND keyword equality.
//!
//! # Responsibility
//! - Combine explicit boolean conditions with `field = value` constraints
//!   into one WHERE clause shared by read, update, delete and count.
//!
//! # Invariants
//! - Explicit conditions render in insertion order.
//! - Equality constraints render after conditions, in field-name order.
//! - An empty filter renders no WHERE clause and matches every row.
//! - Column names are checked against entity metadata before rendering.

use crate::model::entity::EntityMeta;
use crate::query::statement::quote_ident;
use crate::repo::error::RepoResult;
use rusqlite::types::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

impl CompareOp {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Like => "LIKE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ConditionKind {
    /// Caller-written SQL fragment with `?` placeholders.
    Raw(String),
    Compare { column: String, op: CompareOp },
    Null { column: String, negated: bool },
    In { column: String },
}

/// One boolean condition over an entity's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    kind: ConditionKind,
    params: Vec<Value>,
}

impl Condition {
    /// Raw SQL fragment. Placeholders must be positional `?`, bound from `params` in order.
    ///
    /// Raw fragments are not validated against entity metadata.
    pub fn raw(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            kind: ConditionKind::Raw(sql.into()),
            params,
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Eq, value)
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Ne, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Lt, value)
    }

    pub fn le(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Le, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Gt, value)
    }

    pub fn ge(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Ge, value)
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::compare(column, CompareOp::Like, Value::Text(pattern.into()))
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self {
            kind: ConditionKind::Null {
                column: column.into(),
                negated: false,
            },
            params: Vec::new(),
        }
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self {
            kind: ConditionKind::Null {
                column: column.into(),
                negated: true,
            },
            params: Vec::new(),
        }
    }

    /// `column IN (...)`. An empty list matches nothing.
    pub fn in_list<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            kind: ConditionKind::In {
                column: column.into(),
            },
            params: values.into_iter().map(Into::into).collect(),
        }
    }

    fn compare(column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self {
            kind: ConditionKind::Compare {
                column: column.into(),
                op,
            },
            params: vec![value.into()],
        }
    }

    /// Column this condition is bound to; `None` for raw fragments.
    pub fn column(&self) -> Option<&str> {
        match &self.kind {
            ConditionKind::Raw(_) => None,
            ConditionKind::Compare { column, .. }
            | ConditionKind::Null { column, .. }
            | ConditionKind::In { column } => Some(column),
        }
    }

    fn render(&self, meta: &EntityMeta, sql: &mut String, params: &mut Vec<Value>) -> RepoResult<()> {
        if let Some(column) = self.column() {
            meta.require_field(column)?;
        }

        match &self.kind {
            ConditionKind::Raw(fragment) => {
                sql.push('(');
                sql.push_str(fragment);
                sql.push(')');
            }
            ConditionKind::Compare { column, op } => {
                sql.push_str(&format!("{} {} ?", quote_ident(column), op.as_sql()));
            }
            ConditionKind::Null { column, negated } => {
                let suffix = if *negated { "IS NOT NULL" } else { "IS NULL" };
                sql.push_str(&format!("{} {suffix}", quote_ident(column)));
            }
            ConditionKind::In { column } => {
                if self.params.is_empty() {
                    sql.push_str("0 = 1");
                } else {
                    let placeholders = vec!["?"; self.params.len()].join(", ");
                    sql.push_str(&format!("{} IN ({placeholders})", quote_ident(column)));
                }
            }
        }

        params.extend(self.params.iter().cloned());
        Ok(())
    }
}

/// Rendered WHERE clause body (without the `WHERE` keyword).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    pub sql: String,
    pub params: Vec<Value>,
}

impl WhereClause {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Appends ` WHERE ...` to `sql` when the clause is non-empty.
    pub fn append_to(&self, sql: &mut String) {
        if !self.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.sql);
        }
    }
}

/// Conjunction of ordered conditions and keyword equality constraints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
    equals: BTreeMap<String, Value>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter matching every row.
    pub fn all() -> Self {
        Self::default()
    }

    /// Shorthand for `Filter::new().filter_by(field, value)`.
    pub fn by(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().filter_by(field, value)
    }

    /// Appends an explicit condition.
    pub fn and(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Adds a `field = value` constraint, replacing an earlier one on the same field.
    pub fn filter_by(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equals.insert(field.into(), value.into());
        self
    }

    /// Inserts `condition` ahead of every existing condition.
    pub fn prepend(mut self, condition: Condition) -> Self {
        self.conditions.insert(0, condition);
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn equals(&self) -> &BTreeMap<String, Value> {
        &self.equals
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.equals.is_empty()
    }

    /// Renders the conjunction for `meta`'s table.
    pub fn where_clause(&self, meta: &EntityMeta) -> RepoResult<WhereClause> {
        let mut parts = Vec::with_capacity(self.conditions.len() + self.equals.len());
        let mut params = Vec::new();

        for condition in &self.conditions {
            let mut sql = String::new();
            condition.render(meta, &mut sql, &mut params)?;
            parts.push(sql);
        }

        for (field, value) in &self.equals {
            meta.require_field(field)?;
            // `= NULL` never matches; keyword NULL means IS NULL.
            if *value == Value::Null {
                parts.push(format!("{} IS NULL", quote_ident(field)));
            } else {
                parts.push(format!("{} = ?", quote_ident(field)));
                params.push(value.clone());
            }
        }

        Ok(WhereClause {
            sql: parts.join(" AND "),
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Condition, Filter};
    use crate::model::entity::{EntityMeta, FieldMeta};
    use crate::repo::error::RepoError;
    use rusqlite::types::Value;

    const META: EntityMeta = EntityMeta {
        name: "Sample",
        table: "sample",
        fields: &[
            FieldMeta::generated_key("id"),
            FieldMeta::column("name"),
            FieldMeta::column("score"),
            FieldMeta::column("deleted_at"),
        ],
    };

    #[test]
    fn empty_filter_renders_no_clause() {
        let clause = Filter::all().where_clause(&META).unwrap();
        assert!(clause.is_empty());
        assert!(clause.params.is_empty());

        let mut sql = "SELECT 1".to_string();
        clause.append_to(&mut sql);
        assert_eq!(sql, "SELECT 1");
    }

    #[test]
    fn conditions_keep_order_and_equalities_follow_sorted() {
        let filter = Filter::new()
            .filter_by("score", 3_i64)
            .and(Condition::gt("score", 1_i64))
            .filter_by("name", "bob".to_string())
            .and(Condition::is_null("deleted_at"));

        let clause = filter.where_clause(&META).unwrap();
        assert_eq!(
            clause.sql,
            "\"score\" > ? AND \"deleted_at\" IS NULL AND \"name\" = ? AND \"score\" = ?"
        );
        assert_eq!(
            clause.params,
            vec![
                Value::Integer(1),
                Value::Text("bob".to_string()),
                Value::Integer(3)
            ]
        );
    }

    #[test]
    fn prepend_puts_condition_first() {
        let filter = Filter::new()
            .and(Condition::eq("name", "a".to_string()))
            .prepend(Condition::is_null("deleted_at"));
        let clause = filter.where_clause(&META).unwrap();
        assert!(clause.sql.starts_with("\"deleted_at\" IS NULL AND"));
    }

    #[test]
    fn raw_condition_is_wrapped_and_binds_params() {
        let filter = Filter::new().and(Condition::raw(
            "score BETWEEN ? AND ?",
            vec![Value::Integer(1), Value::Integer(5)],
        ));
        let clause = filter.where_clause(&META).unwrap();
        assert_eq!(clause.sql, "(score BETWEEN ? AND ?)");
        assert_eq!(clause.params.len(), 2);
    }

    #[test]
    fn in_list_renders_placeholders_and_empty_matches_nothing() {
        let clause = Filter::new()
            .and(Condition::in_list("score", [1_i64, 2, 3]))
            .where_clause(&META)
            .unwrap();
        assert_eq!(clause.sql, "\"score\" IN (?, ?, ?)");

        let empty: [i64; 0] = [];
        let clause = Filter::new()
            .and(Condition::in_list("score", empty))
            .where_clause(&META)
            .unwrap();
        assert_eq!(clause.sql, "0 = 1");
    }

    #[test]
    fn keyword_null_renders_is_null() {
        let clause = Filter::by("deleted_at", Value::Null)
            .where_clause(&META)
            .unwrap();
        assert_eq!(clause.sql, "\"deleted_at\" IS NULL");
        assert!(clause.params.is_empty());
    }

    #[test]
    fn later_keyword_value_replaces_earlier() {
        let filter = Filter::by("name", "a".to_string()).filter_by("name", "b".to_string());
        assert_eq!(filter.equals().len(), 1);
        assert_eq!(filter.equals()["name"], Value::Text("b".to_string()));
    }

    #[test]
    fn unknown_columns_are_rejected() {
        let err = Filter::by("nickname", "x".to_string())
            .where_clause(&META)
            .unwrap_err();
        assert!(matches!(err, RepoError::UnknownField { ref field, .. } if field == "nickname"));

        let err = Filter::new()
            .and(Condition::is_null("nickname"))
            .where_clause(&META)
            .unwrap_err();
        assert!(err.is_programming_error());
    }
}
