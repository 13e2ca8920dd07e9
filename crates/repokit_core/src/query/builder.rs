//! Query-builder type parameter of `Repository`.
//!
//! A repository binding fixes one `QueryBuilder` type; `Repository::query()`
//! hands out a fresh builder scoped to the bound entity's table and
//! `Repository::fetch` runs it through the session.

use crate::model::entity::EntityMeta;
use crate::query::filter::{Condition, Filter};
use crate::query::statement::{self, Order, SelectOptions, Statement};
use crate::repo::error::RepoResult;
use rusqlite::types::Value;

/// Builds SELECT statements for one entity table.
pub trait QueryBuilder {
    fn for_entity(meta: &'static EntityMeta) -> Self;

    /// Renders a statement returning rows shaped like the bound entity.
    fn to_statement(&self) -> RepoResult<Statement>;
}

/// Default builder: filter, ordering and paging over all mapped columns.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    meta: &'static EntityMeta,
    filter: Filter,
    options: SelectOptions,
}

impl SelectQuery {
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn and(mut self, condition: Condition) -> Self {
        self.filter = self.filter.and(condition);
        self
    }

    pub fn filter_by(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter = self.filter.filter_by(field, value);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: Order) -> Self {
        self.options.order_by.push((column.into(), order));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.options.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.options.offset = offset;
        self
    }
}

impl QueryBuilder for SelectQuery {
    fn for_entity(meta: &'static EntityMeta) -> Self {
        Self {
            meta,
            filter: Filter::all(),
            options: SelectOptions::default(),
        }
    }

    fn to_statement(&self) -> RepoResult<Statement> {
        statement::select(self.meta, &self.filter, &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::{QueryBuilder, SelectQuery};
    use crate::model::entity::{EntityMeta, FieldMeta};
    use crate::query::filter::Condition;
    use crate::query::statement::Order;

    static META: EntityMeta = EntityMeta {
        name: "Sample",
        table: "sample",
        fields: &[FieldMeta::generated_key("id"), FieldMeta::column("rank")],
    };

    #[test]
    fn builder_composes_filter_order_and_paging() {
        let stmt = SelectQuery::for_entity(&META)
            .and(Condition::gt("rank", 2_i64))
            .order_by("rank", Order::Asc)
            .limit(3)
            .offset(1)
            .to_statement()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT \"id\", \"rank\" FROM \"sample\" WHERE \"rank\" > ? ORDER BY \"rank\" ASC LIMIT ? OFFSET ?"
        );
    }

    #[test]
    fn ordering_by_unknown_column_fails() {
        let err = SelectQuery::for_entity(&META)
            .order_by("missing", Order::Desc)
            .to_statement()
            .unwrap_err();
        assert!(err.is_programming_error());
    }
}
