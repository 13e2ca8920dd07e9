//! Entity contract and static mapping metadata.
//!
//! # Responsibility
//! - Describe how a Rust struct maps onto one table (`EntityMeta`).
//! - Give the generic repository dynamic read/write access to mapped fields.
//!
//! # Invariants
//! - Every entity declares at least one primary-key field.
//! - Metadata is `'static` and never mutated after declaration.
//! - `get` returns `None` only for names that are not mapped fields.

use crate::repo::error::{RepoError, RepoResult};
use rusqlite::types::{FromSql, Value, ValueRef};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Field-name to value mapping used for construction, updates and session records.
pub type Attrs = BTreeMap<String, Value>;

/// Mapping metadata for one entity field / table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMeta {
    pub name: &'static str,
    pub primary_key: bool,
    /// Value is produced by a store default (generated id, server timestamp).
    pub store_assigned: bool,
    /// SQL expression the store applies on every UPDATE unless the caller
    /// sets the field explicitly.
    pub on_update: Option<&'static str>,
}

impl FieldMeta {
    /// Plain caller-supplied column.
    pub const fn column(name: &'static str) -> Self {
        Self {
            name,
            primary_key: false,
            store_assigned: false,
            on_update: None,
        }
    }

    /// Primary-key column whose value the store generates.
    pub const fn generated_key(name: &'static str) -> Self {
        Self {
            name,
            primary_key: true,
            store_assigned: true,
            on_update: None,
        }
    }

    /// Primary-key column the caller must supply.
    pub const fn assigned_key(name: &'static str) -> Self {
        Self {
            name,
            primary_key: true,
            store_assigned: false,
            on_update: None,
        }
    }

    /// Non-key column filled by a store default.
    pub const fn generated(name: &'static str) -> Self {
        Self {
            name,
            primary_key: false,
            store_assigned: true,
            on_update: None,
        }
    }

    pub const fn with_on_update(mut self, expression: &'static str) -> Self {
        self.on_update = Some(expression);
        self
    }
}

/// Static mapping metadata for one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityMeta {
    /// Rust-facing entity name used in diagnostics (`NotFound` etc.).
    pub name: &'static str,
    pub table: &'static str,
    pub fields: &'static [FieldMeta],
}

impl EntityMeta {
    pub fn field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Fails with `UnknownField` when `name` is not mapped.
    pub fn require_field(&self, name: &str) -> RepoResult<&FieldMeta> {
        self.field(name).ok_or_else(|| RepoError::UnknownField {
            entity: self.name,
            field: name.to_string(),
        })
    }

    /// Primary-key fields in declaration order.
    pub fn primary_key(&self) -> impl Iterator<Item = &FieldMeta> + '_ {
        self.fields.iter().filter(|field| field.primary_key)
    }

    /// Fails with `MissingPrimaryKey` for entities declared without a key.
    pub fn ensure_primary_key(&self) -> RepoResult<()> {
        if self.primary_key().next().is_none() {
            return Err(RepoError::MissingPrimaryKey { entity: self.name });
        }
        Ok(())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|field| field.name)
    }
}

/// A struct mapped to one table.
///
/// Implementations expose their fields by name so the generic repository can
/// build records, apply attribute maps and refresh instances from store rows
/// without knowing the concrete type.
pub trait Entity: Default + Sized {
    fn meta() -> &'static EntityMeta;

    /// Current value of `field`, or `None` when `field` is not mapped.
    fn get(&self, field: &str) -> Option<Value>;

    /// Assigns `value` to `field`.
    ///
    /// # Errors
    /// - `UnknownField` for unmapped names.
    /// - `InvalidData` when `value` does not convert to the field's type.
    fn set(&mut self, field: &str, value: Value) -> RepoResult<()>;

    /// Snapshot of every mapped field in declaration order.
    fn to_attrs(&self) -> Attrs {
        Self::meta()
            .fields
            .iter()
            .map(|field| {
                let value = self.get(field.name).unwrap_or(Value::Null);
                (field.name.to_string(), value)
            })
            .collect()
    }

    /// Assigns every entry of `attrs`.
    fn assign(&mut self, attrs: Attrs) -> RepoResult<()> {
        for (field, value) in attrs {
            self.set(&field, value)?;
        }
        Ok(())
    }

    /// Builds a fresh instance from a full or partial record.
    fn from_attrs(attrs: Attrs) -> RepoResult<Self> {
        let mut instance = Self::default();
        instance.assign(attrs)?;
        Ok(instance)
    }
}

/// Converts a stored value into a typed field value.
///
/// Used by `Entity::set` implementations.
pub fn from_value<T: FromSql>(meta: &EntityMeta, field: &str, value: &Value) -> RepoResult<T> {
    T::column_result(ValueRef::from(value)).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid value for `{}.{field}`: {err}",
            meta.name
        ))
    })
}

/// Converts an optional UUID into its stored TEXT form.
pub fn uuid_to_value(value: Option<Uuid>) -> Value {
    match value {
        Some(uuid) => Value::Text(uuid.to_string()),
        None => Value::Null,
    }
}

/// Parses a stored TEXT UUID; `NULL` maps to `None`.
pub fn uuid_from_value(meta: &EntityMeta, field: &str, value: &Value) -> RepoResult<Option<Uuid>> {
    let text: Option<String> = from_value(meta, field, value)?;
    text.map(|text| {
        Uuid::parse_str(&text).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid uuid value `{text}` in `{}.{field}`",
                meta.name
            ))
        })
    })
    .transpose()
}

/// Builds an `Attrs` map from `(field, value)` pairs.
///
/// ```
/// use repokit_core::model::entity::attrs;
/// use rusqlite::types::Value;
///
/// let values = attrs([("phone", Value::from("+10000000000".to_string()))]);
/// assert_eq!(values.len(), 1);
/// ```
pub fn attrs<I, K>(pairs: I) -> Attrs
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs
        .into_iter()
        .map(|(field, value)| (field.into(), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{attrs, from_value, uuid_from_value, uuid_to_value, EntityMeta, FieldMeta};
    use crate::repo::error::RepoError;
    use rusqlite::types::Value;
    use uuid::Uuid;

    const FIELDS: &[FieldMeta] = &[
        FieldMeta::generated_key("id"),
        FieldMeta::column("name"),
        FieldMeta::generated("updated_at").with_on_update("0"),
    ];
    const META: EntityMeta = EntityMeta {
        name: "Sample",
        table: "sample",
        fields: FIELDS,
    };
    const NO_KEY: EntityMeta = EntityMeta {
        name: "Keyless",
        table: "keyless",
        fields: &[FieldMeta::column("name")],
    };

    #[test]
    fn field_lookup_and_primary_key() {
        assert!(META.has_field("name"));
        assert!(!META.has_field("missing"));
        assert_eq!(
            META.primary_key().map(|f| f.name).collect::<Vec<_>>(),
            vec!["id"]
        );
        assert_eq!(META.field("updated_at").unwrap().on_update, Some("0"));
    }

    #[test]
    fn require_field_reports_entity_and_field() {
        let err = META.require_field("nope").unwrap_err();
        assert!(matches!(
            err,
            RepoError::UnknownField { entity: "Sample", ref field } if field == "nope"
        ));
    }

    #[test]
    fn keyless_entity_is_a_programming_error() {
        assert!(META.ensure_primary_key().is_ok());
        assert!(matches!(
            NO_KEY.ensure_primary_key(),
            Err(RepoError::MissingPrimaryKey { entity: "Keyless" })
        ));
    }

    #[test]
    fn typed_conversion_reports_mismatch() {
        let parsed: i64 = from_value(&META, "id", &Value::Integer(7)).unwrap();
        assert_eq!(parsed, 7);

        let err = from_value::<i64>(&META, "id", &Value::Text("x".into())).unwrap_err();
        assert!(matches!(err, RepoError::InvalidData(message) if message.contains("Sample.id")));
    }

    #[test]
    fn uuid_values_roundtrip_through_text() {
        let id = Uuid::new_v4();
        let stored = uuid_to_value(Some(id));
        assert_eq!(stored, Value::Text(id.to_string()));
        assert_eq!(uuid_from_value(&META, "id", &stored).unwrap(), Some(id));
        assert_eq!(uuid_from_value(&META, "id", &Value::Null).unwrap(), None);
        assert!(uuid_from_value(&META, "id", &Value::Text("bad".into())).is_err());
    }

    #[test]
    fn attrs_helper_collects_pairs() {
        let values = attrs([("b", Value::Integer(2)), ("a", Value::Integer(1))]);
        assert_eq!(values.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
