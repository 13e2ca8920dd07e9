//! Primary-key resolution.
//!
//! # Responsibility
//! - Decide whether an instance already carries a store-assigned identity.
//! - Extract that identity as a scalar or a field map.
//!
//! # Invariants
//! - Only primary-key fields marked `store_assigned` are consulted; a
//!   caller-assigned key never makes an instance count as persisted.
//! - Exactly one non-null qualifying field yields `Identity::Scalar`.

use crate::model::entity::{Attrs, Entity, EntityMeta};
use crate::repo::error::RepoResult;
use rusqlite::types::Value;

/// Persisted identity of one entity instance.
#[derive(Debug, Clone, PartialEq)]
pub enum Identity {
    Scalar(Value),
    Composite(Attrs),
}

impl Identity {
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::Composite(_) => None,
        }
    }
}

/// Resolves the store-assigned identity of `instance`.
///
/// Returns `Ok(None)` when no store-assigned key field holds a value.
pub fn resolve_identity<E: Entity>(instance: &E) -> RepoResult<Option<Identity>> {
    let meta = E::meta();
    meta.ensure_primary_key()?;

    let mut assigned: Attrs = meta
        .primary_key()
        .filter(|field| field.store_assigned)
        .filter_map(|field| {
            let value = instance.get(field.name)?;
            (value != Value::Null).then(|| (field.name.to_string(), value))
        })
        .collect();

    let identity = match assigned.len() {
        0 => None,
        1 => assigned.pop_first().map(|(_, value)| Identity::Scalar(value)),
        _ => Some(Identity::Composite(assigned)),
    };
    Ok(identity)
}

pub fn has_identity<E: Entity>(instance: &E) -> RepoResult<bool> {
    Ok(resolve_identity(instance)?.is_some())
}

/// Hashable projection of one stored value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Null,
    Integer(i64),
    Real(u64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<&Value> for KeyPart {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Integer(number) => Self::Integer(*number),
            Value::Real(number) => Self::Real(number.to_bits()),
            Value::Text(text) => Self::Text(text.clone()),
            Value::Blob(bytes) => Self::Blob(bytes.clone()),
        }
    }
}

/// Key over every primary-key column of a stored record, in declaration order.
pub fn identity_key(meta: &EntityMeta, record: &Attrs) -> Vec<KeyPart> {
    meta.primary_key()
        .map(|field| {
            record
                .get(field.name)
                .map_or(KeyPart::Null, KeyPart::from)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{has_identity, identity_key, resolve_identity, Identity, KeyPart};
    use crate::model::entity::{attrs, Entity, EntityMeta, FieldMeta};
    use crate::repo::error::{RepoError, RepoResult};
    use rusqlite::types::Value;

    #[derive(Debug, Default)]
    struct Pair {
        left: Option<i64>,
        right: Option<i64>,
        code: Option<String>,
    }

    static PAIR_META: EntityMeta = EntityMeta {
        name: "Pair",
        table: "pair",
        fields: &[
            FieldMeta::generated_key("left"),
            FieldMeta::generated_key("right"),
            FieldMeta::assigned_key("code"),
        ],
    };

    impl Entity for Pair {
        fn meta() -> &'static EntityMeta {
            &PAIR_META
        }

        fn get(&self, field: &str) -> Option<Value> {
            match field {
                "left" => Some(self.left.into()),
                "right" => Some(self.right.into()),
                "code" => Some(self.code.clone().into()),
                _ => None,
            }
        }

        fn set(&mut self, field: &str, value: Value) -> RepoResult<()> {
            let meta = Self::meta();
            match field {
                "left" => self.left = crate::model::entity::from_value(meta, field, &value)?,
                "right" => self.right = crate::model::entity::from_value(meta, field, &value)?,
                "code" => self.code = crate::model::entity::from_value(meta, field, &value)?,
                _ => meta.require_field(field).map(|_| ())?,
            }
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct Keyless;

    static KEYLESS_META: EntityMeta = EntityMeta {
        name: "Keyless",
        table: "keyless",
        fields: &[FieldMeta::column("note")],
    };

    impl Entity for Keyless {
        fn meta() -> &'static EntityMeta {
            &KEYLESS_META
        }

        fn get(&self, _field: &str) -> Option<Value> {
            None
        }

        fn set(&mut self, field: &str, _value: Value) -> RepoResult<()> {
            Self::meta().require_field(field).map(|_| ())
        }
    }

    #[test]
    fn unset_store_keys_have_no_identity() {
        let pair = Pair::default();
        assert_eq!(resolve_identity(&pair).unwrap(), None);
        assert!(!has_identity(&pair).unwrap());
    }

    #[test]
    fn caller_assigned_key_is_ignored() {
        let pair = Pair {
            code: Some("abc".to_string()),
            ..Pair::default()
        };
        assert!(!has_identity(&pair).unwrap());
    }

    #[test]
    fn single_value_is_returned_unwrapped() {
        let pair = Pair {
            right: Some(9),
            ..Pair::default()
        };
        assert_eq!(
            resolve_identity(&pair).unwrap(),
            Some(Identity::Scalar(Value::Integer(9)))
        );
    }

    #[test]
    fn multiple_values_are_returned_as_map() {
        let pair = Pair {
            left: Some(1),
            right: Some(2),
            code: Some("ignored".to_string()),
        };
        let expected = attrs([("left", Value::Integer(1)), ("right", Value::Integer(2))]);
        assert_eq!(
            resolve_identity(&pair).unwrap(),
            Some(Identity::Composite(expected))
        );
    }

    #[test]
    fn keyless_entity_fails_fast() {
        let err = resolve_identity(&Keyless).unwrap_err();
        assert!(matches!(err, RepoError::MissingPrimaryKey { entity: "Keyless" }));
    }

    #[test]
    fn identity_key_covers_all_key_columns() {
        let record = attrs([
            ("left", Value::Integer(1)),
            ("code", Value::Text("x".to_string())),
        ]);
        assert_eq!(
            identity_key(&PAIR_META, &record),
            vec![
                KeyPart::Integer(1),
                KeyPart::Null,
                KeyPart::Text("x".to_string())
            ]
        );
    }
}
