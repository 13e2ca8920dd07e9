//! `Application` example entity.
//!
//! # Responsibility
//! - Show a complete `Entity` mapping with store-generated id and timestamps.
//! - Own the DDL for the `application` table used by the service and CLI.
//!
//! # Invariants
//! - `id` and `created_at` are assigned by the store on insert.
//! - `updated_at` is stamped by the store on every update.
//! - `deleted_at` is the soft-delete stamp; `None` means live.
//! - Timestamps are Unix epoch milliseconds.

use crate::db::DbResult;
use crate::model::entity::{
    from_value, uuid_from_value, uuid_to_value, Entity, EntityMeta, FieldMeta,
};
use crate::query::statement::NOW_EPOCH_MS;
use crate::repo::error::RepoResult;
use rusqlite::types::Value;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Table DDL. The `id` default produces a random RFC 4122 version-4 UUID.
pub const APPLICATION_DDL: &str = "
CREATE TABLE IF NOT EXISTS application (
    id TEXT PRIMARY KEY NOT NULL DEFAULT (
        lower(hex(randomblob(4))) || '-' ||
        lower(hex(randomblob(2))) || '-4' ||
        substr(lower(hex(randomblob(2))), 2) || '-' ||
        substr('89ab', 1 + (abs(random()) % 4), 1) ||
        substr(lower(hex(randomblob(2))), 2) || '-' ||
        lower(hex(randomblob(6)))
    ),
    phone TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    text TEXT NOT NULL,
    created_at INTEGER NOT NULL DEFAULT (CAST(strftime('%s', 'now') AS INTEGER) * 1000),
    updated_at INTEGER,
    deleted_at INTEGER
);
CREATE INDEX IF NOT EXISTS idx_application_deleted_at ON application (deleted_at);
";

static APPLICATION_META: EntityMeta = EntityMeta {
    name: "Application",
    table: "application",
    fields: &[
        FieldMeta::generated_key(Application::ID),
        FieldMeta::column(Application::PHONE),
        FieldMeta::column(Application::EMAIL),
        FieldMeta::column(Application::TEXT),
        FieldMeta::generated(Application::CREATED_AT),
        FieldMeta::generated(Application::UPDATED_AT).with_on_update(NOW_EPOCH_MS),
        FieldMeta::column(Application::DELETED_AT),
    ],
};

/// Creates the `application` table when missing.
pub fn create_application_table(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(APPLICATION_DDL)?;
    Ok(())
}

/// Contact request submitted by a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: Option<Uuid>,
    pub phone: String,
    pub email: String,
    pub text: String,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
    pub deleted_at: Option<i64>,
}

impl Application {
    pub const ID: &'static str = "id";
    pub const PHONE: &'static str = "phone";
    pub const EMAIL: &'static str = "email";
    pub const TEXT: &'static str = "text";
    pub const CREATED_AT: &'static str = "created_at";
    pub const UPDATED_AT: &'static str = "updated_at";
    pub const DELETED_AT: &'static str = "deleted_at";

    /// Unsaved application; store-assigned fields stay `None`.
    pub fn new(
        phone: impl Into<String>,
        email: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            phone: phone.into(),
            email: email.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl Entity for Application {
    fn meta() -> &'static EntityMeta {
        &APPLICATION_META
    }

    fn get(&self, field: &str) -> Option<Value> {
        let value = match field {
            Self::ID => uuid_to_value(self.id),
            Self::PHONE => Value::Text(self.phone.clone()),
            Self::EMAIL => Value::Text(self.email.clone()),
            Self::TEXT => Value::Text(self.text.clone()),
            Self::CREATED_AT => self.created_at.into(),
            Self::UPDATED_AT => self.updated_at.into(),
            Self::DELETED_AT => self.deleted_at.into(),
            _ => return None,
        };
        Some(value)
    }

    fn set(&mut self, field: &str, value: Value) -> RepoResult<()> {
        let meta = Self::meta();
        match field {
            Self::ID => self.id = uuid_from_value(meta, field, &value)?,
            Self::PHONE => self.phone = from_value(meta, field, &value)?,
            Self::EMAIL => self.email = from_value(meta, field, &value)?,
            Self::TEXT => self.text = from_value(meta, field, &value)?,
            Self::CREATED_AT => self.created_at = from_value(meta, field, &value)?,
            Self::UPDATED_AT => self.updated_at = from_value(meta, field, &value)?,
            Self::DELETED_AT => self.deleted_at = from_value(meta, field, &value)?,
            _ => {
                meta.require_field(field)?;
            }
        }
        Ok(())
    }
}
