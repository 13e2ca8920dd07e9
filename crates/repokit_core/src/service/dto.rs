//! Request/response shapes for the application use-cases.
//!
//! # Invariants
//! - `ApplicationCreate::validate` runs before any repository call.
//! - `ApplicationRead` exists only for persisted rows (id and created_at set).

use crate::model::application::Application;
use crate::model::entity::{attrs, Attrs};
use crate::query::filter::Filter;
use crate::repo::error::{RepoError, RepoResult};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\+)[1-9][0-9\-().]{9,15}$").expect("valid phone regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Input validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    InvalidPhone(String),
    InvalidEmail(String),
    EmptyText,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPhone(value) => write!(f, "invalid phone number `{value}`"),
            Self::InvalidEmail(value) => write!(f, "invalid email address `{value}`"),
            Self::EmptyText => write!(f, "text cannot be empty"),
        }
    }
}

impl Error for ValidationError {}

/// Payload for creating an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationCreate {
    pub phone: String,
    pub email: String,
    pub text: String,
}

impl ApplicationCreate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !PHONE_RE.is_match(&self.phone) {
            return Err(ValidationError::InvalidPhone(self.phone.clone()));
        }
        if !EMAIL_RE.is_match(&self.email) {
            return Err(ValidationError::InvalidEmail(self.email.clone()));
        }
        if self.text.trim().is_empty() {
            return Err(ValidationError::EmptyText);
        }
        Ok(())
    }

    pub fn to_attrs(&self) -> Attrs {
        attrs([
            (Application::PHONE, Value::Text(self.phone.clone())),
            (Application::EMAIL, Value::Text(self.email.clone())),
            (Application::TEXT, Value::Text(self.text.clone())),
        ])
    }
}

/// Listing criteria. Empty strings do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationFilter {
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

impl ApplicationFilter {
    pub fn to_filter(&self) -> Filter {
        let mut filter = Filter::new();
        if !self.phone.is_empty() {
            filter = filter.filter_by(Application::PHONE, self.phone.clone());
        }
        if !self.email.is_empty() {
            filter = filter.filter_by(Application::EMAIL, self.email.clone());
        }
        filter
    }
}

/// Read model of a persisted application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRead {
    pub id: Uuid,
    pub phone: String,
    pub email: String,
    pub text: String,
    pub created_at: i64,
    pub updated_at: Option<i64>,
    pub deleted_at: Option<i64>,
}

impl TryFrom<&Application> for ApplicationRead {
    type Error = RepoError;

    fn try_from(value: &Application) -> RepoResult<Self> {
        let (Some(id), Some(created_at)) = (value.id, value.created_at) else {
            return Err(RepoError::NotPersistent {
                entity: "Application",
            });
        };
        Ok(Self {
            id,
            phone: value.phone.clone(),
            email: value.email.clone(),
            text: value.text.clone(),
            created_at,
            updated_at: value.updated_at,
            deleted_at: value.deleted_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ApplicationCreate, ApplicationFilter, ApplicationRead, ValidationError};
    use crate::model::application::Application;
    use rusqlite::types::Value;
    use uuid::Uuid;

    fn payload(phone: &str, email: &str, text: &str) -> ApplicationCreate {
        ApplicationCreate {
            phone: phone.to_string(),
            email: email.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn valid_payload_passes() {
        assert!(payload("+78005553535", "user@example.com", "Your service is excellent!")
            .validate()
            .is_ok());
        assert!(payload("+1(800)555-35-35", "a@b.io", "x").validate().is_ok());
    }

    #[test]
    fn phone_must_start_with_plus_and_have_enough_digits() {
        assert_eq!(
            payload("78005553535", "a@b.io", "x").validate(),
            Err(ValidationError::InvalidPhone("78005553535".to_string()))
        );
        assert!(payload("+1234", "a@b.io", "x").validate().is_err());
        assert!(payload("+0800555353", "a@b.io", "x").validate().is_err());
    }

    #[test]
    fn email_and_text_are_checked() {
        assert!(matches!(
            payload("+78005553535", "not-an-email", "x").validate(),
            Err(ValidationError::InvalidEmail(_))
        ));
        assert_eq!(
            payload("+78005553535", "a@b.io", "   ").validate(),
            Err(ValidationError::EmptyText)
        );
    }

    #[test]
    fn empty_filter_fields_do_not_constrain() {
        assert!(ApplicationFilter::default().to_filter().is_empty());

        let filter = ApplicationFilter {
            phone: "+78005553535".to_string(),
            email: String::new(),
        }
        .to_filter();
        assert_eq!(filter.equals().len(), 1);
        assert_eq!(
            filter.equals()["phone"],
            Value::Text("+78005553535".to_string())
        );
    }

    #[test]
    fn filter_deserializes_with_missing_fields() {
        let filter: ApplicationFilter = serde_json::from_str(r#"{"email":"a@b.io"}"#).unwrap();
        assert_eq!(filter.phone, "");
        assert_eq!(filter.email, "a@b.io");
    }

    #[test]
    fn read_model_requires_persisted_identity() {
        let mut application = Application::new("+78005553535", "a@b.io", "x");
        assert!(ApplicationRead::try_from(&application).is_err());

        application.id = Some(Uuid::new_v4());
        application.created_at = Some(1);
        let read = ApplicationRead::try_from(&application).unwrap();
        let json = serde_json::to_value(&read).unwrap();
        assert_eq!(json["created_at"], 1);
        assert!(json["updated_at"].is_null());
    }
}
