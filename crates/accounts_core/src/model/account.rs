//! User account and profile records.
//!
//! # Invariants
//! - `UserAccount::id` is immutable once assigned.
//! - `username` and `password` are non-empty at creation.
//! - `first_name` and `last_name` are non-empty at profile creation.
//! - `last_login` is written only by the login workflow.

use super::{AccountId, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity record for a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: AccountId,
    pub username: String,
    /// Stored and compared verbatim. Never serialized outward.
    #[serde(skip_serializing, default)]
    pub password: String,
    /// Epoch ms, assigned by the store on insert.
    pub joined_on: i64,
    pub org_type: Option<String>,
}

impl UserAccount {
    /// Creates an account record with a freshly generated id.
    ///
    /// `joined_on` stays `0` until the row is read back from the store.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        org_type: Option<String>,
    ) -> Self {
        Self::with_id(Uuid::new_v4(), username, password, org_type)
    }

    /// Creates an account record with a caller-provided id.
    pub fn with_id(
        id: AccountId,
        username: impl Into<String>,
        password: impl Into<String>,
        org_type: Option<String>,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            password: password.into(),
            joined_on: 0,
            org_type,
        }
    }

    /// Checks required identity fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.username.trim().is_empty() {
            return Err(ValidationError::EmptyUsername);
        }
        if self.password.is_empty() {
            return Err(ValidationError::EmptyPassword);
        }
        Ok(())
    }
}

/// Mutable descriptive extension of a [`UserAccount`], keyed 1:1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub account_id: AccountId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Epoch ms of the most recent successful login.
    pub last_login: Option<i64>,
}

impl UserProfile {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.first_name.trim().is_empty() {
            return Err(ValidationError::EmptyFirstName);
        }
        if self.last_name.trim().is_empty() {
            return Err(ValidationError::EmptyLastName);
        }
        Ok(())
    }
}

/// Account plus profile, returned from login and detail lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedUser {
    pub account: UserAccount,
    pub profile: UserProfile,
}

/// Primitive inputs of the create-user workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewUser {
    /// Organization the new user joins.
    pub org_id: AccountId,
    pub username: String,
    pub password: String,
    pub org_type: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl NewUser {
    /// Applies account and profile rules before anything is written.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.username.trim().is_empty() {
            return Err(ValidationError::EmptyUsername);
        }
        if self.password.is_empty() {
            return Err(ValidationError::EmptyPassword);
        }
        if self.first_name.trim().is_empty() {
            return Err(ValidationError::EmptyFirstName);
        }
        if self.last_name.trim().is_empty() {
            return Err(ValidationError::EmptyLastName);
        }
        Ok(())
    }

    /// Splits the request into the two records written by the workflow.
    pub(crate) fn into_records(self, id: AccountId) -> (UserAccount, UserProfile) {
        let account = UserAccount::with_id(id, self.username, self.password, self.org_type);
        let profile = UserProfile {
            account_id: id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            last_login: None,
        };
        (account, profile)
    }
}

#[cfg(test)]
mod tests {
    use super::{NewUser, UserAccount, UserProfile};
    use crate::model::ValidationError;
    use uuid::Uuid;

    #[test]
    fn account_requires_username_and_password() {
        let blank_name = UserAccount::new("  ", "secret", None);
        assert_eq!(blank_name.validate(), Err(ValidationError::EmptyUsername));

        let blank_password = UserAccount::new("ada", "", None);
        assert_eq!(blank_password.validate(), Err(ValidationError::EmptyPassword));

        assert!(UserAccount::new("ada", "secret", None).validate().is_ok());
    }

    #[test]
    fn profile_requires_both_names() {
        let mut profile = UserProfile {
            account_id: Uuid::new_v4(),
            first_name: "Ada".to_string(),
            last_name: String::new(),
            email: None,
            phone: None,
            last_login: None,
        };
        assert_eq!(profile.validate(), Err(ValidationError::EmptyLastName));

        profile.last_name = "Lovelace".to_string();
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn password_is_not_serialized() {
        let account = UserAccount::new("ada", "hunter2", Some("provider".to_string()));
        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(json.contains("\"username\":\"ada\""));
    }

    #[test]
    fn new_user_validates_every_required_field() {
        let valid = NewUser {
            username: "ada".to_string(),
            password: "secret".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            ..NewUser::default()
        };
        assert!(valid.validate().is_ok());

        let blank_last = NewUser {
            last_name: " ".to_string(),
            ..valid.clone()
        };
        assert_eq!(blank_last.validate(), Err(ValidationError::EmptyLastName));

        let blank_password = NewUser {
            password: String::new(),
            ..valid
        };
        assert_eq!(blank_password.validate(), Err(ValidationError::EmptyPassword));
    }

    #[test]
    fn new_user_splits_into_records_sharing_one_id() {
        let id = Uuid::new_v4();
        let request = NewUser {
            username: "ada".to_string(),
            password: "secret".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            ..NewUser::default()
        };

        let (account, profile) = request.into_records(id);
        assert_eq!(account.id, id);
        assert_eq!(profile.account_id, id);
        assert_eq!(profile.last_login, None);
    }
}
