//! Organization account and profile records.

use super::{AccountId, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity record for an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgAccount {
    pub id: AccountId,
    pub name: String,
    /// Serialized as `type` to match external schema naming.
    #[serde(rename = "type")]
    pub org_type: Option<String>,
    /// Epoch ms, assigned by the store on insert.
    pub joined_on: i64,
}

impl OrgAccount {
    pub fn new(name: impl Into<String>, org_type: Option<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name, org_type)
    }

    pub fn with_id(id: AccountId, name: impl Into<String>, org_type: Option<String>) -> Self {
        Self {
            id,
            name: name.into(),
            org_type,
            joined_on: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyOrgName);
        }
        Ok(())
    }
}

/// Descriptive extension of an [`OrgAccount`], keyed 1:1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgProfile {
    pub account_id: AccountId,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub timezone: Option<String>,
    pub website: Option<String>,
}

/// Org account plus profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedOrg {
    pub account: OrgAccount,
    pub profile: OrgProfile,
}

/// Primitive inputs of the create-org workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewOrg {
    pub name: String,
    #[serde(rename = "type")]
    pub org_type: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub timezone: Option<String>,
    pub website: Option<String>,
}

impl NewOrg {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyOrgName);
        }
        Ok(())
    }

    pub(crate) fn into_records(self, id: AccountId) -> (OrgAccount, OrgProfile) {
        let account = OrgAccount::with_id(id, self.name, self.org_type);
        let profile = OrgProfile {
            account_id: id,
            phone: self.phone,
            address: self.address,
            timezone: self.timezone,
            website: self.website,
        };
        (account, profile)
    }
}
