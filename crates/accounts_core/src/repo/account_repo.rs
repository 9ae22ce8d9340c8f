//! Account repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Expose one method per atomic persistence action.
//! - Map rows to domain records and store failures to [`RepoError`].
//!
//! # Invariants
//! - No method spans more than one write.
//! - Write paths validate records before SQL mutations.
//! - Deleting an absent id succeeds.
//! - Unknown username and wrong password are indistinguishable to callers.

use crate::db::{ensure_schema_ready, DbError};
use crate::error::ErrorKind;
use crate::model::account::{UserAccount, UserProfile};
use crate::model::org::{OrgAccount, OrgProfile};
use crate::model::{AccountId, ValidationError};
use crate::repo::profile_update::ProfileUpdate;
use log::debug;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from account repository operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Store stayed busy past the connection's busy timeout.
    Timeout(DbError),
    NotFound {
        entity: &'static str,
        id: AccountId,
    },
    /// Username unknown or password mismatch.
    InvalidCredentials,
    /// User has no association row for the org.
    NotAssociated {
        user_id: AccountId,
        org_id: AccountId,
    },
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Db(_) | Self::Timeout(_) | Self::InvalidData(_) => ErrorKind::Persistence,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidCredentials => ErrorKind::Auth,
            Self::NotAssociated { .. } => ErrorKind::Authorization,
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: AccountId) -> Self {
        Self::NotFound { entity, id }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Timeout(err) => write!(f, "account store timed out: {err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidCredentials => write!(f, "invalid credentials"),
            Self::NotAssociated { user_id, org_id } => {
                write!(f, "user {user_id} is not associated to organization {org_id}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted account data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) | Self::Timeout(err) => Some(err),
            Self::NotFound { .. }
            | Self::InvalidCredentials
            | Self::NotAssociated { .. }
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        if value.is_busy() {
            Self::Timeout(value)
        } else {
            Self::Db(value)
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        DbError::Sqlite(value).into()
    }
}

/// Persistence contract consumed by the account service.
pub trait AccountRepository {
    fn create_user_account(&self, account: &UserAccount) -> RepoResult<()>;
    fn delete_user_account(&self, id: AccountId) -> RepoResult<()>;
    fn create_user_profile(&self, profile: &UserProfile) -> RepoResult<()>;
    fn get_user_profile(&self, account_id: AccountId) -> RepoResult<UserProfile>;
    /// Applies a sparse update. An empty update is a no-op.
    fn update_user_profile(&self, account_id: AccountId, update: &ProfileUpdate)
        -> RepoResult<()>;
    fn get_user_account(&self, id: AccountId) -> RepoResult<UserAccount>;
    /// Looks up by username, then compares the stored password.
    fn get_account_by_credentials(&self, username: &str, password: &str)
        -> RepoResult<UserAccount>;

    fn create_org_account(&self, org: &OrgAccount) -> RepoResult<()>;
    fn create_org_profile(&self, profile: &OrgProfile) -> RepoResult<()>;
    fn get_org_account(&self, id: AccountId) -> RepoResult<OrgAccount>;
    fn get_org_profile(&self, account_id: AccountId) -> RepoResult<OrgProfile>;
    fn delete_org_account(&self, id: AccountId) -> RepoResult<()>;

    fn associate_user_to_org(&self, user_id: AccountId, org_id: AccountId) -> RepoResult<()>;
    /// Fails with [`RepoError::NotAssociated`] when no association row exists.
    fn confirm_user_to_org_association(
        &self,
        user_id: AccountId,
        org_id: AccountId,
    ) -> RepoResult<()>;
}

/// SQLite-backed account repository.
pub struct SqliteAccountRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAccountRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl AccountRepository for SqliteAccountRepository<'_> {
    fn create_user_account(&self, account: &UserAccount) -> RepoResult<()> {
        account.validate()?;

        self.conn.execute(
            "INSERT INTO user_accounts (id, username, password, org_type)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                account.id.to_string(),
                account.username.as_str(),
                account.password.as_str(),
                account.org_type.as_deref(),
            ],
        )?;
        Ok(())
    }

    fn delete_user_account(&self, id: AccountId) -> RepoResult<()> {
        let removed = self
            .conn
            .execute("DELETE FROM user_accounts WHERE id = ?1;", [id.to_string()])?;
        debug!("event=repo_delete module=repo entity=user_account id={id} removed={removed}");
        Ok(())
    }

    fn create_user_profile(&self, profile: &UserProfile) -> RepoResult<()> {
        profile.validate()?;

        self.conn.execute(
            "INSERT INTO user_profiles (account_id, first_name, last_name, email, phone, last_login)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL);",
            params![
                profile.account_id.to_string(),
                profile.first_name.as_str(),
                profile.last_name.as_str(),
                profile.email.as_deref(),
                profile.phone.as_deref(),
            ],
        )?;
        Ok(())
    }

    fn get_user_profile(&self, account_id: AccountId) -> RepoResult<UserProfile> {
        self.conn
            .query_row(
                "SELECT account_id, first_name, last_name, email, phone, last_login
                 FROM user_profiles
                 WHERE account_id = ?1;",
                [account_id.to_string()],
                |row| Ok(parse_user_profile_row(row)),
            )
            .optional()?
            .ok_or_else(|| RepoError::not_found("user profile", account_id))?
    }

    fn update_user_profile(
        &self,
        account_id: AccountId,
        update: &ProfileUpdate,
    ) -> RepoResult<()> {
        let Some(compiled) = update.compile(&account_id.to_string()) else {
            return Ok(());
        };

        let changed = self
            .conn
            .execute(&compiled.sql, params_from_iter(compiled.params))?;
        debug!(
            "event=repo_update module=repo entity=user_profile id={account_id} fields={} changed={changed}",
            update.fields().map(|field| field.column()).collect::<Vec<_>>().join(",")
        );
        Ok(())
    }

    fn get_user_account(&self, id: AccountId) -> RepoResult<UserAccount> {
        self.conn
            .query_row(
                "SELECT id, username, password, org_type, joined_on
                 FROM user_accounts
                 WHERE id = ?1;",
                [id.to_string()],
                |row| Ok(parse_user_account_row(row)),
            )
            .optional()?
            .ok_or_else(|| RepoError::not_found("user account", id))?
    }

    fn get_account_by_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> RepoResult<UserAccount> {
        let account = self
            .conn
            .query_row(
                "SELECT id, username, password, org_type, joined_on
                 FROM user_accounts
                 WHERE username = ?1;",
                [username],
                |row| Ok(parse_user_account_row(row)),
            )
            .optional()?
            .transpose()?;

        match account {
            Some(account) if account.password == password => Ok(account),
            Some(account) => {
                debug!("event=credential_check module=repo status=rejected reason=password_mismatch id={}", account.id);
                Err(RepoError::InvalidCredentials)
            }
            None => {
                debug!("event=credential_check module=repo status=rejected reason=unknown_username");
                Err(RepoError::InvalidCredentials)
            }
        }
    }

    fn create_org_account(&self, org: &OrgAccount) -> RepoResult<()> {
        org.validate()?;

        self.conn.execute(
            "INSERT INTO org_accounts (id, name, type) VALUES (?1, ?2, ?3);",
            params![org.id.to_string(), org.name.as_str(), org.org_type.as_deref()],
        )?;
        Ok(())
    }

    fn create_org_profile(&self, profile: &OrgProfile) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO org_profiles (account_id, phone, address, timezone, website)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                profile.account_id.to_string(),
                profile.phone.as_deref(),
                profile.address.as_deref(),
                profile.timezone.as_deref(),
                profile.website.as_deref(),
            ],
        )?;
        Ok(())
    }

    fn get_org_account(&self, id: AccountId) -> RepoResult<OrgAccount> {
        self.conn
            .query_row(
                "SELECT id, name, type, joined_on FROM org_accounts WHERE id = ?1;",
                [id.to_string()],
                |row| Ok(parse_org_account_row(row)),
            )
            .optional()?
            .ok_or_else(|| RepoError::not_found("organization account", id))?
    }

    fn get_org_profile(&self, account_id: AccountId) -> RepoResult<OrgProfile> {
        self.conn
            .query_row(
                "SELECT account_id, phone, address, timezone, website
                 FROM org_profiles
                 WHERE account_id = ?1;",
                [account_id.to_string()],
                |row| Ok(parse_org_profile_row(row)),
            )
            .optional()?
            .ok_or_else(|| RepoError::not_found("organization profile", account_id))?
    }

    fn delete_org_account(&self, id: AccountId) -> RepoResult<()> {
        let removed = self
            .conn
            .execute("DELETE FROM org_accounts WHERE id = ?1;", [id.to_string()])?;
        debug!("event=repo_delete module=repo entity=org_account id={id} removed={removed}");
        Ok(())
    }

    fn associate_user_to_org(&self, user_id: AccountId, org_id: AccountId) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO org_users (user_id, org_id) VALUES (?1, ?2);",
            params![user_id.to_string(), org_id.to_string()],
        )?;
        Ok(())
    }

    fn confirm_user_to_org_association(
        &self,
        user_id: AccountId,
        org_id: AccountId,
    ) -> RepoResult<()> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(id) FROM org_users WHERE user_id = ?1 AND org_id = ?2;",
            params![user_id.to_string(), org_id.to_string()],
            |row| row.get(0),
        )?;

        if count == 0 {
            return Err(RepoError::NotAssociated { user_id, org_id });
        }
        Ok(())
    }
}

// Row parsers return `RepoResult` inside the rusqlite closure so uuid
// decoding failures surface as `InvalidData` rather than SQLite errors.

fn parse_user_account_row(row: &Row<'_>) -> RepoResult<UserAccount> {
    Ok(UserAccount {
        id: parse_uuid(row, "id", "user_accounts.id")?,
        username: row.get("username")?,
        password: row.get("password")?,
        joined_on: row.get("joined_on")?,
        org_type: row.get("org_type")?,
    })
}

fn parse_user_profile_row(row: &Row<'_>) -> RepoResult<UserProfile> {
    Ok(UserProfile {
        account_id: parse_uuid(row, "account_id", "user_profiles.account_id")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        last_login: row.get("last_login")?,
    })
}

fn parse_org_account_row(row: &Row<'_>) -> RepoResult<OrgAccount> {
    Ok(OrgAccount {
        id: parse_uuid(row, "id", "org_accounts.id")?,
        name: row.get("name")?,
        org_type: row.get("type")?,
        joined_on: row.get("joined_on")?,
    })
}

fn parse_org_profile_row(row: &Row<'_>) -> RepoResult<OrgProfile> {
    Ok(OrgProfile {
        account_id: parse_uuid(row, "account_id", "org_profiles.account_id")?,
        phone: row.get("phone")?,
        address: row.get("address")?,
        timezone: row.get("timezone")?,
        website: row.get("website")?,
    })
}

fn parse_uuid(row: &Row<'_>, column: &str, label: &'static str) -> RepoResult<Uuid> {
    let text: String = row.get(column)?;
    Uuid::parse_str(&text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{text}` in {label}")))
}
