//! In-memory account repository for tests and local wiring.
//!
//! Mirrors the SQLite schema rules that workflows depend on: unique
//! usernames, profile/association references, and cascading deletes.
//! Failures can be injected per operation so compensation paths can be
//! driven deterministically.

use crate::db::DbError;
use crate::model::account::{UserAccount, UserProfile};
use crate::model::org::{OrgAccount, OrgProfile};
use crate::model::AccountId;
use crate::repo::account_repo::{AccountRepository, RepoError, RepoResult};
use crate::repo::profile_update::{ProfileField, ProfileUpdate, UpdateValue};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// Repository operations, used for failure injection and call logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoOperation {
    CreateUserAccount,
    DeleteUserAccount,
    CreateUserProfile,
    GetUserProfile,
    UpdateUserProfile,
    GetUserAccount,
    GetAccountByCredentials,
    CreateOrgAccount,
    CreateOrgProfile,
    GetOrgAccount,
    GetOrgProfile,
    DeleteOrgAccount,
    AssociateUserToOrg,
    ConfirmUserToOrgAssociation,
}

#[derive(Debug, Default)]
struct MemoryState {
    user_accounts: HashMap<AccountId, UserAccount>,
    user_profiles: HashMap<AccountId, UserProfile>,
    org_accounts: HashMap<AccountId, OrgAccount>,
    org_profiles: HashMap<AccountId, OrgProfile>,
    org_users: Vec<(AccountId, AccountId)>,
    pending_failures: Vec<(RepoOperation, RepoError)>,
    calls: Vec<RepoOperation>,
}

/// In-memory [`AccountRepository`].
#[derive(Debug, Default)]
pub struct MemoryAccountRepository {
    state: Mutex<MemoryState>,
}

impl MemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next call of `operation` fail with a persistence error.
    pub fn fail_next(&self, operation: RepoOperation) {
        let error = RepoError::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_IOERR),
            Some(format!("injected failure for {operation:?}")),
        )));
        self.fail_next_with(operation, error);
    }

    /// Makes the next call of `operation` fail with `error`.
    pub fn fail_next_with(&self, operation: RepoOperation, error: RepoError) {
        self.lock().pending_failures.push((operation, error));
    }

    /// Operations invoked so far, in call order.
    pub fn calls(&self) -> Vec<RepoOperation> {
        self.lock().calls.clone()
    }

    /// Number of times `operation` was invoked.
    pub fn call_count(&self, operation: RepoOperation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| **call == operation)
            .count()
    }

    pub fn association_count(&self, user_id: AccountId, org_id: AccountId) -> usize {
        self.lock()
            .org_users
            .iter()
            .filter(|(user, org)| *user == user_id && *org == org_id)
            .count()
    }

    pub fn user_profile_count(&self) -> usize {
        self.lock().user_profiles.len()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the call and returns the state, or the injected failure.
    fn begin(&self, operation: RepoOperation) -> RepoResult<MutexGuard<'_, MemoryState>> {
        let mut state = self.lock();
        state.calls.push(operation);
        if let Some(index) = state
            .pending_failures
            .iter()
            .position(|(pending, _)| *pending == operation)
        {
            let (_, error) = state.pending_failures.remove(index);
            return Err(error);
        }
        Ok(state)
    }
}

fn constraint_violation(message: &str) -> RepoError {
    RepoError::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
        Some(message.to_string()),
    )))
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
        })
}

fn apply_value(field: ProfileField, value: &UpdateValue, profile: &mut UserProfile) {
    // Text columns store numbers in their text form, as SQLite's TEXT affinity does.
    let text = match value {
        UpdateValue::Default => None,
        UpdateValue::Text(text) => Some(text.clone()),
        UpdateValue::Integer(integer) => Some(integer.to_string()),
        UpdateValue::Real(real) => Some(real.to_string()),
    };
    match field {
        ProfileField::FirstName => profile.first_name = text.unwrap_or_default(),
        ProfileField::LastName => profile.last_name = text.unwrap_or_default(),
        ProfileField::Email => profile.email = text,
        ProfileField::Phone => profile.phone = text,
        ProfileField::LastLogin => {
            profile.last_login = match value {
                UpdateValue::Default => Some(now_epoch_ms()),
                UpdateValue::Integer(integer) => Some(*integer),
                UpdateValue::Text(_) | UpdateValue::Real(_) => profile.last_login,
            }
        }
    }
}

impl AccountRepository for MemoryAccountRepository {
    fn create_user_account(&self, account: &UserAccount) -> RepoResult<()> {
        let mut state = self.begin(RepoOperation::CreateUserAccount)?;
        account.validate()?;
        if state.user_accounts.contains_key(&account.id)
            || state
                .user_accounts
                .values()
                .any(|existing| existing.username == account.username)
        {
            return Err(constraint_violation("UNIQUE constraint failed: user_accounts"));
        }

        let mut stored = account.clone();
        stored.joined_on = now_epoch_ms();
        state.user_accounts.insert(stored.id, stored);
        Ok(())
    }

    fn delete_user_account(&self, id: AccountId) -> RepoResult<()> {
        let mut state = self.begin(RepoOperation::DeleteUserAccount)?;
        state.user_accounts.remove(&id);
        state.user_profiles.remove(&id);
        state.org_users.retain(|(user, _)| *user != id);
        Ok(())
    }

    fn create_user_profile(&self, profile: &UserProfile) -> RepoResult<()> {
        let mut state = self.begin(RepoOperation::CreateUserProfile)?;
        profile.validate()?;
        if !state.user_accounts.contains_key(&profile.account_id) {
            return Err(constraint_violation("FOREIGN KEY constraint failed"));
        }
        if state.user_profiles.contains_key(&profile.account_id) {
            return Err(constraint_violation("UNIQUE constraint failed: user_profiles"));
        }

        let mut stored = profile.clone();
        stored.last_login = None;
        state.user_profiles.insert(stored.account_id, stored);
        Ok(())
    }

    fn get_user_profile(&self, account_id: AccountId) -> RepoResult<UserProfile> {
        let state = self.begin(RepoOperation::GetUserProfile)?;
        state
            .user_profiles
            .get(&account_id)
            .cloned()
            .ok_or_else(|| RepoError::not_found("user profile", account_id))
    }

    fn update_user_profile(
        &self,
        account_id: AccountId,
        update: &ProfileUpdate,
    ) -> RepoResult<()> {
        let mut state = self.begin(RepoOperation::UpdateUserProfile)?;
        if let Some(profile) = state.user_profiles.get_mut(&account_id) {
            for field in update.fields() {
                if let Some(value) = update.get(field) {
                    apply_value(field, value, profile);
                }
            }
        }
        Ok(())
    }

    fn get_user_account(&self, id: AccountId) -> RepoResult<UserAccount> {
        let state = self.begin(RepoOperation::GetUserAccount)?;
        state
            .user_accounts
            .get(&id)
            .cloned()
            .ok_or_else(|| RepoError::not_found("user account", id))
    }

    fn get_account_by_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> RepoResult<UserAccount> {
        let state = self.begin(RepoOperation::GetAccountByCredentials)?;
        let account = state
            .user_accounts
            .values()
            .find(|account| account.username == username);

        match account {
            Some(account) if account.password == password => Ok(account.clone()),
            Some(_) | None => Err(RepoError::InvalidCredentials),
        }
    }

    fn create_org_account(&self, org: &OrgAccount) -> RepoResult<()> {
        let mut state = self.begin(RepoOperation::CreateOrgAccount)?;
        org.validate()?;
        if state.org_accounts.contains_key(&org.id) {
            return Err(constraint_violation("UNIQUE constraint failed: org_accounts.id"));
        }

        let mut stored = org.clone();
        stored.joined_on = now_epoch_ms();
        state.org_accounts.insert(stored.id, stored);
        Ok(())
    }

    fn create_org_profile(&self, profile: &OrgProfile) -> RepoResult<()> {
        let mut state = self.begin(RepoOperation::CreateOrgProfile)?;
        if !state.org_accounts.contains_key(&profile.account_id) {
            return Err(constraint_violation("FOREIGN KEY constraint failed"));
        }
        if state.org_profiles.contains_key(&profile.account_id) {
            return Err(constraint_violation("UNIQUE constraint failed: org_profiles"));
        }
        state.org_profiles.insert(profile.account_id, profile.clone());
        Ok(())
    }

    fn get_org_account(&self, id: AccountId) -> RepoResult<OrgAccount> {
        let state = self.begin(RepoOperation::GetOrgAccount)?;
        state
            .org_accounts
            .get(&id)
            .cloned()
            .ok_or_else(|| RepoError::not_found("organization account", id))
    }

    fn get_org_profile(&self, account_id: AccountId) -> RepoResult<OrgProfile> {
        let state = self.begin(RepoOperation::GetOrgProfile)?;
        state
            .org_profiles
            .get(&account_id)
            .cloned()
            .ok_or_else(|| RepoError::not_found("organization profile", account_id))
    }

    fn delete_org_account(&self, id: AccountId) -> RepoResult<()> {
        let mut state = self.begin(RepoOperation::DeleteOrgAccount)?;
        state.org_accounts.remove(&id);
        state.org_profiles.remove(&id);
        state.org_users.retain(|(_, org)| *org != id);
        Ok(())
    }

    fn associate_user_to_org(&self, user_id: AccountId, org_id: AccountId) -> RepoResult<()> {
        let mut state = self.begin(RepoOperation::AssociateUserToOrg)?;
        if !state.user_accounts.contains_key(&user_id) || !state.org_accounts.contains_key(&org_id)
        {
            return Err(constraint_violation("FOREIGN KEY constraint failed"));
        }
        state.org_users.push((user_id, org_id));
        Ok(())
    }

    fn confirm_user_to_org_association(
        &self,
        user_id: AccountId,
        org_id: AccountId,
    ) -> RepoResult<()> {
        let state = self.begin(RepoOperation::ConfirmUserToOrgAssociation)?;
        if state
            .org_users
            .iter()
            .any(|(user, org)| *user == user_id && *org == org_id)
        {
            Ok(())
        } else {
            Err(RepoError::NotAssociated { user_id, org_id })
        }
    }
}
