//! Account and organization use-case service.
//!
//! # Responsibility
//! - Compose repository calls into create-user, create-org and login
//!   workflows.
//! - Generate account ids and apply compensation when a later write fails.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - A failed workflow returns its triggering error, never a partial value.
//! - Steps run strictly in sequence; the request context is checked
//!   before each one.

use crate::context::{Interrupted, RequestContext};
use crate::error::ErrorKind;
use crate::model::account::{DetailedUser, NewUser, UserAccount};
use crate::model::org::{DetailedOrg, NewOrg, OrgAccount};
use crate::model::{AccountId, ValidationError};
use crate::repo::account_repo::{AccountRepository, RepoError};
use crate::repo::profile_update::{ProfileField, ProfileUpdate};
use crate::service::saga::{Saga, SagaFailure, WorkflowState};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors from account service operations.
#[derive(Debug)]
pub enum ServiceError {
    Repo(RepoError),
    /// Request cancelled or past its deadline before the next step.
    Interrupted(Interrupted),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Repo(err) => err.kind(),
            Self::Interrupted(reason) => reason.kind(),
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Interrupted(reason) => write!(f, "{reason}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Interrupted(reason) => Some(reason),
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<Interrupted> for ServiceError {
    fn from(value: Interrupted) -> Self {
        Self::Interrupted(value)
    }
}

/// Orchestrates account workflows over any [`AccountRepository`].
pub struct AccountService<R: AccountRepository> {
    repo: R,
}

impl<R: AccountRepository> AccountService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Borrow the underlying repository.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Creates account, profile and org association for a new user.
    ///
    /// # Contract
    /// - Returns the generated account id.
    /// - Input is validated before the first write.
    /// - If the profile or association write fails, the account is
    ///   deleted again and the write error is returned.
    pub fn create_user(&self, ctx: &RequestContext, request: NewUser) -> ServiceResult<AccountId> {
        request
            .validate()
            .map_err(|err| log_failure("create_user", err.into()))?;
        let id = Uuid::new_v4();
        let org_id = request.org_id;
        let (account, profile) = request.into_records(id);

        let outcome = Saga::<ServiceError>::new("create_user")
            .compensated_step(
                WorkflowState::AccountCreated,
                || Ok(self.repo.create_user_account(&account)?),
                || Ok(self.repo.delete_user_account(id)?),
            )
            .step(WorkflowState::ProfileCreated, || {
                Ok(self.repo.create_user_profile(&profile)?)
            })
            .step(WorkflowState::Associated, || {
                Ok(self.repo.associate_user_to_org(id, org_id)?)
            })
            .run(ctx);

        finish_workflow("create_user", outcome)?;
        info!("event=user_create module=service status=ok id={id} org_id={org_id}");
        Ok(id)
    }

    /// Deletes a user account with its profile and associations.
    ///
    /// Deleting an absent id succeeds.
    pub fn delete_user_account(&self, ctx: &RequestContext, id: AccountId) -> ServiceResult<()> {
        ctx.check()?;
        self.repo
            .delete_user_account(id)
            .map_err(|err| log_failure("delete_user_account", err))?;
        info!("event=user_delete module=service status=ok id={id}");
        Ok(())
    }

    /// Loads one user account; `NotFound` propagates unchanged.
    pub fn get_user_account(
        &self,
        ctx: &RequestContext,
        id: AccountId,
    ) -> ServiceResult<UserAccount> {
        ctx.check()?;
        Ok(self
            .repo
            .get_user_account(id)
            .map_err(|err| log_failure("get_user_account", err))?)
    }

    /// Loads account plus profile without touching `last_login`.
    pub fn get_user(&self, ctx: &RequestContext, id: AccountId) -> ServiceResult<DetailedUser> {
        ctx.check()?;
        let account = self
            .repo
            .get_user_account(id)
            .map_err(|err| log_failure("get_user", err))?;
        ctx.check()?;
        let profile = self
            .repo
            .get_user_profile(id)
            .map_err(|err| log_failure("get_user", err))?;
        Ok(DetailedUser { account, profile })
    }

    /// Applies a sparse profile update.
    ///
    /// Rejects `last_login` with `UnknownField`; only [`Self::login`]
    /// stamps it.
    pub fn update_user_profile(
        &self,
        ctx: &RequestContext,
        account_id: AccountId,
        update: &ProfileUpdate,
    ) -> ServiceResult<()> {
        if let Some(field) = update.fields().find(|field| !field.is_editable()) {
            let err = ValidationError::UnknownField(field.column().to_string());
            return Err(log_failure("update_user_profile", err.into()).into());
        }
        ctx.check()?;
        self.repo
            .update_user_profile(account_id, update)
            .map_err(|err| log_failure("update_user_profile", err))?;
        info!(
            "event=profile_update module=service status=ok id={} fields={}",
            account_id,
            update.fields().count()
        );
        Ok(())
    }

    /// Authenticates `username` into `org_id` and stamps `last_login`.
    ///
    /// # Contract
    /// - Unknown user or wrong password: `Auth`.
    /// - Valid credentials without association: `Authorization`.
    /// - Failing to stamp `last_login` fails the whole login.
    pub fn login(
        &self,
        ctx: &RequestContext,
        org_id: AccountId,
        username: &str,
        password: &str,
    ) -> ServiceResult<DetailedUser> {
        ctx.check()?;
        let account = self
            .repo
            .get_account_by_credentials(username, password)
            .map_err(|err| log_failure("login", err))?;

        ctx.check()?;
        self.repo
            .confirm_user_to_org_association(account.id, org_id)
            .map_err(|err| log_failure("login", err))?;

        ctx.check()?;
        let stamp = ProfileUpdate::new().set_default(ProfileField::LastLogin);
        self.repo
            .update_user_profile(account.id, &stamp)
            .map_err(|err| log_failure("login", err))?;

        ctx.check()?;
        let profile = match self.repo.get_user_profile(account.id) {
            Ok(profile) => profile,
            Err(RepoError::NotFound { .. }) => {
                return Err(log_failure(
                    "login",
                    RepoError::InvalidData(format!("profile missing for account {}", account.id)),
                )
                .into())
            }
            Err(err) => return Err(log_failure("login", err).into()),
        };

        info!(
            "event=login module=service status=ok id={} org_id={}",
            account.id, org_id
        );
        Ok(DetailedUser { account, profile })
    }

    /// Creates org account and org profile.
    ///
    /// Deletes the org account again when the profile write fails.
    pub fn create_org(&self, ctx: &RequestContext, request: NewOrg) -> ServiceResult<AccountId> {
        request
            .validate()
            .map_err(|err| log_failure("create_org", err.into()))?;
        let id = Uuid::new_v4();
        let (account, profile) = request.into_records(id);

        let outcome = Saga::<ServiceError>::new("create_org")
            .compensated_step(
                WorkflowState::AccountCreated,
                || Ok(self.repo.create_org_account(&account)?),
                || Ok(self.repo.delete_org_account(id)?),
            )
            .step(WorkflowState::ProfileCreated, || {
                Ok(self.repo.create_org_profile(&profile)?)
            })
            .run(ctx);

        finish_workflow("create_org", outcome)?;
        info!("event=org_create module=service status=ok id={id}");
        Ok(id)
    }

    /// Loads one org account; `NotFound` propagates unchanged.
    pub fn get_org_account(&self, ctx: &RequestContext, id: AccountId) -> ServiceResult<OrgAccount> {
        ctx.check()?;
        Ok(self
            .repo
            .get_org_account(id)
            .map_err(|err| log_failure("get_org_account", err))?)
    }

    /// Loads org account plus profile.
    pub fn get_org(&self, ctx: &RequestContext, id: AccountId) -> ServiceResult<DetailedOrg> {
        ctx.check()?;
        let account = self
            .repo
            .get_org_account(id)
            .map_err(|err| log_failure("get_org", err))?;
        ctx.check()?;
        let profile = self
            .repo
            .get_org_profile(id)
            .map_err(|err| log_failure("get_org", err))?;
        Ok(DetailedOrg { account, profile })
    }
}

fn finish_workflow(
    workflow: &'static str,
    outcome: Result<WorkflowState, SagaFailure<ServiceError>>,
) -> ServiceResult<()> {
    match outcome {
        Ok(_) => Ok(()),
        Err(failure) => {
            error!(
                "event={} module=service status=error state={} error_kind={}",
                workflow,
                failure.state,
                failure.error.kind()
            );
            Err(failure.into_error())
        }
    }
}

fn log_failure(operation: &'static str, err: RepoError) -> RepoError {
    match err.kind() {
        ErrorKind::Validation
        | ErrorKind::Auth
        | ErrorKind::Authorization
        | ErrorKind::NotFound => info!(
            "event={} module=service status=rejected error_kind={} error={}",
            operation,
            err.kind(),
            err
        ),
        _ => error!(
            "event={} module=service status=error error_kind={} error={}",
            operation,
            err.kind(),
            err
        ),
    }
    err
}
