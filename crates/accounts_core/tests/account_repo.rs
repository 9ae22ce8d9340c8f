use accounts_core::db::{open_db, open_db_in_memory, open_db_with_timeout};
use accounts_core::{
    AccountRepository, ErrorKind, OrgAccount, OrgProfile, ProfileField, ProfileUpdate, RepoError,
    SqliteAccountRepository, UserAccount, UserProfile, ValidationError,
};
use rusqlite::Connection;
use std::time::Duration;
use uuid::Uuid;

fn profile_for(account: &UserAccount) -> UserProfile {
    UserProfile {
        account_id: account.id,
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: Some("ada@example.com".to_string()),
        phone: None,
        last_login: None,
    }
}

fn seed_user(repo: &SqliteAccountRepository<'_>, username: &str) -> UserAccount {
    let account = UserAccount::new(username, "secret", Some("provider".to_string()));
    repo.create_user_account(&account).unwrap();
    repo.create_user_profile(&profile_for(&account)).unwrap();
    account
}

fn seed_org(repo: &SqliteAccountRepository<'_>) -> OrgAccount {
    let org = OrgAccount::new("Acme", Some("provider".to_string()));
    repo.create_org_account(&org).unwrap();
    org
}

#[test]
fn create_and_get_user_account_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();

    let account = seed_user(&repo, "ada");
    let loaded = repo.get_user_account(account.id).unwrap();

    assert_eq!(loaded.id, account.id);
    assert_eq!(loaded.username, "ada");
    assert_eq!(loaded.org_type.as_deref(), Some("provider"));
    assert!(loaded.joined_on > 0);

    let profile = repo.get_user_profile(account.id).unwrap();
    assert_eq!(profile.first_name, "Ada");
    assert_eq!(profile.last_login, None);
}

#[test]
fn create_user_account_validates_before_writing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();

    let err = repo
        .create_user_account(&UserAccount::new("", "secret", None))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::EmptyUsername)
    ));

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM user_accounts;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn duplicate_username_is_a_persistence_error() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();
    seed_user(&repo, "ada");

    let err = repo
        .create_user_account(&UserAccount::new("ada", "other", None))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Persistence);
}

#[test]
fn profile_requires_existing_account_and_names() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();

    let orphan = UserAccount::new("ghost", "secret", None);
    let err = repo.create_user_profile(&profile_for(&orphan)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Persistence);

    let account = UserAccount::new("ada", "secret", None);
    repo.create_user_account(&account).unwrap();
    let mut nameless = profile_for(&account);
    nameless.first_name = "  ".to_string();
    let err = repo.create_user_profile(&nameless).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn missing_rows_report_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();
    let id = Uuid::new_v4();

    assert_eq!(repo.get_user_account(id).unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(repo.get_user_profile(id).unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(repo.get_org_account(id).unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(repo.get_org_profile(id).unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn delete_user_account_twice_is_not_an_error() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();
    let account = seed_user(&repo, "ada");

    repo.delete_user_account(account.id).unwrap();
    repo.delete_user_account(account.id).unwrap();

    assert_eq!(
        repo.get_user_account(account.id).unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        repo.get_user_profile(account.id).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn credentials_lookup_collapses_unknown_user_and_wrong_password() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();
    let account = seed_user(&repo, "ada");

    let found = repo.get_account_by_credentials("ada", "secret").unwrap();
    assert_eq!(found.id, account.id);

    let wrong_password = repo.get_account_by_credentials("ada", "nope").unwrap_err();
    let unknown_user = repo.get_account_by_credentials("bob", "secret").unwrap_err();
    assert!(matches!(wrong_password, RepoError::InvalidCredentials));
    assert!(matches!(unknown_user, RepoError::InvalidCredentials));
    assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    assert_eq!(wrong_password.kind(), ErrorKind::Auth);
}

#[test]
fn association_confirm_and_duplicates() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();
    let account = seed_user(&repo, "ada");
    let org = seed_org(&repo);
    let other_org = OrgAccount::new("Globex", None);
    repo.create_org_account(&other_org).unwrap();

    let err = repo
        .confirm_user_to_org_association(account.id, org.id)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    repo.associate_user_to_org(account.id, org.id).unwrap();
    repo.associate_user_to_org(account.id, org.id).unwrap();
    repo.confirm_user_to_org_association(account.id, org.id)
        .unwrap();

    let err = repo
        .confirm_user_to_org_association(account.id, other_org.id)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotAssociated { user_id, org_id } if user_id == account.id && org_id == other_org.id
    ));
}

#[test]
fn association_to_unknown_org_fails() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();
    let account = seed_user(&repo, "ada");

    let err = repo
        .associate_user_to_org(account.id, Uuid::new_v4())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Persistence);
}

#[test]
fn update_sets_only_named_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();
    let account = seed_user(&repo, "ada");

    let update = ProfileUpdate::new().set(ProfileField::Phone, "555-0100");
    repo.update_user_profile(account.id, &update).unwrap();

    let profile = repo.get_user_profile(account.id).unwrap();
    assert_eq!(profile.phone.as_deref(), Some("555-0100"));
    assert_eq!(profile.first_name, "Ada");
    assert_eq!(profile.email.as_deref(), Some("ada@example.com"));
}

#[test]
fn update_with_null_value_leaves_field_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();
    let account = seed_user(&repo, "ada");

    let update = ProfileUpdate::from_pairs(&[("email", None)]).unwrap();
    repo.update_user_profile(account.id, &update).unwrap();

    let profile = repo.get_user_profile(account.id).unwrap();
    assert_eq!(profile.email.as_deref(), Some("ada@example.com"));
}

#[test]
fn default_sentinel_uses_column_default() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();
    let account = seed_user(&repo, "ada");

    let update = ProfileUpdate::from_pairs(&[("first_name", Some("DEFAULT"))])
        .unwrap()
        .set_default(ProfileField::LastLogin);
    repo.update_user_profile(account.id, &update).unwrap();

    let profile = repo.get_user_profile(account.id).unwrap();
    assert_ne!(profile.first_name, "DEFAULT");
    assert_eq!(profile.first_name, "");
    assert!(profile.last_login.unwrap_or_default() > 0);
}

#[test]
fn update_values_cannot_inject_sql() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();
    let account = seed_user(&repo, "ada");
    let hostile = "x', first_name = 'pwned";

    let update = ProfileUpdate::new().set(ProfileField::Email, hostile);
    repo.update_user_profile(account.id, &update).unwrap();

    let profile = repo.get_user_profile(account.id).unwrap();
    assert_eq!(profile.email.as_deref(), Some(hostile));
    assert_eq!(profile.first_name, "Ada");
}

#[test]
fn numeric_json_values_are_stored_in_text_columns() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();
    let account = seed_user(&repo, "ada");

    let patch = serde_json::json!({"phone": 5550100});
    let update = ProfileUpdate::from_json(patch.as_object().unwrap()).unwrap();
    repo.update_user_profile(account.id, &update).unwrap();

    let profile = repo.get_user_profile(account.id).unwrap();
    assert_eq!(profile.phone.as_deref(), Some("5550100"));
}

#[test]
fn org_roundtrip_with_profile() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();
    let org = seed_org(&repo);
    repo.create_org_profile(&OrgProfile {
        account_id: org.id,
        phone: Some("555-0100".to_string()),
        address: Some("1 Main St".to_string()),
        timezone: Some("UTC".to_string()),
        website: Some("acme.example".to_string()),
    })
    .unwrap();

    let loaded = repo.get_org_account(org.id).unwrap();
    assert_eq!(loaded.name, "Acme");
    assert_eq!(loaded.org_type.as_deref(), Some("provider"));

    let profile = repo.get_org_profile(org.id).unwrap();
    assert_eq!(profile.timezone.as_deref(), Some("UTC"));

    repo.delete_org_account(org.id).unwrap();
    repo.delete_org_account(org.id).unwrap();
    assert_eq!(
        repo.get_org_profile(org.id).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn busy_store_surfaces_as_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("busy.db");

    let writer = open_db(&path).unwrap();
    let blocked: Connection = open_db_with_timeout(&path, Duration::from_millis(50)).unwrap();
    let repo = SqliteAccountRepository::try_new(&blocked).unwrap();

    writer.execute_batch("BEGIN IMMEDIATE;").unwrap();
    let err = repo
        .create_user_account(&UserAccount::new("ada", "secret", None))
        .unwrap_err();
    writer.execute_batch("ROLLBACK;").unwrap();

    assert!(matches!(err, RepoError::Timeout(_)));
    assert_eq!(err.kind(), ErrorKind::Persistence);
}
