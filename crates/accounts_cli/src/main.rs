//! CLI smoke entry point.
//!
//! # Responsibility
//! - Wire config, logging, database and service the way a host process would.
//! - Run create org -> create user -> login once and print the result as JSON.
//!
//! Usage: `accounts_cli [username] [password]`. Configuration comes from
//! the `ACCOUNTS_*` environment variables.

use accounts_core::db::{open_db_in_memory, open_db_with_timeout};
use accounts_core::{
    init_logging, init_stderr_logging, AccountService, CoreConfig, DbLocation, NewOrg, NewUser,
    SqliteAccountRepository,
};
use log::info;
use std::error::Error;
use std::process::ExitCode;

const DEFAULT_USERNAME: &str = "smoke";
const DEFAULT_PASSWORD: &str = "smoke-password";

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("accounts_cli error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = CoreConfig::from_env()?;
    match config.log_dir.as_deref() {
        Some(dir) => init_logging(config.log_level, dir)?,
        None => init_stderr_logging(config.log_level)?,
    }

    let mut args = std::env::args().skip(1);
    let username = args.next().unwrap_or_else(|| DEFAULT_USERNAME.to_string());
    let password = args.next().unwrap_or_else(|| DEFAULT_PASSWORD.to_string());

    let conn = match &config.db {
        DbLocation::Memory => open_db_in_memory()?,
        DbLocation::File(path) => open_db_with_timeout(path, config.busy_timeout)?,
    };
    let service = AccountService::new(SqliteAccountRepository::try_new(&conn)?);

    let org_id = service.create_org(
        &config.request_context(),
        NewOrg {
            name: "Smoke Org".to_string(),
            org_type: Some("provider".to_string()),
            ..NewOrg::default()
        },
    )?;
    let user_id = service.create_user(
        &config.request_context(),
        NewUser {
            org_id,
            username: username.clone(),
            password: password.clone(),
            org_type: Some("provider".to_string()),
            first_name: "Smoke".to_string(),
            last_name: "Test".to_string(),
            ..NewUser::default()
        },
    )?;
    let user = service.login(&config.request_context(), org_id, &username, &password)?;
    let org = service.get_org(&config.request_context(), org_id)?;

    info!("event=cli_smoke module=cli status=ok user_id={user_id} org_id={org_id}");
    let output = serde_json::json!({
        "core_version": accounts_core::core_version(),
        "org": org,
        "user": user,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
