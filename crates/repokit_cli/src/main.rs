//! CLI smoke entry point.
//!
//! # Responsibility
//! - Run the basic application flow (create, read, list, delete) end to end.
//! - Print one JSON object per step so output stays machine-checkable.

use log::{error, info};
use repokit_core::{
    create_application_table, init_logging_from_config, open_configured_db, Application,
    ApplicationCreate, ApplicationFilter, ApplicationRead, ApplicationService, CoreConfig, Filter,
    RepositoryFactory, SqliteSession,
};
use serde_json::json;
use std::error::Error;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("repokit: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = CoreConfig::from_env()?;
    init_logging_from_config(&config)?;
    info!(
        "event=cli_start module=cli status=ok version={}",
        repokit_core::core_version()
    );

    let conn = open_configured_db(&config)?;
    create_application_table(&conn)?;
    let session = SqliteSession::new(&conn);
    let factory = RepositoryFactory::new(&session);
    let service = ApplicationService::new(&factory);

    // phone and email are unique, including soft-deleted rows
    let suffix = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis() % 10_000_000;
    let created = service.create(&ApplicationCreate {
        phone: format!("+7800{suffix:07}"),
        email: format!("user{suffix}@example.com"),
        text: "Your service is excellent!".to_string(),
    })?;
    print_step("create", &created)?;

    let id = created.id.ok_or("created application has no id")?;
    let fetched = service.find_one_or_fail(id)?;
    print_step("read", &fetched)?;

    let listed = service
        .find(&ApplicationFilter::default())?
        .iter()
        .map(ApplicationRead::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    println!("{}", json!({ "step": "list", "applications": listed }));

    let deleted = service.delete(id)?;
    print_step("delete", &deleted)?;

    let remaining = factory
        .soft_delete::<Application>(Application::DELETED_AT)
        .count(&Filter::all())?;
    println!("{}", json!({ "step": "count", "live": remaining }));
    Ok(())
}

fn print_step(step: &str, application: &Application) -> Result<(), Box<dyn Error>> {
    let view = ApplicationRead::try_from(application)?;
    println!("{}", json!({ "step": step, "application": view }));
    Ok(())
}
