use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Cli, Config};
use crate::error::WrapResult;
use crate::host::{Host, SystemHost};
use crate::ravello::AppId;

mod config;
mod error;
mod host;
mod ipmi;
mod ravello;

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Launched(usize),
    ApplicationNotFound(AppId),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let Some(config) = Config::from_cli(Cli::parse()) else {
        println!("Please specify a ephemeral token.");
        return ExitCode::FAILURE;
    };

    let mut host = SystemHost::new(&config);
    match run(&config, &mut host).await {
        Ok(Outcome::Launched(count)) => {
            info!("Started {} BMC emulators", count);
            ExitCode::SUCCESS
        }
        Ok(Outcome::ApplicationNotFound(app_id)) => {
            println!("Warning, application ID {app_id} is not in Ravello.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[instrument(skip_all)]
async fn run<H: Host>(config: &Config, host: &mut H) -> WrapResult<Outcome> {
    let app_id = ravello::read_vm_identity(&config.vm_json).await?;

    host.kill_existing_bmcs().await?;

    let Some(app) = ravello::fetch_application(config, &app_id).await? else {
        debug!("Application {} not found, no BMC to start", app_id);
        return Ok(Outcome::ApplicationNotFound(app_id));
    };

    if app.deployment.is_none() {
        warn!("Application {} has no deployment, no BMC to start", app.name);
    }

    let targets = ipmi::plan_targets(&app);
    for target in &targets {
        info!(
            "VM Name: ({}) IPMI IP: ({})",
            target.vm_name, target.address
        );
        host.add_address(&target.address, &config.interface).await?;
        host.spawn_bmc(target, &config.token).await?;
    }

    Ok(Outcome::Launched(targets.len()))
}
