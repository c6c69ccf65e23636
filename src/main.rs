//! Cluster agent - per-node join and configuration service.

use std::process;
use std::sync::Arc;

use clap::Parser;
use cluster_agent::agent::{Agent, AgentOptions};
use cluster_agent::apply::SystemRunner;
use cluster_agent::cli::Cli;
use cluster_agent::config::{AgentConfig, ResolvedSettings, resolve_settings};
use cluster_agent::endpoint::SystemResolver;
use cluster_agent::{Error, Result, server};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    if let Err(e) = run(cli) {
        error!(error = %e, "cluster agent failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// `RUST_LOG` wins over the built-in `info` default.
fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(&cli)?;
    let layout = cli.layout();
    info!(
        snap_data = %layout.snap_data().display(),
        snap = %layout.snap().display(),
        command_timeout_secs = settings.command_timeout_secs.value,
        cluster_port = %settings.cluster_port.value,
        "starting cluster agent"
    );

    let agent = Agent::new(
        layout,
        AgentOptions::from(&settings),
        Arc::new(SystemRunner::new(settings.command_timeout())),
        Arc::new(SystemResolver),
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server::start_server(&settings, Arc::new(agent)))
}

fn load_settings(cli: &Cli) -> Result<ResolvedSettings> {
    let (path, explicit) = cli.config_path();
    let file = AgentConfig::load(&path)?;

    match (&file, explicit) {
        (None, true) => {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        (Some(_), _) => info!(path = %path.display(), "loaded settings file"),
        (None, false) => {}
    }

    Ok(resolve_settings(
        &cli.overrides(),
        file.as_ref(),
        file.as_ref().map(|_| &path),
    ))
}
