use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use echoprobe::config::AppConfig;
use echoprobe::error::SessionError;
use echoprobe::ping_executor::IcmpProber;
use echoprobe::probe_loop::ProbeLoop;
use echoprobe::resolver::SystemLookup;
use echoprobe::session::{Session, SessionReport, SessionSettings};

mod cli;

use cli::{Args, USAGE, resolve_failure_message};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    env_logger::init();

    let args = Args::parse();
    let Some(host) = args.single_host().map(str::to_owned) else {
        println!("{USAGE}");
        return Ok(ExitCode::SUCCESS);
    };

    let mut config = AppConfig::load();
    if let Some(timeout_ms) = args.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    if let Some(formula) = args.loss_formula {
        config.loss_formula = formula;
    }

    let settings = SessionSettings {
        probe_loop: ProbeLoop::default().with_timeout(config.timeout()),
        loss_formula: config.loss_formula,
    };

    // Ctrl+C only requests cancellation; the session does the reporting.
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });

    let mut session = Session::new(SystemLookup, IcmpProber::new(), settings).with_cancellation(cancel);

    let mut stdout = io::stdout();
    match session.run(&host, &mut stdout).await {
        Ok(SessionReport::Unresolved(e)) => {
            eprintln!("{}", resolve_failure_message(&host, &e));
            Ok(ExitCode::FAILURE)
        }
        Ok(SessionReport::Cancelled | SessionReport::Finished { .. }) => Ok(ExitCode::SUCCESS),
        Err(SessionError::Probe(e)) => {
            eprintln!("Error: {e}");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e).context("probe session failed"),
    }
}
