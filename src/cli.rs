use clap::Parser;

use echoprobe::ResolveError;
use echoprobe::statistics::LossFormula;

pub const USAGE: &str = "echoprobe ipOrHostName";

/// Send six ICMP echo requests to a host and summarize the replies
#[derive(Parser, Debug, Clone)]
#[command(name = "echoprobe")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Host name or IP address to probe (exactly one)
    pub hosts: Vec<String>,

    /// Per-probe timeout in milliseconds (overrides the config file)
    #[arg(long = "timeout", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_ms: Option<u64>,

    /// How the loss percentage is computed (overrides the config file)
    #[arg(long = "loss-formula", value_enum)]
    pub loss_formula: Option<LossFormula>,
}

impl Args {
    /// The host to probe, or `None` unless exactly one was given.
    pub fn single_host(&self) -> Option<&str> {
        match self.hosts.as_slice() {
            [host] => Some(host),
            _ => None,
        }
    }
}

/// Text printed when `host` could not be turned into a target.
pub fn resolve_failure_message(host: &str, error: &ResolveError) -> String {
    match error {
        ResolveError::NoInputProvided | ResolveError::InputTooLong { .. } => error.to_string(),
        _ => format!("Ping request could not find host {}. {error}", host.trim()),
    }
}
