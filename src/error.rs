use std::io;
use std::net::IpAddr;

use thiserror::Error;

/// Why a host string could not be turned into a single target address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("No Hostname or IP Address provided.")]
    NoInputProvided,

    #[error("host name is {len} characters long, the limit is {max}")]
    InputTooLong { len: usize, max: usize },

    /// The lookup itself failed or returned nothing. The message is kept verbatim.
    #[error("{0}")]
    NameResolution(String),

    #[error("{}", invalid_format_message(.parameter.as_deref(), .detail))]
    InvalidAddressFormat {
        parameter: Option<String>,
        detail: String,
    },
}

fn invalid_format_message(parameter: Option<&str>, detail: &str) -> String {
    match parameter {
        Some(name) => format!("invalid address format ({name}): {detail}"),
        None => format!("invalid address format: {detail}"),
    }
}

/// Conditions that stop the prober from sending anything at all.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to open ICMP socket: {0}")]
    Socket(#[source] io::Error),

    #[error("cannot probe {0}")]
    InvalidTarget(IpAddr),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("console write failed: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("session has already been run")]
    AlreadyStarted,
}
