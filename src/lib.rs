//! Reachability probe: resolve a host, send a short series of ICMP echoes and
//! summarize the replies.

pub mod config;
pub mod error;
pub mod ping;
pub mod ping_executor;
pub mod probe_loop;
pub mod resolver;
pub mod session;
pub mod statistics;

pub use error::{ProbeError, ResolveError, SessionError};
pub use ping::{ProbeOutcome, ProbeStatus};
pub use ping_executor::{IcmpProber, Prober};
pub use resolver::{HostLookup, SystemLookup, resolve};
pub use session::{Session, SessionPhase, SessionReport, SessionSettings};
pub use statistics::{LossFormula, PingStatistics};
