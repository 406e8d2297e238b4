use std::io::Write;
use std::net::IpAddr;
use std::time::Duration;

use log::debug;
use tokio_util::sync::CancellationToken;

use crate::error::SessionError;
use crate::ping::ProbeOutcome;
use crate::ping_executor::{DEFAULT_TIMEOUT, Prober};

pub const DEFAULT_ATTEMPTS: u16 = 6;
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// How the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEnd {
    Completed,
    Interrupted,
}

/// Sequential probing against one target.
#[derive(Debug, Clone)]
pub struct ProbeLoop {
    pub attempts: u16,
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for ProbeLoop {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ProbeLoop {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Probe `target` up to `attempts` times, appending to `outcomes` and
    /// printing each attempt line as soon as it is known.
    ///
    /// Cancellation is observed while a probe is in flight and while sleeping
    /// between attempts. An in-flight probe that gets cancelled is not recorded;
    /// everything already in `outcomes` is left untouched. The interval is also
    /// slept after the final attempt.
    pub async fn run<P, W>(
        &self,
        prober: &P,
        target: IpAddr,
        outcomes: &mut Vec<ProbeOutcome>,
        cancel: &CancellationToken,
        out: &mut W,
    ) -> Result<LoopEnd, SessionError>
    where
        P: Prober,
        W: Write,
    {
        for ordinal in 0..self.attempts {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(self.interrupted(ordinal)),
                result = prober.probe(target, ordinal, self.timeout) => result?,
            };

            writeln!(out, "{outcome}")?;
            out.flush()?;
            outcomes.push(outcome);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(self.interrupted(ordinal + 1)),
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        Ok(LoopEnd::Completed)
    }

    fn interrupted(&self, recorded: u16) -> LoopEnd {
        debug!("probe loop interrupted after {recorded}/{} attempts", self.attempts);
        LoopEnd::Interrupted
    }
}
