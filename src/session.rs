use std::io::{self, Write};
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use crate::error::{ResolveError, SessionError};
use crate::ping::ProbeOutcome;
use crate::ping_executor::{PAYLOAD_SIZE, Prober};
use crate::probe_loop::{LoopEnd, ProbeLoop};
use crate::resolver::{HostLookup, resolve};
use crate::statistics::{LossFormula, PingStatistics};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Resolving,
    Probing,
    Reporting,
    Done,
}

/// One-shot latch guarding the statistics print. The first claim wins.
#[derive(Debug, Default)]
pub struct ReportLatch {
    printed: AtomicBool,
}

impl ReportLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_claim(&self) -> bool {
        self.printed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_claimed(&self) -> bool {
        self.printed.load(Ordering::Acquire)
    }

    /// Runs `print` only for the first caller. Returns whether it ran.
    pub fn run_once<F>(&self, print: F) -> io::Result<bool>
    where
        F: FnOnce() -> io::Result<()>,
    {
        if !self.try_claim() {
            return Ok(false);
        }
        print()?;
        Ok(true)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionSettings {
    pub probe_loop: ProbeLoop,
    pub loss_formula: LossFormula,
}

/// What a finished session amounted to.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionReport {
    /// The host could not be resolved; nothing was probed.
    Unresolved(ResolveError),
    /// Interrupted before a target was known.
    Cancelled,
    Finished {
        target: IpAddr,
        end: LoopEnd,
        statistics: PingStatistics,
    },
}

/// One probe session against a single host: resolve, probe, report.
pub struct Session<L, P> {
    lookup: L,
    prober: P,
    settings: SessionSettings,
    cancel: CancellationToken,
    latch: Arc<ReportLatch>,
    phase: SessionPhase,
    target: Option<IpAddr>,
    outcomes: Vec<ProbeOutcome>,
}

impl<L, P> Session<L, P>
where
    L: HostLookup,
    P: Prober,
{
    pub fn new(lookup: L, prober: P, settings: SessionSettings) -> Self {
        Self {
            lookup,
            prober,
            settings,
            cancel: CancellationToken::new(),
            latch: Arc::new(ReportLatch::new()),
            phase: SessionPhase::Idle,
            target: None,
            outcomes: Vec::new(),
        }
    }

    /// Use `cancel` to cut the session short, typically from an interrupt handler.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn report_latch(&self) -> Arc<ReportLatch> {
        Arc::clone(&self.latch)
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn target(&self) -> Option<IpAddr> {
        self.target
    }

    pub fn outcomes(&self) -> &[ProbeOutcome] {
        &self.outcomes
    }

    pub fn statistics(&self) -> PingStatistics {
        PingStatistics::summarize(&self.outcomes, self.settings.loss_formula)
    }

    pub async fn run<W: Write>(&mut self, host: &str, out: &mut W) -> Result<SessionReport, SessionError> {
        if self.phase != SessionPhase::Idle {
            return Err(SessionError::AlreadyStarted);
        }

        self.transition(SessionPhase::Resolving);
        let resolved = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            resolved = resolve(&self.lookup, host) => Some(resolved),
        };
        let Some(resolved) = resolved else {
            self.transition(SessionPhase::Done);
            return Ok(SessionReport::Cancelled);
        };
        let target = match resolved {
            Ok(target) => target,
            Err(e) => {
                debug!("resolution of {host:?} failed: {e}");
                self.transition(SessionPhase::Done);
                return Ok(SessionReport::Unresolved(e));
            }
        };
        self.target = Some(target);

        writeln!(out, "Pinging {} [{target}] with {PAYLOAD_SIZE} bytes of data:", host.trim())?;
        self.transition(SessionPhase::Probing);

        let looped = self
            .settings
            .probe_loop
            .run(&self.prober, target, &mut self.outcomes, &self.cancel, out)
            .await;
        if let Err(e) = &looped {
            warn!("probing {target} stopped early: {e}");
        }

        // Partial results are reported on every exit from the loop.
        self.transition(SessionPhase::Reporting);
        self.report(out)?;
        self.transition(SessionPhase::Done);

        Ok(SessionReport::Finished {
            target,
            end: looped?,
            statistics: self.statistics(),
        })
    }

    /// Print the statistics block unless it has already been printed for this
    /// session. Returns whether anything was written.
    pub fn report<W: Write>(&self, out: &mut W) -> io::Result<bool> {
        let Some(target) = self.target else {
            return Ok(false);
        };
        self.latch
            .run_once(|| self.statistics().write_report(target, out))
    }

    fn transition(&mut self, next: SessionPhase) {
        debug!("session {:?} -> {next:?}", self.phase);
        self.phase = next;
    }
}
