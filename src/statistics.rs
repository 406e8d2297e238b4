use std::io::{self, Write};
use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ping::ProbeOutcome;

/// How the "% loss" figure is derived from the packet counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LossFormula {
    /// `(failed - successful) / failed * 100` in whole-number arithmetic, 0 when
    /// nothing failed. Kept for output compatibility with the classic tool; it
    /// does not measure loss in the usual sense (see DESIGN.md).
    #[default]
    Reference,
    /// `failed / sent * 100`.
    Conventional,
}

impl LossFormula {
    pub fn loss_rate(self, total: u64, successful: u64, failed: u64) -> f64 {
        match self {
            LossFormula::Reference => {
                if failed == 0 {
                    return 0.0;
                }
                let (failed, successful) = (failed as i64, successful as i64);
                ((failed - successful) / failed * 100) as f64
            }
            LossFormula::Conventional => {
                if total == 0 {
                    0.0
                } else {
                    failed as f64 / total as f64 * 100.0
                }
            }
        }
    }
}

/// Round-trip aggregates over successful probes only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySummary {
    pub min: Duration,
    pub max: Duration,
    /// Mean of the whole-millisecond round trips; rounded only when printed.
    pub mean_ms: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PingStatistics {
    pub total_pings: u64,
    pub successful_pings: u64,
    pub failed_pings: u64,
    pub loss_rate: f64,
    /// `None` when no probe succeeded.
    pub latency: Option<LatencySummary>,
}

impl PingStatistics {
    pub fn summarize(outcomes: &[ProbeOutcome], formula: LossFormula) -> Self {
        let total = outcomes.len() as u64;
        let successful = outcomes.iter().filter(|o| o.is_success()).count() as u64;
        let failed = total - successful;

        Self {
            total_pings: total,
            successful_pings: successful,
            failed_pings: failed,
            loss_rate: formula.loss_rate(total, successful, failed),
            latency: summarize_latency(outcomes),
        }
    }

    /// Writes the closing statistics block for `target`.
    pub fn write_report<W: Write>(&self, target: IpAddr, out: &mut W) -> io::Result<()> {
        writeln!(out)?;
        writeln!(out, "Ping statistics for {target}:")?;
        writeln!(
            out,
            "    Packets: Sent = {}, Received = {}, Lost = {} ({:.0}% loss)",
            self.total_pings, self.successful_pings, self.failed_pings, self.loss_rate
        )?;

        if let Some(latency) = &self.latency {
            writeln!(out)?;
            writeln!(out, "Approximate round trip times in milli-seconds:")?;
            writeln!(
                out,
                "    Minimum = {}ms, Maximum = {}ms, Average = {:.2}ms",
                latency.min.as_millis(),
                latency.max.as_millis(),
                latency.mean_ms
            )?;
        }
        out.flush()
    }
}

pub fn summarize_latency(outcomes: &[ProbeOutcome]) -> Option<LatencySummary> {
    let rtts: Vec<Duration> = outcomes
        .iter()
        .filter(|o| o.is_success())
        .filter_map(|o| o.rtt)
        .collect();

    let min = rtts.iter().min().copied()?;
    let max = rtts.iter().max().copied()?;
    // Averaged over the same whole milliseconds the reply lines show.
    let total_ms: u128 = rtts.iter().map(Duration::as_millis).sum();

    Some(LatencySummary {
        min,
        max,
        mean_ms: total_ms as f64 / rtts.len() as f64,
    })
}
