use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

/// How a single echo attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    Success,
    TimedOut,
    Unreachable,
    TtlExpired,
    OtherFailure,
}

impl ProbeStatus {
    pub fn is_success(self) -> bool {
        matches!(self, ProbeStatus::Success)
    }

    pub fn name(self) -> &'static str {
        match self {
            ProbeStatus::Success => "Success",
            ProbeStatus::TimedOut => "TimedOut",
            ProbeStatus::Unreachable => "Unreachable",
            ProbeStatus::TtlExpired => "TtlExpired",
            ProbeStatus::OtherFailure => "OtherFailure",
        }
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one probe attempt. `rtt` is only set for successful replies.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub ordinal: u16,
    pub status: ProbeStatus,
    pub rtt: Option<Duration>,
    pub bytes: usize,
    pub ttl: Option<u8>,
    pub reply_from: Option<IpAddr>,
}

impl ProbeOutcome {
    pub fn success(ordinal: u16, reply_from: IpAddr, rtt: Duration, bytes: usize, ttl: Option<u8>) -> Self {
        Self {
            ordinal,
            status: ProbeStatus::Success,
            rtt: Some(rtt),
            bytes,
            ttl,
            reply_from: Some(reply_from),
        }
    }

    /// A non-success outcome. Passing `ProbeStatus::Success` here is a caller bug
    /// and is downgraded to `OtherFailure`, since a success without latency
    /// cannot be aggregated.
    pub fn failure(ordinal: u16, status: ProbeStatus) -> Self {
        let status = if status.is_success() { ProbeStatus::OtherFailure } else { status };
        Self {
            ordinal,
            status,
            rtt: None,
            bytes: 0,
            ttl: None,
            reply_from: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// The per-attempt console line.
impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status, self.reply_from, self.rtt) {
            (ProbeStatus::Success, Some(from), Some(rtt)) => {
                write!(f, "Reply from {from}: bytes={} time={}ms", self.bytes, rtt.as_millis())?;
                if let Some(ttl) = self.ttl {
                    write!(f, " TTL={ttl}")?;
                }
                Ok(())
            }
            (status, _, _) => write!(f, "{status}"),
        }
    }
}
