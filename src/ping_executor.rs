use std::future::Future;
use std::io;
use std::net::IpAddr;
use std::time::Duration;

use log::debug;
use surge_ping::{Client, Config, ICMP, IcmpPacket, PingIdentifier, PingSequence, SurgeError};

use crate::error::ProbeError;
use crate::ping::{ProbeOutcome, ProbeStatus};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Echo payload length, matching the "with 32 bytes of data" banner.
pub const PAYLOAD_SIZE: usize = 32;

const ICMP_HEADER_LEN: usize = 8;

/// Sends a single echo request and reports how it ended.
///
/// Timeouts, unreachable hosts and the like come back as `Ok` outcomes with a
/// failure status. `Err` is reserved for faults that make probing impossible.
pub trait Prober {
    fn probe(
        &self,
        target: IpAddr,
        ordinal: u16,
        timeout: Duration,
    ) -> impl Future<Output = Result<ProbeOutcome, ProbeError>>;
}

/// ICMP echo prober on top of `surge-ping`.
pub struct IcmpProber {
    identifier: PingIdentifier,
    payload: [u8; PAYLOAD_SIZE],
}

impl IcmpProber {
    pub fn new() -> Self {
        Self {
            identifier: PingIdentifier(std::process::id() as u16),
            payload: [0; PAYLOAD_SIZE],
        }
    }

    fn client_for(target: IpAddr) -> Result<Client, ProbeError> {
        let config = match target {
            IpAddr::V4(_) => Config::default(),
            IpAddr::V6(_) => Config::builder().kind(ICMP::V6).build(),
        };
        Client::new(&config).map_err(ProbeError::Socket)
    }
}

impl Default for IcmpProber {
    fn default() -> Self {
        Self::new()
    }
}

impl Prober for IcmpProber {
    async fn probe(&self, target: IpAddr, ordinal: u16, timeout: Duration) -> Result<ProbeOutcome, ProbeError> {
        if target.is_unspecified() {
            return Err(ProbeError::InvalidTarget(target));
        }

        let client = Self::client_for(target)?;
        let mut pinger = client.pinger(target, self.identifier).await;
        pinger.timeout(timeout);

        match pinger.ping(PingSequence(ordinal), &self.payload).await {
            Ok((packet, rtt)) => {
                let (from, size, ttl) = reply_details(&packet);
                debug!("icmp_seq={ordinal} reply from {from} size={size} rtt={rtt:?}");
                Ok(ProbeOutcome::success(
                    ordinal,
                    from,
                    rtt,
                    size.saturating_sub(ICMP_HEADER_LEN),
                    ttl,
                ))
            }
            Err(e) => {
                debug!("icmp_seq={ordinal} to {target} failed: {e}");
                Ok(ProbeOutcome::failure(ordinal, classify(&e)))
            }
        }
    }
}

fn reply_details(packet: &IcmpPacket) -> (IpAddr, usize, Option<u8>) {
    match packet {
        IcmpPacket::V4(p) => (IpAddr::V4(p.get_source()), p.get_size(), p.get_ttl().into()),
        IcmpPacket::V6(p) => (IpAddr::V6(p.get_source()), p.get_size(), p.get_max_hop_limit().into()),
    }
}

/// Map a transport error onto a probe status.
///
/// `surge-ping` drops time-exceeded replies, so `TtlExpired` never comes out
/// of this mapping.
fn classify(error: &SurgeError) -> ProbeStatus {
    match error {
        SurgeError::Timeout { .. } => ProbeStatus::TimedOut,
        SurgeError::NetworkError => ProbeStatus::Unreachable,
        SurgeError::IOError(e) => match e.kind() {
            io::ErrorKind::TimedOut => ProbeStatus::TimedOut,
            io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable => ProbeStatus::Unreachable,
            _ => ProbeStatus::OtherFailure,
        },
        _ => ProbeStatus::OtherFailure,
    }
}
