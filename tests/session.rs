//! End-to-end session tests with scripted lookup and prober.
//!
//! No sockets are opened; the tokio clock is paused so the inter-probe
//! interval costs nothing.

use std::cell::Cell;
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use echoprobe::probe_loop::{DEFAULT_ATTEMPTS, LoopEnd};
use echoprobe::resolver::MAX_HOST_LEN;
use echoprobe::{
    HostLookup, LossFormula, ProbeError, ProbeOutcome, ProbeStatus, Prober, ResolveError, Session,
    SessionError, SessionPhase, SessionReport, SessionSettings,
};
use tokio_util::sync::CancellationToken;

const TARGET: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3));

struct StaticLookup(Vec<IpAddr>);

impl HostLookup for StaticLookup {
    async fn lookup(&self, _host: &str) -> io::Result<Vec<IpAddr>> {
        Ok(self.0.clone())
    }
}

/// Plays back `script` by ordinal: `Some(ms)` is a reply, `None` a timeout.
/// With `cancel_at`, the token is cancelled while answering that many-th
/// probe, like a Ctrl+C arriving mid-run.
struct ScriptedProber {
    script: Vec<Option<u64>>,
    calls: Cell<usize>,
    cancel_at: Option<(usize, CancellationToken)>,
}

impl ScriptedProber {
    fn new(script: Vec<Option<u64>>) -> Self {
        Self { script, calls: Cell::new(0), cancel_at: None }
    }

    fn cancelling_at(mut self, calls: usize, token: CancellationToken) -> Self {
        self.cancel_at = Some((calls, token));
        self
    }
}

impl Prober for ScriptedProber {
    async fn probe(&self, target: IpAddr, ordinal: u16, _timeout: Duration) -> Result<ProbeOutcome, ProbeError> {
        let calls = self.calls.get() + 1;
        self.calls.set(calls);
        if let Some((n, token)) = &self.cancel_at {
            if calls == *n {
                token.cancel();
            }
        }
        Ok(match self.script.get(ordinal as usize).copied().flatten() {
            Some(ms) => ProbeOutcome::success(ordinal, target, Duration::from_millis(ms), 32, Some(57)),
            None => ProbeOutcome::failure(ordinal, ProbeStatus::TimedOut),
        })
    }
}

fn session(prober: ScriptedProber) -> Session<StaticLookup, ScriptedProber> {
    Session::new(StaticLookup(vec![TARGET]), prober, SessionSettings::default())
}

fn all_replies() -> Vec<Option<u64>> {
    vec![Some(10), Some(20), Some(30), Some(20), Some(10), Some(30)]
}

fn count_reports(out: &[u8]) -> usize {
    String::from_utf8_lossy(out).matches("Ping statistics for").count()
}

#[tokio::test(start_paused = true)]
async fn test_full_session_output() {
    let mut session = session(ScriptedProber::new(all_replies()));
    let mut out = Vec::new();

    let report = session.run("example.test", &mut out).await.unwrap();

    let SessionReport::Finished { target, end, statistics } = report else {
        panic!("expected a finished session");
    };
    assert_eq!(target, TARGET);
    assert_eq!(end, LoopEnd::Completed);
    assert_eq!(statistics.total_pings, DEFAULT_ATTEMPTS as u64);
    assert_eq!(session.phase(), SessionPhase::Done);

    let expected = "\
Pinging example.test [10.1.2.3] with 32 bytes of data:
Reply from 10.1.2.3: bytes=32 time=10ms TTL=57
Reply from 10.1.2.3: bytes=32 time=20ms TTL=57
Reply from 10.1.2.3: bytes=32 time=30ms TTL=57
Reply from 10.1.2.3: bytes=32 time=20ms TTL=57
Reply from 10.1.2.3: bytes=32 time=10ms TTL=57
Reply from 10.1.2.3: bytes=32 time=30ms TTL=57

Ping statistics for 10.1.2.3:
    Packets: Sent = 6, Received = 6, Lost = 0 (0% loss)

Approximate round trip times in milli-seconds:
    Minimum = 10ms, Maximum = 30ms, Average = 20.00ms
";
    assert_eq!(String::from_utf8(out).unwrap(), expected);
}

#[tokio::test(start_paused = true)]
async fn test_outcomes_in_probe_order() {
    let mut session = session(ScriptedProber::new(vec![Some(1), None, Some(3), None, None, Some(6)]));
    session.run("10.1.2.3", &mut Vec::new()).await.unwrap();

    let ordinals: Vec<u16> = session.outcomes().iter().map(|o| o.ordinal).collect();
    assert_eq!(ordinals, (0..DEFAULT_ATTEMPTS).collect::<Vec<_>>());

    let stats = session.statistics();
    assert_eq!(stats.successful_pings, 3);
    assert_eq!(stats.failed_pings, 3);
    assert_eq!(stats.successful_pings + stats.failed_pings, stats.total_pings);
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_reports_partial_results() {
    let cancel = CancellationToken::new();
    let prober = ScriptedProber::new(all_replies()).cancelling_at(2, cancel.clone());
    let mut session = session(prober).with_cancellation(cancel);
    let mut out = Vec::new();

    let report = session.run("example.test", &mut out).await.unwrap();

    let SessionReport::Finished { end, statistics, .. } = report else {
        panic!("expected a finished session");
    };
    assert_eq!(end, LoopEnd::Interrupted);
    assert_eq!(session.outcomes().len(), 2);
    assert_eq!(statistics.total_pings, 2);
    assert_eq!(statistics.successful_pings, 2);

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Packets: Sent = 2, Received = 2, Lost = 0 (0% loss)"));
    assert!(text.contains("Minimum = 10ms, Maximum = 20ms, Average = 15.00ms"));
}

#[tokio::test(start_paused = true)]
async fn test_statistics_print_once_when_both_paths_fire() {
    // Interrupt lands during the sleep after the final probe, then the
    // completion path tries to report again.
    let cancel = CancellationToken::new();
    let prober = ScriptedProber::new(all_replies()).cancelling_at(DEFAULT_ATTEMPTS as usize, cancel.clone());
    let mut session = session(prober).with_cancellation(cancel);
    let mut out = Vec::new();

    session.run("example.test", &mut out).await.unwrap();
    assert_eq!(session.outcomes().len(), DEFAULT_ATTEMPTS as usize);
    assert!(session.report_latch().is_claimed());

    assert!(!session.report(&mut out).unwrap());
    assert!(!session.report(&mut out).unwrap());
    assert_eq!(count_reports(&out), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_report_attempts_print_once() {
    let mut session = session(ScriptedProber::new(all_replies()));
    let mut out = Vec::new();
    session.run("example.test", &mut out).await.unwrap();

    let latch = session.report_latch();
    let late = std::thread::spawn(move || latch.try_claim());
    assert!(!late.join().unwrap());
    assert_eq!(count_reports(&out), 1);
}

#[tokio::test(start_paused = true)]
async fn test_all_probes_fail() {
    let mut session = session(ScriptedProber::new(vec![None; DEFAULT_ATTEMPTS as usize]));
    let mut out = Vec::new();

    session.run("example.test", &mut out).await.unwrap();

    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().filter(|l| *l == "TimedOut").count(), DEFAULT_ATTEMPTS as usize);
    assert!(text.contains("Packets: Sent = 6, Received = 0, Lost = 6 (100% loss)"));
    assert!(!text.contains("Approximate round trip times"));
    assert_eq!(session.statistics().latency, None);
}

#[tokio::test(start_paused = true)]
async fn test_conventional_loss_formula() {
    let settings = SessionSettings {
        loss_formula: LossFormula::Conventional,
        ..SessionSettings::default()
    };
    let prober = ScriptedProber::new(vec![Some(5), None, Some(5), Some(5), Some(5), Some(5)]);
    let mut session = Session::new(StaticLookup(vec![TARGET]), prober, settings);
    let mut out = Vec::new();

    session.run("example.test", &mut out).await.unwrap();

    // 1 of 6 lost
    assert!(String::from_utf8(out).unwrap().contains("Lost = 1 (17% loss)"));
}

#[tokio::test]
async fn test_blank_host_sends_nothing() {
    let mut session = session(ScriptedProber::new(all_replies()));
    let mut out = Vec::new();

    let report = session.run("   ", &mut out).await.unwrap();

    assert_eq!(report, SessionReport::Unresolved(ResolveError::NoInputProvided));
    assert_eq!(session.phase(), SessionPhase::Done);
    assert!(session.outcomes().is_empty());
    assert!(out.is_empty());
    assert!(!session.report(&mut out).unwrap());
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_oversized_host_sends_nothing() {
    let mut session = session(ScriptedProber::new(all_replies()));
    let host = format!("{}.example", "a".repeat(MAX_HOST_LEN));

    let report = session.run(&host, &mut Vec::new()).await.unwrap();

    assert!(matches!(report, SessionReport::Unresolved(ResolveError::InputTooLong { .. })));
    assert!(session.outcomes().is_empty());
}

#[tokio::test]
async fn test_unresolvable_host() {
    let mut session = Session::new(
        StaticLookup(vec![]),
        ScriptedProber::new(all_replies()),
        SessionSettings::default(),
    );
    let report = session.run("nowhere.test", &mut Vec::new()).await.unwrap();
    assert!(matches!(report, SessionReport::Unresolved(ResolveError::NameResolution(_))));
    assert_eq!(session.target(), None);
}

#[tokio::test]
async fn test_cancelled_before_resolution() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut session = session(ScriptedProber::new(all_replies())).with_cancellation(cancel);
    let mut out = Vec::new();

    let report = session.run("example.test", &mut out).await.unwrap();

    assert_eq!(report, SessionReport::Cancelled);
    assert_eq!(session.phase(), SessionPhase::Done);
    assert!(out.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_session_runs_only_once() {
    let mut session = session(ScriptedProber::new(all_replies()));
    session.run("example.test", &mut Vec::new()).await.unwrap();

    let again = session.run("example.test", &mut Vec::new()).await;
    assert!(matches!(again, Err(SessionError::AlreadyStarted)));
    assert_eq!(session.outcomes().len(), DEFAULT_ATTEMPTS as usize);
}

/// Answers the first `answered` probes at once, then never answers again.
struct StallingProber {
    answered: u16,
}

impl Prober for StallingProber {
    async fn probe(&self, target: IpAddr, ordinal: u16, _timeout: Duration) -> Result<ProbeOutcome, ProbeError> {
        if ordinal >= self.answered {
            std::future::pending::<()>().await;
        }
        Ok(ProbeOutcome::success(ordinal, target, Duration::from_millis(12), 32, Some(57)))
    }
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_while_probe_in_flight() {
    let cancel = CancellationToken::new();
    let prober = StallingProber { answered: 2 };
    let mut session = Session::new(StaticLookup(vec![TARGET]), prober, SessionSettings::default())
        .with_cancellation(cancel.clone());

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        trigger.cancel();
    });

    let mut out = Vec::new();
    let report = session.run("example.test", &mut out).await.unwrap();

    let SessionReport::Finished { end, statistics, .. } = report else {
        panic!("expected a finished session");
    };
    assert_eq!(end, LoopEnd::Interrupted);
    // the third probe was sent but never answered, so it is not recorded
    assert_eq!(session.outcomes().iter().map(|o| o.ordinal).collect::<Vec<_>>(), vec![0, 1]);
    assert_eq!(statistics.total_pings, 2);

    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().filter(|l| l.starts_with("Reply from")).count(), 2);
    assert!(text.contains("Packets: Sent = 2, Received = 2, Lost = 0 (0% loss)"));

    assert!(!session.report(&mut Vec::new()).unwrap());
    assert_eq!(count_reports(text.as_bytes()), 1);
}
