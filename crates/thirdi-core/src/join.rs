//! Network-join workflow.
//!
//! Joining the device to a WiFi network (or reverting it to access-point
//! mode) is the one operation where the transport is *expected* to fail
//! mid-flight: the device tears down the network the page is talking over,
//! associates elsewhere, and only then becomes reachable again. The
//! [`JoinController`] drives that as an explicit state machine:
//!
//! ```text
//! Idle → Submitting → AwaitingSelfNetworkDown → AwaitingTargetNetworkUp → Settled
//! ```
//!
//! Phase transitions are detected by polling the portal status endpoint at
//! a fixed interval: the self network is judged down when a poll first
//! fails, and the target network up when a poll first succeeds again. The
//! reported status then classifies the attempt — a device still in portal
//! mode after "reconnecting" means the join did not take (wrong password
//! or unreachable target).
//!
//! At most one attempt is ever active: starting a new one cancels the
//! previous attempt's polling outright, so no stray settle fires from an
//! abandoned attempt.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use thirdi_api::types::{Network, Portal};

use crate::backend::DeviceBackend;
use crate::error::CoreError;

const EVENT_CHANNEL_CAPACITY: usize = 64;

// ── Configuration ────────────────────────────────────────────────────

/// Tuning knobs for the join workflow.
#[derive(Debug, Clone)]
pub struct JoinConfig {
    /// Interval between portal status polls while awaiting a transition.
    pub poll_interval: Duration,

    /// Delay before re-issuing a scan that came back empty (the scan
    /// hardware needs a warm-up period after boot).
    pub scan_retry_delay: Duration,

    /// Overall deadline for the two awaiting phases combined. `None`
    /// polls forever, which risks a stuck attempt if the device never
    /// comes back; the default is bounded.
    pub settle_timeout: Option<Duration>,

    /// Settle delay used when the backend reports instant transitions
    /// (local development: nothing to tear down, nothing to poll).
    pub simulated_settle_delay: Duration,

    /// Collapse repeated essids in scan results. Off by default: every
    /// access point the device saw is shown, duplicates included.
    pub dedup_scan_results: bool,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            scan_retry_delay: Duration::from_millis(1000),
            settle_timeout: Some(Duration::from_secs(120)),
            simulated_settle_delay: Duration::from_millis(500),
            dedup_scan_results: false,
        }
    }
}

// ── State machine vocabulary ─────────────────────────────────────────

/// What one attempt is trying to reach.
#[derive(Debug, Clone)]
pub enum JoinTarget {
    /// Join an existing network, scanned or hidden.
    Network {
        essid: String,
        password: Option<SecretString>,
    },
    /// Revert to the device's own access point.
    Hotspot,
}

impl JoinTarget {
    /// The essid an outcome reports: the target network's name, or the
    /// empty string for hotspot mode.
    fn reported_essid(&self) -> &str {
        match self {
            Self::Network { essid, .. } => essid,
            Self::Hotspot => "",
        }
    }
}

/// Phase of the active attempt, observable through a watch channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinPhase {
    Idle,
    Submitting,
    AwaitingSelfNetworkDown,
    AwaitingTargetNetworkUp,
    Settled(JoinOutcome),
}

impl JoinPhase {
    /// `true` while an attempt is running (submitted but not settled).
    pub fn in_progress(&self) -> bool {
        matches!(
            self,
            Self::Submitting | Self::AwaitingSelfNetworkDown | Self::AwaitingTargetNetworkUp
        )
    }
}

/// Terminal result of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The device reports it is where the attempt wanted it. `essid` is
    /// the joined network's name, empty for hotspot mode.
    Success { essid: String },
    /// The device reappeared in the wrong state, or never reappeared
    /// within the settle deadline.
    Failure { essid: String, timed_out: bool },
}

/// Notifications surfaced to the shell / UI.
#[derive(Debug, Clone)]
pub enum JoinEvent {
    /// An attempt reached a terminal state.
    Settled(JoinOutcome),
    /// The device rejected the command outright (or errored) during
    /// Submitting. The attempt is abandoned and the controller is Idle.
    SubmitFailed { essid: String },
}

// ── Controller ───────────────────────────────────────────────────────

/// Orchestrates network joins and scans. Cheaply cloneable.
#[derive(Clone)]
pub struct JoinController {
    inner: Arc<JoinInner>,
}

struct JoinInner {
    backend: Arc<dyn DeviceBackend>,
    config: JoinConfig,
    phase_tx: watch::Sender<JoinPhase>,
    event_tx: broadcast::Sender<JoinEvent>,
    networks_tx: watch::Sender<Arc<Vec<Network>>>,
    /// Root token; cancelling it stops everything the controller spawned.
    cancel: CancellationToken,
    /// Child token for the current attempt — replaced (and the old one
    /// cancelled) whenever a new attempt starts.
    attempt_cancel: Mutex<CancellationToken>,
    /// Child token for the pending empty-scan auto-retry, if any.
    rescan_cancel: Mutex<CancellationToken>,
}

impl JoinController {
    pub fn new(backend: Arc<dyn DeviceBackend>, config: JoinConfig) -> Self {
        let (phase_tx, _) = watch::channel(JoinPhase::Idle);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (networks_tx, _) = watch::channel(Arc::new(Vec::new()));
        let cancel = CancellationToken::new();
        let attempt_cancel = Mutex::new(cancel.child_token());
        let rescan_cancel = Mutex::new(cancel.child_token());

        Self {
            inner: Arc::new(JoinInner {
                backend,
                config,
                phase_tx,
                event_tx,
                networks_tx,
                cancel,
                attempt_cancel,
                rescan_cancel,
            }),
        }
    }

    /// Watch the active attempt's phase.
    pub fn phase(&self) -> watch::Receiver<JoinPhase> {
        self.inner.phase_tx.subscribe()
    }

    /// Subscribe to settle/failure notifications.
    pub fn events(&self) -> broadcast::Receiver<JoinEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Watch the latest scan snapshot. A new scan replaces the whole set.
    pub fn networks(&self) -> watch::Receiver<Arc<Vec<Network>>> {
        self.inner.networks_tx.subscribe()
    }

    /// Stop all polling, attempts, and pending rescans.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }

    // ── Scanning ─────────────────────────────────────────────────────

    /// Trigger a fresh network enumeration.
    ///
    /// An empty result re-issues the scan after a fixed delay as long as
    /// no join is in progress — the scan hardware reports nothing for a
    /// short warm-up period after boot. The auto-retry stops the instant
    /// an attempt begins.
    pub async fn scan(&self) -> Result<(), CoreError> {
        self.inner.cancel_pending_rescan().await;
        self.inner.scan_once().await
    }

    // ── Joining ──────────────────────────────────────────────────────

    /// Join a scanned network. Cancels any previous attempt.
    pub async fn join(&self, essid: &str, password: Option<SecretString>) {
        self.start_attempt(JoinTarget::Network {
            essid: essid.to_owned(),
            password,
        })
        .await;
    }

    /// Join a network that did not come from a scan result. Identical
    /// pipeline; only the provenance of the essid differs.
    pub async fn join_hidden(&self, essid: &str, password: Option<SecretString>) {
        self.join(essid, password).await;
    }

    /// Revert the device to hosting its own access point.
    pub async fn start_hotspot(&self) {
        self.start_attempt(JoinTarget::Hotspot).await;
    }

    async fn start_attempt(&self, target: JoinTarget) {
        // Stop whatever a previous attempt is still polling, and any
        // pending auto-rescan: scan results must not race a network that
        // is about to disappear.
        self.inner.cancel_pending_rescan().await;

        let attempt = {
            let mut guard = self.inner.attempt_cancel.lock().await;
            guard.cancel();
            let fresh = self.inner.cancel.child_token();
            *guard = fresh.clone();
            fresh
        };

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            run_attempt(inner, target, attempt).await;
        });
    }
}

impl JoinInner {
    fn set_phase(&self, phase: JoinPhase) {
        let _ = self.phase_tx.send(phase);
    }

    fn join_in_progress(&self) -> bool {
        self.phase_tx.borrow().in_progress()
    }

    async fn cancel_pending_rescan(&self) {
        let mut guard = self.rescan_cancel.lock().await;
        guard.cancel();
        *guard = self.cancel.child_token();
    }

    /// One scan round: fetch, publish, and schedule the auto-retry when
    /// the result was empty and nothing else is going on.
    async fn scan_once(self: &Arc<Self>) -> Result<(), CoreError> {
        let mut networks = self.backend.list_networks().await?;
        if self.config.dedup_scan_results {
            let mut seen = std::collections::HashSet::new();
            networks.retain(|n| seen.insert(n.essid.clone()));
        }

        let empty = networks.is_empty();
        debug!(count = networks.len(), "network scan complete");
        let _ = self.networks_tx.send(Arc::new(networks));

        if empty && !self.join_in_progress() {
            self.schedule_rescan().await;
        }
        Ok(())
    }

    // Returns a boxed future rather than being an `async fn`: the
    // recursion (`scan_once` → `schedule_rescan` → spawned `scan_once`)
    // otherwise keeps the compiler from resolving `Send` for the
    // spawned task.
    fn schedule_rescan(
        self: &Arc<Self>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + '_>> {
        Box::pin(self.schedule_rescan_inner())
    }

    async fn schedule_rescan_inner(self: &Arc<Self>) {
        let token = {
            let mut guard = self.rescan_cancel.lock().await;
            guard.cancel();
            let fresh = self.cancel.child_token();
            *guard = fresh.clone();
            fresh
        };

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => return,
                () = tokio::time::sleep(inner.config.scan_retry_delay) => {}
            }
            if token.is_cancelled() || inner.join_in_progress() {
                return;
            }
            if let Err(e) = inner.scan_once().await {
                debug!(error = %e, "auto-rescan failed");
            }
        });
    }

    /// Kick off a scan in the background (used after a failed attempt to
    /// restore the network list).
    fn spawn_rescan(self: &Arc<Self>) {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            inner.cancel_pending_rescan().await;
            if let Err(e) = inner.scan_once().await {
                debug!(error = %e, "post-failure rescan failed");
            }
        });
    }
}

// ── Attempt execution ────────────────────────────────────────────────

/// Drive one attempt from Submitting to Settled (or abandonment).
///
/// Every step checks the attempt token: a cancelled attempt stops
/// silently, publishing neither phases nor events.
async fn run_attempt(inner: Arc<JoinInner>, target: JoinTarget, cancel: CancellationToken) {
    inner.set_phase(JoinPhase::Submitting);

    let submit = match &target {
        JoinTarget::Network { essid, password } => {
            info!(essid = %essid, "submitting network join");
            inner.backend.connect_network(essid, password.as_ref()).await
        }
        JoinTarget::Hotspot => {
            info!("submitting access-point start");
            inner.backend.start_access_point().await
        }
    };

    if cancel.is_cancelled() {
        return;
    }

    if let Err(e) = submit {
        // Outright rejection: abandon immediately, restore the list.
        warn!(error = %e, "device rejected the join command");
        let _ = inner.event_tx.send(JoinEvent::SubmitFailed {
            essid: target.reported_essid().to_owned(),
        });
        inner.set_phase(JoinPhase::Idle);
        inner.spawn_rescan();
        return;
    }

    let outcome = if inner.backend.instant_transition() {
        // Local development: nothing tears down, so there is no
        // transition to detect. Settle after a fixed delay against the
        // backend's reported state.
        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(inner.config.simulated_settle_delay) => {}
        }
        match inner.backend.portal().await {
            Ok(portal) => classify(&target, &portal),
            Err(_) => JoinOutcome::Failure {
                essid: target.reported_essid().to_owned(),
                timed_out: false,
            },
        }
    } else {
        match await_transition(&inner, &target, &cancel).await {
            Some(outcome) => outcome,
            None => return, // cancelled
        }
    };

    if cancel.is_cancelled() {
        return;
    }

    info!(outcome = ?outcome, "join attempt settled");
    let failed = matches!(outcome, JoinOutcome::Failure { .. });
    inner.set_phase(JoinPhase::Settled(outcome.clone()));
    let _ = inner.event_tx.send(JoinEvent::Settled(outcome));
    if failed {
        // Restore the list so the user can retry immediately.
        inner.spawn_rescan();
    }
}

/// The two polling phases. Returns `None` when cancelled mid-flight.
async fn await_transition(
    inner: &Arc<JoinInner>,
    target: &JoinTarget,
    cancel: &CancellationToken,
) -> Option<JoinOutcome> {
    let deadline = inner.config.settle_timeout.map(|t| Instant::now() + t);
    let timeout_outcome = || JoinOutcome::Failure {
        essid: target.reported_essid().to_owned(),
        timed_out: true,
    };

    // Phase 1: the device's current network goes away. A failing status
    // poll is the signal — the requester can no longer reach the device.
    inner.set_phase(JoinPhase::AwaitingSelfNetworkDown);
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return None,
            () = tokio::time::sleep(inner.config.poll_interval) => {}
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Some(timeout_outcome());
        }

        match inner.backend.portal().await {
            Err(e) => {
                debug!(error = %e, "status poll failed; self network is down");
                break;
            }
            Ok(portal) => {
                // The device can transition without the page ever losing
                // it (fast association, or the command was a no-op). A
                // poll that already reflects the target state settles the
                // attempt right here.
                if reflects_target(target, &portal) {
                    return Some(classify(target, &portal));
                }
                debug!("device still reachable, waiting for teardown");
            }
        }
        if cancel.is_cancelled() {
            return None;
        }
    }

    // A failing poll can belong to an attempt that was superseded while
    // the poll was in flight. Bail before touching the shared phase, or
    // the stale attempt would publish over its replacement.
    if cancel.is_cancelled() {
        return None;
    }

    // Phase 2: the device reappears — on the target network if the join
    // worked, back on its own access point if it did not. Poll failures
    // here are the expected transient state, not errors.
    inner.set_phase(JoinPhase::AwaitingTargetNetworkUp);
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return None,
            () = tokio::time::sleep(inner.config.poll_interval) => {}
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Some(timeout_outcome());
        }

        match inner.backend.portal().await {
            Ok(portal) => return Some(classify(target, &portal)),
            Err(e) => debug!(error = %e, "device not reachable yet"),
        }
        if cancel.is_cancelled() {
            return None;
        }
    }
}

/// Judge a settled attempt from the device's reported state.
///
/// A device still in portal mode after a network join means the join
/// failed (wrong password or target unreachable): the device fell back to
/// its own access point.
fn classify(target: &JoinTarget, portal: &Portal) -> JoinOutcome {
    match target {
        JoinTarget::Network { essid, .. } => {
            if portal.portal {
                JoinOutcome::Failure {
                    essid: essid.clone(),
                    timed_out: false,
                }
            } else {
                JoinOutcome::Success {
                    essid: portal.essid.clone().unwrap_or_else(|| essid.clone()),
                }
            }
        }
        JoinTarget::Hotspot => {
            if portal.portal {
                JoinOutcome::Success {
                    essid: String::new(),
                }
            } else {
                JoinOutcome::Failure {
                    essid: String::new(),
                    timed_out: false,
                }
            }
        }
    }
}

/// `true` when the reported state already matches what the attempt is
/// driving toward.
fn reflects_target(target: &JoinTarget, portal: &Portal) -> bool {
    match target {
        JoinTarget::Network { essid, .. } => {
            !portal.portal && portal.essid.as_deref() == Some(essid)
        }
        JoinTarget::Hotspot => portal.portal,
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn network_target(essid: &str) -> JoinTarget {
        JoinTarget::Network {
            essid: essid.to_owned(),
            password: None,
        }
    }

    fn portal(in_portal: bool, essid: Option<&str>) -> Portal {
        Portal {
            portal: in_portal,
            essid: essid.map(str::to_owned),
            serial: "01111".to_owned(),
        }
    }

    #[test]
    fn reconnected_on_target_classifies_success() {
        let outcome = classify(&network_target("eCafe"), &portal(false, Some("eCafe")));
        assert_eq!(
            outcome,
            JoinOutcome::Success {
                essid: "eCafe".to_owned()
            }
        );
    }

    #[test]
    fn still_in_portal_mode_classifies_failure() {
        let outcome = classify(&network_target("MYHOME"), &portal(true, None));
        assert_eq!(
            outcome,
            JoinOutcome::Failure {
                essid: "MYHOME".to_owned(),
                timed_out: false
            }
        );
    }

    #[test]
    fn hotspot_classification_is_inverted() {
        assert_eq!(
            classify(&JoinTarget::Hotspot, &portal(true, None)),
            JoinOutcome::Success {
                essid: String::new()
            }
        );
        assert_eq!(
            classify(&JoinTarget::Hotspot, &portal(false, Some("MYHOME"))),
            JoinOutcome::Failure {
                essid: String::new(),
                timed_out: false
            }
        );
    }

    #[test]
    fn target_reflection_short_circuit() {
        assert!(reflects_target(
            &network_target("eCafe"),
            &portal(false, Some("eCafe"))
        ));
        assert!(!reflects_target(
            &network_target("eCafe"),
            &portal(false, Some("MYHOME"))
        ));
        assert!(!reflects_target(&network_target("eCafe"), &portal(true, None)));
        assert!(reflects_target(&JoinTarget::Hotspot, &portal(true, None)));
    }

    #[test]
    fn phase_progress_predicate() {
        assert!(!JoinPhase::Idle.in_progress());
        assert!(JoinPhase::Submitting.in_progress());
        assert!(JoinPhase::AwaitingSelfNetworkDown.in_progress());
        assert!(JoinPhase::AwaitingTargetNetworkUp.in_progress());
        assert!(
            !JoinPhase::Settled(JoinOutcome::Success {
                essid: "eCafe".to_owned()
            })
            .in_progress()
        );
    }
}
