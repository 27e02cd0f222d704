//! Connection-state controller.
//!
//! Owns the simulated connection lifecycle, the one-second metrics ticker and
//! the fabricated live metrics (speeds, elapsed time, data used). It performs
//! no I/O: `begin_*` methods validate and transition into a transitional
//! state and hand back a plan describing the request to make; the matching
//! `complete_*` method feeds the request's outcome back in.
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Disconnecting -> Disconnected
//!                     |                           |
//!                     +--(failure)-> Disconnected  +--(failure)-> Connected
//! ```

use std::fmt;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use chrono::Utc;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::constants::{
    DATA_DELTA_KIB, DOWNLOAD_CLAMP, DOWNLOAD_JITTER, DOWNLOAD_SEED_RANGE, METRICS_TICK_PERIOD,
    SPEED_PERTURB_PROBABILITY, UPLOAD_CLAMP, UPLOAD_JITTER, UPLOAD_SEED_RANGE,
};
use crate::model::{ConnectionHistory, Server, ServerStatus};

/// Client-visible connection status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Disconnected => "disconnected",
            Status::Connecting => "connecting",
            Status::Connected => "connected",
            Status::Disconnecting => "disconnecting",
        })
    }
}

/// Simulated throughput in Mbps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Speeds {
    pub download_mbps: u32,
    pub upload_mbps: u32,
}

/// Periodic timer driven by the caller's clock.
///
/// Owned by [`ConnectionState::Connected`]; leaving that state drops it,
/// which is how the tick is cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticker {
    period: Duration,
    next_due: Instant,
}

impl Ticker {
    /// Starts a ticker whose first tick is due one period after `now`.
    pub fn start(now: Instant, period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        Self {
            period,
            next_due: now + period,
        }
    }

    /// Number of ticks that have come due by `now`, advancing the schedule.
    pub fn due(&mut self, now: Instant) -> u32 {
        let mut fired = 0;
        while now >= self.next_due {
            fired += 1;
            self.next_due += self.period;
        }
        fired
    }
}

/// Connection state machine.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum ConnectionState {
    /// No active session.
    #[default]
    Disconnected,
    /// Simulated handshake in progress.
    Connecting { server_id: i64, started: Instant },
    /// Session open; the ticker drives live metrics.
    Connected {
        server_id: i64,
        connection_id: i64,
        since: Instant,
        speeds: Speeds,
        ticker: Ticker,
    },
    /// Teardown in progress; metrics are frozen.
    Disconnecting {
        server_id: i64,
        connection_id: i64,
        since: Instant,
        speeds: Speeds,
    },
}

impl ConnectionState {
    pub fn status(&self) -> Status {
        match self {
            ConnectionState::Disconnected => Status::Disconnected,
            ConnectionState::Connecting { .. } => Status::Connecting,
            ConnectionState::Connected { .. } => Status::Connected,
            ConnectionState::Disconnecting { .. } => Status::Disconnecting,
        }
    }
}

/// Severity of a [`Notice`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

/// User-facing notification produced by a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notice {
    fn info(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            severity: Severity::Info,
        }
    }

    fn error(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            severity: Severity::Error,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}

/// Rejected controller operations. Nothing changes when one is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ControllerError {
    #[error("Please disconnect first before changing servers")]
    DisconnectFirst,

    #[error("No server selected")]
    NoServerSelected,

    #[error("Cannot connect while {0}")]
    NotDisconnected(Status),

    #[error("Cannot disconnect while {0}")]
    NotConnected(Status),
}

impl ControllerError {
    /// Notification shown for the rejection.
    pub fn notice(&self) -> Notice {
        let title = match self {
            ControllerError::DisconnectFirst => "Cannot change server",
            ControllerError::NoServerSelected | ControllerError::NotDisconnected(_) => {
                "Cannot connect"
            }
            ControllerError::NotConnected(_) => "Cannot disconnect",
        };
        Notice::error(title, self.to_string())
    }
}

/// Timing knobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControllerSettings {
    pub connect_delay: Duration,
    pub disconnect_delay: Duration,
    pub tick_period: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            connect_delay: Duration::from_millis(crate::constants::DEFAULT_CONNECT_DELAY_MS),
            disconnect_delay: Duration::from_millis(crate::constants::DEFAULT_DISCONNECT_DELAY_MS),
            tick_period: METRICS_TICK_PERIOD,
        }
    }
}

/// Request to open a history row after `delay`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectPlan {
    pub server_id: i64,
    pub ip_address: Ipv4Addr,
    pub delay: Duration,
}

/// Request to close a history row after `delay`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisconnectPlan {
    pub connection_id: i64,
    pub data_used: i64,
    pub delay: Duration,
}

/// The connection-state controller.
pub struct Controller<R = StdRng> {
    state: ConnectionState,
    selected: Option<Server>,
    ip_address: Option<Ipv4Addr>,
    elapsed_secs: u64,
    data_used: u64,
    settings: ControllerSettings,
    rng: R,
}

impl Controller<StdRng> {
    pub fn new(settings: ControllerSettings) -> Self {
        Self::with_rng(settings, StdRng::from_entropy())
    }
}

impl<R: Rng> Controller<R> {
    /// Creates a controller drawing randomness from `rng`.
    pub fn with_rng(settings: ControllerSettings, rng: R) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            selected: None,
            ip_address: None,
            elapsed_secs: 0,
            data_used: 0,
            settings,
            rng,
        }
    }

    pub fn status(&self) -> Status {
        self.state.status()
    }

    pub fn selected_server(&self) -> Option<&Server> {
        self.selected.as_ref()
    }

    pub fn ip_address(&self) -> Option<Ipv4Addr> {
        self.ip_address
    }

    /// Seconds counted by the ticker in the current session.
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    /// Bytes accumulated in the current session.
    pub fn data_used(&self) -> u64 {
        self.data_used
    }

    /// Current speeds; `None` unless a session is open.
    pub fn speeds(&self) -> Option<Speeds> {
        match &self.state {
            ConnectionState::Connected { speeds, .. }
            | ConnectionState::Disconnecting { speeds, .. } => Some(*speeds),
            _ => None,
        }
    }

    /// Id of the open history row, if any.
    pub fn current_connection_id(&self) -> Option<i64> {
        match &self.state {
            ConnectionState::Connected { connection_id, .. }
            | ConnectionState::Disconnecting { connection_id, .. } => Some(*connection_id),
            _ => None,
        }
    }

    /// Server the session is attached to, including while in transition.
    pub fn active_server_id(&self) -> Option<i64> {
        match &self.state {
            ConnectionState::Disconnected => None,
            ConnectionState::Connecting { server_id, .. }
            | ConnectionState::Connected { server_id, .. }
            | ConnectionState::Disconnecting { server_id, .. } => Some(*server_id),
        }
    }

    /// Selects `server`. Only allowed while disconnected.
    ///
    /// # Errors
    ///
    /// [`ControllerError::DisconnectFirst`] in any other state; the selection
    /// is left untouched.
    pub fn select_server(&mut self, server: Server) -> Result<Notice, ControllerError> {
        if self.status() != Status::Disconnected {
            debug!(status = %self.status(), "server selection rejected");
            return Err(ControllerError::DisconnectFirst);
        }
        let notice = Notice::info("Server selected", format!("Selected {}", server.label()));
        self.selected = Some(server);
        Ok(notice)
    }

    /// Applies a fresh catalog: refreshes the selected entry and, when
    /// nothing is selected yet, picks the session's server or else the first
    /// available one.
    pub fn on_servers_loaded(&mut self, servers: &[Server]) {
        if let Some(selected) = &self.selected {
            if let Some(fresh) = servers.iter().find(|s| s.id == selected.id) {
                self.selected = Some(fresh.clone());
            }
            return;
        }
        if let Some(active) = self.active_server_id() {
            self.selected = servers.iter().find(|s| s.id == active).cloned();
            return;
        }
        if let Some(first) = servers.iter().find(|s| s.status == ServerStatus::Available) {
            debug!(server_id = first.id, "default server selected");
            self.selected = Some(first.clone());
        }
    }

    /// Starts connecting to `server_id`.
    ///
    /// Generates the session's IP address and moves to `Connecting`. The
    /// caller waits `plan.delay`, performs the request and reports back
    /// through [`Controller::complete_connect`].
    ///
    /// # Errors
    ///
    /// Rejected unless disconnected with a server selected.
    pub fn begin_connect(
        &mut self,
        server_id: i64,
        now: Instant,
    ) -> Result<ConnectPlan, ControllerError> {
        if self.status() != Status::Disconnected {
            return Err(ControllerError::NotDisconnected(self.status()));
        }
        if self.selected.is_none() {
            return Err(ControllerError::NoServerSelected);
        }

        let ip = Ipv4Addr::new(192, 168, self.rng.gen_range(0..255), self.rng.gen_range(0..255));
        self.ip_address = Some(ip);
        self.state = ConnectionState::Connecting {
            server_id,
            started: now,
        };
        info!(server_id, %ip, "connecting");

        Ok(ConnectPlan {
            server_id,
            ip_address: ip,
            delay: self.settings.connect_delay,
        })
    }

    /// Completes a connect started by [`Controller::begin_connect`].
    ///
    /// Returns `None` when no connect is in flight (stale completion).
    pub fn complete_connect<E: fmt::Display>(
        &mut self,
        outcome: Result<ConnectionHistory, E>,
        now: Instant,
    ) -> Option<Notice> {
        let ConnectionState::Connecting { server_id, started } = self.state else {
            warn!("connect completion ignored in state {}", self.status());
            return None;
        };
        let handshake_ms =
            u64::try_from(now.saturating_duration_since(started).as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(row) => {
                let speeds = self.seed_speeds();
                self.elapsed_secs = 0;
                self.data_used = 0;
                self.state = ConnectionState::Connected {
                    server_id,
                    connection_id: row.id,
                    since: now,
                    speeds,
                    ticker: Ticker::start(now, self.settings.tick_period),
                };
                info!(server_id, connection_id = row.id, handshake_ms, "connected");

                let target = self
                    .selected
                    .as_ref()
                    .map_or_else(|| format!("server {server_id}"), Server::label);
                Some(Notice::info(
                    "Connected",
                    format!("You are now connected to {target}"),
                ))
            }
            Err(e) => {
                warn!(server_id, handshake_ms, "connect failed: {e}");
                self.reset();
                Some(Notice::error("Connection failed", e.to_string()))
            }
        }
    }

    /// Adopts a history row left open by an earlier run.
    ///
    /// Elapsed time continues from the row's `connectedAt`; data used starts
    /// over. Returns `None` unless disconnected and the row is open.
    pub fn resume(
        &mut self,
        row: &ConnectionHistory,
        server: Option<Server>,
        now: Instant,
    ) -> Option<Notice> {
        if self.status() != Status::Disconnected || !row.is_open() {
            return None;
        }

        let speeds = self.seed_speeds();
        self.ip_address = row.ip_address.parse().ok();
        self.elapsed_secs = u64::try_from(row.duration_until(Utc::now())).unwrap_or(0);
        self.data_used = 0;
        if let Some(server) = server {
            self.selected = Some(server);
        }
        self.state = ConnectionState::Connected {
            server_id: row.server_id,
            connection_id: row.id,
            since: now,
            speeds,
            ticker: Ticker::start(now, self.settings.tick_period),
        };
        info!(
            server_id = row.server_id,
            connection_id = row.id,
            elapsed_secs = self.elapsed_secs,
            "resumed open session"
        );

        let target = self
            .selected
            .as_ref()
            .filter(|s| s.id == row.server_id)
            .map_or_else(|| format!("server {}", row.server_id), Server::label);
        Some(Notice::info(
            "Session resumed",
            format!("Still connected to {target}"),
        ))
    }

    /// Starts disconnecting the open session.
    ///
    /// Leaving `Connected` drops the ticker, so metrics freeze until the
    /// outcome arrives.
    ///
    /// # Errors
    ///
    /// Rejected unless connected.
    pub fn begin_disconnect(&mut self) -> Result<DisconnectPlan, ControllerError> {
        let ConnectionState::Connected {
            server_id,
            connection_id,
            since,
            speeds,
            ..
        } = self.state
        else {
            return Err(ControllerError::NotConnected(self.status()));
        };

        self.state = ConnectionState::Disconnecting {
            server_id,
            connection_id,
            since,
            speeds,
        };
        info!(connection_id, "disconnecting");

        Ok(DisconnectPlan {
            connection_id,
            data_used: i64::try_from(self.data_used).unwrap_or(i64::MAX),
            delay: self.settings.disconnect_delay,
        })
    }

    /// Completes a disconnect started by [`Controller::begin_disconnect`].
    ///
    /// On failure the session goes back to `Connected` with a fresh ticker
    /// and its counters intact. Returns `None` for stale completions.
    pub fn complete_disconnect<E: fmt::Display>(
        &mut self,
        outcome: Result<ConnectionHistory, E>,
        now: Instant,
    ) -> Option<Notice> {
        let ConnectionState::Disconnecting {
            server_id,
            connection_id,
            since,
            speeds,
        } = self.state
        else {
            warn!("disconnect completion ignored in state {}", self.status());
            return None;
        };

        match outcome {
            Ok(_) => {
                info!(connection_id, "disconnected");
                self.reset();
                Some(Notice::info(
                    "Disconnected",
                    "VPN connection has been terminated",
                ))
            }
            Err(e) => {
                warn!(connection_id, "disconnect failed: {e}");
                self.state = ConnectionState::Connected {
                    server_id,
                    connection_id,
                    since,
                    speeds,
                    ticker: Ticker::start(now, self.settings.tick_period),
                };
                Some(Notice::error("Disconnect failed", e.to_string()))
            }
        }
    }

    /// Runs every metrics tick that has come due by `now`.
    ///
    /// Returns the number of ticks applied.
    pub fn poll(&mut self, now: Instant) -> u32 {
        let due = match &mut self.state {
            ConnectionState::Connected { ticker, .. } => ticker.due(now),
            _ => 0,
        };
        for _ in 0..due {
            self.tick();
        }
        due
    }

    /// One metrics tick: +1 s elapsed, a random data delta and, sometimes,
    /// a clamped speed wobble. No-op unless connected.
    pub fn tick(&mut self) {
        let ConnectionState::Connected { speeds, .. } = &mut self.state else {
            return;
        };

        self.elapsed_secs += 1;
        self.data_used += self.rng.gen_range(DATA_DELTA_KIB.0..DATA_DELTA_KIB.1) * 1024;

        if self.rng.gen_bool(SPEED_PERTURB_PROBABILITY) {
            speeds.download_mbps =
                wobble(speeds.download_mbps, DOWNLOAD_JITTER, DOWNLOAD_CLAMP, &mut self.rng);
            speeds.upload_mbps =
                wobble(speeds.upload_mbps, UPLOAD_JITTER, UPLOAD_CLAMP, &mut self.rng);
        }
    }

    fn seed_speeds(&mut self) -> Speeds {
        Speeds {
            download_mbps: self.rng.gen_range(DOWNLOAD_SEED_RANGE.0..DOWNLOAD_SEED_RANGE.1),
            upload_mbps: self.rng.gen_range(UPLOAD_SEED_RANGE.0..UPLOAD_SEED_RANGE.1),
        }
    }

    fn reset(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.ip_address = None;
        self.elapsed_secs = 0;
        self.data_used = 0;
    }
}

/// Adds a random step from `jitter` to `value` and clamps into `clamp`.
fn wobble<R: Rng>(value: u32, jitter: (i64, i64), clamp: (u32, u32), rng: &mut R) -> u32 {
    let next = i64::from(value) + rng.gen_range(jitter.0..jitter.1);
    let clamped = next.clamp(i64::from(clamp.0), i64::from(clamp.1));
    u32::try_from(clamped).unwrap_or(clamp.1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sample_server;

    type TestController = Controller<StdRng>;

    fn controller(seed: u64) -> TestController {
        Controller::with_rng(ControllerSettings::default(), StdRng::seed_from_u64(seed))
    }

    fn row(id: i64, server_id: i64) -> ConnectionHistory {
        ConnectionHistory {
            id,
            user_id: 1,
            server_id,
            ip_address: "192.168.0.1".to_string(),
            connected_at: Utc::now(),
            disconnected_at: None,
            duration: None,
            data_used: None,
        }
    }

    fn ok(id: i64) -> Result<ConnectionHistory, String> {
        Ok(row(id, 1))
    }

    fn failed() -> Result<ConnectionHistory, String> {
        Err("HTTP 500".to_string())
    }

    fn connected(seed: u64) -> (TestController, Instant) {
        let mut c = controller(seed);
        c.select_server(sample_server(1, 20, 20, ServerStatus::Available))
            .unwrap();
        let t0 = Instant::now();
        c.begin_connect(1, t0).unwrap();
        c.complete_connect(ok(10), t0).unwrap();
        (c, t0)
    }

    #[test]
    fn test_starts_disconnected_with_zeroed_metrics() {
        let c = controller(1);
        assert_eq!(c.status(), Status::Disconnected);
        assert_eq!(c.elapsed_secs(), 0);
        assert_eq!(c.data_used(), 0);
        assert!(c.speeds().is_none());
        assert!(c.ip_address().is_none());
        assert!(c.current_connection_id().is_none());
    }

    #[test]
    fn test_connect_requires_selected_server() {
        let mut c = controller(1);
        assert_eq!(
            c.begin_connect(1, Instant::now()),
            Err(ControllerError::NoServerSelected)
        );
        assert_eq!(c.status(), Status::Disconnected);
    }

    #[test]
    fn test_begin_connect_fabricates_private_ip() {
        for seed in 0..50 {
            let mut c = controller(seed);
            c.select_server(sample_server(1, 1, 1, ServerStatus::Available))
                .unwrap();
            let plan = c.begin_connect(1, Instant::now()).unwrap();
            let octets = plan.ip_address.octets();
            assert_eq!(&octets[..2], &[192, 168]);
            assert!(octets[2] < 255 && octets[3] < 255);
            assert_eq!(c.ip_address(), Some(plan.ip_address));
            assert_eq!(c.status(), Status::Connecting);
            assert_eq!(plan.delay, Duration::from_secs(2));
        }
    }

    #[test]
    fn test_connect_while_connecting_is_rejected() {
        let mut c = controller(1);
        c.select_server(sample_server(1, 1, 1, ServerStatus::Available))
            .unwrap();
        c.begin_connect(1, Instant::now()).unwrap();
        assert_eq!(
            c.begin_connect(1, Instant::now()),
            Err(ControllerError::NotDisconnected(Status::Connecting))
        );
    }

    #[test]
    fn test_successful_connect_seeds_speeds() {
        for seed in 0..50 {
            let (c, _) = connected(seed);
            assert_eq!(c.status(), Status::Connected);
            assert_eq!(c.current_connection_id(), Some(10));
            let speeds = c.speeds().unwrap();
            assert!((60..100).contains(&speeds.download_mbps));
            assert!((30..50).contains(&speeds.upload_mbps));
            assert_eq!(c.elapsed_secs(), 0);
        }
    }

    #[test]
    fn test_connected_notice_names_server() {
        let mut c = controller(3);
        c.select_server(sample_server(4, 1, 1, ServerStatus::Available))
            .unwrap();
        let now = Instant::now();
        c.begin_connect(4, now).unwrap();
        let notice = c.complete_connect(ok(1), now).unwrap();
        assert_eq!(notice.title, "Connected");
        assert_eq!(notice.description, "You are now connected to Node 4, Testland");
        assert_eq!(notice.severity, Severity::Info);
    }

    #[test]
    fn test_failed_connect_reverts_to_disconnected() {
        let mut c = controller(1);
        c.select_server(sample_server(1, 1, 1, ServerStatus::Available))
            .unwrap();
        let now = Instant::now();
        c.begin_connect(1, now).unwrap();
        let notice = c.complete_connect(failed(), now).unwrap();
        assert_eq!(notice.severity, Severity::Error);
        assert_eq!(notice.title, "Connection failed");
        assert_eq!(c.status(), Status::Disconnected);
        assert!(c.ip_address().is_none());
        assert!(c.current_connection_id().is_none());
    }

    #[test]
    fn test_select_rejected_while_busy() {
        let mut c = controller(1);
        let first = sample_server(1, 1, 1, ServerStatus::Available);
        let other = sample_server(2, 1, 1, ServerStatus::Available);
        c.select_server(first.clone()).unwrap();

        c.begin_connect(1, Instant::now()).unwrap();
        let err = c.select_server(other.clone()).unwrap_err();
        assert_eq!(err.notice().title, "Cannot change server");
        assert_eq!(c.selected_server(), Some(&first));

        c.complete_connect(ok(1), Instant::now());
        assert!(c.select_server(other.clone()).is_err());
        assert_eq!(c.selected_server(), Some(&first));

        c.begin_disconnect().unwrap();
        assert!(c.select_server(other.clone()).is_err());
        assert_eq!(c.selected_server(), Some(&first));

        c.complete_disconnect(ok(1), Instant::now());
        let notice = c.select_server(other.clone()).unwrap();
        assert_eq!(notice.description, "Selected Node 2, Testland");
        assert_eq!(c.selected_server(), Some(&other));
    }

    #[test]
    fn test_tick_increments_elapsed_by_one() {
        let (mut c, _) = connected(7);
        for expected in 1..=30 {
            let before = c.data_used();
            c.tick();
            assert_eq!(c.elapsed_secs(), expected);
            let delta = c.data_used() - before;
            assert!((10 * 1024..50 * 1024).contains(&delta));
            assert_eq!(delta % 1024, 0);
        }
    }

    #[test]
    fn test_tick_is_noop_unless_connected() {
        let mut c = controller(1);
        c.tick();
        assert_eq!(c.elapsed_secs(), 0);
        assert_eq!(c.data_used(), 0);
    }

    #[test]
    fn test_poll_follows_the_clock() {
        let (mut c, t0) = connected(2);
        assert_eq!(c.poll(t0 + Duration::from_millis(999)), 0);
        assert_eq!(c.poll(t0 + Duration::from_millis(1000)), 1);
        assert_eq!(c.poll(t0 + Duration::from_millis(3500)), 2);
        assert_eq!(c.elapsed_secs(), 3);
        assert_eq!(c.poll(t0 + Duration::from_millis(3900)), 0);
    }

    #[test]
    fn test_speeds_stay_within_clamps() {
        let (mut c, _) = connected(11);
        for _ in 0..20_000 {
            c.tick();
            let s = c.speeds().unwrap();
            assert!((30..=100).contains(&s.download_mbps), "{s:?}");
            assert!((20..=60).contains(&s.upload_mbps), "{s:?}");
        }
    }

    #[test]
    fn test_wobble_clamps_at_edges() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..1000 {
            let low = wobble(30, DOWNLOAD_JITTER, DOWNLOAD_CLAMP, &mut rng);
            assert!((30..=34).contains(&low));
            let high = wobble(60, UPLOAD_JITTER, UPLOAD_CLAMP, &mut rng);
            assert!((57..=60).contains(&high));
        }
    }

    #[test]
    fn test_disconnect_requires_connected() {
        let mut c = controller(1);
        assert_eq!(
            c.begin_disconnect(),
            Err(ControllerError::NotConnected(Status::Disconnected))
        );
    }

    #[test]
    fn test_disconnect_plan_carries_data_and_freezes_metrics() {
        let (mut c, t0) = connected(4);
        c.poll(t0 + Duration::from_secs(5));
        let used = c.data_used();
        let plan = c.begin_disconnect().unwrap();
        assert_eq!(plan.connection_id, 10);
        assert_eq!(plan.data_used, i64::try_from(used).unwrap());
        assert_eq!(plan.delay, Duration::from_secs(1));
        assert_eq!(c.status(), Status::Disconnecting);

        assert_eq!(c.poll(t0 + Duration::from_secs(60)), 0);
        assert_eq!(c.elapsed_secs(), 5);
    }

    #[test]
    fn test_successful_disconnect_resets_everything() {
        let (mut c, t0) = connected(4);
        c.poll(t0 + Duration::from_secs(8));
        c.begin_disconnect().unwrap();
        let notice = c.complete_disconnect(ok(10), t0).unwrap();
        assert_eq!(notice.title, "Disconnected");
        assert_eq!(c.status(), Status::Disconnected);
        assert_eq!(c.elapsed_secs(), 0);
        assert_eq!(c.data_used(), 0);
        assert!(c.speeds().is_none());
        assert!(c.ip_address().is_none());
        assert!(c.current_connection_id().is_none());
    }

    #[test]
    fn test_failed_disconnect_returns_to_connected() {
        let (mut c, t0) = connected(4);
        c.poll(t0 + Duration::from_secs(3));
        let used = c.data_used();
        c.begin_disconnect().unwrap();

        let t1 = t0 + Duration::from_secs(10);
        let notice = c.complete_disconnect(failed(), t1).unwrap();
        assert_eq!(notice.title, "Disconnect failed");
        assert_eq!(c.status(), Status::Connected);
        assert_eq!(c.elapsed_secs(), 3);
        assert_eq!(c.data_used(), used);
        assert_eq!(c.current_connection_id(), Some(10));

        assert_eq!(c.poll(t1 + Duration::from_secs(2)), 2);
        assert_eq!(c.elapsed_secs(), 5);
    }

    #[test]
    fn test_stale_completions_are_ignored() {
        let (mut c, t0) = connected(9);
        assert!(c.complete_connect(ok(99), t0).is_none());
        assert_eq!(c.current_connection_id(), Some(10));

        let mut idle = controller(9);
        assert!(idle.complete_disconnect(ok(1), t0).is_none());
        assert_eq!(idle.status(), Status::Disconnected);
    }

    #[test]
    fn test_resume_adopts_open_row() {
        let mut c = controller(5);
        let mut open = row(12, 3);
        open.ip_address = "192.168.7.8".to_string();
        open.connected_at = Utc::now() - chrono::Duration::seconds(90);
        let t0 = Instant::now();

        let notice = c
            .resume(&open, Some(sample_server(3, 20, 20, ServerStatus::Available)), t0)
            .unwrap();
        assert_eq!(notice.title, "Session resumed");
        assert_eq!(notice.description, "Still connected to Node 3, Testland");
        assert_eq!(c.status(), Status::Connected);
        assert_eq!(c.current_connection_id(), Some(12));
        assert_eq!(c.selected_server().map(|s| s.id), Some(3));
        assert_eq!(c.ip_address(), Some(Ipv4Addr::new(192, 168, 7, 8)));
        assert!(c.elapsed_secs() >= 90);
        assert_eq!(c.data_used(), 0);
        assert!(c.speeds().is_some());

        let before = c.elapsed_secs();
        c.poll(t0 + Duration::from_secs(1));
        assert_eq!(c.elapsed_secs(), before + 1);

        let plan = c.begin_disconnect().unwrap();
        assert_eq!(plan.connection_id, 12);
    }

    #[test]
    fn test_resume_ignores_closed_rows_and_busy_states() {
        let mut c = controller(6);
        let mut closed = row(4, 1);
        closed.disconnected_at = Some(Utc::now());
        assert!(c.resume(&closed, None, Instant::now()).is_none());
        assert_eq!(c.status(), Status::Disconnected);

        let (mut c, t0) = connected(6);
        assert!(c.resume(&row(99, 2), None, t0).is_none());
        assert_eq!(c.current_connection_id(), Some(10));
    }

    #[test]
    fn test_catalog_after_resume_selects_session_server() {
        let mut c = controller(7);
        c.resume(&row(12, 2), None, Instant::now()).unwrap();
        assert!(c.selected_server().is_none());

        c.on_servers_loaded(&[
            sample_server(1, 20, 20, ServerStatus::Available),
            sample_server(2, 20, 20, ServerStatus::Available),
        ]);
        assert_eq!(c.selected_server().map(|s| s.id), Some(2));
    }

    #[test]
    fn test_maintenance_server_is_not_guarded() {
        let mut c = controller(1);
        c.select_server(sample_server(9, 245, 85, ServerStatus::Maintenance))
            .unwrap();
        assert!(c.begin_connect(9, Instant::now()).is_ok());
    }

    #[test]
    fn test_default_selection_picks_first_available() {
        let mut c = controller(1);
        let servers = vec![
            sample_server(1, 1, 1, ServerStatus::Maintenance),
            sample_server(2, 1, 1, ServerStatus::Available),
            sample_server(3, 1, 1, ServerStatus::Available),
        ];
        c.on_servers_loaded(&servers);
        assert_eq!(c.selected_server().map(|s| s.id), Some(2));

        let mut refreshed = servers.clone();
        refreshed[1].status = ServerStatus::Maintenance;
        c.on_servers_loaded(&refreshed);
        let selected = c.selected_server().unwrap();
        assert_eq!(selected.id, 2);
        assert_eq!(selected.status, ServerStatus::Maintenance);
    }

    #[test]
    fn test_default_selection_with_nothing_available() {
        let mut c = controller(1);
        c.on_servers_loaded(&[sample_server(1, 1, 1, ServerStatus::Maintenance)]);
        assert!(c.selected_server().is_none());
    }

    /// Drives random operation sequences and checks every observed status
    /// change is an allowed edge.
    #[test]
    fn test_random_sequences_only_take_allowed_edges() {
        fn allowed(from: Status, to: Status) -> bool {
            use Status::{Connected, Connecting, Disconnected, Disconnecting};
            from == to
                || matches!(
                    (from, to),
                    (Disconnected, Connecting)
                        | (Connecting, Connected | Disconnected)
                        | (Connected, Disconnecting)
                        | (Disconnecting, Disconnected | Connected)
                )
        }

        let mut driver = StdRng::seed_from_u64(42);
        let mut c = controller(42);
        c.select_server(sample_server(1, 1, 1, ServerStatus::Available))
            .unwrap();
        let mut now = Instant::now();

        for step in 0..5_000 {
            let before = c.status();
            now += Duration::from_millis(driver.gen_range(0..1500));
            match driver.gen_range(0..7) {
                0 => {
                    let _ = c.begin_connect(1, now);
                }
                1 => {
                    let _ = c.begin_disconnect();
                }
                2 => {
                    c.complete_connect(ok(step), now);
                }
                3 => {
                    c.complete_connect(failed(), now);
                }
                4 => {
                    c.complete_disconnect(ok(step), now);
                }
                5 => {
                    c.complete_disconnect(failed(), now);
                }
                _ => {
                    let elapsed = c.elapsed_secs();
                    let ticks = c.poll(now);
                    assert_eq!(c.elapsed_secs(), elapsed + u64::from(ticks));
                }
            }
            let after = c.status();
            assert!(allowed(before, after), "step {step}: {before} -> {after}");
            if after == Status::Disconnected {
                assert_eq!(c.elapsed_secs(), 0);
            }
        }
    }
}
