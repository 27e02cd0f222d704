//! Background API worker.
//!
//! Every API call the dashboard makes runs on a short-lived background thread
//! so the render loop never blocks on the network. Results come back to the
//! main loop as [`JobOutcome`] messages over an MPSC channel and are drained
//! once per tick.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use tracing::debug;

use crate::client::{ClientError, VpnApi};
use crate::controller::{ConnectPlan, DisconnectPlan};
use crate::model::{ConnectionHistory, Server};

/// Results sent from background jobs to the main application.
#[derive(Debug)]
pub enum JobOutcome {
    /// Result of `POST /api/connect`.
    Connected(Result<ConnectionHistory, ClientError>),
    /// Result of `POST /api/disconnect`.
    Disconnected(Result<ConnectionHistory, ClientError>),
    /// Fresh server catalog.
    Servers(Result<Vec<Server>, ClientError>),
    /// Fresh connection history for the current user.
    History(Result<Vec<ConnectionHistory>, ClientError>),
}

/// Runs [`VpnApi`] calls off the UI thread.
pub struct Worker {
    api: Arc<dyn VpnApi>,
    tx: Sender<JobOutcome>,
    rx: Receiver<JobOutcome>,
}

impl Worker {
    pub fn new(api: Arc<dyn VpnApi>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self { api, tx, rx }
    }

    /// Waits out the simulated handshake, then opens the history row.
    pub fn spawn_connect(&self, plan: ConnectPlan) {
        self.spawn("connect", move |api| {
            thread::sleep(plan.delay);
            JobOutcome::Connected(api.connect(plan.server_id, &plan.ip_address.to_string()))
        });
    }

    /// Waits out the simulated teardown, then closes the history row.
    pub fn spawn_disconnect(&self, plan: DisconnectPlan) {
        self.spawn("disconnect", move |api| {
            thread::sleep(plan.delay);
            JobOutcome::Disconnected(api.disconnect(plan.connection_id, plan.data_used))
        });
    }

    pub fn refresh_servers(&self) {
        self.spawn("servers", |api| JobOutcome::Servers(api.servers()));
    }

    pub fn refresh_history(&self) {
        self.spawn("history", |api| JobOutcome::History(api.history()));
    }

    /// Next finished job, if any. Never blocks.
    pub fn try_recv(&self) -> Option<JobOutcome> {
        self.rx.try_recv().ok()
    }

    /// Waits up to `timeout` for the next finished job.
    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Option<JobOutcome> {
        self.rx.recv_timeout(timeout).ok()
    }

    fn spawn<F>(&self, job: &'static str, run: F)
    where
        F: FnOnce(&dyn VpnApi) -> JobOutcome + Send + 'static,
    {
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        thread::spawn(move || {
            debug!(job, "api job started");
            let outcome = run(api.as_ref());
            // The receiver only goes away when the app is shutting down.
            let _ = tx.send(outcome);
        });
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{sample_server, ServerStatus};
    use chrono::Utc;
    use std::net::Ipv4Addr;
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory [`VpnApi`] that records calls.
    #[derive(Default)]
    pub(crate) struct FakeApi {
        pub calls: Mutex<Vec<String>>,
        pub fail_connect: bool,
        pub fail_disconnect: bool,
        /// Report row 5 on server 2 as still open.
        pub open_session: bool,
    }

    impl FakeApi {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn row(id: i64, server_id: i64, ip: &str) -> ConnectionHistory {
            ConnectionHistory {
                id,
                user_id: 1,
                server_id,
                ip_address: ip.to_string(),
                connected_at: Utc::now(),
                disconnected_at: None,
                duration: None,
                data_used: None,
            }
        }

        fn refused() -> ClientError {
            ClientError::Status {
                status: 500,
                message: "boom".to_string(),
            }
        }
    }

    impl VpnApi for FakeApi {
        fn servers(&self) -> Result<Vec<Server>, ClientError> {
            self.record("servers".into());
            Ok(vec![
                sample_server(1, 40, 10, ServerStatus::Available),
                sample_server(2, 10, 10, ServerStatus::Available),
                sample_server(3, 5, 5, ServerStatus::Maintenance),
            ])
        }

        fn history(&self) -> Result<Vec<ConnectionHistory>, ClientError> {
            self.record("history".into());
            let mut closed = Self::row(3, 1, "192.168.0.1");
            closed.disconnected_at = Some(Utc::now());
            closed.duration = Some(60);
            closed.data_used = Some(1024);
            if self.open_session {
                Ok(vec![Self::row(5, 2, "192.168.5.6"), closed])
            } else {
                Ok(vec![closed])
            }
        }

        fn connect(
            &self,
            server_id: i64,
            ip_address: &str,
        ) -> Result<ConnectionHistory, ClientError> {
            self.record(format!("connect {server_id} {ip_address}"));
            if self.fail_connect {
                return Err(Self::refused());
            }
            Ok(Self::row(7, server_id, ip_address))
        }

        fn disconnect(
            &self,
            connection_id: i64,
            data_used: i64,
        ) -> Result<ConnectionHistory, ClientError> {
            self.record(format!("disconnect {connection_id} {data_used}"));
            if self.fail_disconnect {
                return Err(Self::refused());
            }
            let mut row = Self::row(connection_id, 1, "192.168.0.1");
            row.disconnected_at = Some(Utc::now());
            row.duration = Some(0);
            row.data_used = Some(data_used);
            Ok(row)
        }
    }

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_connect_job_reports_row() {
        let api = Arc::new(FakeApi::default());
        let worker = Worker::new(api.clone());
        worker.spawn_connect(ConnectPlan {
            server_id: 2,
            ip_address: Ipv4Addr::new(192, 168, 3, 4),
            delay: Duration::ZERO,
        });

        match worker.recv_timeout(WAIT) {
            Some(JobOutcome::Connected(Ok(row))) => {
                assert_eq!(row.server_id, 2);
                assert_eq!(row.ip_address, "192.168.3.4");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(*api.calls.lock().unwrap(), vec!["connect 2 192.168.3.4"]);
    }

    #[test]
    fn test_disconnect_job_reports_failure() {
        let api = Arc::new(FakeApi {
            fail_disconnect: true,
            ..FakeApi::default()
        });
        let worker = Worker::new(api);
        worker.spawn_disconnect(DisconnectPlan {
            connection_id: 7,
            data_used: 2048,
            delay: Duration::ZERO,
        });

        assert!(matches!(
            worker.recv_timeout(WAIT),
            Some(JobOutcome::Disconnected(Err(ClientError::Status { status: 500, .. })))
        ));
    }

    #[test]
    fn test_connect_waits_for_delay() {
        let worker = Worker::new(Arc::new(FakeApi::default()));
        worker.spawn_connect(ConnectPlan {
            server_id: 1,
            ip_address: Ipv4Addr::new(192, 168, 0, 1),
            delay: Duration::from_millis(200),
        });
        assert!(worker.try_recv().is_none());
        assert!(worker.recv_timeout(WAIT).is_some());
    }

    #[test]
    fn test_refresh_jobs() {
        let worker = Worker::new(Arc::new(FakeApi::default()));
        worker.refresh_servers();
        worker.refresh_history();

        let mut saw_servers = false;
        let mut saw_history = false;
        for _ in 0..2 {
            match worker.recv_timeout(WAIT) {
                Some(JobOutcome::Servers(Ok(servers))) => {
                    saw_servers = servers.len() == 3;
                }
                Some(JobOutcome::History(Ok(rows))) => {
                    saw_history = rows.len() == 1;
                }
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
        assert!(saw_servers && saw_history);
    }
}
