//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Decoy responder listener
//!
//! The [`ResponderListener`] owns at most one listening socket. While the
//! real server is suspended it answers status probes with the configured
//! [`StatusProfile`]; the first client that tries to join ends the accept
//! loop, closes the socket and asks the [`ServerHost`] to start the real
//! server, which can then bind the same port.
//!
//! Lifecycle:
//!
//! ```text
//! Idle --start--> Starting --bind--> Listening --join|stop|fatal--> Idle
//!                    |                   |
//!                    +-- bind retries ---+--stop--> StopRequested --> Idle
//!                        exhausted -> Idle
//! ```

use crate::connection::DecoyConnection;
use crate::{
    AcceptOutcome, ExchangeOutcome, HibernateError, ListenerConfig, ListenerState,
    ResponderMetrics, Result, ServerHost, StatusProfile,
};
use hibernate_wirecodec::Intent;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::{Mutex, Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::Instrument;

/// Decoy responder
///
/// # Example
///
/// ```no_run
/// use hibernate_service::{ListenerConfig, ResponderListener, ServerHost, StatusProfile};
/// use std::sync::Arc;
///
/// async fn serve(host: Arc<dyn ServerHost>) -> hibernate_service::Result<()> {
///     let config = ListenerConfig::new("0.0.0.0:25565".parse().unwrap());
///     let listener = ResponderListener::new(config, Arc::new(StatusProfile::default()));
///
///     listener.start(host).await?;
///     if let Some(addr) = listener.wait_until_listening().await {
///         println!("decoy listening on {}", addr);
///     }
///
///     // The loop ends by itself when a player joins.
///     listener.wait_until_idle().await;
///     Ok(())
/// }
/// ```
pub struct ResponderListener {
    /// State shared with the accept task
    shared: Arc<Shared>,
    /// Stop signal and task of the current run; also serializes start/stop
    run: Mutex<Option<ActiveRun>>,
}

struct Shared {
    config: ListenerConfig,
    profile: Arc<StatusProfile>,
    metrics: Arc<ResponderMetrics>,
    state: watch::Sender<ListenerState>,
    local_addr: std::sync::Mutex<Option<SocketAddr>>,
}

/// One run of the accept task. A fresh signal per run keeps a stale
/// notification from ending the next run early.
struct ActiveRun {
    stop: Arc<StopSignal>,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct StopSignal {
    requested: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

impl Shared {
    fn set_local_addr(&self, addr: Option<SocketAddr>) {
        *self
            .local_addr
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = addr;
    }

    fn finish(&self) {
        self.set_local_addr(None);
        self.state.send_replace(ListenerState::Idle);
        self.metrics.listening(false);
    }
}

impl ResponderListener {
    /// Create an idle responder
    pub fn new(config: ListenerConfig, profile: Arc<StatusProfile>) -> Self {
        let (state, _) = watch::channel(ListenerState::Idle);
        Self {
            shared: Arc::new(Shared {
                config,
                profile,
                metrics: Arc::new(ResponderMetrics::new()),
                state,
                local_addr: std::sync::Mutex::new(None),
            }),
            run: Mutex::new(None),
        }
    }

    /// Start answering on the configured address
    ///
    /// Returns once the accept task is spawned; binding (with retries)
    /// happens on that task. A no-op if the responder is already active or
    /// if `host` reports the real server as running.
    pub async fn start(&self, host: Arc<dyn ServerHost>) -> Result<()> {
        let mut run = self.run.lock().await;

        let state = *self.shared.state.borrow();
        let stale = run.as_ref().is_none_or(|active| active.task.is_finished());
        if state.is_active() && !stale {
            tracing::debug!(%state, "Decoy responder already active");
            return Ok(());
        }
        if host.is_running().await {
            tracing::info!("Real server is running, decoy responder not started");
            return Ok(());
        }
        self.shared.config.validate().map_err(HibernateError::Config)?;

        tracing::info!(address = %self.shared.config.bind_address, "Starting decoy responder");
        let stop = Arc::new(StopSignal::default());
        self.shared.state.send_replace(ListenerState::Starting);
        let task = tokio::spawn(
            run_responder(self.shared.clone(), stop.clone(), host).in_current_span(),
        );
        *run = Some(ActiveRun { stop, task });
        Ok(())
    }

    /// Stop answering and close the socket
    ///
    /// Waits up to the configured stop timeout for the accept task to
    /// notice. If it does not, the task is aborted, the socket closed with
    /// it, and [`HibernateError::StopTimedOut`] returned; the responder is
    /// idle either way.
    pub async fn stop(&self) -> Result<()> {
        let mut run = self.run.lock().await;
        let Some(mut active) = run.take() else {
            return Ok(());
        };

        let requested = self.shared.state.send_if_modified(|state| {
            if state.is_active() && *state != ListenerState::StopRequested {
                *state = ListenerState::StopRequested;
                true
            } else {
                state.is_active()
            }
        });
        if !requested || active.task.is_finished() {
            tracing::debug!("Decoy responder already idle");
            return Ok(());
        }

        tracing::info!("Stopping decoy responder");
        active.stop.request();
        let bound = self.shared.config.stop_timeout;
        match timeout(bound, &mut active.task).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Decoy responder task ended abnormally");
                self.shared.finish();
                Ok(())
            }
            Err(_) => {
                tracing::error!(?bound, "Decoy responder did not stop in time, closing it");
                active.task.abort();
                let _ = active.task.await;
                self.shared.finish();
                Err(HibernateError::StopTimedOut(bound))
            }
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ListenerState {
        *self.shared.state.borrow()
    }

    /// Check if the socket is bound and accepting
    pub fn is_listening(&self) -> bool {
        self.state() == ListenerState::Listening
    }

    /// Bound address while listening
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self
            .shared
            .local_addr
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait until a start attempt has either bound the socket or given up
    ///
    /// Returns the bound address, or `None` if the responder is not
    /// listening.
    pub async fn wait_until_listening(&self) -> Option<SocketAddr> {
        let mut state = self.shared.state.subscribe();
        let reached = match state.wait_for(|s| *s != ListenerState::Starting).await {
            Ok(reached) => *reached,
            Err(_) => return None,
        };
        if reached == ListenerState::Listening {
            self.local_addr()
        } else {
            None
        }
    }

    /// Wait until the responder is idle
    pub async fn wait_until_idle(&self) {
        let mut state = self.shared.state.subscribe();
        let _ = state.wait_for(|s| !s.is_active()).await;
    }

    /// Responder metrics
    pub fn metrics(&self) -> Arc<ResponderMetrics> {
        self.shared.metrics.clone()
    }

    /// Responder configuration
    pub fn config(&self) -> &ListenerConfig {
        &self.shared.config
    }
}

impl std::fmt::Debug for ResponderListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponderListener")
            .field("bind_address", &self.shared.config.bind_address)
            .field("state", &self.state())
            .field("local_addr", &self.local_addr())
            .finish()
    }
}

impl Drop for ResponderListener {
    fn drop(&mut self) {
        if let Some(active) = self.run.get_mut().take() {
            if !active.task.is_finished() {
                tracing::warn!("ResponderListener dropped while still active");
                active.stop.request();
            }
        }
    }
}

/// Wait for one client, bounded by `wait`
///
/// Aborted handshakes and interrupted waits count as timeouts: they say
/// nothing about the health of the listening socket.
pub async fn accept_once(listener: &TcpListener, wait: Duration) -> AcceptOutcome {
    match timeout(wait, listener.accept()).await {
        Err(_) => AcceptOutcome::Timeout,
        Ok(Ok((stream, peer_addr))) => AcceptOutcome::Connection(stream, peer_addr),
        Ok(Err(e))
            if matches!(
                e.kind(),
                io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::Interrupted
            ) =>
        {
            tracing::debug!(error = %e, "Client gave up before accept completed");
            AcceptOutcome::Timeout
        }
        Ok(Err(e)) => AcceptOutcome::Fatal(e),
    }
}

fn bind(addr: SocketAddr, backlog: u32) -> io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    #[cfg(unix)]
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(backlog)
}

/// Bind with exponential backoff. `Ok(None)` means a stop arrived first.
async fn bind_with_retry(shared: &Shared, stop: &StopSignal) -> Result<Option<TcpListener>> {
    let config = &shared.config;
    let mut delay = config.bind_backoff;
    let mut attempt = 0;
    loop {
        if stop.is_requested() {
            return Ok(None);
        }
        attempt += 1;
        match bind(config.bind_address, config.backlog) {
            Ok(listener) => return Ok(Some(listener)),
            Err(e) => {
                shared.metrics.bind_failed();
                if attempt >= config.bind_attempts {
                    return Err(HibernateError::BindFailure {
                        address: config.bind_address.to_string(),
                        attempts: attempt,
                        source: e,
                    });
                }
                tracing::warn!(
                    address = %config.bind_address,
                    attempt,
                    max_attempts = config.bind_attempts,
                    retry_in = ?delay,
                    error = %e,
                    "Bind failed, retrying"
                );
            }
        }
        tokio::select! {
            biased;
            () = stop.notify.notified() => return Ok(None),
            () = tokio::time::sleep(delay) => {}
        }
        delay = delay.saturating_mul(2);
    }
}

async fn run_responder(shared: Arc<Shared>, stop: Arc<StopSignal>, host: Arc<dyn ServerHost>) {
    let listener = match bind_with_retry(&shared, &stop).await {
        Ok(Some(listener)) => listener,
        Ok(None) => {
            tracing::debug!("Stop requested before the socket was bound");
            shared.finish();
            return;
        }
        Err(e) => {
            tracing::error!(error = %e, "Decoy responder not started");
            shared.finish();
            return;
        }
    };

    let addr = listener.local_addr().ok();
    shared.set_local_addr(addr);
    shared.state.send_if_modified(|state| {
        if *state == ListenerState::Starting {
            *state = ListenerState::Listening;
            true
        } else {
            false
        }
    });
    shared.metrics.listening(true);
    tracing::info!(address = ?addr, "Decoy responder listening");

    let wake = accept_loop(&shared, &stop, &listener).await;
    drop(listener);
    shared.finish();

    match wake {
        Some(intent) => {
            tracing::info!(%intent, "Player asked to join, starting the real server");
            // Detached so a slow start never holds up `stop`.
            tokio::spawn(async move { host.start_server().await }.in_current_span());
        }
        None => tracing::info!("Decoy responder stopped"),
    }
}

/// Serve clients one at a time until a join, a stop or a socket fault.
async fn accept_loop(shared: &Shared, stop: &StopSignal, listener: &TcpListener) -> Option<Intent> {
    loop {
        if stop.is_requested() {
            tracing::debug!("Stop observed");
            return None;
        }

        let outcome = tokio::select! {
            biased;
            () = stop.notify.notified() => {
                tracing::debug!("Stop observed while waiting for a client");
                return None;
            }
            outcome = accept_once(listener, shared.config.accept_timeout) => outcome,
        };

        let (stream, peer_addr) = match outcome {
            AcceptOutcome::Connection(stream, peer_addr) => (stream, peer_addr),
            AcceptOutcome::Timeout => {
                shared.metrics.accept_timeout();
                continue;
            }
            AcceptOutcome::Fatal(e) => {
                if stop.is_requested() {
                    tracing::debug!(error = %e, "Accept interrupted by stop");
                } else {
                    tracing::error!(error = %e, "Accept failed, closing decoy responder");
                }
                return None;
            }
        };

        shared.metrics.connection_opened();
        let started = Instant::now();
        let connection =
            DecoyConnection::new(stream, peer_addr, shared.profile.clone(), &shared.config);
        let result = tokio::select! {
            biased;
            () = stop.notify.notified() => {
                tracing::debug!(%peer_addr, "Stop observed during an exchange");
                return None;
            }
            result = connection.run() => result,
        };

        match result {
            Ok(outcome) => {
                shared.metrics.exchange_finished(outcome, started.elapsed());
                tracing::debug!(%peer_addr, %outcome, "Exchange finished");
                if let ExchangeOutcome::Join(intent) = outcome {
                    return Some(intent);
                }
            }
            // Client misbehaviour; the responder itself is fine.
            Err(e) if e.is_connection_error() => {
                if e.is_recoverable() {
                    shared.metrics.connection_error();
                } else {
                    shared.metrics.protocol_error();
                }
                tracing::debug!(%peer_addr, error = %e, "Exchange failed");
            }
            Err(e) => {
                shared.metrics.connection_error();
                tracing::warn!(%peer_addr, error = %e, "Could not answer client");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct RunningHost;

    #[async_trait]
    impl ServerHost for RunningHost {
        async fn start_server(&self) {}
        async fn stop_server(&self) {}
        async fn is_running(&self) -> bool {
            true
        }
        async fn player_roster(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    struct StoppedHost;

    #[async_trait]
    impl ServerHost for StoppedHost {
        async fn start_server(&self) {}
        async fn stop_server(&self) {}
        async fn is_running(&self) -> bool {
            false
        }
        async fn player_roster(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn listener() -> ResponderListener {
        let config = ListenerConfig::new("127.0.0.1:0".parse().unwrap())
            .with_accept_timeout(Duration::from_millis(100));
        ResponderListener::new(config, Arc::new(StatusProfile::default()))
    }

    #[tokio::test]
    async fn test_not_started_while_real_server_runs() {
        let listener = listener();
        listener.start(Arc::new(RunningHost)).await.unwrap();
        assert_eq!(listener.state(), ListenerState::Idle);
        assert!(listener.wait_until_listening().await.is_none());
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let listener = listener();
        listener.start(Arc::new(StoppedHost)).await.unwrap();
        let addr = listener.wait_until_listening().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert!(listener.is_listening());

        listener.stop().await.unwrap();
        assert_eq!(listener.state(), ListenerState::Idle);
        assert!(listener.local_addr().is_none());
    }

    #[tokio::test]
    async fn test_stop_while_idle_is_noop() {
        let listener = listener();
        listener.stop().await.unwrap();
        listener.stop().await.unwrap();
        assert_eq!(listener.state(), ListenerState::Idle);
    }

    #[tokio::test]
    async fn test_accept_timeout_is_not_an_error() {
        let socket = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let outcome = accept_once(&socket, Duration::from_millis(20)).await;
        assert!(matches!(outcome, AcceptOutcome::Timeout));
    }

    #[tokio::test]
    async fn test_stop_forces_a_stuck_task_closed() {
        let bound = Duration::from_millis(100);
        let config = ListenerConfig::new("127.0.0.1:0".parse().unwrap()).with_stop_timeout(bound);
        let listener = ResponderListener::new(config, Arc::new(StatusProfile::default()));

        // An accept task that holds its socket and never looks at the signal.
        let socket = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let task = tokio::spawn(async move {
            let _socket = socket;
            std::future::pending::<()>().await
        });
        listener.shared.set_local_addr(Some(addr));
        listener.shared.state.send_replace(ListenerState::Listening);
        *listener.run.lock().await = Some(ActiveRun {
            stop: Arc::new(StopSignal::default()),
            task,
        });

        let started = Instant::now();
        let err = listener.stop().await.unwrap_err();
        assert!(matches!(err, HibernateError::StopTimedOut(waited) if waited == bound));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(listener.state(), ListenerState::Idle);
        assert!(listener.local_addr().is_none());
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());

        listener.start(Arc::new(StoppedHost)).await.unwrap();
        assert!(listener.wait_until_listening().await.is_some());
        listener.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = ListenerConfig::new("127.0.0.1:0".parse().unwrap()).with_backlog(0);
        let listener = ResponderListener::new(config, Arc::new(StatusProfile::default()));
        let err = listener.start(Arc::new(StoppedHost)).await.unwrap_err();
        assert!(matches!(err, HibernateError::Config(_)));
        assert_eq!(listener.state(), ListenerState::Idle);
    }
}
