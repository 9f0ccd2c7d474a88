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

//! Wiring between the real server, the decoy and the idle timer
//!
//! The [`Hibernator`] reacts to lifecycle notifications from whatever
//! supervises the real server:
//!
//! ```text
//! server started  -> arm idle timer
//! player joined   -> cancel idle timer
//! player left     -> rearm idle timer
//! timer confirms nobody is online -> suspend (stop real server)
//! server stopped  -> expected? start decoy : warn and leave the port free
//! decoy sees join -> resume (start real server)
//! ```

use crate::{
    HibernateConfig, HibernateError, HibernationTimer, ResponderListener, Result, ServerHost,
    StatusProfile,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Host wrapper recording whether the real server is meant to be running
///
/// Every start or stop the service itself requests goes through here, so a
/// stop nobody asked for can be told apart from a suspension.
struct Supervised {
    inner: Arc<dyn ServerHost>,
    expect_running: AtomicBool,
}

#[async_trait]
impl ServerHost for Supervised {
    async fn start_server(&self) {
        self.expect_running.store(true, Ordering::SeqCst);
        self.inner.start_server().await;
    }

    async fn stop_server(&self) {
        self.expect_running.store(false, Ordering::SeqCst);
        self.inner.stop_server().await;
    }

    async fn is_running(&self) -> bool {
        self.inner.is_running().await
    }

    async fn player_roster(&self) -> Result<Vec<String>> {
        self.inner.player_roster().await
    }
}

/// Owns the decoy responder and the idle timer for one real server
pub struct Hibernator {
    host: Arc<Supervised>,
    listener: ResponderListener,
    timer: HibernationTimer,
}

impl Hibernator {
    /// Build every component from the configuration
    pub fn new(config: &HibernateConfig, host: Arc<dyn ServerHost>) -> Result<Self> {
        let problems = config.validate();
        if !problems.is_empty() {
            return Err(HibernateError::Config(problems.join("; ")));
        }
        let profile = Arc::new(StatusProfile::from_config(config));
        let listener = ResponderListener::new(config.listener_config()?, profile);
        let timer = HibernationTimer::new(config.timer_config(), config.blacklist())?;
        Ok(Self::from_parts(host, listener, timer))
    }

    /// Assemble from already built components
    pub fn from_parts(
        host: Arc<dyn ServerHost>,
        listener: ResponderListener,
        timer: HibernationTimer,
    ) -> Self {
        Self {
            host: Arc::new(Supervised {
                inner: host,
                expect_running: AtomicBool::new(false),
            }),
            listener,
            timer,
        }
    }

    fn supervised(&self) -> Arc<dyn ServerHost> {
        self.host.clone()
    }

    /// The service was loaded
    ///
    /// A running server gets its idle timer. Otherwise nothing is started:
    /// whether the server is down on purpose is unknown at this point.
    pub async fn on_load(&self) {
        if self.host.is_running().await {
            self.host.expect_running.store(true, Ordering::SeqCst);
            self.timer.start(self.supervised());
        } else {
            tracing::info!("Real server state unknown, start the decoy responder manually if needed");
        }
    }

    /// The service is being unloaded
    pub async fn on_unload(&self) {
        self.timer.cancel();
        if let Err(e) = self.listener.stop().await {
            tracing::warn!(error = %e, "Decoy responder did not stop cleanly");
        }
    }

    /// The real server finished starting
    pub fn on_server_startup(&self) {
        self.host.expect_running.store(true, Ordering::SeqCst);
        self.timer.start(self.supervised());
    }

    /// The real server stopped
    ///
    /// The decoy only takes over the port if the stop was a suspension; a
    /// crash or a manual stop is left alone.
    pub async fn on_server_stop(&self) {
        self.timer.cancel();
        if self.host.expect_running.load(Ordering::SeqCst) {
            tracing::warn!("Real server stopped unexpectedly, decoy responder not started");
            return;
        }
        self.start_responder().await;
    }

    /// A player joined the real server
    pub fn on_player_joined(&self) {
        self.timer.cancel();
    }

    /// A player left the real server
    pub fn on_player_left(&self) {
        self.timer.start(self.supervised());
    }

    /// Suspend the real server now
    pub async fn sleep(&self) {
        if self.host.is_running().await {
            self.timer.cancel();
            self.suspend().await;
        } else {
            tracing::info!("Real server is not running, nothing to suspend");
        }
    }

    /// Stop the decoy and start the real server now
    ///
    /// Refuses to start the real server if the decoy could not release the
    /// port.
    pub async fn wake(&self) -> Result<()> {
        if let Err(e) = self.listener.stop().await {
            tracing::error!(error = %e, "Decoy responder failed to stop, real server not started");
            return Err(e);
        }
        if self.host.is_running().await {
            tracing::info!("Real server already running");
        } else {
            self.resume().await;
        }
        Ok(())
    }

    /// Stop the real server, recording that the stop is expected
    pub async fn suspend(&self) {
        tracing::info!("Suspending the real server");
        self.host.stop_server().await;
    }

    /// Start the real server, recording that it is expected to run
    pub async fn resume(&self) {
        tracing::info!("Resuming the real server");
        self.host.start_server().await;
    }

    /// Start the decoy responder
    pub async fn start_responder(&self) {
        if let Err(e) = self.listener.start(self.supervised()).await {
            tracing::error!(error = %e, "Decoy responder could not be started");
        }
    }

    /// Stop the decoy responder
    pub async fn stop_responder(&self) -> Result<()> {
        self.listener.stop().await
    }

    /// Whether the real server is meant to be running
    pub fn expects_running(&self) -> bool {
        self.host.expect_running.load(Ordering::SeqCst)
    }

    /// The decoy responder
    pub fn listener(&self) -> &ResponderListener {
        &self.listener
    }

    /// The idle timer
    pub fn timer(&self) -> &HibernationTimer {
        &self.timer
    }
}

impl std::fmt::Debug for Hibernator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hibernator")
            .field("expects_running", &self.expects_running())
            .field("listener", &self.listener)
            .field("timer", &self.timer)
            .finish()
    }
}
