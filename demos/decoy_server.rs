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

//! Decoy responder demo
//!
//! Runs the hibernation service against a pretend server that "boots" in
//! two seconds and never has players, so the whole cycle is visible within
//! a few minutes:
//!
//! ```text
//! cargo run -p hibernate-service --example decoy_server -- config/hibernate.json
//! RUST_LOG=hibernate_service=debug cargo run -p hibernate-service --example decoy_server
//! ```
//!
//! Point a game client's server list at the configured port to see the
//! status page; joining wakes the pretend server.

use async_trait::async_trait;
use hibernate_service::{HibernateConfig, Hibernator, Result, ServerHost};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// Lifecycle notifications a real supervisor would forward
#[derive(Debug)]
enum ServerEvent {
    Started,
    Stopped,
}

struct PretendServer {
    running: AtomicBool,
    events: mpsc::UnboundedSender<ServerEvent>,
}

#[async_trait]
impl ServerHost for PretendServer {
    async fn start_server(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("Pretend server booting");
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            let _ = events.send(ServerEvent::Started);
        });
    }

    async fn stop_server(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        tracing::info!("Pretend server shutting down");
        let _ = self.events.send(ServerEvent::Stopped);
    }

    async fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn player_roster(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,hibernate_service=debug")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/hibernate.json".to_string());
    let config = HibernateConfig::load_or_create(&path)?;
    for problem in config.validate() {
        tracing::warn!(%problem, "Configuration problem");
    }

    let (events, mut notifications) = mpsc::unbounded_channel();
    let host = Arc::new(PretendServer {
        running: AtomicBool::new(true),
        events,
    });
    let hibernator = Hibernator::new(&config, host)?;
    hibernator.on_load().await;

    loop {
        tokio::select! {
            event = notifications.recv() => match event {
                Some(ServerEvent::Started) => hibernator.on_server_startup(),
                Some(ServerEvent::Stopped) => hibernator.on_server_stop().await,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    hibernator.on_unload().await;
    Ok(())
}
