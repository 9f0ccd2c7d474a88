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

//! # Hibernate Service
//!
//! Puts an idle game server to sleep and wakes it when a player shows up.
//!
//! - [`HibernationTimer`] counts down while the real server runs. When the
//!   countdown expires twice in a row with nobody (outside the
//!   [`Blacklist`]) online, it asks the [`ServerHost`] to stop the server.
//! - [`ResponderListener`] then takes over the port with a decoy that
//!   answers server list probes from a [`StatusProfile`]. The first client
//!   that tries to join gets a "server is starting" disconnect, the decoy
//!   releases the port, and the host is asked to start the real server.
//! - [`Hibernator`] wires both to the host's lifecycle notifications.
//!
//! # Architecture
//!
//! ```text
//! Hibernator
//!     ├── HibernationTimer ──(roster, stop)──┐
//!     └── ResponderListener ──(start)────────┤
//!             ↓                              ↓
//!         DecoyConnection              ServerHost
//!             ↓
//!         HandshakeSession → PacketCodec
//! ```
//!
//! # Example
//!
//! ```no_run
//! use hibernate_service::{HibernateConfig, Hibernator, Result, ServerHost};
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct MyHost;
//!
//! #[async_trait]
//! impl ServerHost for MyHost {
//!     async fn start_server(&self) {}
//!     async fn stop_server(&self) {}
//!     async fn is_running(&self) -> bool { true }
//!     async fn player_roster(&self) -> Result<Vec<String>> { Ok(Vec::new()) }
//! }
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let config = HibernateConfig::load_or_create("config/hibernate.json")?;
//!     let hibernator = Hibernator::new(&config, Arc::new(MyHost))?;
//!     hibernator.on_load().await;
//!     tokio::signal::ctrl_c().await?;
//!     hibernator.on_unload().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs, future_incompatible, rust_2018_idioms)]

mod blacklist;
mod config;
mod connection;
mod error;
mod handshake;
mod hibernator;
mod host;
mod listener;
mod metrics;
mod profile;
mod timer;
mod types;

pub use self::blacklist::{Blacklist, RosterSplit};
pub use self::config::{HibernateConfig, ListenerConfig, TimerConfig};
pub use self::connection::DecoyConnection;
pub use self::error::{HibernateError, Result};
pub use self::handshake::{HandshakeSession, Step};
pub use self::hibernator::Hibernator;
pub use self::host::ServerHost;
pub use self::listener::{ResponderListener, accept_once};
pub use self::metrics::{MetricsSnapshot, ResponderMetrics};
pub use self::profile::{StatusProfile, encode_favicon, load_favicon};
pub use self::timer::HibernationTimer;
pub use self::types::{AcceptOutcome, ExchangeOutcome, ListenerState, TimerState};
