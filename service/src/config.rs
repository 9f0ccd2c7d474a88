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

//! Configuration types and builders
//!
//! [`HibernateConfig`] is the on-disk JSON document. It is loaded once at
//! startup and split into the runtime pieces each component needs:
//! [`ListenerConfig`] for the decoy responder, [`TimerConfig`] for the idle
//! countdown, plus a [`Blacklist`] and a [`StatusProfile`].
//!
//! # Examples
//!
//! ```
//! use hibernate_service::HibernateConfig;
//!
//! let config = HibernateConfig::from_json(r#"{"wait_sec": 120, "port": 25570}"#).unwrap();
//! assert_eq!(config.wait_sec, 120);
//! assert_eq!(config.protocol, 2);
//!
//! let listener = config.listener_config().unwrap();
//! assert_eq!(listener.bind_address.port(), 25570);
//! ```
//!
//! [`Blacklist`]: crate::Blacklist
//! [`StatusProfile`]: crate::StatusProfile

use crate::{Blacklist, HibernateError, Result};
use hibernate_wirecodec::consts::DEFAULT_MAX_FRAME_LENGTH;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Persistent configuration document
///
/// Keys match the configuration file written by earlier releases, so an
/// existing file keeps working. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HibernateConfig {
    /// Seconds without players before the server is suspended
    pub wait_sec: u64,
    /// Regular expressions; matching players do not keep the server awake
    pub blacklist_player: Vec<String>,
    /// Address the decoy responder binds to
    pub ip: String,
    /// Port the decoy responder binds to
    pub port: u16,
    /// Protocol number advertised in the status response
    pub protocol: i32,
    /// Message of the day shown in the server list
    pub motd: String,
    /// Text shown in place of the version
    pub version_text: String,
    /// Disconnect text shown to a player whose login woke the server
    pub kick_message: String,
    /// PNG shown in the server list
    pub server_icon: Option<PathBuf>,
    /// Names listed when hovering the player count
    pub samples: Vec<String>,
}

impl Default for HibernateConfig {
    fn default() -> Self {
        Self {
            wait_sec: 600,
            blacklist_player: Vec::new(),
            ip: "0.0.0.0".to_string(),
            port: 25565,
            protocol: 2,
            motd: "§e服务器正在休眠！\n§c进入服务器可将服务器从休眠中唤醒".to_string(),
            version_text: "§4Sleeping".to_string(),
            kick_message: "§e§l请求成功！\n\n§f服务器正在启动！请稍作等待后进入".to_string(),
            server_icon: Some(PathBuf::from("./server/server-icon.png")),
            samples: vec!["服务器正在休眠".to_string(), "进入服务器以唤醒".to_string()],
        }
    }
}

impl HibernateConfig {
    /// Parse a configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render the configuration as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Write the configuration, creating parent directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read a configuration file, writing the defaults first if it is missing
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }
        tracing::info!(path = %path.display(), "Configuration missing, writing defaults");
        let config = Self::default();
        config.save(path)?;
        Ok(config)
    }

    /// List problems with the configuration; empty when usable
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.wait_sec == 0 {
            problems.push("wait_sec must be greater than zero".to_string());
        }
        if self.ip.trim().is_empty() {
            problems.push("ip must not be empty".to_string());
        } else if self.ip.parse::<IpAddr>().is_err() {
            problems.push(format!("ip {:?} is not an IP address", self.ip));
        }
        problems
    }

    /// Idle duration before the server is suspended
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_sec)
    }

    /// Listener settings for the configured address
    pub fn listener_config(&self) -> Result<ListenerConfig> {
        let ip: IpAddr = self
            .ip
            .parse()
            .map_err(|e| HibernateError::Config(format!("ip {:?}: {}", self.ip, e)))?;
        Ok(ListenerConfig::new(SocketAddr::new(ip, self.port)))
    }

    /// Timer settings for the configured idle duration
    pub fn timer_config(&self) -> TimerConfig {
        TimerConfig::new(self.idle_timeout())
    }

    /// Compile the player blacklist, dropping invalid patterns
    pub fn blacklist(&self) -> Blacklist {
        Blacklist::compile(&self.blacklist_player)
    }
}

/// Decoy responder configuration
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Address to bind to
    pub bind_address: SocketAddr,

    /// Bound on a single wait in `accept`
    pub accept_timeout: Duration,

    /// Bound on reading each packet from a client
    pub read_timeout: Duration,

    /// Bound on writing each response
    pub write_timeout: Duration,

    /// Bound on a whole client exchange, from accept to close
    pub exchange_timeout: Duration,

    /// Bind attempts before giving up
    pub bind_attempts: u32,

    /// Delay after the first failed bind; doubled after each further failure
    pub bind_backoff: Duration,

    /// How long `stop` waits before closing the socket forcibly
    pub stop_timeout: Duration,

    /// Listen backlog
    pub backlog: u32,

    /// Largest frame accepted from a client
    pub max_frame_length: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 25565)),
            accept_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
            exchange_timeout: Duration::from_secs(10),
            bind_attempts: 5,
            bind_backoff: Duration::from_secs(1),
            stop_timeout: Duration::from_secs(6),
            backlog: 32,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}

impl ListenerConfig {
    /// Create a new configuration with the given bind address
    pub fn new(bind_address: SocketAddr) -> Self {
        Self {
            bind_address,
            ..Default::default()
        }
    }

    /// Set the accept timeout
    pub fn with_accept_timeout(mut self, timeout: Duration) -> Self {
        self.accept_timeout = timeout;
        self
    }

    /// Set the per-packet read timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the per-response write timeout
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the bound on a whole client exchange
    pub fn with_exchange_timeout(mut self, timeout: Duration) -> Self {
        self.exchange_timeout = timeout;
        self
    }

    /// Set the bind retry policy
    pub fn with_bind_retry(mut self, attempts: u32, initial_backoff: Duration) -> Self {
        self.bind_attempts = attempts;
        self.bind_backoff = initial_backoff;
        self
    }

    /// Set the stop bound
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Set the listen backlog
    pub fn with_backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog;
        self
    }

    /// Set the largest accepted frame
    pub fn with_max_frame_length(mut self, max: usize) -> Self {
        self.max_frame_length = max;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.bind_attempts == 0 {
            return Err("bind_attempts must be greater than 0".to_string());
        }
        if self.backlog == 0 {
            return Err("backlog must be greater than 0".to_string());
        }
        if self.max_frame_length == 0 {
            return Err("max_frame_length must be greater than 0".to_string());
        }
        if self.accept_timeout.is_zero() || self.read_timeout.is_zero() {
            return Err("accept_timeout and read_timeout must be non-zero".to_string());
        }
        if self.write_timeout.is_zero() || self.stop_timeout.is_zero() {
            return Err("write_timeout and stop_timeout must be non-zero".to_string());
        }
        if self.exchange_timeout.is_zero() {
            return Err("exchange_timeout must be non-zero".to_string());
        }
        Ok(())
    }
}

/// Idle countdown configuration
#[derive(Debug, Clone)]
pub struct TimerConfig {
    /// Countdown length
    pub idle_timeout: Duration,

    /// Bound on one roster query
    pub roster_timeout: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(600),
            roster_timeout: Duration::from_secs(10),
        }
    }
}

impl TimerConfig {
    /// Create a new configuration with the given countdown length
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            idle_timeout,
            ..Default::default()
        }
    }

    /// Set the roster query bound
    pub fn with_roster_timeout(mut self, timeout: Duration) -> Self {
        self.roster_timeout = timeout;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.idle_timeout.is_zero() {
            return Err("idle_timeout must be greater than 0".to_string());
        }
        if self.roster_timeout.is_zero() {
            return Err("roster_timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}
