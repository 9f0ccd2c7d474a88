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

//! Status and disconnect payloads served by the decoy

use crate::{HibernateConfig, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hibernate_wirecodec::{
    ChatComponent, ClientboundPacket, PlayerSample, StatusPlayers, StatusResponse, StatusVersion,
};
use std::path::Path;
use uuid::Uuid;

const FAVICON_PREFIX: &str = "data:image/png;base64,";

/// Immutable snapshot of everything the decoy tells clients
///
/// Built once from the configuration and shared across connections. The
/// icon file is read and encoded at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusProfile {
    version_name: String,
    protocol: i32,
    motd: String,
    kick_message: String,
    samples: Vec<String>,
    favicon: Option<String>,
}

impl StatusProfile {
    /// Create a profile without samples or icon
    pub fn new(
        version_name: impl Into<String>,
        protocol: i32,
        motd: impl Into<String>,
        kick_message: impl Into<String>,
    ) -> Self {
        Self {
            version_name: version_name.into(),
            protocol,
            motd: motd.into(),
            kick_message: kick_message.into(),
            samples: Vec::new(),
            favicon: None,
        }
    }

    /// Build the profile from configuration, loading the icon if present
    pub fn from_config(config: &HibernateConfig) -> Self {
        let profile = Self::new(
            config.version_text.clone(),
            config.protocol,
            config.motd.clone(),
            config.kick_message.clone(),
        )
        .with_samples(config.samples.clone());
        match &config.server_icon {
            Some(path) => profile.with_favicon(load_favicon(path)),
            None => profile,
        }
    }

    /// Set the hover sample names
    pub fn with_samples(mut self, samples: Vec<String>) -> Self {
        self.samples = samples;
        self
    }

    /// Set the favicon from raw PNG bytes
    pub fn with_icon_bytes(self, png: &[u8]) -> Self {
        self.with_favicon(Some(encode_favicon(png)))
    }

    /// Set an already encoded `data:` URI
    pub fn with_favicon(mut self, favicon: Option<String>) -> Self {
        self.favicon = favicon;
        self
    }

    /// Check if a favicon will be served
    pub fn has_favicon(&self) -> bool {
        self.favicon.is_some()
    }

    /// Hover sample names
    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    /// Disconnect text for joining players
    pub fn kick_message(&self) -> &str {
        &self.kick_message
    }

    /// Build a status document
    ///
    /// The player counts mirror the sample list and every sample gets a
    /// fresh random id.
    pub fn status_response(&self) -> StatusResponse {
        let count = u32::try_from(self.samples.len()).unwrap_or(u32::MAX);
        StatusResponse {
            version: StatusVersion {
                name: self.version_name.clone(),
                protocol: self.protocol,
            },
            players: StatusPlayers {
                max: count,
                online: count,
                sample: self
                    .samples
                    .iter()
                    .map(|name| PlayerSample {
                        name: name.clone(),
                        id: Uuid::new_v4().to_string(),
                    })
                    .collect(),
            },
            description: ChatComponent::new(self.motd.clone()),
            favicon: self.favicon.clone(),
        }
    }

    /// Status response packet
    pub fn status_packet(&self) -> Result<ClientboundPacket> {
        Ok(self.status_response().to_packet()?)
    }

    /// Login disconnect packet carrying the kick message
    pub fn disconnect_packet(&self) -> Result<ClientboundPacket> {
        Ok(ChatComponent::new(self.kick_message.clone()).to_disconnect()?)
    }
}

impl Default for StatusProfile {
    fn default() -> Self {
        Self::from_config(&HibernateConfig {
            server_icon: None,
            ..HibernateConfig::default()
        })
    }
}

/// Encode PNG bytes as a `data:` URI
pub fn encode_favicon(png: &[u8]) -> String {
    format!("{}{}", FAVICON_PREFIX, STANDARD.encode(png))
}

/// Read and encode an icon file; a missing or unreadable file yields `None`
pub fn load_favicon(path: &Path) -> Option<String> {
    match std::fs::read(path) {
        Ok(png) => {
            tracing::debug!(path = %path.display(), bytes = png.len(), "Loaded server icon");
            Some(encode_favicon(&png))
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Server icon unavailable, serving status without it");
            None
        }
    }
}
