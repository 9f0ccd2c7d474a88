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

//! JSON payloads carried by status responses and disconnects

use crate::packet::ClientboundPacket;
use serde::{Deserialize, Serialize};

/// Document returned for a status request.
///
/// Serializes to
/// `{"version":{..},"players":{..},"description":{..},"favicon":".."}`;
/// `favicon` is omitted when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Version block
    pub version: StatusVersion,
    /// Player counts and sample list
    pub players: StatusPlayers,
    /// Message of the day
    pub description: ChatComponent,
    /// `data:image/png;base64,...` icon
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

/// Version block of a status response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusVersion {
    /// Text shown in place of the version
    pub name: String,
    /// Protocol number; a mismatch makes clients show `name` in red
    pub protocol: i32,
}

/// Player block of a status response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPlayers {
    /// Maximum player count
    pub max: u32,
    /// Online player count
    pub online: u32,
    /// Names shown when hovering the player count
    #[serde(default)]
    pub sample: Vec<PlayerSample>,
}

/// One entry of the hover sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSample {
    /// Displayed name
    pub name: String,
    /// Hyphenated UUID
    pub id: String,
}

/// Minimal text chat component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatComponent {
    /// Text, may contain legacy `§` formatting codes
    pub text: String,
}

impl ChatComponent {
    /// Creates a text component.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Builds the login disconnect packet carrying this component.
    pub fn to_disconnect(&self) -> serde_json::Result<ClientboundPacket> {
        Ok(ClientboundPacket::Disconnect(serde_json::to_string(self)?))
    }
}

impl StatusResponse {
    /// Builds the status response packet carrying this document.
    pub fn to_packet(&self) -> serde_json::Result<ClientboundPacket> {
        Ok(ClientboundPacket::StatusResponse(serde_json::to_string(
            self,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(favicon: Option<String>) -> StatusResponse {
        StatusResponse {
            version: StatusVersion {
                name: "Sleeping".to_string(),
                protocol: 2,
            },
            players: StatusPlayers {
                max: 1,
                online: 1,
                sample: vec![PlayerSample {
                    name: "Join to wake".to_string(),
                    id: "00000000-0000-0000-0000-000000000000".to_string(),
                }],
            },
            description: ChatComponent::new("Server is asleep"),
            favicon,
        }
    }

    #[test]
    fn status_json_shape() {
        let json: serde_json::Value =
            serde_json::to_value(response(Some("data:image/png;base64,AA==".into()))).unwrap();
        assert_eq!(json["version"]["name"], "Sleeping");
        assert_eq!(json["version"]["protocol"], 2);
        assert_eq!(json["players"]["sample"][0]["name"], "Join to wake");
        assert_eq!(json["description"]["text"], "Server is asleep");
        assert_eq!(json["favicon"], "data:image/png;base64,AA==");
    }

    #[test]
    fn status_json_omits_missing_favicon() {
        let json = serde_json::to_string(&response(None)).unwrap();
        assert!(!json.contains("favicon"));
    }

    #[test]
    fn disconnect_packet() {
        let packet = ChatComponent::new("Waking up").to_disconnect().unwrap();
        assert_eq!(
            packet,
            ClientboundPacket::Disconnect(r#"{"text":"Waking up"}"#.to_string())
        );
    }
}
