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

//! Collaborator trait for the real server

use crate::Result;
use async_trait::async_trait;

/// The real server process the service puts to sleep and wakes up
///
/// The decoy listener and the idle timer run on different tasks and may
/// call into the host concurrently. `start_server` and `stop_server` must
/// tolerate being called when the server is already in the target state.
///
/// # Example
///
/// ```no_run
/// use hibernate_service::{Result, ServerHost};
/// use async_trait::async_trait;
///
/// struct MyHost;
///
/// #[async_trait]
/// impl ServerHost for MyHost {
///     async fn start_server(&self) {
///         // Spawn the server process
///     }
///
///     async fn stop_server(&self) {
///         // Ask the server process to exit
///     }
///
///     async fn is_running(&self) -> bool {
///         false
///     }
///
///     async fn player_roster(&self) -> Result<Vec<String>> {
///         Ok(Vec::new())
///     }
/// }
/// ```
#[async_trait]
pub trait ServerHost: Send + Sync + 'static {
    /// Start the real server; a no-op if it is already running
    async fn start_server(&self);

    /// Stop the real server; a no-op if it is already stopped
    async fn stop_server(&self);

    /// Check whether the real server is running or starting
    ///
    /// Queried before the decoy binds so both never fight over the port.
    async fn is_running(&self) -> bool;

    /// Names of the players currently connected to the real server
    async fn player_roster(&self) -> Result<Vec<String>>;
}
