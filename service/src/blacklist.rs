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

//! Player blacklist
//!
//! Blacklisted players do not count as "online" when the idle timer looks
//! at the roster, so bots and camera accounts cannot keep the server awake.
//! Every pattern must match the whole name.

use crate::HibernateError;
use regex_automata::meta::Regex;
use regex_syntax::hir::{Hir, Look};

/// Compiled set of full-match name patterns
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    patterns: Vec<Regex>,
    rejected: Vec<(String, String)>,
}

/// Roster split by the blacklist
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterSplit {
    /// Players that keep the server awake
    pub active: Vec<String>,
    /// Players matching a blacklist pattern
    pub blacklisted: Vec<String>,
}

impl RosterSplit {
    /// Check if no player keeps the server awake
    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }
}

impl Blacklist {
    /// Compile patterns, dropping the invalid ones with a warning
    pub fn compile<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut blacklist = Self::default();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            match full_match(pattern) {
                Ok(regex) => blacklist.patterns.push(regex),
                Err(reason) => {
                    tracing::warn!(pattern, error = %reason, "Dropping invalid blacklist pattern");
                    blacklist.rejected.push((pattern.to_string(), reason));
                }
            }
        }
        blacklist
    }

    /// Check if a player name matches any pattern in full
    pub fn is_blacklisted(&self, name: &str) -> bool {
        self.patterns.iter().any(|regex| regex.is_match(name))
    }

    /// Split a roster into active and blacklisted players
    pub fn partition(&self, roster: Vec<String>) -> RosterSplit {
        let (blacklisted, active) = roster
            .into_iter()
            .partition(|name| self.is_blacklisted(name));
        RosterSplit {
            active,
            blacklisted,
        }
    }

    /// Patterns that failed to compile
    pub fn rejected(&self) -> Vec<HibernateError> {
        self.rejected
            .iter()
            .map(|(pattern, reason)| HibernateError::InvalidBlacklistPattern {
                pattern: pattern.clone(),
                reason: reason.clone(),
            })
            .collect()
    }

    /// Number of usable patterns
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Check if there are no usable patterns
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Compile `pattern` anchored at both ends.
///
/// The anchors wrap the parsed pattern rather than its text, so inline
/// flags and verbose-mode comments cannot reach them.
fn full_match(pattern: &str) -> Result<Regex, String> {
    let hir = regex_syntax::Parser::new()
        .parse(pattern)
        .map_err(|e| e.to_string())?;
    let anchored = Hir::concat(vec![Hir::look(Look::Start), hir, Hir::look(Look::End)]);
    Regex::builder()
        .build_from_hir(&anchored)
        .map_err(|e| e.to_string())
}
