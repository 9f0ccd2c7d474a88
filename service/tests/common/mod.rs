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

//! Shared helpers for the service integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::BytesMut;
use hibernate_service::{HibernateError, Result, ServerHost};
use hibernate_wirecodec::{Handshake, Intent, ServerboundPacket, decode_string, decode_varint};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Notify;

/// Scripted answer of the roster provider
#[derive(Debug, Clone)]
pub enum Reply {
    Players(Vec<String>),
    Fail,
    Hang,
    Panic,
}

impl Reply {
    pub fn players(names: &[&str]) -> Self {
        Reply::Players(names.iter().map(|s| s.to_string()).collect())
    }

    pub fn empty() -> Self {
        Reply::Players(Vec::new())
    }
}

/// Host double recording every call
pub struct MockHost {
    running: AtomicBool,
    starts: AtomicUsize,
    stops: AtomicUsize,
    roster_calls: AtomicUsize,
    script: Mutex<VecDeque<Reply>>,
    fallback: Mutex<Reply>,
    changed: Notify,
}

impl MockHost {
    pub fn new(running: bool) -> Self {
        Self {
            running: AtomicBool::new(running),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            roster_calls: AtomicUsize::new(0),
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Reply::empty()),
            changed: Notify::new(),
        }
    }

    /// Queue roster answers; once drained, the last one repeats
    pub fn script(&self, replies: Vec<Reply>) {
        let mut script = self.script.lock().unwrap();
        if let Some(last) = replies.last() {
            *self.fallback.lock().unwrap() = last.clone();
        }
        script.extend(replies);
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn roster_calls(&self) -> usize {
        self.roster_calls.load(Ordering::SeqCst)
    }

    /// Wait until `start_server` has been called `count` times
    pub async fn wait_for_starts(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.starts() < count {
                self.changed.notified().await;
            }
        })
        .await
        .expect("start_server was not called in time");
    }

    /// Wait until `stop_server` has been called `count` times
    pub async fn wait_for_stops(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.stops() < count {
                self.changed.notified().await;
            }
        })
        .await
        .expect("stop_server was not called in time");
    }

    fn next_reply(&self) -> Reply {
        match self.script.lock().unwrap().pop_front() {
            Some(reply) => reply,
            None => self.fallback.lock().unwrap().clone(),
        }
    }
}

#[async_trait]
impl ServerHost for MockHost {
    async fn start_server(&self) {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        self.changed.notify_one();
    }

    async fn stop_server(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        self.changed.notify_one();
    }

    async fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn player_roster(&self) -> Result<Vec<String>> {
        self.roster_calls.fetch_add(1, Ordering::SeqCst);
        match self.next_reply() {
            Reply::Players(names) => Ok(names),
            Reply::Fail => Err(HibernateError::RosterFetch("query refused".to_string())),
            Reply::Hang => std::future::pending().await,
            Reply::Panic => panic!("roster provider crashed"),
        }
    }
}

pub fn handshake_bytes(intent: Intent) -> BytesMut {
    let mut bytes = BytesMut::new();
    ServerboundPacket::Handshake(Handshake {
        protocol_version: 767,
        server_address: "play.example.net".to_string(),
        port: 25565,
        intent,
    })
    .encode(&mut bytes);
    bytes
}

/// Read one length-prefixed frame and return its body
pub async fn read_frame(stream: &mut TcpStream) -> Vec<u8> {
    let mut header = Vec::new();
    let length = loop {
        header.push(stream.read_u8().await.unwrap());
        match decode_varint(&header, 0) {
            Ok((length, _)) => break length,
            Err(e) if e.is_truncated() => continue,
            Err(e) => panic!("bad frame header: {}", e),
        }
    };
    let mut body = vec![0u8; usize::try_from(length).unwrap()];
    stream.read_exact(&mut body).await.unwrap();
    body
}

/// Read one frame carrying a JSON string and return `(packet_id, json)`
pub async fn read_json_frame(stream: &mut TcpStream) -> (i32, serde_json::Value) {
    let body = read_frame(stream).await;
    let (id, offset) = decode_varint(&body, 0).unwrap();
    let (json, _) = decode_string(&body, offset).unwrap();
    (id, serde_json::from_str(&json).unwrap())
}

pub async fn send(stream: &mut TcpStream, bytes: &[u8]) {
    stream.write_all(bytes).await.unwrap();
}
