//! Test doubles for the ports.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, missing_docs)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prohero_domain::{HttpRequest, HttpResponse, TokenRecord, session::keys};
use serde_json::{Value, json};

use crate::api::ApiClient;
use crate::auth::{AuthService, TokenManager};
use crate::services::{ProviderService, UserService};
use crate::session::SessionController;
use crate::ports::{Clock, HttpTransport, KeyValueStore, StorageError, TransportError};

pub const BASE_URL: &str = "https://api.test";
pub const T0: i64 = 1_700_000_000_000;

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn at(millis: i64) -> Arc<Self> {
        Arc::new(Self {
            millis: AtomicI64::new(millis),
        })
    }

    pub fn advance(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap()
    }
}

/// In-memory store with switchable write failures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::other("disk full")));
        }
        self.insert(key, value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

type Scripted = Result<HttpResponse, TransportError>;

/// Transport answering from per-path queues. The last queued answer for a
/// path repeats; unknown paths answer 404.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Scripted>>>,
    requests: Mutex<Vec<HttpRequest>>,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, path: &str, status: u16, body: Value) {
        self.push(path, Ok(HttpResponse::json(status, &body)));
    }

    pub fn respond_raw(&self, path: &str, status: u16, body: &str) {
        self.push(path, Ok(HttpResponse::new(status, body)));
    }

    pub fn fail(&self, path: &str, error: TransportError) {
        self.push(path, Err(error));
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    fn push(&self, path: &str, answer: Scripted) {
        self.routes
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(answer);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.ends_with(path))
            .count()
    }

    pub fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.ends_with(path))
            .cloned()
            .collect()
    }

    fn answer(&self, url: &str) -> Scripted {
        let mut routes = self.routes.lock().unwrap();
        let queue = routes.iter_mut().find(|(path, _)| url.ends_with(path.as_str()));
        match queue {
            Some((_, queue)) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some((_, queue)) if !queue.is_empty() => queue.front().cloned().unwrap(),
            _ => Ok(HttpResponse::json(404, &json!({"message": "Not Found"}))),
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.answer(&url)
    }
}

pub fn envelope(access: &str, refresh: &str, expires_in: u64) -> Value {
    json!({
        "success": true,
        "message": "OK",
        "data": {
            "accessToken": access,
            "refreshToken": refresh,
            "expiresIn": expires_in,
            "tokenType": "Bearer",
            "user": {
                "id": 11,
                "phone": "9876543210",
                "firstName": "Asha",
                "lastName": "Rao",
                "isPhoneVerified": true
            }
        }
    })
}

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub secure: Arc<MemoryStore>,
    pub local: Arc<MemoryStore>,
    pub transport: Arc<ScriptedTransport>,
    pub tokens: TokenManager,
}

impl Harness {
    pub fn new() -> Self {
        let clock = ManualClock::at(T0);
        let secure = MemoryStore::new();
        let local = MemoryStore::new();
        let transport = ScriptedTransport::new();
        let tokens = TokenManager::new(
            secure.clone(),
            transport.clone(),
            clock.clone(),
            BASE_URL,
        );
        Self {
            clock,
            secure,
            local,
            transport,
            tokens,
        }
    }

    /// Persists a token record as if an earlier run had stored it.
    pub fn persist_token(&self, access: &str, refresh: &str, expires_in: u64) -> TokenRecord {
        let record = TokenRecord::new(access, refresh, "Bearer", expires_in).stamped(T0);
        self.secure.insert(
            keys::TOKEN_DATA,
            &serde_json::to_string(&record).unwrap(),
        );
        self.secure.insert(keys::ACCESS_TOKEN, access);
        self.secure.insert(keys::REFRESH_TOKEN, refresh);
        record
    }

    pub fn api(&self) -> ApiClient {
        ApiClient::new(self.tokens.clone(), self.transport.clone(), BASE_URL)
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(self.api())
    }

    pub fn session(&self) -> SessionController {
        let api = self.api();
        SessionController::new(
            self.tokens.clone(),
            UserService::new(api.clone()),
            ProviderService::new(api),
            self.secure.clone(),
            self.local.clone(),
            self.clock.clone(),
        )
    }
}
