//! Shared test harness: in-memory stores, a recording dispatcher, and
//! cheap Argon2 parameters.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use tg_auth::store::{CredentialStore, MemoryCredentialStore, MemoryTokenStore, TokenStore};
use tg_auth::service::Argon2Config;
use tg_auth::{AuthError, AuthService, PasswordService, Token, TokenIssuer, TokenKind};
use tg_notify::{Notification, NotificationDispatcher, NotifyError};

pub const CONFIRM_BASE: &str = "http://auth.test/confirm";

/// Records every notification instead of delivering it.
pub struct RecordingDispatcher {
    sent: parking_lot::Mutex<Vec<Notification>>,
    failing: AtomicBool,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self {
            sent: parking_lot::Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Token at the end of the most recent confirmation link.
    pub fn last_confirm_token(&self) -> Option<String> {
        self.sent
            .lock()
            .last()
            .and_then(|n| n.message.rsplit('/').next().map(str::to_string))
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn send(&self, recipient: &str, text: &str) -> tg_notify::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Transport("broker unreachable".to_string()));
        }
        self.sent.lock().push(Notification::new(recipient, text));
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Token store that delegates to memory but can fail a chosen upcoming write.
pub struct FaultyTokenStore {
    inner: Arc<MemoryTokenStore>,
    /// Writes left before the failing one; 0 means disarmed.
    countdown: AtomicUsize,
}

impl FaultyTokenStore {
    pub fn new(inner: Arc<MemoryTokenStore>) -> Self {
        Self {
            inner,
            countdown: AtomicUsize::new(0),
        }
    }

    /// Fail the `nth` `create_token` call from now (1 is the next one).
    pub fn fail_write(&self, nth: usize) {
        self.countdown.store(nth, Ordering::SeqCst);
    }
}

#[async_trait]
impl TokenStore for FaultyTokenStore {
    async fn create_token(&self, token: &Token) -> tg_auth::error::Result<()> {
        let previous = self
            .countdown
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .unwrap_or(0);
        if previous == 1 {
            return Err(AuthError::Storage(sqlx::Error::PoolTimedOut));
        }
        self.inner.create_token(token).await
    }

    async fn get_token(&self, value: &str) -> tg_auth::error::Result<Token> {
        self.inner.get_token(value).await
    }
}

pub struct Harness {
    pub service: Arc<AuthService>,
    pub users: Arc<MemoryCredentialStore>,
    pub tokens: Arc<MemoryTokenStore>,
    pub token_faults: Arc<FaultyTokenStore>,
    pub passwords: PasswordService,
    pub dispatcher: Arc<RecordingDispatcher>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_workers(2)
    }

    /// Harness whose password service runs at most `workers` hashes at once.
    pub fn with_workers(workers: usize) -> Self {
        let users = Arc::new(MemoryCredentialStore::new());
        let tokens = Arc::new(MemoryTokenStore::new());
        let token_faults = Arc::new(FaultyTokenStore::new(tokens.clone()));
        let dispatcher = Arc::new(RecordingDispatcher::new());

        let issuer = TokenIssuer::new(
            16,
            Duration::from_secs(60),
            Duration::from_secs(3600),
            Duration::from_secs(86400),
        );
        let passwords = PasswordService::new(
            Argon2Config {
                memory_kib: 8,
                iterations: 1,
                parallelism: 1,
            },
            workers,
        )
        .unwrap();

        let service = Arc::new(AuthService::new(
            users.clone(),
            token_faults.clone(),
            issuer,
            passwords.clone(),
            dispatcher.clone(),
            CONFIRM_BASE,
        ));

        Self {
            service,
            users,
            tokens,
            token_faults,
            passwords,
            dispatcher,
        }
    }

    /// Sign up and confirm `username`, returning its sign-in token values
    /// as (refresh, access).
    pub async fn confirmed_user(&self, username: &str, password: &str) -> (String, String) {
        self.service.sign_up(username, password, "+15550100").await.unwrap();
        let confirm = self.dispatcher.last_confirm_token().unwrap();
        self.service.confirm(&confirm).await.unwrap();
        let pair = self.service.sign_in(username, password).await.unwrap();
        (pair.refresh_token.value, pair.access_token.value)
    }

    /// Store a token of `kind` for `username` that expired a minute ago.
    pub async fn expired_token(&self, kind: TokenKind, username: &str) -> String {
        let token = Token {
            value: format!("expired-{}-{}", kind, username),
            expires_at: Utc::now() - chrono::Duration::minutes(1),
            kind,
            username: username.to_string(),
        };
        self.tokens.create_token(&token).await.unwrap();
        token.value
    }

    pub async fn grant(&self, username: &str, permissions: &[&str]) {
        let set = permissions.iter().map(|p| p.to_string()).collect();
        self.users.set_permissions(username, &set).await.unwrap();
    }
}
