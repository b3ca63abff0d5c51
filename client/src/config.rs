//! Client session configuration.

use std::time::Duration;

use crate::error::ClientError;

pub const DEFAULT_URL: &str = "ws://127.0.0.1:3001/api/ws";
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Hub websocket endpoint.
    pub url: String,
    pub board_id: String,
    pub token: String,
    /// Fixed wait between a lost transport and the next attempt.
    pub reconnect_delay: Duration,
    /// Attempts after a loss before the session goes offline.
    pub max_reconnect_attempts: u32,
    /// Session events buffered before new ones are dropped.
    pub event_capacity: usize,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("url", &self.url)
            .field("board_id", &self.board_id)
            .field("token", &"<redacted>")
            .field("reconnect_delay", &self.reconnect_delay)
            .field("max_reconnect_attempts", &self.max_reconnect_attempts)
            .field("event_capacity", &self.event_capacity)
            .finish()
    }
}

impl SessionConfig {
    #[must_use]
    pub fn new(url: impl Into<String>, board_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            board_id: board_id.into(),
            token: token.into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Build config for a board from environment variables.
    ///
    /// Optional:
    /// - `BOARD_SYNC_URL`: default [`DEFAULT_URL`]
    /// - `BOARD_SYNC_RECONNECT_DELAY_MS`: default 3000
    /// - `BOARD_SYNC_MAX_RECONNECT_ATTEMPTS`: default 5
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] if a numeric variable does not parse.
    pub fn from_env(board_id: impl Into<String>, token: impl Into<String>) -> Result<Self, ClientError> {
        Self::from_lookup(board_id, token, |key| std::env::var(key).ok())
    }

    fn from_lookup(
        board_id: impl Into<String>,
        token: impl Into<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ClientError> {
        let url = lookup("BOARD_SYNC_URL").filter(|v| !v.is_empty()).unwrap_or_else(|| DEFAULT_URL.to_owned());
        let mut config = Self::new(url, board_id, token);

        if let Some(raw) = lookup("BOARD_SYNC_RECONNECT_DELAY_MS") {
            let ms = raw
                .parse::<u64>()
                .map_err(|_| ClientError::InvalidConfig { var: "BOARD_SYNC_RECONNECT_DELAY_MS", value: raw })?;
            config.reconnect_delay = Duration::from_millis(ms);
        }
        if let Some(raw) = lookup("BOARD_SYNC_MAX_RECONNECT_ATTEMPTS") {
            config.max_reconnect_attempts = raw
                .parse()
                .map_err(|_| ClientError::InvalidConfig { var: "BOARD_SYNC_MAX_RECONNECT_ATTEMPTS", value: raw })?;
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}
