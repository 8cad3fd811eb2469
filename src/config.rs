//! Engine and connection configuration.

use crate::codec::{Connect, Property, Version, Will};
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use serde::Deserialize;

/// Configuration errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The JSON document could not be parsed.
    Parse,
    /// A field is out of range. Names the field.
    Invalid(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse => write!(f, "malformed configuration"),
            Error::Invalid(field) => write!(f, "invalid value for `{}`", field),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Parse => defmt::write!(f, "Parse"),
            Error::Invalid(field) => defmt::write!(f, "Invalid({=str})", field),
        }
    }
}

/// Delivery engine tuning.
///
/// ```rust
/// use libmqtt::config::EngineConfig;
/// use libmqtt::codec::Version;
///
/// let config = EngineConfig::from_json(r#"{"inflight_window": 1, "version": 5}"#).unwrap();
/// assert_eq!(config.inflight_window, 1);
/// assert_eq!(config.queue_capacity, 1000);
/// assert_eq!(config.version, Version::V5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum QoS 1/2 messages awaiting acknowledgment at once.
    pub inflight_window: u16,
    /// Maximum messages held by the engine, queued and inflight together.
    pub queue_capacity: u16,
    /// Age after which an unacknowledged frame is resent, and the period of
    /// the retry scan.
    pub retry_interval_ms: u64,
    /// Protocol version frames are encoded with.
    pub version: Version,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            inflight_window: 10,
            queue_capacity: 1000,
            retry_interval_ms: 5_000,
            version: Version::V311,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let (config, _): (Self, usize) =
            serde_json_core::from_str(json).map_err(|_| Error::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field is in range.
    pub fn validate(&self) -> Result<(), Error> {
        if self.inflight_window == 0 {
            return Err(Error::Invalid("inflight_window"));
        }
        if self.queue_capacity == 0 {
            return Err(Error::Invalid("queue_capacity"));
        }
        if self.retry_interval_ms == 0 {
            return Err(Error::Invalid("retry_interval_ms"));
        }
        Ok(())
    }
}

/// Client connect options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Protocol version.
    pub version: Version,
    /// The client identifier, must be unique per broker. Also keys the session
    /// store.
    pub client_id: String,
    /// The keep-alive time in seconds.
    pub keep_alive_seconds: u16,
    /// Whether to start a clean session. A clean session discards queued and
    /// persisted messages at connect time; otherwise they are replayed.
    pub clean_session: bool,
    /// Optional last will.
    pub will: Option<Will>,
    /// Optional user name.
    pub username: Option<String>,
    /// Optional password.
    pub password: Option<Vec<u8>>,
    /// CONNECT properties (v5).
    pub properties: Vec<Property>,
}

impl Options {
    /// Options for `client_id` with a 60 second keep-alive and a clean session.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            version: Version::V311,
            client_id: client_id.into(),
            keep_alive_seconds: 60,
            clean_session: true,
            will: None,
            username: None,
            password: None,
            properties: Vec::new(),
        }
    }

    /// Build the CONNECT frame.
    ///
    /// ```rust
    /// use libmqtt::config::Options;
    ///
    /// let mut options = Options::new("sensor-1");
    /// options.clean_session = false;
    /// let connect = options.to_connect();
    /// assert_eq!(connect.client_id, "sensor-1");
    /// assert!(!connect.clean_session);
    /// ```
    pub fn to_connect(&self) -> Connect {
        Connect {
            version: self.version,
            client_id: self.client_id.clone(),
            keep_alive: self.keep_alive_seconds,
            clean_session: self.clean_session,
            will: self.will.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            properties: self.properties.clone(),
        }
    }
}
