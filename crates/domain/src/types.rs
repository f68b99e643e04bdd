//! Common data types used throughout the application

mod credential;
mod point;
mod window;

pub use credential::Credential;
pub use point::{FieldValue, Point, PointBuilder, DEVICE_TAG};
pub use window::DateWindow;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::impl_domain_status_conversions;

/// Failure class of a single upstream HTTP exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    RateLimited,
    Unauthorized,
    Server,
    Network,
    Client,
}

impl_domain_status_conversions!(FailureClass {
    RateLimited => "rate_limited",
    Unauthorized => "unauthorized",
    Server => "server",
    Network => "network",
    Client => "client",
});

/// Sampling resolution for intraday series, as written in the request path
/// and in configuration (`"1sec"`, `"1min"`, `"5min"`, `"15min"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailLevel {
    OneSecond,
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
}

impl_domain_status_conversions!(DetailLevel {
    OneSecond => "1sec",
    OneMinute => "1min",
    FiveMinutes => "5min",
    FifteenMinutes => "15min",
});

impl Serialize for DetailLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DetailLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
