//! Macro for implementing Display and FromStr for label enums
//!
//! Used for enums that appear in config values, URL path segments and log
//! fields, where the string form is fixed and parsing should be
//! case-insensitive.
//!
//! # Example
//!
//! ```rust
//! use vitalsync_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum SinkState {
//!     Idle,
//!     Writing,
//! }
//!
//! impl_domain_status_conversions!(SinkState {
//!     Idle => "idle",
//!     Writing => "writing",
//! });
//!
//! assert_eq!(SinkState::Writing.to_string(), "writing");
//! ```

/// Implements Display and FromStr traits for label enums
///
/// - Display writes the mapped string verbatim
/// - FromStr matches case-insensitively against the mapped strings
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
