//! Serde adapters for human-readable durations in configuration.

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use std::{fmt, time::Duration};

/// Serde functions for `Duration` accepting seconds or strings such as `"30s"` and `"1h30m"`
pub mod duration {
    use super::*;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration_str = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&duration_str)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(DurationVisitor)
    }
}

/// Serde functions for `Option<Duration>`
pub mod option_duration {
    use super::*;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => {
                let duration_str = humantime::format_duration(*d).to_string();
                serializer.serialize_some(&duration_str)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OptionDurationVisitor;

        impl<'de> Visitor<'de> for OptionDurationVisitor {
            type Value = Option<Duration>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter
                    .write_str("null or a duration as seconds (number) or human-readable string")
            }

            fn visit_none<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(None)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                deserializer.deserialize_any(DurationVisitor).map(Some)
            }
        }

        deserializer.deserialize_option(OptionDurationVisitor)
    }
}

struct DurationVisitor;

impl<'de> Visitor<'de> for DurationVisitor {
    type Value = Duration;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str(
            "a duration as seconds (number) or human-readable string (e.g., '500ms', '5m', '1h30m')",
        )
    }

    fn visit_u64<E>(self, seconds: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Duration::from_secs(seconds))
    }

    fn visit_i64<E>(self, seconds: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        u64::try_from(seconds)
            .map(Duration::from_secs)
            .map_err(|_| de::Error::custom(format!("Negative duration: {seconds}")))
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        humantime::parse_duration(value)
            .map_err(|e| de::Error::custom(format!("Invalid duration '{value}': {e}")))
    }
}
