//! Unix timestamps.
//!
//! The server stamps frames with fractional unix seconds while the client
//! keeps millisecond precision locally. [`Timestamp`] stores milliseconds and
//! converts at the serde boundary so both sides compare in one unit.
//!
//! Fractional seconds travel as JSON floats, which are exact to the
//! millisecond only up to about 2^52 / 2000 seconds. The wire therefore
//! carries timestamps between [`Timestamp::WIRE_MIN`] and
//! [`Timestamp::WIRE_MAX`] (roughly years -1200 to 5100); anything outside is
//! rejected in both directions rather than silently rounded.

use std::{fmt, time::Duration};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de, ser};

const WIRE_LIMIT_SECS: i64 = 100_000_000_000;

/// Unix time in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Earliest timestamp that crosses the wire.
    pub const WIRE_MIN: Self = Self(-WIRE_LIMIT_SECS * 1000);

    /// Latest timestamp that crosses the wire.
    pub const WIRE_MAX: Self = Self(WIRE_LIMIT_SECS * 1000);

    /// Timestamp from unix milliseconds.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Timestamp from (possibly fractional) unix seconds, rounded to the
    /// nearest millisecond.
    #[must_use]
    pub fn from_secs_f64(secs: f64) -> Self {
        Self((secs * 1000.0).round() as i64)
    }

    /// Unix milliseconds.
    #[must_use]
    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Unix seconds with millisecond fraction.
    #[must_use]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Absolute distance between two timestamps.
    #[must_use]
    pub fn abs_diff(self, other: Self) -> Duration {
        Duration::from_millis(self.0.abs_diff(other.0))
    }

    /// Timestamp shifted forward by `duration`, saturating.
    #[must_use]
    pub fn saturating_add(self, duration: Duration) -> Self {
        let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        Self(self.0.saturating_add(millis))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}", self.0.div_euclid(1000), self.0.rem_euclid(1000))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if *self < Self::WIRE_MIN || *self > Self::WIRE_MAX {
            return Err(ser::Error::custom(format!("timestamp {self} out of range")));
        }
        if self.0 % 1000 == 0 {
            serializer.serialize_i64(self.0 / 1000)
        } else {
            serializer.serialize_f64(self.as_secs_f64())
        }
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SecondsVisitor)
    }
}

struct SecondsVisitor;

impl de::Visitor<'_> for SecondsVisitor {
    type Value = Timestamp;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unix seconds as a number")
    }

    fn visit_i64<E: de::Error>(self, secs: i64) -> Result<Timestamp, E> {
        if !(-WIRE_LIMIT_SECS..=WIRE_LIMIT_SECS).contains(&secs) {
            return Err(E::custom("timestamp out of range"));
        }
        Ok(Timestamp(secs * 1000))
    }

    fn visit_u64<E: de::Error>(self, secs: u64) -> Result<Timestamp, E> {
        let secs = i64::try_from(secs).map_err(|_| E::custom("timestamp out of range"))?;
        self.visit_i64(secs)
    }

    fn visit_f64<E: de::Error>(self, secs: f64) -> Result<Timestamp, E> {
        if !secs.is_finite() {
            return Err(E::custom("timestamp is not finite"));
        }
        let ts = Timestamp::from_secs_f64(secs);
        if ts < Timestamp::WIRE_MIN || ts > Timestamp::WIRE_MAX {
            return Err(E::custom("timestamp out of range"));
        }
        Ok(ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractional_seconds_keep_millisecond_precision() {
        let ts: Timestamp = serde_json::from_str("1700000001.5").unwrap();
        assert_eq!(ts.as_millis(), 1_700_000_001_500);
    }

    #[test]
    fn whole_seconds_serialize_as_integers() {
        let json = serde_json::to_string(&Timestamp::from_millis(1_700_000_000_000)).unwrap();
        assert_eq!(json, "1700000000");

        let json = serde_json::to_string(&Timestamp::from_millis(1_700_000_000_250)).unwrap();
        assert_eq!(json, "1700000000.25");
    }

    #[test]
    fn fractional_seconds_round_trip_at_wire_limits() {
        for ts in [
            Timestamp::WIRE_MAX,
            Timestamp::from_millis(Timestamp::WIRE_MAX.as_millis() - 1),
            Timestamp::from_millis(Timestamp::WIRE_MIN.as_millis() + 1),
            Timestamp::from_millis(-1),
        ] {
            let json = serde_json::to_string(&ts).unwrap();
            assert_eq!(serde_json::from_str::<Timestamp>(&json).unwrap(), ts, "via {json}");
        }
    }

    #[test]
    fn timestamps_beyond_float_precision_are_refused() {
        // Past 2^53 the millisecond digit would be rounded away.
        let ts = Timestamp::from_millis(90_071_992_547_400_001);
        assert!(serde_json::to_string(&ts).is_err());
        assert!(serde_json::from_str::<Timestamp>("90071992547400.001").is_err());
        assert!(serde_json::from_str::<Timestamp>("9223372036854775807").is_err());
        assert!(serde_json::from_str::<Timestamp>("18446744073709551615").is_err());
    }

    #[test]
    fn rejects_non_numeric_timestamps() {
        assert!(serde_json::from_str::<Timestamp>("\"yesterday\"").is_err());
    }

    #[test]
    fn abs_diff_is_symmetric() {
        let a = Timestamp::from_millis(1_000);
        let b = Timestamp::from_millis(3_500);
        assert_eq!(a.abs_diff(b), Duration::from_millis(2_500));
        assert_eq!(b.abs_diff(a), Duration::from_millis(2_500));
    }
}
