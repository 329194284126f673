pub mod media;
pub mod platform;
pub mod post;
pub mod settings;
pub mod template;

use derive_where::derive_where;
use rand::Rng;
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{Error, Unexpected},
    ser::Error as _,
};
use std::{
    fmt::{Display, Formatter},
    marker::PhantomData,
    str::FromStr,
};
use thiserror::Error;
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, format_description::well_known::Rfc3339,
    macros::format_description,
};

pub const ID_RANDOM_LEN: usize = 4;
const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("An id must not be empty")]
pub struct InvalidIdError;

/// Writer-assigned record identifier, scoped to one kind by `Marker`.
#[derive_where(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct Id<Marker>(String, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    pub fn new(id: impl Into<String>) -> Result<Self, InvalidIdError> {
        let id = id.into();
        if id.is_empty() {
            Err(InvalidIdError)
        } else {
            Ok(Self(id, PhantomData))
        }
    }

    /// Base-36 milliseconds since the unix epoch followed by a short random suffix.
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_at(OffsetDateTime::now_utc())
    }

    #[must_use]
    pub fn generate_at(time: OffsetDateTime) -> Self {
        let millis = u64::try_from(time.unix_timestamp_nanos() / 1_000_000).unwrap_or_default();

        let mut id = to_base36(millis);
        let mut rng = rand::rng();
        for _ in 0..ID_RANDOM_LEN {
            id.push(char::from(BASE36_DIGITS[rng.random_range(0..BASE36_DIGITS.len())]));
        }

        Self(id, PhantomData)
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

fn to_base36(mut value: u64) -> String {
    let mut digits = Vec::new();
    loop {
        #[allow(clippy::cast_possible_truncation)]
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
        if value == 0 {
            break;
        }
    }
    digits.iter().rev().map(|&digit| char::from(digit)).collect()
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> FromStr for Id<Marker> {
    type Err = InvalidIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de, Marker> Deserialize<'de> for Id<Marker> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Id::new(inner).map_err(|_| Error::invalid_value(Unexpected::Str(""), &"non-empty id"))
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Not a valid timestamp: {0:?}")]
pub struct InvalidTimestampError(String);

/// A point in time as written by the front end.
///
/// The offset of the original text is kept, so [`Timestamp::date`] is the
/// calendar date that the stored string starts with.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct Timestamp(OffsetDateTime);

impl Timestamp {
    #[must_use]
    pub fn new(time: OffsetDateTime) -> Self {
        Self(time)
    }

    #[must_use]
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    #[must_use]
    pub fn get(self) -> OffsetDateTime {
        self.0
    }

    #[must_use]
    pub fn date(self) -> Date {
        self.0.date()
    }
}

impl FromStr for Timestamp {
    type Err = InvalidTimestampError;

    /// Accepts RFC 3339, or a `datetime-local` style value without offset,
    /// which is read as UTC.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(time) = OffsetDateTime::parse(s, &Rfc3339) {
            return Ok(Self(time));
        }

        let local_minutes = format_description!("[year]-[month]-[day]T[hour]:[minute]");
        let local_seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
        PrimitiveDateTime::parse(s, local_minutes)
            .or_else(|_| PrimitiveDateTime::parse(s, local_seconds))
            .map(|time| Self(time.assume_utc()))
            .map_err(|_| InvalidTimestampError(s.to_owned()))
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let formatted = self.0.format(&Rfc3339).map_err(|_| std::fmt::Error)?;
        f.write_str(&formatted)
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = self.0.format(&Rfc3339).map_err(S::Error::custom)?;
        serializer.serialize_str(&formatted)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        inner
            .parse()
            .map_err(|_| Error::invalid_value(Unexpected::Str(&inner), &"RFC 3339 timestamp"))
    }
}

/// Missing, empty and unparseable values all read as `None`.
pub(crate) fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|value| value.parse().ok()))
}
