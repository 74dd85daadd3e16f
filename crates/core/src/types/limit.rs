//! Plan caps on stores, products and managers.
//!
//! On the wire and in the database a cap is an integer where `-1` means
//! unlimited (`maxProducts: -1`).

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Wire/database sentinel for an unlimited cap.
pub const UNLIMITED: i32 = -1;

/// A numeric entitlement cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Limit {
    /// No cap.
    Unlimited,
    /// At most this many.
    Max(u32),
}

/// What a [`Limit`] is counting, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LimitKind {
    Stores,
    Products,
    Managers,
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stores => f.write_str("stores"),
            Self::Products => f.write_str("active products"),
            Self::Managers => f.write_str("store managers"),
        }
    }
}

/// A cap was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("plan allows at most {limit} {kind}")]
pub struct LimitError {
    /// What was being counted.
    pub kind: LimitKind,
    /// The cap in force.
    pub limit: u32,
}

impl Limit {
    /// Convert from the `-1`-sentinel integer representation.
    ///
    /// Any negative value is treated as unlimited.
    #[must_use]
    pub fn from_i32(value: i32) -> Self {
        u32::try_from(value).map_or(Self::Unlimited, Self::Max)
    }

    /// Convert to the `-1`-sentinel integer representation.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Unlimited => UNLIMITED,
            Self::Max(n) => i32::try_from(n).unwrap_or(i32::MAX),
        }
    }

    /// Check whether one more item may be added when `current` already exist.
    ///
    /// # Errors
    ///
    /// Returns [`LimitError`] when `current` has already reached the cap.
    pub const fn check(self, current: u64, kind: LimitKind) -> Result<(), LimitError> {
        match self {
            Self::Unlimited => Ok(()),
            Self::Max(limit) if current < limit as u64 => Ok(()),
            Self::Max(limit) => Err(LimitError { kind, limit }),
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlimited => f.write_str("unlimited"),
            Self::Max(n) => write!(f, "{n}"),
        }
    }
}

impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.as_i32())
    }
}

impl<'de> Deserialize<'de> for Limit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i32::deserialize(deserializer).map(Self::from_i32)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Limit {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i32 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i32 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Limit {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <i32 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::from_i32(raw))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Limit {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i32 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_i32(), buf)
    }
}
