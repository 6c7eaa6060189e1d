//! Deterministic surrogate key derivation.
//!
//! Every hub key, link key and satellite hashdiff in the warehouse is a
//! name-based UUID (RFC 4122 version 5): the first 16 bytes of
//! `SHA-1(namespace_bytes || seed_utf8)`, with the version nibble set to `5`
//! and the variant bits set to `10`. The namespace is [`KEY_NAMESPACE`] for
//! every derivation.
//!
//! Rules:
//! - Equal seeds give equal ids, across calls, processes and deployments.
//! - No randomness and no clock input.
//! - Link seeds are `"{left}{right}"` over the hyphenated lowercase form of
//!   the two hub ids. Operand order is part of the key.
//! - Hashdiff seeds are the hub id followed by each tracked attribute, each
//!   attribute preceded by [`ATTRIBUTE_SEPARATOR`].

use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace shared by every surrogate, link and hashdiff derivation.
///
/// Changing this value re-keys the whole warehouse.
pub const KEY_NAMESPACE: Uuid = Uuid::from_u128(0x1234_5678_1234_5678_1234_5678_1234_5678);

/// Separator placed before each attribute of a hashdiff seed (ASCII unit separator).
pub const ATTRIBUTE_SEPARATOR: char = '\u{1f}';

/// A stable identifier standing in for a natural business key.
///
/// Serializes as the hyphenated lowercase UUID string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurrogateId(Uuid);

impl SurrogateId {
    /// Derive the id for a natural key.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordervault_core::key::SurrogateId;
    ///
    /// let id = SurrogateId::derive("u1");
    /// assert_eq!(id.to_string(), "0f9e1d07-7a1a-53bf-b2d0-e5d137cc35d4");
    /// assert_eq!(id, SurrogateId::derive("u1"));
    /// ```
    #[must_use]
    pub fn derive(seed: &str) -> Self {
        Self(Uuid::new_v5(&KEY_NAMESPACE, seed.as_bytes()))
    }

    /// Derive a link key from two hub ids, left operand first.
    #[must_use]
    pub fn link(left: Self, right: Self) -> Self {
        Self::derive(&format!("{left}{right}"))
    }

    /// Derive a satellite hashdiff over a hub id and its tracked attributes.
    #[must_use]
    pub fn hashdiff(hub: Self, attributes: &[&str]) -> Self {
        let mut seed = hub.to_string();
        for attribute in attributes {
            seed.push(ATTRIBUTE_SEPARATOR);
            seed.push_str(attribute);
        }
        Self::derive(&seed)
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

/// Free-function form of [`SurrogateId::derive`].
#[must_use]
pub fn derive(seed: &str) -> SurrogateId {
    SurrogateId::derive(seed)
}

impl fmt::Display for SurrogateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl FromStr for SurrogateId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

// Stored as TEXT in the warehouse.
impl ToSql for SurrogateId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for SurrogateId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vectors_are_stable() {
        assert_eq!(
            derive("u1").to_string(),
            "0f9e1d07-7a1a-53bf-b2d0-e5d137cc35d4"
        );
        assert_eq!(
            derive("p1").to_string(),
            "6375cdd9-b837-5ac9-a4d6-ae200d4e6059"
        );
        assert_eq!(
            derive("o1").to_string(),
            "cc389e55-834a-5432-86f8-df05e9abfc70"
        );
        assert_eq!(derive("").to_string(), "d687edb1-27fb-5c25-bf30-1b2242e53884");
    }

    #[test]
    fn derived_ids_are_version_five() {
        assert_eq!(derive("c1").as_uuid().get_version_num(), 5);
    }

    #[test]
    fn link_concatenates_left_then_right() {
        let order = derive("o1");
        let product = derive("p1");

        let link = SurrogateId::link(order, product);
        assert_eq!(link.to_string(), "73311c28-2df3-5dfc-9424-99831ad0615a");
        assert_eq!(link, derive(&format!("{order}{product}")));
    }

    #[test]
    fn link_operand_order_matters() {
        let order = derive("o1");
        let product = derive("p1");

        let swapped = SurrogateId::link(product, order);
        assert_eq!(swapped.to_string(), "adf4dc1d-caa5-5107-ac2b-f8820f4f15b6");
        assert_ne!(SurrogateId::link(order, product), swapped);
    }

    #[test]
    fn hashdiff_separates_attributes() {
        let hub = derive("u1");
        assert_ne!(
            SurrogateId::hashdiff(hub, &["ab", "c"]),
            SurrogateId::hashdiff(hub, &["a", "bc"])
        );
    }

    #[test]
    fn hashdiff_is_scoped_to_hub() {
        assert_ne!(
            SurrogateId::hashdiff(derive("u1"), &["same"]),
            SurrogateId::hashdiff(derive("u2"), &["same"])
        );
    }

    #[test]
    fn display_round_trips_through_from_str() {
        let id = derive("r1");
        let parsed: SurrogateId = id.to_string().parse().expect("parse id");
        assert_eq!(parsed, id);
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&derive("u1")).expect("serialize");
        assert_eq!(json, "\"0f9e1d07-7a1a-53bf-b2d0-e5d137cc35d4\"");
    }
}
