use core::fmt;

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, Visitor},
};

use crate::{Block, Suid};

/// Serializes as the canonical base-36 string.
impl Serialize for Suid {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&self.encode())
    }
}

/// Accepts the canonical base-36 string or a non-negative integer.
impl<'de> Deserialize<'de> for Suid {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        d.deserialize_any(SuidVisitor)
    }
}

impl Serialize for Block {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.first().serialize(s)
    }
}

impl<'de> Deserialize<'de> for Block {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let first = Suid::deserialize(d)?;
        Self::new(first).map_err(de::Error::custom)
    }
}

struct SuidVisitor;

impl Visitor<'_> for SuidVisitor {
    type Value = Suid;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a base-36 suid string or an integer up to 2^53 - 1")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Suid::decode(v).map_err(E::custom)
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Suid::new(v).map_err(E::custom)
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        let v = u64::try_from(v).map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))?;
        self.visit_u64(v)
    }
}

/// Serializes a [`Suid`] as its native integer instead of the canonical
/// string, for use with `#[serde(with = "suid::as_native")]`.
pub mod as_native {
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

    use crate::Suid;

    /// # Errors
    ///
    /// Returns an error if the underlying serializer fails.
    pub fn serialize<S>(id: &Suid, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        id.to_raw().serialize(s)
    }

    /// # Errors
    ///
    /// Returns an error if the underlying deserializer fails or the value
    /// exceeds [`MAX_SAFE`](crate::MAX_SAFE).
    pub fn deserialize<'de, D>(d: D) -> Result<Suid, D::Error>
    where
        D: Deserializer<'de>,
    {
        let n = u64::deserialize(d)?;
        Suid::new(n).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::as_native;
    use crate::{Block, Error, Suid};

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    struct Row {
        id: Suid,
    }

    #[test]
    fn serializes_as_canonical_text() {
        let row = Row {
            id: Suid::new(1_903_154).unwrap(),
        };
        assert_eq!(serde_json::to_value(&row).unwrap(), json!({ "id": "14she" }));
        let back: Row = serde_json::from_value(json!({ "id": "14she" })).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn deserializes_from_integers() {
        let row: Row = serde_json::from_value(json!({ "id": 1000 })).unwrap();
        assert_eq!(row.id.to_raw(), 1000);
        assert!(serde_json::from_value::<Row>(json!({ "id": -1 })).is_err());
    }

    #[test]
    fn rejects_values_past_max_safe() {
        let err = serde_json::from_value::<Row>(json!({ "id": 1_u64 << 53 })).unwrap_err();
        assert_eq!(
            err.to_string(),
            Error::OutOfRange { value: 1 << 53 }.to_string()
        );
        assert!(serde_json::from_value::<Row>(json!({ "id": "2gosa7pa2gw" })).is_err());
    }

    #[test]
    fn native_integer_form() {
        #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
        struct Native {
            #[serde(with = "as_native")]
            id: Suid,
        }
        let native = Native {
            id: Suid::new(42).unwrap(),
        };
        assert_eq!(serde_json::to_string(&native).unwrap(), r#"{"id":42}"#);
        assert_eq!(serde_json::from_str::<Native>(r#"{"id":42}"#).unwrap(), native);
    }

    #[test]
    fn blocks_use_their_first_id() {
        let block = Block::from_raw(1000).unwrap();
        assert_eq!(serde_json::to_value(block).unwrap(), json!("rs"));
        assert_eq!(serde_json::from_value::<Block>(json!("rs")).unwrap(), block);
    }
}
