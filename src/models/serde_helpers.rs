//! Serde bridges between domain types and their BSON representations.

/// Persists a `rust_decimal::Decimal` as a BSON `Decimal128` so that Mongo
/// aggregations (`$sum`) operate on a real decimal type instead of a string.
pub mod decimal_as_decimal128 {
    use mongodb::bson::Decimal128;
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de, ser};
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        let raw = Decimal128::from_str(&value.to_string()).map_err(ser::Error::custom)?;
        raw.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        let raw = Decimal128::deserialize(deserializer)?;
        Decimal::from_str(&raw.to_string()).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::decimal_as_decimal128;
    use mongodb::bson;
    use rust_decimal::Decimal;
    use serde::{Deserialize, Serialize};
    use std::str::FromStr;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Wrapper {
        #[serde(with = "decimal_as_decimal128")]
        amount: Decimal,
    }

    #[test]
    fn round_trips_through_bson() {
        let original = Wrapper {
            amount: Decimal::from_str("-2030.50").unwrap(),
        };
        let doc = bson::to_document(&original).unwrap();
        let restored: Wrapper = bson::from_document(doc).unwrap();
        assert_eq!(restored.amount, original.amount);
    }
}
