use num_bigint::BigUint;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serializer};

/// Decode a hex string with an optional `0x` prefix.
pub fn decode_hex(value: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let trimmed = value.trim();
    let without_prefix = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if without_prefix.len() % 2 == 1 {
        hex::decode(format!("0{without_prefix}"))
    } else {
        hex::decode(without_prefix)
    }
}

/// `0x`-prefixed lowercase hex.
pub fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Fixed-width big-endian hex of `value`, left-padded to `width_bytes`.
pub fn biguint_to_fixed_hex(value: &BigUint, width_bytes: usize) -> Option<String> {
    let bytes = value.to_bytes_be();
    if bytes.len() > width_bytes {
        return None;
    }
    let mut padded = vec![0u8; width_bytes - bytes.len()];
    padded.extend_from_slice(&bytes);
    Some(encode_hex(&padded))
}

pub fn biguint_from_hex(value: &str) -> Result<BigUint, hex::FromHexError> {
    decode_hex(value).map(|bytes| BigUint::from_bytes_be(&bytes))
}

/// Serde helpers for encoding big integers as 0x-prefixed hex strings.
pub mod biguint_hex {
    use super::*;

    pub fn serialize<S>(value: &BigUint, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&encode_hex(&value.to_bytes_be()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<BigUint, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        biguint_from_hex(&s).map_err(DeError::custom)
    }
}

/// Serde helpers for raw byte buffers encoded as 0x-prefixed hex strings.
pub mod bytes_hex {
    use super::*;

    pub fn serialize<S>(value: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&encode_hex(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        decode_hex(&s).map_err(DeError::custom)
    }
}

/// Serde helpers for optional byte buffers.
pub mod option_bytes_hex {
    use super::*;

    pub fn serialize<S>(value: &Option<Vec<u8>>, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(bytes) => serializer.serialize_some(&encode_hex(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?;
        s.map(|s| decode_hex(&s).map_err(DeError::custom)).transpose()
    }
}

/// Serde helpers for durations expressed in whole milliseconds.
pub mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::serde::assert_round_trip_eq;
    use serde::Serialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        #[serde(with = "biguint_hex")]
        value: BigUint,
        #[serde(with = "bytes_hex")]
        payload: Vec<u8>,
        #[serde(with = "option_bytes_hex")]
        maybe: Option<Vec<u8>>,
    }

    #[test]
    fn sample_survives_json() {
        assert_round_trip_eq(&Sample {
            value: BigUint::from(0xdead_beefu64),
            payload: vec![1, 2, 3],
            maybe: Some(vec![0xff]),
        });
        assert_round_trip_eq(&Sample {
            value: BigUint::from(0u32),
            payload: Vec::new(),
            maybe: None,
        });
    }

    #[test]
    fn decode_accepts_prefix_and_odd_length() {
        assert_eq!(decode_hex("0xabc").unwrap(), vec![0x0a, 0xbc]);
        assert_eq!(decode_hex("  ff00 ").unwrap(), vec![0xff, 0x00]);
        assert!(decode_hex("0xzz").is_err());
    }

    #[test]
    fn fixed_hex_pads_and_rejects_overflow() {
        let value = BigUint::from(0x1234u32);
        assert_eq!(biguint_to_fixed_hex(&value, 4).unwrap(), "0x00001234");
        assert!(biguint_to_fixed_hex(&value, 1).is_none());
    }
}
