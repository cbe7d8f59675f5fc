//! Serde helpers serializing byte vectors as hex strings in human-readable
//! formats and as raw bytes otherwise. Use via `#[serde(with = "serde_bytes")]`.

use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    if serializer.is_human_readable() {
        serializer.serialize_str(&faster_hex::hex_string(bytes))
    } else {
        serializer.serialize_bytes(bytes)
    }
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    use serde::de::Error;
    if deserializer.is_human_readable() {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        let mut bytes = vec![0u8; s.len() / 2];
        faster_hex::hex_decode(s.as_bytes(), &mut bytes).map_err(D::Error::custom)?;
        Ok(bytes)
    } else {
        serde::de::Deserialize::deserialize(deserializer)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Eq, Debug)]
    struct Payload {
        #[serde(with = "super")]
        data: Vec<u8>,
    }

    #[test]
    fn test_hex_round_trip() {
        let payload = Payload { data: vec![0xde, 0xad, 0xbe, 0xef] };
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"data":"deadbeef"}"#);
        assert_eq!(payload, serde_json::from_str(&json).unwrap());
    }

    #[test]
    fn test_binary_round_trip() {
        let payload = Payload { data: vec![1, 2, 3] };
        let bin = bincode::serialize(&payload).unwrap();
        assert_eq!(payload, bincode::deserialize(&bin).unwrap());
    }
}
