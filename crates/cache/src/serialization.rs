//! Serializer strategies for dataset payloads
//!
//! The cache core is format-agnostic: a serializer only has to convert a
//! dataset map to and from bytes and name the file extension it owns.

use saveback_core::{DatasetMap, Error, Result, SerializationOp};

/// Two-way byte conversion for a dataset map, with a fixed file extension.
pub trait Serializer: Send + Sync {
    /// File extension for payloads in this format, including the dot
    fn extension(&self) -> &'static str;

    /// Encode a dataset map to bytes
    fn to_bytes(&self, map: &DatasetMap) -> Result<Vec<u8>>;

    /// Decode a dataset map from bytes
    fn from_bytes(&self, bytes: &[u8]) -> Result<DatasetMap>;
}

/// JSON payloads (`.json`), human-readable
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn extension(&self) -> &'static str {
        ".json"
    }

    fn to_bytes(&self, map: &DatasetMap) -> Result<Vec<u8>> {
        serde_json::to_vec(map)
            .map_err(|e| Error::serialization_with_source("json", SerializationOp::Encode, e))
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<DatasetMap> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::serialization_with_source("json", SerializationOp::Decode, e))
    }
}

/// Compact binary payloads (`.bin`) via bincode
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeSerializer;

impl Serializer for BincodeSerializer {
    fn extension(&self) -> &'static str {
        ".bin"
    }

    fn to_bytes(&self, map: &DatasetMap) -> Result<Vec<u8>> {
        bincode::serialize(map)
            .map_err(|e| Error::serialization_with_source("bincode", SerializationOp::Encode, e))
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<DatasetMap> {
        bincode::deserialize(bytes)
            .map_err(|e| Error::serialization_with_source("bincode", SerializationOp::Decode, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use saveback_core::Value;

    fn sample_map() -> DatasetMap {
        let mut map = DatasetMap::new();
        map.insert("gold".to_string(), Value::Int(100));
        map.insert("ratio".to_string(), Value::Float(0.25));
        map.insert("tags".to_string(), Value::TextList(vec!["a".to_string()]));
        map
    }

    #[test]
    fn test_json_round_trip() {
        let serializer = JsonSerializer;
        let bytes = serializer.to_bytes(&sample_map()).unwrap();
        assert_eq!(serializer.from_bytes(&bytes).unwrap(), sample_map());
    }

    #[test]
    fn test_bincode_round_trip() {
        let serializer = BincodeSerializer;
        let bytes = serializer.to_bytes(&sample_map()).unwrap();
        assert_eq!(serializer.from_bytes(&bytes).unwrap(), sample_map());
    }

    #[test]
    fn test_json_rejects_garbage() {
        let serializer = JsonSerializer;
        assert!(serializer.from_bytes(b"not json at all").is_err());
    }

    #[test]
    fn test_extensions_are_distinct() {
        assert_eq!(JsonSerializer.extension(), ".json");
        assert_eq!(BincodeSerializer.extension(), ".bin");
    }
}
