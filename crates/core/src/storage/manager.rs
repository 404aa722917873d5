use std::path::Path;
use tracing::debug;

use crate::errors::CoreError;
use crate::models::rate::RateCache;

use super::format;

/// Save/load the rate cache to/from bytes or files.
///
/// Only the current rate and the historical rate table are persisted;
/// negative entries for unresolved days live in memory only.
pub struct StorageManager;

impl StorageManager {
    /// Flow: RateCache → bincode → PVRC header + payload
    pub fn save_to_bytes(cache: &RateCache) -> Result<Vec<u8>, CoreError> {
        let payload = bincode::serialize(cache)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize rate cache: {e}")))?;
        Ok(format::write_file(format::CURRENT_VERSION, &payload))
    }

    /// Flow: PVRC bytes → parse header → bincode → RateCache
    pub fn load_from_bytes(data: &[u8]) -> Result<RateCache, CoreError> {
        let (header, payload) = format::read_file(data)?;
        debug!(version = header.version, bytes = header.payload_len, "Loading rate cache");
        let cache: RateCache = bincode::deserialize(payload).map_err(|e| {
            CoreError::Deserialization(format!("Failed to deserialize rate cache: {e}"))
        })?;
        Ok(cache)
    }

    pub fn save_to_file(cache: &RateCache, path: impl AsRef<Path>) -> Result<(), CoreError> {
        let bytes = Self::save_to_bytes(cache)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<RateCache, CoreError> {
        let bytes = std::fs::read(path)?;
        Self::load_from_bytes(&bytes)
    }
}
