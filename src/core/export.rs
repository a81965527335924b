// src/core/export.rs
//
// JSON interchange for analysis results. Every helper returns None on
// failure and logs the cause instead of propagating it.

use std::fs;
use std::path::Path;

use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::EmfResult;

pub fn to_json<T: Serialize>(value: &T) -> Option<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| warn!("JSON serialization failed: {}", e))
        .ok()
}

pub fn from_json<T: DeserializeOwned>(json: &str) -> Option<T> {
    serde_json::from_str(json)
        .map_err(|e| warn!("JSON deserialization failed: {}", e))
        .ok()
}

/// Write `value` as pretty JSON, creating parent directories
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Option<()> {
    let write = || -> EmfResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(value)?)?;
        Ok(())
    };

    write()
        .map_err(|e| warn!("Failed to write {}: {}", path.display(), e))
        .ok()
}

pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let read = || -> EmfResult<T> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    };

    read()
        .map_err(|e| warn!("Failed to read {}: {}", path.display(), e))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analysis::{perform_clustering, ClusterResult};
    use crate::core::reading::EmfReading;

    #[test]
    fn test_cluster_result_string_round_trip() {
        let readings: Vec<EmfReading> = (0..3)
            .map(|i| EmfReading::at(i as f64 * 0.1, 0.0, 0.0, 500.0))
            .collect();
        let result = perform_clustering(&readings, 0.5, 2);

        let json = to_json(&result).unwrap();
        assert!(json.contains("silhouetteScore"));

        let back: ClusterResult = from_json(&json).unwrap();
        assert_eq!(back.clusters.len(), result.clusters.len());
        assert_eq!(back.noise_points.len(), result.noise_points.len());
    }

    #[test]
    fn test_malformed_json_is_none() {
        assert!(from_json::<ClusterResult>("{ not json").is_none());
    }

    #[test]
    fn test_missing_file_is_none() {
        let path = std::env::temp_dir().join("emfcheckr-does-not-exist.json");
        assert!(read_json_file::<ClusterResult>(&path).is_none());
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("emfcheckr-export-{}", uuid::Uuid::new_v4()))
            .join("clusters.json");

        assert!(write_json_file(&path, &ClusterResult::default()).is_some());
        let back: ClusterResult = read_json_file(&path).unwrap();
        assert_eq!(back, ClusterResult::default());

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
