//! Saving and loading map buffers
//!
//! A persisted map is nothing but the flat byte buffer. The only
//! validation possible, the exact byte length, is therefore mandatory: a
//! file of the wrong length was saved for a different map scale and
//! loading it partially would corrupt everything derived from it.

use std::fs;
use std::path::Path;

use log::info;

use crate::config::ConfigError;
use crate::slam::state::MapSnapshot;

/// Load a persisted map, insisting on exactly `expected_pixels` per side
pub fn load_map<P: AsRef<Path>>(path: P, expected_pixels: usize) -> Result<MapSnapshot, ConfigError> {
    let bytes = fs::read(&path)?;
    let expected = expected_pixels * expected_pixels;
    if bytes.len() != expected {
        return Err(ConfigError::MapSizeMismatch {
            expected,
            actual: bytes.len(),
        });
    }

    info!(
        "loaded {}x{} map from {}",
        expected_pixels,
        expected_pixels,
        path.as_ref().display()
    );
    Ok(MapSnapshot::new(bytes).expect("validated square buffer"))
}

/// Persist a map snapshot as a flat byte file
pub fn save_map<P: AsRef<Path>>(path: P, map: &MapSnapshot) -> Result<(), ConfigError> {
    fs::write(&path, map.bytes())?;
    info!(
        "saved {0}x{0} map to {1}",
        map.size(),
        path.as_ref().display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_preserves_bytes() {
        let dir = std::env::temp_dir().join("rover_core_map_roundtrip");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("map.bin");

        let original = MapSnapshot::new((0..16).map(|v| v as u8 * 10).collect()).unwrap();
        save_map(&path, &original).unwrap();
        let loaded = load_map(&path, 4).unwrap();

        assert_eq!(loaded, original);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn wrong_length_file_is_fatal() {
        let dir = std::env::temp_dir().join("rover_core_map_badlen");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("map.bin");
        fs::write(&path, vec![0u8; 100]).unwrap();

        let result = load_map(&path, 4);
        assert!(matches!(
            result,
            Err(ConfigError::MapSizeMismatch {
                expected: 16,
                actual: 100
            })
        ));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_surfaces_io_error() {
        let result = load_map("/nonexistent/rover/map.bin", 4);
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
