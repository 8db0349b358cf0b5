//! Save files for the terrain registry.
//!
//! A save file is a registry snapshot holding the entity table followed by the
//! `Position`, `BlockType` and `BoundingVolume` streams, in that order.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use log::{debug, info};

use super::{
    registry::{
        snapshot::{PersistenceError, Snapshot, SnapshotLoader},
        Registry,
    },
    voxels::{
        block::block_type::BlockType,
        components::{BoundingVolume, Position},
    },
};

/// Writes `registry` to `path`, replacing any existing file.
pub fn save_world(registry: &Registry, path: &Path) -> Result<(), PersistenceError> {
    let mut writer = BufWriter::new(File::create(path)?);
    Snapshot::new(registry, &mut writer)
        .entities()?
        .component::<Position>()?
        .component::<BlockType>()?
        .component::<BoundingVolume>()?;
    writer.flush()?;

    info!("Saved {} entities to {}", registry.len(), path.display());
    Ok(())
}

/// Replaces the contents of `registry` with the world saved at `path`.
///
/// Returns `Ok(false)` without touching the registry when the file cannot be
/// opened. A file that opens but does not decode is an error, and the registry
/// may be left partially filled.
pub fn load_world(registry: &mut Registry, path: &Path) -> Result<bool, PersistenceError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            debug!("No saved world at {}: {}", path.display(), err);
            return Ok(false);
        }
    };

    SnapshotLoader::new(registry, BufReader::new(file))
        .entities()?
        .component::<Position>()?
        .component::<BlockType>()?
        .component::<BoundingVolume>()?;

    info!("Loaded {} entities from {}", registry.len(), path.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("voxel-instancing-{}-{}.bin", name, std::process::id()))
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let mut registry = Registry::new();
        let path = temp_path("missing");
        let _ = std::fs::remove_file(&path);

        assert!(!load_world(&mut registry, &path).unwrap());
        assert!(registry.is_empty());
    }

    #[test]
    fn save_then_load_keeps_every_component() {
        let mut registry = Registry::new();
        let block = registry.create();
        registry.insert(block, Position::new(0.5, 1.5, -0.5)).unwrap();
        registry.insert(block, BlockType::Cobblestone).unwrap();
        registry.insert(block, BoundingVolume::unit_block()).unwrap();
        let marker = registry.create();
        registry.insert(marker, Position::new(9.0, 9.0, 9.0)).unwrap();

        let path = temp_path("round-trip");
        save_world(&registry, &path).unwrap();
        let mut restored = Registry::new();
        let loaded = load_world(&mut restored, &path);
        let _ = std::fs::remove_file(&path);

        assert!(loaded.unwrap());
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.get::<BlockType>(block), Some(&BlockType::Cobblestone));
        assert_eq!(
            restored.get::<BoundingVolume>(block),
            Some(&BoundingVolume::unit_block())
        );
        assert_eq!(
            restored.get::<Position>(marker),
            Some(&Position::new(9.0, 9.0, 9.0))
        );
        assert!(!restored.has::<BlockType>(marker));
    }

    #[test]
    fn garbage_file_is_a_decode_error() {
        let path = temp_path("garbage");
        std::fs::write(&path, [0xFF; 5]).unwrap();

        let mut registry = Registry::new();
        let result = load_world(&mut registry, &path);
        let _ = std::fs::remove_file(&path);

        assert!(matches!(result, Err(PersistenceError::Decode(_))));
    }
}
