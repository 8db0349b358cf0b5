//! Binary snapshots of a `Registry`.
//!
//! A snapshot is a sequence of bincode-encoded streams: first the entity table,
//! then one stream per component type, in whatever order the caller chooses.
//! Loading must request the same component types in the same order. There is
//! no header or version field.
//!
//! ```ignore
//! Snapshot::new(&registry, writer)
//!     .entities()?
//!     .component::<Position>()?
//!     .component::<BlockType>()?;
//! ```

use std::io::{Read, Write};

use log::error;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use super::{Component, Entity, EntitySlot, Registry};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("save file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode registry: {0}")]
    Encode(#[source] bincode::Error),

    #[error("failed to decode registry: {0}")]
    Decode(#[source] bincode::Error),

    #[error("component stream references entity {0}, which is not in the entity table")]
    UnknownEntity(Entity),
}

/// Writes registry streams to an archive.
pub struct Snapshot<'a, W: Write> {
    registry: &'a Registry,
    archive: W,
}

impl<'a, W: Write> Snapshot<'a, W> {
    pub fn new(registry: &'a Registry, archive: W) -> Self {
        Self { registry, archive }
    }

    /// Writes the entity table: one slot per index ever handed out.
    pub fn entities(&mut self) -> Result<&mut Self, PersistenceError> {
        bincode::serialize_into(&mut self.archive, self.registry.slots())
            .map_err(PersistenceError::Encode)?;
        Ok(self)
    }

    /// Writes every `(entity, component)` pair of type `T`.
    pub fn component<T: Component + Serialize>(&mut self) -> Result<&mut Self, PersistenceError> {
        let pairs: Vec<(Entity, &T)> = self.registry.view::<T>().collect();
        bincode::serialize_into(&mut self.archive, &pairs).map_err(PersistenceError::Encode)?;
        Ok(self)
    }
}

/// Reads registry streams back from an archive.
pub struct SnapshotLoader<'a, R: Read> {
    registry: &'a mut Registry,
    archive: R,
}

impl<'a, R: Read> SnapshotLoader<'a, R> {
    pub fn new(registry: &'a mut Registry, archive: R) -> Self {
        Self { registry, archive }
    }

    /// Replaces the registry's entity table with the archived one.
    pub fn entities(&mut self) -> Result<&mut Self, PersistenceError> {
        let slots: Vec<EntitySlot> =
            bincode::deserialize_from(&mut self.archive).map_err(PersistenceError::Decode)?;
        self.registry.restore_slots(slots);
        Ok(self)
    }

    /// Attaches every archived component of type `T`. Hooks subscribed to `T`
    /// fire for each attached component.
    pub fn component<T: Component + DeserializeOwned>(
        &mut self,
    ) -> Result<&mut Self, PersistenceError> {
        let pairs: Vec<(Entity, T)> =
            bincode::deserialize_from(&mut self.archive).map_err(PersistenceError::Decode)?;
        for (entity, value) in pairs {
            if self.registry.insert(entity, value).is_err() {
                error!("Snapshot component for {} has no live entity", entity);
                return Err(PersistenceError::UnknownEntity(entity));
            }
        }
        Ok(self)
    }
}
