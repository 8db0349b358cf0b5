//! # Terrain Builder
//!
//! Turns the height field into block entities: one column per grid cell,
//! filled from `min_height` up to the column's surface.
//!
//! ## Layout
//!
//! The grid is centered on the origin, so with an even width the column
//! centers land on half-integer x and z. Block centers along y sit on
//! half-integers too, which puts every block face on a whole number. The top
//! block of a column is `Grass`, everything below it is `Dirt`.

use log::{info, warn};

use crate::{
    config::TerrainConfig,
    engine_state::registry::{Registry, RegistryError},
};

use super::{
    block::{block_type::BlockType, BLOCK_HALF_LENGTH},
    components::Position,
    height_noise::HeightNoise,
};

/// Generates terrain into a registry from a fixed seed.
pub struct TerrainBuilder {
    config: TerrainConfig,
    noise: HeightNoise,
}

impl TerrainBuilder {
    /// Creates a builder for `config`, drawing a random seed if none is set.
    pub fn new(config: &TerrainConfig) -> Self {
        let seed = config.seed.unwrap_or_else(|| fastrand::u32(..));
        Self {
            config: config.clone(),
            noise: HeightNoise::new(seed, config.octaves, config.persistence),
        }
    }

    pub fn seed(&self) -> u32 {
        self.noise.seed()
    }

    /// Integer surface height of the column at grid cell `(x, z)`.
    pub fn surface_level(&self, x: u32, z: u32) -> f32 {
        let (nx, nz) = self.noise_input(x, z);
        let height = self.noise.sample(nx, nz) as f32 * self.config.amplitude
            + self.config.median_height;
        height.round()
    }

    /// Clears `registry` and fills it with terrain. Returns the number of
    /// blocks created.
    ///
    /// Every block gets its `Position` first and its `BlockType` second, so
    /// joint-construct observers see the pair complete on the second insert.
    pub fn generate(&self, registry: &mut Registry) -> Result<usize, RegistryError> {
        registry.clear();

        let (max_x, max_z) = self.noise_input(
            self.config.width.saturating_sub(1),
            self.config.depth.saturating_sub(1),
        );
        if !HeightNoise::in_domain(max_x, max_z) {
            warn!(
                "Noise input reaches ({}, {}), outside the tuned domain; terrain may repeat",
                max_x, max_z
            );
        }

        let half_width = self.config.width as f32 / 2.0;
        let half_depth = self.config.depth as f32 / 2.0;
        let mut blocks = 0;

        for x in 0..self.config.width {
            for z in 0..self.config.depth {
                let surface = surface_position(self.surface_level(x, z));
                let center_x = x as f32 + BLOCK_HALF_LENGTH - half_width;
                let center_z = z as f32 + BLOCK_HALF_LENGTH - half_depth;

                let bottom = self.config.min_height + BLOCK_HALF_LENGTH;
                for layer in 0..layer_count(bottom, surface) {
                    let y = bottom + layer as f32;
                    let entity = registry.create();
                    registry.insert(entity, Position::new(center_x, y, center_z))?;
                    let block_type = if y < surface {
                        BlockType::Dirt
                    } else {
                        BlockType::Grass
                    };
                    registry.insert(entity, block_type)?;
                    blocks += 1;
                }
            }
        }

        info!(
            "Generated {}x{} terrain with seed {}: {} blocks",
            self.config.width,
            self.config.depth,
            self.seed(),
            blocks
        );
        Ok(blocks)
    }

    fn noise_input(&self, x: u32, z: u32) -> (f64, f64) {
        (
            x as f64 * self.config.noise_scale,
            z as f64 * self.config.noise_scale,
        )
    }
}

/// Center height of the top block of a column whose surface is `level`.
/// A level of zero has no top block.
fn surface_position(level: f32) -> f32 {
    let sign = if level > 0.0 {
        1.0
    } else if level < 0.0 {
        -1.0
    } else {
        0.0
    };
    level + sign * BLOCK_HALF_LENGTH
}

/// Number of block centers `bottom, bottom + 1, ...` that do not pass `surface`.
fn layer_count(bottom: f32, surface: f32) -> u32 {
    if surface < bottom {
        return 0;
    }
    (surface - bottom).floor() as u32 + 1
}
