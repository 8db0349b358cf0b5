//! # Height Noise
//!
//! Seeded multi-octave Perlin noise over the xz plane, used as the terrain
//! height field. Sampling is pure: the generator holds no mutable state after
//! construction.

use noise::{NoiseFn, Perlin, Seedable};

/// Largest coordinate magnitude the height field is tuned for. Inputs beyond
/// it still produce values, but they start repeating the permutation table.
pub const NOISE_DOMAIN_LIMIT: f64 = 256.0;

/// Frequency multiplier between consecutive octaves.
const LACUNARITY: f64 = 2.0;

pub struct HeightNoise {
    perlin: Perlin,
    octaves: u32,
    persistence: f64,
}

impl HeightNoise {
    pub fn new(seed: u32, octaves: u32, persistence: f64) -> Self {
        Self {
            perlin: Perlin::new(seed),
            octaves,
            persistence,
        }
    }

    pub fn seed(&self) -> u32 {
        self.perlin.seed()
    }

    /// Whether `(x, z)` lies inside the range the noise is tuned for.
    pub fn in_domain(x: f64, z: f64) -> bool {
        x.abs() <= NOISE_DOMAIN_LIMIT && z.abs() <= NOISE_DOMAIN_LIMIT
    }

    /// Samples the height field at pre-scaled coordinates.
    ///
    /// Octaves are summed with amplitudes `persistence^i` and the total is
    /// divided by the summed amplitudes, so the result stays in `[-1, 1]`.
    pub fn sample(&self, x: f64, z: f64) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut amplitude_sum = 0.0;

        for _ in 0..self.octaves {
            total += self.perlin.get([x * frequency, z * frequency]) * amplitude;
            amplitude_sum += amplitude;
            amplitude *= self.persistence;
            frequency *= LACUNARITY;
        }

        if amplitude_sum == 0.0 {
            return 0.0;
        }
        (total / amplitude_sum).clamp(-1.0, 1.0)
    }
}
