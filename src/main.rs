//! # Voxel Instancing Entry Point
//!
//! Calls into the library's `run()` function, which restores or generates the
//! terrain, refreshes one frame of instance data and saves the world.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release -- [config.json]
//! ```

fn main() {
    voxel_instancing::run();
}
