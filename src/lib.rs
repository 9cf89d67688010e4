//! cube-glb
//!
//! Builds a textured cube from three images and exports it as a single
//! binary glTF (`.glb`) file. The export is a short linear flow: the images
//! are loaded and resized, the cube geometry and materials are put into an
//! in-memory document, the document's buffers are merged and the result is
//! serialized.
//!
//! High-level modules
//! - `config`: input/output paths and texture sizing for one export
//! - `data_structures`: the glTF document model, cube geometry and textures
//! - `flow`: the export stages and the end-to-end `run`
//! - `glb`: GLB serialization and read-back
//! - `resources`: helpers to load and resize source images
//! - `transform`: document transforms applied before writing
//!

pub mod config;
pub mod data_structures;
pub mod flow;
pub mod glb;
pub mod resources;
pub mod transform;

// Re-exports commonly used types for convenience in downstream code.
pub use config::{CubeConfig, ResizeFit};
pub use data_structures::document::Document;
pub use flow::{build_document, run};
pub use glb::{ModelSummary, read_glb, to_glb, write_glb};
