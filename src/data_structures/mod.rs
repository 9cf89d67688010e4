//! Exporter data structures: the glTF document, the cube geometry and textures.
//!
//! - `document` holds the scene graph, accessors, materials and buffers
//! - `geometry` contains the hand-authored cube and its triangulation
//! - `texture` contains encoded images ready to be embedded

pub mod document;
pub mod geometry;
pub mod texture;
