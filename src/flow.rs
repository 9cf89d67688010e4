//! The export flow: load images, build the cube document, write the GLB.
//!
//! The stages run strictly one after another. [`build_document`] is the
//! filesystem-free middle part and takes already-resized textures, which
//! keeps the geometry, material and scene stages testable on their own.

use anyhow::Context;
use log::{info, warn};

use crate::{
    config::CubeConfig,
    data_structures::{
        document::{Document, ElementType, Handle, Material, Primitive, Scene},
        geometry::{CubeGeometry, position_bounds},
        texture::{CubeTextures, TextureImage},
    },
    glb::{self, ModelSummary},
    resources::{load_binary, load_cube_textures},
    transform::unpartition,
};

/// Materials created for a cube, one per source image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CubeMaterials {
    pub top: Handle<Material>,
    pub front: Handle<Material>,
    pub side: Handle<Material>,
}

fn create_textured_material(
    doc: &mut Document,
    name: &str,
    image: &TextureImage,
) -> anyhow::Result<Handle<Material>> {
    let texture = doc.create_texture(&image.name, image.bytes.clone(), &image.mime_type)?;
    doc.create_material(name, texture)
}

/// Wrap each texture image and bind it to its own named material.
pub fn assign_materials(
    doc: &mut Document,
    textures: &CubeTextures,
) -> anyhow::Result<CubeMaterials> {
    Ok(CubeMaterials {
        top: create_textured_material(doc, "topMaterial", &textures.top)?,
        front: create_textured_material(doc, "frontMaterial", &textures.front)?,
        side: create_textured_material(doc, "sideMaterial", &textures.side)?,
    })
}

/// Add the cube primitive, its mesh, node and scene, and make that scene the default.
///
/// Each accessor gets a buffer of its own; [`unpartition`] merges them later.
pub fn assemble_scene(
    doc: &mut Document,
    geometry: &CubeGeometry,
    material: Handle<Material>,
) -> anyhow::Result<Handle<Scene>> {
    let position_buffer = doc.create_buffer("positions");
    let positions = doc.create_accessor(
        position_buffer,
        ElementType::Vec3,
        geometry.positions.as_flattened(),
    )?;
    let (min, max) = position_bounds(&geometry.positions);
    doc.set_accessor_bounds(positions, &min, &max)?;

    let index_buffer = doc.create_buffer("indices");
    let indices = doc.create_accessor(index_buffer, ElementType::Scalar, geometry.indices.as_slice())?;

    let tex_coord_buffer = doc.create_buffer("texcoords");
    let tex_coords = doc.create_accessor(
        tex_coord_buffer,
        ElementType::Vec2,
        geometry.tex_coords.as_flattened(),
    )?;

    let mut primitive = Primitive::new();
    primitive
        .set_attribute("POSITION", positions)
        .set_indices(indices)
        .set_attribute("TEXCOORD_0", tex_coords)
        .set_material(material);

    let mesh = doc.create_mesh(Some("cube"));
    doc.add_primitive(mesh, primitive)?;
    let node = doc.create_node(Some("cube"), mesh);
    let scene = doc.create_scene(None);
    doc.add_child(scene, node)?;
    doc.set_default_scene(scene)?;
    Ok(scene)
}

/// Build the complete, still partitioned, cube document from resized textures.
pub fn build_document(textures: &CubeTextures) -> anyhow::Result<Document> {
    let mut doc = Document::new();
    let materials = assign_materials(&mut doc, textures)?;
    // Only the front image ends up on the cube.
    assemble_scene(&mut doc, &CubeGeometry::new(), materials.front)?;

    let unbound: Vec<&str> = doc
        .unbound_materials()
        .into_iter()
        .filter_map(|handle| doc.material(handle))
        .map(|material| material.name.as_str())
        .collect();
    if !unbound.is_empty() {
        warn!("materials {:?} are exported but not bound to any primitive", unbound);
    }
    Ok(doc)
}

/// Run the whole export described by `config`.
///
/// Nothing is written unless all three images loaded and the document
/// serialized. The written file is read back and summarized.
pub async fn run(config: &CubeConfig) -> anyhow::Result<ModelSummary> {
    let textures = load_cube_textures(config).await?;
    let mut doc = build_document(&textures)?;
    info!(
        "assembled document: {} accessors in {} buffers, {} materials",
        doc.accessors().len(),
        doc.buffers().len(),
        doc.materials().len()
    );

    unpartition(&mut doc);
    let written = glb::write_glb(&doc, &config.output).await?;
    info!("wrote {} bytes to {}", written, config.output.display());

    let bytes = load_binary(&config.output)
        .await
        .with_context(|| format!("failed to read back {}", config.output.display()))?;
    glb::read_glb(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::texture::PNG_MIME_TYPE;

    fn texture(name: &str) -> TextureImage {
        TextureImage {
            name: name.to_string(),
            bytes: vec![0x89, b'P', b'N', b'G'],
            mime_type: PNG_MIME_TYPE.to_string(),
            width: 512,
            height: 512,
        }
    }

    fn textures() -> CubeTextures {
        CubeTextures {
            top: texture("top"),
            front: texture("front"),
            side: texture("side"),
        }
    }

    #[test]
    fn should_name_three_materials() {
        let mut doc = Document::new();
        let materials = assign_materials(&mut doc, &textures()).unwrap();
        assert_eq!(doc.material(materials.top).unwrap().name, "topMaterial");
        assert_eq!(doc.material(materials.front).unwrap().name, "frontMaterial");
        assert_eq!(doc.material(materials.side).unwrap().name, "sideMaterial");
        assert!(doc.textures().iter().all(|t| t.mime_type == "image/png"));
    }

    #[test]
    fn should_bind_only_the_front_material() {
        let doc = build_document(&textures()).unwrap();
        let mesh = &doc.meshes()[0];
        let front = mesh.primitives[0].material.unwrap();
        assert_eq!(doc.material(front).unwrap().name, "frontMaterial");

        let unbound: Vec<_> = doc
            .unbound_materials()
            .into_iter()
            .map(|handle| doc.material(handle).unwrap().name.clone())
            .collect();
        assert_eq!(unbound, vec!["topMaterial", "sideMaterial"]);
    }

    #[test]
    fn should_compose_one_of_each_and_mark_default_scene() {
        let doc = build_document(&textures()).unwrap();
        assert_eq!(doc.meshes().len(), 1);
        assert_eq!(doc.meshes()[0].primitives.len(), 1);
        assert_eq!(doc.nodes().len(), 1);
        assert_eq!(doc.scenes().len(), 1);

        let scene = doc.default_scene().unwrap();
        let node = doc.scene(scene).unwrap().children[0];
        let mesh = doc.node(node).unwrap().mesh.unwrap();
        let mesh = doc.mesh(mesh).unwrap();
        assert_eq!(mesh.name.as_deref(), Some("cube"));
        assert_eq!(mesh.primitives.len(), 1);
    }

    #[test]
    fn should_declare_element_types_matching_the_data() {
        let doc = build_document(&textures()).unwrap();
        let primitive = &doc.meshes()[0].primitives[0];

        let positions = doc.accessor(primitive.attributes["POSITION"]).unwrap();
        assert_eq!(positions.element_type, ElementType::Vec3);
        assert_eq!(positions.count(), 8);
        assert_eq!(positions.min.as_deref(), Some(&[-0.5f32; 3][..]));

        let tex_coords = doc.accessor(primitive.attributes["TEXCOORD_0"]).unwrap();
        assert_eq!(tex_coords.element_type, ElementType::Vec2);
        assert_eq!(tex_coords.count(), 8);

        let indices = doc.accessor(primitive.indices.unwrap()).unwrap();
        assert_eq!(indices.element_type, ElementType::Scalar);
        assert_eq!(indices.count(), 36);
    }

    #[test]
    fn should_keep_one_buffer_per_accessor_until_unpartitioned() {
        let mut doc = build_document(&textures()).unwrap();
        assert_eq!(doc.buffers().len(), 3);
        unpartition(&mut doc);
        assert_eq!(doc.buffers().len(), 1);
    }
}
