//! Binary glTF (GLB) serialization.
//!
//! [`to_glb`] lowers a [`Document`] onto `gltf::json` and packs every accessor
//! and embedded image into a single BIN chunk. [`read_glb`] goes the other
//! way and is used to check what actually ended up in a written file.

use std::{borrow::Cow, collections::BTreeMap, collections::HashSet, path::Path};

use anyhow::{Context, Result, bail, ensure};
use gltf::json::{
    self,
    validation::{Checked::Valid, USize64},
};
use image::GenericImageView;

use crate::data_structures::document::{
    Accessor, ComponentType, Document, ElementType, Handle, Primitive,
};

const GLB_HEADER_LEN: usize = 12;
const GLB_CHUNK_HEADER_LEN: usize = 8;
const GENERATOR: &str = concat!("cube-glb ", env!("CARGO_PKG_VERSION"));

fn align_to_four(len: usize) -> usize {
    (len + 3) & !3
}

/// Appends byte ranges to the BIN chunk and records one buffer view per range.
struct BinChunk {
    buffer: json::Index<json::Buffer>,
    data: Vec<u8>,
}

impl BinChunk {
    fn push_view(
        &mut self,
        root: &mut json::Root,
        bytes: &[u8],
        target: Option<json::buffer::Target>,
    ) -> json::Index<json::buffer::View> {
        self.data.resize(align_to_four(self.data.len()), 0);
        let offset = self.data.len();
        self.data.extend_from_slice(bytes);
        root.push(json::buffer::View {
            buffer: self.buffer,
            byte_length: USize64::from(bytes.len()),
            byte_offset: Some(USize64::from(offset)),
            byte_stride: None,
            name: None,
            target: target.map(Valid),
            extensions: Default::default(),
            extras: Default::default(),
        })
    }
}

fn element_type(element_type: ElementType) -> json::accessor::Type {
    match element_type {
        ElementType::Scalar => json::accessor::Type::Scalar,
        ElementType::Vec2 => json::accessor::Type::Vec2,
        ElementType::Vec3 => json::accessor::Type::Vec3,
    }
}

fn component_type(component_type: ComponentType) -> json::accessor::ComponentType {
    match component_type {
        ComponentType::F32 => json::accessor::ComponentType::F32,
        ComponentType::U16 => json::accessor::ComponentType::U16,
    }
}

fn semantic(name: &str) -> Result<json::mesh::Semantic> {
    let semantic = match name {
        "POSITION" => json::mesh::Semantic::Positions,
        _ => match name.strip_prefix("TEXCOORD_") {
            Some(set) => json::mesh::Semantic::TexCoords(
                set.parse()
                    .with_context(|| format!("bad texture coordinate set in {name}"))?,
            ),
            None => bail!("unsupported attribute semantic {name}"),
        },
    };
    Ok(semantic)
}

fn bounds(values: &Option<Vec<f32>>) -> Option<json::Value> {
    values.as_ref().map(|values| json::Value::from(values.clone()))
}

fn push_accessor(
    root: &mut json::Root,
    bin: &mut BinChunk,
    accessor: &Accessor,
    target: Option<json::buffer::Target>,
) -> json::Index<json::Accessor> {
    let view = bin.push_view(root, accessor.bytes(), target);
    root.push(json::Accessor {
        buffer_view: Some(view),
        byte_offset: Some(USize64(0)),
        count: USize64::from(accessor.count()),
        component_type: Valid(json::accessor::GenericComponentType(component_type(
            accessor.component_type,
        ))),
        type_: Valid(element_type(accessor.element_type)),
        min: bounds(&accessor.min),
        max: bounds(&accessor.max),
        name: None,
        normalized: false,
        sparse: None,
        extensions: Default::default(),
        extras: Default::default(),
    })
}

fn lower_primitive(
    document: &Document,
    primitive: &Primitive,
    accessors: &[json::Index<json::Accessor>],
    materials: &[json::Index<json::Material>],
) -> Result<json::mesh::Primitive> {
    let resolve = |handle: Handle<Accessor>| {
        accessors
            .get(handle.index())
            .copied()
            .with_context(|| format!("primitive refers to unknown {:?}", handle))
    };

    let mut attributes = BTreeMap::new();
    for (name, accessor) in &primitive.attributes {
        attributes.insert(Valid(semantic(name)?), resolve(*accessor)?);
    }
    let indices = primitive.indices.map(resolve).transpose()?;
    let material = primitive
        .material
        .map(|handle| {
            ensure!(
                document.material(handle).is_some(),
                "primitive refers to unknown {:?}",
                handle
            );
            Ok(materials[handle.index()])
        })
        .transpose()?;

    Ok(json::mesh::Primitive {
        attributes,
        indices,
        material,
        mode: Valid(json::mesh::Mode::Triangles),
        targets: None,
        extensions: Default::default(),
        extras: Default::default(),
    })
}

/// Build the glTF JSON and BIN chunk for `document` and pack them as GLB.
///
/// The document has to be unpartitioned first. Every handle stored in the
/// scene graph must resolve, otherwise nothing is produced.
pub fn to_glb(document: &Document) -> Result<Vec<u8>> {
    ensure!(
        document.buffers().len() <= 1,
        "document has {} buffers, a GLB holds exactly one; unpartition it first",
        document.buffers().len()
    );

    let mut root = json::Root::default();
    root.asset.generator = Some(GENERATOR.to_string());

    let buffer_name = document.buffers().first().map(|buffer| buffer.name.clone());
    let mut bin = BinChunk {
        buffer: root.push(json::Buffer {
            byte_length: USize64(0),
            name: buffer_name,
            uri: None,
            extensions: Default::default(),
            extras: Default::default(),
        }),
        data: Vec::new(),
    };

    // Views get a target only when the accessor is actually drawn.
    let mut index_accessors = HashSet::new();
    let mut vertex_accessors = HashSet::new();
    for primitive in document.meshes().iter().flat_map(|mesh| mesh.primitives.iter()) {
        index_accessors.extend(primitive.indices.map(Handle::index));
        vertex_accessors.extend(primitive.attributes.values().map(|handle| handle.index()));
    }

    let mut accessors = Vec::with_capacity(document.accessors().len());
    for (index, accessor) in document.accessors().iter().enumerate() {
        ensure!(
            document.buffer(accessor.buffer).is_some(),
            "accessor {index} refers to unknown {:?}",
            accessor.buffer
        );
        let target = if index_accessors.contains(&index) {
            Some(json::buffer::Target::ElementArrayBuffer)
        } else if vertex_accessors.contains(&index) {
            Some(json::buffer::Target::ArrayBuffer)
        } else {
            None
        };
        accessors.push(push_accessor(&mut root, &mut bin, accessor, target));
    }

    let mut textures = Vec::with_capacity(document.textures().len());
    for texture in document.textures() {
        let view = bin.push_view(&mut root, &texture.image, None);
        let image = root.push(json::Image {
            buffer_view: Some(view),
            mime_type: Some(json::image::MimeType(texture.mime_type.clone())),
            name: Some(texture.name.clone()),
            uri: None,
            extensions: Default::default(),
            extras: Default::default(),
        });
        textures.push(root.push(json::Texture {
            name: Some(texture.name.clone()),
            sampler: None,
            source: image,
            extensions: Default::default(),
            extras: Default::default(),
        }));
    }

    let mut materials = Vec::with_capacity(document.materials().len());
    for material in document.materials() {
        let base_color_texture = material
            .base_color_texture
            .map(|handle| {
                let index = textures.get(handle.index()).copied().with_context(|| {
                    format!("material {} refers to unknown {:?}", material.name, handle)
                })?;
                Ok::<_, anyhow::Error>(json::texture::Info {
                    index,
                    tex_coord: 0,
                    extensions: Default::default(),
                    extras: Default::default(),
                })
            })
            .transpose()?;
        materials.push(root.push(json::Material {
            name: Some(material.name.clone()),
            pbr_metallic_roughness: json::material::PbrMetallicRoughness {
                base_color_texture,
                ..Default::default()
            },
            ..Default::default()
        }));
    }

    let mut meshes = Vec::with_capacity(document.meshes().len());
    for mesh in document.meshes() {
        let primitives = mesh
            .primitives
            .iter()
            .map(|primitive| lower_primitive(document, primitive, &accessors, &materials))
            .collect::<Result<Vec<_>>>()?;
        meshes.push(root.push(json::Mesh {
            name: mesh.name.clone(),
            primitives,
            weights: None,
            extensions: Default::default(),
            extras: Default::default(),
        }));
    }

    let mut nodes = Vec::with_capacity(document.nodes().len());
    for node in document.nodes() {
        let mesh = node
            .mesh
            .map(|handle| {
                meshes
                    .get(handle.index())
                    .copied()
                    .with_context(|| format!("node refers to unknown {:?}", handle))
            })
            .transpose()?;
        nodes.push(root.push(json::Node {
            name: node.name.clone(),
            mesh,
            ..Default::default()
        }));
    }

    let mut scenes = Vec::with_capacity(document.scenes().len());
    for scene in document.scenes() {
        let children = scene
            .children
            .iter()
            .map(|handle| {
                nodes
                    .get(handle.index())
                    .copied()
                    .with_context(|| format!("scene refers to unknown {:?}", handle))
            })
            .collect::<Result<Vec<_>>>()?;
        scenes.push(root.push(json::Scene {
            name: scene.name.clone(),
            nodes: children,
            extensions: Default::default(),
            extras: Default::default(),
        }));
    }
    root.scene = document
        .default_scene()
        .map(|handle| {
            scenes
                .get(handle.index())
                .copied()
                .with_context(|| format!("default scene is unknown {:?}", handle))
        })
        .transpose()?;

    let mut bin_data = bin.data;
    bin_data.resize(align_to_four(bin_data.len()), 0);
    if bin_data.is_empty() {
        root.buffers.clear();
    } else {
        root.buffers[0].byte_length = USize64::from(bin_data.len());
    }

    let mut json_data = json::serialize::to_string(&root)
        .context("failed to encode glTF JSON")?
        .into_bytes();
    // JSON chunk is padded with spaces
    json_data.resize(align_to_four(json_data.len()), b' ');

    let mut length = GLB_HEADER_LEN + GLB_CHUNK_HEADER_LEN + json_data.len();
    if !bin_data.is_empty() {
        length += GLB_CHUNK_HEADER_LEN + bin_data.len();
    }
    log::debug!(
        "packing GLB: {} bytes JSON, {} bytes BIN, {} bytes total",
        json_data.len(),
        bin_data.len(),
        length
    );

    let glb = gltf::binary::Glb {
        header: gltf::binary::Header {
            magic: *b"glTF",
            version: 2,
            length: u32::try_from(length).context("GLB exceeds 4 GiB")?,
        },
        json: Cow::Owned(json_data),
        bin: (!bin_data.is_empty()).then_some(Cow::Owned(bin_data)),
    };
    Ok(glb.to_vec()?)
}

/// Serialize `document` and write it to `path`.
///
/// The file is only touched once serialization has fully succeeded.
/// Returns the number of bytes written.
pub async fn write_glb(document: &Document, path: &Path) -> Result<usize> {
    let bytes = to_glb(document).context("failed to serialize document")?;
    tokio::fs::write(path, &bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(bytes.len())
}

/// What a GLB file contains, as far as the cube exporter cares.
///
/// Geometry is read from the first primitive of the first mesh reachable
/// from the default scene.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelSummary {
    pub scene_count: usize,
    pub node_count: usize,
    pub mesh_count: usize,
    pub primitive_count: usize,
    pub default_scene: Option<usize>,
    pub default_scene_nodes: Vec<usize>,
    pub positions: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub index_type: Option<gltf::accessor::DataType>,
    pub material_names: Vec<String>,
    pub bound_material: Option<String>,
    pub bound_texture_name: Option<String>,
    pub bound_texture_size: Option<(u32, u32)>,
}

/// Parse a GLB and decode the parts [`ModelSummary`] describes.
pub fn read_glb(bytes: &[u8]) -> Result<ModelSummary> {
    let gltf = gltf::Gltf::from_slice(bytes).context("failed to parse GLB")?;
    let blob = gltf.blob.as_deref();
    let buffer_data = |buffer: gltf::Buffer| match buffer.source() {
        gltf::buffer::Source::Bin => blob,
        gltf::buffer::Source::Uri(_) => None,
    };

    let default_scene = gltf.default_scene();
    let default_scene_nodes: Vec<usize> = default_scene
        .as_ref()
        .map(|scene| scene.nodes().map(|node| node.index()).collect())
        .unwrap_or_default();

    let mut summary = ModelSummary {
        scene_count: gltf.scenes().count(),
        node_count: gltf.nodes().count(),
        mesh_count: gltf.meshes().count(),
        primitive_count: gltf.meshes().map(|mesh| mesh.primitives().count()).sum(),
        default_scene: default_scene.as_ref().map(|scene| scene.index()),
        default_scene_nodes,
        positions: Vec::new(),
        tex_coords: Vec::new(),
        indices: Vec::new(),
        index_type: None,
        material_names: gltf
            .materials()
            .map(|material| material.name().unwrap_or_default().to_string())
            .collect(),
        bound_material: None,
        bound_texture_name: None,
        bound_texture_size: None,
    };

    let primitive = default_scene
        .iter()
        .flat_map(|scene| scene.nodes())
        .filter_map(|node| node.mesh())
        .flat_map(|mesh| mesh.primitives().collect::<Vec<_>>())
        .next();
    let Some(primitive) = primitive else {
        return Ok(summary);
    };

    let reader = primitive.reader(buffer_data);
    if let Some(positions) = reader.read_positions() {
        summary.positions = positions.collect();
    }
    if let Some(tex_coords) = reader.read_tex_coords(0) {
        summary.tex_coords = tex_coords.into_f32().collect();
    }
    if let Some(indices) = reader.read_indices() {
        summary.indices = indices.into_u32().collect();
    }
    summary.index_type = primitive.indices().map(|accessor| accessor.data_type());

    let material = primitive.material();
    if material.index().is_some() {
        summary.bound_material = material.name().map(str::to_string);
        if let Some(info) = material.pbr_metallic_roughness().base_color_texture() {
            let texture = info.texture();
            summary.bound_texture_name = texture.source().name().map(str::to_string);
            summary.bound_texture_size = Some(decode_texture_size(&texture, blob)?);
        }
    }

    Ok(summary)
}

fn decode_texture_size(texture: &gltf::Texture, blob: Option<&[u8]>) -> Result<(u32, u32)> {
    match texture.source().source() {
        gltf::image::Source::View { view, .. } => {
            let blob = blob.context("embedded image without a BIN chunk")?;
            let bytes = blob
                .get(view.offset()..view.offset() + view.length())
                .context("image buffer view out of range")?;
            let img = image::load_from_memory(bytes).context("failed to decode embedded image")?;
            Ok(img.dimensions())
        }
        gltf::image::Source::Uri { uri, .. } => bail!("external image {uri} is not embedded"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data_structures::document::Primitive, transform::unpartition};

    fn triangle() -> Document {
        let mut doc = Document::new();
        let positions = doc.create_buffer("positions");
        let indices = doc.create_buffer("indices");
        let position = doc
            .create_accessor(
                positions,
                ElementType::Vec3,
                &[0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            )
            .unwrap();
        doc.set_accessor_bounds(position, &[0.0; 3], &[1.0, 1.0, 0.0])
            .unwrap();
        let index = doc
            .create_accessor(indices, ElementType::Scalar, &[0u16, 1, 2])
            .unwrap();

        let mut primitive = Primitive::new();
        primitive.set_attribute("POSITION", position).set_indices(index);
        let mesh = doc.create_mesh(Some("triangle"));
        doc.add_primitive(mesh, primitive).unwrap();
        let node = doc.create_node(None, mesh);
        let scene = doc.create_scene(None);
        doc.add_child(scene, node).unwrap();
        doc.set_default_scene(scene).unwrap();
        doc
    }

    #[test]
    fn should_refuse_partitioned_documents() {
        let doc = triangle();
        assert!(to_glb(&doc).is_err());
    }

    #[test]
    fn should_write_a_valid_glb_header() {
        let mut doc = triangle();
        unpartition(&mut doc);
        let bytes = to_glb(&doc).unwrap();

        assert_eq!(&bytes[0..4], b"glTF");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 2);
        assert_eq!(
            u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize,
            bytes.len()
        );
        assert_eq!(bytes.len() % 4, 0);
    }

    #[test]
    fn should_read_back_what_was_written() {
        let mut doc = triangle();
        unpartition(&mut doc);
        let summary = read_glb(&to_glb(&doc).unwrap()).unwrap();

        assert_eq!(summary.mesh_count, 1);
        assert_eq!(summary.default_scene, Some(0));
        assert_eq!(summary.positions.len(), 3);
        assert_eq!(summary.indices, vec![0, 1, 2]);
        assert_eq!(summary.index_type, Some(gltf::accessor::DataType::U16));
        assert_eq!(summary.bound_material, None);
    }

    #[test]
    fn should_report_dangling_material_references() {
        let mut foreign = Document::new();
        let texture = foreign.create_texture("t", vec![1], "image/png").unwrap();
        foreign.create_material("a", texture).unwrap();
        let dangling = foreign.create_material("b", texture).unwrap();

        let mut doc = triangle();
        unpartition(&mut doc);
        let mesh = doc.create_mesh(None);
        let mut primitive = Primitive::new();
        primitive.set_material(dangling);
        doc.add_primitive(mesh, primitive).unwrap();

        let err = to_glb(&doc).unwrap_err();
        assert!(err.to_string().contains("unknown"), "{err:#}");
    }

    #[tokio::test]
    async fn should_not_create_output_when_serialization_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.glb");

        // Still partitioned, so serialization is refused.
        let result = write_glb(&triangle(), &path).await;

        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn should_leave_existing_output_untouched_when_serialization_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.glb");
        std::fs::write(&path, b"previous model").unwrap();

        assert!(write_glb(&triangle(), &path).await.is_err());

        assert_eq!(std::fs::read(&path).unwrap(), b"previous model");
    }

    #[tokio::test]
    async fn should_write_exactly_the_serialized_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.glb");
        let mut doc = triangle();
        unpartition(&mut doc);

        let written = write_glb(&doc, &path).await.unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(written, bytes.len());
        assert_eq!(bytes, to_glb(&doc).unwrap());
    }

    #[test]
    fn should_reject_unknown_semantics() {
        assert!(semantic("POSITION").is_ok());
        assert!(semantic("TEXCOORD_1").is_ok());
        assert!(semantic("TEXCOORD_x").is_err());
        assert!(semantic("JOINTS_0").is_err());
        assert!(semantic("NORMAL").is_err());
    }
}
