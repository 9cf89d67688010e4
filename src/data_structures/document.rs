//! In-memory glTF document.
//!
//! [`Document`] owns every entity of the exported model in flat arenas.
//! Entities refer to each other through typed [`Handle`]s, so the scene
//! graph can be assembled bottom-up and handed to the writer in one piece.

use std::{collections::BTreeMap, fmt, hash, marker::PhantomData};

use anyhow::{Context, Result, bail, ensure};

/// Typed index into one of the [`Document`] arenas.
pub struct Handle<T> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    pub fn index(self) -> usize {
        self.index
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Handle<T> {}

impl<T> hash::Hash for Handle<T> {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = std::any::type_name::<T>().rsplit("::").next().unwrap_or("?");
        write!(f, "Handle<{}>({})", name, self.index)
    }
}

/// Shape of a single accessor element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementType {
    Scalar,
    Vec2,
    Vec3,
}

impl ElementType {
    pub fn components(self) -> usize {
        match self {
            ElementType::Scalar => 1,
            ElementType::Vec2 => 2,
            ElementType::Vec3 => 3,
        }
    }

    /// The glTF spelling ("SCALAR", "VEC2", "VEC3").
    pub fn as_str(self) -> &'static str {
        match self {
            ElementType::Scalar => "SCALAR",
            ElementType::Vec2 => "VEC2",
            ElementType::Vec3 => "VEC3",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentType {
    F32,
    U16,
}

impl ComponentType {
    pub fn size(self) -> usize {
        match self {
            ComponentType::F32 => 4,
            ComponentType::U16 => 2,
        }
    }
}

/// Plain numeric types that can back an accessor.
pub trait Component: bytemuck::Pod {
    const TYPE: ComponentType;

    /// The value with its bytes in little-endian order.
    fn to_le(self) -> Self;
}

impl Component for f32 {
    const TYPE: ComponentType = ComponentType::F32;

    fn to_le(self) -> Self {
        f32::from_bits(self.to_bits().to_le())
    }
}

impl Component for u16 {
    const TYPE: ComponentType = ComponentType::U16;

    fn to_le(self) -> Self {
        u16::to_le(self)
    }
}

/// A binary buffer that accessors are stored in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Buffer {
    pub name: String,
}

/// Typed view over packed little-endian component data.
#[derive(Clone, Debug, PartialEq)]
pub struct Accessor {
    pub element_type: ElementType,
    pub component_type: ComponentType,
    pub buffer: Handle<Buffer>,
    pub min: Option<Vec<f32>>,
    pub max: Option<Vec<f32>>,
    bytes: Vec<u8>,
    count: usize,
}

impl Accessor {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of elements (not components).
    pub fn count(&self) -> usize {
        self.count
    }
}

/// Encoded image plus its MIME type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Texture {
    pub name: String,
    pub image: Vec<u8>,
    pub mime_type: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Material {
    pub name: String,
    pub base_color_texture: Option<Handle<Texture>>,
}

/// One drawable surface: vertex attributes, indices and a material.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Primitive {
    pub attributes: BTreeMap<String, Handle<Accessor>>,
    pub indices: Option<Handle<Accessor>>,
    pub material: Option<Handle<Material>>,
}

impl Primitive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_attribute(&mut self, semantic: &str, accessor: Handle<Accessor>) -> &mut Self {
        self.attributes.insert(semantic.to_string(), accessor);
        self
    }

    pub fn set_indices(&mut self, accessor: Handle<Accessor>) -> &mut Self {
        self.indices = Some(accessor);
        self
    }

    pub fn set_material(&mut self, material: Handle<Material>) -> &mut Self {
        self.material = Some(material);
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Node {
    pub name: Option<String>,
    pub mesh: Option<Handle<Mesh>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Scene {
    pub name: Option<String>,
    pub children: Vec<Handle<Node>>,
}

/// Root of the exported model.
#[derive(Clone, Debug, Default)]
pub struct Document {
    pub(crate) buffers: Vec<Buffer>,
    pub(crate) accessors: Vec<Accessor>,
    textures: Vec<Texture>,
    materials: Vec<Material>,
    meshes: Vec<Mesh>,
    nodes: Vec<Node>,
    scenes: Vec<Scene>,
    default_scene: Option<Handle<Scene>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_buffer(&mut self, name: &str) -> Handle<Buffer> {
        self.buffers.push(Buffer {
            name: name.to_string(),
        });
        Handle::new(self.buffers.len() - 1)
    }

    /// Pack `values` into a new accessor stored in `buffer`.
    ///
    /// The value count has to be a whole number of `element_type` elements.
    pub fn create_accessor<C: Component>(
        &mut self,
        buffer: Handle<Buffer>,
        element_type: ElementType,
        values: &[C],
    ) -> Result<Handle<Accessor>> {
        ensure!(
            self.buffer(buffer).is_some(),
            "accessor refers to unknown {:?}",
            buffer
        );
        let components = element_type.components();
        ensure!(
            values.len() % components == 0,
            "{} components do not form whole {} elements",
            values.len(),
            element_type.as_str()
        );
        let values: Vec<C> = values.iter().map(|value| value.to_le()).collect();
        let bytes: Vec<u8> = bytemuck::cast_slice(&values).to_vec();
        let count = values.len() / components;
        debug_assert_eq!(bytes.len(), count * components * C::TYPE.size());

        self.accessors.push(Accessor {
            element_type,
            component_type: C::TYPE,
            buffer,
            min: None,
            max: None,
            bytes,
            count,
        });
        Ok(Handle::new(self.accessors.len() - 1))
    }

    /// Attach per-component bounds, required by glTF for `POSITION`.
    pub fn set_accessor_bounds(
        &mut self,
        accessor: Handle<Accessor>,
        min: &[f32],
        max: &[f32],
    ) -> Result<()> {
        let accessor = self
            .accessors
            .get_mut(accessor.index())
            .with_context(|| format!("unknown {:?}", accessor))?;
        let components = accessor.element_type.components();
        ensure!(
            min.len() == components && max.len() == components,
            "bounds of a {} accessor need {} components",
            accessor.element_type.as_str(),
            components
        );
        accessor.min = Some(min.to_vec());
        accessor.max = Some(max.to_vec());
        Ok(())
    }

    pub fn create_texture(
        &mut self,
        name: &str,
        image: Vec<u8>,
        mime_type: &str,
    ) -> Result<Handle<Texture>> {
        if image.is_empty() {
            bail!("texture {name} has an empty image buffer");
        }
        self.textures.push(Texture {
            name: name.to_string(),
            image,
            mime_type: mime_type.to_string(),
        });
        Ok(Handle::new(self.textures.len() - 1))
    }

    pub fn create_material(
        &mut self,
        name: &str,
        base_color_texture: Handle<Texture>,
    ) -> Result<Handle<Material>> {
        ensure!(
            self.texture(base_color_texture).is_some(),
            "material {name} refers to unknown {:?}",
            base_color_texture
        );
        self.materials.push(Material {
            name: name.to_string(),
            base_color_texture: Some(base_color_texture),
        });
        Ok(Handle::new(self.materials.len() - 1))
    }

    pub fn create_mesh(&mut self, name: Option<&str>) -> Handle<Mesh> {
        self.meshes.push(Mesh {
            name: name.map(str::to_string),
            primitives: Vec::new(),
        });
        Handle::new(self.meshes.len() - 1)
    }

    pub fn add_primitive(&mut self, mesh: Handle<Mesh>, primitive: Primitive) -> Result<()> {
        let mesh = self
            .meshes
            .get_mut(mesh.index())
            .with_context(|| format!("unknown {:?}", mesh))?;
        mesh.primitives.push(primitive);
        Ok(())
    }

    pub fn create_node(&mut self, name: Option<&str>, mesh: Handle<Mesh>) -> Handle<Node> {
        self.nodes.push(Node {
            name: name.map(str::to_string),
            mesh: Some(mesh),
        });
        Handle::new(self.nodes.len() - 1)
    }

    pub fn create_scene(&mut self, name: Option<&str>) -> Handle<Scene> {
        self.scenes.push(Scene {
            name: name.map(str::to_string),
            children: Vec::new(),
        });
        Handle::new(self.scenes.len() - 1)
    }

    pub fn add_child(&mut self, scene: Handle<Scene>, node: Handle<Node>) -> Result<()> {
        let scene = self
            .scenes
            .get_mut(scene.index())
            .with_context(|| format!("unknown {:?}", scene))?;
        scene.children.push(node);
        Ok(())
    }

    pub fn set_default_scene(&mut self, scene: Handle<Scene>) -> Result<()> {
        ensure!(self.scene(scene).is_some(), "unknown {:?}", scene);
        self.default_scene = Some(scene);
        Ok(())
    }

    pub fn default_scene(&self) -> Option<Handle<Scene>> {
        self.default_scene
    }

    pub fn buffer(&self, handle: Handle<Buffer>) -> Option<&Buffer> {
        self.buffers.get(handle.index())
    }

    pub fn accessor(&self, handle: Handle<Accessor>) -> Option<&Accessor> {
        self.accessors.get(handle.index())
    }

    pub fn texture(&self, handle: Handle<Texture>) -> Option<&Texture> {
        self.textures.get(handle.index())
    }

    pub fn material(&self, handle: Handle<Material>) -> Option<&Material> {
        self.materials.get(handle.index())
    }

    pub fn mesh(&self, handle: Handle<Mesh>) -> Option<&Mesh> {
        self.meshes.get(handle.index())
    }

    pub fn node(&self, handle: Handle<Node>) -> Option<&Node> {
        self.nodes.get(handle.index())
    }

    pub fn scene(&self, handle: Handle<Scene>) -> Option<&Scene> {
        self.scenes.get(handle.index())
    }

    pub fn buffers(&self) -> &[Buffer] {
        &self.buffers
    }

    pub fn accessors(&self) -> &[Accessor] {
        &self.accessors
    }

    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    /// Materials that no primitive of any mesh refers to.
    pub fn unbound_materials(&self) -> Vec<Handle<Material>> {
        (0..self.materials.len())
            .map(Handle::new)
            .filter(|material| {
                !self
                    .meshes
                    .iter()
                    .flat_map(|mesh| mesh.primitives.iter())
                    .any(|primitive| primitive.material == Some(*material))
            })
            .collect()
    }
}
