//! Mesh and material components
//!
//! Both only reference GPU-side resources by id; loading and binding those
//! resources happens outside the scene core.

use crate::foundation::uid::Uid;
use crate::persistence::{read_f32, read_u64, read_uid, JsonObject, PersistenceError};
use serde_json::Value;

const JSON_TAG_MESH_ID: &str = "MeshId";
const JSON_TAG_MATERIAL_INDEX: &str = "MaterialIndex";
const JSON_TAG_TEXTURE_ID: &str = "TextureId";
const JSON_TAG_SHADER: &str = "Shader";
const JSON_TAG_KD: &str = "Kd";
const JSON_TAG_KS: &str = "Ks";
const JSON_TAG_SHININESS: &str = "Shininess";

/// Reference to an imported mesh resource
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshComponent {
    /// Mesh resource id; [`Uid::NONE`] when unassigned
    pub mesh: Uid,
    /// Index of the material slot the mesh draws with
    pub material_index: u32,
}

impl MeshComponent {
    /// Mesh component pointing at a resource
    pub fn new(mesh: Uid, material_index: u32) -> Self {
        Self { mesh, material_index }
    }

    pub(crate) fn save(&self, json: &mut JsonObject) {
        json.insert(JSON_TAG_MESH_ID.into(), self.mesh.raw().into());
        json.insert(JSON_TAG_MATERIAL_INDEX.into(), self.material_index.into());
    }

    pub(crate) fn load(&mut self, json: &Value) -> Result<(), PersistenceError> {
        self.mesh = read_uid(json, JSON_TAG_MESH_ID)?;
        self.material_index = u32::try_from(read_u64(json, JSON_TAG_MATERIAL_INDEX)?).map_err(|_| {
            PersistenceError::InvalidField { field: JSON_TAG_MATERIAL_INDEX, expected: "32-bit index" }
        })?;
        Ok(())
    }
}

/// Shading model of a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShaderType {
    /// Unlit textured
    Standard,
    /// Phong lighting
    #[default]
    Phong,
}

impl ShaderType {
    fn tag(self) -> u64 {
        match self {
            Self::Standard => 0,
            Self::Phong => 1,
        }
    }

    fn from_tag(tag: u64) -> Option<Self> {
        match tag {
            0 => Some(Self::Standard),
            1 => Some(Self::Phong),
            _ => None,
        }
    }
}

/// Surface description used by the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialComponent {
    /// Texture resource id; [`Uid::NONE`] for untextured
    pub texture: Uid,
    /// Shading model
    pub shader: ShaderType,
    /// Diffuse coefficient
    pub kd: f32,
    /// Specular coefficient
    pub ks: f32,
    /// Specular exponent
    pub shininess: f32,
}

impl Default for MaterialComponent {
    fn default() -> Self {
        Self {
            texture: Uid::NONE,
            shader: ShaderType::Phong,
            kd: 1.0,
            ks: 0.0,
            shininess: 1.0,
        }
    }
}

impl MaterialComponent {
    pub(crate) fn save(&self, json: &mut JsonObject) {
        json.insert(JSON_TAG_TEXTURE_ID.into(), self.texture.raw().into());
        json.insert(JSON_TAG_SHADER.into(), self.shader.tag().into());
        json.insert(JSON_TAG_KD.into(), self.kd.into());
        json.insert(JSON_TAG_KS.into(), self.ks.into());
        json.insert(JSON_TAG_SHININESS.into(), self.shininess.into());
    }

    pub(crate) fn load(&mut self, json: &Value) -> Result<(), PersistenceError> {
        self.texture = read_uid(json, JSON_TAG_TEXTURE_ID)?;
        self.shader = ShaderType::from_tag(read_u64(json, JSON_TAG_SHADER)?)
            .ok_or(PersistenceError::InvalidField { field: JSON_TAG_SHADER, expected: "shader tag 0 or 1" })?;
        self.kd = read_f32(json, JSON_TAG_KD)?;
        self.ks = read_f32(json, JSON_TAG_KS)?;
        self.shininess = read_f32(json, JSON_TAG_SHININESS)?;
        Ok(())
    }
}
