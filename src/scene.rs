use crate::assets::TextureData;
use crate::mesh::Mesh;
use crate::triggers::TriggerRegistry;
use crate::walkmap::Walkmap;
use bitflags::bitflags;
use glam::{EulerRot, Mat4, Quat, Vec3};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShapeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModelId(pub u32);

/// Name a texture block may register to act as the fallback for unknown texture references.
pub const DEFAULT_TEXTURE: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Surface {
    Texture(TextureId),
    Color(Vec3),
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ObjectFlags: u8 {
        /// Excluded from walk-area generation.
        const NO_WALK = 0b0000_0001;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    /// Euler angles in radians.
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    pub fn model_matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z);
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedInstance {
    pub transform: Transform,
    pub surface: Surface,
    pub flags: ObjectFlags,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
    pub ambient_strength: f32,
    pub diffuse_strength: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPart {
    pub shape: ShapeId,
    pub surface: Surface,
}

#[derive(Debug, Clone, Default)]
pub struct Model {
    pub parts: Vec<ModelPart>,
}

/// Fields of the settings record in the order `@[...]` blocks write them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingField {
    PlayerHeight,
    PlayerRadius,
    StepHeight,
    MaxPlayerSpeed,
    HeightEaseRate,
}

impl SettingField {
    pub const ALL: [SettingField; 5] = [
        SettingField::PlayerHeight,
        SettingField::PlayerRadius,
        SettingField::StepHeight,
        SettingField::MaxPlayerSpeed,
        SettingField::HeightEaseRate,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            SettingField::PlayerHeight => "player_height",
            SettingField::PlayerRadius => "player_radius",
            SettingField::StepHeight => "step_height",
            SettingField::MaxPlayerSpeed => "max_player_speed",
            SettingField::HeightEaseRate => "height_ease_rate",
        }
    }
}

impl fmt::Display for SettingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneSettings {
    pub player_height: f32,
    pub player_radius: f32,
    pub step_height: f32,
    pub max_player_speed: f32,
    pub height_ease_rate: f32,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self { player_height: 2.0, player_radius: 0.5, step_height: 0.4, max_player_speed: 2.0, height_ease_rate: 10.0 }
    }
}

impl SceneSettings {
    pub fn get(&self, field: SettingField) -> f32 {
        match field {
            SettingField::PlayerHeight => self.player_height,
            SettingField::PlayerRadius => self.player_radius,
            SettingField::StepHeight => self.step_height,
            SettingField::MaxPlayerSpeed => self.max_player_speed,
            SettingField::HeightEaseRate => self.height_ease_rate,
        }
    }

    pub fn set(&mut self, field: SettingField, value: f32) {
        let slot = match field {
            SettingField::PlayerHeight => &mut self.player_height,
            SettingField::PlayerRadius => &mut self.player_radius,
            SettingField::StepHeight => &mut self.step_height,
            SettingField::MaxPlayerSpeed => &mut self.max_player_speed,
            SettingField::HeightEaseRate => &mut self.height_ease_rate,
        };
        *slot = value;
    }

    /// Positional write used by settings blocks and `changeSetting`. Returns false past the last field.
    pub fn set_index(&mut self, index: usize, value: f32) -> bool {
        match SettingField::from_index(index) {
            Some(field) => {
                self.set(field, value);
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneCounts {
    pub textures: usize,
    pub shapes: usize,
    pub models: usize,
    pub instances: usize,
    pub lights: usize,
    pub regions: usize,
    pub triggers: usize,
    pub sounds: usize,
}

impl fmt::Display for SceneCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "textures={} shapes={} models={} instances={} lights={} regions={} triggers={} sounds={}",
            self.textures,
            self.shapes,
            self.models,
            self.instances,
            self.lights,
            self.regions,
            self.triggers,
            self.sounds
        )
    }
}

/// Everything loaded from one or more world files, plus the per-frame trigger clock.
#[derive(Default)]
pub struct Scene {
    textures: Vec<TextureData>,
    texture_names: BTreeMap<String, TextureId>,
    shapes: Vec<Mesh>,
    shape_names: BTreeMap<String, ShapeId>,
    models: Vec<Model>,
    model_names: BTreeMap<String, ModelId>,
    sounds: BTreeSet<String>,
    pub instances: BTreeMap<ShapeId, Vec<PlacedInstance>>,
    pub lights: Vec<PointLight>,
    pub walkmap: Walkmap,
    pub triggers: TriggerRegistry,
    pub settings: SceneSettings,
    /// Number of trigger sweeps performed.
    pub frame: u64,
    /// Added to adjacency indices of the file currently being merged.
    pub walkmap_offset: u32,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_walkmap(&self) -> bool {
        !self.walkmap.is_empty()
    }

    pub fn add_texture(&mut self, texture: TextureData) -> TextureId {
        let id = TextureId(self.textures.len() as u32);
        self.textures.push(texture);
        id
    }

    pub fn register_texture(&mut self, name: &str, texture: TextureData) -> TextureId {
        let id = self.add_texture(texture);
        if self.texture_names.insert(name.to_string(), id).is_some() {
            log::info!("[world] texture '{name}' redefined");
        }
        id
    }

    pub fn texture(&self, name: &str) -> Option<TextureId> {
        self.texture_names.get(name).copied()
    }

    pub fn texture_data(&self, id: TextureId) -> Option<&TextureData> {
        self.textures.get(id.0 as usize)
    }

    pub fn add_shape(&mut self, mesh: Mesh) -> ShapeId {
        let id = ShapeId(self.shapes.len() as u32);
        self.shapes.push(mesh);
        id
    }

    pub fn register_shape(&mut self, name: &str, mesh: Mesh) -> ShapeId {
        let id = self.add_shape(mesh);
        if self.shape_names.insert(name.to_string(), id).is_some() {
            log::info!("[world] shape '{name}' redefined");
        }
        id
    }

    pub fn shape(&self, name: &str) -> Option<ShapeId> {
        self.shape_names.get(name).copied()
    }

    pub fn shape_mesh(&self, id: ShapeId) -> Option<&Mesh> {
        self.shapes.get(id.0 as usize)
    }

    pub fn register_model(&mut self, name: &str, model: Model) -> ModelId {
        let id = ModelId(self.models.len() as u32);
        self.models.push(model);
        if self.model_names.insert(name.to_string(), id).is_some() {
            log::info!("[world] model '{name}' redefined");
        }
        id
    }

    pub fn model(&self, name: &str) -> Option<&Model> {
        self.model_names.get(name).and_then(|id| self.models.get(id.0 as usize))
    }

    pub fn register_sound(&mut self, name: &str) {
        self.sounds.insert(name.to_string());
    }

    pub fn has_sound(&self, name: &str) -> bool {
        self.sounds.contains(name)
    }

    pub fn place(&mut self, shape: ShapeId, instance: PlacedInstance) {
        self.instances.entry(shape).or_default().push(instance);
    }

    /// Instances grouped by shape, in shape registration order.
    pub fn instances_by_shape(&self) -> impl Iterator<Item = (ShapeId, &Mesh, &[PlacedInstance])> {
        self.instances.iter().filter_map(|(shape, list)| {
            self.shape_mesh(*shape).map(|mesh| (*shape, mesh, list.as_slice()))
        })
    }

    pub fn instance_count(&self) -> usize {
        self.instances.values().map(Vec::len).sum()
    }

    pub fn counts(&self) -> SceneCounts {
        SceneCounts {
            textures: self.texture_names.len(),
            shapes: self.shape_names.len(),
            models: self.model_names.len(),
            instances: self.instance_count(),
            lights: self.lights.len(),
            regions: self.walkmap.len(),
            triggers: self.triggers.len(),
            sounds: self.sounds.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::BuiltinShape;

    #[test]
    fn settings_write_by_position() {
        let mut settings = SceneSettings::default();
        assert!(settings.set_index(3, 5.5));
        assert_eq!(settings.max_player_speed, 5.5);
        assert!(settings.set_index(4, 2.0));
        assert_eq!(settings.get(SettingField::HeightEaseRate), 2.0);
        assert!(!settings.set_index(5, 1.0));
        assert_eq!(SettingField::from_index(0), Some(SettingField::PlayerHeight));
    }

    #[test]
    fn instances_group_under_their_shape() {
        let mut scene = Scene::new();
        let cube = scene.register_shape("box", BuiltinShape::Cube.build());
        let tri = scene.register_shape("tri", BuiltinShape::Triangle.build());
        let transform = Transform { position: Vec3::ZERO, rotation: Vec3::ZERO, scale: Vec3::ONE };
        let instance =
            PlacedInstance { transform, surface: Surface::Color(Vec3::ONE), flags: ObjectFlags::empty() };
        scene.place(cube, instance.clone());
        scene.place(tri, instance.clone());
        scene.place(cube, instance);

        let groups: Vec<_> = scene.instances_by_shape().map(|(id, _, list)| (id, list.len())).collect();
        assert_eq!(groups, vec![(cube, 2), (tri, 1)]);
        assert_eq!(scene.counts().instances, 3);
    }

    #[test]
    fn model_matrix_applies_translation_last() {
        let transform = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Vec3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0),
            scale: Vec3::splat(2.0),
        };
        let moved = transform.model_matrix().transform_point3(Vec3::X);
        assert!((moved - Vec3::new(1.0, 2.0, 1.0)).length() < 1e-5);
    }
}
