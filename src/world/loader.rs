use super::block::Block;
use super::tokenizer::{tokenize, BlockKind, TokenStats};
use crate::assets::AssetLoader;
use crate::audio::AudioBackend;
use crate::scene::{
    Model, ModelPart, ObjectFlags, PlacedInstance, PointLight, Scene, SceneCounts, Surface, Transform,
    DEFAULT_TEXTURE,
};
use crate::mesh::BuiltinShape;
use crate::triggers::TriggerInfo;
use crate::walkmap::{BoundingBox, RegionId};
use anyhow::{anyhow, bail, Result};
use glam::{Vec2, Vec3};

const OBJECT_NUMBERS: usize = 9;
const LIGHT_NUMBERS: usize = 11;
const WALK_BOX_NUMBERS: usize = 5;
const TRIGGER_NUMBERS: usize = 6;

const KEYWORD_INVISIBLE: &str = "invisible";
const KEYWORD_NOWALK: &str = "nowalk";

/// Outcome of merging one world text into a scene.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub tokens: TokenStats,
    pub applied: usize,
    pub dropped: usize,
    /// Object blocks skipped through the `invisible` keyword.
    pub hidden: usize,
    pub pruned_links: usize,
    pub counts: SceneCounts,
}

enum Applied {
    Mutated,
    Hidden,
}

struct Loader<'a> {
    scene: &'a mut Scene,
    assets: &'a mut dyn AssetLoader,
    audio: &'a mut dyn AudioBackend,
}

/// Tokenizes `text` and folds every block into `scene`. Bad blocks are logged and skipped.
pub fn load_world_str(
    scene: &mut Scene,
    text: &str,
    assets: &mut dyn AssetLoader,
    audio: &mut dyn AudioBackend,
) -> LoadReport {
    scene.walkmap_offset = scene.walkmap.merge_offset();
    let first_new_region = RegionId(scene.walkmap_offset);
    let mut report = LoadReport::default();
    let mut loader = Loader { scene: &mut *scene, assets, audio };

    let tokens = tokenize(text, |kind, block| match loader.apply(kind, block) {
        Ok(Applied::Mutated) => report.applied += 1,
        Ok(Applied::Hidden) => report.hidden += 1,
        Err(err) => {
            log::warn!("[world] dropping {kind} block ({block}): {err:#}");
            report.dropped += 1;
        }
    });

    report.tokens = tokens;
    report.pruned_links = scene.walkmap.prune_dangling(first_new_region);
    report.counts = scene.counts();
    report
}

fn require_numbers(block: &Block, expected: usize) -> Result<()> {
    if block.numbers.len() < expected {
        bail!("expected at least {expected} numbers, found {}", block.numbers.len());
    }
    Ok(())
}

fn require_strings(block: &Block, expected: usize) -> Result<()> {
    if block.strings.len() < expected {
        bail!("expected at least {expected} strings, found {}", block.strings.len());
    }
    Ok(())
}

/// Maps a file-local adjacency number to a scene-wide region index, or `None` when it cannot name one.
fn adjacency_index(raw: f32, offset: u32) -> Option<u32> {
    if raw < 0.0 || raw.fract() != 0.0 {
        return None;
    }
    // f32 -> u64 saturates, so anything past u32 range fails the conversion below.
    let local = u32::try_from(raw as u64).ok()?;
    offset.checked_add(local)
}

fn vec3(numbers: &[f32], at: usize) -> Vec3 {
    Vec3::new(numbers[at], numbers[at + 1], numbers[at + 2])
}

impl Loader<'_> {
    fn apply(&mut self, kind: BlockKind, block: &Block) -> Result<Applied> {
        match kind {
            BlockKind::Texture => self.texture(block),
            BlockKind::Shape => self.shape(block),
            BlockKind::Model => self.model(block),
            BlockKind::Audio => self.sound(block),
            BlockKind::Object => return self.object(block),
            BlockKind::Light => self.light(block),
            BlockKind::WalkBox => self.walk_box(block),
            BlockKind::Settings => self.settings(block),
            BlockKind::Trigger => self.trigger(block),
        }
        .map(|()| Applied::Mutated)
    }

    fn texture(&mut self, block: &Block) -> Result<()> {
        require_strings(block, 2)?;
        let (path, name) = (&block.strings[0], &block.strings[1]);
        let path = self.assets.resolve(path);
        let texture = self.assets.load_texture(&path)?;
        self.scene.register_texture(name, texture);
        Ok(())
    }

    fn shape(&mut self, block: &Block) -> Result<()> {
        require_strings(block, 2)?;
        let (key, name) = (&block.strings[0], &block.strings[1]);
        let shape = BuiltinShape::from_key(key).ok_or_else(|| {
            let known: Vec<_> = BuiltinShape::ALL.iter().map(|shape| shape.key()).collect();
            anyhow!("unknown builtin shape '{key}' (known: {})", known.join(", "))
        })?;
        self.scene.register_shape(name, shape.build());
        Ok(())
    }

    fn model(&mut self, block: &Block) -> Result<()> {
        require_strings(block, 2)?;
        let (path, name) = (&block.strings[0], &block.strings[1]);
        let resolved = self.assets.resolve(path);
        let data = self.assets.load_model(&resolved)?;
        if data.meshes.is_empty() {
            bail!("model '{path}' contains no triangle meshes");
        }
        let mut model = Model::default();
        for sub in data.meshes {
            let surface = match sub.texture {
                Some(texture) => Surface::Texture(self.scene.add_texture(texture)),
                None => Surface::Color(sub.color),
            };
            let shape = self.scene.add_shape(sub.mesh);
            model.parts.push(ModelPart { shape, surface });
        }
        log::debug!("[world] model '{name}' has {} sub-meshes", model.parts.len());
        self.scene.register_model(name, model);
        Ok(())
    }

    fn sound(&mut self, block: &Block) -> Result<()> {
        require_strings(block, 2)?;
        let (path, name) = (&block.strings[0], &block.strings[1]);
        let path = self.assets.resolve(path);
        self.audio.load_sound(name, &path)?;
        self.scene.register_sound(name);
        Ok(())
    }

    fn object(&mut self, block: &Block) -> Result<Applied> {
        require_numbers(block, OBJECT_NUMBERS)?;
        let n = &block.numbers;
        let transform = Transform {
            position: vec3(n, 0),
            rotation: Vec3::new(n[3].to_radians(), n[4].to_radians(), n[5].to_radians()),
            scale: vec3(n, 6),
        };

        let mut names: &[String] = &block.strings;
        let mut flags = ObjectFlags::empty();
        while names.len() > 1 {
            match names[names.len() - 1].as_str() {
                KEYWORD_INVISIBLE => {
                    log::debug!("[world] object marked invisible, skipping");
                    return Ok(Applied::Hidden);
                }
                KEYWORD_NOWALK => flags |= ObjectFlags::NO_WALK,
                _ => break,
            }
            names = &names[..names.len() - 1];
        }

        match names {
            [model_name] => {
                let model =
                    self.scene.model(model_name).ok_or_else(|| anyhow!("unknown model '{model_name}'"))?;
                let placed: Vec<_> = model
                    .parts
                    .iter()
                    .map(|part| (part.shape, PlacedInstance { transform, surface: part.surface, flags }))
                    .collect();
                for (shape, instance) in placed {
                    self.scene.place(shape, instance);
                }
            }
            [texture_name, shape_name] => {
                let shape =
                    self.scene.shape(shape_name).ok_or_else(|| anyhow!("unknown shape '{shape_name}'"))?;
                let texture = match self.scene.texture(texture_name) {
                    Some(texture) => texture,
                    None => {
                        let fallback = self.scene.texture(DEFAULT_TEXTURE).ok_or_else(|| {
                            anyhow!("unknown texture '{texture_name}' and no '{DEFAULT_TEXTURE}' texture")
                        })?;
                        log::warn!("[world] unknown texture '{texture_name}', using '{DEFAULT_TEXTURE}'");
                        fallback
                    }
                };
                self.scene.place(shape, PlacedInstance { transform, surface: Surface::Texture(texture), flags });
            }
            other => bail!("expected a model name or texture and shape names, found {} strings", other.len()),
        }
        Ok(Applied::Mutated)
    }

    fn light(&mut self, block: &Block) -> Result<()> {
        require_numbers(block, LIGHT_NUMBERS)?;
        let n = &block.numbers;
        self.scene.lights.push(PointLight {
            position: vec3(n, 0),
            color: vec3(n, 3),
            constant: n[6],
            linear: n[7],
            quadratic: n[8],
            ambient_strength: n[9],
            diffuse_strength: n[10],
        });
        Ok(())
    }

    fn walk_box(&mut self, block: &Block) -> Result<()> {
        require_numbers(block, WALK_BOX_NUMBERS)?;
        let n = &block.numbers;
        let mut region = BoundingBox::new(vec3(n, 0), Vec2::new(n[3], n[4]));
        let offset = self.scene.walkmap_offset;
        for &raw in &n[WALK_BOX_NUMBERS..] {
            match adjacency_index(raw, offset) {
                Some(index) => region.adjacent.push(RegionId(index)),
                None => log::warn!("[world] walk-box adjacency {raw} is not a region index, ignoring it"),
            }
        }
        self.scene.walkmap.push(region);
        Ok(())
    }

    fn settings(&mut self, block: &Block) -> Result<()> {
        for (index, &value) in block.numbers.iter().enumerate() {
            if !self.scene.settings.set_index(index, value) {
                log::warn!(
                    "[world] settings block has {} numbers, ignoring values past field {index}",
                    block.numbers.len()
                );
                break;
            }
        }
        Ok(())
    }

    fn trigger(&mut self, block: &Block) -> Result<()> {
        require_numbers(block, TRIGGER_NUMBERS)?;
        let n = &block.numbers;
        let trigger = TriggerInfo::from_params(vec3(n, 0), vec3(n, 3), &block.strings, &*self.assets)?;
        self.scene.triggers.insert(trigger);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::TextureData;
    use crate::audio::NullAudio;
    use crate::mesh::ModelData;
    use std::path::Path;

    struct SolidAssets;

    impl AssetLoader for SolidAssets {
        fn load_texture(&mut self, _path: &Path) -> Result<TextureData> {
            Ok(TextureData::solid(1, 1, [255; 4]))
        }

        fn load_model(&mut self, path: &Path) -> Result<ModelData> {
            bail!("no model at {}", path.display())
        }
    }

    fn load(scene: &mut Scene, text: &str) -> LoadReport {
        load_world_str(scene, text, &mut SolidAssets, &mut NullAudio::default())
    }

    #[test]
    fn arity_errors_drop_only_the_block() {
        let mut scene = Scene::new();
        let report = load(&mut scene, "&[1,2,3] &[0,4,0, 1,1,1, 1,0.09,0.032, 0.2,0.8]");
        assert_eq!(report.dropped, 1);
        assert_eq!(scene.lights.len(), 1);
        assert_eq!(scene.lights[0].quadratic, 0.032);
    }

    #[test]
    fn object_rotation_is_converted_to_radians() {
        let mut scene = Scene::new();
        load(&mut scene, "%[wall.png, wall] *[cube, box] $[1,2,3, 0,90,0, 1,1,1, wall, box]");
        let (_, _, placed) = scene.instances_by_shape().next().expect("one shape group");
        assert!((placed[0].transform.rotation.y - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert_eq!(placed[0].transform.position, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn unknown_texture_falls_back_to_default() {
        let mut scene = Scene::new();
        let report = load(&mut scene, "*[cube, box] $[0,0,0,0,0,0,1,1,1, brick, box]");
        assert_eq!(report.dropped, 1);

        load(&mut scene, "%[d.png, default] $[0,0,0,0,0,0,1,1,1, brick, box]");
        let default = scene.texture(DEFAULT_TEXTURE).expect("default registered");
        let (_, _, placed) = scene.instances_by_shape().next().expect("placed with fallback");
        assert_eq!(placed[0].surface, Surface::Texture(default));
    }

    #[test]
    fn unknown_builtin_shape_is_rejected() {
        let mut scene = Scene::new();
        let report = load(&mut scene, "*[pyramid, p] *[triangle_2D, t]");
        assert_eq!(report.dropped, 1);
        assert!(scene.shape("p").is_none());
        assert!(scene.shape("t").is_some());
    }

    #[test]
    fn settings_write_positionally_and_ignore_extras() {
        let mut scene = Scene::new();
        load(&mut scene, "@[1.8, 0.3] @[1.8, 0.3, 0.5, 4, 12, 99]");
        assert_eq!(scene.settings.player_radius, 0.3);
        assert_eq!(scene.settings.max_player_speed, 4.0);
        assert_eq!(scene.settings.height_ease_rate, 12.0);
    }

    #[test]
    fn failed_model_import_is_dropped() {
        let mut scene = Scene::new();
        let report = load(&mut scene, "+[statue.glb, statue] $[0,0,0,0,0,0,1,1,1, statue]");
        assert_eq!(report.dropped, 2);
        assert_eq!(scene.instance_count(), 0);
    }

    #[test]
    fn sounds_register_with_the_audio_backend() {
        let mut scene = Scene::new();
        let mut audio = NullAudio::default();
        load_world_str(&mut scene, ".[sfx/door.ogg, door]", &mut SolidAssets, &mut audio);
        assert!(scene.has_sound("door"));
        assert!(audio.has_sound("door"));
    }

    #[test]
    fn negative_and_fractional_adjacency_is_ignored() {
        let mut scene = Scene::new();
        load(&mut scene, "~[0,0,0,4,4,-1,0.5,1] ~[4,0,0,4,4,0]");
        let first = scene.walkmap.get(RegionId(0)).expect("region 0");
        assert_eq!(first.adjacent.as_slice(), &[RegionId(1)]);
    }

    #[test]
    fn adjacency_past_the_index_range_is_ignored_when_merging() {
        let mut scene = Scene::new();
        load(&mut scene, "~[0,0,0,4,4]");
        let report = load(&mut scene, "~[10,0,0,4,4,4294967295,0] ~[14,0,0,4,4,1e20]");
        assert_eq!(report.dropped, 0);
        assert_eq!(report.pruned_links, 0);
        assert_eq!(scene.walkmap.len(), 3);
        let merged = scene.walkmap.get(RegionId(1)).expect("first merged region");
        assert_eq!(merged.adjacent.as_slice(), &[RegionId(1)]);
        let last = scene.walkmap.get(RegionId(2)).expect("second merged region");
        assert!(last.adjacent.is_empty());
    }

    #[test]
    fn adjacency_index_rejects_overflowing_offsets() {
        assert_eq!(adjacency_index(3.0, 2), Some(5));
        assert_eq!(adjacency_index(4294967295.0, 1), None);
        assert_eq!(adjacency_index(4294967040.0, 0), Some(4294967040));
        assert_eq!(adjacency_index(4294967040.0, u32::MAX), None);
        assert_eq!(adjacency_index(-1.0, 0), None);
        assert_eq!(adjacency_index(2.5, 0), None);
    }
}
