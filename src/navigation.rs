use crate::geometry::horizontal;
use crate::input::{keys, KeyId, KeyState};
use crate::scene::{Scene, SceneSettings};
use crate::walkmap::{BoundingBox, RegionId, Walkmap};
use glam::Vec3;

/// Eye height above the region floor, as a fraction of the player height.
pub const EYE_HEIGHT_FRACTION: f32 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keymap {
    pub forward: KeyId,
    pub backward: KeyId,
    pub left: KeyId,
    pub right: KeyId,
    pub up: KeyId,
    pub down: KeyId,
}

impl Default for Keymap {
    fn default() -> Self {
        Self {
            forward: keys::W,
            backward: keys::S,
            left: keys::A,
            right: keys::D,
            up: keys::SPACE,
            down: keys::LEFT_SHIFT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    /// Eye position.
    pub position: Vec3,
    /// Heading in radians around +Y; zero looks down +X.
    pub yaw: f32,
    pub region: Option<RegionId>,
    pub keymap: Keymap,
}

impl Player {
    pub fn new(position: Vec3, yaw: f32, keymap: Keymap) -> Self {
        Self { position, yaw, region: None, keymap }
    }

    /// Places the player in the region containing `position`, or at region 0 when none does.
    /// Height converges through easing once frames run.
    pub fn spawn(position: Vec3, yaw: f32, keymap: Keymap, scene: &Scene) -> Self {
        let mut player = Self::new(position, yaw, keymap);
        if let Some(region) = scene.walkmap.find_containing(position) {
            player.region = Some(region);
        } else if let Some(first) = scene.walkmap.get(RegionId(0)) {
            log::warn!("[walkmap] spawn point {position} is outside every region, moving to region #0");
            player.position.x = first.position.x;
            player.position.z = first.position.z;
            player.region = Some(RegionId(0));
        }
        player
    }

    pub fn forward(&self) -> Vec3 {
        Vec3::new(self.yaw.cos(), 0.0, self.yaw.sin())
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize_or_zero()
    }

    /// Floor height implied by the current eye height.
    pub fn feet(&self, settings: &SceneSettings) -> f32 {
        self.position.y - EYE_HEIGHT_FRACTION * settings.player_height
    }

    /// Center and full size of the cuboid used for trigger intersection.
    pub fn collision_box(&self, settings: &SceneSettings) -> (Vec3, Vec3) {
        let height = settings.player_height;
        let diameter = settings.player_radius * 2.0;
        let center = Vec3::new(self.position.x, self.feet(settings) + height * 0.5, self.position.z);
        (center, Vec3::new(diameter, height, diameter))
    }

    /// Sum of the held direction keys, normalized and scaled to one frame of travel.
    pub fn movement_vector(&self, keys: &dyn KeyState, step: f32) -> Vec3 {
        let (forward, right) = (self.forward(), self.right());
        let map = &self.keymap;
        let mut direction = Vec3::ZERO;
        for (key, towards) in [
            (map.forward, forward),
            (map.backward, -forward),
            (map.right, right),
            (map.left, -right),
            (map.up, Vec3::Y),
            (map.down, -Vec3::Y),
        ] {
            if keys.key_down(key) {
                direction += towards;
            }
        }
        direction.normalize_or_zero() * step
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// No walkmap; the movement was applied as-is.
    Free,
    Direct,
    /// Movement was locked to the edge the candidate crossed.
    Slid,
    Held,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveReport {
    pub outcome: MoveOutcome,
    pub region: Option<RegionId>,
    /// Regions tested by the last search, in visit order.
    pub visited: Vec<RegionId>,
    pub searches: u32,
}

/// Moves the player by the keys held this frame.
pub fn advance_player(player: &mut Player, scene: &Scene, keys: &dyn KeyState, delta: f32) -> MoveReport {
    let movement = player.movement_vector(keys, scene.settings.max_player_speed * delta);
    advance_player_by(player, scene, movement, delta)
}

/// Applies `movement` constrained to the walkmap, then eases eye height toward the current region.
pub fn advance_player_by(player: &mut Player, scene: &Scene, movement: Vec3, delta: f32) -> MoveReport {
    let walkmap = &scene.walkmap;
    if walkmap.is_empty() {
        player.position += movement;
        return MoveReport { outcome: MoveOutcome::Free, region: None, visited: Vec::new(), searches: 0 };
    }

    let start = match player.region.filter(|id| walkmap.get(*id).is_some()) {
        Some(id) => id,
        None => walkmap.find_containing(player.position).unwrap_or(RegionId(0)),
    };
    let budget = scene.settings.max_player_speed * delta;
    let movement = Vec3::new(movement.x, 0.0, movement.z);
    let mut visited = Vec::new();
    let mut searches = 1;

    let mut candidate = player.position + movement;
    let mut outcome = search(walkmap, start, candidate, budget, &mut visited).map(|id| (id, MoveOutcome::Direct));
    if outcome.is_none() {
        if let Some(region) = walkmap.get(start) {
            let slid = slide(movement, region, candidate);
            if slid != Vec3::ZERO {
                candidate = player.position + slid;
                visited.clear();
                searches += 1;
                outcome = search(walkmap, start, candidate, budget, &mut visited).map(|id| (id, MoveOutcome::Slid));
            }
        }
    }

    let (region, outcome) = match outcome {
        Some((region, outcome)) => {
            player.position.x = candidate.x;
            player.position.z = candidate.z;
            (region, outcome)
        }
        None => (start, MoveOutcome::Held),
    };
    player.region = Some(region);

    if let Some(floor) = walkmap.get(region) {
        let settings = &scene.settings;
        let target = floor.position.y + EYE_HEIGHT_FRACTION * settings.player_height;
        let t = (settings.height_ease_rate * delta).clamp(0.0, 1.0);
        player.position.y += (target - player.position.y) * t;
    }

    MoveReport { outcome, region: Some(region), visited, searches }
}

/// Depth-first search from `start` for a region containing `candidate`. A region reached by a path
/// longer than `budget` is still tested but not expanded. Each region is tested at most once.
fn search(
    walkmap: &Walkmap,
    start: RegionId,
    candidate: Vec3,
    budget: f32,
    visited: &mut Vec<RegionId>,
) -> Option<RegionId> {
    let point = horizontal(candidate);
    let mut stack = vec![(start, 0.0_f32)];
    while let Some((id, travelled)) = stack.pop() {
        if visited.contains(&id) {
            continue;
        }
        let Some(region) = walkmap.get(id) else { continue };
        visited.push(id);
        if region.contains(point) {
            return Some(id);
        }
        if travelled > budget {
            continue;
        }
        // Reverse so the first listed neighbour is explored first.
        for &next in region.adjacent.iter().rev() {
            if visited.contains(&next) {
                continue;
            }
            let Some(neighbour) = walkmap.get(next) else { continue };
            stack.push((next, travelled + region.anchor().distance(neighbour.anchor())));
        }
    }
    None
}

/// Projects `movement` onto the edge of `region` that `candidate` crossed.
fn slide(movement: Vec3, region: &BoundingBox, candidate: Vec3) -> Vec3 {
    let (min, max) = (region.min(), region.max());
    let overshoot = |value: f32, low: f32, high: f32| (low - value).max(value - high).max(0.0);
    let over_x = overshoot(candidate.x, min.x, max.x);
    let over_z = overshoot(candidate.z, min.y, max.y);
    if over_x == 0.0 && over_z == 0.0 {
        return Vec3::ZERO;
    }
    if over_x >= over_z {
        // Crossed a vertical edge: keep the motion along z.
        Vec3::new(0.0, 0.0, movement.z)
    } else {
        Vec3::new(movement.x, 0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::HeldKeys;
    use glam::Vec2;

    fn single_region() -> Scene {
        let mut scene = Scene::new();
        scene.walkmap.push(BoundingBox::new(Vec3::ZERO, Vec2::new(4.0, 4.0)));
        scene
    }

    #[test]
    fn forward_follows_yaw() {
        let player = Player::new(Vec3::ZERO, std::f32::consts::FRAC_PI_2, Keymap::default());
        assert!((player.forward() - Vec3::Z).length() < 1e-6);
        let moving = player.movement_vector(&HeldKeys::with([keys::W, keys::D]), 1.0);
        assert!((moving.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn opposite_keys_cancel() {
        let player = Player::new(Vec3::ZERO, 0.0, Keymap::default());
        assert_eq!(player.movement_vector(&HeldKeys::with([keys::W, keys::S]), 1.0), Vec3::ZERO);
    }

    #[test]
    fn move_inside_region_is_direct() {
        let scene = single_region();
        let mut player = Player::spawn(Vec3::new(0.0, 1.8, 0.0), 0.0, Keymap::default(), &scene);
        let report = advance_player_by(&mut player, &scene, Vec3::new(0.1, 0.0, 0.0), 0.1);
        assert_eq!(report.outcome, MoveOutcome::Direct);
        assert_eq!(report.visited, vec![RegionId(0)]);
        assert!((player.position.x - 0.1).abs() < 1e-6);
    }

    fn corridor() -> Scene {
        let mut scene = Scene::new();
        for (x, adjacent) in [(0.0, vec![1]), (4.0, vec![0, 2]), (8.0, vec![1])] {
            let mut region = BoundingBox::new(Vec3::new(x, 0.0, 0.0), Vec2::new(4.0, 4.0));
            region.adjacent.extend(adjacent.into_iter().map(RegionId));
            scene.walkmap.push(region);
        }
        scene
    }

    #[test]
    fn crossing_into_a_neighbour_updates_region() {
        let scene = corridor();
        let mut player = Player::spawn(Vec3::new(1.9, 1.8, 0.0), 0.0, Keymap::default(), &scene);
        let report = advance_player_by(&mut player, &scene, Vec3::new(0.5, 0.0, 0.0), 0.1);
        assert_eq!(report.outcome, MoveOutcome::Direct);
        assert_eq!(player.region, Some(RegionId(1)));
        assert_eq!(report.visited, vec![RegionId(0), RegionId(1)]);
    }

    #[test]
    fn neighbours_beyond_the_budget_are_not_expanded() {
        let scene = corridor();
        let mut player = Player::spawn(Vec3::new(0.0, 1.8, 0.0), 0.0, Keymap::default(), &scene);
        let report = advance_player_by(&mut player, &scene, Vec3::new(8.0, 0.0, 0.0), 0.1);
        assert_eq!(report.outcome, MoveOutcome::Held);
        assert_eq!(report.visited, vec![RegionId(0), RegionId(1)]);
        assert_eq!(player.region, Some(RegionId(0)));
    }

    #[test]
    fn perpendicular_exit_is_held() {
        let scene = single_region();
        let mut player = Player::spawn(Vec3::new(1.9, 1.8, 0.0), 0.0, Keymap::default(), &scene);
        let report = advance_player_by(&mut player, &scene, Vec3::new(0.5, 0.0, 0.0), 0.1);
        assert_eq!(report.outcome, MoveOutcome::Held);
        assert_eq!(player.position.x, 1.9);
    }

    #[test]
    fn vertical_movement_is_dropped_on_a_walkmap() {
        let scene = single_region();
        let mut player = Player::spawn(Vec3::new(0.0, 1.8, 0.0), 0.0, Keymap::default(), &scene);
        advance_player_by(&mut player, &scene, Vec3::new(0.0, 5.0, 0.0), 0.1);
        assert!((player.position.y - 1.8).abs() < 1e-5);
    }

    #[test]
    fn height_eases_without_overshoot() {
        let mut scene = single_region();
        scene.settings.height_ease_rate = 5.0;
        let mut player = Player::spawn(Vec3::new(0.0, 0.0, 0.0), 0.0, Keymap::default(), &scene);
        advance_player_by(&mut player, &scene, Vec3::ZERO, 0.1);
        assert!((player.position.y - 0.9).abs() < 1e-5);
        advance_player_by(&mut player, &scene, Vec3::ZERO, 1.0);
        assert!((player.position.y - 1.8).abs() < 1e-5);
    }

    #[test]
    fn spawn_outside_moves_to_first_region() {
        let scene = single_region();
        let player = Player::spawn(Vec3::new(50.0, 0.0, 50.0), 0.0, Keymap::default(), &scene);
        assert_eq!(player.region, Some(RegionId(0)));
        assert_eq!((player.position.x, player.position.z), (0.0, 0.0));
    }

    #[test]
    fn no_walkmap_moves_freely() {
        let scene = Scene::new();
        let mut player = Player::spawn(Vec3::ZERO, 0.0, Keymap::default(), &scene);
        let report = advance_player_by(&mut player, &scene, Vec3::new(3.0, 1.0, 0.0), 0.1);
        assert_eq!(report.outcome, MoveOutcome::Free);
        assert_eq!(player.position, Vec3::new(3.0, 1.0, 0.0));
    }

    #[test]
    fn collision_box_sits_on_the_floor() {
        let settings = SceneSettings::default();
        let player = Player::new(Vec3::new(0.0, 1.8, 0.0), 0.0, Keymap::default());
        let (center, size) = player.collision_box(&settings);
        assert!((center.y - 1.0).abs() < 1e-6);
        assert_eq!(size, Vec3::new(1.0, 2.0, 1.0));
    }
}
