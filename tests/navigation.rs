use glam::Vec3;
use museum_engine::assets::DiskAssets;
use museum_engine::audio::NullAudio;
use museum_engine::input::{keys, HeldKeys};
use museum_engine::navigation::{advance_player, advance_player_by, Keymap, MoveOutcome, Player};
use museum_engine::walkmap::RegionId;
use museum_engine::{load_world_str, Scene};
use std::collections::HashSet;

fn scene_from(text: &str) -> Scene {
    let mut scene = Scene::new();
    let report = load_world_str(&mut scene, text, &mut DiskAssets::new(), &mut NullAudio::default());
    assert_eq!(report.dropped, 0, "test world should load cleanly");
    scene
}

#[test]
fn edge_crossing_slides_along_the_wall() {
    let scene = scene_from("~[0,0,0,4,4]");
    let mut player = Player::spawn(Vec3::new(1.8, 1.8, 0.0), 0.0, Keymap::default(), &scene);
    assert_eq!(player.region, Some(RegionId(0)));

    let report = advance_player_by(&mut player, &scene, Vec3::new(0.3536, 0.0, 0.3536), 0.1);
    assert_eq!(report.outcome, MoveOutcome::Slid);
    assert_eq!(report.searches, 2);
    assert!((player.position.x - 1.8).abs() < 1e-6, "x is locked at the wall, got {}", player.position.x);
    assert!((player.position.z - 0.3536).abs() < 1e-6, "z keeps its component, got {}", player.position.z);
    assert_eq!(player.region, Some(RegionId(0)));
}

#[test]
fn search_over_a_cycle_visits_each_region_once() {
    let scene = scene_from("~[0,0,0,4,4,1,3] ~[4,0,0,4,4,0,2] ~[4,0,4,4,4,1,3] ~[0,0,4,4,4,2,0]");
    let mut player = Player::spawn(Vec3::new(0.0, 1.8, 0.0), 0.0, Keymap::default(), &scene);

    // Far outside every region and straight along x, so the slide has nothing to keep.
    let report = advance_player_by(&mut player, &scene, Vec3::new(100.0, 0.0, 0.0), 100.0);
    assert_eq!(report.outcome, MoveOutcome::Held);
    assert_eq!(report.searches, 1);
    assert_eq!(report.visited, vec![RegionId(0), RegionId(1), RegionId(2), RegionId(3)]);
    let unique: HashSet<_> = report.visited.iter().collect();
    assert_eq!(unique.len(), report.visited.len());
    assert_eq!(player.position, Vec3::new(0.0, 1.8, 0.0));
}

#[test]
fn walking_a_corridor_steps_up_onto_a_higher_floor() {
    let scene = scene_from("~[0,0,0,4,4,1] ~[4,0,0,4,4,0,2] ~[8,0.5,0,4,4,1]");
    let mut player = Player::spawn(Vec3::new(0.0, 1.8, 0.0), 0.0, Keymap::default(), &scene);
    let walking = HeldKeys::with([keys::W]);

    let mut regions = Vec::new();
    for _ in 0..40 {
        let report = advance_player(&mut player, &scene, &walking, 0.1);
        assert_eq!(report.outcome, MoveOutcome::Direct);
        if regions.last() != report.region.as_ref() {
            regions.extend(report.region);
        }
    }

    assert_eq!(regions, vec![RegionId(0), RegionId(1), RegionId(2)]);
    assert!((player.position.x - 8.0).abs() < 1e-3, "expected x near 8, got {}", player.position.x);
    // Eye height snaps to the new floor because the ease factor clamps to one at this delta.
    assert!((player.position.y - 2.3).abs() < 1e-5, "expected eye at 2.3, got {}", player.position.y);
}

#[test]
fn spawn_outside_every_region_moves_to_the_first() {
    let scene = scene_from("~[10,0,-6,2,2] ~[14,0,-6,2,2,0]");
    let player = Player::spawn(Vec3::new(0.0, 1.8, 0.0), 0.0, Keymap::default(), &scene);
    assert_eq!(player.region, Some(RegionId(0)));
    assert_eq!((player.position.x, player.position.z), (10.0, -6.0));
}

#[test]
fn vertical_keys_do_nothing_on_a_walkmap() {
    let scene = scene_from("~[0,0,0,4,4]");
    let mut player = Player::spawn(Vec3::new(0.0, 1.8, 0.0), 0.0, Keymap::default(), &scene);
    let report = advance_player(&mut player, &scene, &HeldKeys::with([keys::SPACE]), 0.1);
    assert_eq!(report.outcome, MoveOutcome::Direct);
    assert_eq!(player.position, Vec3::new(0.0, 1.8, 0.0));
}
