pub mod assets;
pub mod audio;
pub mod cli;
pub mod config;
pub mod geometry;
pub mod input;
pub mod mesh;
pub mod navigation;
pub mod runtime;
pub mod scene;
pub mod time;
pub mod triggers;
pub mod walkmap;
pub mod world;

pub use navigation::{advance_player, Player};
pub use runtime::{run_headless, Runtime};
pub use scene::Scene;
pub use triggers::evaluate_triggers;
pub use world::{load_world_file, load_world_str};
