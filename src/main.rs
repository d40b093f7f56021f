use museum_engine::cli::CliOverrides;
use museum_engine::config::EngineConfig;
use museum_engine::run_headless;
use simplelog::TermLogger;
use std::path::PathBuf;

const DEFAULT_CONFIG: &str = "config/museum.json";

fn main() {
    let cli = match CliOverrides::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("[cli] {err}");
            std::process::exit(2);
        }
    };
    let config_path = cli.config_path().cloned().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let overrides = cli.into_config_overrides();

    let loaded = EngineConfig::load(&config_path);
    let mut config = loaded.as_ref().cloned().unwrap_or_default();
    config.apply_overrides(&overrides);

    if let Err(err) = TermLogger::init(
        config.level_filter(),
        simplelog::ConfigBuilder::default().set_time_level(log::LevelFilter::Trace).build(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    ) {
        eprintln!("[log] {err}");
    }
    if let Err(err) = &loaded {
        log::warn!("[config] {err:#}. Falling back to defaults.");
    }
    if !overrides.is_empty() {
        log::info!("[cli] overriding {}", overrides.applied_fields().join(", "));
    }

    if let Err(err) = run_headless(&config) {
        log::error!("Application error: {err:?}");
        std::process::exit(1);
    }
}
