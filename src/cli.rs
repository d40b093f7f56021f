use crate::config::EngineConfigOverrides;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CliOverrides {
    worlds: Vec<PathBuf>,
    frames: Option<u32>,
    delta: Option<f32>,
    mute: bool,
    log_level: Option<String>,
    config: Option<PathBuf>,
}

impl CliOverrides {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = CliOverrides::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            let Some(key) = flag.strip_prefix("--") else {
                bail!("Unexpected argument '{flag}'. Use --world <path> to load a world file.");
            };
            if key == "mute" {
                overrides.mute = true;
                continue;
            }
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "world" => overrides.worlds.push(PathBuf::from(value)),
                "frames" => {
                    overrides.frames =
                        Some(value.parse::<u32>().with_context(|| format!("Invalid frame count '{value}'"))?);
                }
                "delta" => {
                    let delta = value.parse::<f32>().with_context(|| format!("Invalid delta '{value}'"))?;
                    if !(delta > 0.0 && delta.is_finite()) {
                        bail!("Invalid delta '{value}'. Use a positive number of seconds.");
                    }
                    overrides.delta = Some(delta);
                }
                "log-level" => overrides.log_level = Some(value),
                "config" => overrides.config = Some(PathBuf::from(value)),
                _ => bail!(
                    "Unknown flag '{flag}'. Supported flags: --world, --frames, --delta, --mute, --log-level, --config."
                ),
            }
        }
        Ok(overrides)
    }

    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config.as_ref()
    }

    pub fn into_config_overrides(self) -> EngineConfigOverrides {
        EngineConfigOverrides {
            worlds: self.worlds,
            frames: self.frames,
            fixed_delta: self.delta,
            mute: self.mute,
            log_level: self.log_level,
        }
    }
}
