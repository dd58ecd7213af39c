use crate::error::GraftError;
use nanoserde::DeJson;

/// Seed used when neither the config file nor `GRAFT_SEED` provide one
pub const SEED: u64 = 69420;

/// Where parameter sets are mirrored during training
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    /// Parameters live only in host memory
    #[default]
    CPU,
    /// Parameters are mirrored into a [DevicePool](crate::transfer::DevicePool)
    Dummy,
}

/// Runtime configuration.
///
/// Resolved in this order, later sources win:
/// 1. defaults
/// 2. `graft/config.json` in the xdg config directories
/// 3. `GRAFT_DEBUG`, `GRAFT_SEED` and `GRAFT_DEVICE` env variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Target device
    pub device: Device,
    /// Seed for parameter initialization and dropout masks
    pub seed: u64,
    /// Debug mask, bit 0 traces graph construction, bit 1 traces device transfers,
    /// bit 2 reports how the config was resolved
    pub debug: u32,
}

// All fields are optional so that partial config files are accepted.
#[derive(DeJson, Default)]
struct ConfigFile {
    #[nserde(default)]
    device: Option<String>,
    #[nserde(default)]
    seed: Option<u64>,
    #[nserde(default)]
    debug: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            device: Device::CPU,
            seed: SEED,
            debug: 0,
        }
    }
}

impl Device {
    fn parse(name: &str) -> Result<Device, GraftError> {
        match name.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Device::CPU),
            "dummy" => Ok(Device::Dummy),
            _ => Err(GraftError::ConfigError(
                format!("Unknown device {name:?}, expected \"cpu\" or \"dummy\"").into(),
            )),
        }
    }
}

impl Config {
    /// Parse config from json, missing fields keep their default values.
    ///
    /// # Errors
    ///
    /// Errors if json is malformed or names unknown device.
    pub fn from_json(json: &str) -> Result<Config, GraftError> {
        let file = ConfigFile::deserialize_json(json)?;
        let mut config = Config::default();
        if let Some(device) = file.device {
            config.device = Device::parse(&device)?;
        }
        if let Some(seed) = file.seed {
            config.seed = seed;
        }
        if let Some(debug) = file.debug {
            config.debug = debug;
        }
        Ok(config)
    }

    /// Load config from the xdg config directories and env variables.
    /// Never fails, sources that can not be read or parsed are skipped.
    #[must_use]
    pub fn load() -> Config {
        let mut config = Config::default();
        // Debug mask must be known before we report on the config file
        config.apply_vars(|var| std::env::var(var).ok());
        let debug = config.debug_config();

        let file = xdg::BaseDirectories::with_prefix("graft")
            .map_err(|e| {
                if debug {
                    log::debug!("Failed to find config directories for config.json, {e}");
                }
            })
            .ok()
            .and_then(|bd| bd.find_config_file("config.json"))
            .and_then(|path| std::fs::read_to_string(path).ok());

        if let Some(file) = file {
            match Config::from_json(&file) {
                Ok(mut from_file) => {
                    from_file.apply_vars(|var| std::env::var(var).ok());
                    config = from_file;
                    if debug {
                        log::debug!("Config successfully read and parsed.");
                    }
                }
                Err(e) => {
                    if debug {
                        log::debug!("Failed to parse config.json, {e}, using defaults.");
                    }
                }
            }
        }
        config
    }

    /// Override fields from variables returned by `var`.
    /// Values that fail to parse are ignored.
    pub fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(x) = var("GRAFT_DEBUG").and_then(|x| x.parse().ok()) {
            self.debug = x;
        }
        if let Some(x) = var("GRAFT_SEED").and_then(|x| x.parse().ok()) {
            self.seed = x;
        }
        if let Some(x) = var("GRAFT_DEVICE").and_then(|x| Device::parse(&x).ok()) {
            self.device = x;
        }
    }

    /// Trace every node pushed into the graph
    #[must_use]
    pub const fn debug_graph(&self) -> bool {
        self.debug % 2 == 1
    }

    /// Trace copies between host and device
    #[must_use]
    pub const fn debug_transfer(&self) -> bool {
        (self.debug >> 1) % 2 == 1
    }

    const fn debug_config(&self) -> bool {
        (self.debug >> 2) % 2 == 1
    }
}
