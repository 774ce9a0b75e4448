use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub terrain: TerrainConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub physics: PhysicsConfig,
}

impl Config {
    /// Loads and validates a TOML config file. Absence of the file is the
    /// caller's concern (defaults apply); a present-but-malformed file is a
    /// fatal load error.
    pub fn load_from_path(path: &Path) -> Result<Config, ConfigError> {
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        let cfg: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.terrain.mesh_quality == 0 || self.terrain.collider_quality == 0 {
            return Err(ConfigError::Invalid(
                "terrain quality must be at least 1".into(),
            ));
        }
        if self.stream.draw_radius < 0 || self.stream.generate_radius < 0 {
            return Err(ConfigError::Invalid("stream radii must be >= 0".into()));
        }
        if self.stream.generate_radius < self.stream.draw_radius {
            return Err(ConfigError::Invalid(format!(
                "generate_radius ({}) must be >= draw_radius ({})",
                self.stream.generate_radius, self.stream.draw_radius
            )));
        }
        if let EvictionPolicy::Lru { max_resident } = self.stream.eviction {
            let window = 2 * self.stream.generate_radius as usize + 1;
            if max_resident < window * window {
                return Err(ConfigError::Invalid(format!(
                    "lru max_resident ({}) is smaller than the generate window ({})",
                    max_resident,
                    window * window
                )));
            }
        }
        if self.physics.timestep <= 0.0 {
            return Err(ConfigError::Invalid("physics timestep must be > 0".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct TerrainConfig {
    #[serde(default = "default_seed")]
    pub seed: i32,
    /// Render tessellation: cells per chunk side.
    #[serde(default = "default_quality")]
    pub mesh_quality: usize,
    /// Collision tessellation, independent of the render quality.
    #[serde(default = "default_quality")]
    pub collider_quality: usize,
    #[serde(default = "default_divisor_frequency")]
    pub divisor_frequency: f32,
    #[serde(default = "default_divisor_scale")]
    pub divisor_scale: f32,
    #[serde(default = "default_divisor_offset")]
    pub divisor_offset: f32,
    #[serde(default = "default_bumpiness_frequency")]
    pub bumpiness_frequency: f32,
    #[serde(default = "default_bumpiness_scale")]
    pub bumpiness_scale: f32,
    #[serde(default = "default_bumpiness_offset")]
    pub bumpiness_offset: f32,
}

fn default_seed() -> i32 {
    1337
}
fn default_quality() -> usize {
    32
}
fn default_divisor_frequency() -> f32 {
    0.001
}
fn default_divisor_scale() -> f32 {
    0.01
}
fn default_divisor_offset() -> f32 {
    0.02
}
fn default_bumpiness_frequency() -> f32 {
    0.0008
}
fn default_bumpiness_scale() -> f32 {
    4.0
}
fn default_bumpiness_offset() -> f32 {
    6.0
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            mesh_quality: default_quality(),
            collider_quality: default_quality(),
            divisor_frequency: default_divisor_frequency(),
            divisor_scale: default_divisor_scale(),
            divisor_offset: default_divisor_offset(),
            bumpiness_frequency: default_bumpiness_frequency(),
            bumpiness_scale: default_bumpiness_scale(),
            bumpiness_offset: default_bumpiness_offset(),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Chunks are retained for the lifetime of the process (the historical
    /// behavior; resident memory grows with everywhere the camera has been).
    KeepAll,
    /// Evict least-recently-windowed chunks past a resident cap.
    Lru { max_resident: usize },
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        EvictionPolicy::KeepAll
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct StreamConfig {
    /// Radius of the window that is drawn each frame.
    #[serde(default = "default_draw_radius")]
    pub draw_radius: i32,
    /// Radius of the window that is kept resident; a halo beyond the draw
    /// radius hides build latency at the edge of view.
    #[serde(default = "default_generate_radius")]
    pub generate_radius: i32,
    #[serde(default = "default_entity_cull_distance")]
    pub entity_cull_distance: f32,
    #[serde(default = "default_seed_entities")]
    pub seed_entities: bool,
    #[serde(default = "default_seed_balls")]
    pub seed_balls: usize,
    #[serde(default = "default_seed_cubes")]
    pub seed_cubes: usize,
    #[serde(default)]
    pub eviction: EvictionPolicy,
}

fn default_draw_radius() -> i32 {
    6
}
fn default_generate_radius() -> i32 {
    12
}
fn default_entity_cull_distance() -> f32 {
    100.0
}
fn default_seed_entities() -> bool {
    true
}
fn default_seed_balls() -> usize {
    2
}
fn default_seed_cubes() -> usize {
    1
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            draw_radius: default_draw_radius(),
            generate_radius: default_generate_radius(),
            entity_cull_distance: default_entity_cull_distance(),
            seed_entities: default_seed_entities(),
            seed_balls: default_seed_balls(),
            seed_cubes: default_seed_cubes(),
            eviction: EvictionPolicy::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct PhysicsConfig {
    /// Fixed simulation step, decoupled from the render frame delta.
    #[serde(default = "default_timestep")]
    pub timestep: f32,
    #[serde(default = "default_gravity_y")]
    pub gravity_y: f32,
}

fn default_timestep() -> f32 {
    1.0 / 50.0
}
fn default_gravity_y() -> f32 {
    -10.0
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            timestep: default_timestep(),
            gravity_y: default_gravity_y(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn parses_partial_toml() {
        let cfg: Config = toml::from_str(
            r#"
            [terrain]
            seed = 7
            mesh_quality = 16

            [stream]
            draw_radius = 2
            generate_radius = 4
            "#,
        )
        .unwrap();
        assert_eq!(cfg.terrain.seed, 7);
        assert_eq!(cfg.terrain.mesh_quality, 16);
        // untouched sections keep defaults
        assert_eq!(cfg.terrain.collider_quality, 32);
        assert_eq!(cfg.stream.entity_cull_distance, 100.0);
        assert_eq!(cfg.physics.timestep, 1.0 / 50.0);
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_draw_radius_beyond_generate_radius() {
        let cfg: Config = toml::from_str(
            r#"
            [stream]
            draw_radius = 8
            generate_radius = 4
            "#,
        )
        .unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("generate_radius"));
    }

    #[test]
    fn parses_lru_eviction() {
        let cfg: Config = toml::from_str(
            r#"
            [stream.eviction.lru]
            max_resident = 1024
            "#,
        )
        .unwrap();
        assert_eq!(
            cfg.stream.eviction,
            EvictionPolicy::Lru { max_resident: 1024 }
        );
        cfg.validate().unwrap();
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = toml::from_str::<Config>("terrain = 3").unwrap_err();
        assert!(!err.to_string().is_empty());
    }
}
