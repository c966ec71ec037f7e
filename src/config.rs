use std::path::Path;

use tracing::warn;

use crate::ai::AgentConfig;
use crate::checkpoint::CheckpointManagerConfig;
use crate::error::ConfigError;
use crate::game::pieces::PIECE_NAMES;
use crate::game::SandboxRules;
use crate::training::TrainerConfig;

/// Board dimensions and the sandbox rule settings.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub width: usize,
    pub height: usize,
    /// Piece kinds in play; also the number of grid channels.
    pub piece_types: usize,
    /// Turn after which a sandbox game is a draw.
    pub turn_limit: u32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        BoardConfig {
            width: 10,
            height: 10,
            piece_types: PIECE_NAMES.len(),
            turn_limit: 200,
        }
    }
}

impl BoardConfig {
    pub fn sandbox_rules(&self) -> SandboxRules {
        SandboxRules::new(self.width, self.height, self.piece_types, self.turn_limit)
    }
}

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub board: BoardConfig,
    pub agent: AgentConfig,
    pub training: TrainerConfig,
    pub checkpoint: CheckpointManagerConfig,
}

fn invalid(msg: &str) -> Result<(), ConfigError> {
    Err(ConfigError::Validation(msg.into()))
}

fn unit_range(value: f32) -> bool {
    (0.0..=1.0).contains(&value)
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let board = &self.board;
        if board.width == 0 || board.height == 0 {
            return invalid("board.width and board.height must be > 0");
        }
        if board.piece_types == 0 || board.piece_types > PIECE_NAMES.len() {
            return invalid("board.piece_types must be in [1, 8]");
        }

        let agent = &self.agent;
        if !unit_range(agent.epsilon) {
            return invalid("agent.epsilon must be in [0, 1]");
        }
        if !unit_range(agent.epsilon_min) {
            return invalid("agent.epsilon_min must be in [0, 1]");
        }
        if agent.epsilon_min > agent.epsilon {
            return invalid("agent.epsilon_min must be <= agent.epsilon");
        }
        if agent.learning_rate <= 0.0 || !agent.learning_rate.is_finite() {
            return invalid("agent.learning_rate must be > 0");
        }
        if agent.hidden_size == 0 {
            return invalid("agent.hidden_size must be > 0");
        }
        if agent.output_size == 0 {
            return invalid("agent.output_size must be > 0");
        }

        let training = &self.training;
        if training.num_episodes == 0 {
            return invalid("training.num_episodes must be > 0");
        }
        if training.max_moves_per_episode == 0 {
            return invalid("training.max_moves_per_episode must be > 0");
        }
        if !unit_range(training.discount_factor) {
            return invalid("training.discount_factor must be in [0, 1]");
        }
        if training.batch_size == 0 {
            return invalid("training.batch_size must be > 0");
        }
        if training.buffer_capacity < training.batch_size {
            return invalid("training.buffer_capacity must be >= training.batch_size");
        }
        if training.update_interval == 0 {
            return invalid("training.update_interval must be > 0");
        }

        if self.checkpoint.keep_last_n == 0 {
            return invalid("checkpoint.keep_last_n must be >= 1");
        }
        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&AppConfig::default())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        config.validate().expect("default config should be valid");
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!((config.agent.epsilon - 0.1).abs() < 1e-6);
        assert!((config.agent.learning_rate - 0.001).abs() < 1e-9);
        assert!((config.training.discount_factor - 0.95).abs() < 1e-6);
        assert_eq!(config.training.buffer_capacity, 10_000);
        assert_eq!(config.training.batch_size, 32);
        assert_eq!(config.agent.hidden_size, 256);
        assert_eq!(config.agent.output_size, 100);
        assert_eq!(config.training.num_episodes, 20);
        assert_eq!(config.training.max_moves_per_episode, 200);
        assert_eq!(config.training.update_interval, 1);
        assert_eq!(
            (config.board.width, config.board.height, config.board.piece_types),
            (10, 10, 8)
        );
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
[agent]
learning_rate = 0.01
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!((config.agent.learning_rate - 0.01).abs() < 1e-9);
        assert!((config.training.discount_factor - 0.95).abs() < 1e-6);
        assert_eq!(config.training.num_episodes, 20);
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        let default = AppConfig::default();
        assert!((config.agent.learning_rate - default.agent.learning_rate).abs() < 1e-9);
        assert_eq!(config.training.num_episodes, default.training.num_episodes);
    }

    #[test]
    fn test_validation_rejects_zero_episodes() {
        let mut config = AppConfig::default();
        config.training.num_episodes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_negative_lr() {
        let mut config = AppConfig::default();
        config.agent.learning_rate = -0.001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_invalid_discount() {
        let mut config = AppConfig::default();
        config.training.discount_factor = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_epsilon_out_of_range() {
        let mut config = AppConfig::default();
        config.agent.epsilon = 1.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.agent.epsilon_min = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_epsilon_min_gt_start() {
        let mut config = AppConfig::default();
        config.agent.epsilon = 0.1;
        config.agent.epsilon_min = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_buffer_lt_batch() {
        let mut config = AppConfig::default();
        config.training.buffer_capacity = 10;
        config.training.batch_size = 64;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_sizes() {
        let mut config = AppConfig::default();
        config.agent.output_size = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.board.width = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.board.piece_types = 9;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.training.update_interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = AppConfig::load_or_default(Path::new("nonexistent_config.toml")).unwrap();
        assert_eq!(config.training.num_episodes, 20);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
[training]
num_episodes = 500

[board]
width = 6
height = 5
"#
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.training.num_episodes, 500);
        assert_eq!((config.board.width, config.board.height), (6, 5));
        assert!((config.agent.learning_rate - 0.001).abs() < 1e-9);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[training]\nbatch_size = 0\n").unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::Validation(_))
        ));

        std::fs::write(&path, "[training\n").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_default_toml_roundtrips() {
        let toml_str = AppConfig::default_toml().unwrap();
        let config: AppConfig = toml::from_str(&toml_str).unwrap();
        config.validate().expect("roundtripped config should be valid");
    }
}
