use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::ai::ValueNetwork;
use crate::checkpoint::metadata::CheckpointMetadata;
use crate::error::CheckpointError;

/// Weights file inside every checkpoint directory.
pub const MODEL_FILE: &str = "model.bin";
const METADATA_FILE: &str = "metadata.json";

/// Configuration for the checkpoint manager.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CheckpointManagerConfig {
    pub checkpoint_dir: PathBuf,
    pub keep_last_n: usize,
    pub keep_best_n: usize,
}

impl Default for CheckpointManagerConfig {
    fn default() -> Self {
        CheckpointManagerConfig {
            checkpoint_dir: PathBuf::from("checkpoints"),
            keep_last_n: 5,
            keep_best_n: 3,
        }
    }
}

/// A checkpoint found on disk.
#[derive(Debug)]
pub struct CheckpointData {
    pub path: PathBuf,
    pub metadata: CheckpointMetadata,
}

impl CheckpointData {
    pub fn model_path(&self) -> PathBuf {
        self.path.join(MODEL_FILE)
    }
}

/// Manages saving, loading, listing, and pruning checkpoints.
pub struct CheckpointManager {
    config: CheckpointManagerConfig,
}

impl CheckpointManager {
    pub fn new(config: CheckpointManagerConfig) -> Result<Self, CheckpointError> {
        fs::create_dir_all(&config.checkpoint_dir)?;
        Ok(CheckpointManager { config })
    }

    /// Seconds since the Unix epoch, for [`CheckpointMetadata::timestamp`].
    pub fn now_timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    /// Write `network` and `metadata` as `checkpoint_NNNNNNN/`, point
    /// `latest` at it and prune.
    pub fn save_checkpoint(
        &self,
        network: &ValueNetwork,
        metadata: &CheckpointMetadata,
    ) -> Result<PathBuf, CheckpointError> {
        let dir_name = format!("checkpoint_{:07}", metadata.episode);
        let tmp_dir = self.config.checkpoint_dir.join(format!("{}.tmp", dir_name));
        let final_dir = self.config.checkpoint_dir.join(&dir_name);

        fs::create_dir_all(&tmp_dir)?;
        network.save(&tmp_dir.join(MODEL_FILE))?;
        let meta_json = serde_json::to_string_pretty(metadata)?;
        fs::write(tmp_dir.join(METADATA_FILE), meta_json)?;

        if final_dir.exists() {
            fs::remove_dir_all(&final_dir)?;
        }
        fs::rename(&tmp_dir, &final_dir)?;

        self.update_latest_symlink(&dir_name)?;
        self.prune_old_checkpoints()?;

        Ok(final_dir)
    }

    pub fn load_checkpoint(&self, dir: &Path) -> Result<CheckpointData, CheckpointError> {
        let metadata = read_metadata(&dir.join(METADATA_FILE))?;
        Ok(CheckpointData {
            path: dir.to_path_buf(),
            metadata,
        })
    }

    /// Checkpoint the `latest` symlink points at.
    pub fn load_latest(&self) -> Result<CheckpointData, CheckpointError> {
        let latest_link = self.config.checkpoint_dir.join("latest");
        if !latest_link.exists() {
            return Err(CheckpointError::NoLatestSymlink(
                self.config.checkpoint_dir.clone(),
            ));
        }
        let resolved = fs::read_link(&latest_link)?;
        let target = if resolved.is_relative() {
            self.config.checkpoint_dir.join(resolved)
        } else {
            resolved
        };
        self.load_checkpoint(&target)
    }

    /// List all checkpoints sorted by episode (ascending).
    pub fn list_checkpoints(&self) -> Result<Vec<CheckpointData>, CheckpointError> {
        let mut results = Vec::new();
        for entry in fs::read_dir(&self.config.checkpoint_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() || path.is_symlink() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with("checkpoint_") || name.ends_with(".tmp") {
                continue;
            }
            let meta_path = path.join(METADATA_FILE);
            if meta_path.exists() {
                let metadata = read_metadata(&meta_path)?;
                results.push(CheckpointData { path, metadata });
            }
        }
        results.sort_by_key(|c| c.metadata.episode);
        Ok(results)
    }

    /// Prune old checkpoints, keeping the union of the last N and best N by win_rate.
    fn prune_old_checkpoints(&self) -> Result<(), CheckpointError> {
        let checkpoints = self.list_checkpoints()?;
        if checkpoints.len() <= self.config.keep_last_n {
            return Ok(());
        }

        let total = checkpoints.len();
        let mut keep: HashSet<usize> =
            (total.saturating_sub(self.config.keep_last_n)..total).collect();

        let mut by_win_rate: Vec<(usize, f32)> = checkpoints
            .iter()
            .enumerate()
            .map(|(i, c)| (i, c.metadata.metrics.win_rate))
            .collect();
        by_win_rate.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        keep.extend(
            by_win_rate
                .iter()
                .take(self.config.keep_best_n)
                .map(|(i, _)| *i),
        );

        for (i, checkpoint) in checkpoints.iter().enumerate() {
            if !keep.contains(&i) {
                debug!(path = %checkpoint.path.display(), "pruning checkpoint");
                fs::remove_dir_all(&checkpoint.path)?;
            }
        }
        Ok(())
    }

    /// Update the `latest` symlink to point to the given checkpoint directory name.
    fn update_latest_symlink(&self, dir_name: &str) -> Result<(), CheckpointError> {
        let link_path = self.config.checkpoint_dir.join("latest");
        if link_path.symlink_metadata().is_ok() {
            fs::remove_file(&link_path)?;
        }
        std::os::unix::fs::symlink(dir_name, &link_path)?;
        Ok(())
    }
}

fn read_metadata(path: &Path) -> Result<CheckpointMetadata, CheckpointError> {
    let json = fs::read_to_string(path).map_err(|e| CheckpointError::MetadataRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&json).map_err(|e| CheckpointError::MetadataParse {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::metadata::{CheckpointHyperparameters, CheckpointMetrics};
    use crate::training::metrics::TrainingStats;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn network() -> ValueNetwork {
        let mut rng = StdRng::seed_from_u64(0);
        ValueNetwork::new(8, 4, 3, &mut rng)
    }

    fn metadata(episode: usize, win_rate: f32) -> CheckpointMetadata {
        CheckpointMetadata {
            episode,
            timestamp: 1_700_000_000,
            metrics: CheckpointMetrics {
                win_rate,
                draw_rate: 0.10,
                average_game_length: 20.0,
                current_loss: 0.05,
                update_count: 1000,
            },
            stats: TrainingStats {
                total_games: 10,
                wins: 4,
                losses: 3,
                draws: 2,
                abandoned: 1,
            },
            hyperparameters: CheckpointHyperparameters {
                learning_rate: 0.001,
                discount_factor: 0.95,
                epsilon: 0.1,
                epsilon_min: 0.1,
                epsilon_decay_episodes: 0,
                batch_size: 32,
                buffer_capacity: 10_000,
                input_size: 8,
                hidden_size: 4,
                output_size: 3,
            },
        }
    }

    fn manager(dir: &Path, keep_last_n: usize, keep_best_n: usize) -> CheckpointManager {
        CheckpointManager::new(CheckpointManagerConfig {
            checkpoint_dir: dir.to_path_buf(),
            keep_last_n,
            keep_best_n,
        })
        .unwrap()
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 5, 3);
        let net = network();

        let path = manager.save_checkpoint(&net, &metadata(1000, 0.65)).unwrap();
        assert!(path.ends_with("checkpoint_0001000"));
        assert!(path.join(MODEL_FILE).exists());
        assert!(path.join(METADATA_FILE).exists());

        let data = manager.load_checkpoint(&path).unwrap();
        assert_eq!(data.metadata.episode, 1000);
        assert_eq!(data.metadata.stats.abandoned, 1);

        let mut restored = ValueNetwork::new(8, 4, 3, &mut StdRng::seed_from_u64(9));
        restored.load(&data.model_path()).unwrap();
        assert_eq!(restored, net);
    }

    #[test]
    fn test_latest_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 5, 3);
        let net = network();

        manager.save_checkpoint(&net, &metadata(1000, 0.5)).unwrap();
        manager.save_checkpoint(&net, &metadata(2000, 0.5)).unwrap();

        let latest = manager.load_latest().unwrap();
        assert_eq!(latest.metadata.episode, 2000);
    }

    #[test]
    fn test_list_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 10, 10);
        let net = network();

        for ep in [3000, 1000, 2000] {
            manager.save_checkpoint(&net, &metadata(ep, 0.5)).unwrap();
        }

        let episodes: Vec<usize> = manager
            .list_checkpoints()
            .unwrap()
            .iter()
            .map(|c| c.metadata.episode)
            .collect();
        assert_eq!(episodes, vec![1000, 2000, 3000]);
    }

    #[test]
    fn test_pruning() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 2, 1);
        let net = network();

        let win_rates = [0.5, 0.9, 0.3, 0.6, 0.7];
        for (i, &wr) in win_rates.iter().enumerate() {
            manager
                .save_checkpoint(&net, &metadata((i + 1) * 1000, wr))
                .unwrap();
        }

        let episodes: Vec<usize> = manager
            .list_checkpoints()
            .unwrap()
            .iter()
            .map(|c| c.metadata.episode)
            .collect();
        // Last two plus the best win rate.
        assert_eq!(episodes, vec![2000, 4000, 5000]);
    }

    #[test]
    fn test_load_latest_no_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 5, 3);

        let err = manager.load_latest().unwrap_err();
        assert!(
            matches!(err, CheckpointError::NoLatestSymlink(_)),
            "expected NoLatestSymlink, got: {err}"
        );
    }

    #[test]
    fn test_corrupt_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 5, 3);
        let path = manager.save_checkpoint(&network(), &metadata(10, 0.5)).unwrap();
        fs::write(path.join(METADATA_FILE), "{ not json").unwrap();

        assert!(matches!(
            manager.load_checkpoint(&path),
            Err(CheckpointError::MetadataParse { .. })
        ));
    }

    #[test]
    fn test_metadata_serde() {
        let json = serde_json::to_string_pretty(&metadata(5000, 0.65)).unwrap();
        let back: CheckpointMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back.episode, 5000);
        assert!((back.metrics.win_rate - 0.65).abs() < 1e-6);
        assert_eq!(back.hyperparameters.output_size, 3);
    }
}
