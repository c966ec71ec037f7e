//! # Hive Learner
//!
//! Self-play value learning for a Hive-style tile placement and movement
//! game. An agent scores candidate moves with a small two-layer network,
//! picks them epsilon-greedily, stores what happened in a replay buffer and
//! periodically fits the network to bootstrapped targets.
//!
//! ## Modules
//!
//! - [`game`]: Positions, actions, piece catalogue, rules interface and a sandbox rule set
//! - [`ai`]: State encoding, action ids, value network, policy and agents
//! - [`training`]: Self-play episodes, replay buffer, trainer and update worker
//! - [`session`]: Turn orchestration between two agents
//! - [`checkpoint`]: Model persistence and versioning
//! - [`config`]: TOML configuration loading and validation
//! - [`error`]: Structured error types

pub mod ai;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod game;
pub mod session;
pub mod training;
