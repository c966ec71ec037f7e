pub mod action_space;
mod agent;
pub mod dqn;
pub mod network;
pub mod policy;
mod random;
pub mod state_encoding;

pub use action_space::ActionSpace;
pub use agent::Agent;
pub use dqn::{AgentConfig, DqnAgent};
pub use network::{NetworkParameters, ValueNetwork};
pub use policy::EpsilonGreedy;
pub use random::RandomAgent;
