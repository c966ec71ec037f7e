//! Game-side data model: positions, actions, the piece catalogue, and the
//! interface to the rules engine (plus a reduced sandbox rule set).

mod action;
pub mod pieces;
mod player;
mod rules;
pub mod sandbox;
mod state;

pub use action::Action;
pub use player::Player;
pub use rules::{RulesDelegate, StepOutcome};
pub use sandbox::SandboxRules;
pub use state::GameState;
