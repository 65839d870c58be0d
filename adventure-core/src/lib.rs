//! Solo text adventure engine with an optional LLM narrator.
//!
//! This crate provides:
//! - A deterministic rules engine (combat, spells, exploration, loot, rest)
//! - Two built-in campaigns with rooms, items, enemies and companions
//! - Save files and a character roster that survives between campaigns
//! - Prompt building for a GM narrator and a companion advisor
//!
//! The rules engine decides every outcome. Narration only describes it.
//!
//! # Quick Start
//!
//! ```ignore
//! use adventure_core::{GameSession, OfflineNarrator, RngRoller, SessionConfig, FirstChoice};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::new().with_save_path("game_state.json");
//!     let mut session =
//!         GameSession::resume(config, Box::new(OfflineNarrator), Box::new(RngRoller::from_entropy()))
//!             .await?;
//!
//!     session.handle("talk", &mut FirstChoice).await?;
//!     if let Some(narration) = session.narrate_pending().await {
//!         println!("{}", narration.entry.gm_response);
//!     }
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod content;
pub mod dice;
pub mod format;
pub mod narration;
pub mod persist;
pub mod profiles;
pub mod roster;
pub mod rules;
pub mod session;
pub mod state;
pub mod testing;

// Primary public API
pub use dice::{DiceExpression, RngRoller, Roller};
pub use narration::{Narrator, OfflineNarrator};
pub use persist::{PersistError, SavedGame};
pub use profiles::{CharacterClass, Race, Stat, Stats};
pub use roster::{Roster, RosterError, SavedCharacter};
pub use rules::{FirstChoice, SpellChooser};
pub use session::{
    new_game_state, starting_kit, GameSession, GearReply, Narration, SessionConfig, SessionError,
    TurnReport,
};
pub use state::{Character, Companion, GameState, NarrationSource};
