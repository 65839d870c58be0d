//! Save-file persistence.
//!
//! A save is a pretty-printed JSON document `{ "version": 1, "state": {...} }`.
//! Loading checks the version before parsing the state so an incompatible
//! file reports a version mismatch rather than a parse error, then repairs the
//! few derived values that older or hand-edited saves may get wrong.

use crate::content::{self, ContentError, Item};
use crate::rules::{ensure_caster_mana, sync_player_ac};
use crate::state::{trim_front, GameState, RESPONSE_LOG_LIMIT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

/// Current save file version.
pub const SAVE_VERSION: u32 = 1;

/// Save file name used when none is configured.
pub const DEFAULT_SAVE_FILE: &str = "game_state.json";

/// Potions restocked into an empty pack on load.
const RESTOCK_POTIONS: usize = 3;
const POTION_ID: &str = "healing_potion";

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Save file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Save file is corrupt or invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Save file refers to missing content: {0}")]
    Content(#[from] ContentError),
}

/// A saved game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedGame {
    /// Save format version for compatibility checking.
    pub version: u32,

    /// The complete game state.
    pub state: GameState,
}

#[derive(Serialize)]
struct SavedGameRef<'a> {
    version: u32,
    state: &'a GameState,
}

impl SavedGame {
    pub fn new(state: GameState) -> Self {
        Self {
            version: SAVE_VERSION,
            state,
        }
    }

    /// Save to a JSON file.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        save_game(&self.state, path).await
    }

    /// Load from a JSON file without applying load fixups.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PersistError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        // Parse just the version first.
        #[derive(Deserialize)]
        struct Partial {
            version: u32,
        }
        let partial: Partial = serde_json::from_str(&content)?;
        if partial.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: partial.version,
            });
        }

        let mut raw: Value = serde_json::from_str(&content)?;
        expand_named_items(&mut raw)?;
        Ok(serde_json::from_value(raw)?)
    }
}

/// Inventory entries may be bare display names; swap in the catalog item.
fn expand_named_items(raw: &mut Value) -> Result<(), serde_json::Error> {
    let Some(state) = raw.get_mut("state") else {
        return Ok(());
    };
    let Some(campaign) = state
        .get("campaign_id")
        .and_then(Value::as_str)
        .and_then(|id| content::campaign(id).ok())
    else {
        return Ok(());
    };
    let Some(entries) = state.get_mut("inventory").and_then(Value::as_array_mut) else {
        return Ok(());
    };
    for entry in entries.iter_mut() {
        if let Some(name) = entry.as_str() {
            let item = serde_json::to_value(campaign.item_from_name(name))?;
            *entry = item;
        }
    }
    Ok(())
}

/// Write `state` to `path`, creating parent directories as needed.
pub async fn save_game(state: &GameState, path: impl AsRef<Path>) -> Result<(), PersistError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_string_pretty(&SavedGameRef {
        version: SAVE_VERSION,
        state,
    })?;
    fs::write(path, content).await?;
    debug!(path = %path.display(), turn = state.turn, "game saved");
    Ok(())
}

/// Load a save and make it playable.
///
/// The campaign and room must exist. The response log is trimmed, an empty
/// pack gets three healing potions, AC is recomputed from equipment, and
/// casters get a valid mana pool.
pub async fn load_game(path: impl AsRef<Path>) -> Result<GameState, PersistError> {
    let path = path.as_ref();
    let mut state = SavedGame::load_json(path).await?.state;
    repair_loaded_state(&mut state)?;
    info!(path = %path.display(), campaign = %state.campaign_id, turn = state.turn, "game loaded");
    Ok(state)
}

pub(crate) fn repair_loaded_state(state: &mut GameState) -> Result<(), ContentError> {
    let campaign = state.campaign()?;
    campaign.room(&state.room_id)?;

    trim_front(&mut state.response_log, RESPONSE_LOG_LIMIT);
    if state.inventory.is_empty() {
        let potion: Item = campaign.item_from_id(POTION_ID);
        state.inventory = vec![potion; RESTOCK_POTIONS];
    }
    sync_player_ac(state);
    ensure_caster_mana(state);
    Ok(())
}

/// Whether a save file is present.
pub async fn save_exists(path: impl AsRef<Path>) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::EquipSlot;
    use crate::state::{NarrationSource, ResponseEntry};
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game_state.json");
        let mut state = fixtures::watchtower_state();
        state.inventory = vec![fixtures::watchtower_item("healing_potion")];
        state.flags.set("scout_helped");
        state.turn = 4;

        save_game(&state, &path).await.unwrap();
        let loaded = load_game(&path).await.unwrap();
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn test_inventory_names_resolve_to_catalog_items() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("named.json");
        save_game(&fixtures::watchtower_state(), &path).await.unwrap();

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        let mut json: Value = serde_json::from_str(&raw).unwrap();
        json["state"]["inventory"] = serde_json::json!(["Healing Potion", "Mystery Rock"]);
        tokio::fs::write(&path, json.to_string()).await.unwrap();

        let loaded = load_game(&path).await.unwrap();
        let ids: Vec<&str> = loaded.inventory.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["healing_potion", "unknown"]);
        assert_eq!(loaded.inventory[1].name, "Mystery Rock");
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_game(dir.path().join("nope.json")).await.unwrap_err();
        assert!(matches!(err, PersistError::NotFound(_)));
        assert!(!save_exists(dir.path().join("nope.json")).await);
    }

    #[tokio::test]
    async fn test_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();
        let err = load_game(&path).await.unwrap_err();
        assert!(matches!(err, PersistError::Json(_)));
    }

    #[tokio::test]
    async fn test_version_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.json");
        tokio::fs::write(&path, r#"{"version": 7, "state": {}}"#)
            .await
            .unwrap();
        let err = load_game(&path).await.unwrap_err();
        assert!(matches!(
            err,
            PersistError::VersionMismatch {
                expected: 1,
                found: 7
            }
        ));
    }

    #[tokio::test]
    async fn test_unknown_room() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lost.json");
        let mut state = fixtures::watchtower_state();
        state.room_id = "moon".to_string();
        save_game(&state, &path).await.unwrap();
        let err = load_game(&path).await.unwrap_err();
        assert!(matches!(
            err,
            PersistError::Content(ContentError::UnknownRoom { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_fixups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixups.json");
        let mut state = fixtures::watchtower_state();
        state
            .equipment
            .insert(EquipSlot::Head, fixtures::watchtower_item("leather_cap"));
        state.player.ac = 1;
        for turn in 0..60 {
            state.response_log.push(ResponseEntry {
                turn,
                player_input: String::new(),
                rules_result: String::new(),
                gm_response: String::new(),
                gm_source: NarrationSource::Stub,
            });
        }
        save_game(&state, &path).await.unwrap();

        let loaded = load_game(&path).await.unwrap();
        assert_eq!(loaded.response_log.len(), RESPONSE_LOG_LIMIT);
        assert_eq!(loaded.inventory.len(), 3);
        assert!(loaded.inventory.iter().all(|i| i.id == "healing_potion"));
        assert_eq!(loaded.player.ac, loaded.player.base_ac + 1);
    }

    #[tokio::test]
    async fn test_saved_game_wrapper() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("save.json");
        let saved = SavedGame::new(fixtures::wizard_state());
        saved.save_json(&path).await.unwrap();
        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(raw.contains("\"version\": 1"));
        let back = SavedGame::load_json(&path).await.unwrap();
        assert_eq!(back.state, saved.state);
    }
}
