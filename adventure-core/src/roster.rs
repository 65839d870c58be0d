//! Character roster.
//!
//! Characters outlive a single campaign: each one is stored as
//! `<dir>/<sanitized name>.json` holding the character sheet, pack and
//! equipped gear. Loading a character for a new campaign restores full HP and
//! mana and tops up healing potions.

use crate::content::{self, ContentError, EquipSlot, Item};
use crate::state::{Character, GameState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

/// Roster directory used when none is configured.
pub const DEFAULT_CHARACTERS_DIR: &str = "characters";

/// Current roster file version.
pub const ROSTER_VERSION: u32 = 1;

const POTION_ID: &str = "healing_potion";
const STARTING_POTIONS: usize = 3;

fn default_version() -> u32 {
    ROSTER_VERSION
}

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("Character '{0}' not found.")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to load character: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Content(#[from] ContentError),
}

/// On-disk form of a roster entry: the character's fields at the top level
/// next to `version`, `inventory` and `equipment`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedCharacter {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(flatten)]
    pub character: Character,
    #[serde(default)]
    pub inventory: Vec<Item>,
    #[serde(default)]
    pub equipment: BTreeMap<EquipSlot, Item>,
}

impl SavedCharacter {
    /// One-line description for pick lists.
    pub fn summary(&self) -> String {
        format!(
            "{} ({} {}, level {}) - {} gold, {} items",
            self.character.name,
            self.character.race,
            self.character.class,
            self.character.level,
            self.character.gold,
            self.inventory.len()
        )
    }
}

/// Convert a character name into a safe file stem.
///
/// Lowercases, drops anything but letters, digits, `_`, whitespace and `-`,
/// then joins words with `_`. Names with nothing left become `character`.
pub fn sanitize_name(name: &str) -> String {
    let kept: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();
    let joined = kept
        .split(|c: char| c == '-' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    let trimmed = joined.trim_matches('_');
    if trimmed.is_empty() {
        "character".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Directory of saved characters.
#[derive(Debug, Clone)]
pub struct Roster {
    dir: PathBuf,
}

impl Default for Roster {
    fn default() -> Self {
        Self::new(DEFAULT_CHARACTERS_DIR)
    }
}

impl Roster {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_name(name)))
    }

    /// Names of saved characters, sorted and de-duplicated.
    ///
    /// A missing directory is an empty roster. Unreadable files are skipped.
    pub async fn list(&self) -> Result<Vec<String>, RosterError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        #[derive(Deserialize)]
        struct NameOnly {
            name: String,
        }

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = match fs::read_to_string(&path).await {
                Ok(raw) => serde_json::from_str::<NameOnly>(&raw).ok(),
                Err(_) => None,
            };
            match parsed {
                Some(entry) => names.push(entry.name),
                None => debug!(path = %path.display(), "skipping unreadable roster file"),
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Write a character with its pack and gear.
    pub async fn save(
        &self,
        character: &Character,
        inventory: &[Item],
        equipment: &BTreeMap<EquipSlot, Item>,
    ) -> Result<PathBuf, RosterError> {
        let saved = SavedCharacter {
            version: ROSTER_VERSION,
            character: character.clone(),
            inventory: inventory.to_vec(),
            equipment: equipment.clone(),
        };
        fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(&character.name);
        fs::write(&path, serde_json::to_string_pretty(&saved)?).await?;
        debug!(path = %path.display(), "character saved");
        Ok(path)
    }

    /// Save the player of a running game.
    pub async fn sync(&self, state: &GameState) -> Result<PathBuf, RosterError> {
        self.save(&state.player, &state.inventory, &state.equipment)
            .await
    }

    /// Read a roster entry exactly as stored.
    pub async fn read(&self, name: &str) -> Result<SavedCharacter, RosterError> {
        let path = self.path_for(name);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RosterError::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&raw)?)
    }

    /// Load a character to start `campaign_id`: full HP and mana, and at
    /// least three healing potions from that campaign's catalog.
    pub async fn load(&self, name: &str, campaign_id: &str) -> Result<SavedCharacter, RosterError> {
        let campaign = content::campaign(campaign_id)?;
        let mut saved = self.read(name).await?;
        if saved.version != ROSTER_VERSION {
            warn!(name, version = saved.version, "roster entry has an unexpected version");
        }

        let character = &mut saved.character;
        character.hp = character.max_hp;
        character.mana = character.max_mana;

        let potions = saved
            .inventory
            .iter()
            .filter(|item| item.id.eq_ignore_ascii_case(POTION_ID))
            .count();
        for _ in potions..STARTING_POTIONS {
            saved.inventory.push(campaign.item_from_id(POTION_ID));
        }
        Ok(saved)
    }
}

/// Remove the campaign's quest items from the pack and equipment.
pub fn strip_campaign_quest_items(state: &mut GameState) {
    let Ok(campaign) = state.campaign() else {
        return;
    };
    let quest_ids = campaign.quest_item_ids();
    if quest_ids.is_empty() {
        return;
    }
    state
        .inventory
        .retain(|item| !quest_ids.contains(&item.id.as_str()));
    state
        .equipment
        .retain(|_, item| !quest_ids.contains(&item.id.as_str()));
}
