//! Mutable game state.
//!
//! Everything the rules engine reads or writes between turns lives here and
//! round-trips through the save file. Content (rooms, catalogs, mob profiles)
//! stays in [`crate::content`] and is referenced by id.

use crate::content::{self, Campaign, ContentError, EquipSlot, Item, Room};
use crate::dice::DiceExpression;
use crate::profiles::{CharacterClass, Race, Stats};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Default number of counted items a pack holds.
pub const DEFAULT_INVENTORY_LIMIT: usize = 10;
/// Response log entries kept in memory and on disk.
pub const RESPONSE_LOG_LIMIT: usize = 50;

fn default_level() -> u32 {
    1
}

fn default_defend_threshold() -> i32 {
    3
}

fn default_next_corpse_id() -> u32 {
    1
}

fn default_inventory_limit() -> usize {
    DEFAULT_INVENTORY_LIMIT
}

/// The player character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    #[serde(default)]
    pub race: Race,
    #[serde(rename = "cls")]
    pub class: CharacterClass,
    #[serde(default)]
    pub stats: Stats,
    pub hp: i32,
    pub max_hp: i32,
    pub ac: i32,
    pub base_ac: i32,
    #[serde(default)]
    pub mana: i32,
    #[serde(default)]
    pub max_mana: i32,
    pub attack_bonus: i32,
    pub damage: DiceExpression,
    #[serde(default)]
    pub gold: i32,
    #[serde(default)]
    pub xp: u32,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub learned_spells: Vec<String>,
}

impl Character {
    pub fn is_caster(&self) -> bool {
        self.class.is_caster()
    }

    pub fn knows_spell(&self, spell: &str) -> bool {
        self.learned_spells
            .iter()
            .any(|s| s.eq_ignore_ascii_case(spell))
    }
}

/// An allied non-player character fighting beside the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Companion {
    pub name: String,
    pub hp: i32,
    pub max_hp: i32,
    pub ac: i32,
    pub attack_bonus: i32,
    pub damage: DiceExpression,
    #[serde(default)]
    pub mana: i32,
    #[serde(default)]
    pub max_mana: i32,
    #[serde(default)]
    pub learned_spells: Vec<String>,
    #[serde(default = "default_defend_threshold")]
    pub defend_hp_threshold: i32,
}

impl Companion {
    pub fn is_down(&self) -> bool {
        self.hp <= 0
    }

    pub fn is_caster(&self) -> bool {
        self.max_mana > 0
    }
}

/// A hostile combatant spawned from a mob profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub name: String,
    pub hp: i32,
    pub max_hp: i32,
    pub ac: i32,
    pub attack_bonus: i32,
    pub damage: DiceExpression,
    /// Skips its turns until it takes damage.
    #[serde(default)]
    pub asleep: bool,
}

impl Enemy {
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }
}

/// Remains of a defeated enemy, looted at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corpse {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub looted: bool,
}

/// Persistent world facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldFlags {
    #[serde(default)]
    pub defeated_rooms: BTreeSet<String>,
    #[serde(default)]
    pub corpses: BTreeMap<String, Vec<Corpse>>,
    #[serde(default = "default_next_corpse_id")]
    pub next_corpse_id: u32,
    /// Free-form story flags set by room scenes (`scout_helped`, ...).
    #[serde(default)]
    pub story: BTreeSet<String>,
    /// Completion XP for this campaign has been paid out.
    #[serde(default)]
    pub completion_awarded: bool,
}

impl Default for WorldFlags {
    fn default() -> Self {
        Self {
            defeated_rooms: BTreeSet::new(),
            corpses: BTreeMap::new(),
            next_corpse_id: default_next_corpse_id(),
            story: BTreeSet::new(),
            completion_awarded: false,
        }
    }
}

impl WorldFlags {
    pub fn is_defeated(&self, room_id: &str) -> bool {
        self.defeated_rooms.contains(room_id)
    }

    pub fn has(&self, flag: &str) -> bool {
        self.story.contains(flag)
    }

    pub fn set(&mut self, flag: impl Into<String>) {
        self.story.insert(flag.into());
    }

    /// Allocate the next corpse id.
    pub fn take_corpse_id(&mut self) -> u32 {
        let id = self.next_corpse_id.max(1);
        self.next_corpse_id = id + 1;
        id
    }

    pub fn unlooted_corpses(&self, room_id: &str) -> impl Iterator<Item = &Corpse> {
        self.corpses
            .get(room_id)
            .into_iter()
            .flatten()
            .filter(|c| !c.looted)
    }
}

/// Where a narration line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrationSource {
    /// Generated by the language model.
    Ai,
    /// Canned line; no model configured.
    Stub,
    /// Canned line after the model failed.
    Fallback,
}

impl fmt::Display for NarrationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NarrationSource::Ai => "ai",
            NarrationSource::Stub => "stub",
            NarrationSource::Fallback => "fallback",
        })
    }
}

/// One narrated turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEntry {
    pub turn: u32,
    pub player_input: String,
    pub rules_result: String,
    pub gm_response: String,
    pub gm_source: NarrationSource,
}

/// A spell pick earned on level-up, resolved at the next rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellChoice {
    pub level: u32,
    pub choices: Vec<String>,
}

/// Complete state of a running game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub campaign_id: String,
    pub player: Character,
    /// The first companion is the primary one and the only one that acts.
    pub companions: Vec<Companion>,
    pub room_id: String,
    #[serde(default)]
    pub visited: Vec<String>,
    #[serde(default)]
    pub flags: WorldFlags,
    #[serde(default)]
    pub inventory: Vec<Item>,
    #[serde(default)]
    pub equipment: BTreeMap<EquipSlot, Item>,
    #[serde(default = "default_inventory_limit")]
    pub inventory_limit: usize,
    #[serde(default)]
    pub in_combat: bool,
    #[serde(default)]
    pub enemies: Vec<Enemy>,
    #[serde(default)]
    pub turn: u32,
    #[serde(default)]
    pub turn_log: Vec<String>,
    #[serde(default)]
    pub last_event: String,
    #[serde(default)]
    pub last_player_input: String,
    #[serde(default)]
    pub response_log: Vec<ResponseEntry>,
    #[serde(default)]
    pub player_defending: bool,
    #[serde(default)]
    pub companion_defending: bool,
    #[serde(default)]
    pub player_shield_active: bool,
    #[serde(default)]
    pub player_bless_active: bool,
    #[serde(default)]
    pub companion_bless_active: bool,
    #[serde(default)]
    pub game_over: bool,
    #[serde(default)]
    pub rest_streak: u32,
    #[serde(default)]
    pub pending_level_choices: Vec<SpellChoice>,
}

impl GameState {
    /// Fresh state positioned in `room_id`, before the room is entered.
    pub fn new(
        campaign_id: impl Into<String>,
        player: Character,
        companions: Vec<Companion>,
        room_id: impl Into<String>,
    ) -> Self {
        Self {
            campaign_id: campaign_id.into(),
            player,
            companions,
            room_id: room_id.into(),
            visited: Vec::new(),
            flags: WorldFlags::default(),
            inventory: Vec::new(),
            equipment: BTreeMap::new(),
            inventory_limit: DEFAULT_INVENTORY_LIMIT,
            in_combat: false,
            enemies: Vec::new(),
            turn: 0,
            turn_log: Vec::new(),
            last_event: String::new(),
            last_player_input: String::new(),
            response_log: Vec::new(),
            player_defending: false,
            companion_defending: false,
            player_shield_active: false,
            player_bless_active: false,
            companion_bless_active: false,
            game_over: false,
            rest_streak: 0,
            pending_level_choices: Vec::new(),
        }
    }

    pub fn with_inventory(mut self, inventory: Vec<Item>) -> Self {
        self.inventory = inventory;
        self
    }

    pub fn with_equipment(mut self, equipment: BTreeMap<EquipSlot, Item>) -> Self {
        self.equipment = equipment;
        self
    }

    pub fn campaign(&self) -> Result<&'static Campaign, ContentError> {
        content::campaign(&self.campaign_id)
    }

    pub fn room(&self) -> Result<&'static Room, ContentError> {
        self.campaign()?.room(&self.room_id)
    }

    /// Primary companion.
    pub fn companion(&self) -> Option<&Companion> {
        self.companions.first()
    }

    pub fn companion_mut(&mut self) -> Option<&mut Companion> {
        self.companions.first_mut()
    }

    pub fn living_enemies(&self) -> impl Iterator<Item = &Enemy> {
        self.enemies.iter().filter(|e| e.is_alive())
    }

    /// Append a narrated turn, keeping only the most recent entries.
    pub fn push_response(&mut self, entry: ResponseEntry) {
        self.response_log.push(entry);
        trim_front(&mut self.response_log, RESPONSE_LOG_LIMIT);
    }

    /// Record the resolved turn in the turn log.
    pub fn log_turn(&mut self, player_input: &str) {
        if !player_input.is_empty() {
            self.last_player_input = player_input.to_string();
        }
        if !self.last_event.is_empty() {
            self.turn_log.push(format!(
                "Turn {}: input={:?} | {}",
                self.turn, player_input, self.last_event
            ));
        }
    }
}

/// Drop the oldest entries so at most `limit` remain.
pub(crate) fn trim_front<T>(items: &mut Vec<T>, limit: usize) {
    if items.len() > limit {
        let excess = items.len() - limit;
        items.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_response_log_keeps_last_fifty() {
        let mut state = fixtures::watchtower_state();
        for turn in 0..60 {
            state.push_response(ResponseEntry {
                turn,
                player_input: String::new(),
                rules_result: String::new(),
                gm_response: format!("line {turn}"),
                gm_source: NarrationSource::Stub,
            });
        }
        assert_eq!(state.response_log.len(), RESPONSE_LOG_LIMIT);
        assert_eq!(state.response_log[0].turn, 10);
    }

    #[test]
    fn test_corpse_ids_increase() {
        let mut flags = WorldFlags::default();
        assert_eq!(flags.take_corpse_id(), 1);
        assert_eq!(flags.take_corpse_id(), 2);
        assert_eq!(flags.next_corpse_id, 3);
    }

    #[test]
    fn test_log_turn_records_input() {
        let mut state = fixtures::watchtower_state();
        state.turn = 3;
        state.last_event = "You press onward.".to_string();
        state.log_turn("search");
        assert_eq!(state.last_player_input, "search");
        assert_eq!(
            state.turn_log.last().map(String::as_str),
            Some("Turn 3: input=\"search\" | You press onward.")
        );
    }

    #[test]
    fn test_state_serde_round_trip_keeps_flags() {
        let mut state = fixtures::watchtower_state();
        state.flags.set("scout_helped");
        state.flags.defeated_rooms.insert("cellar".to_string());
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"cls\":\"Fighter\""));
        let back: GameState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_character_defaults_for_sparse_json() {
        let json = r#"{
            "name": "Ash", "cls": "Rogue", "hp": 10, "max_hp": 10,
            "ac": 14, "base_ac": 14, "attack_bonus": 2, "damage": "1d6+1"
        }"#;
        let character: Character = serde_json::from_str(json).unwrap();
        assert_eq!(character.level, 1);
        assert_eq!(character.race, Race::Human);
        assert_eq!(character.gold, 0);
    }
}
