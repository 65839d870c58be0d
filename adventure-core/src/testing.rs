//! Testing utilities.
//!
//! - [`ScriptedDice`] replays queued die faces so rules tests are deterministic
//! - [`StubNarrator`] answers every prompt with canned text and records calls
//! - [`fixtures`] builds ready-to-play states for the built-in campaigns

use crate::dice::Roller;
use crate::narration::Narrator;
use crate::state::NarrationSource;
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// A [`Roller`] that returns scripted faces in order.
///
/// Faces are clamped into `1..=sides`. Once the queue is empty the fallback
/// face is returned for every further roll.
#[derive(Debug, Clone)]
pub struct ScriptedDice {
    queue: VecDeque<u32>,
    fallback: u32,
    rolled: Vec<(u32, u32)>,
}

impl ScriptedDice {
    /// Every roll returns `face`.
    pub fn constant(face: u32) -> Self {
        Self {
            queue: VecDeque::new(),
            fallback: face,
            rolled: Vec::new(),
        }
    }

    /// Return `faces` in order, then 1 forever.
    pub fn sequence(faces: impl IntoIterator<Item = u32>) -> Self {
        Self {
            queue: faces.into_iter().collect(),
            fallback: 1,
            rolled: Vec::new(),
        }
    }

    /// Change what is returned after the queue runs dry.
    pub fn then(mut self, fallback: u32) -> Self {
        self.fallback = fallback;
        self
    }

    /// Queue more faces.
    pub fn push(&mut self, face: u32) {
        self.queue.push_back(face);
    }

    /// Faces still queued.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Every `(sides, face)` rolled so far.
    pub fn history(&self) -> &[(u32, u32)] {
        &self.rolled
    }
}

impl Roller for ScriptedDice {
    fn roll_die(&mut self, sides: u32) -> u32 {
        if sides == 0 {
            return 0;
        }
        let face = self.queue.pop_front().unwrap_or(self.fallback);
        let face = face.clamp(1, sides);
        self.rolled.push((sides, face));
        face
    }
}

/// A narrator with fixed output that records every prompt it receives.
#[derive(Debug)]
pub struct StubNarrator {
    gm_line: String,
    companion_line: String,
    source: NarrationSource,
    prompts: Mutex<Vec<String>>,
}

impl StubNarrator {
    pub fn new(gm_line: impl Into<String>, companion_line: impl Into<String>) -> Self {
        Self {
            gm_line: gm_line.into(),
            companion_line: companion_line.into(),
            source: NarrationSource::Stub,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Report this source for GM narration.
    pub fn with_source(mut self, source: NarrationSource) -> Self {
        self.source = source;
        self
    }

    /// User prompts received so far.
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }

    async fn record(&self, prompt: &str) {
        self.prompts.lock().await.push(prompt.to_string());
    }
}

impl Default for StubNarrator {
    fn default() -> Self {
        Self::new("The dust settles. What do you do?", "Stay sharp.")
    }
}

#[async_trait]
impl Narrator for StubNarrator {
    async fn gm_reply(&self, _system_prompt: &str, user_prompt: &str) -> (String, NarrationSource) {
        self.record(user_prompt).await;
        (self.gm_line.clone(), self.source)
    }

    async fn companion_reply(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
        _companion_name: &str,
    ) -> String {
        self.record(user_prompt).await;
        self.companion_line.clone()
    }
}

/// Ready-made states.
pub mod fixtures {
    use crate::content::{self, EquipSlot, Item};
    use crate::profiles::{CharacterClass, Race, Stat, Stats};
    use crate::rules::{create_companion, create_player};
    use crate::state::{Companion, Enemy, GameState};

    fn stats(pairs: &[(Stat, i32)]) -> Stats {
        Stats::from_pairs(pairs.iter().copied())
    }

    /// Fighter "Hero" (STR 2, DEX 2, INT 2) with the default companion,
    /// standing in the courtyard with an empty pack.
    pub fn watchtower_state() -> GameState {
        let player = create_player(
            "Hero",
            CharacterClass::Fighter,
            &stats(&[(Stat::Str, 2), (Stat::Dex, 2), (Stat::Int, 2)]),
            Race::Human,
        );
        GameState::new("ruined_watchtower", player, vec![mara()], "courtyard")
    }

    /// Wizard "Mage" (DEX 1, INT 2) knowing only Spark.
    pub fn wizard_state() -> GameState {
        let player = create_player(
            "Mage",
            CharacterClass::Wizard,
            &stats(&[(Stat::Dex, 1), (Stat::Int, 2)]),
            Race::Human,
        );
        GameState::new("ruined_watchtower", player, vec![mara()], "courtyard")
    }

    /// Cleric "Sister" (WIS 3, CON 1) knowing Cure Wounds.
    pub fn cleric_state() -> GameState {
        let player = create_player(
            "Sister",
            CharacterClass::Cleric,
            &stats(&[(Stat::Wis, 3), (Stat::Con, 1), (Stat::Str, 1)]),
            Race::Human,
        );
        GameState::new("ruined_watchtower", player, vec![mara()], "courtyard")
    }

    pub fn mara() -> Companion {
        // The watchtower always defines Mara.
        create_companion("ruined_watchtower", None).unwrap_or_else(|_| Companion {
            name: "Mara".to_string(),
            hp: 10,
            max_hp: 10,
            ac: 13,
            attack_bonus: 2,
            damage: crate::dice::DiceExpression::new(1, 6, 0),
            mana: 0,
            max_mana: 0,
            learned_spells: Vec::new(),
            defend_hp_threshold: 3,
        })
    }

    /// A fresh Watchtower Bandit (12 HP, AC 13).
    pub fn bandit() -> Enemy {
        let profile = content::mob_profile("ruined_watchtower", "Watchtower Bandit");
        Enemy {
            name: "Watchtower Bandit".to_string(),
            hp: 12,
            max_hp: 12,
            ac: profile.map(|p| p.ac).unwrap_or(13),
            attack_bonus: profile.map(|p| p.attack_bonus).unwrap_or(3),
            damage: crate::dice::DiceExpression::new(1, 6, 0),
            asleep: false,
        }
    }

    /// Armor piece outside any catalog, no AC bonus.
    pub fn plain_armor(id: &str, name: &str, slot: EquipSlot) -> Item {
        let mut item = Item::armor(id, name, slot, 0);
        item.effect = None;
        item
    }

    pub fn watchtower_item(item_id: &str) -> Item {
        content::campaign("ruined_watchtower")
            .map(|c| c.item_from_id(item_id))
            .unwrap_or_else(|_| Item::unknown(item_id))
    }
}
