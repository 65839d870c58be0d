//! GameSession - the primary public API for playing an adventure.
//!
//! A session owns the [`GameState`], a [`Narrator`] and a dice [`Roller`].
//! Front ends feed it raw input lines with [`GameSession::handle`] and print
//! what comes back; every resolved turn is logged and autosaved before
//! narration is requested with [`GameSession::narrate_pending`].

use crate::command::{
    normalize_action, parse_combat, parse_exploration, parse_gear, CombatCommand,
    ExplorationCommand, GearCommand, DEFAULT_MAX_REST_BATCH,
};
use crate::content::{self, ContentError, EquipSlot, Item};
use crate::dice::Roller;
use crate::format::{
    combat_help, exploration_help, format_currency, format_equipment, format_exits,
    format_inventory, format_inventory_detailed, stats_lines,
};
use crate::narration::{self, extract_campaign_content, Narrator};
use crate::persist::{self, PersistError, DEFAULT_SAVE_FILE};
use crate::roster::{strip_campaign_quest_items, Roster, RosterError, DEFAULT_CHARACTERS_DIR};
use crate::rules::{
    apply_rest, clear_round_buffs, companion_action, create_campaign_companions,
    end_combat_if_needed, enemy_actions, equip_item, exploration_action, grant_xp, move_player,
    player_action, regen_companion_mana, regen_mana, reset_rest_streak, start_room,
    sync_player_ac, unequip_item, use_item, MoveError, SpellChooser,
};
use crate::state::{Character, GameState, ResponseEntry};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Errors from GameSession operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("Roster error: {0}")]
    Roster(#[from] RosterError),

    #[error("Content error: {0}")]
    Content(#[from] ContentError),
}

/// Configuration for a game session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Where the game is saved.
    pub save_path: PathBuf,

    /// Character roster directory.
    pub characters_dir: PathBuf,

    /// Most rests a single `rest N` performs.
    pub max_rest_batch: u32,

    /// Save and sync the roster after every resolved turn.
    pub autosave: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            save_path: PathBuf::from(DEFAULT_SAVE_FILE),
            characters_dir: PathBuf::from(DEFAULT_CHARACTERS_DIR),
            max_rest_batch: DEFAULT_MAX_REST_BATCH,
            autosave: true,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the save file path.
    pub fn with_save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_path = path.into();
        self
    }

    /// Set the character roster directory.
    pub fn with_characters_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.characters_dir = dir.into();
        self
    }

    pub fn with_max_rest_batch(mut self, max: u32) -> Self {
        self.max_rest_batch = max.max(1);
        self
    }

    pub fn with_autosave(mut self, autosave: bool) -> Self {
        self.autosave = autosave;
        self
    }
}

// ============================================================================
// Turn results
// ============================================================================

/// What happened after one line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnReport {
    /// Informational output. No time passed.
    Info(Vec<String>),
    /// The command was refused. No time passed.
    Rejected(String),
    /// A turn resolved; the text is also in `state.last_event`.
    Resolved(String),
    /// The player asked for the gear menu.
    OpenGear,
    /// The player quit. The game has been saved.
    Quit,
}

/// What happened after one line in the gear menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GearReply {
    Back,
    Lines(Vec<String>),
    Changed(String),
    Refused(String),
}

/// Narration of the latest resolved event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Narration {
    /// Round results, present after combat rounds.
    pub outcomes: Option<String>,
    /// Quoted NPC dialogue from the result.
    pub campaign_content: Option<String>,
    pub entry: ResponseEntry,
    /// Unlooted corpses lie in the current room.
    pub loot_tip: bool,
}

// ============================================================================
// New games
// ============================================================================

/// Pack a new character starts with: three healing potions, a leather cap and
/// worn boots.
pub fn starting_kit(campaign_id: &str) -> Result<Vec<Item>, ContentError> {
    let campaign = content::campaign(campaign_id)?;
    Ok(["healing_potion", "healing_potion", "healing_potion", "leather_cap", "worn_boots"]
        .iter()
        .map(|id| campaign.item_from_id(id))
        .collect())
}

/// Build a fresh game positioned in the campaign's first room, with the
/// room's opening text as the last event.
pub fn new_game_state(
    campaign_id: &str,
    player: Character,
    inventory: Vec<Item>,
    equipment: BTreeMap<EquipSlot, Item>,
    companion_ids: &[&str],
    roller: &mut dyn Roller,
) -> Result<GameState, ContentError> {
    let campaign = content::campaign(campaign_id)?;
    let companions = create_campaign_companions(campaign_id, companion_ids)?;
    let mut state = GameState::new(
        campaign_id,
        player,
        companions,
        campaign.start_room_id(),
    )
    .with_inventory(inventory)
    .with_equipment(equipment);
    sync_player_ac(&mut state);
    state.last_event = start_room(&mut state, roller)?;
    info!(campaign = campaign_id, player = %state.player.name, "new game");
    Ok(state)
}

// ============================================================================
// Session
// ============================================================================

pub struct GameSession {
    state: GameState,
    narrator: Box<dyn Narrator>,
    roller: Box<dyn Roller + Send>,
    config: SessionConfig,
    roster: Roster,
    last_narrated_turn: Option<u32>,
    last_was_combat_round: bool,
}

impl GameSession {
    pub fn new(
        state: GameState,
        narrator: Box<dyn Narrator>,
        roller: Box<dyn Roller + Send>,
        config: SessionConfig,
    ) -> Self {
        let roster = Roster::new(config.characters_dir.clone());
        Self {
            state,
            narrator,
            roller,
            config,
            roster,
            last_narrated_turn: None,
            last_was_combat_round: false,
        }
    }

    /// Resume the game saved at `config.save_path`.
    pub async fn resume(
        config: SessionConfig,
        narrator: Box<dyn Narrator>,
        roller: Box<dyn Roller + Send>,
    ) -> Result<Self, SessionError> {
        let state = persist::load_game(&config.save_path).await?;
        Ok(Self::new(state, narrator, roller, config))
    }

    pub async fn save_exists(config: &SessionConfig) -> bool {
        persist::save_exists(&config.save_path).await
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn save_path(&self) -> &Path {
        &self.config.save_path
    }

    pub fn is_over(&self) -> bool {
        self.state.game_over
    }

    pub fn in_combat(&self) -> bool {
        self.state.in_combat
    }

    /// Write the save file and sync the character roster.
    ///
    /// Roster failures are logged and otherwise ignored.
    pub async fn save(&self) -> Result<(), SessionError> {
        persist::save_game(&self.state, &self.config.save_path).await?;
        if let Err(e) = self.roster.sync(&self.state).await {
            warn!(error = %e, "failed to sync character roster");
        }
        Ok(())
    }

    async fn autosave(&self) -> Result<(), SessionError> {
        if self.config.autosave {
            self.save().await?;
        }
        Ok(())
    }

    /// Handle one line of input in the current mode.
    pub async fn handle(
        &mut self,
        raw: &str,
        chooser: &mut dyn SpellChooser,
    ) -> Result<TurnReport, SessionError> {
        if self.state.game_over {
            return Ok(TurnReport::Rejected("The adventure is over.".to_string()));
        }
        let action = normalize_action(raw);
        if self.state.in_combat {
            self.handle_combat(raw, &action).await
        } else {
            self.handle_exploration(raw, &action, chooser).await
        }
    }

    fn inventory_lines(&self) -> Vec<String> {
        vec![
            format_inventory(&self.state.inventory),
            format_currency(self.state.player.gold),
        ]
    }

    /// Record a resolved turn, then autosave.
    async fn resolve(
        &mut self,
        raw: &str,
        result: String,
        combat_round: bool,
    ) -> Result<TurnReport, SessionError> {
        self.state.turn += 1;
        self.state.last_event = result.clone();
        reset_rest_streak(&mut self.state);
        self.state.log_turn(raw);
        self.last_was_combat_round = combat_round;
        self.autosave().await?;
        Ok(TurnReport::Resolved(result))
    }

    async fn handle_exploration(
        &mut self,
        raw: &str,
        action: &str,
        chooser: &mut dyn SpellChooser,
    ) -> Result<TurnReport, SessionError> {
        match parse_exploration(action, self.config.max_rest_batch) {
            ExplorationCommand::Quit => {
                self.autosave().await?;
                Ok(TurnReport::Quit)
            }
            ExplorationCommand::Help => Ok(TurnReport::Info(exploration_help(&self.state))),
            ExplorationCommand::Gear => Ok(TurnReport::OpenGear),
            ExplorationCommand::Inventory => Ok(TurnReport::Info(self.inventory_lines())),
            ExplorationCommand::Stats => Ok(TurnReport::Info(stats_lines(&self.state))),
            ExplorationCommand::Use { item, target } => {
                match use_item(&mut self.state, &item, target.as_deref(), &mut *self.roller) {
                    Ok(result) => self.resolve(raw, result, false).await,
                    Err(e) => Ok(TurnReport::Rejected(e.to_string())),
                }
            }
            ExplorationCommand::Rest(count) => self.rest(raw, count, chooser).await,
            ExplorationCommand::Move(None) => Ok(TurnReport::Info(vec![format!(
                "Where to? {}",
                format_exits(&self.state)
            )])),
            ExplorationCommand::Move(Some(destination)) => {
                match move_player(&mut self.state, &destination, &mut *self.roller) {
                    Ok(result) => self.resolve(raw, result, false).await,
                    Err(MoveError::Content(e)) => Err(e.into()),
                    Err(refusal) => Ok(TurnReport::Rejected(refusal.to_string())),
                }
            }
            ExplorationCommand::Act(action) => {
                let result = exploration_action(&mut self.state, &action, &mut *self.roller)?;
                self.resolve(raw, result, false).await
            }
        }
    }

    /// `count` rests, each its own turn. The streak carries across them.
    async fn rest(
        &mut self,
        raw: &str,
        count: u32,
        chooser: &mut dyn SpellChooser,
    ) -> Result<TurnReport, SessionError> {
        let mut results = Vec::new();
        for _ in 0..count {
            let result = apply_rest(&mut self.state, chooser);
            self.state.turn += 1;
            self.state.last_event = result.clone();
            self.state.log_turn(raw);
            results.push(result);
        }
        let summary = results.join(" | ");
        self.state.last_event = summary.clone();
        self.last_was_combat_round = false;
        self.autosave().await?;
        Ok(TurnReport::Resolved(summary))
    }

    async fn handle_combat(&mut self, raw: &str, action: &str) -> Result<TurnReport, SessionError> {
        let first = match parse_combat(action) {
            CombatCommand::Quit => {
                self.autosave().await?;
                return Ok(TurnReport::Quit);
            }
            CombatCommand::Help => return Ok(TurnReport::Info(combat_help(&self.state))),
            CombatCommand::Gear => return Ok(TurnReport::OpenGear),
            CombatCommand::Inventory => return Ok(TurnReport::Info(self.inventory_lines())),
            CombatCommand::CastWhich => {
                return Ok(TurnReport::Info(vec![
                    "Cast which spell? (e.g. cast magic missile, cast sleep 1)".to_string(),
                ]));
            }
            CombatCommand::Unknown => {
                return Ok(TurnReport::Rejected(
                    "Choose attack, defend, special, or cast <spell> [target].".to_string(),
                ));
            }
            CombatCommand::Use { item, target } => {
                match use_item(&mut self.state, &item, target.as_deref(), &mut *self.roller) {
                    Ok(result) => result,
                    Err(e) => return Ok(TurnReport::Rejected(e.to_string())),
                }
            }
            CombatCommand::Act(player) => player_action(&mut self.state, &player, &mut *self.roller),
        };
        let result = self.finish_round(first);
        self.resolve(raw, result, true).await
    }

    /// Companion and enemies act after the player; then round upkeep.
    fn finish_round(&mut self, player_result: String) -> String {
        let mut results = vec![player_result];
        results.push(companion_action(&mut self.state, &mut *self.roller));
        results.extend(enemy_actions(&mut self.state, &mut *self.roller));
        clear_round_buffs(&mut self.state);
        results.extend(end_combat_if_needed(&mut self.state));
        regen_mana(&mut self.state, 1);
        regen_companion_mana(&mut self.state, 1);
        results.join(" ")
    }

    // ------------------------------------------------------------------------
    // Gear menu
    // ------------------------------------------------------------------------

    /// Equipment, numbered pack and gold.
    pub fn gear_overview(&self) -> Vec<String> {
        vec![
            format_equipment(&self.state.equipment),
            format_inventory_detailed(&self.state.inventory),
            format_currency(self.state.player.gold),
        ]
    }

    /// Handle one line in the gear menu. Gear changes take no time.
    pub fn gear(&mut self, raw: &str) -> GearReply {
        match parse_gear(&normalize_action(raw)) {
            GearCommand::Back => GearReply::Back,
            GearCommand::Show => GearReply::Lines(self.gear_overview()),
            GearCommand::Equip(item) => match equip_item(&mut self.state, &item) {
                Ok(message) => GearReply::Changed(message),
                Err(e) => GearReply::Refused(e.to_string()),
            },
            GearCommand::Unequip(slot) => match unequip_item(&mut self.state, &slot) {
                Ok(message) => GearReply::Changed(message),
                Err(e) => GearReply::Refused(e.to_string()),
            },
            GearCommand::Unknown => GearReply::Lines(vec![
                "Try: show, equip <item>, unequip <slot>, back".to_string(),
            ]),
        }
    }

    /// Save after leaving the gear menu.
    pub async fn close_gear(&self) -> Result<(), SessionError> {
        self.autosave().await
    }

    // ------------------------------------------------------------------------
    // Narration
    // ------------------------------------------------------------------------

    /// Whether the latest event still needs narrating.
    pub fn has_pending_narration(&self) -> bool {
        !self.state.last_event.is_empty() && self.last_narrated_turn != Some(self.state.turn)
    }

    /// Narrate the latest event once and record it in the response log.
    pub async fn narrate_pending(&mut self) -> Option<Narration> {
        if !self.has_pending_narration() {
            return None;
        }
        let outcomes = self
            .last_was_combat_round
            .then(|| self.state.last_event.clone());
        let campaign_content = extract_campaign_content(&self.state.last_event, &self.state);
        let entry = narration::narrate_last_event(&mut self.state, self.narrator.as_ref()).await;
        self.last_narrated_turn = Some(self.state.turn);
        let loot_tip = !self.state.in_combat
            && !self.state.game_over
            && self
                .state
                .flags
                .unlooted_corpses(&self.state.room_id)
                .next()
                .is_some();
        Some(Narration {
            outcomes,
            campaign_content,
            entry,
            loot_tip,
        })
    }

    /// The primary companion's suggestion for the next move.
    pub async fn companion_suggestion(&self) -> Option<String> {
        narration::companion_suggestion(&self.state, self.narrator.as_ref()).await
    }

    /// Wrap up a finished game. Survivors earn the campaign's completion XP,
    /// lose its quest items and are saved. Returns level-up messages.
    ///
    /// The award is recorded in the world flags, so finishing a resumed
    /// game-over save pays nothing.
    pub async fn finish(&mut self) -> Result<Vec<String>, SessionError> {
        if !self.state.game_over || self.state.flags.completion_awarded {
            return Ok(Vec::new());
        }
        if self.state.player.hp <= 0 {
            info!(player = %self.state.player.name, "adventure ended in defeat");
            return Ok(Vec::new());
        }

        let completion_xp = self.state.campaign()?.completion_xp;
        let messages = if completion_xp > 0 {
            grant_xp(&mut self.state, completion_xp)
        } else {
            Vec::new()
        };
        self.state.flags.completion_awarded = true;
        strip_campaign_quest_items(&mut self.state);
        sync_player_ac(&mut self.state);
        self.save().await?;
        info!(player = %self.state.player.name, xp = self.state.player.xp, "adventure complete");
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::FirstChoice;
    use crate::testing::{fixtures, ScriptedDice, StubNarrator};

    fn session(state: GameState, dice: ScriptedDice) -> GameSession {
        GameSession::new(
            state,
            Box::new(StubNarrator::default()),
            Box::new(dice),
            SessionConfig::new().with_autosave(false),
        )
    }

    #[test]
    fn test_config_builder() {
        let config = SessionConfig::new()
            .with_save_path("saves/one.json")
            .with_characters_dir("roster")
            .with_max_rest_batch(0)
            .with_autosave(false);
        assert_eq!(config.save_path, PathBuf::from("saves/one.json"));
        assert_eq!(config.characters_dir, PathBuf::from("roster"));
        assert_eq!(config.max_rest_batch, 1);
        assert!(!config.autosave);
        assert_eq!(SessionConfig::default().save_path, PathBuf::from("game_state.json"));
    }

    #[test]
    fn test_starting_kit() {
        let kit = starting_kit("lost_crypt").unwrap();
        let ids: Vec<&str> = kit.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(
            ids,
            ["healing_potion", "healing_potion", "healing_potion", "leather_cap", "worn_boots"]
        );
    }

    #[tokio::test]
    async fn test_info_commands_take_no_time() {
        let mut session = session(fixtures::watchtower_state(), ScriptedDice::constant(10));
        let report = session.handle("inventory", &mut FirstChoice).await.unwrap();
        assert_eq!(
            report,
            TurnReport::Info(vec!["Inventory: (empty)".to_string(), "Gold: 0".to_string()])
        );
        let report = session.handle("go", &mut FirstChoice).await.unwrap();
        assert_eq!(
            report,
            TurnReport::Info(vec!["Where to? Exits: barracks, cellar".to_string()])
        );
        assert_eq!(session.handle("gear", &mut FirstChoice).await.unwrap(), TurnReport::OpenGear);
        assert_eq!(session.state().turn, 0);
    }

    #[tokio::test]
    async fn test_bad_move_is_rejected() {
        let mut session = session(fixtures::watchtower_state(), ScriptedDice::constant(10));
        let report = session.handle("go moon", &mut FirstChoice).await.unwrap();
        assert_eq!(
            report,
            TurnReport::Rejected("Can't go that way. Options: barracks, cellar.".to_string())
        );
        assert_eq!(session.state().turn, 0);
    }

    #[tokio::test]
    async fn test_rest_batch_logs_each_rest() {
        let mut state = fixtures::watchtower_state();
        state.player.hp = 10;
        let mut session = session(state, ScriptedDice::constant(10));
        let report = session.handle("rest 2", &mut FirstChoice).await.unwrap();
        assert_eq!(
            report,
            TurnReport::Resolved(
                "You rest and regain your focus. | You rest and regain your focus. HP +1."
                    .to_string()
            )
        );
        assert_eq!(session.state().turn, 2);
        assert_eq!(session.state().turn_log.len(), 2);
        assert_eq!(session.state().player.hp, 11);
    }

    #[tokio::test]
    async fn test_unknown_combat_command_is_rejected() {
        let mut state = fixtures::watchtower_state();
        state.in_combat = true;
        state.enemies = vec![fixtures::bandit()];
        let mut session = session(state, ScriptedDice::constant(10));
        let report = session.handle("dance", &mut FirstChoice).await.unwrap();
        assert!(matches!(report, TurnReport::Rejected(_)));
        assert_eq!(session.state().turn, 0);
    }

    #[tokio::test]
    async fn test_combat_round_runs_everyone() {
        let mut state = fixtures::watchtower_state();
        state.room_id = "barracks".to_string();
        state.in_combat = true;
        state.enemies = vec![fixtures::bandit()];
        // Player misses, Mara misses, bandit misses.
        let mut session = session(state, ScriptedDice::constant(2));
        let report = session.handle("attack", &mut FirstChoice).await.unwrap();
        let TurnReport::Resolved(text) = report else {
            panic!("expected a resolved round");
        };
        assert!(text.starts_with("Miss Watchtower Bandit (roll 2 -> 5)."));
        assert!(text.contains("Mara misses Watchtower Bandit"));
        assert!(text.contains("Watchtower Bandit misses"));
        assert_eq!(session.state().turn, 1);
        assert!(session.in_combat());

        let narration = session.narrate_pending().await.unwrap();
        assert_eq!(narration.outcomes.as_deref(), Some(text.as_str()));
        assert!(session.narrate_pending().await.is_none());
    }

    #[tokio::test]
    async fn test_completion_xp_is_paid_once_across_resume() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::new()
            .with_save_path(dir.path().join("game_state.json"))
            .with_characters_dir(dir.path().join("characters"));
        let mut state = fixtures::watchtower_state();
        state.game_over = true;
        let mut first = GameSession::new(
            state,
            Box::new(StubNarrator::default()),
            Box::new(ScriptedDice::constant(10)),
            config.clone(),
        );
        first.finish().await.unwrap();
        let awarded = first.state().player.xp;
        assert_eq!(awarded, 100);
        assert!(first.finish().await.unwrap().is_empty());

        let mut resumed = GameSession::resume(
            config,
            Box::new(StubNarrator::default()),
            Box::new(ScriptedDice::constant(10)),
        )
        .await
        .unwrap();
        assert!(resumed.is_over());
        assert!(resumed.finish().await.unwrap().is_empty());
        assert_eq!(resumed.state().player.xp, awarded);
    }

    #[tokio::test]
    async fn test_gear_menu_equips() {
        let state = fixtures::watchtower_state()
            .with_inventory(vec![fixtures::watchtower_item("leather_cap")]);
        let mut session = session(state, ScriptedDice::constant(10));
        let base_ac = session.state().player.base_ac;
        assert_eq!(
            session.gear("equip 1"),
            GearReply::Changed("Equipped Leather Cap to head.".to_string())
        );
        assert_eq!(session.state().player.ac, base_ac + 1);
        assert_eq!(
            session.gear("unequip tail"),
            GearReply::Refused("Unknown equipment slot.".to_string())
        );
        assert_eq!(session.gear("back"), GearReply::Back);
    }
}
