//! Narration: prompts, state summaries and narrator backends.
//!
//! The rules engine decides what happened; a [`Narrator`] only dresses the
//! result in prose. Nothing here touches mechanical state except appending to
//! the response log.

use crate::content::RoomKind;
use crate::state::{GameState, NarrationSource, ResponseEntry};
use async_trait::async_trait;
use llm::LlmClient;
use rand::seq::SliceRandom;
use tracing::warn;

pub const GM_SYSTEM_PROMPT: &str = "You are the GM for a tiny solo fantasy adventure. Narrate \
outcomes that the rules engine already resolved. Do NOT invent new outcomes, rolls, damage, or \
state changes. Ask the player what they do next with a short question. Keep responses under 120 \
words.";

const GM_STUB_LINES: [&str; 3] = [
    "The ruin creaks with old stone. What do you do?",
    "You take a breath as the air shifts. What's your move?",
    "Shadows settle, silent and watchful. What do you do next?",
];

const COMBAT_ACTIONS: &str = "attack, defend, special, cast <spell> [target], use, inventory";
const EXPLORATION_ACTIONS: &str = "talk, search, loot, move, rest, use, inventory";

/// System prompt for the companion's one-line suggestions.
pub fn companion_system_prompt(companion_name: &str) -> String {
    format!(
        "You are {companion_name}, a cautious companion. Give a short, practical suggestion \
         (1 sentence) based on the current situation. Do NOT narrate outcomes or change the game \
         state. Only suggest actions that are actually available. Vary your suggestions: \
         movement, exploration (talk/search), combat actions, or rest, whatever fits best. Only \
         suggest healing or potions when someone is wounded (HP below max) and it would help. \
         When everyone is at full HP, never suggest healing."
    )
}

fn companion_stub_lines(name: &str) -> [String; 3] {
    [
        format!("{name} whispers, 'Keep your distance and watch for traps.'"),
        format!("{name} says, 'Let me cover you while you act.'"),
        format!("{name} mutters, 'Slow and steady, no sudden moves.'"),
    ]
}

/// A canned GM line.
pub fn stub_gm_line() -> String {
    GM_STUB_LINES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(GM_STUB_LINES[0])
        .to_string()
}

/// A canned companion line.
pub fn stub_companion_line(companion_name: &str) -> String {
    let lines = companion_stub_lines(companion_name);
    lines
        .choose(&mut rand::thread_rng())
        .cloned()
        .unwrap_or_default()
}

// ============================================================================
// State summaries
// ============================================================================

fn room_label(state: &GameState) -> (String, &'static str) {
    match state.room() {
        Ok(room) => (room.name.clone(), room.kind.name()),
        Err(_) => (state.room_id.clone(), "unknown"),
    }
}

fn inventory_line(state: &GameState) -> String {
    if state.inventory.is_empty() {
        return "Inventory: (empty)".to_string();
    }
    let names: Vec<&str> = state.inventory.iter().map(|i| i.name.as_str()).collect();
    format!("Inventory: {}", names.join(", "))
}

fn enemies_line(state: &GameState) -> Option<String> {
    if state.enemies.is_empty() {
        return None;
    }
    let enemies: Vec<String> = state
        .enemies
        .iter()
        .map(|e| format!("{} HP {}/{}", e.name, e.hp, e.max_hp))
        .collect();
    Some(format!("Enemies: {}", enemies.join(" | ")))
}

/// State summary given to the GM.
pub fn format_state_for_gm(state: &GameState) -> String {
    let (room_name, room_kind) = room_label(state);
    let player = &state.player;
    let stats = &player.stats;
    let mut parts = vec![
        format!("Room: {room_name}"),
        format!("Room kind: {room_kind}"),
        format!(
            "Player: {} ({} {}) Level {} HP {}/{}",
            player.name, player.race, player.class, player.level, player.hp, player.max_hp
        ),
        format!(
            "Stats: STR {} DEX {} CON {} INT {} WIS {} CHA {}",
            stats.strength,
            stats.dexterity,
            stats.constitution,
            stats.intelligence,
            stats.wisdom,
            stats.charisma
        ),
        format!("Mana: {}/{}", player.mana, player.max_mana),
        format!("Gold: {}", player.gold),
    ];
    match state.companion() {
        Some(c) => parts.push(format!("Companion: {} HP {}/{}", c.name, c.hp, c.max_hp)),
        None => parts.push("Companion: none".to_string()),
    }
    parts.push(inventory_line(state));
    parts.push(format!("In combat: {}", state.in_combat));
    parts.extend(enemies_line(state));
    if !state.last_event.is_empty() {
        parts.push(format!("Last event: {}", state.last_event));
    }

    let flags = &state.flags;
    let mut flag_parts: Vec<String> = flags.story.iter().cloned().collect();
    if !flags.defeated_rooms.is_empty() {
        let rooms: Vec<&str> = flags.defeated_rooms.iter().map(String::as_str).collect();
        flag_parts.push(format!("defeated_rooms={}", rooms.join("/")));
    }
    if !flag_parts.is_empty() {
        parts.push(format!("Flags: {}", flag_parts.join(", ")));
    }
    parts.join("\n")
}

/// State summary given to the companion.
pub fn format_state_for_companion(state: &GameState) -> String {
    let (room_name, room_kind) = room_label(state);
    let player = &state.player;
    let mut parts = vec![
        format!("Room: {room_name} ({room_kind})"),
        format!("Player Level {} HP {}/{}", player.level, player.hp, player.max_hp),
    ];
    if let Some(c) = state.companion() {
        parts.push(format!("{} HP {}/{}", c.name, c.hp, c.max_hp));
    }
    parts.push(format!("Mana: {}/{}", player.mana, player.max_mana));
    parts.push(format!("Gold: {}", player.gold));
    parts.push(inventory_line(state));
    parts.push(format!("In combat: {}", state.in_combat));
    parts.extend(enemies_line(state));
    if !state.last_event.is_empty() {
        parts.push(format!("Last event: {}", state.last_event));
    }
    parts.join("\n")
}

pub fn gm_user_prompt(state: &GameState, player_input: &str, rules_result: &str) -> String {
    format!(
        "STATE\n{}\n\nPLAYER INPUT\n{player_input}\n\nRULES RESULT\n{rules_result}\n\n\
         Add brief atmospheric flavor (do not repeat RULES RESULT verbatim) and end with a short \
         question prompting the player's next action.",
        format_state_for_gm(state)
    )
}

pub fn companion_user_prompt(state: &GameState) -> String {
    let actions = if state.in_combat {
        COMBAT_ACTIONS
    } else {
        EXPLORATION_ACTIONS
    };
    let everyone_full = state.player.hp >= state.player.max_hp
        && state.companions.iter().all(|c| c.hp >= c.max_hp);
    let note = if everyone_full {
        "\nEveryone at full HP. Suggest movement, exploration, or combat, not healing.\n"
    } else {
        ""
    };
    format!(
        "STATE\n{}\n{note}\nAvailable actions: {actions}\nGive a brief suggestion.",
        format_state_for_companion(state)
    )
}

// ============================================================================
// Quoted dialogue
// ============================================================================

/// Single-quote positions that open or close a quotation. Apostrophes inside
/// words (`Eryn's`, `I've`) are skipped.
fn quote_marks(text: &str) -> Vec<usize> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    chars
        .iter()
        .enumerate()
        .filter(|(_, (_, c))| *c == '\'')
        .filter(|(i, _)| {
            let before = i.checked_sub(1).and_then(|p| chars.get(p)).map(|(_, c)| *c);
            let after = chars.get(i + 1).map(|(_, c)| *c);
            !matches!((before, after), (Some(b), Some(a)) if b.is_alphanumeric() && a.is_alphanumeric())
        })
        .map(|(_, (byte, _))| *byte)
        .collect()
}

/// Longest quoted passage in `rules_result`, attributed to the room's NPC.
///
/// Only social, loot and passage rooms are considered; combat text quotes
/// command hints rather than dialogue.
pub fn extract_campaign_content(rules_result: &str, state: &GameState) -> Option<String> {
    let room = state.room().ok()?;
    if matches!(room.kind, RoomKind::Combat { .. }) {
        return None;
    }
    let marks = quote_marks(rules_result);
    let quote = marks
        .chunks_exact(2)
        .map(|pair| rules_result[pair[0] + 1..pair[1]].trim())
        .filter(|q| !q.is_empty())
        .max_by_key(|q| q.len())?;
    Some(match &room.npc {
        Some(npc) => format!("{npc}: \"{quote}\""),
        None => format!("\"{quote}\""),
    })
}

// ============================================================================
// Narrators
// ============================================================================

/// Something that turns prompts into narration.
///
/// Implementations never fail: on any error they fall back to canned lines
/// and report it through [`NarrationSource`].
#[async_trait]
pub trait Narrator: Send + Sync {
    /// GM narration and where it came from.
    async fn gm_reply(&self, system_prompt: &str, user_prompt: &str) -> (String, NarrationSource);

    /// One-line companion suggestion.
    async fn companion_reply(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        companion_name: &str,
    ) -> String;
}

/// Canned lines only. Used when no API key is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineNarrator;

#[async_trait]
impl Narrator for OfflineNarrator {
    async fn gm_reply(&self, _system_prompt: &str, _user_prompt: &str) -> (String, NarrationSource) {
        (stub_gm_line(), NarrationSource::Stub)
    }

    async fn companion_reply(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        companion_name: &str,
    ) -> String {
        stub_companion_line(companion_name)
    }
}

#[async_trait]
impl Narrator for LlmClient {
    async fn gm_reply(&self, system_prompt: &str, user_prompt: &str) -> (String, NarrationSource) {
        match self.chat(system_prompt, user_prompt).await {
            Ok(text) if !text.is_empty() => (text, NarrationSource::Ai),
            Ok(_) => {
                warn!("empty GM narration, using fallback");
                (stub_gm_line(), NarrationSource::Fallback)
            }
            Err(e) => {
                warn!(error = %e, "GM narration failed, using fallback");
                (stub_gm_line(), NarrationSource::Fallback)
            }
        }
    }

    async fn companion_reply(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        companion_name: &str,
    ) -> String {
        if self.config().skip_companion {
            return stub_companion_line(companion_name);
        }
        match self.chat(system_prompt, user_prompt).await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => stub_companion_line(companion_name),
            Err(e) => {
                warn!(error = %e, "companion suggestion failed, using fallback");
                stub_companion_line(companion_name)
            }
        }
    }
}

/// Narrate the last resolved event and append it to the response log.
pub async fn narrate_last_event(state: &mut GameState, narrator: &dyn Narrator) -> ResponseEntry {
    let prompt = gm_user_prompt(state, &state.last_player_input, &state.last_event);
    let (text, source) = narrator.gm_reply(GM_SYSTEM_PROMPT, &prompt).await;
    let entry = ResponseEntry {
        turn: state.turn,
        player_input: state.last_player_input.clone(),
        rules_result: state.last_event.clone(),
        gm_response: text,
        gm_source: source,
    };
    state.push_response(entry.clone());
    entry
}

/// Ask the primary companion what to do next.
pub async fn companion_suggestion(state: &GameState, narrator: &dyn Narrator) -> Option<String> {
    let name = state.companion()?.name.clone();
    let system = companion_system_prompt(&name);
    let prompt = companion_user_prompt(state);
    Some(narrator.companion_reply(&system, &prompt, &name).await)
}
