//! Plain-text views of the game state for the terminal.

use crate::content::{EquipSlot, Item, ItemKind};
use crate::state::GameState;
use std::collections::BTreeMap;

pub fn summarize_health(name: &str, hp: i32, max_hp: i32) -> String {
    format!("{name} HP {hp}/{max_hp}")
}

pub fn format_currency(gold: i32) -> String {
    format!("Gold: {gold}")
}

/// Names with duplicate counts, in pack order: `Healing Potion x3, Leather Cap`.
pub fn format_inventory(items: &[Item]) -> String {
    if items.is_empty() {
        return "Inventory: (empty)".to_string();
    }
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(name, _)| *name == item.name) {
            Some((_, count)) => *count += 1,
            None => counts.push((item.name.as_str(), 1)),
        }
    }
    let parts: Vec<String> = counts
        .into_iter()
        .map(|(name, count)| {
            if count > 1 {
                format!("{name} x{count}")
            } else {
                name.to_string()
            }
        })
        .collect();
    format!("Inventory: {}", parts.join(", "))
}

/// Numbered list used by the gear menu; numbers match `equip <n>`.
pub fn format_inventory_detailed(items: &[Item]) -> String {
    if items.is_empty() {
        return "Inventory (detailed): (empty)".to_string();
    }
    let mut lines = vec!["Inventory (detailed):".to_string()];
    for (idx, item) in items.iter().enumerate() {
        let tag = match (item.kind, item.slot) {
            (ItemKind::Armor, Some(slot)) => format!("[armor {slot}]"),
            (kind, _) => format!("[{}]", kind.name()),
        };
        lines.push(format!("{}. {} {tag}", idx + 1, item.name));
    }
    lines.join("\n")
}

pub fn format_equipment(equipment: &BTreeMap<EquipSlot, Item>) -> String {
    let mut lines = vec!["Equipment:".to_string()];
    for slot in EquipSlot::ALL {
        let name = equipment
            .get(&slot)
            .map(|item| item.name.as_str())
            .unwrap_or("(empty)");
        lines.push(format!("- {slot}: {name}"));
    }
    lines.join("\n")
}

/// `Exits: barracks, cellar` or `Exits: none`.
pub fn format_exits(state: &GameState) -> String {
    let exits = state
        .campaign()
        .map(|c| c.exit_destinations(&state.room_id))
        .unwrap_or_default();
    if exits.is_empty() {
        "Exits: none".to_string()
    } else {
        format!("Exits: {}", exits.join(", "))
    }
}

fn mana_lines(state: &GameState) -> Vec<String> {
    let mut lines = Vec::new();
    if state.player.is_caster() {
        lines.push(format!("Mana: {}/{}", state.player.mana, state.player.max_mana));
    }
    if let Some(companion) = state.companion().filter(|c| c.is_caster()) {
        lines.push(format!(
            "{} mana: {}/{}",
            companion.name, companion.mana, companion.max_mana
        ));
    }
    lines
}

/// Status block shown before each exploration prompt.
pub fn status_lines(state: &GameState) -> Vec<String> {
    let player = &state.player;
    let mut health = summarize_health(&player.name, player.hp, player.max_hp);
    if let Some(companion) = state.companion() {
        health.push_str(" | ");
        health.push_str(&summarize_health(&companion.name, companion.hp, companion.max_hp));
    }
    let mut lines = vec![health, format!("Level {} | XP {}", player.level, player.xp)];
    lines.extend(mana_lines(state));
    lines.push(format_currency(player.gold));

    let enemies: Vec<String> = state
        .enemies
        .iter()
        .filter(|e| e.is_alive())
        .enumerate()
        .map(|(idx, e)| format!("{}. {} {}/{}", idx + 1, e.name, e.hp, e.max_hp))
        .collect();
    if !enemies.is_empty() {
        lines.push(format!("Enemies: {}", enemies.join(" | ")));
    }
    lines
}

/// Status block shown before each combat prompt.
pub fn combat_status_lines(state: &GameState) -> Vec<String> {
    let player = &state.player;
    let defending = |on: bool| if on { " (defending)" } else { "" };
    let mut party = format!(
        "{} HP {}/{} AC {}{}",
        player.name,
        player.hp,
        player.max_hp,
        player.ac,
        defending(state.player_defending)
    );
    if let Some(c) = state.companion() {
        party.push_str(&format!(
            " | {} HP {}/{} AC {}{}",
            c.name,
            c.hp,
            c.max_hp,
            c.ac,
            defending(state.companion_defending)
        ));
    }

    let mut lines = vec![
        format!("Round {}", state.turn + 1),
        party,
        format!("Level {} | XP {}", player.level, player.xp),
    ];
    lines.extend(mana_lines(state));

    // Numbers match the ones `attack <n>` accepts.
    let enemies: Vec<String> = state
        .living_enemies()
        .enumerate()
        .map(|(idx, e)| format!("{}. {} HP {}/{} AC {}", idx + 1, e.name, e.hp, e.max_hp, e.ac))
        .collect();
    if !enemies.is_empty() {
        let targets: Vec<String> = (1..=enemies.len()).map(|n| n.to_string()).collect();
        lines.push(format!("Enemies: {}", enemies.join(" | ")));
        lines.push(format!("Targets: {}", targets.join(", ")));
    }
    lines
}

/// Output of the `stats` command.
pub fn stats_lines(state: &GameState) -> Vec<String> {
    let player = &state.player;
    let spells = if player.learned_spells.is_empty() {
        "none".to_string()
    } else {
        player.learned_spells.join(", ")
    };
    vec![
        format!("Race: {} (mods: {})", player.race, player.race.mods_summary()),
        format!(
            "Class: {} (role: {})",
            player.class,
            player.class.profile().role.name()
        ),
        format!("Level: {} | XP: {}", player.level, player.xp),
        format!("Spells: {spells}"),
        format!("Stats: {}", player.stats.summary()),
    ]
}

pub fn exploration_help(state: &GameState) -> Vec<String> {
    vec![
        "Try: talk, search, loot [number|all], move <destination>, rest [N], \
         use potion [on companion], gear, inventory, stats, quit"
            .to_string(),
        format_exits(state),
    ]
}

pub fn combat_help(state: &GameState) -> Vec<String> {
    let mut lines = vec![
        "Try: attack [target], defend, special, cast <spell> [target], \
         use potion [on companion], gear, inventory, quit"
            .to_string(),
    ];
    if !state.player.learned_spells.is_empty() {
        lines.push(format!("Spells: {}", state.player.learned_spells.join(", ")));
    }
    let targets: Vec<String> = state
        .living_enemies()
        .enumerate()
        .map(|(idx, e)| format!("{}:{}", idx + 1, e.name))
        .collect();
    if !targets.is_empty() {
        lines.push(format!("Targets: {}", targets.join(", ")));
    }
    lines
}
