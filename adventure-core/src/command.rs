//! Player input parsing.
//!
//! Raw lines are normalized with [`normalize_action`] and then parsed into a
//! command for the current mode: exploration, combat, or the gear menu.

use crate::rules::{PlayerAction, Spell};

/// Most rests a single `rest N` performs.
pub const DEFAULT_MAX_REST_BATCH: u32 = 20;

const MOVE_VERBS: [&str; 6] = ["go", "move", "walk", "head", "enter", "travel"];
const FILLER: [&str; 6] = ["to", "the", "a", "an", "towards", "toward"];
const DIRECTIONS: [&str; 7] = ["up", "down", "north", "south", "east", "west", "back"];

/// Lowercase, collapse whitespace and drop filler words after a movement verb.
///
/// `"Go to the Cellar"` becomes `"go cellar"`.
pub fn normalize_action(raw: &str) -> String {
    let cleaned = raw.trim().to_lowercase();
    let mut tokens = cleaned.split_whitespace();
    let Some(first) = tokens.next() else {
        return String::new();
    };
    let keep_filler = !MOVE_VERBS.contains(&first);
    std::iter::once(first)
        .chain(tokens.filter(|t| keep_filler || !FILLER.contains(t)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `use X [on T]` or `drink X`. `None` when the input is something else.
pub fn parse_use(action: &str) -> Option<(String, Option<String>)> {
    let payload = match action {
        "use" | "drink" => "",
        _ => action
            .strip_prefix("use ")
            .or_else(|| action.strip_prefix("drink "))?,
    };
    match payload.split_once(" on ") {
        Some((item, target)) => {
            let target = target.trim();
            Some((
                item.trim().to_string(),
                (!target.is_empty()).then(|| target.to_string()),
            ))
        }
        None => Some((payload.trim().to_string(), None)),
    }
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

// ============================================================================
// Exploration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplorationCommand {
    Quit,
    Help,
    Gear,
    Inventory,
    Stats,
    Use {
        item: String,
        target: Option<String>,
    },
    Rest(u32),
    /// `None` when the player asked to move without a destination.
    Move(Option<String>),
    /// Anything else is handed to the current room.
    Act(String),
}

/// Parse a normalized exploration command.
pub fn parse_exploration(action: &str, max_rest: u32) -> ExplorationCommand {
    match action {
        "quit" | "exit" => return ExplorationCommand::Quit,
        "help" | "?" => return ExplorationCommand::Help,
        "gear" | "equip" | "equipment" => return ExplorationCommand::Gear,
        "inventory" | "inv" | "i" => return ExplorationCommand::Inventory,
        "stats" => return ExplorationCommand::Stats,
        "move" | "go" | "leave" | "continue" => return ExplorationCommand::Move(None),
        _ => {}
    }
    if let Some((item, target)) = parse_use(action) {
        return ExplorationCommand::Use { item, target };
    }
    if action == "rest" {
        return ExplorationCommand::Rest(1);
    }
    if let Some(count) = action.strip_prefix("rest ") {
        let count = count
            .split_whitespace()
            .next()
            .and_then(|n| n.parse::<u32>().ok())
            .unwrap_or(1);
        return ExplorationCommand::Rest(count.clamp(1, max_rest.max(1)));
    }
    if DIRECTIONS.contains(&action) {
        return ExplorationCommand::Move(Some(action.to_string()));
    }
    let destination = MOVE_VERBS
        .iter()
        .chain(std::iter::once(&"leave"))
        .find_map(|verb| action.strip_prefix(verb)?.strip_prefix(' '));
    if let Some(destination) = destination {
        return ExplorationCommand::Move(non_empty(destination));
    }
    ExplorationCommand::Act(action.to_string())
}

// ============================================================================
// Combat
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CombatCommand {
    Quit,
    Help,
    Gear,
    Inventory,
    Use {
        item: String,
        target: Option<String>,
    },
    Act(PlayerAction),
    /// `cast` with no spell named.
    CastWhich,
    Unknown,
}

/// Split `"<spell> [target]"`, preferring known multi-word spell names.
fn spell_and_target(text: &str) -> (String, Option<String>) {
    if let Some((spell, rest)) = Spell::split_prefix(text) {
        return (spell.name().to_string(), non_empty(rest));
    }
    match text.split_once(' ') {
        Some((spell, target)) => (spell.to_string(), non_empty(target)),
        None => (text.to_string(), None),
    }
}

/// Parse a normalized combat command.
pub fn parse_combat(action: &str) -> CombatCommand {
    match action {
        "quit" | "exit" => return CombatCommand::Quit,
        "help" | "?" => return CombatCommand::Help,
        "gear" | "equip" | "equipment" => return CombatCommand::Gear,
        "inventory" | "inv" | "i" => return CombatCommand::Inventory,
        "attack" => return CombatCommand::Act(PlayerAction::Attack { target: None }),
        "defend" => return CombatCommand::Act(PlayerAction::Defend),
        "special" => return CombatCommand::Act(PlayerAction::Special { target: None }),
        "cast" => return CombatCommand::CastWhich,
        _ => {}
    }
    if let Some((item, target)) = parse_use(action) {
        return CombatCommand::Use { item, target };
    }
    if let Some(target) = action.strip_prefix("attack ") {
        return CombatCommand::Act(PlayerAction::Attack {
            target: non_empty(target),
        });
    }
    if let Some(target) = action.strip_prefix("special ") {
        return CombatCommand::Act(PlayerAction::Special {
            target: non_empty(target),
        });
    }
    if let Some(rest) = action.strip_prefix("cast ") {
        let rest = rest.trim();
        if rest.is_empty() {
            return CombatCommand::CastWhich;
        }
        let (spell, target) = spell_and_target(rest);
        return CombatCommand::Act(PlayerAction::Cast { spell, target });
    }
    // Spell names work as shortcuts.
    if let Some((spell, rest)) = Spell::split_prefix(action) {
        return CombatCommand::Act(PlayerAction::Cast {
            spell: spell.name().to_string(),
            target: non_empty(rest),
        });
    }
    CombatCommand::Unknown
}

// ============================================================================
// Gear menu
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GearCommand {
    Back,
    Show,
    Equip(String),
    Unequip(String),
    Unknown,
}

pub fn parse_gear(action: &str) -> GearCommand {
    match action {
        "back" | "exit" | "quit" => GearCommand::Back,
        "show" | "list" => GearCommand::Show,
        _ => {
            if let Some(item) = action.strip_prefix("equip ") {
                GearCommand::Equip(item.trim().to_string())
            } else if let Some(slot) = action.strip_prefix("unequip ") {
                GearCommand::Unequip(slot.trim().to_string())
            } else {
                GearCommand::Unknown
            }
        }
    }
}
