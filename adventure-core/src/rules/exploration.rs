//! Room entry, movement and out-of-combat room actions.

use super::enemies::create_enemies;
use super::inventory::{add_item, roll_loot};
use crate::content::{fill_roll_template, ContentError, LootScene, Room, RoomKind, SocialScene};
use crate::dice::{check, Roller};
use crate::state::GameState;
use thiserror::Error;
use tracing::{debug, info};

const LEAVE_VERBS: [&str; 4] = ["leave", "move", "continue", "go"];

/// Why the player could not move.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoveError {
    /// Carries the sorted, comma separated destinations.
    #[error("Can't go that way. Options: {0}.")]
    NoSuchExit(String),

    #[error("There's nowhere to go from here.")]
    NoExits,

    #[error(transparent)]
    Content(#[from] ContentError),
}

/// Enter the current room.
///
/// An undefeated combat room spawns its enemies (unless a fight is already
/// under way) and starts combat. Any other room returns its description.
pub fn start_room(state: &mut GameState, roller: &mut dyn Roller) -> Result<String, ContentError> {
    let campaign = state.campaign()?;
    let room = campaign.room(&state.room_id)?;
    if !state.visited.contains(&room.id) {
        state.visited.push(room.id.clone());
    }

    match &room.kind {
        RoomKind::Combat { enemy } if !state.flags.is_defeated(&room.id) => {
            if state.enemies.is_empty() {
                let profile = campaign.mob(enemy).ok_or_else(|| ContentError::UnknownMob {
                    campaign: campaign.id.clone(),
                    mob: enemy.clone(),
                })?;
                state.enemies = create_enemies(profile, roller);
            }
            state.in_combat = true;
            info!(room = %room.id, enemy = %enemy, count = state.enemies.len(), "combat started");
            Ok(format!("A fight breaks out with {enemy}."))
        }
        _ => Ok(room.description.clone()),
    }
}

/// Resolve a non-combat action in the current room.
pub fn exploration_action(
    state: &mut GameState,
    action: &str,
    roller: &mut dyn Roller,
) -> Result<String, ContentError> {
    let room = state.room()?;
    let action = action.trim().to_lowercase();

    let result = match &room.kind {
        RoomKind::Social(scene) => social_action(state, room, scene, &action, roller),
        RoomKind::Loot(scene) => loot_room_action(state, room, scene, &action, roller),
        RoomKind::Combat { .. } => cleared_room_action(state, room, &action, roller),
        RoomKind::Passage => {
            if matches!(action.as_str(), "search" | "inspect" | "look") {
                room.description.clone()
            } else {
                "You press onward.".to_string()
            }
        }
    };
    Ok(result)
}

fn social_action(
    state: &mut GameState,
    room: &Room,
    scene: &SocialScene,
    action: &str,
    roller: &mut dyn Roller,
) -> String {
    if matches!(action, "talk" | "speak" | "parley" | "approach") {
        let outcome = check(state.player.stats.get(scene.stat), scene.dc, roller);
        debug!(room = %room.id, roll = outcome.roll, total = outcome.total, dc = scene.dc, "social check");
        state.flags.set(scene.done_flag.as_str());
        if outcome.success {
            if let Some(flag) = &scene.success_flag {
                state.flags.set(flag.as_str());
            }
        }
        let template = if outcome.success {
            scene.success_msg.as_deref()
        } else {
            scene.fail_msg.as_deref()
        };
        return match template {
            Some(template) => fill_roll_template(template, outcome.roll, outcome.total),
            None if outcome.success => {
                format!("You succeed (roll {} -> {}).", outcome.roll, outcome.total)
            }
            None => format!("You fail (roll {} -> {}).", outcome.roll, outcome.total),
        };
    }
    if LEAVE_VERBS.contains(&action) {
        return "You prepare to move on.".to_string();
    }
    let npc = room.npc.as_deref().unwrap_or("Someone");
    format!("{npc} waits, watching for your move.")
}

fn loot_room_action(
    state: &mut GameState,
    room: &Room,
    scene: &LootScene,
    action: &str,
    roller: &mut dyn Roller,
) -> String {
    let taken_flag = format!("loot_taken:{}", room.id);
    if matches!(action, "search" | "open" | "loot" | "inspect") {
        if state.flags.has(&taken_flag) {
            return "The chest is already open and empty.".to_string();
        }
        let outcome = check(state.player.stats.get(scene.stat), scene.dc, roller);
        let (roll, total) = (outcome.roll, outcome.total);
        if !outcome.success {
            state.flags.set(format!("loot_failed:{}", room.id));
            return match &scene.fail_msg {
                Some(template) => fill_roll_template(template, roll, total),
                None => format!("Your tools slip (roll {roll} -> {total}). The lock resists for now."),
            };
        }

        if let Some(item_id) = &scene.win_item_id {
            let item = match state.campaign() {
                Ok(campaign) => campaign.item_from_id(item_id),
                Err(_) => crate::content::Item::unknown(item_id),
            };
            if let Err(e) = add_item(state, item) {
                return format!(
                    "You force the lock (roll {roll} -> {total}) but {} \
                     You can rearrange your gear and try again.",
                    e.to_string().to_lowercase()
                );
            }
        }
        state.flags.set(taken_flag);
        if scene.game_over {
            state.game_over = true;
            info!(room = %room.id, "campaign complete");
        }
        return match &scene.success_msg {
            Some(template) => fill_roll_template(template, roll, total),
            None => format!("You work the lock free (roll {roll} -> {total})."),
        };
    }
    if LEAVE_VERBS.contains(&action) {
        return "There's nowhere left to go but the chest.".to_string();
    }
    "Wind whistles through the spire. The chest waits.".to_string()
}

fn cleared_room_action(
    state: &mut GameState,
    room: &Room,
    action: &str,
    roller: &mut dyn Roller,
) -> String {
    if !state.flags.is_defeated(&room.id) {
        return "The enemy blocks your way, ready to strike.".to_string();
    }
    if let Some(target) = action.strip_prefix("loot") {
        return loot_corpses(state, &room.id, target.trim(), roller);
    }
    if matches!(action, "search" | "inspect") {
        return format!(
            "You search the {}. Most supplies are rotted or picked clean.",
            room.name.to_lowercase()
        );
    }
    "The room falls silent after the fight.".to_string()
}

/// Loot unlooted corpses in `room_id`. `target` is empty, `all`, a 1-based
/// number among unlooted corpses, or part of a name.
fn loot_corpses(state: &mut GameState, room_id: &str, target: &str, roller: &mut dyn Roller) -> String {
    let Some(corpses) = state.flags.corpses.get(room_id).filter(|c| !c.is_empty()) else {
        return "Nothing here to loot.".to_string();
    };
    let unlooted: Vec<(u32, String)> = corpses
        .iter()
        .filter(|c| !c.looted)
        .map(|c| (c.id, c.name.clone()))
        .collect();
    if unlooted.is_empty() {
        return "You already searched the corpses.".to_string();
    }

    let chosen: Vec<(u32, String)> = if target == "all" {
        unlooted
    } else if let Ok(number) = target.parse::<usize>() {
        match number.checked_sub(1).and_then(|i| unlooted.get(i)) {
            Some(corpse) => vec![corpse.clone()],
            None => return "That corpse does not exist.".to_string(),
        }
    } else if !target.is_empty() {
        let matches: Vec<_> = unlooted
            .into_iter()
            .filter(|(_, name)| name.to_lowercase().contains(target))
            .collect();
        match matches.len() {
            0 => return "No such corpse.".to_string(),
            1 => matches,
            _ => return "Be more specific.".to_string(),
        }
    } else if unlooted.len() > 1 {
        return "Multiple corpses here. Use 'loot <number>' or 'loot all'.".to_string();
    } else {
        unlooted
    };

    let campaign = match state.campaign() {
        Ok(campaign) => campaign,
        Err(_) => return "Nothing here to loot.".to_string(),
    };
    let mut total_gold = 0;
    let mut found = Vec::new();
    for (corpse_id, name) in &chosen {
        let (gold, item_id) = roll_loot(campaign, name, roller);
        total_gold += gold;
        if let Some(item_id) = item_id {
            let item = campaign.item_from_id(&item_id);
            let item_name = item.name.clone();
            match add_item(state, item) {
                Ok(_) => found.push(format!("You find {item_name}.")),
                Err(e) => found.push(format!(
                    "You spot {item_name}, but {}",
                    e.to_string().to_lowercase()
                )),
            }
        }
        if let Some(corpse) = state
            .flags
            .corpses
            .get_mut(room_id)
            .and_then(|corpses| corpses.iter_mut().find(|c| c.id == *corpse_id))
        {
            corpse.looted = true;
        }
    }
    state.player.gold += total_gold;

    if total_gold == 0 && found.is_empty() {
        return "You search the corpse but find nothing.".to_string();
    }
    let mut message = format!("You loot the corpse and gain {total_gold} gold.");
    for line in found {
        message.push(' ');
        message.push_str(&line);
    }
    message
}

/// Move through an exit named by alias or destination id, then enter the room.
pub fn move_player(
    state: &mut GameState,
    destination: &str,
    roller: &mut dyn Roller,
) -> Result<String, MoveError> {
    let campaign = state.campaign()?;
    let exits = campaign.exits(&state.room_id);
    let destination = destination.trim().to_lowercase();

    let target = exits
        .get(&destination)
        .cloned()
        .or_else(|| exits.values().find(|to| **to == destination).cloned());
    let Some(target) = target else {
        if exits.is_empty() {
            return Err(MoveError::NoExits);
        }
        let options = campaign.exit_destinations(&state.room_id).join(", ");
        return Err(MoveError::NoSuchExit(options));
    };

    // Validate before leaving the current room.
    campaign.room(&target)?;
    debug!(from = %state.room_id, to = %target, "move");
    state.room_id = target;
    Ok(start_room(state, roller)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::combat::end_combat_if_needed;
    use crate::testing::{fixtures, ScriptedDice};

    fn cleared_barracks() -> GameState {
        let mut state = fixtures::watchtower_state();
        state.room_id = "barracks".to_string();
        state.in_combat = true;
        let mut bandit = fixtures::bandit();
        bandit.hp = 0;
        state.enemies = vec![bandit];
        end_combat_if_needed(&mut state);
        state
    }

    #[test]
    fn test_start_room_spawns_enemies() {
        let mut state = fixtures::watchtower_state();
        state.room_id = "cellar".to_string();
        let result = start_room(&mut state, &mut ScriptedDice::constant(3)).unwrap();
        assert_eq!(result, "A fight breaks out with Big Rats.");
        assert!(state.in_combat);
        assert_eq!(state.enemies.len(), 2);
        assert!(state.enemies.iter().all(|e| e.hp == 2));
        assert_eq!(state.visited, vec!["cellar".to_string()]);
    }

    #[test]
    fn test_start_room_after_victory_describes() {
        let mut state = cleared_barracks();
        let result = start_room(&mut state, &mut ScriptedDice::constant(3)).unwrap();
        assert!(result.starts_with("Dusty bunks"));
        assert!(!state.in_combat);
    }

    #[test]
    fn test_talk_sets_flags() {
        let mut state = fixtures::watchtower_state();
        // INT 2 + 11 meets DC 13.
        let result = exploration_action(&mut state, "talk", &mut ScriptedDice::constant(11)).unwrap();
        assert!(result.starts_with("You win Eryn's trust (roll 11 -> 13)."));
        assert!(state.flags.has("scout_helped"));
        assert!(state.flags.has("social_done"));
    }

    #[test]
    fn test_talk_failure_sets_only_done_flag() {
        let mut state = fixtures::watchtower_state();
        let result = exploration_action(&mut state, "Talk", &mut ScriptedDice::constant(2)).unwrap();
        assert!(result.starts_with("Eryn stays guarded (roll 2 -> 4)."));
        assert!(!state.flags.has("scout_helped"));
        assert!(state.flags.has("social_done"));
    }

    #[test]
    fn test_social_idle_and_leave() {
        let mut state = fixtures::watchtower_state();
        let mut dice = ScriptedDice::constant(10);
        assert_eq!(
            exploration_action(&mut state, "dance", &mut dice).unwrap(),
            "Eryn the Scout waits, watching for your move."
        );
        assert_eq!(
            exploration_action(&mut state, "leave", &mut dice).unwrap(),
            "You prepare to move on."
        );
    }

    #[test]
    fn test_loot_spire_ends_game() {
        let mut state = fixtures::watchtower_state();
        state.room_id = "spire".to_string();
        let result = exploration_action(&mut state, "search", &mut ScriptedDice::constant(20)).unwrap();
        assert!(result.contains("Silver Locket"));
        assert!(state.game_over);
        assert!(state.inventory.iter().any(|i| i.id == "silver_locket"));

        let again = exploration_action(&mut state, "open", &mut ScriptedDice::constant(20)).unwrap();
        assert_eq!(again, "The chest is already open and empty.");
    }

    #[test]
    fn test_loot_spire_full_inventory_can_retry() {
        let mut state = fixtures::watchtower_state();
        state.room_id = "spire".to_string();
        state.inventory = (0..10).map(|_| fixtures::watchtower_item("healing_potion")).collect();
        let result = exploration_action(&mut state, "open", &mut ScriptedDice::constant(20)).unwrap();
        assert_eq!(
            result,
            "You force the lock (roll 20 -> 22) but inventory is full. \
             You can rearrange your gear and try again."
        );
        assert!(!state.game_over);

        state.inventory.pop();
        let retry = exploration_action(&mut state, "open", &mut ScriptedDice::constant(20)).unwrap();
        assert!(retry.contains("Silver Locket"));
        assert!(state.game_over);
    }

    #[test]
    fn test_loot_spire_failure() {
        let mut state = fixtures::watchtower_state();
        state.room_id = "spire".to_string();
        let result = exploration_action(&mut state, "open", &mut ScriptedDice::constant(1)).unwrap();
        assert!(result.starts_with("Your tools slip (roll 1 -> 3)."));
        assert!(state.flags.has("loot_failed:spire"));
        assert!(!state.game_over);
        assert_eq!(
            exploration_action(&mut state, "wait", &mut ScriptedDice::constant(1)).unwrap(),
            "Wind whistles through the spire. The chest waits."
        );
    }

    #[test]
    fn test_loot_bandit_gives_gold_and_item() {
        let mut state = cleared_barracks();
        let mut dice = ScriptedDice::sequence([4, 1]);
        let result = exploration_action(&mut state, "loot", &mut dice).unwrap();
        assert_eq!(
            result,
            "You loot the corpse and gain 6 gold. You find Padded Armguards."
        );
        assert_eq!(state.player.gold, 6);
        assert_eq!(state.inventory.len(), 1);
        assert_eq!(
            exploration_action(&mut state, "loot", &mut dice).unwrap(),
            "You already searched the corpses."
        );
    }

    #[test]
    fn test_loot_with_full_inventory_keeps_gold() {
        let mut state = cleared_barracks();
        state.inventory = (0..10).map(|_| fixtures::watchtower_item("healing_potion")).collect();
        let mut dice = ScriptedDice::sequence([2, 1]);
        let result = exploration_action(&mut state, "loot 1", &mut dice).unwrap();
        assert_eq!(
            result,
            "You loot the corpse and gain 4 gold. You spot Padded Armguards, but inventory is full."
        );
        assert_eq!(state.player.gold, 4);
        assert_eq!(state.inventory.len(), 10);
    }

    #[test]
    fn test_loot_multiple_corpses() {
        let mut state = fixtures::watchtower_state();
        state.room_id = "cellar".to_string();
        state.in_combat = true;
        let mut rats = vec![fixtures::bandit(), fixtures::bandit()];
        for rat in &mut rats {
            rat.name = "Big Rats".to_string();
            rat.hp = 0;
        }
        state.enemies = rats;
        end_combat_if_needed(&mut state);

        let mut dice = ScriptedDice::constant(1);
        assert_eq!(
            exploration_action(&mut state, "loot", &mut dice).unwrap(),
            "Multiple corpses here. Use 'loot <number>' or 'loot all'."
        );
        assert_eq!(
            exploration_action(&mut state, "loot 3", &mut dice).unwrap(),
            "That corpse does not exist."
        );
        assert_eq!(
            exploration_action(&mut state, "loot rat", &mut dice).unwrap(),
            "Be more specific."
        );
        assert_eq!(
            exploration_action(&mut state, "loot ogre", &mut dice).unwrap(),
            "No such corpse."
        );
        assert_eq!(
            exploration_action(&mut state, "loot all", &mut dice).unwrap(),
            "You search the corpse but find nothing."
        );
        assert!(state.flags.unlooted_corpses("cellar").next().is_none());
    }

    #[test]
    fn test_search_cleared_and_uncleared_rooms() {
        let mut state = cleared_barracks();
        let mut dice = ScriptedDice::constant(1);
        assert_eq!(
            exploration_action(&mut state, "search", &mut dice).unwrap(),
            "You search the crumbling barracks. Most supplies are rotted or picked clean."
        );

        let mut state = fixtures::watchtower_state();
        state.room_id = "cellar".to_string();
        assert_eq!(
            exploration_action(&mut state, "loot", &mut dice).unwrap(),
            "The enemy blocks your way, ready to strike."
        );
    }

    #[test]
    fn test_loot_without_corpses() {
        let mut state = fixtures::watchtower_state();
        state.room_id = "barracks".to_string();
        state.flags.defeated_rooms.insert("barracks".to_string());
        assert_eq!(
            exploration_action(&mut state, "loot", &mut ScriptedDice::constant(1)).unwrap(),
            "Nothing here to loot."
        );
    }

    #[test]
    fn test_move_by_alias_and_destination() {
        let mut state = fixtures::watchtower_state();
        let mut dice = ScriptedDice::constant(3);
        let result = move_player(&mut state, "down", &mut dice).unwrap();
        assert_eq!(result, "A fight breaks out with Big Rats.");
        assert_eq!(state.room_id, "cellar");

        let mut state = fixtures::watchtower_state();
        state.flags.defeated_rooms.insert("barracks".to_string());
        move_player(&mut state, "Barracks", &mut dice).unwrap();
        assert_eq!(state.room_id, "barracks");
        assert!(!state.in_combat);
    }

    #[test]
    fn test_move_invalid_lists_options() {
        let mut state = fixtures::watchtower_state();
        let err = move_player(&mut state, "sideways", &mut ScriptedDice::constant(1)).unwrap_err();
        assert_eq!(err.to_string(), "Can't go that way. Options: barracks, cellar.");
        assert_eq!(state.room_id, "courtyard");
    }

    #[test]
    fn test_passage_room() {
        let mut state = fixtures::watchtower_state();
        state.campaign_id = "lost_crypt".to_string();
        state.room_id = "hallway".to_string();
        let mut dice = ScriptedDice::constant(1);
        assert!(exploration_action(&mut state, "look", &mut dice)
            .unwrap()
            .starts_with("Torch sconces"));
        assert_eq!(
            exploration_action(&mut state, "wait", &mut dice).unwrap(),
            "You press onward."
        );
    }
}
