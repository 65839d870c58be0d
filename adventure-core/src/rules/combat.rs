//! Combat resolution.
//!
//! A round is the player's action, then the primary companion's, then every
//! living enemy's, then [`clear_round_buffs`] and [`end_combat_if_needed`].
//! The session drives the order; each step here returns its result line.

use super::experience::grant_xp;
use super::inventory::HealTarget;
use super::spells::{best_damage_spell, Spell, SpellEffect};
use crate::content;
use crate::dice::{DiceExpression, Roller};
use crate::profiles::{CharacterClass, MobAi};
use crate::state::{Corpse, GameState};
use thiserror::Error;
use tracing::info;

/// Extra AC while defending.
const DEFEND_BONUS: i32 = 2;

/// What the player does on their turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerAction {
    Attack { target: Option<String> },
    Defend,
    /// Class ability: a damage spell for wizards, a power strike for
    /// fighters, a precise shot for rogues.
    Special { target: Option<String> },
    Cast { spell: String, target: Option<String> },
}

/// Why no enemy could be targeted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("There's nothing to attack.")]
    NothingToAttack,
    #[error("That target doesn't exist.")]
    NoSuchNumber,
    #[error("No such target.")]
    NoMatch,
    #[error("Be more specific.")]
    Ambiguous,
}

/// Pick a living enemy. Returns its index into `state.enemies`.
///
/// No query picks the lowest HP; a number counts living enemies from 1;
/// anything else must match exactly one name.
pub fn select_enemy(state: &GameState, query: Option<&str>) -> Result<usize, TargetError> {
    let alive: Vec<usize> = state
        .enemies
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_alive())
        .map(|(idx, _)| idx)
        .collect();
    if alive.is_empty() {
        return Err(TargetError::NothingToAttack);
    }

    let token = query.map(|q| q.trim().to_lowercase()).unwrap_or_default();
    if token.is_empty() {
        return alive
            .iter()
            .copied()
            .min_by_key(|idx| state.enemies[*idx].hp)
            .ok_or(TargetError::NothingToAttack);
    }
    if let Ok(number) = token.parse::<usize>() {
        return number
            .checked_sub(1)
            .and_then(|i| alive.get(i).copied())
            .ok_or(TargetError::NoSuchNumber);
    }
    let matches: Vec<usize> = alive
        .into_iter()
        .filter(|idx| state.enemies[*idx].name.to_lowercase().contains(&token))
        .collect();
    match matches.as_slice() {
        [] => Err(TargetError::NoMatch),
        [idx] => Ok(*idx),
        _ => Err(TargetError::Ambiguous),
    }
}

struct AttackRoll {
    hit: bool,
    roll: u32,
    total: i32,
}

/// d20 + bonus (+d4 when blessed) against `ac`.
fn attack_roll(bonus: i32, ac: i32, blessed: bool, roller: &mut dyn Roller) -> AttackRoll {
    let roll = roller.roll_die(20);
    let bless = if blessed { roller.roll_die(4) as i32 } else { 0 };
    let total = roll as i32 + bonus + bless;
    AttackRoll {
        hit: total >= ac,
        roll,
        total,
    }
}

/// Roll damage plus a flat bonus. Returns the amount and the roll detail.
fn roll_damage(expr: &DiceExpression, bonus: i32, roller: &mut dyn Roller) -> (i32, String) {
    let roll = expr.roll(roller);
    let mut detail = roll.detail;
    if bonus != 0 {
        detail.push_str(&format!("{bonus:+}"));
    }
    ((roll.total + bonus).max(0), detail)
}

/// Attack an enemy and apply damage on a hit. Damage wakes a sleeper.
fn strike_enemy(
    state: &mut GameState,
    idx: usize,
    attack_bonus: i32,
    blessed: bool,
    damage: &DiceExpression,
    damage_bonus: i32,
    roller: &mut dyn Roller,
) -> (AttackRoll, Option<String>) {
    let ac = state.enemies[idx].ac;
    let attack = attack_roll(attack_bonus, ac, blessed, roller);
    if !attack.hit {
        return (attack, None);
    }
    let (amount, detail) = roll_damage(damage, damage_bonus, roller);
    let enemy = &mut state.enemies[idx];
    enemy.hp = (enemy.hp - amount).max(0);
    if amount > 0 {
        enemy.asleep = false;
    }
    (attack, Some(format!("{amount} ({detail})")))
}

fn player_strike(
    state: &mut GameState,
    idx: usize,
    attack_bonus: i32,
    damage: &DiceExpression,
    damage_bonus: i32,
    flavor: &str,
    roller: &mut dyn Roller,
) -> String {
    let blessed = std::mem::take(&mut state.player_bless_active);
    let (attack, damage) =
        strike_enemy(state, idx, attack_bonus, blessed, damage, damage_bonus, roller);
    let name = &state.enemies[idx].name;
    match damage {
        Some(detail) => format!(
            "{flavor}Hit {name} (roll {} -> {}) for {detail} damage.",
            attack.roll, attack.total
        ),
        None => format!("{flavor}Miss {name} (roll {} -> {}).", attack.roll, attack.total),
    }
}

/// Resolve the player's action. Refusals come back as the result text.
pub fn player_action(state: &mut GameState, action: &PlayerAction, roller: &mut dyn Roller) -> String {
    state.player_defending = false;
    match action {
        PlayerAction::Defend => {
            state.player_defending = true;
            format!(
                "{} takes a defensive stance (+2 AC until next attack).",
                state.player.name
            )
        }
        PlayerAction::Attack { target } => {
            let idx = match select_enemy(state, target.as_deref()) {
                Ok(idx) => idx,
                Err(e) => return e.to_string(),
            };
            let damage = state.player.damage.clone();
            let bonus = state.player.attack_bonus;
            player_strike(state, idx, bonus, &damage, 0, "", roller)
        }
        PlayerAction::Special { target } => special(state, target.as_deref(), roller),
        PlayerAction::Cast { spell, target } => cast(state, spell, target.as_deref(), roller),
    }
}

fn special(state: &mut GameState, target: Option<&str>, roller: &mut dyn Roller) -> String {
    let idx = match select_enemy(state, target) {
        Ok(idx) => idx,
        Err(e) => return e.to_string(),
    };
    let damage = state.player.damage.clone();
    let bonus = state.player.attack_bonus;
    match state.player.class {
        CharacterClass::Wizard => match best_damage_spell(&state.player.learned_spells) {
            Some(spell) => cast_damage(state, spell, idx, roller),
            None => "You have no damage spells to cast.".to_string(),
        },
        CharacterClass::Fighter => player_strike(
            state,
            idx,
            bonus,
            &damage,
            2,
            "You drive a heavy power strike. ",
            roller,
        ),
        CharacterClass::Rogue => player_strike(
            state,
            idx,
            bonus + 2,
            &damage,
            0,
            "You line up a precise shot. ",
            roller,
        ),
        CharacterClass::Cleric => player_strike(state, idx, bonus, &damage, 0, "", roller),
    }
}

fn spend_mana(state: &mut GameState, spell: Spell) -> bool {
    if state.player.mana < spell.mana_cost() {
        return false;
    }
    state.player.mana -= spell.mana_cost();
    true
}

fn cast_damage(state: &mut GameState, spell: Spell, idx: usize, roller: &mut dyn Roller) -> String {
    let SpellEffect::Damage(damage) = spell.effect() else {
        return format!("{spell} can't harm anyone.");
    };
    if !spend_mana(state, spell) {
        return "You are out of mana.".to_string();
    }
    let bonus = state.player.attack_bonus + state.player.stats.get(state.player.class.casting_stat());
    let flavor = format!("You channel {spell}. ");
    player_strike(state, idx, bonus, &damage, 0, &flavor, roller)
}

fn cast(state: &mut GameState, spell_name: &str, target: Option<&str>, roller: &mut dyn Roller) -> String {
    let Some(spell) = Spell::from_name(spell_name).filter(|s| state.player.knows_spell(s.name()))
    else {
        return "You don't know that spell.".to_string();
    };
    if state.player.mana < spell.mana_cost() {
        return "You are out of mana.".to_string();
    }

    match spell.effect() {
        SpellEffect::Damage(_) => match select_enemy(state, target) {
            Ok(idx) => cast_damage(state, spell, idx, roller),
            Err(e) => e.to_string(),
        },
        SpellEffect::Sleep => {
            let idx = match select_enemy(state, target) {
                Ok(idx) => idx,
                Err(e) => return e.to_string(),
            };
            spend_mana(state, spell);
            let enemy = &mut state.enemies[idx];
            enemy.asleep = true;
            format!("You cast Sleep. {} slumps into a magical slumber.", enemy.name)
        }
        SpellEffect::Ward(bonus) => {
            spend_mana(state, spell);
            state.player_shield_active = true;
            format!("You raise a shimmering Shield (+{bonus} AC this round).")
        }
        SpellEffect::Heal(dice) => {
            spend_mana(state, spell);
            let who = HealTarget::choose(state, target);
            let wisdom = state.player.stats.wisdom;
            let (amount, detail) = roll_damage(&dice, wisdom, roller);
            let (name, healed) = who.heal(state, amount);
            format!("You cast {spell} on {name}, healing {healed} ({detail}).")
        }
        SpellEffect::Bless => {
            spend_mana(state, spell);
            state.player_bless_active = true;
            state.companion_bless_active = true;
            "You invoke Bless. Divine favor steadies your party's aim (+1d4 to hit).".to_string()
        }
    }
}

/// Resolve the primary companion's turn.
pub fn companion_action(state: &mut GameState, roller: &mut dyn Roller) -> String {
    let Some(companion) = state.companion().cloned() else {
        return "You fight alone.".to_string();
    };
    let name = companion.name.as_str();
    if companion.is_down() {
        return format!("{name} is down and cannot act.");
    }
    state.companion_defending = false;
    if companion.hp <= companion.defend_hp_threshold {
        state.companion_defending = true;
        return format!("{name} keeps their distance and braces (+2 AC).");
    }
    let Ok(idx) = select_enemy(state, None) else {
        return format!("{name} scans the room, weapon lowered.");
    };
    let blessed = state.companion_bless_active;

    if let Some(spell) = best_damage_spell(&companion.learned_spells) {
        if let SpellEffect::Damage(damage) = spell.effect() {
            if companion.is_caster() && companion.mana >= spell.mana_cost() {
                if let Some(c) = state.companion_mut() {
                    c.mana -= spell.mana_cost();
                }
                let (attack, damage) =
                    strike_enemy(state, idx, companion.attack_bonus, blessed, &damage, 0, roller);
                let enemy = &state.enemies[idx].name;
                return match damage {
                    Some(detail) => format!(
                        "{name} channels {spell}. Hit {enemy} (roll {} -> {}) for {detail} damage.",
                        attack.roll, attack.total
                    ),
                    None => format!(
                        "{name} channels {spell}. Miss {enemy} (roll {} -> {}).",
                        attack.roll, attack.total
                    ),
                };
            }
        }
    }

    let (attack, damage) = strike_enemy(
        state,
        idx,
        companion.attack_bonus,
        blessed,
        &companion.damage,
        0,
        roller,
    );
    let enemy = &state.enemies[idx].name;
    match damage {
        Some(detail) => format!(
            "{name} strikes {enemy} (roll {} -> {}) for {detail} damage.",
            attack.roll, attack.total
        ),
        None => format!("{name} misses {enemy} (roll {} -> {}).", attack.roll, attack.total),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Victim {
    Player,
    Companion,
}

fn pick_victim(state: &GameState, ai: MobAi) -> Victim {
    let companion_hp = state.companion().filter(|c| !c.is_down()).map(|c| c.hp);
    match (ai, companion_hp) {
        (_, None) => Victim::Player,
        (MobAi::FocusPlayer, Some(_)) if state.player.hp > 0 => Victim::Player,
        (MobAi::FocusPlayer, Some(_)) => Victim::Companion,
        (MobAi::FocusCompanion, Some(_)) => Victim::Companion,
        (MobAi::FocusWeakest, Some(hp)) if hp < state.player.hp => Victim::Companion,
        (MobAi::FocusWeakest, Some(_)) => Victim::Player,
    }
}

/// Every living enemy acts once.
pub fn enemy_actions(state: &mut GameState, roller: &mut dyn Roller) -> Vec<String> {
    let alive: Vec<usize> = state
        .enemies
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_alive())
        .map(|(idx, _)| idx)
        .collect();
    if alive.is_empty() {
        return vec!["The foes are down.".to_string()];
    }

    let mut results = Vec::with_capacity(alive.len());
    for idx in alive {
        let enemy = state.enemies[idx].clone();
        if enemy.asleep {
            results.push(format!("{} is fast asleep.", enemy.name));
            continue;
        }
        let ai = content::mob_profile(&state.campaign_id, &enemy.name)
            .map(|p| p.ai)
            .unwrap_or_default();

        match pick_victim(state, ai) {
            Victim::Player => {
                let shield = if state.player_shield_active { 5 } else { 0 };
                let defend = if state.player_defending { DEFEND_BONUS } else { 0 };
                let attack =
                    attack_roll(enemy.attack_bonus, state.player.ac + shield + defend, false, roller);
                let target = state.player.name.clone();
                if attack.hit {
                    let (amount, detail) = roll_damage(&enemy.damage, 0, roller);
                    state.player.hp = (state.player.hp - amount).max(0);
                    results.push(format!(
                        "{} strikes {target} (roll {} -> {}) for {amount} ({detail}) damage.",
                        enemy.name, attack.roll, attack.total
                    ));
                } else {
                    results.push(format!(
                        "{} misses {target} (roll {} -> {}).",
                        enemy.name, attack.roll, attack.total
                    ));
                }
            }
            Victim::Companion => {
                let defend = if state.companion_defending { DEFEND_BONUS } else { 0 };
                let Some(companion) = state.companions.first_mut() else {
                    continue;
                };
                let attack = attack_roll(enemy.attack_bonus, companion.ac + defend, false, roller);
                if attack.hit {
                    let (amount, detail) = roll_damage(&enemy.damage, 0, roller);
                    companion.hp = (companion.hp - amount).max(0);
                    results.push(format!(
                        "{} lashes at {} (roll {} -> {}) for {amount} ({detail}) damage.",
                        enemy.name, companion.name, attack.roll, attack.total
                    ));
                } else {
                    results.push(format!(
                        "{} misses {} (roll {} -> {}).",
                        enemy.name, companion.name, attack.roll, attack.total
                    ));
                }
            }
        }
    }
    results
}

/// Expire buffs that last one round.
pub fn clear_round_buffs(state: &mut GameState) {
    state.player_shield_active = false;
    state.companion_bless_active = false;
}

/// Close out combat when one side is down.
///
/// Victory marks the room defeated, grants XP and leaves numbered corpses.
/// A downed player ends the game.
pub fn end_combat_if_needed(state: &mut GameState) -> Option<String> {
    if state.enemies.is_empty() {
        return None;
    }
    if state.enemies.iter().all(|e| !e.is_alive()) {
        state.in_combat = false;
        state.flags.defeated_rooms.insert(state.room_id.clone());

        let total_xp: u32 = state
            .enemies
            .iter()
            .filter_map(|e| content::mob_profile(&state.campaign_id, &e.name))
            .map(|p| p.xp)
            .sum();
        let level_messages = grant_xp(state, total_xp);

        let enemies = std::mem::take(&mut state.enemies);
        let corpses: Vec<Corpse> = enemies
            .into_iter()
            .map(|enemy| Corpse {
                id: state.flags.take_corpse_id(),
                name: enemy.name,
                looted: false,
            })
            .collect();
        let corpse_list = corpses
            .iter()
            .map(|c| format!("{}. {}", c.id, c.name))
            .collect::<Vec<_>>()
            .join(", ");
        state.flags.corpses.insert(state.room_id.clone(), corpses);
        info!(room = %state.room_id, xp = total_xp, "combat won");

        let mut parts = vec![format!(
            "The foes fall. Corpses: {corpse_list}. You can 'loot <number>' or 'loot all'. \
             The way forward is clear."
        )];
        if total_xp > 0 {
            parts.push(format!("XP +{total_xp}."));
        }
        parts.extend(level_messages);
        return Some(parts.join(" "));
    }
    if state.player.hp <= 0 {
        state.game_over = true;
        let place = state
            .campaign()
            .map(|c| c.name.clone())
            .unwrap_or_else(|_| "The dark".to_string());
        info!(room = %state.room_id, "player defeated");
        return Some(format!(
            "You collapse from your wounds. {place} claims another victim."
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, ScriptedDice};

    fn attack() -> PlayerAction {
        PlayerAction::Attack { target: None }
    }

    #[test]
    fn test_attack_hits_and_deals_damage() {
        let mut state = fixtures::watchtower_state();
        state.enemies = vec![fixtures::bandit()];
        let mut dice = ScriptedDice::sequence([15, 4]);
        let result = player_action(&mut state, &attack(), &mut dice);
        assert_eq!(
            result,
            "Hit Watchtower Bandit (roll 15 -> 18) for 5 (4+1) damage."
        );
        assert_eq!(state.enemies[0].hp, 7);
    }

    #[test]
    fn test_attack_miss() {
        let mut state = fixtures::watchtower_state();
        state.enemies = vec![fixtures::bandit()];
        let mut dice = ScriptedDice::sequence([2]);
        let result = player_action(&mut state, &attack(), &mut dice);
        assert_eq!(result, "Miss Watchtower Bandit (roll 2 -> 5).");
        assert_eq!(state.enemies[0].hp, 12);
    }

    #[test]
    fn test_target_selection() {
        let mut state = fixtures::watchtower_state();
        assert_eq!(select_enemy(&state, None), Err(TargetError::NothingToAttack));

        let mut rat_a = fixtures::bandit();
        rat_a.name = "Big Rats".to_string();
        rat_a.hp = 3;
        let mut rat_b = rat_a.clone();
        rat_b.hp = 1;
        state.enemies = vec![rat_a, rat_b, fixtures::bandit()];

        assert_eq!(select_enemy(&state, None), Ok(1));
        assert_eq!(select_enemy(&state, Some("3")), Ok(2));
        assert_eq!(select_enemy(&state, Some("4")), Err(TargetError::NoSuchNumber));
        assert_eq!(select_enemy(&state, Some("bandit")), Ok(2));
        assert_eq!(select_enemy(&state, Some("rat")), Err(TargetError::Ambiguous));
        assert_eq!(select_enemy(&state, Some("ogre")), Err(TargetError::NoMatch));

        state.enemies[0].hp = 0;
        assert_eq!(select_enemy(&state, Some("1")), Ok(1));
        assert_eq!(select_enemy(&state, Some("rat")), Ok(1));
    }

    #[test]
    fn test_defend_prevents_hit() {
        let mut state = fixtures::watchtower_state();
        state.enemies = vec![fixtures::bandit()];
        state.player.hp = 5;
        state.player_defending = true;
        let mut dice = ScriptedDice::constant(12);
        let results = enemy_actions(&mut state, &mut dice);
        assert_eq!(results, vec!["Watchtower Bandit misses Hero (roll 12 -> 15)."]);
        assert_eq!(state.player.hp, 5);
    }

    #[test]
    fn test_player_action_clears_defending() {
        let mut state = fixtures::watchtower_state();
        state.enemies = vec![fixtures::bandit()];
        player_action(&mut state, &PlayerAction::Defend, &mut ScriptedDice::constant(1));
        assert!(state.player_defending);
        player_action(&mut state, &attack(), &mut ScriptedDice::constant(1));
        assert!(!state.player_defending);
    }

    #[test]
    fn test_fighter_special_adds_damage() {
        let mut state = fixtures::watchtower_state();
        state.enemies = vec![fixtures::bandit()];
        let mut dice = ScriptedDice::sequence([15, 3]);
        let result = player_action(&mut state, &PlayerAction::Special { target: None }, &mut dice);
        assert_eq!(
            result,
            "You drive a heavy power strike. Hit Watchtower Bandit (roll 15 -> 18) for 6 (3+1+2) damage."
        );
        assert_eq!(state.enemies[0].hp, 6);
    }

    #[test]
    fn test_wizard_spark_uses_mana() {
        let mut state = fixtures::wizard_state();
        state.enemies = vec![fixtures::bandit()];
        let mut dice = ScriptedDice::sequence([12, 2]);
        let result = player_action(&mut state, &PlayerAction::Special { target: None }, &mut dice);
        assert!(result.starts_with("You channel Spark. Hit"));
        assert_eq!(state.player.mana, state.player.max_mana - 2);
        assert_eq!(state.enemies[0].hp, 10);
    }

    #[test]
    fn test_wizard_out_of_mana() {
        let mut state = fixtures::wizard_state();
        state.enemies = vec![fixtures::bandit()];
        state.player.mana = 1;
        let result = player_action(
            &mut state,
            &PlayerAction::Special { target: None },
            &mut ScriptedDice::constant(10),
        );
        assert_eq!(result, "You are out of mana.");
        assert_eq!(state.player.mana, 1);
    }

    #[test]
    fn test_cast_unknown_spell() {
        let mut state = fixtures::wizard_state();
        state.enemies = vec![fixtures::bandit()];
        let action = PlayerAction::Cast {
            spell: "Sleep".to_string(),
            target: None,
        };
        let result = player_action(&mut state, &action, &mut ScriptedDice::constant(10));
        assert_eq!(result, "You don't know that spell.");
    }

    #[test]
    fn test_sleep_skips_turns_until_damaged() {
        let mut state = fixtures::wizard_state();
        state.player.learned_spells.push("Sleep".to_string());
        state.enemies = vec![fixtures::bandit()];
        let action = PlayerAction::Cast {
            spell: "sleep".to_string(),
            target: Some("1".to_string()),
        };
        let result = player_action(&mut state, &action, &mut ScriptedDice::constant(10));
        assert!(result.contains("slumber"));
        assert!(state.enemies[0].asleep);
        assert_eq!(state.player.mana, state.player.max_mana - 2);

        let results = enemy_actions(&mut state, &mut ScriptedDice::constant(20));
        assert_eq!(results, vec!["Watchtower Bandit is fast asleep."]);

        let mut dice = ScriptedDice::sequence([20, 3]);
        player_action(&mut state, &attack(), &mut dice);
        assert!(!state.enemies[0].asleep);
    }

    #[test]
    fn test_shield_raises_ac_for_one_round() {
        let mut state = fixtures::wizard_state();
        state.player.learned_spells.push("Shield".to_string());
        state.enemies = vec![fixtures::bandit()];
        let action = PlayerAction::Cast {
            spell: "shield".to_string(),
            target: None,
        };
        player_action(&mut state, &action, &mut ScriptedDice::constant(1));
        assert!(state.player_shield_active);

        // Bandit +3 vs AC 12 + 5.
        let results = enemy_actions(&mut state, &mut ScriptedDice::constant(13));
        assert!(results[0].contains("misses"));
        clear_round_buffs(&mut state);
        assert!(!state.player_shield_active);
    }

    #[test]
    fn test_cure_wounds_adds_wisdom() {
        let mut state = fixtures::cleric_state();
        state.player.hp = 3;
        let action = PlayerAction::Cast {
            spell: "Cure Wounds".to_string(),
            target: Some("me".to_string()),
        };
        let result = player_action(&mut state, &action, &mut ScriptedDice::constant(4));
        assert_eq!(result, "You cast Cure Wounds on Sister, healing 7 (4+3).");
        assert_eq!(state.player.hp, 10);
    }

    #[test]
    fn test_bless_helps_companion_this_round() {
        let mut state = fixtures::cleric_state();
        state.player.learned_spells.push("Bless".to_string());
        state.enemies = vec![fixtures::bandit()];
        let action = PlayerAction::Cast {
            spell: "bless".to_string(),
            target: None,
        };
        player_action(&mut state, &action, &mut ScriptedDice::constant(1));
        assert!(state.companion_bless_active);

        // Mara +2 with d20 9 and d4 2 reaches AC 13.
        let mut dice = ScriptedDice::sequence([9, 2, 3]);
        let result = companion_action(&mut state, &mut dice);
        assert_eq!(
            result,
            "Mara strikes Watchtower Bandit (roll 9 -> 13) for 3 (3) damage."
        );
        clear_round_buffs(&mut state);
        assert!(!state.companion_bless_active);
        assert!(state.player_bless_active);
    }

    #[test]
    fn test_caster_companion_casts_spell() {
        let mut state = fixtures::watchtower_state();
        state.companions = vec![crate::rules::create_companion("lost_crypt", Some("eldrin")).unwrap()];
        state.enemies = vec![fixtures::bandit()];
        let mut dice = ScriptedDice::sequence([12, 3]);
        let result = companion_action(&mut state, &mut dice);
        assert!(result.contains("Magic Missile"));
        assert_eq!(state.companions[0].mana, 4);
        assert_eq!(state.enemies[0].hp, 9);
    }

    #[test]
    fn test_wounded_companion_defends() {
        let mut state = fixtures::watchtower_state();
        state.enemies = vec![fixtures::bandit()];
        state.companions[0].hp = 3;
        let result = companion_action(&mut state, &mut ScriptedDice::constant(20));
        assert_eq!(result, "Mara keeps their distance and braces (+2 AC).");
        assert!(state.companion_defending);

        state.companions[0].hp = 0;
        let result = companion_action(&mut state, &mut ScriptedDice::constant(20));
        assert_eq!(result, "Mara is down and cannot act.");
    }

    #[test]
    fn test_focus_weakest_picks_companion() {
        let mut state = fixtures::watchtower_state();
        let mut rat = fixtures::bandit();
        rat.name = "Big Rats".to_string();
        state.enemies = vec![rat];
        state.companions[0].hp = 5;
        let results = enemy_actions(&mut state, &mut ScriptedDice::sequence([20, 2]));
        assert!(results[0].starts_with("Big Rats lashes at Mara"));
        assert_eq!(state.companions[0].hp, 3);
    }

    #[test]
    fn test_end_combat_enemy_down() {
        let mut state = fixtures::watchtower_state();
        state.in_combat = true;
        state.room_id = "barracks".to_string();
        let mut bandit = fixtures::bandit();
        bandit.hp = 0;
        state.enemies = vec![bandit];

        let result = end_combat_if_needed(&mut state).unwrap();
        assert!(result.starts_with("The foes fall. Corpses: 1. Watchtower Bandit."));
        assert!(result.contains("XP +25."));
        assert!(!state.in_combat);
        assert!(state.flags.is_defeated("barracks"));
        assert!(state.enemies.is_empty());
        assert_eq!(state.player.xp, 25);
        assert_eq!(state.flags.corpses["barracks"][0].id, 1);
    }

    #[test]
    fn test_end_combat_player_down() {
        let mut state = fixtures::watchtower_state();
        state.in_combat = true;
        state.enemies = vec![fixtures::bandit()];
        state.player.hp = 0;
        let result = end_combat_if_needed(&mut state).unwrap();
        assert_eq!(
            result,
            "You collapse from your wounds. The Ruined Watchtower claims another victim."
        );
        assert!(state.game_over);
    }

    #[test]
    fn test_end_combat_nothing_to_do() {
        let mut state = fixtures::watchtower_state();
        assert_eq!(end_combat_if_needed(&mut state), None);
        state.enemies = vec![fixtures::bandit()];
        assert_eq!(end_combat_if_needed(&mut state), None);
    }
}
