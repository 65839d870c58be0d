//! Experience and leveling.

use super::spells::spell_choices_for_level;
use crate::state::{GameState, SpellChoice};
use tracing::info;

/// XP needed to reach each level; index 0 is level 1.
pub const XP_TABLE: [u32; 10] = [0, 100, 250, 500, 1000, 2000, 3500, 5000, 7000, 10000];
pub const MAX_LEVEL: u32 = XP_TABLE.len() as u32;

/// XP required to reach `level`. Levels past the table cost the last entry.
pub fn xp_for_level(level: u32) -> u32 {
    if level == 0 {
        return 0;
    }
    let idx = (level as usize - 1).min(XP_TABLE.len() - 1);
    XP_TABLE[idx]
}

pub fn level_from_xp(xp: u32) -> u32 {
    (1..=MAX_LEVEL)
        .rev()
        .find(|level| xp >= xp_for_level(*level))
        .unwrap_or(1)
}

/// Add XP and apply every level gained. Returns one notice per level.
pub fn grant_xp(state: &mut GameState, amount: u32) -> Vec<String> {
    if amount == 0 {
        return Vec::new();
    }
    state.player.xp += amount;
    let mut messages = Vec::new();
    while state.player.level < MAX_LEVEL && state.player.xp >= xp_for_level(state.player.level + 1)
    {
        messages.push(apply_level_up(state));
    }
    messages
}

fn apply_level_up(state: &mut GameState) -> String {
    let player = &mut state.player;
    player.level += 1;
    let hp_per_level = player.class.profile().hp_per_level;
    player.max_hp += hp_per_level;
    player.hp += hp_per_level;
    if player.level % 2 == 0 {
        player.attack_bonus += 1;
    }
    if player.is_caster() {
        player.max_mana += 2;
        player.mana = player.max_mana;
    }

    let choices = spell_choices_for_level(player.class, player.level, &player.learned_spells);
    let level = player.level;
    info!(name = %player.name, level, "level up");
    let message = format!("Level up! {} is now level {}.", player.name, level);
    if !choices.is_empty() {
        state.pending_level_choices.push(SpellChoice { level, choices });
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_xp_for_level() {
        assert_eq!(xp_for_level(1), 0);
        assert_eq!(xp_for_level(2), 100);
        assert_eq!(xp_for_level(42), 10000);
        assert_eq!(level_from_xp(99), 1);
        assert_eq!(level_from_xp(100), 2);
        assert_eq!(level_from_xp(50_000), 10);
    }

    #[test]
    fn test_grant_xp_level_up() {
        let mut state = fixtures::watchtower_state();
        let hp = state.player.max_hp;
        let attack = state.player.attack_bonus;
        let msgs = grant_xp(&mut state, 100);
        assert_eq!(state.player.xp, 100);
        assert_eq!(state.player.level, 2);
        assert!(msgs[0].contains("Level up"));
        assert_eq!(state.player.max_hp, hp + 2);
        assert_eq!(state.player.attack_bonus, attack + 1);
        assert!(state.pending_level_choices.is_empty());
    }

    #[test]
    fn test_multiple_levels_at_once() {
        let mut state = fixtures::watchtower_state();
        let msgs = grant_xp(&mut state, 600);
        assert_eq!(state.player.level, 4);
        assert_eq!(msgs.len(), 3);
    }

    #[test]
    fn test_level_capped() {
        let mut state = fixtures::watchtower_state();
        grant_xp(&mut state, 1_000_000);
        assert_eq!(state.player.level, MAX_LEVEL);
        assert!(grant_xp(&mut state, 10).is_empty());
    }

    #[test]
    fn test_wizard_level_up_adds_pending_spell_choice() {
        let mut state = fixtures::wizard_state();
        let mana = state.player.max_mana;
        grant_xp(&mut state, 100);
        assert_eq!(state.player.level, 2);
        assert_eq!(state.player.max_mana, mana + 2);
        assert_eq!(state.player.mana, state.player.max_mana);
        assert_eq!(state.pending_level_choices.len(), 1);
        assert!(state.pending_level_choices[0]
            .choices
            .contains(&"Magic Missile".to_string()));
    }
}
