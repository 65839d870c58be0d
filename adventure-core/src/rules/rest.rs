//! Resting and mana regeneration.

use crate::state::GameState;
use tracing::warn;

/// Picks one spell from a level-up choice.
///
/// The terminal front end prompts the player; tests and headless play use
/// [`FirstChoice`] or a closure.
pub trait SpellChooser {
    fn choose(&mut self, level: u32, options: &[String]) -> String;
}

impl<F> SpellChooser for F
where
    F: FnMut(u32, &[String]) -> String,
{
    fn choose(&mut self, level: u32, options: &[String]) -> String {
        self(level, options)
    }
}

/// Always takes the first option.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstChoice;

impl SpellChooser for FirstChoice {
    fn choose(&mut self, _level: u32, options: &[String]) -> String {
        options.first().cloned().unwrap_or_default()
    }
}

fn resolve_pending_choices(state: &mut GameState, chooser: &mut dyn SpellChooser) -> Vec<String> {
    let mut messages = Vec::new();
    for choice in std::mem::take(&mut state.pending_level_choices) {
        let Some(first) = choice.choices.first() else {
            continue;
        };
        let picked = chooser.choose(choice.level, &choice.choices);
        // Only accept one of the offered names; otherwise take the first.
        let spell = match choice
            .choices
            .iter()
            .find(|c| c.eq_ignore_ascii_case(picked.trim()))
        {
            Some(spell) => spell,
            None => {
                warn!(level = choice.level, picked = %picked, "spell choice not offered");
                first
            }
        };
        if !state.player.knows_spell(spell) {
            state.player.learned_spells.push(spell.clone());
        }
        messages.push(format!("You learn {spell}."));
    }
    messages
}

/// Regenerate player mana. Returns the amount gained.
pub fn regen_mana(state: &mut GameState, amount: i32) -> i32 {
    let player = &mut state.player;
    if !player.is_caster() || player.max_mana <= 0 {
        return 0;
    }
    let before = player.mana;
    player.mana = player.max_mana.min(player.mana + amount);
    player.mana - before
}

/// Regenerate mana for every caster companion. Returns the total gained.
pub fn regen_companion_mana(state: &mut GameState, amount: i32) -> i32 {
    state
        .companions
        .iter_mut()
        .filter(|c| c.is_caster())
        .map(|companion| {
            let before = companion.mana;
            companion.mana = companion.max_mana.min(companion.mana + amount);
            companion.mana - before
        })
        .sum()
}

pub fn reset_rest_streak(state: &mut GameState) {
    state.rest_streak = 0;
}

/// One rest. Every second consecutive rest heals 1 HP to each wounded ally.
pub fn apply_rest(state: &mut GameState, chooser: &mut dyn SpellChooser) -> String {
    let mut parts = resolve_pending_choices(state, chooser);

    let mana_gained = regen_mana(state, 1) + regen_companion_mana(state, 1);
    let mut hp_gained = 0;
    state.rest_streak += 1;
    if state.rest_streak >= 2 {
        let player = &mut state.player;
        if player.hp < player.max_hp {
            player.hp += 1;
            hp_gained += 1;
        }
        for companion in &mut state.companions {
            if companion.hp < companion.max_hp {
                companion.hp += 1;
                hp_gained += 1;
            }
        }
        state.rest_streak = 0;
    }

    parts.push("You rest and regain your focus.".to_string());
    if mana_gained > 0 {
        parts.push(format!("Mana +{mana_gained}."));
    }
    if hp_gained > 0 {
        parts.push(format!("HP +{hp_gained}."));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SpellChoice;
    use crate::testing::fixtures;

    #[test]
    fn test_mana_regen_caps_at_max() {
        let mut state = fixtures::wizard_state();
        state.player.mana = state.player.max_mana - 1;
        assert_eq!(regen_mana(&mut state, 2), 1);
        assert_eq!(state.player.mana, state.player.max_mana);
    }

    #[test]
    fn test_fighter_has_no_mana_to_regen() {
        let mut state = fixtures::watchtower_state();
        assert_eq!(regen_mana(&mut state, 1), 0);
        assert_eq!(regen_companion_mana(&mut state, 1), 0);
    }

    #[test]
    fn test_rest_heals_every_two_consecutive() {
        let mut state = fixtures::wizard_state();
        let max = state.player.max_hp;
        state.player.hp = max - 1;

        let first = apply_rest(&mut state, &mut FirstChoice);
        assert!(first.to_lowercase().contains("rest"));
        assert_eq!(state.player.hp, max - 1);
        assert_eq!(state.rest_streak, 1);

        let second = apply_rest(&mut state, &mut FirstChoice);
        assert!(second.contains("HP +1."));
        assert_eq!(state.player.hp, max);
        assert_eq!(state.rest_streak, 0);
    }

    #[test]
    fn test_rest_heals_companion_every_two_consecutive() {
        let mut state = fixtures::watchtower_state();
        state.companions[0].hp = state.companions[0].max_hp - 1;
        apply_rest(&mut state, &mut FirstChoice);
        assert_eq!(state.companions[0].hp, state.companions[0].max_hp - 1);
        let result = apply_rest(&mut state, &mut FirstChoice);
        assert!(result.contains("HP +1"));
        assert_eq!(state.companions[0].hp, state.companions[0].max_hp);
    }

    #[test]
    fn test_rest_resolves_pending_spell_choice() {
        let mut state = fixtures::wizard_state();
        state.player.level = 2;
        state.pending_level_choices = vec![SpellChoice {
            level: 2,
            choices: vec!["Magic Missile".to_string(), "Shield".to_string()],
        }];
        let mut chooser = |_level: u32, _options: &[String]| "Magic Missile".to_string();
        let result = apply_rest(&mut state, &mut chooser);
        assert!(state.player.knows_spell("Magic Missile"));
        assert!(state.pending_level_choices.is_empty());
        assert!(result.starts_with("You learn Magic Missile."));
    }

    #[test]
    fn test_unoffered_spell_choice_falls_back_to_first() {
        let mut state = fixtures::wizard_state();
        state.player.level = 2;
        state.pending_level_choices = vec![SpellChoice {
            level: 2,
            choices: vec!["Shield".to_string(), "Sleep".to_string()],
        }];
        let mut chooser = |_level: u32, _options: &[String]| "Fireball".to_string();
        let result = apply_rest(&mut state, &mut chooser);
        assert!(state.player.knows_spell("Shield"));
        assert!(!state.player.knows_spell("Fireball"));
        assert!(state.pending_level_choices.is_empty());
        assert!(result.starts_with("You learn Shield."));
    }

    #[test]
    fn test_rest_streak_reset() {
        let mut state = fixtures::wizard_state();
        apply_rest(&mut state, &mut FirstChoice);
        assert_eq!(state.rest_streak, 1);
        reset_rest_streak(&mut state);
        assert_eq!(state.rest_streak, 0);
    }
}
