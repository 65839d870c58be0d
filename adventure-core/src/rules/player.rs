//! Player creation and mana bookkeeping.

use crate::profiles::{CharacterClass, Race, Stats};
use crate::state::{Character, GameState};

/// Mana pool for a caster: `2 + 2 * max(0, casting stat)`.
pub fn caster_mana(stats: &Stats, class: CharacterClass) -> i32 {
    let modifier = stats.get(class.casting_stat()).max(0);
    2 + modifier * 2
}

/// Build a level 1 character. Racial modifiers are applied to `stats` first.
pub fn create_player(name: &str, class: CharacterClass, stats: &Stats, race: Race) -> Character {
    let profile = class.profile();
    let stats = race.apply_mods(stats);
    let hp = profile.base_hp + stats.constitution.max(0);
    let mana = if class.is_caster() {
        caster_mana(&stats, class)
    } else {
        0
    };

    Character {
        name: name.to_string(),
        race,
        class,
        stats,
        hp,
        max_hp: hp,
        ac: profile.base_ac,
        base_ac: profile.base_ac,
        mana,
        max_mana: mana,
        attack_bonus: profile.attack_bonus,
        damage: profile.damage,
        gold: 0,
        xp: 0,
        level: 1,
        learned_spells: profile.spells.iter().map(|s| s.to_string()).collect(),
    }
}

/// Give casters with no pool their formula mana; otherwise clamp to max.
pub fn ensure_caster_mana(state: &mut GameState) {
    let player = &mut state.player;
    if !player.is_caster() {
        return;
    }
    if player.max_mana <= 0 {
        let max_mana = caster_mana(&player.stats, player.class);
        player.max_mana = max_mana;
        player.mana = max_mana;
    } else {
        player.mana = player.mana.min(player.max_mana);
    }
}
