//! Spell definitions and level-up spell choices.

use crate::dice::DiceExpression;
use crate::profiles::CharacterClass;
use std::fmt;

/// Every spell the engine knows how to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Spell {
    Spark,
    MagicMissile,
    Shield,
    Sleep,
    CureWounds,
    Bless,
}

/// What a spell does when it resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpellEffect {
    /// Attack roll against an enemy, then damage.
    Damage(DiceExpression),
    /// Heal an ally; the caster's WIS is added.
    Heal(DiceExpression),
    /// Bonus to the caster's AC until the round ends.
    Ward(i32),
    /// Target enemy skips turns until it takes damage.
    Sleep,
    /// Allies add a d4 to attack rolls.
    Bless,
}

impl Spell {
    pub const ALL: [Spell; 6] = [
        Spell::Spark,
        Spell::MagicMissile,
        Spell::Shield,
        Spell::Sleep,
        Spell::CureWounds,
        Spell::Bless,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Spell::Spark => "Spark",
            Spell::MagicMissile => "Magic Missile",
            Spell::Shield => "Shield",
            Spell::Sleep => "Sleep",
            Spell::CureWounds => "Cure Wounds",
            Spell::Bless => "Bless",
        }
    }

    pub fn mana_cost(&self) -> i32 {
        match self {
            Spell::Shield | Spell::Bless => 1,
            _ => 2,
        }
    }

    pub fn effect(&self) -> SpellEffect {
        match self {
            Spell::Spark => SpellEffect::Damage(DiceExpression::new(1, 4, 0)),
            Spell::MagicMissile => SpellEffect::Damage(DiceExpression::new(1, 6, 0)),
            Spell::Shield => SpellEffect::Ward(5),
            Spell::Sleep => SpellEffect::Sleep,
            Spell::CureWounds => SpellEffect::Heal(DiceExpression::new(1, 8, 0)),
            Spell::Bless => SpellEffect::Bless,
        }
    }

    /// Spell with exactly this name, ignoring case.
    pub fn from_name(name: &str) -> Option<Spell> {
        let name = name.trim();
        Spell::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }

    /// Split `"magic missile 2"` into the spell and the trailing text.
    ///
    /// Names are matched as whole words at the start of `text`.
    pub fn split_prefix(text: &str) -> Option<(Spell, &str)> {
        let text = text.trim_start();
        Spell::ALL.into_iter().find_map(|spell| {
            let name = spell.name();
            let head = text.get(..name.len())?;
            if !head.eq_ignore_ascii_case(name) {
                return None;
            }
            let rest = &text[name.len()..];
            if rest.is_empty() || rest.starts_with(' ') {
                Some((spell, rest.trim()))
            } else {
                None
            }
        })
    }
}

impl fmt::Display for Spell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Spells a class may learn beyond its starting list.
pub fn learnable_spells(class: CharacterClass) -> &'static [Spell] {
    match class {
        CharacterClass::Wizard => &[Spell::MagicMissile, Spell::Shield, Spell::Sleep],
        CharacterClass::Cleric => &[Spell::Bless],
        CharacterClass::Fighter | CharacterClass::Rogue => &[],
    }
}

/// Unlearned spells offered at `level`. Choices come at levels 2, 4, 6, ...
pub fn spell_choices_for_level(
    class: CharacterClass,
    level: u32,
    learned: &[String],
) -> Vec<String> {
    if level < 2 || level % 2 != 0 {
        return Vec::new();
    }
    learnable_spells(class)
        .iter()
        .filter(|spell| !learned.iter().any(|l| l.eq_ignore_ascii_case(spell.name())))
        .map(|spell| spell.name().to_string())
        .collect()
}

/// Strongest damage spell among `learned`.
pub fn best_damage_spell(learned: &[String]) -> Option<Spell> {
    [Spell::MagicMissile, Spell::Spark]
        .into_iter()
        .find(|spell| learned.iter().any(|l| l.eq_ignore_ascii_case(spell.name())))
}
