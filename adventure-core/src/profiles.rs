//! Class, race, mob and companion profiles.
//!
//! Profiles are static data. Classes and races are closed enums with a
//! `profile()` lookup, mirroring how the rules treat them: a character's
//! class decides its hit points, armor, damage and spell list, while a race
//! only nudges stats.

use crate::dice::DiceExpression;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest allocatable value for a stat.
pub const STAT_MIN: i32 = 0;
/// Highest value a stat may reach, before or after racial modifiers.
pub const STAT_MAX: i32 = 4;
/// Points to spend when creating a character.
pub const STAT_POINTS: i32 = 12;

/// The six ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stat {
    #[serde(rename = "STR")]
    Str,
    #[serde(rename = "DEX")]
    Dex,
    #[serde(rename = "CON")]
    Con,
    #[serde(rename = "INT")]
    Int,
    #[serde(rename = "WIS")]
    Wis,
    #[serde(rename = "CHA")]
    Cha,
}

impl Stat {
    pub const ALL: [Stat; 6] = [
        Stat::Str,
        Stat::Dex,
        Stat::Con,
        Stat::Int,
        Stat::Wis,
        Stat::Cha,
    ];

    pub fn abbreviation(&self) -> &'static str {
        match self {
            Stat::Str => "STR",
            Stat::Dex => "DEX",
            Stat::Con => "CON",
            Stat::Int => "INT",
            Stat::Wis => "WIS",
            Stat::Cha => "CHA",
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

impl FromStr for Stat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stat::ALL
            .into_iter()
            .find(|stat| stat.abbreviation().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown stat: {s}"))
    }
}

/// Stat block. Missing fields in older saves read as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    #[serde(rename = "STR", default)]
    pub strength: i32,
    #[serde(rename = "DEX", default)]
    pub dexterity: i32,
    #[serde(rename = "CON", default)]
    pub constitution: i32,
    #[serde(rename = "INT", default)]
    pub intelligence: i32,
    #[serde(rename = "WIS", default)]
    pub wisdom: i32,
    #[serde(rename = "CHA", default)]
    pub charisma: i32,
}

impl Stats {
    pub fn get(&self, stat: Stat) -> i32 {
        match stat {
            Stat::Str => self.strength,
            Stat::Dex => self.dexterity,
            Stat::Con => self.constitution,
            Stat::Int => self.intelligence,
            Stat::Wis => self.wisdom,
            Stat::Cha => self.charisma,
        }
    }

    pub fn set(&mut self, stat: Stat, value: i32) {
        let slot = match stat {
            Stat::Str => &mut self.strength,
            Stat::Dex => &mut self.dexterity,
            Stat::Con => &mut self.constitution,
            Stat::Int => &mut self.intelligence,
            Stat::Wis => &mut self.wisdom,
            Stat::Cha => &mut self.charisma,
        };
        *slot = value;
    }

    /// Build from `(stat, value)` pairs; unnamed stats are 0.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Stat, i32)>) -> Self {
        let mut stats = Stats::default();
        for (stat, value) in pairs {
            stats.set(stat, value);
        }
        stats
    }

    pub fn total(&self) -> i32 {
        Stat::ALL.iter().map(|s| self.get(*s)).sum()
    }

    /// `STR:2, DEX:1, ...`
    pub fn summary(&self) -> String {
        Stat::ALL
            .iter()
            .map(|s| format!("{}:{}", s, self.get(*s)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Combat role of a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Melee,
    Caster,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Role::Melee => "melee",
            Role::Caster => "caster",
        }
    }
}

/// Static data for a class.
#[derive(Debug, Clone)]
pub struct ClassProfile {
    pub name: &'static str,
    pub role: Role,
    pub base_hp: i32,
    pub base_ac: i32,
    pub attack_bonus: i32,
    pub damage: DiceExpression,
    pub spells: &'static [&'static str],
    pub description: &'static str,
    pub hp_per_level: i32,
}

/// Playable classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterClass {
    Fighter,
    Rogue,
    Wizard,
    Cleric,
}

impl CharacterClass {
    pub const ALL: [CharacterClass; 4] = [
        CharacterClass::Fighter,
        CharacterClass::Rogue,
        CharacterClass::Wizard,
        CharacterClass::Cleric,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CharacterClass::Fighter => "Fighter",
            CharacterClass::Rogue => "Rogue",
            CharacterClass::Wizard => "Wizard",
            CharacterClass::Cleric => "Cleric",
        }
    }

    pub fn profile(&self) -> ClassProfile {
        match self {
            CharacterClass::Fighter => ClassProfile {
                name: "Fighter",
                role: Role::Melee,
                base_hp: 14,
                base_ac: 15,
                attack_bonus: 3,
                damage: DiceExpression::new(1, 8, 1),
                spells: &[],
                description: "Hardy frontline combatant.",
                hp_per_level: 2,
            },
            CharacterClass::Rogue => ClassProfile {
                name: "Rogue",
                role: Role::Melee,
                base_hp: 10,
                base_ac: 14,
                attack_bonus: 2,
                damage: DiceExpression::new(1, 6, 1),
                spells: &[],
                description: "Agile skirmisher with precision strikes.",
                hp_per_level: 1,
            },
            CharacterClass::Wizard => ClassProfile {
                name: "Wizard",
                role: Role::Caster,
                base_hp: 8,
                base_ac: 12,
                attack_bonus: 1,
                damage: DiceExpression::new(1, 4, 1),
                spells: &["Spark"],
                description: "Arcane caster with limited stamina.",
                hp_per_level: 1,
            },
            CharacterClass::Cleric => ClassProfile {
                name: "Cleric",
                role: Role::Caster,
                base_hp: 12,
                base_ac: 14,
                attack_bonus: 2,
                damage: DiceExpression::new(1, 6, 1),
                spells: &["Cure Wounds"],
                description: "Divine healer and support caster.",
                hp_per_level: 1,
            },
        }
    }

    pub fn is_caster(&self) -> bool {
        self.profile().role == Role::Caster
    }

    pub fn is_melee(&self) -> bool {
        self.profile().role == Role::Melee
    }

    /// Stat that feeds this class's mana pool.
    pub fn casting_stat(&self) -> Stat {
        match self {
            CharacterClass::Cleric => Stat::Wis,
            _ => Stat::Int,
        }
    }
}

impl fmt::Display for CharacterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CharacterClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CharacterClass::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown class: {s}"))
    }
}

/// Static data for a race.
#[derive(Debug, Clone)]
pub struct RaceProfile {
    pub name: &'static str,
    pub description: &'static str,
    pub stat_mods: &'static [(Stat, i32)],
    pub abilities: &'static [&'static str],
    pub proficiencies: &'static [&'static str],
}

/// Playable races.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Race {
    #[default]
    Human,
    Elf,
    Dwarf,
    Halfling,
}

impl Race {
    pub const ALL: [Race; 4] = [Race::Human, Race::Elf, Race::Dwarf, Race::Halfling];

    pub fn name(&self) -> &'static str {
        self.profile().name
    }

    pub fn profile(&self) -> RaceProfile {
        match self {
            Race::Human => RaceProfile {
                name: "Human",
                description: "Versatile and adaptable.",
                stat_mods: &[],
                abilities: &[],
                proficiencies: &[],
            },
            Race::Elf => RaceProfile {
                name: "Elf",
                description: "Graceful and perceptive, with keen senses.",
                stat_mods: &[(Stat::Dex, 1), (Stat::Int, 1)],
                abilities: &["darkvision", "keen_senses"],
                proficiencies: &["bows"],
            },
            Race::Dwarf => RaceProfile {
                name: "Dwarf",
                description: "Sturdy and resilient, at home underground.",
                stat_mods: &[(Stat::Str, 1), (Stat::Con, 1), (Stat::Cha, -1)],
                abilities: &["darkvision", "stonecunning"],
                proficiencies: &["axes"],
            },
            Race::Halfling => RaceProfile {
                name: "Halfling",
                description: "Small and nimble, quick to avoid danger.",
                stat_mods: &[(Stat::Dex, 1), (Stat::Str, -1)],
                abilities: &["lucky", "nimble"],
                proficiencies: &["stealth"],
            },
        }
    }

    /// Apply racial modifiers, clamping each stat to the allowed range.
    pub fn apply_mods(&self, stats: &Stats) -> Stats {
        let mut result = *stats;
        for (stat, delta) in self.profile().stat_mods {
            let value = (result.get(*stat) + delta).clamp(STAT_MIN, STAT_MAX);
            result.set(*stat, value);
        }
        result
    }

    /// `DEX+1, INT+1` or `none`.
    pub fn mods_summary(&self) -> String {
        let mods = self.profile().stat_mods;
        if mods.is_empty() {
            return "none".to_string();
        }
        mods.iter()
            .map(|(stat, delta)| format!("{stat}{delta:+}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Race {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Race {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Race::ALL
            .into_iter()
            .find(|r| r.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown race: {s}"))
    }
}

/// How an enemy chooses whom to attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MobAi {
    /// Lowest current HP among the living party; ties go to the player.
    #[default]
    FocusWeakest,
    FocusPlayer,
    FocusCompanion,
}

/// Loot carried by a mob.
#[derive(Debug, Clone, Default)]
pub struct LootTable {
    pub gold: Option<DiceExpression>,
    /// Item ids; one is picked uniformly when non-empty.
    pub items: Vec<String>,
}

/// Hit points of a mob: fixed, or rolled with a floor.
#[derive(Debug, Clone)]
pub enum MobHp {
    Fixed(i32),
    Rolled { expr: DiceExpression, min: i32 },
}

/// Template for spawning enemies.
#[derive(Debug, Clone)]
pub struct MobProfile {
    pub name: String,
    pub hp: MobHp,
    /// How many enemies a single encounter spawns.
    pub count: u32,
    pub ac: i32,
    pub attack_bonus: i32,
    pub damage: DiceExpression,
    pub loot: LootTable,
    pub ai: MobAi,
    pub xp: u32,
}

/// Temperament of a companion. Only descriptive at present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompanionAi {
    #[default]
    Cautious,
    Aggressive,
    FocusWeakest,
}

/// Data-driven companion definition.
#[derive(Debug, Clone)]
pub struct CompanionProfile {
    pub id: String,
    pub name: String,
    pub hp: i32,
    pub max_hp: i32,
    pub ac: i32,
    pub attack_bonus: i32,
    pub damage: DiceExpression,
    pub ai: CompanionAi,
    /// Defends instead of attacking at or below this HP.
    pub defend_hp_threshold: i32,
    pub mana: i32,
    pub max_mana: i32,
    pub spells: Vec<String>,
}

impl CompanionProfile {
    /// Melee companion with the default defend threshold.
    pub fn melee(
        id: &str,
        name: &str,
        hp: i32,
        ac: i32,
        attack_bonus: i32,
        damage: DiceExpression,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            hp,
            max_hp: hp,
            ac,
            attack_bonus,
            damage,
            ai: CompanionAi::Cautious,
            defend_hp_threshold: 3,
            mana: 0,
            max_mana: 0,
            spells: Vec::new(),
        }
    }

    /// Give the companion a mana pool and spell list.
    pub fn with_spells(mut self, mana: i32, spells: &[&str]) -> Self {
        self.mana = mana;
        self.max_mana = mana;
        self.spells = spells.iter().map(|s| s.to_string()).collect();
        self
    }
}
