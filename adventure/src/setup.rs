//! New-game setup: campaign, character and companion.

use crate::prompt::Console;
use adventure_core::content::{self, Campaign, EquipSlot, Item};
use adventure_core::profiles::{STAT_MAX, STAT_MIN, STAT_POINTS};
use adventure_core::rules::create_player;
use adventure_core::{
    new_game_state, starting_kit, Character, CharacterClass, GameState, Race, Roller, Roster,
    Stat, Stats,
};
use anyhow::{anyhow, Context};
use std::collections::BTreeMap;
use std::io::{BufRead, Write};

const CREATE_NEW: &str = "Create new";
const DEFAULT_NAME: &str = "Adventurer";

type Loadout = (Character, Vec<Item>, BTreeMap<EquipSlot, Item>);

fn names<T: Copy>(values: &[T], name: impl Fn(T) -> &'static str) -> Vec<String> {
    values.iter().map(|v| name(*v).to_string()).collect()
}

/// Walk the player through a new game. `None` when input ends.
pub async fn new_game<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    roster: &Roster,
    preset_campaign: Option<&str>,
    roller: &mut dyn Roller,
) -> anyhow::Result<Option<GameState>> {
    console.say("Welcome to the Solo Adventure")?;
    let Some(campaign) = choose_campaign(console, preset_campaign)? else {
        return Ok(None);
    };
    console.say(&format!("Campaign selected: {}", campaign.name))?;

    let Some((player, inventory, equipment)) = choose_character(console, roster, campaign).await?
    else {
        return Ok(None);
    };
    let Some(companion_id) = choose_companion(console, campaign)? else {
        return Ok(None);
    };

    let companion_ids: Vec<&str> = companion_id.iter().map(String::as_str).collect();
    let state = new_game_state(
        &campaign.id,
        player,
        inventory,
        equipment,
        &companion_ids,
        roller,
    )?;
    Ok(Some(state))
}

fn choose_campaign<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    preset: Option<&str>,
) -> anyhow::Result<Option<&'static Campaign>> {
    if let Some(id) = preset {
        return Ok(Some(content::campaign(id)?));
    }
    let campaigns = content::campaigns();
    match campaigns {
        [] => Err(anyhow!("No campaigns are registered.")),
        [only] => Ok(Some(only)),
        _ => {
            let options: Vec<String> = campaigns.iter().map(|c| c.name.clone()).collect();
            let Some(choice) = console.choose("Choose a campaign", &options)? else {
                return Ok(None);
            };
            Ok(campaigns.iter().find(|c| c.name == choice))
        }
    }
}

async fn choose_character<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    roster: &Roster,
    campaign: &Campaign,
) -> anyhow::Result<Option<Loadout>> {
    let saved = roster.list().await.unwrap_or_default();
    if !saved.is_empty() {
        let mut options = vec![CREATE_NEW.to_string()];
        options.extend(saved);
        let Some(choice) = console.choose("Load character or create new?", &options)? else {
            return Ok(None);
        };
        if choice != CREATE_NEW {
            let loaded = roster
                .load(&choice, &campaign.id)
                .await
                .with_context(|| format!("loading character '{choice}'"))?;
            return Ok(Some((loaded.character, loaded.inventory, loaded.equipment)));
        }
    }
    create_character(console, campaign)
}

fn create_character<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    campaign: &Campaign,
) -> anyhow::Result<Option<Loadout>> {
    let Some(name) = console.ask("Enter your character name: ")? else {
        return Ok(None);
    };
    let name = if name.is_empty() { DEFAULT_NAME.to_string() } else { name };

    let class_names = names(&CharacterClass::ALL, |c| c.name());
    let Some(class) = console.choose("Choose a class", &class_names)? else {
        return Ok(None);
    };
    let class = CharacterClass::ALL
        .into_iter()
        .find(|c| c.name() == class)
        .unwrap_or(CharacterClass::Fighter);

    let race_names = names(&Race::ALL, |r| r.name());
    let Some(race) = console.choose("Choose a race", &race_names)? else {
        return Ok(None);
    };
    let race = Race::ALL
        .into_iter()
        .find(|r| r.name() == race)
        .unwrap_or_default();

    let Some(stats) = allocate_stats(console)? else {
        return Ok(None);
    };
    let player = create_player(&name, class, &stats, race);
    Ok(Some((player, starting_kit(&campaign.id)?, BTreeMap::new())))
}

/// Spend exactly [`STAT_POINTS`] across the six stats, each within
/// `STAT_MIN..=STAT_MAX`. An empty answer keeps the current value; a bad
/// answer restarts the pass.
pub fn allocate_stats<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
) -> anyhow::Result<Option<Stats>> {
    let mut stats = Stats::default();
    loop {
        let mut remaining = STAT_POINTS - stats.total();
        console.say(&format!("Allocate stats. Remaining points: {remaining}"))?;
        let mut completed = true;
        for stat in Stat::ALL {
            let current = stats.get(stat);
            let prompt = format!("{stat} (current {current}, {STAT_MIN}-{STAT_MAX}): ");
            let Some(answer) = console.ask(&prompt)? else {
                return Ok(None);
            };
            let value = if answer.is_empty() {
                current
            } else if let Ok(value) = answer.parse::<i32>() {
                value
            } else {
                console.say("Enter a number.")?;
                completed = false;
                break;
            };
            if !(STAT_MIN..=STAT_MAX).contains(&value) {
                console.say(&format!("{stat} must be between {STAT_MIN} and {STAT_MAX}."))?;
                completed = false;
                break;
            }
            let delta = value - current;
            if delta > remaining {
                console.say("Not enough points remaining.")?;
                completed = false;
                break;
            }
            stats.set(stat, value);
            remaining -= delta;
        }
        if completed {
            if remaining == 0 {
                return Ok(Some(stats));
            }
            console.say("You must spend all points.")?;
        }
    }
}

/// Companion id to recruit; `Some(None)` takes the campaign default.
fn choose_companion<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    campaign: &Campaign,
) -> anyhow::Result<Option<Option<String>>> {
    let ids = campaign.companion_choices();
    if ids.len() <= 1 {
        return Ok(Some(ids.first().map(|id| id.to_string())));
    }
    let profiles: Vec<_> = ids.iter().filter_map(|id| campaign.companion(id)).collect();
    let options: Vec<String> = profiles.iter().map(|p| p.name.clone()).collect();
    let Some(choice) = console.choose("Choose your companion", &options)? else {
        return Ok(None);
    };
    Ok(Some(
        profiles
            .iter()
            .find(|p| p.name == choice)
            .map(|p| p.id.clone()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use adventure_core::testing::ScriptedDice;
    use std::io::Cursor;

    fn console(input: &str) -> Console<Cursor<Vec<u8>>, Vec<u8>> {
        Console::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_allocation_spends_all_points() {
        let mut c = console("4\n4\n4\n\n\n\n");
        let stats = allocate_stats(&mut c).unwrap().unwrap();
        assert_eq!(stats.strength, 4);
        assert_eq!(stats.constitution, 4);
        assert_eq!(stats.total(), STAT_POINTS);
    }

    #[test]
    fn test_allocation_restarts_on_bad_input() {
        // Out of range, then too few points, then a valid spread.
        let input = "5\n1\n1\n1\n1\n1\n1\n\n\n\n3\n3\n3\n";
        let mut c = console(input);
        let stats = allocate_stats(&mut c).unwrap().unwrap();
        assert_eq!(stats.intelligence, 3);
        assert_eq!(stats.wisdom, 3);
        assert_eq!(stats.charisma, 3);
        assert_eq!(stats.total(), STAT_POINTS);
    }

    #[test]
    fn test_allocation_eof() {
        let mut c = console("2\n");
        assert!(allocate_stats(&mut c).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_new_game_with_fresh_character() {
        let dir = tempfile::tempdir().unwrap();
        let roster = Roster::new(dir.path());
        let input = "Nim\nwizard\nelf\n2\n2\n2\n2\n2\n2\n";
        let mut c = console(input);
        let mut dice = ScriptedDice::constant(1);
        let state = new_game(&mut c, &roster, Some("ruined_watchtower"), &mut dice)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.player.name, "Nim");
        assert_eq!(state.player.class, CharacterClass::Wizard);
        assert_eq!(state.player.race, Race::Elf);
        assert_eq!(state.room_id, "courtyard");
        assert_eq!(state.companion().map(|c| c.name.as_str()), Some("Mara"));
        assert_eq!(state.inventory.len(), 5);
    }
}
