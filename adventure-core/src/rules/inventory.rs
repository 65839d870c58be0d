//! Inventory, equipment, consumables and loot.

use crate::content::{Campaign, EquipSlot, Item, ItemEffect, ItemKind};
use crate::dice::Roller;
use crate::state::GameState;
use thiserror::Error;

/// Refusals from inventory operations. `Display` is the text shown to the player.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InventoryError {
    #[error("Inventory is full.")]
    Full,

    #[error("Use what?")]
    EmptyQuery,

    #[error("You don't have that.")]
    NotFound,

    #[error("Be more specific or use an item number: {0}")]
    Ambiguous(String),

    #[error("That item number does not exist.")]
    NoSuchIndex,

    #[error("That item is not armor.")]
    NotArmor,

    #[error("That armor can't be equipped.")]
    NotEquippable,

    #[error("Inventory is full; unequip something first.")]
    NoRoomToSwap,

    #[error("Unknown equipment slot.")]
    UnknownSlot,

    #[error("That slot is already empty.")]
    SlotEmpty,

    #[error("{0} has no usable effect yet.")]
    NoEffect(String),
}

/// Items that count against the pack limit.
pub fn inventory_used(state: &GameState) -> usize {
    state
        .inventory
        .iter()
        .filter(|item| item.counts_toward_limit)
        .count()
}

pub fn can_add_item(state: &GameState, item: &Item) -> bool {
    !item.counts_toward_limit || inventory_used(state) < state.inventory_limit
}

pub fn add_item(state: &mut GameState, item: Item) -> Result<String, InventoryError> {
    if !can_add_item(state, &item) {
        return Err(InventoryError::Full);
    }
    let message = format!("Added {} to your pack.", item.name);
    state.inventory.push(item);
    Ok(message)
}

fn matches_query(item: &Item, query: &str) -> bool {
    let name = item.name.to_lowercase();
    if name.contains(query) || item.id.eq_ignore_ascii_case(query) {
        return true;
    }
    match item.kind {
        ItemKind::Potion => matches!(query, "potion" | "healing" | "heal"),
        ItemKind::Armor => matches!(query, "armor" | "armour"),
        _ => false,
    }
}

/// Index of the inventory item matching `query`, optionally of one kind.
///
/// Several matches are only ambiguous when they are different items.
pub fn find_item(
    state: &GameState,
    query: &str,
    kind: Option<ItemKind>,
) -> Result<usize, InventoryError> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Err(InventoryError::EmptyQuery);
    }
    let matches: Vec<usize> = state
        .inventory
        .iter()
        .enumerate()
        .filter(|(_, item)| kind.map_or(true, |k| item.kind == k))
        .filter(|(_, item)| matches_query(item, &query))
        .map(|(idx, _)| idx)
        .collect();

    let first = *matches.first().ok_or(InventoryError::NotFound)?;
    let first_id = &state.inventory[first].id;
    if matches.iter().any(|&idx| &state.inventory[idx].id != first_id) {
        let names = matches
            .iter()
            .map(|&idx| state.inventory[idx].name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(InventoryError::Ambiguous(names));
    }
    Ok(first)
}

/// Who receives a heal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealTarget {
    Player,
    Companion,
}

impl HealTarget {
    /// Resolve a target word. Unknown or missing words pick whichever of the
    /// player and living companion has the lower HP ratio.
    pub fn choose(state: &GameState, query: Option<&str>) -> HealTarget {
        let key = query.unwrap_or_default().trim().to_lowercase();
        if matches!(key.as_str(), "me" | "self" | "player" | "you") {
            return HealTarget::Player;
        }
        let Some(companion) = state.companion() else {
            return HealTarget::Player;
        };
        if matches!(key.as_str(), "companion" | "her" | "him" | "them")
            || (!key.is_empty() && companion.name.to_lowercase() == key)
        {
            return HealTarget::Companion;
        }

        let ratio = |hp: i32, max: i32| f64::from(hp) / f64::from(max.max(1));
        let player_ratio = ratio(state.player.hp, state.player.max_hp);
        if !companion.is_down() && ratio(companion.hp, companion.max_hp) < player_ratio {
            HealTarget::Companion
        } else {
            HealTarget::Player
        }
    }

    /// Heal up to max HP. Returns the target's name and HP restored.
    pub fn heal(self, state: &mut GameState, amount: i32) -> (String, i32) {
        let (name, hp, max_hp) = match (self, state.companions.first_mut()) {
            (HealTarget::Companion, Some(c)) => (c.name.clone(), &mut c.hp, c.max_hp),
            _ => {
                let p = &mut state.player;
                (p.name.clone(), &mut p.hp, p.max_hp)
            }
        };
        let before = *hp;
        *hp = max_hp.min(before + amount.max(0)).max(before);
        (name, *hp - before)
    }
}

/// Drink a potion, healing the chosen target.
pub fn use_item(
    state: &mut GameState,
    query: &str,
    target: Option<&str>,
    roller: &mut dyn Roller,
) -> Result<String, InventoryError> {
    let idx = find_item(state, query, Some(ItemKind::Potion))?;
    let dice = match &state.inventory[idx].effect {
        Some(ItemEffect::Heal { dice }) => dice.clone(),
        _ => return Err(InventoryError::NoEffect(state.inventory[idx].name.clone())),
    };

    let who = HealTarget::choose(state, target);
    let roll = dice.roll(roller);
    let (label, healed) = who.heal(state, roll.total);
    let item = state.inventory.remove(idx);
    Ok(format!(
        "You use {} on {}, healing {} ({}).",
        item.name, label, healed, roll.detail
    ))
}

pub fn equipment_ac_bonus(state: &GameState) -> i32 {
    state.equipment.values().map(Item::ac_bonus).sum()
}

pub fn sync_player_ac(state: &mut GameState) {
    state.player.ac = state.player.base_ac + equipment_ac_bonus(state);
}

/// Equip armor by name or 1-based inventory number.
pub fn equip_item(state: &mut GameState, query: &str) -> Result<String, InventoryError> {
    let query = query.trim();
    let idx = match query.parse::<usize>() {
        Ok(number) => {
            let idx = number
                .checked_sub(1)
                .filter(|idx| *idx < state.inventory.len())
                .ok_or(InventoryError::NoSuchIndex)?;
            if state.inventory[idx].kind != ItemKind::Armor {
                return Err(InventoryError::NotArmor);
            }
            idx
        }
        Err(_) => find_item(state, query, Some(ItemKind::Armor))?,
    };

    let slot = state.inventory[idx]
        .slot
        .ok_or(InventoryError::NotEquippable)?;
    if let Some(current) = state.equipment.get(&slot) {
        if !can_add_item(state, current) {
            return Err(InventoryError::NoRoomToSwap);
        }
    }

    let item = state.inventory.remove(idx);
    let message = format!("Equipped {} to {}.", item.name, slot);
    if let Some(previous) = state.equipment.insert(slot, item) {
        state.inventory.push(previous);
    }
    sync_player_ac(state);
    Ok(message)
}

pub fn unequip_item(state: &mut GameState, slot: &str) -> Result<String, InventoryError> {
    let slot: EquipSlot = slot.parse().map_err(|_| InventoryError::UnknownSlot)?;
    let current = state.equipment.get(&slot).ok_or(InventoryError::SlotEmpty)?;
    if !can_add_item(state, current) {
        return Err(InventoryError::Full);
    }
    let Some(item) = state.equipment.remove(&slot) else {
        return Err(InventoryError::SlotEmpty);
    };
    let message = format!("Removed {} from {}.", item.name, slot);
    state.inventory.push(item);
    sync_player_ac(state);
    Ok(message)
}

/// Roll a mob's loot: gold plus at most one item id from its table.
pub fn roll_loot(
    campaign: &Campaign,
    enemy_name: &str,
    roller: &mut dyn Roller,
) -> (i32, Option<String>) {
    let Some(profile) = campaign.mob(enemy_name) else {
        return (0, None);
    };
    let gold = profile
        .loot
        .gold
        .as_ref()
        .map(|expr| expr.roll(roller).total.max(0))
        .unwrap_or(0);
    let items = &profile.loot.items;
    if items.is_empty() {
        return (gold, None);
    }
    let pick = roller.roll_die(items.len() as u32) as usize;
    (gold, items.get(pick.saturating_sub(1)).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content;
    use crate::testing::{fixtures, ScriptedDice};

    fn potion() -> Item {
        fixtures::watchtower_item("healing_potion")
    }

    #[test]
    fn test_use_potion_heals_most_wounded() {
        let mut state = fixtures::watchtower_state();
        state.inventory = vec![potion()];
        state.player.hp = 10;
        state.companions[0].hp = 3;
        let mut dice = ScriptedDice::constant(4);
        let result = use_item(&mut state, "potion", None, &mut dice).unwrap();
        assert_eq!(result, "You use Healing Potion on Mara, healing 6 (4+2).");
        assert_eq!(state.companions[0].hp, 9);
        assert!(state.inventory.is_empty());
    }

    #[test]
    fn test_use_potion_on_player() {
        let mut state = fixtures::watchtower_state();
        state.inventory = vec![potion()];
        state.player.hp = 6;
        state.companions[0].hp = 9;
        let mut dice = ScriptedDice::constant(3);
        let result = use_item(&mut state, "potion", Some("me"), &mut dice).unwrap();
        assert!(result.contains("healing 5"));
        assert_eq!(state.player.hp, 11);
    }

    #[test]
    fn test_use_potion_on_companion_by_name() {
        let mut state = fixtures::watchtower_state();
        state.inventory = vec![potion()];
        state.player.hp = 12;
        state.companions[0].hp = 4;
        let mut dice = ScriptedDice::constant(2);
        use_item(&mut state, "potion", Some("Mara"), &mut dice).unwrap();
        assert_eq!(state.companions[0].hp, 8);
    }

    #[test]
    fn test_heal_caps_at_max() {
        let mut state = fixtures::watchtower_state();
        state.inventory = vec![potion()];
        state.player.hp = state.player.max_hp - 1;
        let mut dice = ScriptedDice::constant(6);
        let result = use_item(&mut state, "heal", Some("self"), &mut dice).unwrap();
        assert!(result.contains("healing 1 "));
        assert_eq!(state.player.hp, state.player.max_hp);
    }

    #[test]
    fn test_use_item_missing() {
        let mut state = fixtures::watchtower_state();
        let mut dice = ScriptedDice::constant(1);
        let err = use_item(&mut state, "potion", None, &mut dice).unwrap_err();
        assert_eq!(err.to_string(), "You don't have that.");
        let err = use_item(&mut state, "  ", None, &mut dice).unwrap_err();
        assert_eq!(err, InventoryError::EmptyQuery);
    }

    #[test]
    fn test_inventory_limit_blocks_general_item() {
        let mut state = fixtures::watchtower_state();
        state.inventory_limit = 1;
        assert!(add_item(&mut state, potion()).is_ok());
        let err = add_item(&mut state, potion()).unwrap_err();
        assert_eq!(err.to_string(), "Inventory is full.");
    }

    #[test]
    fn test_inventory_limit_allows_quest_item() {
        let mut state = fixtures::watchtower_state();
        state.inventory_limit = 0;
        let locket = fixtures::watchtower_item("silver_locket");
        assert!(add_item(&mut state, locket).is_ok());
        assert_eq!(inventory_used(&state), 0);
    }

    #[test]
    fn test_same_item_matches_are_not_ambiguous() {
        let mut state = fixtures::watchtower_state();
        state.inventory = vec![potion(), potion()];
        assert_eq!(find_item(&state, "potion", None), Ok(0));

        state.inventory.push(fixtures::watchtower_item("worn_boots"));
        state.inventory.push(fixtures::watchtower_item("leather_cap"));
        let err = find_item(&state, "armor", None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Be more specific or use an item number: Worn Boots, Leather Cap"
        );
    }

    #[test]
    fn test_equip_and_unequip_armor() {
        let mut state = fixtures::watchtower_state();
        let helm = fixtures::plain_armor("iron_helm", "Iron Helm", EquipSlot::Head);
        state.inventory.push(helm.clone());

        let result = equip_item(&mut state, "iron helm").unwrap();
        assert_eq!(result, "Equipped Iron Helm to head.");
        assert_eq!(state.equipment.get(&EquipSlot::Head), Some(&helm));
        assert!(state.inventory.is_empty());

        let result = unequip_item(&mut state, "head").unwrap();
        assert_eq!(result, "Removed Iron Helm from head.");
        assert_eq!(state.inventory, vec![helm]);
        assert_eq!(
            unequip_item(&mut state, "head").unwrap_err(),
            InventoryError::SlotEmpty
        );
        assert_eq!(
            unequip_item(&mut state, "tail").unwrap_err(),
            InventoryError::UnknownSlot
        );
    }

    #[test]
    fn test_equipping_armor_updates_ac() {
        let mut state = fixtures::watchtower_state();
        let base_ac = state.player.ac;
        state.inventory.push(fixtures::watchtower_item("leather_cap"));
        equip_item(&mut state, "leather cap").unwrap();
        assert_eq!(state.player.ac, base_ac + 1);
        unequip_item(&mut state, "head").unwrap();
        assert_eq!(state.player.ac, base_ac);
    }

    #[test]
    fn test_equip_by_index_and_swap() {
        let mut state = fixtures::watchtower_state();
        let first = fixtures::plain_armor("cap_a", "Leather Cap", EquipSlot::Head);
        let second = fixtures::plain_armor("cap_b", "Leather Cap", EquipSlot::Head);
        state.inventory = vec![first.clone(), second.clone()];

        equip_item(&mut state, "2").unwrap();
        assert_eq!(state.equipment.get(&EquipSlot::Head), Some(&second));

        equip_item(&mut state, "1").unwrap();
        assert_eq!(state.equipment.get(&EquipSlot::Head), Some(&first));
        assert_eq!(state.inventory, vec![second]);

        assert_eq!(
            equip_item(&mut state, "9").unwrap_err(),
            InventoryError::NoSuchIndex
        );
        state.inventory.push(potion());
        assert_eq!(
            equip_item(&mut state, "2").unwrap_err(),
            InventoryError::NotArmor
        );
    }

    #[test]
    fn test_swap_needs_room() {
        let mut state = fixtures::watchtower_state();
        state.inventory.push(fixtures::watchtower_item("leather_cap"));
        equip_item(&mut state, "leather cap").unwrap();
        state.inventory = vec![fixtures::plain_armor("iron_helm", "Iron Helm", EquipSlot::Head)];
        state.inventory_limit = 1;
        assert_eq!(
            equip_item(&mut state, "iron helm").unwrap_err(),
            InventoryError::NoRoomToSwap
        );
    }

    #[test]
    fn test_roll_loot_picks_from_table() {
        let campaign = content::campaign("ruined_watchtower").unwrap();
        let mut dice = ScriptedDice::sequence([4, 2]);
        let (gold, item) = roll_loot(campaign, "Watchtower Bandit", &mut dice);
        assert_eq!(gold, 6);
        assert_eq!(item.as_deref(), Some("worn_boots"));

        let (gold, item) = roll_loot(campaign, "Big Rats", &mut dice);
        assert_eq!((gold, item), (0, None));
    }
}
