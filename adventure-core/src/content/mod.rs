//! Campaign content: rooms, items, mobs, companions and exits.
//!
//! Campaigns are pure data built once into a static registry. The rules
//! engine looks everything up by id; nothing in here mutates game state.

mod lost_crypt;
mod ruined_watchtower;

use crate::dice::DiceExpression;
use crate::profiles::{CompanionProfile, MobProfile, Stat};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from content lookups.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContentError {
    #[error("Unknown campaign '{0}'")]
    UnknownCampaign(String),

    #[error("Unknown room '{room}' in campaign '{campaign}'")]
    UnknownRoom { campaign: String, room: String },

    #[error("Unknown companion '{companion}' in campaign '{campaign}'")]
    UnknownCompanion { campaign: String, companion: String },

    #[error("Unknown enemy '{mob}' in campaign '{campaign}'")]
    UnknownMob { campaign: String, mob: String },
}

// ============================================================================
// Items
// ============================================================================

/// Broad item category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Potion,
    Armor,
    Quest,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ItemKind {
    pub fn name(&self) -> &'static str {
        match self {
            ItemKind::Potion => "potion",
            ItemKind::Armor => "armor",
            ItemKind::Quest => "quest",
            ItemKind::Unknown => "unknown",
        }
    }
}

/// Equipment slots, in display order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    Head,
    Arms,
    Hands,
    Chest,
    Legs,
    Feet,
}

impl EquipSlot {
    pub const ALL: [EquipSlot; 6] = [
        EquipSlot::Head,
        EquipSlot::Arms,
        EquipSlot::Hands,
        EquipSlot::Chest,
        EquipSlot::Legs,
        EquipSlot::Feet,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EquipSlot::Head => "head",
            EquipSlot::Arms => "arms",
            EquipSlot::Hands => "hands",
            EquipSlot::Chest => "chest",
            EquipSlot::Legs => "legs",
            EquipSlot::Feet => "feet",
        }
    }
}

impl fmt::Display for EquipSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EquipSlot {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        EquipSlot::ALL
            .into_iter()
            .find(|slot| slot.name().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// What an item does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemEffect {
    Heal { dice: DiceExpression },
    Ac { bonus: i32 },
}

fn default_true() -> bool {
    true
}

/// An item instance. Catalog entries are copied into inventories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<EquipSlot>,
    #[serde(default)]
    pub effect: Option<ItemEffect>,
    #[serde(default = "default_true")]
    pub counts_toward_limit: bool,
}

impl Item {
    pub fn potion(id: &str, name: &str, heal: DiceExpression) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: ItemKind::Potion,
            slot: None,
            effect: Some(ItemEffect::Heal { dice: heal }),
            counts_toward_limit: true,
        }
    }

    pub fn armor(id: &str, name: &str, slot: EquipSlot, bonus: i32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: ItemKind::Armor,
            slot: Some(slot),
            effect: Some(ItemEffect::Ac { bonus }),
            counts_toward_limit: true,
        }
    }

    /// Quest items never count toward the inventory limit.
    pub fn quest(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: ItemKind::Quest,
            slot: None,
            effect: None,
            counts_toward_limit: false,
        }
    }

    /// Placeholder for ids or names missing from the catalog.
    pub fn unknown(name: &str) -> Self {
        Self {
            id: "unknown".to_string(),
            name: name.to_string(),
            kind: ItemKind::Unknown,
            slot: None,
            effect: None,
            counts_toward_limit: true,
        }
    }

    pub fn ac_bonus(&self) -> i32 {
        match self.effect {
            Some(ItemEffect::Ac { bonus }) => bonus,
            _ => 0,
        }
    }
}

// ============================================================================
// Rooms
// ============================================================================

/// Stat check that resolves a social scene.
#[derive(Debug, Clone)]
pub struct SocialScene {
    pub stat: Stat,
    pub dc: i32,
    pub success_flag: Option<String>,
    /// Templates may contain `{roll}` and `{total}`.
    pub success_msg: Option<String>,
    pub fail_msg: Option<String>,
    pub done_flag: String,
}

/// Locked container at the end of a campaign.
#[derive(Debug, Clone)]
pub struct LootScene {
    pub stat: Stat,
    pub dc: i32,
    pub win_item_id: Option<String>,
    /// Opening the container ends the campaign.
    pub game_over: bool,
    pub success_msg: Option<String>,
    pub fail_msg: Option<String>,
}

#[derive(Debug, Clone)]
pub enum RoomKind {
    Social(SocialScene),
    Combat { enemy: String },
    Loot(LootScene),
    Passage,
}

impl RoomKind {
    pub fn name(&self) -> &'static str {
        match self {
            RoomKind::Social(_) => "social",
            RoomKind::Combat { .. } => "combat",
            RoomKind::Loot(_) => "loot",
            RoomKind::Passage => "passage",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub description: String,
    pub npc: Option<String>,
    pub kind: RoomKind,
}

/// Fill `{roll}` and `{total}` placeholders in a campaign message.
pub fn fill_roll_template(template: &str, roll: u32, total: i32) -> String {
    template
        .replace("{roll}", &roll.to_string())
        .replace("{total}", &total.to_string())
}

// ============================================================================
// Campaigns
// ============================================================================

#[derive(Debug, Clone)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub description: String,
    pub room_order: Vec<String>,
    pub rooms: BTreeMap<String, Room>,
    pub items: BTreeMap<String, Item>,
    pub mobs: BTreeMap<String, MobProfile>,
    /// room id -> (alias -> destination room id)
    pub exits: BTreeMap<String, BTreeMap<String, String>>,
    /// Declaration order matters: the first is the fallback default.
    pub companions: Vec<CompanionProfile>,
    pub default_companion_ids: Vec<String>,
    pub completion_xp: u32,
}

impl Campaign {
    pub fn room(&self, room_id: &str) -> Result<&Room, ContentError> {
        self.rooms
            .get(room_id)
            .ok_or_else(|| ContentError::UnknownRoom {
                campaign: self.id.clone(),
                room: room_id.to_string(),
            })
    }

    pub fn start_room_id(&self) -> &str {
        self.room_order
            .first()
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn mob(&self, name: &str) -> Option<&MobProfile> {
        self.mobs.get(name)
    }

    pub fn exits(&self, room_id: &str) -> BTreeMap<String, String> {
        self.exits.get(room_id).cloned().unwrap_or_default()
    }

    /// Distinct destination room ids from a room, sorted.
    pub fn exit_destinations(&self, room_id: &str) -> Vec<String> {
        let mut destinations: Vec<String> = self.exits(room_id).into_values().collect();
        destinations.sort();
        destinations.dedup();
        destinations
    }

    /// Copy of a catalog item, or a placeholder named after the id.
    pub fn item_from_id(&self, item_id: &str) -> Item {
        self.items
            .get(item_id)
            .cloned()
            .unwrap_or_else(|| Item::unknown(item_id))
    }

    /// Copy of the catalog item with this display name (case-insensitive).
    pub fn item_from_name(&self, name: &str) -> Item {
        self.items
            .values()
            .find(|item| item.name.eq_ignore_ascii_case(name))
            .cloned()
            .unwrap_or_else(|| Item::unknown(name))
    }

    pub fn quest_item_ids(&self) -> Vec<&str> {
        self.items
            .values()
            .filter(|item| item.kind == ItemKind::Quest)
            .map(|item| item.id.as_str())
            .collect()
    }

    pub fn companion(&self, companion_id: &str) -> Option<&CompanionProfile> {
        self.companions.iter().find(|c| c.id == companion_id)
    }

    /// Companion ids to offer, defaults first.
    pub fn companion_choices(&self) -> Vec<&str> {
        if self.default_companion_ids.is_empty() {
            self.companions.iter().map(|c| c.id.as_str()).collect()
        } else {
            self.default_companion_ids.iter().map(String::as_str).collect()
        }
    }
}

// ----------------------------------------------------------------------------
// Authoring helpers shared by the built-in campaigns
// ----------------------------------------------------------------------------

fn keyed<T>(values: impl IntoIterator<Item = T>, key: impl Fn(&T) -> &str) -> BTreeMap<String, T> {
    values
        .into_iter()
        .map(|value| (key(&value).to_string(), value))
        .collect()
}

fn exit_table(entries: &[(&str, &[(&str, &str)])]) -> BTreeMap<String, BTreeMap<String, String>> {
    entries
        .iter()
        .map(|(room, aliases)| {
            let aliases = aliases
                .iter()
                .map(|(alias, to)| (alias.to_string(), to.to_string()))
                .collect();
            (room.to_string(), aliases)
        })
        .collect()
}

/// Potion and basic armor every campaign stocks.
fn starter_items() -> Vec<Item> {
    vec![
        Item::potion("healing_potion", "Healing Potion", DiceExpression::new(1, 6, 2)),
        Item::armor("leather_cap", "Leather Cap", EquipSlot::Head, 1),
        Item::armor("padded_arms", "Padded Armguards", EquipSlot::Arms, 1),
        Item::armor("worn_boots", "Worn Boots", EquipSlot::Feet, 1),
    ]
}

fn social(
    stat: Stat,
    dc: i32,
    success_flag: &str,
    done_flag: &str,
    success_msg: &str,
    fail_msg: &str,
) -> RoomKind {
    RoomKind::Social(SocialScene {
        stat,
        dc,
        success_flag: Some(success_flag.to_string()),
        success_msg: Some(success_msg.to_string()),
        fail_msg: Some(fail_msg.to_string()),
        done_flag: done_flag.to_string(),
    })
}

fn final_chest(stat: Stat, dc: i32, win_item_id: &str, success_msg: &str, fail_msg: &str) -> RoomKind {
    RoomKind::Loot(LootScene {
        stat,
        dc,
        win_item_id: Some(win_item_id.to_string()),
        game_over: true,
        success_msg: Some(success_msg.to_string()),
        fail_msg: Some(fail_msg.to_string()),
    })
}

fn room(id: &str, name: &str, npc: Option<&str>, description: &str, kind: RoomKind) -> Room {
    Room {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        npc: npc.map(str::to_string),
        kind,
    }
}

fn combat(enemy: &str) -> RoomKind {
    RoomKind::Combat {
        enemy: enemy.to_string(),
    }
}

lazy_static! {
    static ref CAMPAIGNS: Vec<Campaign> = vec![
        ruined_watchtower::campaign(),
        lost_crypt::campaign(),
    ];
}

/// All registered campaigns, in presentation order.
pub fn campaigns() -> &'static [Campaign] {
    &CAMPAIGNS
}

pub fn campaign(campaign_id: &str) -> Result<&'static Campaign, ContentError> {
    CAMPAIGNS
        .iter()
        .find(|c| c.id == campaign_id)
        .ok_or_else(|| ContentError::UnknownCampaign(campaign_id.to_string()))
}

/// Mob profile lookup that tolerates stale enemy names from old saves.
pub fn mob_profile(campaign_id: &str, name: &str) -> Option<&'static MobProfile> {
    campaign(campaign_id).ok()?.mob(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_contains_both_campaigns() {
        let ids: Vec<&str> = campaigns().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["ruined_watchtower", "lost_crypt"]);
        assert!(matches!(
            campaign("nowhere"),
            Err(ContentError::UnknownCampaign(_))
        ));
    }

    #[test]
    fn test_every_exit_and_room_resolves() {
        for campaign in campaigns() {
            for room_id in &campaign.room_order {
                assert!(campaign.room(room_id).is_ok(), "{room_id} missing");
            }
            for (from, exits) in &campaign.exits {
                assert!(campaign.rooms.contains_key(from));
                for to in exits.values() {
                    assert!(campaign.rooms.contains_key(to), "{from} -> {to}");
                }
            }
            for room in campaign.rooms.values() {
                if let RoomKind::Combat { enemy } = &room.kind {
                    assert!(campaign.mob(enemy).is_some(), "{enemy} missing");
                }
            }
            for mob in campaign.mobs.values() {
                for item_id in &mob.loot.items {
                    assert!(campaign.items.contains_key(item_id));
                }
            }
            for id in campaign.companion_choices() {
                assert!(campaign.companion(id).is_some());
            }
            assert!(campaign.items.contains_key("healing_potion"));
        }
    }

    #[test]
    fn test_item_lookup_falls_back_to_placeholder() {
        let campaign = campaign("ruined_watchtower").unwrap();
        let potion = campaign.item_from_name("healing potion");
        assert_eq!(potion.id, "healing_potion");
        let missing = campaign.item_from_id("dragon_egg");
        assert_eq!(missing.id, "unknown");
        assert_eq!(missing.name, "dragon_egg");
        assert_eq!(missing.kind, ItemKind::Unknown);
    }

    #[test]
    fn test_exit_destinations_are_distinct() {
        let campaign = campaign("ruined_watchtower").unwrap();
        assert_eq!(
            campaign.exit_destinations("courtyard"),
            vec!["barracks".to_string(), "cellar".to_string()]
        );
    }

    #[test]
    fn test_quest_items_listed() {
        let campaign = campaign("lost_crypt").unwrap();
        assert_eq!(campaign.quest_item_ids(), vec!["amulet_of_rest"]);
    }

    #[test]
    fn test_item_serde_defaults() {
        let item: Item =
            serde_json::from_str(r#"{"id":"iron_helm","name":"Iron Helm","kind":"armor","slot":"head"}"#)
                .unwrap();
        assert!(item.counts_toward_limit);
        assert_eq!(item.slot, Some(EquipSlot::Head));
        assert_eq!(item.ac_bonus(), 0);

        let odd: Item = serde_json::from_str(r#"{"id":"x","name":"X","kind":"trinket"}"#).unwrap();
        assert_eq!(odd.kind, ItemKind::Unknown);
    }

    #[test]
    fn test_fill_roll_template() {
        assert_eq!(
            fill_roll_template("Success (roll {roll} -> {total}).", 12, 15),
            "Success (roll 12 -> 15)."
        );
    }
}
