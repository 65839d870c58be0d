//! Deterministic rules engine.
//!
//! Every function here takes the game state plus a [`Roller`](crate::dice::Roller)
//! and returns the player-facing result text. No narration happens here: the
//! strings produced are the authoritative record that the narrator may only
//! dress up.

pub mod combat;
pub mod companions;
pub mod enemies;
pub mod experience;
pub mod exploration;
pub mod inventory;
pub mod player;
pub mod rest;
pub mod spells;

pub use combat::{
    clear_round_buffs, companion_action, end_combat_if_needed, enemy_actions, player_action,
    select_enemy, PlayerAction, TargetError,
};
pub use companions::{create_campaign_companions, create_companion, create_companion_from_profile};
pub use enemies::create_enemies;
pub use experience::{grant_xp, level_from_xp, xp_for_level, MAX_LEVEL, XP_TABLE};
pub use exploration::{exploration_action, move_player, start_room, MoveError};
pub use inventory::{
    add_item, can_add_item, equip_item, equipment_ac_bonus, find_item, inventory_used,
    roll_loot, sync_player_ac, unequip_item, use_item, HealTarget, InventoryError,
};
pub use player::{caster_mana, create_player, ensure_caster_mana};
pub use rest::{
    apply_rest, regen_companion_mana, regen_mana, reset_rest_streak, FirstChoice, SpellChooser,
};
pub use spells::Spell;
