use super::{
    combat, exit_table, final_chest, keyed, room, social, starter_items, Campaign, EquipSlot,
    Item, RoomKind,
};
use crate::dice::DiceExpression;
use crate::profiles::{CompanionProfile, LootTable, MobAi, MobHp, MobProfile, Stat};

#[allow(clippy::too_many_arguments)]
fn undead(
    name: &str,
    hp: i32,
    ac: i32,
    attack_bonus: i32,
    damage: DiceExpression,
    loot: LootTable,
    ai: MobAi,
    xp: u32,
) -> MobProfile {
    MobProfile {
        name: name.to_string(),
        hp: MobHp::Fixed(hp),
        count: 1,
        ac,
        attack_bonus,
        damage,
        loot,
        ai,
        xp,
    }
}

fn gold_only(expr: DiceExpression) -> LootTable {
    LootTable {
        gold: Some(expr),
        items: Vec::new(),
    }
}

pub(super) fn campaign() -> Campaign {
    let rooms = vec![
        room(
            "approach",
            "Overgrown Approach",
            Some("Keeper Aldric"),
            "A worn path leads through tangled undergrowth to a sunken stone arch. Moss and \
             vines cling to weathered carvings. The entrance to the crypt lies ahead.",
            social(
                Stat::Wis,
                12,
                "keeper_warned",
                "social_done",
                "Aldric shares what he knows (roll {roll} -> {total}). 'The lower levels hold \
                 restless dead. Bring light and steel.'",
                "Aldric shrugs (roll {roll} -> {total}). 'Go if you must. I've said my piece.'",
            ),
        ),
        room(
            "gate",
            "Sealed Gate",
            None,
            "A heavy iron gate blocks the descent. Rust has weakened the mechanism. A careful \
             hand might ease it open, or force could break it.",
            social(
                Stat::Dex,
                11,
                "gate_opened",
                "gate_done",
                "You work the latch free (roll {roll} -> {total}). The gate swings open silently.",
                "The mechanism resists (roll {roll} -> {total}). You can try again or force it.",
            ),
        ),
        room(
            "hallway",
            "Dusty Hallway",
            None,
            "Torch sconces line the walls, long cold. Faint scratches mark the floor. \
             Something has been through here recently.",
            RoomKind::Passage,
        ),
        room(
            "guard_room",
            "Guard Chamber",
            None,
            "Skeletal figures in rusted mail stand watch. At your approach, their eyes flare \
             with cold light. The dead do not rest easy here.",
            combat("Crypt Guardians"),
        ),
        room(
            "antechamber",
            "Antechamber",
            None,
            "A small chamber before the main crypt. Faded murals depict a burial procession. \
             A lone wight stirs from the shadows, drawn by the living.",
            combat("Crypt Wight"),
        ),
        room(
            "crypt",
            "Main Crypt",
            None,
            "Stone sarcophagi line the walls. The air is cold and still. A wraith coalesces \
             from the darkness: ancient, hungry, and hostile.",
            combat("Crypt Wraith"),
        ),
        room(
            "treasure",
            "Treasure Vault",
            None,
            "The innermost chamber. A stone casket rests on a dais, lid askew. Within lies \
             the Amulet of Rest, the prize that might quiet the crypt forever.",
            final_chest(
                Stat::Int,
                14,
                "amulet_of_rest",
                "You secure the Amulet (roll {roll} -> {total}). Its warmth spreads through \
                 you. The crypt falls silent. Victory.",
                "The wards resist (roll {roll} -> {total}). Steady your mind and try again.",
            ),
        ),
    ];

    let mut items = starter_items();
    items.push(Item::armor("chain_shirt", "Chain Shirt", EquipSlot::Chest, 2));
    items.push(Item::quest("amulet_of_rest", "Amulet of Rest"));

    let mobs = vec![
        undead(
            "Crypt Guardians",
            8,
            14,
            2,
            DiceExpression::new(1, 6, 0),
            LootTable {
                gold: Some(DiceExpression::new(2, 4, 0)),
                items: vec!["chain_shirt".to_string()],
            },
            MobAi::FocusWeakest,
            30,
        ),
        undead(
            "Crypt Wight",
            12,
            13,
            3,
            DiceExpression::new(1, 6, 1),
            gold_only(DiceExpression::new(1, 6, 3)),
            MobAi::FocusPlayer,
            40,
        ),
        undead(
            "Crypt Wraith",
            14,
            14,
            4,
            DiceExpression::new(1, 8, 0),
            gold_only(DiceExpression::new(3, 6, 0)),
            MobAi::FocusPlayer,
            75,
        ),
    ];

    Campaign {
        id: "lost_crypt".to_string(),
        name: "The Lost Crypt".to_string(),
        description: "A sunken crypt holds restless dead and a fabled amulet. Choose your \
                      companion and descend. Multiple combats, social checks, and a climactic \
                      boss."
            .to_string(),
        room_order: [
            "approach",
            "gate",
            "hallway",
            "guard_room",
            "antechamber",
            "crypt",
            "treasure",
        ]
        .map(String::from)
        .to_vec(),
        rooms: keyed(rooms, |r| r.id.as_str()),
        items: keyed(items, |i| i.id.as_str()),
        mobs: keyed(mobs, |m| m.name.as_str()),
        exits: exit_table(&[
            ("approach", &[("gate", "gate"), ("down", "gate")]),
            (
                "gate",
                &[("approach", "approach"), ("hallway", "hallway"), ("down", "hallway")],
            ),
            (
                "hallway",
                &[("gate", "gate"), ("guard_room", "guard_room"), ("down", "guard_room")],
            ),
            (
                "guard_room",
                &[
                    ("hallway", "hallway"),
                    ("antechamber", "antechamber"),
                    ("down", "antechamber"),
                ],
            ),
            (
                "antechamber",
                &[("guard_room", "guard_room"), ("crypt", "crypt"), ("down", "crypt")],
            ),
            (
                "crypt",
                &[("antechamber", "antechamber"), ("treasure", "treasure"), ("down", "treasure")],
            ),
            ("treasure", &[("crypt", "crypt"), ("up", "crypt")]),
        ]),
        companions: vec![
            CompanionProfile::melee("eldrin", "Eldrin", 8, 12, 1, DiceExpression::new(1, 4, 1))
                .with_spells(6, &["Spark", "Magic Missile"]),
            CompanionProfile::melee("mara", "Mara", 10, 13, 2, DiceExpression::new(1, 6, 0)),
        ],
        default_companion_ids: vec!["eldrin".to_string(), "mara".to_string()],
        completion_xp: 150,
    }
}
