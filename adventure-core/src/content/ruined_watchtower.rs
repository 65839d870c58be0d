use super::{combat, exit_table, final_chest, keyed, room, social, starter_items, Campaign, Item};
use crate::dice::DiceExpression;
use crate::profiles::{CompanionProfile, LootTable, MobAi, MobHp, MobProfile, Stat};

pub(super) fn campaign() -> Campaign {
    let rooms = vec![
        room(
            "courtyard",
            "Ruined Courtyard",
            Some("Eryn the Scout"),
            "Broken stone and fallen beams surround a mossy fire pit. A hooded scout \
             watches you from a collapsed archway, hand near a shortbow.",
            social(
                Stat::Int,
                13,
                "scout_helped",
                "social_done",
                "You win Eryn's trust (roll {roll} -> {total}). She points out a safe route \
                 and warns you about a lone bandit inside.",
                "Eryn stays guarded (roll {roll} -> {total}). She gives no help, but allows \
                 you to pass.",
            ),
        ),
        room(
            "cellar",
            "Collapsed Cellar",
            None,
            "A broken stairwell drops into a damp cellar. Two big rats bristle and hiss, \
             ready to charge.",
            combat("Big Rats"),
        ),
        room(
            "barracks",
            "Crumbling Barracks",
            None,
            "Dusty bunks line the walls. A lone bandit in watchman gear steps from the \
             shadows, blade raised.",
            combat("Watchtower Bandit"),
        ),
        room(
            "spire",
            "Top Spire",
            None,
            "The top chamber is open to the wind. An ironbound chest sits beneath a broken \
             mural, its lock rusted but stubborn.",
            final_chest(
                Stat::Dex,
                13,
                "silver_locket",
                "You work the rusted lock free (roll {roll} -> {total}). Inside rests the \
                 Silver Locket of the Watch. Your adventure ends in triumph.",
                "Your tools slip (roll {roll} -> {total}). The lock resists for now, but you \
                 can try again.",
            ),
        ),
    ];

    let mut items = starter_items();
    items.push(Item::quest("silver_locket", "Silver Locket of the Watch"));

    let mobs = vec![
        MobProfile {
            name: "Watchtower Bandit".to_string(),
            hp: MobHp::Fixed(12),
            count: 1,
            ac: 13,
            attack_bonus: 3,
            damage: DiceExpression::new(1, 6, 0),
            loot: LootTable {
                gold: Some(DiceExpression::new(1, 6, 2)),
                items: vec![
                    "padded_arms".to_string(),
                    "worn_boots".to_string(),
                    "leather_cap".to_string(),
                ],
            },
            ai: MobAi::FocusPlayer,
            xp: 25,
        },
        MobProfile {
            name: "Big Rats".to_string(),
            hp: MobHp::Rolled {
                expr: DiceExpression::new(1, 4, -1),
                min: 1,
            },
            count: 2,
            ac: 12,
            attack_bonus: 2,
            damage: DiceExpression::new(1, 4, 0),
            loot: LootTable::default(),
            ai: MobAi::FocusWeakest,
            xp: 10,
        },
    ];

    Campaign {
        id: "ruined_watchtower".to_string(),
        name: "The Ruined Watchtower".to_string(),
        description: "A watchtower with a cellar, one social scene, two combats, and a final \
                      loot chamber."
            .to_string(),
        room_order: ["courtyard", "cellar", "barracks", "spire"]
            .map(String::from)
            .to_vec(),
        rooms: keyed(rooms, |r| r.id.as_str()),
        items: keyed(items, |i| i.id.as_str()),
        mobs: keyed(mobs, |m| m.name.as_str()),
        exits: exit_table(&[
            (
                "courtyard",
                &[
                    ("down", "cellar"),
                    ("cellar", "cellar"),
                    ("up", "barracks"),
                    ("barracks", "barracks"),
                ],
            ),
            ("cellar", &[("up", "courtyard"), ("courtyard", "courtyard")]),
            (
                "barracks",
                &[
                    ("down", "courtyard"),
                    ("courtyard", "courtyard"),
                    ("up", "spire"),
                    ("spire", "spire"),
                ],
            ),
            ("spire", &[("down", "barracks"), ("barracks", "barracks")]),
        ]),
        companions: vec![CompanionProfile::melee(
            "mara",
            "Mara",
            10,
            13,
            2,
            DiceExpression::new(1, 6, 0),
        )],
        default_companion_ids: vec!["mara".to_string()],
        completion_xp: 100,
    }
}
