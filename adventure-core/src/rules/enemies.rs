//! Enemy creation from campaign mob profiles.

use crate::dice::Roller;
use crate::profiles::{MobHp, MobProfile};
use crate::state::Enemy;

fn roll_hp(hp: &MobHp, roller: &mut dyn Roller) -> i32 {
    match hp {
        MobHp::Fixed(hp) => *hp,
        MobHp::Rolled { expr, min } => expr.roll(roller).total.max(*min),
    }
}

/// Spawn one encounter's worth of enemies (at least one).
pub fn create_enemies(profile: &MobProfile, roller: &mut dyn Roller) -> Vec<Enemy> {
    (0..profile.count.max(1))
        .map(|_| {
            let hp = roll_hp(&profile.hp, roller);
            Enemy {
                name: profile.name.clone(),
                hp,
                max_hp: hp,
                ac: profile.ac,
                attack_bonus: profile.attack_bonus,
                damage: profile.damage.clone(),
                asleep: false,
            }
        })
        .collect()
}
