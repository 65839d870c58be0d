//! Companion creation from campaign profiles.

use crate::content::{self, ContentError};
use crate::dice::DiceExpression;
use crate::profiles::CompanionProfile;
use crate::state::Companion;

pub fn create_companion_from_profile(profile: &CompanionProfile) -> Companion {
    Companion {
        name: profile.name.clone(),
        hp: profile.hp,
        max_hp: profile.max_hp,
        ac: profile.ac,
        attack_bonus: profile.attack_bonus,
        damage: profile.damage.clone(),
        mana: profile.mana,
        max_mana: profile.max_mana,
        learned_spells: profile.spells.clone(),
        defend_hp_threshold: profile.defend_hp_threshold,
    }
}

/// Companion used when a campaign defines none.
fn fallback_companion() -> Companion {
    create_companion_from_profile(&CompanionProfile::melee(
        "mara",
        "Mara",
        10,
        13,
        2,
        DiceExpression::new(1, 6, 0),
    ))
}

/// Build a companion by id, or the campaign's default when `companion_id` is `None`.
pub fn create_companion(
    campaign_id: &str,
    companion_id: Option<&str>,
) -> Result<Companion, ContentError> {
    let campaign = content::campaign(campaign_id)?;
    if campaign.companions.is_empty() {
        return Ok(fallback_companion());
    }
    let id = match companion_id {
        Some(id) => id,
        None => campaign
            .companion_choices()
            .first()
            .copied()
            .unwrap_or_default(),
    };
    campaign
        .companion(id)
        .map(create_companion_from_profile)
        .ok_or_else(|| ContentError::UnknownCompanion {
            campaign: campaign_id.to_string(),
            companion: id.to_string(),
        })
}

/// Build the party's companions, or the campaign's first default.
pub fn create_campaign_companions(
    campaign_id: &str,
    companion_ids: &[&str],
) -> Result<Vec<Companion>, ContentError> {
    if companion_ids.is_empty() {
        return Ok(vec![create_companion(campaign_id, None)?]);
    }
    companion_ids
        .iter()
        .map(|id| create_companion(campaign_id, Some(*id)))
        .collect()
}
