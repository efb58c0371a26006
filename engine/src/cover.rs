use crate::catalog::Keyword;
use crate::dice::{DefenseColor, DiceSource};
use crate::profile::AttackContext;

pub const MAX_COVER: u32 = 2;

/// Cover value in `0..=2`.
///
/// Improvements are summed and capped before Sharpshooter subtracts.
pub fn determine_cover_value(ctx: &AttackContext) -> u8 {
    let attacker = &ctx.attacker;
    let defender = &ctx.defender;

    let blast = attacker.blast && !defender.immune_blast;
    if blast || attacker.death_from_above {
        return 0;
    }

    let mut cover = defender.cover.value();
    if defender.suppressed {
        cover += 1;
    }
    if Keyword::CoverX.active(ctx.attack_type) {
        cover = cover.saturating_add(defender.cover_bonus);
    }
    cover = cover.saturating_add(defender.smoke_tokens);

    let cover = cover.min(MAX_COVER).saturating_sub(attacker.sharpshooter);
    cover as u8
}

/// Roll the cover pool for `hits`; returns how many hits it cancels.
pub fn roll_cover_pool(
    hits: u32,
    cover: u8,
    low_profile: bool,
    die: Option<DefenseColor>,
    dice: &mut dyn DiceSource,
) -> u32 {
    if hits == 0 || cover == 0 {
        return 0;
    }

    let mut pool = hits;
    let mut cancelled = 0;
    if low_profile {
        pool -= 1;
        cancelled += 1;
    }

    let rolled = dice.roll_defense(die.unwrap_or(DefenseColor::White), pool);
    cancelled += rolled.block;
    if u32::from(cover) == MAX_COVER {
        cancelled += rolled.surge;
    }
    cancelled.min(hits)
}
