use engine::cover::roll_cover_pool;
use engine::{
    AttackContext, AttackFace, AttackSurge, AttackType, AttackerProfile, CoverCategory,
    DefenderProfile, DefenseColor, DefenseFace, DefenseSurge, ScriptedDice,
    determine_cover_value, resolve_attack,
};

fn ctx(cover: CoverCategory, attack_type: AttackType) -> AttackContext {
    let mut attacker = AttackerProfile::new(AttackSurge::Blank);
    attacker.black = 3;
    let mut defender = DefenderProfile::new(DefenseColor::White, DefenseSurge::Blank);
    defender.cover = cover;
    AttackContext::new(attacker, defender, attack_type)
}

#[test]
fn sharpshooter_strips_heavy_cover() {
    let mut c = ctx(CoverCategory::Heavy, AttackType::Ranged);
    c.attacker.sharpshooter = 3;
    assert_eq!(determine_cover_value(&c), 0);
}

#[test]
fn improvements_cap_at_two() {
    let mut c = ctx(CoverCategory::Light, AttackType::Ranged);
    c.defender.suppressed = true;
    c.defender.smoke_tokens = 1;
    assert_eq!(determine_cover_value(&c), 2);
}

#[test]
fn sharpshooter_applies_after_the_cap() {
    let mut c = ctx(CoverCategory::Heavy, AttackType::Ranged);
    c.defender.smoke_tokens = 3;
    c.attacker.sharpshooter = 1;
    assert_eq!(determine_cover_value(&c), 1);
}

#[test]
fn cover_keyword_does_nothing_in_melee() {
    let mut c = ctx(CoverCategory::None, AttackType::Melee);
    c.defender.cover_bonus = 2;
    assert_eq!(determine_cover_value(&c), 0);

    c.attack_type = AttackType::Ranged;
    assert_eq!(determine_cover_value(&c), 2);
}

#[test]
fn blast_and_death_from_above_ignore_cover() {
    let mut c = ctx(CoverCategory::Heavy, AttackType::Ranged);
    c.attacker.blast = true;
    assert_eq!(determine_cover_value(&c), 0);

    c.defender.immune_blast = true;
    assert_eq!(determine_cover_value(&c), 2);

    c.attacker.death_from_above = true;
    assert_eq!(determine_cover_value(&c), 0);
}

#[test]
fn low_profile_single_hit_always_cancelled() {
    // the scripted defense die would block too; low profile must not roll at all
    for face in DefenseFace::ALL {
        let mut dice = ScriptedDice::new(vec![], vec![face]);
        let cancelled = roll_cover_pool(1, 1, true, None, &mut dice);
        assert_eq!(cancelled, 1);
        assert!(!dice.is_exhausted(), "no cover die should have been rolled");
    }
}

#[test]
fn light_cover_cancels_on_blocks_only() {
    let faces = vec![DefenseFace::Block, DefenseFace::Surge, DefenseFace::Blank];
    let mut dice = ScriptedDice::new(vec![], faces.clone());
    assert_eq!(roll_cover_pool(3, 1, false, None, &mut dice), 1);

    let mut dice = ScriptedDice::new(vec![], faces);
    assert_eq!(roll_cover_pool(3, 2, false, None, &mut dice), 2);
}

#[test]
fn low_profile_hit_through_pipeline() {
    let mut c = ctx(CoverCategory::Light, AttackType::Ranged);
    c.attacker.black = 1;
    c.defender.low_profile = true;
    let mut dice = ScriptedDice::new(vec![AttackFace::Hit], vec![]);
    let outcome = resolve_attack(&c, &mut dice);
    assert_eq!(outcome.wounds_to_defender, 0);
    // an attack that rolled a hit still suppresses
    assert!(outcome.defender_suppressed);
}
