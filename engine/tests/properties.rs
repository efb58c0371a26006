use engine::dice::{shift_phases, shift_pool, Shift};
use engine::pipeline::run_steps;
use engine::{
    AttackColor, AttackContext, AttackSurge, AttackType, AttackerProfile, CoverCategory,
    DefenderProfile, DefenseColor, DefenseSurge, Dice, DieShifts, GuardianProfile,
    determine_cover_value,
};
use proptest::prelude::*;

fn attack_type() -> impl Strategy<Value = AttackType> {
    prop_oneof![
        Just(AttackType::All),
        Just(AttackType::Ranged),
        Just(AttackType::Melee),
        Just(AttackType::Overrun),
    ]
}

fn cover() -> impl Strategy<Value = CoverCategory> {
    prop_oneof![
        Just(CoverCategory::None),
        Just(CoverCategory::Light),
        Just(CoverCategory::Heavy),
    ]
}

fn shifts() -> impl Strategy<Value = DieShifts> {
    (0u32..4, 0u32..4).prop_map(|(upgrades, downgrades)| DieShifts { upgrades, downgrades })
}

prop_compose! {
    fn context()(
        pool in (0u32..4, 0u32..4, 0u32..4),
        tokens in (0u32..3, 0u32..3, 0u32..3),
        pierce in 0u32..4,
        guardian in prop::option::of(1u32..3),
        cover in cover(),
        attack_type in attack_type(),
        attack_shifts in shifts(),
        defense_shifts in shifts(),
        flags in (any::<bool>(), any::<bool>(), any::<bool>()),
    ) -> AttackContext {
        let mut a = AttackerProfile::new(AttackSurge::Hit);
        (a.white, a.black, a.red) = pool;
        (a.aim, a.surge_tokens) = (tokens.0, tokens.1);
        a.pierce = pierce;
        a.attack_shifts = attack_shifts;
        a.makashi_mastery = flags.0;

        let mut d = DefenderProfile::new(DefenseColor::White, DefenseSurge::Blank);
        d.cover = cover;
        d.dodge_tokens = tokens.2;
        d.defense_shifts = defense_shifts;
        d.impervious = flags.1;
        d.immune_pierce = flags.2;
        d.low_profile = flags.2;
        d.guardian =
            guardian.map(|g| GuardianProfile::new(g, DefenseColor::Red, DefenseSurge::Block));
        AttackContext::new(a, d, attack_type)
    }
}

proptest! {
    #[test]
    fn cover_value_stays_in_range(
        cover in cover(),
        suppressed in any::<bool>(),
        bonus in 0u32..5,
        smoke in 0u32..5,
        sharpshooter in 0u32..5,
        blast in any::<bool>(),
        attack_type in attack_type(),
    ) {
        let mut a = AttackerProfile::new(AttackSurge::Blank);
        a.sharpshooter = sharpshooter;
        a.blast = blast;
        let mut d = DefenderProfile::new(DefenseColor::Red, DefenseSurge::Block);
        d.cover = cover;
        d.suppressed = suppressed;
        d.cover_bonus = bonus;
        d.smoke_tokens = smoke;
        let value = determine_cover_value(&AttackContext::new(a, d, attack_type));
        prop_assert!(value <= 2);
    }

    #[test]
    fn shifts_keep_dice_on_the_chain(
        counts in (0u32..6, 0u32..6, 0u32..6),
        attacker in shifts(),
        defender in shifts(),
    ) {
        let before = [counts.0, counts.1, counts.2];
        let after = shift_phases(before, attacker, defender);
        prop_assert_eq!(after.iter().sum::<u32>(), before.iter().sum::<u32>());
    }

    #[test]
    fn one_phase_moves_each_die_at_most_one_step(
        counts in (0u32..6, 0u32..6, 0u32..6),
        k in 0u32..10,
    ) {
        let before = [counts.0, counts.1, counts.2];
        let up = shift_pool(before, Shift::Up, k);
        // nothing can reach red from white in a single phase
        prop_assert!(up[2] <= before[2] + before[1]);
        prop_assert!(up[0] <= before[0]);
        let down = shift_pool(before, Shift::Down, k);
        prop_assert!(down[0] <= before[0] + before[1]);
        prop_assert!(down[2] <= before[2]);
    }

    #[test]
    fn resolution_conserves_hits_and_pierce(ctx in context(), seed in any::<u64>()) {
        let s = run_steps(&ctx, &mut Dice::from_seed(seed));
        prop_assert!(s.hits_after_dodge <= s.hits_before_cover);
        prop_assert!(s.budget.pierce_spent <= s.budget.pierce_total);
        prop_assert!(s.cover_value <= 2);
        prop_assert!(s.outcome.wounds_to_defender <= s.attack.successes());
        if let Some(g) = s.guardian {
            prop_assert!(s.outcome.wounds_to_guardian <= g.incoming);
        }
    }

    #[test]
    fn resolution_is_deterministic(ctx in context(), seed in any::<u64>()) {
        let a = run_steps(&ctx, &mut Dice::from_seed(seed));
        let b = run_steps(&ctx, &mut Dice::from_seed(seed));
        prop_assert_eq!(a, b);
    }
}

#[test]
fn chain_ends_clamp() {
    assert_eq!(AttackColor::Red.upgrade(), AttackColor::Red);
    assert_eq!(AttackColor::White.downgrade(), AttackColor::White);
    assert_eq!(AttackColor::White.upgrade(), AttackColor::Black);
    assert_eq!(DefenseColor::Red.upgrade(), DefenseColor::Red);
    assert_eq!(DefenseColor::Red.downgrade(), DefenseColor::White);
}
