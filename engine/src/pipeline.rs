//! One attack, start to finish.
//!
//! The resolution is a fixed list of named steps folded over a [`TrialState`].
//! Every step takes the state by value and returns it; the shared [`Budget`]
//! rides inside the state, so a run is a pure function of the context and the
//! dice it is handed.

use serde::Serialize;
use tracing::trace;

use crate::catalog::{self, Budget, Keyword};
use crate::cover::{determine_cover_value, roll_cover_pool};
use crate::dice::{
    AttackColor, AttackFaces, AttackRoll, DefenseColor, DefenseFaces, DefenseRoll, DiceSource,
    DieShifts, shift_phases,
};
use crate::profile::{
    AttackContext, AttackSurge, AttackType, DefenderProfile, DefenseSurge, GuardianProfile,
    RerollStrategy,
};

/// What one resolved attack did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrialOutcome {
    pub wounds_to_defender: u32,
    pub wounds_to_guardian: u32,
    pub reflection_wounds: u32,
    pub secondary_wounds: u32,
    pub defender_suppressed: bool,
}

/// State of one defense roll (the Guardian's or the defender's).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefenseState {
    /// Hits and crits this roll answers.
    pub incoming: u32,
    pub fresh: DefenseRoll,
    pub rerolled: DefenseRoll,
    pub faces: DefenseFaces,
    /// Surges in the roll before any conversion.
    pub raw_surges: u32,
    /// The Deflect grant was active and the roll had a surge.
    pub deflect_surged: bool,
    /// The Block grant was active and the roll had a surge.
    pub block_surged: bool,
}

impl DefenseState {
    fn new(incoming: u32) -> Self {
        Self {
            incoming,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrialState {
    pub pool: [u32; 3],
    pub roll: AttackRoll,
    pub attack: AttackFaces,
    pub budget: Budget,
    /// Makashi Mastery switched off Immune: Pierce and Impervious.
    pub immunities_waived: bool,
    pub rolled_hit: bool,
    pub hits_before_cover: u32,
    pub hits_after_dodge: u32,
    pub cover_value: u8,
    pub dodge_spent: bool,
    pub guardian: Option<DefenseState>,
    pub defense: DefenseState,
    pub outcome: TrialOutcome,
}

impl TrialState {
    pub fn new(ctx: &AttackContext) -> Self {
        let a = &ctx.attacker;
        let d = &ctx.defender;
        Self {
            budget: Budget {
                aim: a.aim,
                attacker_surge: a.surge_tokens,
                attacker_dodge: a.dodge_tokens,
                dodge: d.dodge_tokens,
                defender_surge: d.surge_tokens,
                shields: d.shield_tokens,
                pierce: a.pierce,
                pierce_total: a.pierce,
                ..Budget::default()
            },
            ..Self::default()
        }
    }
}

pub type StepFn = fn(&AttackContext, &mut dyn DiceSource, TrialState) -> TrialState;

pub struct Step {
    pub name: &'static str,
    pub run: StepFn,
}

/// The resolution order. Never reordered at runtime.
pub const STEPS: [Step; 14] = [
    Step { name: "form_pool", run: form_pool },
    Step { name: "shift_attack_dice", run: shift_attack_dice },
    Step { name: "roll_attack", run: roll_attack },
    Step { name: "reroll_attack", run: reroll_attack },
    Step { name: "convert_attack_surges", run: convert_attack_surges },
    Step { name: "cover_and_dodge", run: cover_and_dodge },
    Step { name: "modify_attack", run: modify_attack },
    Step { name: "guardian", run: guardian },
    Step { name: "gather_defense", run: gather_defense },
    Step { name: "reroll_defense", run: reroll_defense },
    Step { name: "convert_defense_surges", run: convert_defense_surges },
    Step { name: "modify_defense", run: modify_defense },
    Step { name: "compare", run: compare },
    Step { name: "suppression", run: suppression },
];

pub fn step_names() -> Vec<&'static str> {
    STEPS.iter().map(|s| s.name).collect()
}

/// Run every step and return the final state.
pub fn run_steps(ctx: &AttackContext, dice: &mut dyn DiceSource) -> TrialState {
    let mut state = TrialState::new(ctx);
    for step in STEPS.iter() {
        state = (step.run)(ctx, dice, state);
        trace!(
            step = step.name,
            attack = ?state.attack,
            budget = ?state.budget,
            "step resolved"
        );
    }
    state
}

/// Resolve one attack.
pub fn resolve_attack(ctx: &AttackContext, dice: &mut dyn DiceSource) -> TrialOutcome {
    run_steps(ctx, dice).outcome
}

fn form_pool(ctx: &AttackContext, _dice: &mut dyn DiceSource, mut s: TrialState) -> TrialState {
    let a = &ctx.attacker;
    let d = &ctx.defender;
    s.pool = a.pool();
    if a.spray {
        s.pool = catalog::spray(s.pool, d.miniatures);
    }
    if a.makashi_mastery
        && Keyword::MakashiMastery.active(ctx.attack_type)
        && (d.immune_pierce || d.impervious)
    {
        let (budget, waived) = catalog::makashi_mastery(s.budget);
        s.budget = budget;
        s.immunities_waived = waived;
    }
    s
}

fn shift_attack_dice(
    ctx: &AttackContext,
    _dice: &mut dyn DiceSource,
    mut s: TrialState,
) -> TrialState {
    s.pool = shift_phases(s.pool, ctx.attacker.attack_shifts, ctx.defender.attack_shifts);
    s
}

fn roll_attack(_ctx: &AttackContext, dice: &mut dyn DiceSource, mut s: TrialState) -> TrialState {
    for (rank, color) in AttackColor::CHAIN.into_iter().enumerate() {
        s.roll.by_color[rank] = dice.roll_attack(color, s.pool[rank]);
    }
    s.attack = s.roll.totals();
    s
}

/// Surges the later conversions will turn into something.
fn attack_surge_capacity(ctx: &AttackContext, budget: &Budget) -> u32 {
    let a = &ctx.attacker;
    if a.surge != AttackSurge::Blank {
        return u32::MAX;
    }
    let jar_kai = if a.jar_kai_mastery && Keyword::JarKaiMastery.active(ctx.attack_type) {
        budget.attacker_dodge
    } else {
        0
    };
    budget
        .attacker_surge
        .saturating_add(a.critical)
        .saturating_add(jar_kai)
}

/// Hits Armor will cancel. Armor runs before Impact, so Impact saves none of them.
fn hits_lost_to_armor(defender: &DefenderProfile, hits: u32) -> u32 {
    if defender.armor {
        hits
    } else {
        defender.armor_x.min(hits)
    }
}

/// Dice one aim token would reroll, per colour, red first.
fn attack_reroll_picks(ctx: &AttackContext, s: &TrialState, per_token: u32) -> [AttackFaces; 3] {
    let totals = s.roll.totals();
    let mut picks = [AttackFaces::default(); 3];
    let mut left = per_token;

    let mut surges = totals
        .surge
        .saturating_sub(attack_surge_capacity(ctx, &s.budget));
    let mut hits = match ctx.attacker.reroll_strategy {
        RerollStrategy::Conservative => 0,
        RerollStrategy::CritFishing => hits_lost_to_armor(&ctx.defender, totals.hit),
    };

    for rank in (0..3).rev() {
        let n = left.min(s.roll.by_color[rank].blank);
        picks[rank].blank = n;
        left -= n;
    }
    for rank in (0..3).rev() {
        let n = left.min(surges).min(s.roll.by_color[rank].surge);
        picks[rank].surge = n;
        left -= n;
        surges -= n;
    }
    for rank in (0..3).rev() {
        let n = left.min(hits).min(s.roll.by_color[rank].hit);
        picks[rank].hit = n;
        left -= n;
        hits -= n;
    }
    picks
}

/// Marksman: one aim token changes one result instead of rerolling.
fn marksman(ctx: &AttackContext, mut s: TrialState) -> TrialState {
    while s.budget.aim > 0 {
        let totals = s.roll.totals();
        let excess_surges = totals
            .surge
            .saturating_sub(attack_surge_capacity(ctx, &s.budget));
        let fishing = ctx.attacker.reroll_strategy == RerollStrategy::CritFishing
            && hits_lost_to_armor(&ctx.defender, totals.hit) > 0;

        let Some(rank) = (0..3).rev().find(|&r| {
            let f = &s.roll.by_color[r];
            f.blank > 0 || (excess_surges > 0 && f.surge > 0) || (fishing && f.hit > 0)
        }) else {
            break;
        };
        let f = &mut s.roll.by_color[rank];
        if f.blank > 0 {
            f.blank -= 1;
            f.hit += 1;
        } else if excess_surges > 0 && f.surge > 0 {
            f.surge -= 1;
            f.hit += 1;
        } else {
            f.hit -= 1;
            f.crit += 1;
        }
        s.budget.aim -= 1;
        s.budget.aims_spent += 1;
    }
    s
}

fn reroll_attack(ctx: &AttackContext, dice: &mut dyn DiceSource, mut s: TrialState) -> TrialState {
    if ctx.attacker.marksman {
        s = marksman(ctx, s);
    }

    let per_token = 2u32.saturating_add(ctx.attacker.precise);
    while s.budget.aim > 0 {
        let picks = attack_reroll_picks(ctx, &s, per_token);
        if picks.iter().all(|p| p.dice() == 0) {
            break;
        }
        s.budget.aim -= 1;
        s.budget.aims_spent += 1;
        for (rank, color) in AttackColor::CHAIN.into_iter().enumerate() {
            let pick = picks[rank];
            if pick.dice() == 0 {
                continue;
            }
            let kept = &mut s.roll.by_color[rank];
            kept.blank -= pick.blank;
            kept.surge -= pick.surge;
            kept.hit -= pick.hit;
            *kept = kept.merge(dice.roll_attack(color, pick.dice()));
        }
    }
    s.attack = s.roll.totals();
    s
}

fn convert_attack_surges(
    ctx: &AttackContext,
    _dice: &mut dyn DiceSource,
    mut s: TrialState,
) -> TrialState {
    let a = &ctx.attacker;
    let mut f = catalog::attack_surge_chart(s.attack, a.surge);
    (f, s.budget) = catalog::attack_surge_tokens(f, s.budget);
    f = catalog::critical(f, a.critical);
    if a.jar_kai_mastery && Keyword::JarKaiMastery.active(ctx.attack_type) {
        (f, s.budget) = catalog::jar_kai_mastery(f, s.budget);
    }
    s.attack = catalog::drop_attack_surges(f);
    s.rolled_hit = s.attack.successes() > 0;
    s
}

/// Deflect and Block only work if a dodge token is spent.
fn wants_dodge_trigger(ctx: &AttackContext) -> bool {
    let d = &ctx.defender;
    (d.deflect && Keyword::Deflect.active(ctx.attack_type)) || d.block
}

fn cover_and_dodge(
    ctx: &AttackContext,
    dice: &mut dyn DiceSource,
    mut s: TrialState,
) -> TrialState {
    let d = &ctx.defender;
    s.hits_before_cover = s.attack.hit;
    s.cover_value = determine_cover_value(ctx);
    let cancelled = roll_cover_pool(s.attack.hit, s.cover_value, d.low_profile, d.cover_die, dice);
    s.attack.hit -= cancelled;

    if !ctx.attacker.high_velocity {
        (s.attack, s.budget) = catalog::dodge(s.attack, s.budget, d.outmaneuver);
        if s.budget.dodge_spent == 0
            && s.attack.successes() > 0
            && wants_dodge_trigger(ctx)
            && catalog::spend(&mut s.budget.dodge, 1) == 1
        {
            s.budget.dodge_spent = 1;
        }
    }
    s.dodge_spent = s.budget.dodge_spent > 0;
    s.hits_after_dodge = s.attack.hit;
    s
}

fn modify_attack(
    ctx: &AttackContext,
    _dice: &mut dyn DiceSource,
    mut s: TrialState,
) -> TrialState {
    let a = &ctx.attacker;
    let d = &ctx.defender;
    let mut f = s.attack;

    s.budget = catalog::ion(f, s.budget, a.ion);
    f = catalog::armor(f, d.armor, d.armor_x);
    f = catalog::impact(f, a.impact, d.has_armor());
    (f, s.budget) = catalog::shields(f, s.budget);
    if d.backup && Keyword::Backup.active(ctx.attack_type) {
        f = catalog::backup(f);
    }
    if d.criticals_to_hits {
        f = catalog::criticals_to_hits(f);
    }
    if a.moved {
        f = catalog::ram(f, a.ram);
    }
    s.budget = catalog::lethal(s.budget, a.lethal);
    if a.duelist && Keyword::Duelist.active(ctx.attack_type) {
        s.budget = catalog::duelist(s.budget);
    }

    s.attack = f;
    s
}

/// Defensive keywords of whoever is rolling defense dice.
#[derive(Debug, Clone, Copy)]
struct DefenderView {
    die: DefenseColor,
    surge: DefenseSurge,
    uncanny_luck: u32,
    soresu_mastery: bool,
    deflect: bool,
    block: bool,
    danger_sense: u32,
    suppression_tokens: u32,
    impervious: bool,
    immune_pierce: bool,
    immune_melee_pierce: bool,
    defense_shifts: DieShifts,
}

impl DefenderView {
    fn defender(d: &DefenderProfile) -> Self {
        Self {
            die: d.die,
            surge: d.surge,
            uncanny_luck: d.uncanny_luck,
            soresu_mastery: d.soresu_mastery,
            deflect: d.deflect,
            block: d.block,
            danger_sense: d.danger_sense,
            suppression_tokens: d.suppression_tokens,
            impervious: d.impervious,
            immune_pierce: d.immune_pierce,
            immune_melee_pierce: d.immune_melee_pierce,
            defense_shifts: d.defense_shifts,
        }
    }

    fn guardian(g: &GuardianProfile) -> Self {
        Self {
            die: g.die,
            surge: g.surge,
            uncanny_luck: g.uncanny_luck,
            soresu_mastery: g.soresu_mastery,
            deflect: false,
            block: false,
            danger_sense: 0,
            suppression_tokens: 0,
            impervious: g.impervious,
            immune_pierce: g.immune_pierce,
            immune_melee_pierce: g.immune_melee_pierce,
            defense_shifts: g.defense_shifts,
        }
    }
}

struct Defense {
    attack_type: AttackType,
    view: DefenderView,
    attacker_shifts: DieShifts,
    dodge_spent: bool,
    immunities_waived: bool,
}

impl Defense {
    fn deflect_active(&self) -> bool {
        self.view.deflect && self.dodge_spent && Keyword::Deflect.active(self.attack_type)
    }

    fn block_active(&self) -> bool {
        self.view.block && self.dodge_spent
    }

    /// Surges the conversions will turn into blocks.
    fn surge_capacity(&self, budget: &Budget) -> u32 {
        if self.view.surge == DefenseSurge::Block || self.deflect_active() || self.block_active() {
            u32::MAX
        } else {
            budget.defender_surge
        }
    }
}

type DefenseStep =
    fn(&Defense, &mut dyn DiceSource, DefenseState, Budget) -> (DefenseState, Budget);

const DEFENSE_STEPS: [DefenseStep; 4] = [
    defend_gather,
    defend_reroll,
    defend_convert,
    defend_pierce,
];

fn defend_gather(
    def: &Defense,
    dice: &mut dyn DiceSource,
    mut st: DefenseState,
    budget: Budget,
) -> (DefenseState, Budget) {
    if st.incoming == 0 {
        return (st, budget);
    }
    let view = &def.view;
    let mut extra = view.suppression_tokens.min(view.danger_sense);
    if view.impervious && !def.immunities_waived {
        extra = extra.saturating_add(budget.pierce_total);
    }

    let mut pool = [0u32; 2];
    pool[view.die.rank()] = st.incoming.saturating_add(extra);
    let pool = shift_phases(pool, def.attacker_shifts, view.defense_shifts);
    for (rank, color) in DefenseColor::CHAIN.into_iter().enumerate() {
        st.fresh.by_color[rank] = dice.roll_defense(color, pool[rank]);
    }
    st.faces = st.fresh.totals();
    (st, budget)
}

/// Take up to `limit` failed dice out of `fresh`, red first.
fn take_failures(fresh: &mut DefenseRoll, mut limit: u32, mut failed_surges: u32) -> [u32; 2] {
    let mut taken = [0u32; 2];
    for rank in (0..2).rev() {
        let f = &mut fresh.by_color[rank];
        let blanks = limit.min(f.blank);
        f.blank -= blanks;
        limit -= blanks;
        taken[rank] += blanks;
    }
    for rank in (0..2).rev() {
        let f = &mut fresh.by_color[rank];
        let surges = limit.min(failed_surges).min(f.surge);
        f.surge -= surges;
        limit -= surges;
        failed_surges -= surges;
        taken[rank] += surges;
    }
    taken
}

fn reroll_into(dice: &mut dyn DiceSource, rerolled: &mut DefenseRoll, taken: [u32; 2]) {
    for (rank, color) in DefenseColor::CHAIN.into_iter().enumerate() {
        if taken[rank] > 0 {
            let fresh = dice.roll_defense(color, taken[rank]);
            rerolled.by_color[rank] = rerolled.by_color[rank].merge(fresh);
        }
    }
}

/// Each die is rerolled at most once: Uncanny Luck first, then Soresu Mastery.
fn defend_reroll(
    def: &Defense,
    dice: &mut dyn DiceSource,
    mut st: DefenseState,
    budget: Budget,
) -> (DefenseState, Budget) {
    let failed_surges = |fresh: &DefenseRoll| {
        fresh
            .totals()
            .surge
            .saturating_sub(def.surge_capacity(&budget))
    };

    if def.view.uncanny_luck > 0 {
        let surges = failed_surges(&st.fresh);
        let taken = take_failures(&mut st.fresh, def.view.uncanny_luck, surges);
        reroll_into(dice, &mut st.rerolled, taken);
    }
    if def.view.soresu_mastery && Keyword::SoresuMastery.active(def.attack_type) {
        let surges = failed_surges(&st.fresh);
        let taken = take_failures(&mut st.fresh, u32::MAX, surges);
        reroll_into(dice, &mut st.rerolled, taken);
    }
    st.faces = st.fresh.merge(st.rerolled).totals();
    (st, budget)
}

fn defend_convert(
    def: &Defense,
    _dice: &mut dyn DiceSource,
    mut st: DefenseState,
    mut budget: Budget,
) -> (DefenseState, Budget) {
    st.raw_surges = st.faces.surge;
    let mut f = catalog::defense_surge_chart(st.faces, def.view.surge);
    (f, budget) = catalog::defense_surge_tokens(f, budget);
    if def.deflect_active() {
        st.deflect_surged = st.raw_surges > 0;
        f = catalog::surge_to_block(f);
    }
    if def.block_active() {
        st.block_surged = st.raw_surges > 0;
        f = catalog::surge_to_block(f);
    }
    st.faces = catalog::drop_defense_surges(f);
    (st, budget)
}

fn defend_pierce(
    def: &Defense,
    _dice: &mut dyn DiceSource,
    mut st: DefenseState,
    mut budget: Budget,
) -> (DefenseState, Budget) {
    let immune = def.view.immune_pierce && !def.immunities_waived;
    let melee_immune =
        def.view.immune_melee_pierce && Keyword::ImmuneMeleePierce.active(def.attack_type);
    if !immune && !melee_immune {
        (st.faces, budget) = catalog::pierce(st.faces, budget);
    }
    (st, budget)
}

/// Guardian sub-sequence: intercept hits, then run the defense steps with the
/// guardian's own profile against the shared Pierce budget.
fn guardian(ctx: &AttackContext, dice: &mut dyn DiceSource, mut s: TrialState) -> TrialState {
    let Some(g) = ctx.defender.guardian.as_ref() else {
        return s;
    };
    let intercepted = g.guardian.min(s.attack.hit);
    if intercepted == 0 {
        return s;
    }
    s.attack.hit -= intercepted;

    let def = Defense {
        attack_type: ctx.attack_type,
        view: DefenderView::guardian(g),
        attacker_shifts: ctx.attacker.defense_shifts,
        dodge_spent: false,
        immunities_waived: false,
    };
    let mut budget = Budget {
        defender_surge: g.surge_tokens,
        ..s.budget
    };
    let mut st = DefenseState::new(intercepted);
    for step in DEFENSE_STEPS {
        (st, budget) = step(&def, dice, st, budget);
    }

    s.budget.pierce = budget.pierce;
    s.budget.pierce_spent = budget.pierce_spent;
    s.outcome.wounds_to_guardian = intercepted.saturating_sub(st.faces.block);
    s.guardian = Some(st);
    s
}

fn main_defense(ctx: &AttackContext, s: &TrialState) -> Defense {
    Defense {
        attack_type: ctx.attack_type,
        view: DefenderView::defender(&ctx.defender),
        attacker_shifts: ctx.attacker.defense_shifts,
        dodge_spent: s.dodge_spent,
        immunities_waived: s.immunities_waived,
    }
}

fn run_main_defense(
    ctx: &AttackContext,
    dice: &mut dyn DiceSource,
    mut s: TrialState,
    step: DefenseStep,
) -> TrialState {
    let def = main_defense(ctx, &s);
    (s.defense, s.budget) = step(&def, dice, s.defense, s.budget);
    s
}

fn gather_defense(ctx: &AttackContext, dice: &mut dyn DiceSource, mut s: TrialState) -> TrialState {
    s.defense = DefenseState::new(s.attack.successes());
    run_main_defense(ctx, dice, s, defend_gather)
}

fn reroll_defense(ctx: &AttackContext, dice: &mut dyn DiceSource, s: TrialState) -> TrialState {
    run_main_defense(ctx, dice, s, defend_reroll)
}

fn convert_defense_surges(
    ctx: &AttackContext,
    dice: &mut dyn DiceSource,
    s: TrialState,
) -> TrialState {
    run_main_defense(ctx, dice, s, defend_convert)
}

fn modify_defense(ctx: &AttackContext, dice: &mut dyn DiceSource, s: TrialState) -> TrialState {
    run_main_defense(ctx, dice, s, defend_pierce)
}

fn compare(ctx: &AttackContext, _dice: &mut dyn DiceSource, mut s: TrialState) -> TrialState {
    let a = &ctx.attacker;
    let d = &ctx.defender;
    s.outcome.wounds_to_defender = s.attack.successes().saturating_sub(s.defense.faces.block);

    if s.defense.deflect_surged && !a.immune_deflect {
        s.outcome.reflection_wounds = if d.shien_mastery {
            s.defense.raw_surges
        } else {
            1
        };
    }
    if d.djem_so_mastery && Keyword::DjemSoMastery.active(ctx.attack_type) && s.attack.blank > 0 {
        s.outcome.secondary_wounds = 1;
    }
    s
}

fn suppression(ctx: &AttackContext, _dice: &mut dyn DiceSource, mut s: TrialState) -> TrialState {
    let eliminated = ctx
        .defender
        .health()
        .is_some_and(|health| s.outcome.wounds_to_defender >= health);
    s.outcome.defender_suppressed = ctx.attack_type.allows_ranged() && s.rolled_hit && !eliminated;
    s
}
