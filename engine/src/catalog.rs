//! Keyword catalog.
//!
//! Each keyword family is a pure function over a face tally and the shared
//! [`Budget`], taking both by value and handing both back. The pipeline decides
//! when each one runs; this module only knows what each one does and which
//! attack types it applies to.

use crate::dice::{AttackFaces, DefenseFaces};
use crate::profile::{AttackSurge, AttackType, DefenseSurge};

/// Attack types a keyword applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reach {
    Ranged,
    Melee,
}

/// Keywords that only apply to some attack types. Every other keyword
/// applies to all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    CoverX,
    Backup,
    SoresuMastery,
    Deflect,
    MakashiMastery,
    JarKaiMastery,
    Duelist,
    DjemSoMastery,
    ImmuneMeleePierce,
}

impl Keyword {
    pub const fn reach(self) -> Reach {
        use Keyword::*;
        match self {
            CoverX | Backup | SoresuMastery | Deflect => Reach::Ranged,
            MakashiMastery | JarKaiMastery | Duelist | DjemSoMastery | ImmuneMeleePierce => {
                Reach::Melee
            }
        }
    }

    /// Attack-type eligibility filter.
    pub fn active(self, attack_type: AttackType) -> bool {
        match self.reach() {
            Reach::Ranged => attack_type.allows_ranged(),
            Reach::Melee => attack_type.allows_melee(),
        }
    }
}

/// Consumable resources shared across the steps of one resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Budget {
    pub aim: u32,
    pub aims_spent: u32,
    pub attacker_surge: u32,
    pub attacker_dodge: u32,
    pub dodge: u32,
    pub dodge_spent: u32,
    pub defender_surge: u32,
    pub shields: u32,
    pub pierce: u32,
    pub pierce_total: u32,
    pub pierce_spent: u32,
}

/// Take up to `want` from `have`, returning what was actually taken.
pub fn spend(have: &mut u32, want: u32) -> u32 {
    let n = want.min(*have);
    *have -= n;
    n
}

pub fn spray(pool: [u32; 3], miniatures: u32) -> [u32; 3] {
    let m = miniatures.max(1);
    pool.map(|n| n.saturating_mul(m))
}

/// Makashi Mastery: Pierce -1 in exchange for waiving Immune: Pierce and Impervious.
pub fn makashi_mastery(mut budget: Budget) -> (Budget, bool) {
    if budget.pierce == 0 {
        return (budget, false);
    }
    budget.pierce -= 1;
    budget.pierce_total = budget.pierce_total.saturating_sub(1);
    (budget, true)
}

pub fn attack_surge_chart(mut faces: AttackFaces, chart: AttackSurge) -> AttackFaces {
    match chart {
        AttackSurge::Blank => {}
        AttackSurge::Hit => faces.hit += std::mem::take(&mut faces.surge),
        AttackSurge::Crit => faces.crit += std::mem::take(&mut faces.surge),
    }
    faces
}

pub fn attack_surge_tokens(mut faces: AttackFaces, mut budget: Budget) -> (AttackFaces, Budget) {
    let n = spend(&mut budget.attacker_surge, faces.surge);
    faces.surge -= n;
    faces.hit += n;
    (faces, budget)
}

/// Critical X: up to X surges become crits.
pub fn critical(mut faces: AttackFaces, x: u32) -> AttackFaces {
    let n = x.min(faces.surge);
    faces.surge -= n;
    faces.crit += n;
    faces
}

/// Jar'Kai Mastery: each spent dodge token improves one result.
pub fn jar_kai_mastery(mut faces: AttackFaces, mut budget: Budget) -> (AttackFaces, Budget) {
    while budget.attacker_dodge > 0 {
        if faces.surge > 0 {
            faces.surge -= 1;
            faces.crit += 1;
        } else if faces.blank > 0 {
            faces.blank -= 1;
            faces.hit += 1;
        } else if faces.hit > 0 {
            faces.hit -= 1;
            faces.crit += 1;
        } else {
            break;
        }
        budget.attacker_dodge -= 1;
    }
    (faces, budget)
}

/// Surges no conversion reached are blanks from here on.
pub fn drop_attack_surges(mut faces: AttackFaces) -> AttackFaces {
    faces.blank += std::mem::take(&mut faces.surge);
    faces
}

/// Dodge tokens cancel hits, then crits with Outmaneuver.
pub fn dodge(
    mut faces: AttackFaces,
    mut budget: Budget,
    outmaneuver: bool,
) -> (AttackFaces, Budget) {
    let hits = spend(&mut budget.dodge, faces.hit);
    faces.hit -= hits;
    budget.dodge_spent += hits;
    if outmaneuver {
        let crits = spend(&mut budget.dodge, faces.crit);
        faces.crit -= crits;
        budget.dodge_spent += crits;
    }
    (faces, budget)
}

/// Ion X: flips one shield per hit or crit, up to X, before shields are used.
pub fn ion(faces: AttackFaces, mut budget: Budget, x: u32) -> Budget {
    spend(&mut budget.shields, x.min(faces.successes()));
    budget
}

/// Armor cancels every hit; Armor X cancels up to X.
pub fn armor(mut faces: AttackFaces, armor: bool, armor_x: u32) -> AttackFaces {
    let cap = if armor { faces.hit } else { armor_x };
    faces.hit -= cap.min(faces.hit);
    faces
}

/// Impact X: up to X hits become crits, only against an armored defender.
pub fn impact(mut faces: AttackFaces, x: u32, armored: bool) -> AttackFaces {
    if armored {
        let n = x.min(faces.hit);
        faces.hit -= n;
        faces.crit += n;
    }
    faces
}

/// Shield tokens cancel crits first, then hits.
pub fn shields(mut faces: AttackFaces, mut budget: Budget) -> (AttackFaces, Budget) {
    let crits = spend(&mut budget.shields, faces.crit);
    faces.crit -= crits;
    let hits = spend(&mut budget.shields, faces.hit);
    faces.hit -= hits;
    (faces, budget)
}

pub const BACKUP_CANCELS: u32 = 2;

pub fn backup(mut faces: AttackFaces) -> AttackFaces {
    faces.hit -= BACKUP_CANCELS.min(faces.hit);
    faces
}

pub fn criticals_to_hits(mut faces: AttackFaces) -> AttackFaces {
    faces.hit += std::mem::take(&mut faces.crit);
    faces
}

/// Ram X: up to X results become crits, blanks before hits.
pub fn ram(mut faces: AttackFaces, x: u32) -> AttackFaces {
    let blanks = x.min(faces.blank);
    faces.blank -= blanks;
    let hits = (x - blanks).min(faces.hit);
    faces.hit -= hits;
    faces.crit += blanks + hits;
    faces
}

/// Lethal X: leftover aim tokens buy Pierce 1 each, up to X.
pub fn lethal(mut budget: Budget, x: u32) -> Budget {
    let n = spend(&mut budget.aim, x);
    budget.aims_spent += n;
    budget.pierce = budget.pierce.saturating_add(n);
    budget.pierce_total = budget.pierce_total.saturating_add(n);
    budget
}

/// Duelist: spending one more aim token buys Pierce 1. Tokens already spent
/// on rerolls or Lethal do not count.
pub fn duelist(mut budget: Budget) -> Budget {
    if spend(&mut budget.aim, 1) == 1 {
        budget.aims_spent += 1;
        budget.pierce = budget.pierce.saturating_add(1);
        budget.pierce_total = budget.pierce_total.saturating_add(1);
    }
    budget
}

pub fn defense_surge_chart(mut faces: DefenseFaces, chart: DefenseSurge) -> DefenseFaces {
    if chart == DefenseSurge::Block {
        faces.block += std::mem::take(&mut faces.surge);
    }
    faces
}

pub fn defense_surge_tokens(
    mut faces: DefenseFaces,
    mut budget: Budget,
) -> (DefenseFaces, Budget) {
    let n = spend(&mut budget.defender_surge, faces.surge);
    faces.surge -= n;
    faces.block += n;
    (faces, budget)
}

/// A "gains surge to block" grant, such as Deflect or Block.
pub fn surge_to_block(mut faces: DefenseFaces) -> DefenseFaces {
    faces.block += std::mem::take(&mut faces.surge);
    faces
}

pub fn drop_defense_surges(mut faces: DefenseFaces) -> DefenseFaces {
    faces.blank += std::mem::take(&mut faces.surge);
    faces
}

/// Pierce cancels blocks from whatever budget is left; cancelled blocks count as blanks.
pub fn pierce(mut faces: DefenseFaces, mut budget: Budget) -> (DefenseFaces, Budget) {
    let n = spend(&mut budget.pierce, faces.block);
    faces.block -= n;
    faces.blank += n;
    budget.pierce_spent += n;
    (faces, budget)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn faces(blank: u32, hit: u32, crit: u32, surge: u32) -> AttackFaces {
        AttackFaces {
            blank,
            hit,
            crit,
            surge,
        }
    }

    #[test]
    fn ranged_keywords_are_off_in_melee() {
        assert!(!Keyword::CoverX.active(AttackType::Melee));
        assert!(!Keyword::Backup.active(AttackType::Overrun));
        assert!(Keyword::CoverX.active(AttackType::All));
        assert!(Keyword::DjemSoMastery.active(AttackType::Melee));
        assert!(!Keyword::DjemSoMastery.active(AttackType::Ranged));
        assert!(!Keyword::Duelist.active(AttackType::Overrun));
    }

    #[test]
    fn spend_clamps_to_remaining() {
        let mut have = 2;
        assert_eq!(spend(&mut have, 5), 2);
        assert_eq!(have, 0);
        assert_eq!(spend(&mut have, 1), 0);
    }

    #[test]
    fn ram_prefers_blanks() {
        assert_eq!(ram(faces(1, 3, 0, 0), 2), faces(0, 2, 2, 0));
    }

    #[test]
    fn armor_x_caps_cancellations() {
        assert_eq!(armor(faces(0, 4, 1, 0), false, 2), faces(0, 2, 1, 0));
        assert_eq!(armor(faces(0, 4, 1, 0), true, 0), faces(0, 0, 1, 0));
    }

    #[test]
    fn impact_needs_armor() {
        assert_eq!(impact(faces(0, 3, 0, 0), 2, false), faces(0, 3, 0, 0));
        assert_eq!(impact(faces(0, 3, 0, 0), 2, true), faces(0, 1, 2, 0));
    }

    #[test]
    fn jar_kai_improves_best_target_first() {
        let budget = Budget {
            attacker_dodge: 3,
            ..Budget::default()
        };
        let (out, budget) = jar_kai_mastery(faces(1, 1, 0, 1), budget);
        assert_eq!(out, faces(0, 1, 2, 0));
        assert_eq!(budget.attacker_dodge, 0);
    }

    #[test]
    fn duelist_pays_with_its_own_aim() {
        let fresh = duelist(Budget {
            aim: 2,
            ..Budget::default()
        });
        assert_eq!((fresh.aim, fresh.aims_spent, fresh.pierce), (1, 1, 1));

        // a token already spent elsewhere does not activate it
        let used = duelist(Budget {
            aim: 0,
            aims_spent: 1,
            ..Budget::default()
        });
        assert_eq!((used.aims_spent, used.pierce, used.pierce_total), (1, 0, 0));

        let broke = duelist(Budget::default());
        assert_eq!(broke.pierce, 0);
    }

    #[test]
    fn lethal_saturates_pierce() {
        let budget = lethal(
            Budget {
                aim: 1,
                pierce: u32::MAX,
                pierce_total: u32::MAX,
                ..Budget::default()
            },
            1,
        );
        assert_eq!((budget.aim, budget.pierce_total), (0, u32::MAX));
    }

    #[test]
    fn pierce_turns_blocks_into_blanks() {
        let budget = Budget {
            pierce: 1,
            pierce_total: 1,
            ..Budget::default()
        };
        let def = DefenseFaces {
            blank: 0,
            block: 2,
            surge: 0,
        };
        let (out, budget) = pierce(def, budget);
        assert_eq!((out.block, out.blank), (1, 1));
        assert_eq!((budget.pierce, budget.pierce_spent), (0, 1));
    }
}
