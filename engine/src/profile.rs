use serde::{Deserialize, Serialize};

use crate::dice::{AttackColor, DefenseColor, DieShifts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackType {
    /// Unspecified; ranged-only and melee-only keywords both apply.
    All,
    Ranged,
    Melee,
    Overrun,
}

impl AttackType {
    pub fn allows_ranged(self) -> bool {
        matches!(self, Self::All | Self::Ranged)
    }

    pub fn allows_melee(self) -> bool {
        matches!(self, Self::All | Self::Melee)
    }
}

/// What an attack surge becomes under the attacker's chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackSurge {
    Blank,
    Hit,
    Crit,
}

/// What a defense surge becomes under the defender's chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefenseSurge {
    Blank,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverCategory {
    #[default]
    None,
    Light,
    Heavy,
}

impl CoverCategory {
    pub const fn value(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Light => 1,
            Self::Heavy => 2,
        }
    }
}

/// Which dice an aim token is allowed to reroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RerollStrategy {
    /// Blanks and surges nothing will convert.
    #[default]
    Conservative,
    /// Also hits that Armor would cancel, hoping for crits.
    CritFishing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AttackerProfile {
    #[serde(default)]
    pub white: u32,
    #[serde(default)]
    pub black: u32,
    #[serde(default)]
    pub red: u32,
    pub surge: AttackSurge,
    #[serde(default)]
    pub aim: u32,
    #[serde(default)]
    pub surge_tokens: u32,
    /// The attacker's own dodge tokens; only Jar'Kai Mastery spends them.
    #[serde(default)]
    pub dodge_tokens: u32,
    #[serde(default)]
    pub precise: u32,
    #[serde(default)]
    pub marksman: bool,
    #[serde(default)]
    pub critical: u32,
    #[serde(default)]
    pub jar_kai_mastery: bool,
    #[serde(default)]
    pub pierce: u32,
    #[serde(default)]
    pub lethal: u32,
    #[serde(default)]
    pub duelist: bool,
    #[serde(default)]
    pub makashi_mastery: bool,
    #[serde(default)]
    pub impact: u32,
    #[serde(default)]
    pub ram: u32,
    #[serde(default)]
    pub moved: bool,
    #[serde(default)]
    pub ion: u32,
    #[serde(default)]
    pub sharpshooter: u32,
    #[serde(default)]
    pub blast: bool,
    #[serde(default)]
    pub death_from_above: bool,
    #[serde(default)]
    pub high_velocity: bool,
    #[serde(default)]
    pub spray: bool,
    #[serde(default)]
    pub immune_deflect: bool,
    #[serde(default)]
    pub reroll_strategy: RerollStrategy,
    #[serde(default)]
    pub attack_shifts: DieShifts,
    #[serde(default)]
    pub defense_shifts: DieShifts,
}

impl AttackerProfile {
    /// An attacker with an empty pool and every keyword off.
    pub fn new(surge: AttackSurge) -> Self {
        Self {
            white: 0,
            black: 0,
            red: 0,
            surge,
            aim: 0,
            surge_tokens: 0,
            dodge_tokens: 0,
            precise: 0,
            marksman: false,
            critical: 0,
            jar_kai_mastery: false,
            pierce: 0,
            lethal: 0,
            duelist: false,
            makashi_mastery: false,
            impact: 0,
            ram: 0,
            moved: false,
            ion: 0,
            sharpshooter: 0,
            blast: false,
            death_from_above: false,
            high_velocity: false,
            spray: false,
            immune_deflect: false,
            reroll_strategy: RerollStrategy::Conservative,
            attack_shifts: DieShifts::default(),
            defense_shifts: DieShifts::default(),
        }
    }

    /// Pool counts indexed by chain rank.
    pub fn pool(&self) -> [u32; 3] {
        let mut counts = [0; 3];
        counts[AttackColor::White.rank()] = self.white;
        counts[AttackColor::Black.rank()] = self.black;
        counts[AttackColor::Red.rank()] = self.red;
        counts
    }
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DefenderProfile {
    pub die: DefenseColor,
    pub surge: DefenseSurge,
    #[serde(default)]
    pub cover: CoverCategory,
    #[serde(default = "one")]
    pub miniatures: u32,
    /// 0 means unknown; such a unit is never treated as eliminated.
    #[serde(default)]
    pub wounds_per_miniature: u32,
    #[serde(default)]
    pub dodge_tokens: u32,
    #[serde(default)]
    pub surge_tokens: u32,
    #[serde(default)]
    pub shield_tokens: u32,
    #[serde(default)]
    pub smoke_tokens: u32,
    #[serde(default)]
    pub suppression_tokens: u32,
    #[serde(default)]
    pub suppressed: bool,
    #[serde(default)]
    pub cover_bonus: u32,
    #[serde(default)]
    pub low_profile: bool,
    #[serde(default)]
    pub cover_die: Option<DefenseColor>,
    #[serde(default)]
    pub immune_blast: bool,
    #[serde(default)]
    pub outmaneuver: bool,
    #[serde(default)]
    pub armor: bool,
    #[serde(default)]
    pub armor_x: u32,
    #[serde(default)]
    pub backup: bool,
    #[serde(default)]
    pub criticals_to_hits: bool,
    #[serde(default)]
    pub uncanny_luck: u32,
    #[serde(default)]
    pub soresu_mastery: bool,
    #[serde(default)]
    pub deflect: bool,
    #[serde(default)]
    pub shien_mastery: bool,
    #[serde(default)]
    pub block: bool,
    #[serde(default)]
    pub djem_so_mastery: bool,
    #[serde(default)]
    pub danger_sense: u32,
    #[serde(default)]
    pub impervious: bool,
    #[serde(default)]
    pub immune_pierce: bool,
    #[serde(default)]
    pub immune_melee_pierce: bool,
    #[serde(default)]
    pub attack_shifts: DieShifts,
    #[serde(default)]
    pub defense_shifts: DieShifts,
    #[serde(default)]
    pub guardian: Option<GuardianProfile>,
}

impl DefenderProfile {
    /// A single-miniature defender with no tokens, cover or keywords.
    pub fn new(die: DefenseColor, surge: DefenseSurge) -> Self {
        Self {
            die,
            surge,
            cover: CoverCategory::None,
            miniatures: 1,
            wounds_per_miniature: 0,
            dodge_tokens: 0,
            surge_tokens: 0,
            shield_tokens: 0,
            smoke_tokens: 0,
            suppression_tokens: 0,
            suppressed: false,
            cover_bonus: 0,
            low_profile: false,
            cover_die: None,
            immune_blast: false,
            outmaneuver: false,
            armor: false,
            armor_x: 0,
            backup: false,
            criticals_to_hits: false,
            uncanny_luck: 0,
            soresu_mastery: false,
            deflect: false,
            shien_mastery: false,
            block: false,
            djem_so_mastery: false,
            danger_sense: 0,
            impervious: false,
            immune_pierce: false,
            immune_melee_pierce: false,
            attack_shifts: DieShifts::default(),
            defense_shifts: DieShifts::default(),
            guardian: None,
        }
    }

    pub fn has_armor(&self) -> bool {
        self.armor || self.armor_x > 0
    }

    /// Total wounds the unit can take, if known.
    pub fn health(&self) -> Option<u32> {
        match self.miniatures.saturating_mul(self.wounds_per_miniature) {
            0 => None,
            n => Some(n),
        }
    }
}

/// A nearby unit that takes hits meant for the defender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GuardianProfile {
    /// Guardian X: hits it may intercept.
    pub guardian: u32,
    pub die: DefenseColor,
    pub surge: DefenseSurge,
    #[serde(default)]
    pub surge_tokens: u32,
    #[serde(default)]
    pub uncanny_luck: u32,
    #[serde(default)]
    pub soresu_mastery: bool,
    #[serde(default)]
    pub impervious: bool,
    #[serde(default)]
    pub immune_pierce: bool,
    #[serde(default)]
    pub immune_melee_pierce: bool,
    #[serde(default)]
    pub defense_shifts: DieShifts,
}

impl GuardianProfile {
    pub fn new(guardian: u32, die: DefenseColor, surge: DefenseSurge) -> Self {
        Self {
            guardian,
            die,
            surge,
            surge_tokens: 0,
            uncanny_luck: 0,
            soresu_mastery: false,
            impervious: false,
            immune_pierce: false,
            immune_melee_pierce: false,
            defense_shifts: DieShifts::default(),
        }
    }
}

/// Everything one resolution needs. Immutable for the duration of an attack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AttackContext {
    pub attacker: AttackerProfile,
    pub defender: DefenderProfile,
    pub attack_type: AttackType,
    /// Point costs, used only for efficiency ratios.
    #[serde(default)]
    pub attacker_points: Option<u32>,
    #[serde(default)]
    pub defender_points: Option<u32>,
}

impl AttackContext {
    pub fn new(
        attacker: AttackerProfile,
        defender: DefenderProfile,
        attack_type: AttackType,
    ) -> Self {
        Self {
            attacker,
            defender,
            attack_type,
            attacker_points: None,
            defender_points: None,
        }
    }
}
