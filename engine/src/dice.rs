use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

pub const ATTACK_SIDES: u32 = 8;
pub const DEFENSE_SIDES: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackColor {
    White,
    Black,
    Red,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefenseColor {
    White,
    Red,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttackFace {
    Blank,
    Hit,
    Crit,
    Surge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefenseFace {
    Blank,
    Block,
    Surge,
}

impl AttackFace {
    pub const ALL: [AttackFace; 4] = [Self::Blank, Self::Hit, Self::Crit, Self::Surge];
}

impl DefenseFace {
    pub const ALL: [DefenseFace; 3] = [Self::Blank, Self::Block, Self::Surge];
}

impl AttackColor {
    /// Upgrade chain, lowest first.
    pub const CHAIN: [AttackColor; 3] = [Self::White, Self::Black, Self::Red];

    pub const fn rank(self) -> usize {
        match self {
            Self::White => 0,
            Self::Black => 1,
            Self::Red => 2,
        }
    }

    /// Face weights out of 8, in `AttackFace::ALL` order.
    pub const fn faces(self) -> [u32; 4] {
        match self {
            Self::White => [5, 1, 1, 1],
            Self::Black => [3, 3, 1, 1],
            Self::Red => [1, 5, 1, 1],
        }
    }

    pub fn upgrade(self) -> Self {
        Self::CHAIN[(self.rank() + 1).min(Self::CHAIN.len() - 1)]
    }

    pub fn downgrade(self) -> Self {
        Self::CHAIN[self.rank().saturating_sub(1)]
    }
}

impl DefenseColor {
    pub const CHAIN: [DefenseColor; 2] = [Self::White, Self::Red];

    pub const fn rank(self) -> usize {
        match self {
            Self::White => 0,
            Self::Red => 1,
        }
    }

    /// Face weights out of 6, in `DefenseFace::ALL` order.
    pub const fn faces(self) -> [u32; 3] {
        match self {
            Self::White => [4, 1, 1],
            Self::Red => [2, 3, 1],
        }
    }

    pub fn upgrade(self) -> Self {
        Self::CHAIN[(self.rank() + 1).min(Self::CHAIN.len() - 1)]
    }

    pub fn downgrade(self) -> Self {
        Self::CHAIN[self.rank().saturating_sub(1)]
    }
}

fn pick_face<const N: usize>(weights: [u32; N], mut roll: u32) -> usize {
    for (idx, w) in weights.iter().enumerate() {
        if roll < *w {
            return idx;
        }
        roll -= w;
    }
    N - 1
}

/// Roll one attack die.
pub fn roll_attack_die(color: AttackColor, rng: &mut impl Rng) -> AttackFace {
    let idx = pick_face(color.faces(), rng.gen_range(0..ATTACK_SIDES));
    AttackFace::ALL[idx]
}

/// Roll one defense die.
pub fn roll_defense_die(color: DefenseColor, rng: &mut impl Rng) -> DefenseFace {
    let idx = pick_face(color.faces(), rng.gen_range(0..DEFENSE_SIDES));
    DefenseFace::ALL[idx]
}

/// Face tally for a group of attack dice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttackFaces {
    pub blank: u32,
    pub hit: u32,
    pub crit: u32,
    pub surge: u32,
}

impl AttackFaces {
    pub fn add(&mut self, face: AttackFace) {
        match face {
            AttackFace::Blank => self.blank += 1,
            AttackFace::Hit => self.hit += 1,
            AttackFace::Crit => self.crit += 1,
            AttackFace::Surge => self.surge += 1,
        }
    }

    pub fn merge(self, other: AttackFaces) -> AttackFaces {
        AttackFaces {
            blank: self.blank + other.blank,
            hit: self.hit + other.hit,
            crit: self.crit + other.crit,
            surge: self.surge + other.surge,
        }
    }

    pub fn dice(&self) -> u32 {
        self.blank + self.hit + self.crit + self.surge
    }

    pub fn successes(&self) -> u32 {
        self.hit + self.crit
    }
}

/// Face tally for a group of defense dice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DefenseFaces {
    pub blank: u32,
    pub block: u32,
    pub surge: u32,
}

impl DefenseFaces {
    pub fn add(&mut self, face: DefenseFace) {
        match face {
            DefenseFace::Blank => self.blank += 1,
            DefenseFace::Block => self.block += 1,
            DefenseFace::Surge => self.surge += 1,
        }
    }

    pub fn merge(self, other: DefenseFaces) -> DefenseFaces {
        DefenseFaces {
            blank: self.blank + other.blank,
            block: self.block + other.block,
            surge: self.surge + other.surge,
        }
    }

    pub fn dice(&self) -> u32 {
        self.blank + self.block + self.surge
    }
}

/// Rolled attack dice, kept per colour until rerolls are done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttackRoll {
    pub by_color: [AttackFaces; 3],
}

impl AttackRoll {
    pub fn totals(&self) -> AttackFaces {
        self.by_color
            .iter()
            .fold(AttackFaces::default(), |acc, f| acc.merge(*f))
    }
}

/// Rolled defense dice, per colour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefenseRoll {
    pub by_color: [DefenseFaces; 2],
}

impl DefenseRoll {
    pub fn totals(&self) -> DefenseFaces {
        self.by_color
            .iter()
            .fold(DefenseFaces::default(), |acc, f| acc.merge(*f))
    }

    pub fn merge(mut self, other: DefenseRoll) -> DefenseRoll {
        for (mine, theirs) in self.by_color.iter_mut().zip(other.by_color) {
            *mine = mine.merge(theirs);
        }
        self
    }
}

/// Upgrade/downgrade magnitudes one side applies to a pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DieShifts {
    pub upgrades: u32,
    pub downgrades: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Up,
    Down,
}

/// One shift phase over a pool of dice counted by chain rank.
///
/// Upgrades take the lowest upgradable dice first, downgrades the highest
/// downgradable ones. Selection reads the counts from before the phase, so
/// a die moves at most one step per phase.
pub fn shift_pool<const N: usize>(counts: [u32; N], shift: Shift, mut k: u32) -> [u32; N] {
    let mut out = counts;
    if N < 2 {
        return out;
    }
    match shift {
        Shift::Up => {
            for rank in 0..N - 1 {
                let n = k.min(counts[rank]);
                out[rank] -= n;
                out[rank + 1] += n;
                k -= n;
            }
        }
        Shift::Down => {
            for rank in (1..N).rev() {
                let n = k.min(counts[rank]);
                out[rank] -= n;
                out[rank - 1] += n;
                k -= n;
            }
        }
    }
    out
}

/// The four fixed phases: attacker-down, defender-down, attacker-up, defender-up.
pub fn shift_phases<const N: usize>(
    counts: [u32; N],
    attacker: DieShifts,
    defender: DieShifts,
) -> [u32; N] {
    let counts = shift_pool(counts, Shift::Down, attacker.downgrades);
    let counts = shift_pool(counts, Shift::Down, defender.downgrades);
    let counts = shift_pool(counts, Shift::Up, attacker.upgrades);
    shift_pool(counts, Shift::Up, defender.upgrades)
}

/// Source of pool-level dice outcomes consumed by the pipeline.
pub trait DiceSource {
    fn roll_attack(&mut self, color: AttackColor, count: u32) -> AttackFaces;
    fn roll_defense(&mut self, color: DefenseColor, count: u32) -> DefenseFaces;
}

/// Seeded sampler: rolls every die individually.
pub struct Dice {
    rng: ChaCha8Rng,
}

impl Dice {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl DiceSource for Dice {
    fn roll_attack(&mut self, color: AttackColor, count: u32) -> AttackFaces {
        let mut faces = AttackFaces::default();
        for _ in 0..count {
            faces.add(roll_attack_die(color, &mut self.rng));
        }
        faces
    }

    fn roll_defense(&mut self, color: DefenseColor, count: u32) -> DefenseFaces {
        let mut faces = DefenseFaces::default();
        for _ in 0..count {
            faces.add(roll_defense_die(color, &mut self.rng));
        }
        faces
    }
}

/// Fixed face sequences, ignoring colour. Exhausted queues roll blanks.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    attack: VecDeque<AttackFace>,
    defense: VecDeque<DefenseFace>,
}

impl ScriptedDice {
    pub fn new(attack: Vec<AttackFace>, defense: Vec<DefenseFace>) -> Self {
        Self {
            attack: attack.into(),
            defense: defense.into(),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.attack.is_empty() && self.defense.is_empty()
    }
}

impl DiceSource for ScriptedDice {
    fn roll_attack(&mut self, _color: AttackColor, count: u32) -> AttackFaces {
        let mut faces = AttackFaces::default();
        for _ in 0..count {
            faces.add(self.attack.pop_front().unwrap_or(AttackFace::Blank));
        }
        faces
    }

    fn roll_defense(&mut self, _color: DefenseColor, count: u32) -> DefenseFaces {
        let mut faces = DefenseFaces::default();
        for _ in 0..count {
            faces.add(self.defense.pop_front().unwrap_or(DefenseFace::Blank));
        }
        faces
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_weights_fill_each_die() {
        for c in AttackColor::CHAIN {
            assert_eq!(c.faces().iter().sum::<u32>(), ATTACK_SIDES);
        }
        for c in DefenseColor::CHAIN {
            assert_eq!(c.faces().iter().sum::<u32>(), DEFENSE_SIDES);
        }
    }

    #[test]
    fn pick_face_walks_cumulative_weights() {
        let red = AttackColor::Red.faces();
        assert_eq!(pick_face(red, 0), 0);
        assert_eq!(pick_face(red, 1), 1);
        assert_eq!(pick_face(red, 5), 1);
        assert_eq!(pick_face(red, 6), 2);
        assert_eq!(pick_face(red, 7), 3);
    }

    #[test]
    fn seeded_dice_repeat() {
        let mut a = Dice::from_seed(7);
        let mut b = Dice::from_seed(7);
        for _ in 0..20 {
            assert_eq!(
                a.roll_attack(AttackColor::Black, 6),
                b.roll_attack(AttackColor::Black, 6)
            );
        }
    }
}
