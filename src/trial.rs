use std::fmt;

use rand::RngCore;

use crate::{
    entropy::EntropySource,
    error::{Result, SimErr},
};

/// One of the three doors of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Door {
    First = 0,
    Second = 1,
    Third = 2,
}

impl Door {
    /// All the doors, ordered by index.
    pub const ALL: [Door; 3] = [Door::First, Door::Second, Door::Third];

    /// Maps `0`, `1` and `2` to their door, anything else doesn't name one.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Returns the door's position, `0` to `2`.
    pub fn index(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Door {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// The door left over once two distinct doors are taken, indexed by `a | b`.
///
/// With doors encoded as `0b00`, `0b01` and `0b10`, the OR of two distinct doors is injective:
///
/// | pair   | `a \| b` | remaining |
/// |--------|----------|-----------|
/// | {0, 1} | 1        | 2         |
/// | {0, 2} | 2        | 1         |
/// | {1, 2} | 3        | 0         |
///
/// Index 0 would need both doors to be `0`, which isn't a pair of distinct doors.
const REMAINING_BY_PAIR: [Option<Door>; 4] = [
    None,
    Some(Door::Third),
    Some(Door::Second),
    Some(Door::First),
];

/// Returns the single door that is neither `a` nor `b`.
///
/// # Returns
/// `None` if both doors are the same one, as there are two candidates left.
#[inline]
pub fn remaining_door(a: Door, b: Door) -> Option<Door> {
    if a == b {
        return None;
    }

    REMAINING_BY_PAIR[(a.index() | b.index()) as usize]
}

/// Every door involved in a single trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialOutcome {
    pub correct: Door,
    pub first_pick: Door,
    pub revealed: Door,
    pub switched: Door,
    pub won: bool,
}

/// Plays the game with a player that always switches doors.
///
/// The engine itself is stateless, every random decision comes from the `EntropySource`
/// handed to it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrialEngine;

impl TrialEngine {
    /// Creates a new `TrialEngine`.
    pub fn new() -> Self {
        Self
    }

    /// Plays a single trial.
    ///
    /// # Arguments
    /// * `entropy` - Source of every random decision of the trial.
    ///
    /// # Returns
    /// Whether switching won the prize, or an `UnreachableOutcome` if there was no door to
    /// switch to.
    #[inline]
    pub fn play<R: RngCore>(&self, entropy: &mut EntropySource<R>) -> Result<bool> {
        self.play_traced(entropy).map(|outcome| outcome.won)
    }

    /// Plays a single trial keeping track of every door involved.
    ///
    /// # Arguments
    /// * `entropy` - Source of every random decision of the trial.
    ///
    /// # Returns
    /// The full `TrialOutcome`, or an `UnreachableOutcome` if there was no door to switch to.
    pub fn play_traced<R: RngCore>(&self, entropy: &mut EntropySource<R>) -> Result<TrialOutcome> {
        let correct = draw_door(entropy);
        let first_pick = draw_door(entropy);
        let revealed = reveal(entropy, correct, first_pick);

        let switched =
            remaining_door(first_pick, revealed).ok_or(SimErr::UnreachableOutcome {
                first_pick,
                revealed,
            })?;

        Ok(TrialOutcome {
            correct,
            first_pick,
            revealed,
            switched,
            won: correct == switched,
        })
    }
}

#[inline]
fn draw_door<R: RngCore>(entropy: &mut EntropySource<R>) -> Door {
    match entropy.next_chunk_divisible_by_3() % 3 {
        0 => Door::First,
        1 => Door::Second,
        _ => Door::Third,
    }
}

/// Picks the door the host opens, it can't hide the prize nor be the player's pick.
#[inline]
fn reveal<R: RngCore>(entropy: &mut EntropySource<R>, correct: Door, first_pick: Door) -> Door {
    if let Some(door) = remaining_door(correct, first_pick) {
        return door;
    }

    // The player picked the prize, the host opens either of the other two doors.
    let [low, high] = other_doors(correct);
    if entropy.next_bit() { high } else { low }
}

/// The two doors that aren't `door`, in ascending order.
#[inline]
fn other_doors(door: Door) -> [Door; 2] {
    match door {
        Door::First => [Door::Second, Door::Third],
        Door::Second => [Door::First, Door::Third],
        Door::Third => [Door::First, Door::Second],
    }
}
