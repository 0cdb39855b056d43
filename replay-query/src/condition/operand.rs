//! Operand vocabulary of the condition language
//!
//! Fourteen dynamic operands (`ball.x`, `ball.y`, `player.N.x`, `player.N.y` for
//! N in 1..=6) resolve against an [`Event`]; one static operand (`midfield.x`)
//! is the fixed centre line at 0.

use crate::types::{Event, MAX_PLAYERS};
use std::fmt;
use std::str::FromStr;

/// Value of the static `midfield.x` operand
pub const MIDFIELD: f64 = 0.0;

/// Axis suffix of an operand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    /// The other axis
    pub fn swapped(self) -> Self {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "x" => Some(Axis::X),
            "y" => Some(Axis::Y),
            _ => None,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
        }
    }
}

/// A named numeric quantity usable in a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    Ball(Axis),
    /// Player index (1..=6) and axis
    Player(u8, Axis),
    /// The field's centre line on the x axis
    Midfield,
}

impl Operand {
    /// Every dynamic operand, in resolution order
    pub fn dynamic() -> impl Iterator<Item = Operand> {
        let ball = [Operand::Ball(Axis::X), Operand::Ball(Axis::Y)];
        let players = (1..=MAX_PLAYERS)
            .flat_map(|index| [Operand::Player(index, Axis::X), Operand::Player(index, Axis::Y)]);
        ball.into_iter().chain(players)
    }

    /// True if the value comes from an event rather than a constant
    pub fn is_dynamic(&self) -> bool {
        !matches!(self, Operand::Midfield)
    }

    /// The same operand on the other axis; the static operand is unaffected
    pub fn with_swapped_axis(self) -> Self {
        match self {
            Operand::Ball(axis) => Operand::Ball(axis.swapped()),
            Operand::Player(index, axis) => Operand::Player(index, axis.swapped()),
            Operand::Midfield => Operand::Midfield,
        }
    }

    /// Resolve the operand's value from an event
    ///
    /// Returns `None` when the actor is not present in this event yet.
    pub fn resolve(&self, event: &Event) -> Option<f64> {
        match *self {
            Operand::Ball(axis) => event.ball.map(|p| pick(p.x, p.y, axis)),
            Operand::Player(index, axis) => event.player_position(index).map(|p| pick(p.x, p.y, axis)),
            Operand::Midfield => Some(MIDFIELD),
        }
    }
}

fn pick(x: f64, y: f64, axis: Axis) -> f64 {
    match axis {
        Axis::X => x,
        Axis::Y => y,
    }
}

impl FromStr for Operand {
    type Err = ();

    /// Parse a dotted operand name (already lowercased)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        match parts.as_slice() {
            ["ball", axis] => Axis::parse(axis).map(Operand::Ball).ok_or(()),
            ["midfield", "x"] => Ok(Operand::Midfield),
            ["player", index, axis] => {
                let index: u8 = match *index {
                    "1" => 1,
                    "2" => 2,
                    "3" => 3,
                    "4" => 4,
                    "5" => 5,
                    "6" => 6,
                    _ => return Err(()),
                };
                Axis::parse(axis).map(|axis| Operand::Player(index, axis)).ok_or(())
            }
            _ => Err(()),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Ball(axis) => write!(f, "ball.{}", axis),
            Operand::Player(index, axis) => write!(f, "player.{}.{}", index, axis),
            Operand::Midfield => write!(f, "midfield.x"),
        }
    }
}
