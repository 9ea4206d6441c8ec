use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

pub mod agent;
pub mod map;
pub mod moves;
pub mod simulation;

pub use map::BoundingBox;
pub use moves::{MoveError, normalize, translate, validate};
pub use simulation::{
    DeliveryRecord, Report, Simulation, SimulationConfig, count_unique_houses, process_moves,
    simulate,
};

/// Index of a delivery agent, in `[0, num_agents)`.
pub type AgentId = usize;

/// A cell on the unbounded delivery grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

impl Position {
    /// The starting cell of every agent.
    pub const ORIGIN: Position = Position { x: 0, y: 0 };

    pub const fn new(x: i64, y: i64) -> Self {
        Position { x, y }
    }
}

/// A unit step on the grid, produced from a single move symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Displacement {
    pub dx: i64,
    pub dy: i64,
}

impl Add<Displacement> for Position {
    type Output = Position;

    #[inline]
    fn add(self, rhs: Displacement) -> Self::Output {
        Position {
            x: self.x + rhs.dx,
            y: self.y + rhs.dy,
        }
    }
}

impl AddAssign<Displacement> for Position {
    #[inline]
    fn add_assign(&mut self, rhs: Displacement) {
        *self = *self + rhs;
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
