use crate::{AgentId, Displacement, Position};

/// A delivery agent walking the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    pub id: AgentId,
    pub position: Position,
}

impl Agent {
    /// Creates an agent standing on the origin.
    pub fn new(id: AgentId) -> Self {
        Self {
            id,
            position: Position::ORIGIN,
        }
    }

    /// Moves the agent by `step` and returns where it ended up.
    pub fn advance(&mut self, step: Displacement) -> Position {
        self.position += step;
        self.position
    }
}

/// Agents taking turns in round-robin order.
#[derive(Debug, Clone)]
pub struct Crew {
    agents: Vec<Agent>,
}

impl Crew {
    /// Creates `size` agents, all at the origin.
    pub fn new(size: usize) -> Self {
        Self {
            agents: (0..size).map(Agent::new).collect(),
        }
    }

    /// Agent responsible for the move at `move_index`.
    #[inline]
    pub fn turn(&self, move_index: usize) -> AgentId {
        move_index % self.agents.len()
    }

    /// Applies the move at `move_index` to the agent whose turn it is.
    ///
    /// Only that agent's position changes.
    pub fn perform(&mut self, move_index: usize, step: Displacement) -> (AgentId, Position) {
        let id = self.turn(move_index);
        (id, self.agents[id].advance(step))
    }
}
