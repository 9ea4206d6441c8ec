use std::{collections::HashSet, num::NonZeroUsize};

use serde::{Deserialize, Serialize};

use crate::{
    AgentId, Displacement, Position,
    agent::Crew,
    map::BoundingBox,
    moves::{self, MoveError},
};

/// Per-run settings for [`simulate`] and [`process_moves`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Number of agents taking turns.
    pub num_agents: NonZeroUsize,
    /// Whether to track the bounding box while simulating.
    pub track_bounding_box: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            num_agents: NonZeroUsize::MIN,
            track_bounding_box: true,
        }
    }
}

impl SimulationConfig {
    pub fn with_agents(mut self, num_agents: NonZeroUsize) -> Self {
        self.num_agents = num_agents;
        self
    }

    pub fn with_bounding_box(mut self, track: bool) -> Self {
        self.track_bounding_box = track;
        self
    }
}

/// Where one move left the agent that performed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub position: Position,
    pub agent: AgentId,
}

impl DeliveryRecord {
    pub const fn new(position: Position, agent: AgentId) -> Self {
        Self { position, agent }
    }
}

/// The output of a single simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Simulation {
    /// One record per move, after the starting record at the origin.
    pub records: Vec<DeliveryRecord>,
    /// Present when bounding-box tracking was enabled.
    pub bounding_box: Option<BoundingBox>,
    pub num_agents: usize,
}

impl Simulation {
    /// Number of moves performed, excluding the starting record.
    pub fn moves(&self) -> usize {
        self.records.len().saturating_sub(1)
    }

    /// The origin followed by every position `agent` reached, in order.
    pub fn agent_path(&self, agent: AgentId) -> Vec<Position> {
        std::iter::once(Position::ORIGIN)
            .chain(
                self.records
                    .iter()
                    .skip(1)
                    .filter(|record| record.agent == agent)
                    .map(|record| record.position),
            )
            .collect()
    }

    /// Where every agent stands once all moves are done.
    pub fn final_positions(&self) -> Vec<Position> {
        let mut positions = vec![Position::ORIGIN; self.num_agents];
        for record in self.records.iter().skip(1) {
            positions[record.agent] = record.position;
        }
        positions
    }

    /// The tracked bounding box, or one computed from the records.
    pub fn bounds(&self) -> BoundingBox {
        self.bounding_box.unwrap_or_else(|| {
            BoundingBox::from_positions(self.records.iter().map(|record| record.position))
        })
    }
}

/// Summary of a full pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub unique_houses: usize,
    pub simulation: Simulation,
}

/// Walks every agent through `displacements` in round-robin order.
///
/// Move `i` is performed by agent `i % num_agents`. Each move produces one
/// record; nothing is deduplicated here.
pub fn simulate(displacements: &[Displacement], config: &SimulationConfig) -> Simulation {
    let num_agents = config.num_agents.get();
    tracing::debug!(
        moves = displacements.len(),
        num_agents,
        track_bounding_box = config.track_bounding_box,
        "starting simulation"
    );

    let mut crew = Crew::new(num_agents);
    let mut bounds = config.track_bounding_box.then(BoundingBox::origin);

    let mut records = Vec::with_capacity(displacements.len() + 1);
    records.push(DeliveryRecord::new(Position::ORIGIN, 0));

    for (index, step) in displacements.iter().enumerate() {
        let (agent, position) = crew.perform(index, *step);
        records.push(DeliveryRecord::new(position, agent));

        if let Some(bounds) = bounds.as_mut() {
            bounds.include(position);
        }
    }

    tracing::debug!(records = records.len(), ?bounds, "simulation finished");

    Simulation {
        records,
        bounding_box: bounds,
        num_agents,
    }
}

/// Counts distinct positions across `records`, whichever agent visited them.
pub fn count_unique_houses(records: &[DeliveryRecord]) -> usize {
    records
        .iter()
        .map(|record| record.position)
        .collect::<HashSet<_>>()
        .len()
}

/// Runs the whole pipeline on raw input: normalise, validate, translate,
/// simulate and count.
pub fn process_moves(raw: &str, config: &SimulationConfig) -> Result<Report, MoveError> {
    let moves = moves::normalize(raw);
    moves::validate(&moves)?;
    let displacements = moves::translate(&moves)?;

    let simulation = simulate(&displacements, config);
    let unique_houses = count_unique_houses(&simulation.records);
    tracing::info!(
        moves = simulation.moves(),
        unique_houses,
        "processed deliveries"
    );

    Ok(Report {
        unique_houses,
        simulation,
    })
}
