use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::{AgentId, Position, simulation::DeliveryRecord};

/// Represents errors that can occur within the grid operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Position {position} is outside the grid spanning {min} to {max}")]
    OutOfBounds {
        position: Position,
        min: Position,
        max: Position,
    },
    #[error("Grid spanning {min} to {max} is too large to allocate")]
    TooLarge { min: Position, max: Position },
}

/// Smallest axis-aligned rectangle holding the origin and every delivery.
///
/// `min` and `max` are the two ends of the grid diagonal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Position,
    pub max: Position,
}

impl Default for BoundingBox {
    fn default() -> Self {
        BoundingBox::origin()
    }
}

impl BoundingBox {
    /// The degenerate box covering only the origin.
    pub const fn origin() -> Self {
        BoundingBox {
            min: Position::ORIGIN,
            max: Position::ORIGIN,
        }
    }

    /// Builds the box around the origin and all given positions.
    pub fn from_positions<I>(positions: I) -> Self
    where
        I: IntoIterator<Item = Position>,
    {
        let mut bounds = BoundingBox::origin();
        for position in positions {
            bounds.include(position);
        }
        bounds
    }

    /// Grows the box so it contains `position`.
    #[inline]
    pub fn include(&mut self, position: Position) {
        self.min.x = self.min.x.min(position.x);
        self.min.y = self.min.y.min(position.y);
        self.max.x = self.max.x.max(position.x);
        self.max.y = self.max.y.max(position.y);
    }

    #[inline]
    pub fn contains(&self, position: Position) -> bool {
        (self.min.x..=self.max.x).contains(&position.x)
            && (self.min.y..=self.max.y).contains(&position.y)
    }

    /// Number of columns covered, counting both edges.
    pub fn width(&self) -> u64 {
        self.max.x.abs_diff(self.min.x) + 1
    }

    /// Number of rows covered, counting both edges.
    pub fn height(&self) -> u64 {
        self.max.y.abs_diff(self.min.y) + 1
    }

    /// Length of the diagonal from `min` to `max`, rounded up.
    pub fn diagonal_length(&self) -> u64 {
        let dx = self.max.x.abs_diff(self.min.x) as f64;
        let dy = self.max.y.abs_diff(self.min.y) as f64;
        dx.hypot(dy).ceil() as u64
    }
}

/// A dense 2D grid covering a [`BoundingBox`].
///
/// Cells are addressed by world [`Position`]. Storage is row-major with the
/// top row (largest `y`) first, which is the order a terminal draws them in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    bounds: BoundingBox,
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a grid over `bounds`, filled with default values.
    pub fn new(bounds: BoundingBox) -> Result<Self, GridError>
    where
        T: Default + Clone,
    {
        let too_large = || GridError::TooLarge {
            min: bounds.min,
            max: bounds.max,
        };
        let width = usize::try_from(bounds.width()).map_err(|_| too_large())?;
        let height = usize::try_from(bounds.height()).map_err(|_| too_large())?;
        let size = width.checked_mul(height).ok_or_else(too_large)?;
        Ok(Grid {
            bounds,
            width,
            height,
            cells: vec![T::default(); size],
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Converts a world position to a flat vector index.
    ///
    /// Returns `None` if the position lies outside the grid.
    #[inline]
    pub fn position_to_index(&self, position: Position) -> Option<usize> {
        if !self.bounds.contains(position) {
            return None;
        }
        let column = position.x.abs_diff(self.bounds.min.x) as usize;
        let row = self.bounds.max.y.abs_diff(position.y) as usize;
        Some(row * self.width + column)
    }

    pub fn get(&self, position: Position) -> Option<&T> {
        self.cells.get(self.position_to_index(position)?)
    }

    pub fn get_mut(&mut self, position: Position) -> Option<&mut T> {
        let index = self.position_to_index(position)?;
        self.cells.get_mut(index)
    }

    /// Sets the value of the cell at `position`.
    pub fn set(&mut self, position: Position, value: T) -> Result<(), GridError> {
        let index = self
            .position_to_index(position)
            .ok_or(GridError::OutOfBounds {
                position,
                min: self.bounds.min,
                max: self.bounds.max,
            })?;
        self.cells[index] = value;
        Ok(())
    }

    /// Iterates over rows from the top of the grid down.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        self.cells.chunks(self.width)
    }
}

impl<T> Index<Position> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, position: Position) -> &Self::Output {
        match self.position_to_index(position) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Grid position {} out of bounds for grid spanning {} to {}",
                position, self.bounds.min, self.bounds.max
            ),
        }
    }
}

impl<T> IndexMut<Position> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, position: Position) -> &mut Self::Output {
        let bounds = self.bounds;
        match self.position_to_index(position) {
            Some(idx) => &mut self.cells[idx],
            None => panic!(
                "Grid position {} out of bounds for grid spanning {} to {}",
                position, bounds.min, bounds.max
            ),
        }
    }
}

/// Rasterises delivery records over `bounds`.
///
/// Each visited cell holds the agent that delivered there last; records
/// outside `bounds` are skipped.
pub fn trail_grid(
    records: &[DeliveryRecord],
    bounds: BoundingBox,
) -> Result<Grid<Option<AgentId>>, GridError> {
    let mut grid = Grid::new(bounds)?;
    for record in records {
        if let Some(cell) = grid.get_mut(record.position) {
            *cell = Some(record.agent);
        }
    }
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_box_is_degenerate() {
        let bounds = BoundingBox::origin();
        assert_eq!(bounds.width(), 1);
        assert_eq!(bounds.height(), 1);
        assert_eq!(bounds.diagonal_length(), 0);
        assert!(bounds.contains(Position::ORIGIN));
    }

    #[test]
    fn from_positions_keeps_origin_inside() {
        let bounds = BoundingBox::from_positions([Position::new(3, 4), Position::new(5, 2)]);
        assert_eq!(bounds.min, Position::new(0, 0));
        assert_eq!(bounds.max, Position::new(5, 4));
        assert_eq!(bounds.diagonal_length(), 7);
    }

    #[test]
    fn include_grows_in_every_direction() {
        let mut bounds = BoundingBox::origin();
        bounds.include(Position::new(-2, 1));
        bounds.include(Position::new(1, -3));
        assert_eq!(bounds.min, Position::new(-2, -3));
        assert_eq!(bounds.max, Position::new(1, 1));
        assert_eq!(bounds.width(), 4);
        assert_eq!(bounds.height(), 5);
        assert!(!bounds.contains(Position::new(2, 0)));
    }

    #[test]
    fn grid_addresses_world_positions() {
        let bounds = BoundingBox::from_positions([Position::new(-1, -1), Position::new(1, 1)]);
        let mut grid: Grid<u8> = Grid::new(bounds).unwrap();
        assert_eq!((grid.width(), grid.height()), (3, 3));

        grid.set(Position::new(-1, 1), 7).unwrap();
        grid[Position::new(1, -1)] = 9;

        let rows: Vec<&[u8]> = grid.rows().collect();
        assert_eq!(rows[0], &[7, 0, 0]);
        assert_eq!(rows[2], &[0, 0, 9]);
        assert_eq!(grid.get(Position::new(2, 0)), None);
    }

    #[test]
    fn set_outside_grid_fails() {
        let mut grid: Grid<bool> = Grid::new(BoundingBox::origin()).unwrap();
        let err = grid.set(Position::new(0, 1), true).unwrap_err();
        assert_eq!(
            err,
            GridError::OutOfBounds {
                position: Position::new(0, 1),
                min: Position::ORIGIN,
                max: Position::ORIGIN,
            }
        );
    }

    #[test]
    fn trail_grid_marks_last_agent() {
        let records = [
            DeliveryRecord::new(Position::ORIGIN, 0),
            DeliveryRecord::new(Position::new(1, 0), 0),
            DeliveryRecord::new(Position::new(1, 0), 1),
        ];
        let bounds = BoundingBox::from_positions(records.iter().map(|r| r.position));
        let grid = trail_grid(&records, bounds).unwrap();
        assert_eq!(grid[Position::ORIGIN], Some(0));
        assert_eq!(grid[Position::new(1, 0)], Some(1));
    }
}
