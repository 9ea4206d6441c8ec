use crate::Displacement;

/// Errors raised while reading a move sequence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("Invalid move '{symbol}' at index {index}: must be ^, v, <, or >")]
    InvalidMove { symbol: char, index: usize },
}

/// One of the four dispatcher inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

impl Move {
    /// Parses a single dispatcher symbol (`^`, `v`, `<`, `>`).
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '^' => Some(Move::Up),
            'v' => Some(Move::Down),
            '<' => Some(Move::Left),
            '>' => Some(Move::Right),
            _ => None,
        }
    }

    /// The unit vector this move adds to an agent's position.
    pub fn displacement(self) -> Displacement {
        let (dx, dy) = match self {
            Move::Up => (0, 1),
            Move::Down => (0, -1),
            Move::Right => (1, 0),
            Move::Left => (-1, 0),
        };
        Displacement { dx, dy }
    }
}

/// Collapses raw input into one continuous move string.
///
/// Every line (ended by `\n`, `\r\n` or a lone `\r`) is stripped of
/// surrounding whitespace and quote characters, then the lines are joined.
/// The content itself is not checked.
pub fn normalize(raw: &str) -> String {
    raw.split(['\r', '\n']).map(trim_line).collect()
}

fn trim_line(line: &str) -> &str {
    line.trim_matches(|c: char| c.is_whitespace() || c == '\'' || c == '"')
}

/// Checks that every character of `moves` is a dispatcher symbol.
///
/// Stops at the first offending character.
pub fn validate(moves: &str) -> Result<(), MoveError> {
    match moves
        .chars()
        .enumerate()
        .find(|(_, symbol)| Move::from_symbol(*symbol).is_none())
    {
        Some((index, symbol)) => {
            tracing::debug!(%symbol, index, "rejecting move sequence");
            Err(MoveError::InvalidMove { symbol, index })
        }
        None => Ok(()),
    }
}

/// Parses `moves` into typed moves, failing on the first invalid symbol.
pub fn parse(moves: &str) -> Result<Vec<Move>, MoveError> {
    moves
        .chars()
        .enumerate()
        .map(|(index, symbol)| {
            Move::from_symbol(symbol).ok_or(MoveError::InvalidMove { symbol, index })
        })
        .collect()
}

/// Maps a move string to the ordered list of displacements it describes.
pub fn translate(moves: &str) -> Result<Vec<Displacement>, MoveError> {
    Ok(parse(moves)?.into_iter().map(Move::displacement).collect())
}
