//! Game primitives commonly used within [`crate::game`].

use std::fmt;
use std::ops::Not;

use anyhow::{bail, Context};
use arrayvec::ArrayVec;

/// Number of cells along one side of a 3×3 grid (both a sub-board and the
/// meta-board).
pub const GRID_WIDTH: u8 = 3;
/// Number of cells in a 3×3 grid.
pub const GRID_SIZE: u8 = GRID_WIDTH * GRID_WIDTH;
/// Number of cells along one side of the full board.
pub const BOARD_WIDTH: u8 = GRID_WIDTH * GRID_WIDTH;
/// Total number of cells and the size of the move space.
pub const BOARD_SIZE: u8 = BOARD_WIDTH * BOARD_WIDTH;

/// Moves produced by [`crate::game::position::Position::legal_moves`]. A
/// position can never have more than [`BOARD_SIZE`] legal moves, so the list
/// lives on the stack.
pub type MoveList = ArrayVec<Move, { BOARD_SIZE as usize }>;

/// The game is played between two players: X (having the advantage of the
/// first turn) and O.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Player {
    X,
    O,
}

impl Player {
    /// Index of the player's membership set in per-board storage.
    #[must_use]
    pub(crate) const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::O => 1,
        }
    }
}

impl Not for Player {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }
}

impl TryFrom<&str> for Player {
    type Error = anyhow::Error;

    fn try_from(player: &str) -> anyhow::Result<Self> {
        match player {
            "x" | "X" => Ok(Self::X),
            "o" | "O" => Ok(Self::O),
            _ => bail!("player should be 'x' or 'o', got '{player}'"),
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match &self {
                Self::X => 'X',
                Self::O => 'O',
            }
        )
    }
}

/// A move is an index in `0..81` encoded as `board * 9 + cell`, where both
/// `board` and `cell` enumerate a 3×3 grid left to right, top to bottom.
///
/// ```
/// use iridium::game::core::Move;
///
/// let center = Move::new(4, 4);
/// assert_eq!(center.index(), 40);
/// assert_eq!(center.coordinates(), (4, 4));
/// assert_eq!(center.to_string(), "e5");
/// ```
///
/// The text notation names the column with a letter (`a` to `i`, left to
/// right) and the row with a digit (`1` to `9`, top to bottom) of the full
/// 9×9 board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Move {
    index: u8,
}

impl Move {
    /// Creates a move into `cell` of sub-board `board`.
    ///
    /// # Panics
    ///
    /// Panics if either index is outside of `0..9`.
    #[must_use]
    pub const fn new(board: u8, cell: u8) -> Self {
        assert!(board < GRID_SIZE && cell < GRID_SIZE);
        Self {
            index: board * GRID_SIZE + cell,
        }
    }

    /// Creates a move from its index in `0..81`.
    pub fn from_index(index: u8) -> anyhow::Result<Self> {
        if index >= BOARD_SIZE {
            bail!("move index should be within 0..{BOARD_SIZE}, got {index}");
        }
        Ok(Self { index })
    }

    /// Creates a move from row and column of the full 9×9 board.
    pub fn from_coordinates(row: u8, column: u8) -> anyhow::Result<Self> {
        if row >= BOARD_WIDTH || column >= BOARD_WIDTH {
            bail!("coordinates should be within 0..{BOARD_WIDTH}, got ({row}, {column})");
        }
        let board = (row / GRID_WIDTH) * GRID_WIDTH + column / GRID_WIDTH;
        let cell = (row % GRID_WIDTH) * GRID_WIDTH + column % GRID_WIDTH;
        Ok(Self::new(board, cell))
    }

    /// Parses the text notation, e.g. "e5" for the center of the board.
    pub fn from_notation(notation: &str) -> anyhow::Result<Self> {
        let notation = notation.trim();
        let mut chars = notation.chars();
        let (Some(column), Some(row), None) = (chars.next(), chars.next(), chars.next()) else {
            bail!("move should consist of a column and a row (e.g. 'e5'), got '{notation}'");
        };
        let column = match column {
            'a'..='i' => column as u8 - b'a',
            _ => bail!("column should be within 'a'..='i', got '{column}'"),
        };
        let row = row
            .to_digit(10)
            .filter(|row| (1..=u32::from(BOARD_WIDTH)).contains(row))
            .with_context(|| format!("row should be within 1..=9, got '{row}'"))?;
        // The digit is already known to fit.
        Self::from_coordinates(row as u8 - 1, column)
    }

    /// Returns the index of the move in `0..81`.
    #[must_use]
    pub const fn index(self) -> u8 {
        self.index
    }

    /// Returns the sub-board this move is played into.
    #[must_use]
    pub const fn board(self) -> u8 {
        self.index / GRID_SIZE
    }

    /// Returns the cell within the sub-board. This is also the sub-board the
    /// opponent is sent to.
    #[must_use]
    pub const fn cell(self) -> u8 {
        self.index % GRID_SIZE
    }

    /// Returns `(row, column)` on the full 9×9 board.
    #[must_use]
    pub const fn coordinates(self) -> (u8, u8) {
        let (board, cell) = (self.board(), self.cell());
        let row = (board / GRID_WIDTH) * GRID_WIDTH + cell / GRID_WIDTH;
        let column = (board % GRID_WIDTH) * GRID_WIDTH + cell % GRID_WIDTH;
        (row, column)
    }
}

impl TryFrom<&str> for Move {
    type Error = anyhow::Error;

    fn try_from(notation: &str) -> anyhow::Result<Self> {
        Self::from_notation(notation)
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (row, column) = self.coordinates();
        write!(f, "{}{}", char::from(b'a' + column), row + 1)
    }
}
