//! [Bitboard]-based representation of a 3×3 grid. Each of the nine cells maps
//! to one bit, so membership tests, occupancy and line detection are a
//! handful of integer operations.
//!
//! The same representation describes a sub-board (cells owned by a player)
//! and the meta-board (sub-boards won by a player). Both are decided by the
//! single [`line_winner`] check.
//!
//! [Bitboard]: https://www.chessprogramming.org/Bitboards

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

use itertools::Itertools;

use crate::game::core::{Player, GRID_SIZE, GRID_WIDTH};

/// Set of cells of a 3×3 grid. The least significant bit corresponds to the
/// top-left cell, bit 8 to the bottom-right one.
///
/// `Cells` is a thin wrapper around [u16] with the upper 7 bits always clear.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Cells {
    bits: u16,
}

impl Cells {
    const MASK: u16 = 0b1_1111_1111;

    /// Constructs the set from pre-calculated bits. Bits above the ninth are
    /// discarded.
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self {
            bits: bits & Self::MASK,
        }
    }

    /// Constructs the empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self::from_bits(0)
    }

    /// Constructs the set containing all nine cells.
    #[must_use]
    pub const fn full() -> Self {
        Self::from_bits(Self::MASK)
    }

    /// Returns raw bits.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.bits
    }

    /// Returns true if the set contains given cell.
    #[must_use]
    pub const fn contains(self, cell: u8) -> bool {
        debug_assert!(cell < GRID_SIZE);
        (self.bits & (1 << cell)) != 0
    }

    /// Adds the cell to the set.
    pub fn insert(&mut self, cell: u8) {
        debug_assert!(cell < GRID_SIZE);
        self.bits |= 1 << cell;
    }

    /// Removes the cell from the set.
    pub fn remove(&mut self, cell: u8) {
        debug_assert!(cell < GRID_SIZE);
        self.bits &= !(1 << cell);
    }

    #[must_use]
    pub const fn count(self) -> u32 {
        self.bits.count_ones()
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.bits == 0
    }

    #[must_use]
    pub const fn is_full(self) -> bool {
        self.bits == Self::MASK
    }

    /// Returns true if all cells of `other` are in the set.
    #[must_use]
    pub const fn is_superset(self, other: Self) -> bool {
        self.bits & other.bits == other.bits
    }

    /// Iterates over the set cells in ascending order.
    #[must_use]
    pub const fn iter(self) -> CellsIterator {
        CellsIterator { bits: self.bits }
    }
}

impl BitOr for Cells {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::from_bits(self.bits | rhs.bits)
    }
}

impl BitOrAssign for Cells {
    fn bitor_assign(&mut self, rhs: Self) {
        self.bits |= rhs.bits;
    }
}

impl BitAnd for Cells {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::from_bits(self.bits & rhs.bits)
    }
}

impl Not for Cells {
    type Output = Self;

    /// Returns the complement within the nine cells.
    fn not(self) -> Self::Output {
        Self::from_bits(!self.bits)
    }
}

impl fmt::Debug for Cells {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            (0..GRID_SIZE)
                .map(|cell| if self.contains(cell) { '1' } else { '.' })
                .chunks(GRID_WIDTH as usize)
                .into_iter()
                .map(|row| row.collect::<String>())
                .join("/")
        )
    }
}

/// Iterates over the cells of [`Cells`] from the least significant bit.
pub struct CellsIterator {
    bits: u16,
}

impl Iterator for CellsIterator {
    type Item = u8;

    fn next(&mut self) -> Option<Self::Item> {
        if self.bits == 0 {
            return None;
        }
        // At most 9 trailing zeros: fits into u8.
        let cell = self.bits.trailing_zeros() as u8;
        self.bits &= self.bits - 1;
        Some(cell)
    }
}

/// The 8 three-in-a-row lines of a 3×3 grid: 3 rows, 3 columns and 2
/// diagonals.
pub const LINES: [Cells; 8] = [
    Cells::from_bits(0b000_000_111),
    Cells::from_bits(0b000_111_000),
    Cells::from_bits(0b111_000_000),
    Cells::from_bits(0b001_001_001),
    Cells::from_bits(0b010_010_010),
    Cells::from_bits(0b100_100_100),
    Cells::from_bits(0b100_010_001),
    Cells::from_bits(0b001_010_100),
];

/// Returns the player owning a complete line, if any.
///
/// This is the only line check in the crate: it decides sub-boards (cells
/// owned by each player) and the whole game (sub-boards won by each player).
/// In reachable positions at most one player can own a line; X is checked
/// first otherwise.
#[must_use]
pub fn line_winner(x: Cells, o: Cells) -> Option<Player> {
    let owns_line = |cells: Cells| LINES.iter().any(|&line| cells.is_superset(line));
    if owns_line(x) {
        Some(Player::X)
    } else if owns_line(o) {
        Some(Player::O)
    } else {
        None
    }
}

/// A 3×3 grid with two disjoint membership sets, one per player.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Grid {
    cells: [Cells; 2],
}

impl Grid {
    #[must_use]
    pub const fn new(x: Cells, o: Cells) -> Self {
        debug_assert!(x.bits() & o.bits() == 0);
        Self { cells: [x, o] }
    }

    /// Cells owned by `player`.
    #[must_use]
    pub const fn cells(&self, player: Player) -> Cells {
        self.cells[player.index()]
    }

    /// Cells owned by either player.
    #[must_use]
    pub fn occupied(&self) -> Cells {
        self.cells[0] | self.cells[1]
    }

    /// Owner of the cell, if any.
    #[must_use]
    pub const fn at(&self, cell: u8) -> Option<Player> {
        if self.cells[0].contains(cell) {
            Some(Player::X)
        } else if self.cells[1].contains(cell) {
            Some(Player::O)
        } else {
            None
        }
    }

    pub(crate) fn set(&mut self, player: Player, cell: u8) {
        debug_assert!(self.at(cell).is_none(), "cell {cell} is already occupied");
        self.cells[player.index()].insert(cell);
    }

    pub(crate) fn clear(&mut self, player: Player, cell: u8) {
        debug_assert_eq!(self.at(cell), Some(player), "cell {cell} is not owned by {player}");
        self.cells[player.index()].remove(cell);
    }

    #[must_use]
    pub fn winner(&self) -> Option<Player> {
        line_winner(self.cells[0], self.cells[1])
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.occupied().is_full()
    }

    /// A grid is decided once it has a winner or no empty cells left.
    #[must_use]
    pub fn is_decided(&self) -> bool {
        self.winner().is_some() || self.is_full()
    }
}
