//! Provides fully-specified Ultimate Tic-Tac-Toe [`Position`]: nine
//! sub-boards, the player to move, the forcing constraint and the history of
//! played moves.
//!
//! Move generation, making/unmaking moves, terminal detection and random
//! playouts used by the search are implemented here.

use std::fmt;

use anyhow::{bail, Context};
use arrayvec::ArrayVec;
use rand::Rng;

use crate::game::bitboard::{Cells, Grid};
use crate::game::core::{Move, MoveList, Player, BOARD_SIZE, GRID_SIZE, GRID_WIDTH};

/// State of the game.
///
/// Each sub-board is a [`Grid`] of two disjoint membership sets. After a
/// move into cell `c` of any sub-board, the opponent must play into
/// sub-board `c` unless it is already decided (won or full), in which case
/// any undecided sub-board is allowed. Decided sub-boards never accept moves
/// again. The game is won by taking three sub-boards in a row, using the same
/// line rules as within a sub-board.
///
/// Two positions compare equal when cells, side to move and the effective
/// forcing constraint match. The move history only serves [`Position::unplay`]
/// and is not part of the identity.
#[derive(Clone)]
pub struct Position {
    boards: [Grid; GRID_SIZE as usize],
    /// Sub-board the next move is constrained to (the cell of the last move),
    /// `None` before the first move.
    forcing_board: Option<u8>,
    side_to_move: Player,
    history: ArrayVec<Move, { BOARD_SIZE as usize }>,
}

impl Position {
    /// Creates the empty starting position with X to move.
    ///
    /// ```
    /// use iridium::game::position::Position;
    ///
    /// let position = Position::starting();
    /// assert_eq!(position.legal_moves().len(), 81);
    /// assert!(!position.is_game_over());
    /// ```
    #[must_use]
    pub fn starting() -> Self {
        Self {
            boards: [Grid::default(); GRID_SIZE as usize],
            forcing_board: None,
            side_to_move: Player::X,
            history: ArrayVec::new(),
        }
    }

    /// Replays `moves` from the starting position, rejecting the first
    /// illegal one.
    pub fn from_moves(moves: impl IntoIterator<Item = Move>) -> anyhow::Result<Self> {
        let mut position = Self::starting();
        for (ply, next_move) in moves.into_iter().enumerate() {
            position
                .try_play(next_move)
                .with_context(|| format!("replaying move #{}", ply + 1))?;
        }
        Ok(position)
    }

    #[must_use]
    pub const fn side_to_move(&self) -> Player {
        self.side_to_move
    }

    /// The raw forcing constraint: the cell of the last move. It does not
    /// apply when that sub-board is decided, see [`Position::legal_moves`].
    #[must_use]
    pub const fn forcing_board(&self) -> Option<u8> {
        self.forcing_board
    }

    /// Moves played since the starting position.
    #[must_use]
    pub fn history(&self) -> &[Move] {
        &self.history
    }

    #[must_use]
    pub fn last_move(&self) -> Option<Move> {
        self.history.last().copied()
    }

    /// Returns the sub-board with given index.
    #[must_use]
    pub fn sub_board(&self, board: u8) -> &Grid {
        &self.boards[board as usize]
    }

    /// Owner of the cell targeted by `cell_move`.
    #[must_use]
    pub fn at(&self, cell_move: Move) -> Option<Player> {
        self.sub_board(cell_move.board()).at(cell_move.cell())
    }

    #[must_use]
    pub fn board_winner(&self, board: u8) -> Option<Player> {
        self.sub_board(board).winner()
    }

    /// A sub-board is decided once it has a winner or no empty cells left.
    #[must_use]
    pub fn is_decided(&self, board: u8) -> bool {
        self.sub_board(board).is_decided()
    }

    /// Set of decided sub-boards.
    #[must_use]
    pub fn decided_boards(&self) -> Cells {
        let mut decided = Cells::empty();
        for board in 0..GRID_SIZE {
            if self.is_decided(board) {
                decided.insert(board);
            }
        }
        decided
    }

    /// The meta-board: sub-boards won by each player. Drawn sub-boards belong
    /// to nobody.
    #[must_use]
    pub fn meta_board(&self) -> Grid {
        let mut meta = Grid::default();
        for board in 0..GRID_SIZE {
            if let Some(winner) = self.board_winner(board) {
                meta.set(winner, board);
            }
        }
        meta
    }

    /// The forcing constraint that is actually in effect.
    fn active_forcing_board(&self) -> Option<u8> {
        self.forcing_board.filter(|&board| !self.is_decided(board))
    }

    fn push_empty_cells(&self, board: u8, moves: &mut MoveList) {
        for cell in (!self.sub_board(board).occupied()).iter() {
            moves.push(Move::new(board, cell));
        }
    }

    /// Calculates the list of legal moves in ascending order (sub-board
    /// major, then cell).
    ///
    /// The order is stable: the search relies on it to line up children of
    /// a node with moves.
    ///
    /// ```
    /// use iridium::game::core::Move;
    /// use iridium::game::position::Position;
    ///
    /// let mut position = Position::starting();
    /// position.play(Move::new(0, 4));
    /// // The opponent is sent to the center sub-board.
    /// let moves = position.legal_moves();
    /// assert_eq!(moves.len(), 9);
    /// assert!(moves.iter().all(|m| m.board() == 4));
    /// ```
    #[must_use]
    pub fn legal_moves(&self) -> MoveList {
        let mut moves = MoveList::new();
        if self.evaluate().is_some() {
            return moves;
        }
        match self.active_forcing_board() {
            Some(board) => self.push_empty_cells(board, &mut moves),
            None => {
                for board in 0..GRID_SIZE {
                    if !self.is_decided(board) {
                        self.push_empty_cells(board, &mut moves);
                    }
                }
            },
        }
        moves
    }

    #[must_use]
    pub fn is_legal(&self, candidate: Move) -> bool {
        self.legal_moves().contains(&candidate)
    }

    /// Makes a move for the side to move.
    ///
    /// The move must be legal, i.e. come from [`Position::legal_moves`].
    /// Untrusted input goes through [`Position::try_play`].
    pub fn play(&mut self, next_move: Move) {
        debug_assert!(
            self.is_legal(next_move),
            "illegal move {next_move} in position:\n{self:?}"
        );
        self.boards[next_move.board() as usize].set(self.side_to_move, next_move.cell());
        self.history.push(next_move);
        self.side_to_move = !self.side_to_move;
        self.forcing_board = Some(next_move.cell());
    }

    /// Validates and makes the move.
    pub fn try_play(&mut self, next_move: Move) -> anyhow::Result<()> {
        if self.is_game_over() {
            bail!("the game is over, {next_move} can not be played");
        }
        if !self.is_legal(next_move) {
            match self.active_forcing_board() {
                Some(board) => bail!(
                    "illegal move {next_move}: {} has to play into sub-board {board}",
                    self.side_to_move
                ),
                None => bail!("illegal move {next_move}: the cell is taken or its sub-board is decided"),
            }
        }
        self.play(next_move);
        Ok(())
    }

    /// Takes back the last move.
    ///
    /// # Panics
    ///
    /// Panics if no moves were played.
    pub fn unplay(&mut self) {
        let Some(last_move) = self.history.pop() else {
            panic!("unplay() requires at least one played move");
        };
        let mover = !self.side_to_move;
        self.boards[last_move.board() as usize].clear(mover, last_move.cell());
        self.side_to_move = mover;
        self.forcing_board = self.history.last().map(|m| m.cell());
    }

    /// Returns the winner of the game, `None` if there is none (yet).
    ///
    /// Sub-boards are decided by [`crate::game::bitboard::line_winner`] over
    /// cells and the game is decided by the same check over the meta-board.
    #[must_use]
    pub fn evaluate(&self) -> Option<Player> {
        self.meta_board().winner()
    }

    /// The game is over when either player has three sub-boards in a row or
    /// all sub-boards are decided. Equivalently, there are no legal moves.
    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.evaluate().is_some() || self.decided_boards().is_full()
    }

    /// Game result: "1-0" if X won, "0-1" if O won, "1/2-1/2" for a draw and
    /// "*" while the game goes on.
    #[must_use]
    pub fn result(&self) -> &'static str {
        match self.evaluate() {
            Some(Player::X) => "1-0",
            Some(Player::O) => "0-1",
            None if self.is_game_over() => "1/2-1/2",
            None => "*",
        }
    }

    /// Plays a uniformly random legal move. Used by playouts only.
    ///
    /// The game must not be over.
    pub fn random_play<R: Rng>(&mut self, rng: &mut R) {
        let moves = self.legal_moves();
        debug_assert!(!moves.is_empty(), "random_play() on a finished game");
        self.play(moves[rng.gen_range(0..moves.len())]);
    }

    /// Number of moves played so far.
    #[must_use]
    pub fn ply(&self) -> usize {
        self.history.len()
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::starting()
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.boards == other.boards
            && self.side_to_move == other.side_to_move
            && self.active_forcing_board() == other.active_forcing_board()
    }
}

impl Eq for Position {}

const SEPARATOR: &str = "  +-------+-------+-------+";

impl fmt::Display for Position {
    /// Renders the full 9×9 board with sub-board separators. Column letters
    /// and row numbers match the move notation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "    a b c   d e f   g h i")?;
        for row in 0..GRID_SIZE {
            if row % GRID_WIDTH == 0 {
                writeln!(f, "{SEPARATOR}")?;
            }
            write!(f, "{} |", row + 1)?;
            for column in 0..GRID_SIZE {
                // Coordinates are always within the board.
                let cell_move = Move::new(
                    (row / GRID_WIDTH) * GRID_WIDTH + column / GRID_WIDTH,
                    (row % GRID_WIDTH) * GRID_WIDTH + column % GRID_WIDTH,
                );
                match self.at(cell_move) {
                    Some(player) => write!(f, " {player}")?,
                    None => write!(f, " .")?,
                }
                if column % GRID_WIDTH == GRID_WIDTH - 1 {
                    write!(f, " |")?;
                }
            }
            writeln!(f)?;
        }
        write!(f, "{SEPARATOR}")
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{self}")?;
        writeln!(f, "Player to move: {}", self.side_to_move)?;
        match self.active_forcing_board() {
            Some(board) => writeln!(f, "Forced into sub-board: {board}")?,
            None => writeln!(f, "Forced into sub-board: any")?,
        }
        write!(
            f,
            "Moves: {}",
            itertools::join(self.history.iter(), " ")
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn moves(notation: &str) -> Vec<Move> {
        notation
            .split_whitespace()
            .map(|m| Move::from_notation(m).unwrap())
            .collect()
    }

    #[test]
    fn starting_position() {
        let position = Position::starting();
        let legal = position.legal_moves();
        assert_eq!(legal.len(), 81);
        assert!(legal.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(legal[0], Move::new(0, 0));
        assert_eq!(legal[80], Move::new(8, 8));
        assert_eq!(position.side_to_move(), Player::X);
        assert_eq!(position.forcing_board(), None);
        assert_eq!(position.evaluate(), None);
        assert!(!position.is_game_over());
        assert_eq!(position.result(), "*");
    }

    #[test]
    fn forcing() {
        let mut position = Position::starting();
        position.play(Move::new(0, 4));
        assert_eq!(position.forcing_board(), Some(4));
        assert_eq!(position.side_to_move(), Player::O);
        let expected: Vec<Move> = (0..9).map(|cell| Move::new(4, cell)).collect();
        assert_eq!(position.legal_moves().to_vec(), expected);

        position.play(Move::new(4, 0));
        // Back to sub-board 0 which already has one cell taken.
        let expected: Vec<Move> = (0..9)
            .filter(|&cell| cell != 4)
            .map(|cell| Move::new(0, cell))
            .collect();
        assert_eq!(position.legal_moves().to_vec(), expected);
    }

    #[test]
    fn decided_forcing_board_lifts_constraint() {
        // X takes the middle row of sub-board 0 while O keeps sending X back.
        let mut position = Position::starting();
        for cell in [3, 4, 5] {
            position.play(Move::new(0, cell));
            position.play(Move::new(cell, 0));
        }
        assert_eq!(position.board_winner(0), Some(Player::X));
        assert!(position.is_decided(0));
        // O's last move was into cell 0: sub-board 0 is decided, so X may
        // play anywhere that is still open.
        assert_eq!(position.forcing_board(), Some(0));
        let legal = position.legal_moves();
        assert!(legal.iter().all(|m| m.board() != 0));
        assert_eq!(legal.len(), 81 - 9 - 3);
    }

    #[test]
    fn unplay_restores_position() {
        let mut position = Position::from_moves(moves("e5 e4 d2 a5 b5 e6 e8 d4")).unwrap();
        assert_eq!(position.legal_moves().len(), 9);
        let before = position.clone();
        let before_history = position.history().to_vec();
        for next_move in position.legal_moves() {
            position.play(next_move);
            position.unplay();
            assert_eq!(position, before);
            assert_eq!(position.forcing_board(), before.forcing_board());
            assert_eq!(position.history(), before_history.as_slice());
        }
    }

    #[test]
    fn unplay_to_start() {
        let mut position = Position::starting();
        position.play(Move::new(3, 3));
        position.unplay();
        assert_eq!(position.forcing_board(), None);
        assert_eq!(position, Position::starting());
    }

    #[test]
    #[should_panic(expected = "unplay() requires at least one played move")]
    fn unplay_empty() {
        Position::starting().unplay();
    }

    #[test]
    fn try_play() {
        let mut position = Position::starting();
        position.try_play(Move::new(0, 4)).unwrap();
        let error = position.try_play(Move::new(0, 0)).unwrap_err();
        assert_eq!(
            error.to_string(),
            "illegal move a1: O has to play into sub-board 4"
        );
        assert!(position.try_play(Move::new(4, 4)).is_ok());
        assert!(position.try_play(Move::new(4, 4)).is_err());
    }

    #[test]
    fn from_moves_rejects_illegal() {
        assert!(Position::from_moves(moves("e5 e4")).is_ok());
        let error = Position::from_moves(moves("e5 a1")).unwrap_err();
        assert_eq!(error.to_string(), "replaying move #2");
    }

    #[test]
    fn equality_ignores_history() {
        // The same cells and forcing board reached in a different order.
        let a = Position::from_moves(moves("a1 b1 d1 c1 g1")).unwrap();
        let b = Position::from_moves(moves("a1 c1 g1 b1 d1")).unwrap();
        assert_ne!(a.history(), b.history());
        assert_eq!(a, b);
        let c = Position::from_moves(moves("a1 b1 d1 c1")).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn random_games_terminate() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..50 {
            let mut position = Position::starting();
            while !position.is_game_over() {
                assert!(!position.legal_moves().is_empty());
                position.random_play(&mut rng);
            }
            assert!(position.legal_moves().is_empty());
            assert!(position.ply() <= 81);
            assert_ne!(position.result(), "*");
        }
    }

    #[test]
    fn display() {
        let position = Position::from_moves(moves("e5 e4")).unwrap();
        let expected = "    a b c   d e f   g h i
  +-------+-------+-------+
1 | . . . | . . . | . . . |
2 | . . . | . . . | . . . |
3 | . . . | . . . | . . . |
  +-------+-------+-------+
4 | . . . | . O . | . . . |
5 | . . . | . X . | . . . |
6 | . . . | . . . | . . . |
  +-------+-------+-------+
7 | . . . | . . . | . . . |
8 | . . . | . . . | . . . |
9 | . . . | . . . | . . . |
  +-------+-------+-------+";
        assert_eq!(position.to_string(), expected);
    }
}
