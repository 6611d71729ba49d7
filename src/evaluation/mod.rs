//! This module implements "static" [evaluation], i.e. predicting the relative
//! value/score of given position without [`crate::search`].
//!
//! The heuristic is only consulted by the negamax search at its depth cutoff.
//! Finished games are scored by the search itself.
//!
//! [evaluation]: https://www.chessprogramming.org/Evaluation

mod score;

pub use score::Score;

use crate::game::core::{Move, Player, GRID_SIZE};
use crate::game::position::Position;

/// Weight of a grid location: the center takes part in four lines, corners in
/// three and edges in two.
const LOCATION_WEIGHTS: [i32; GRID_SIZE as usize] = [3, 2, 3, 2, 4, 2, 3, 2, 3];
/// Value of winning a sub-board, multiplied by its location weight.
const SUB_BOARD_VALUE: i32 = 100;
/// Value of holding the center cell of an undecided sub-board.
const CENTER_VALUE: i32 = 10;

const CENTER: u8 = 4;

/// Evaluates the position from the perspective of the side to move.
///
/// Sub-boards won are weighted by their location on the meta-board. Inside
/// undecided sub-boards, the center cell is worth a little.
///
/// ```
/// use iridium::evaluation::{heuristic, Score};
/// use iridium::game::position::Position;
///
/// assert_eq!(heuristic(&Position::starting()), Score::DRAW);
/// ```
#[must_use]
pub fn heuristic(position: &Position) -> Score {
    let perspective = |player: Player| {
        if player == position.side_to_move() {
            1
        } else {
            -1
        }
    };
    let mut value = 0;
    for board in 0..GRID_SIZE {
        match position.board_winner(board) {
            Some(winner) => {
                value += perspective(winner) * SUB_BOARD_VALUE * LOCATION_WEIGHTS[board as usize];
            },
            None if !position.is_decided(board) => {
                if let Some(owner) = position.at(Move::new(board, CENTER)) {
                    value += perspective(owner) * CENTER_VALUE;
                }
            },
            None => {},
        }
    }
    Score::heuristic(value)
}
