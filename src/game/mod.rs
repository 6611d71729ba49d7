//! Implementation of the Ultimate Tic-Tac-Toe rules.
//!
//! The board consists of nine 3×3 sub-boards. Cells are addressed either by
//! `(board, cell)` pairs or by the row and column on the 9×9 grid, see
//! [`core::Move`].

pub mod bitboard;
pub mod core;
pub mod position;
