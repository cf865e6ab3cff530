//! A time-bounded agent for playing the connection game 'Hex'
//!
//! This agent searches the game tree with an iterative-deepening,
//! alpha-beta-pruned minimax backed by a transposition table, and scores
//! the positions at its search horizon with a shortest-path-to-connect
//! heuristic.
//!
//! # Basic Usage
//!
//! ```
//! use hex_ai::{board::HexBoard, solver::Solver};
//! use std::time::Duration;
//!
//!# use std::error::Error;
//!# fn main() -> Result<(), Box<dyn Error>> {
//! let board = HexBoard::from_moves(3, "b2 a2")?;
//! let mut solver = Solver::new(board);
//! let outcome = solver.select_move(Duration::from_millis(500));
//!
//! assert!(outcome.best_move.is_some());
//!# Ok(())
//!# }
//! ```

use static_assertions::*;
pub use anyhow;

pub mod board;

pub mod evaluator;

pub mod transposition_table;

pub mod solver;

mod test;

/// The largest supported board side length
pub const MAX_SIZE: usize = 26;

/// The board side length used when none is given
pub const DEFAULT_SIZE: usize = 9;

/// Score of a position won by the searching side, before the ply adjustment
pub const WIN_SCORE: i32 = 1_000_000;

/// Score of a position lost by the searching side, before the ply adjustment
pub const LOSS_SCORE: i32 = -WIN_SCORE;

// columns are written as a single letter in move notation
const_assert!(MAX_SIZE >= 1 && MAX_SIZE <= 26);
// ply-adjusted win scores must stay clear of any heuristic score
const_assert!((MAX_SIZE * MAX_SIZE * 8) < WIN_SCORE as usize / 2);
