//! An agent to pick moves in the game of Hex under a time budget

use log::{debug, info, warn};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{board::*, evaluator::*, transposition_table::*, LOSS_SCORE, WIN_SCORE};

/// A score no position can reach, used to open the search window
const INFINITY: i32 = WIN_SCORE + 1;

/// The deepest iteration attempted when none is configured
pub const DEFAULT_MAX_DEPTH: u32 = 64;

/// Sorts moves by descending score, moves with equal scores keep the order
/// they were pushed in
struct MoveSorter {
    // move and score, kept in ascending score order
    moves: Vec<(Move, i32)>,
}

impl MoveSorter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            moves: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, new_move: Move, score: i32) {
        let mut pos = self.moves.len();
        self.moves.push((new_move, score));
        // slide in below every move that scores at least as well
        while pos != 0 && self.moves[pos - 1].1 >= score {
            self.moves[pos] = self.moves[pos - 1];
            pos -= 1;
        }
        self.moves[pos] = (new_move, score);
    }
}

impl Iterator for MoveSorter {
    type Item = Move;

    fn next(&mut self) -> Option<Self::Item> {
        self.moves.pop().map(|(mv, _)| mv)
    }
}

/// Orders `moves` by how the side to move scores the position right after
/// each of them, best first
pub fn order_moves(board: &mut HexBoard, moves: &[Move], evaluator: &Evaluator) -> Vec<Move> {
    let side = board.side_to_move();
    let mut sorter = MoveSorter::with_capacity(moves.len());
    for &mv in moves {
        board.play(mv);
        let score = evaluator.evaluate(board, side);
        board.undo();
        sorter.push(mv, score);
    }
    sorter.collect()
}

/// Marker for a search cut short by the time budget, a stop request or the
/// node limit
#[derive(Debug)]
struct Aborted;

#[derive(Copy, Clone, Debug)]
pub struct SearchConfig {
    /// Deepest iteration of iterative deepening
    pub max_depth: u32,
    /// Abort the running iteration after this many nodes
    pub node_limit: Option<u64>,
    /// Search root moves in evaluator order
    pub move_ordering: bool,
    /// Cut off branches that can't change the result
    pub pruning: bool,
    /// Reuse results for positions already searched during this decision
    pub transpositions: bool,
    /// Play an immediate win, or block the opponent's only immediate win,
    /// without searching
    pub immediate_wins: bool,
    pub evaluator: EvaluatorConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            node_limit: None,
            move_ordering: true,
            pruning: true,
            transpositions: true,
            immediate_wins: true,
            evaluator: EvaluatorConfig::default(),
        }
    }
}

impl SearchConfig {
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_node_limit(mut self, node_limit: u64) -> Self {
        self.node_limit = Some(node_limit);
        self
    }

    pub fn with_move_ordering(mut self, enabled: bool) -> Self {
        self.move_ordering = enabled;
        self
    }

    pub fn with_pruning(mut self, enabled: bool) -> Self {
        self.pruning = enabled;
        self
    }

    pub fn with_transpositions(mut self, enabled: bool) -> Self {
        self.transpositions = enabled;
        self
    }

    pub fn with_immediate_wins(mut self, enabled: bool) -> Self {
        self.immediate_wins = enabled;
        self
    }

    pub fn with_evaluator(mut self, evaluator: EvaluatorConfig) -> Self {
        self.evaluator = evaluator;
        self
    }
}

/// How a [`SearchOutcome`] was reached (for diagnostics only)
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SearchMode {
    /// Best move of the deepest completed iteration
    IterativeDeepening,
    /// Only one sensible move, no search was run
    Forced,
    /// No iteration completed in time, the best ordered move was taken
    Fallback,
    /// The position has no legal move
    NoMoves,
}

#[derive(Copy, Clone, Debug)]
pub struct SearchOutcome {
    pub best_move: Option<Move>,
    /// Score of `best_move` at `depth_reached`, if a search completed
    pub score: Option<i32>,
    pub node_count: u64,
    pub depth_reached: u32,
    pub mode: SearchMode,
}

/// Asks a running search to stop, usable from any thread
#[derive(Clone, Default, Debug)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ends the search in progress as if its time budget ran out
    pub fn notify_time_expired(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_expired(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// An agent to choose Hex moves
///
/// # Notes
/// The agent runs an alpha-beta pruned minimax at increasing depths until its
/// time budget runs out, keeping the best move of the deepest search that
/// finished. Positions at the search horizon are scored by an [`Evaluator`].
///
/// # Position Scoring
/// Scores are from the point of view of the side to move at the root. A won
/// position scores `WIN_SCORE` minus the number of moves played from the root
/// to reach it and a lost one `LOSS_SCORE` plus that number, so faster wins
/// and slower losses are preferred. Anything else is the evaluator's score.
#[derive(Clone)]
pub struct Solver {
    board: HexBoard,

    /// The number of nodes searched by this `Solver` during the last decision
    /// (for diagnostics only)
    pub node_count: u64,
    transposition_table: TranspositionTable,
    evaluator: Evaluator,
    config: SearchConfig,
    // side the search is run for
    side: Side,
    deadline: Option<Instant>,
    stop: StopHandle,
}

impl Solver {
    /// Creates a new `Solver` for a position
    pub fn new(board: HexBoard) -> Self {
        Self::new_with_transposition_table(board, TranspositionTable::new())
    }

    /// Creates a new `Solver` for a position with a given transposition table
    pub fn new_with_transposition_table(
        board: HexBoard,
        transposition_table: TranspositionTable,
    ) -> Self {
        let side = board.side_to_move();
        Self {
            board,
            node_count: 0,
            transposition_table,
            evaluator: Evaluator::default(),
            config: SearchConfig::default(),
            side,
            deadline: None,
            stop: StopHandle::new(),
        }
    }

    /// Replaces the search configuration of an existing `Solver`
    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.evaluator = Evaluator::new(config.evaluator);
        self.config = config;
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// A handle that can end the running search from another thread
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Plays a move on the position being analysed
    pub fn play(&mut self, mv: Move) -> anyhow::Result<()> {
        self.board.play_checked(mv)
    }

    /// Chooses a move for the side to move within `time_budget`
    ///
    /// Search depth grows one ply at a time. An iteration interrupted by the
    /// budget, a stop request or the node limit is thrown away and the move of
    /// the last completed iteration is returned.
    pub fn select_move(&mut self, time_budget: Duration) -> SearchOutcome {
        let start = Instant::now();
        self.node_count = 0;
        self.transposition_table.clear();
        self.stop.reset();
        self.deadline = start.checked_add(time_budget);
        self.side = self.board.side_to_move();

        let moves = self.board.legal_moves();
        if moves.is_empty() {
            warn!("no legal move for {}", self.side);
            return self.outcome(None, None, 0, SearchMode::NoMoves);
        }

        let mut candidates = moves;
        if self.config.immediate_wins {
            if let Some(&win) = self.board.winning_moves(self.side).first() {
                info!("{} wins with {}", self.side, win);
                return self.outcome(Some(win), None, 0, SearchMode::Forced);
            }
            candidates = self.safe_moves(candidates);
            if candidates.len() == 1 {
                info!("{} plays forced move {}", self.side, candidates[0]);
                return self.outcome(Some(candidates[0]), None, 0, SearchMode::Forced);
            }
        }
        if self.config.move_ordering {
            candidates = order_moves(&mut self.board, &candidates, &self.evaluator);
        }

        let mut best: Option<(i32, Move)> = None;
        let mut depth_reached = 0;
        // no line can be longer than the number of empty cells
        let max_depth = self.config.max_depth.min(self.board.empty_count() as u32);
        for depth in 1..=max_depth {
            match self.search_root(&candidates, depth) {
                Ok((score, mv)) => {
                    best = Some((score, mv));
                    depth_reached = depth;
                    debug!(
                        "depth {}: best {} score {} nodes {} after {:?}",
                        depth,
                        mv,
                        score,
                        self.node_count,
                        start.elapsed()
                    );
                    // search the best move first on the next pass
                    if let Some(i) = candidates.iter().position(|&m| m == mv) {
                        candidates[..=i].rotate_right(1);
                    }
                    if score.abs() >= DECISIVE_SCORE {
                        break;
                    }
                }
                Err(Aborted) => {
                    debug!("depth {} aborted after {} nodes", depth, self.node_count);
                    break;
                }
            }
        }

        let outcome = match best {
            Some((score, mv)) => self.outcome(
                Some(mv),
                Some(score),
                depth_reached,
                SearchMode::IterativeDeepening,
            ),
            None => {
                warn!(
                    "no search depth completed for {}, falling back to {}",
                    self.side, candidates[0]
                );
                self.outcome(Some(candidates[0]), None, 0, SearchMode::Fallback)
            }
        };
        info!(
            "{} chose {} at depth {} ({} nodes in {:?})",
            self.side,
            outcome
                .best_move
                .map_or_else(|| "nothing".to_string(), |mv| mv.to_string()),
            outcome.depth_reached,
            outcome.node_count,
            start.elapsed()
        );
        outcome
    }

    /// Runs a single search of the current position to a fixed depth, without
    /// a time limit and without clearing the transposition table
    ///
    /// Returns the score and best move, or `None` if there is no legal move
    /// or `depth` is 0.
    pub fn search(&mut self, depth: u32) -> Option<(i32, Move)> {
        self.stop.reset();
        self.deadline = None;
        self.side = self.board.side_to_move();

        let mut moves = self.board.legal_moves();
        if moves.is_empty() || depth == 0 {
            return None;
        }
        if self.config.move_ordering {
            moves = order_moves(&mut self.board, &moves, &self.evaluator);
        }
        self.search_root(&moves, depth).ok()
    }

    /// Searches every root candidate, returning the best score and move
    fn search_root(&mut self, candidates: &[Move], depth: u32) -> Result<(i32, Move), Aborted> {
        debug_assert!(!candidates.is_empty() && depth > 0);
        let mut alpha = -INFINITY;
        let mut best = (-INFINITY, candidates[0]);

        for &mv in candidates {
            self.check_limits()?;
            self.board.play(mv);
            let result = self.alpha_beta(depth - 1, 1, alpha, INFINITY, false);
            self.board.undo();
            let score = result?;

            if score > best.0 {
                best = (score, mv);
            }
            if self.config.pruning {
                alpha = alpha.max(score);
            }
        }
        Ok(best)
    }

    /// Performs game tree search
    ///
    /// `depth` is the number of moves left to search below this node and `ply`
    /// the number of moves played since the root. Returns the score of the
    /// position (see [Position Scoring]).
    ///
    /// [Position Scoring]: #position-scoring
    fn alpha_beta(
        &mut self,
        depth: u32,
        ply: u32,
        mut alpha: i32,
        mut beta: i32,
        maximizing: bool,
    ) -> Result<i32, Aborted> {
        self.check_limits()?;
        self.node_count += 1;

        let key = self.board.fingerprint();
        if self.config.transpositions {
            if let Some(entry) = self.transposition_table.probe(key, depth) {
                let value = score_from_table(entry.value, ply);
                match entry.bound {
                    Bound::Exact => return Ok(value),
                    Bound::Lower => alpha = alpha.max(value),
                    Bound::Upper => beta = beta.min(value),
                }
                if alpha >= beta {
                    return Ok(value);
                }
            }
        }

        if let Some(winner) = self.board.winner() {
            return Ok(if winner == self.side {
                WIN_SCORE - ply as i32
            } else {
                LOSS_SCORE + ply as i32
            });
        }

        if depth == 0 {
            let value = self.evaluator.evaluate(&self.board, self.side);
            self.store(key, value, Bound::Exact, 0, ply);
            return Ok(value);
        }

        let moves = self.board.legal_moves();
        if moves.is_empty() {
            // a full board without a winner, impossible in Hex
            return Ok(0);
        }

        let (alpha_in, beta_in) = (alpha, beta);
        let mut best = if maximizing { -INFINITY } else { INFINITY };
        for mv in moves {
            self.board.play(mv);
            let result = self.alpha_beta(depth - 1, ply + 1, alpha, beta, !maximizing);
            self.board.undo();
            let score = result?;

            if maximizing {
                best = best.max(score);
                alpha = alpha.max(best);
            } else {
                best = best.min(score);
                beta = beta.min(best);
            }
            if self.config.pruning && beta <= alpha {
                break;
            }
        }

        let bound = if best <= alpha_in {
            Bound::Upper
        } else if best >= beta_in {
            Bound::Lower
        } else {
            Bound::Exact
        };
        self.store(key, best, bound, depth, ply);
        Ok(best)
    }

    fn store(&mut self, key: u64, value: i32, bound: Bound, depth: u32, ply: u32) {
        if self.config.transpositions {
            let value = score_to_table(value, ply);
            self.transposition_table
                .store(key, Entry { value, bound, depth });
        }
    }

    fn check_limits(&self) -> Result<(), Aborted> {
        if self.stop.is_expired() {
            return Err(Aborted);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(Aborted);
            }
        }
        if let Some(limit) = self.config.node_limit {
            if self.node_count >= limit {
                return Err(Aborted);
            }
        }
        Ok(())
    }

    /// Moves after which the opponent has no immediate win, or every move if
    /// none of them is safe
    fn safe_moves(&mut self, moves: Vec<Move>) -> Vec<Move> {
        let threats = self.board.winning_moves(self.side.opponent());
        if threats.is_empty() {
            return moves;
        }
        // stones are never removed, so a threat can only be stopped by
        // occupying its cell
        let safe: Vec<Move> = moves
            .iter()
            .copied()
            .filter(|mv| threats.iter().all(|threat| threat == mv))
            .collect();
        if safe.is_empty() {
            moves
        } else {
            safe
        }
    }

    fn outcome(
        &self,
        best_move: Option<Move>,
        score: Option<i32>,
        depth_reached: u32,
        mode: SearchMode,
    ) -> SearchOutcome {
        SearchOutcome {
            best_move,
            score,
            node_count: self.node_count,
            depth_reached,
            mode,
        }
    }
}

impl std::ops::Deref for Solver {
    type Target = HexBoard;

    fn deref(&self) -> &Self::Target {
        &self.board
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_sorter_is_stable() {
        let mut sorter = MoveSorter::with_capacity(4);
        sorter.push(Move::new(0, 0), 1);
        sorter.push(Move::new(0, 1), 5);
        sorter.push(Move::new(0, 2), 1);
        sorter.push(Move::new(0, 3), 5);

        let order: Vec<Move> = sorter.collect();
        assert_eq!(
            order,
            vec![
                Move::new(0, 1),
                Move::new(0, 3),
                Move::new(0, 0),
                Move::new(0, 2)
            ]
        );
    }

    #[test]
    fn stop_handle_is_shared() {
        let handle = StopHandle::new();
        let clone = handle.clone();
        assert!(!handle.is_expired());
        clone.notify_time_expired();
        assert!(handle.is_expired());
        handle.reset();
        assert!(!clone.is_expired());
    }
}
