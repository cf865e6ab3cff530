//! Static evaluation of Hex positions

use std::collections::VecDeque;

use crate::board::{HexBoard, Move, Side};

/// Distance reported when a side can no longer reach its far edge
pub const UNREACHABLE: i32 = (crate::MAX_SIZE * crate::MAX_SIZE + 1) as i32;

/// How opponent stones are treated by the shortest-path distance
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum OpponentCells {
    /// Opponent stones cost the same as empty cells to pass through
    Passable,
    /// Opponent stones can't be passed through
    Blocking,
}

/// How the obstruction count is scaled
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ObstructionScale {
    /// Halve the number of contacts with opponent stones
    Halved,
    /// Count every contact with an opponent stone once
    Full,
}

#[derive(Copy, Clone, Debug)]
pub struct EvaluatorConfig {
    pub opponent_cells: OpponentCells,
    pub obstruction: ObstructionScale,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            opponent_cells: OpponentCells::Passable,
            obstruction: ObstructionScale::Halved,
        }
    }
}

/// Scores positions from the point of view of one side
///
/// # Position Scoring
/// `score = (opponent distance - own distance) + connectivity + obstruction`,
/// where a distance is the number of stones a side still has to place to join
/// its two edges, connectivity counts adjacent pairs of the side's own stones
/// and obstruction counts contacts between the side's stones and the
/// opponent's. Higher is better for the side being scored.
#[derive(Copy, Clone, Debug, Default)]
pub struct Evaluator {
    config: EvaluatorConfig,
}

impl Evaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> EvaluatorConfig {
        self.config
    }

    pub fn evaluate(&self, board: &HexBoard, side: Side) -> i32 {
        let own = self.distance(board, side);
        let opponent = self.distance(board, side.opponent());
        (opponent - own) + self.connectivity(board, side) + self.obstruction(board, side)
    }

    /// Number of cells `side` still has to fill to connect its edges
    ///
    /// Shortest path over the cell graph where entering one of the side's own
    /// stones costs 0 and entering any other cell costs 1. Costs are only ever
    /// 0 or 1, so a deque replaces the priority queue.
    pub fn distance(&self, board: &HexBoard, side: Side) -> i32 {
        let size = board.size();
        let index = |mv: Move| mv.row() * size + mv.col();
        let mut distances = vec![UNREACHABLE; size * size];
        let mut queue = VecDeque::with_capacity(size * size);

        for mv in board.starting_edge(side) {
            if let Some(cost) = self.enter_cost(board, side, mv) {
                distances[index(mv)] = cost;
                if cost == 0 {
                    queue.push_front(mv);
                } else {
                    queue.push_back(mv);
                }
            }
        }

        let mut best = UNREACHABLE;
        while let Some(current) = queue.pop_front() {
            let distance = distances[index(current)];
            // everything left in the queue is at least this far away
            if distance >= best {
                break;
            }
            if board.on_far_edge(side, current) {
                best = distance;
                continue;
            }
            for next in board.neighbors(current) {
                let cost = match self.enter_cost(board, side, next) {
                    Some(cost) => cost,
                    None => continue,
                };
                let candidate = distance + cost;
                if candidate < distances[index(next)] {
                    distances[index(next)] = candidate;
                    if cost == 0 {
                        queue.push_front(next);
                    } else {
                        queue.push_back(next);
                    }
                }
            }
        }
        best
    }

    /// Number of adjacent pairs of `side` stones
    pub fn connectivity(&self, board: &HexBoard, side: Side) -> i32 {
        // every pair is seen once from each of its stones
        self.contacts(board, side, side) / 2
    }

    /// Contacts between `side` stones and opponent stones
    pub fn obstruction(&self, board: &HexBoard, side: Side) -> i32 {
        let contacts = self.contacts(board, side.opponent(), side);
        match self.config.obstruction {
            ObstructionScale::Halved => contacts / 2,
            ObstructionScale::Full => contacts,
        }
    }

    // counts, for every stone of `from`, its neighbours owned by `to`
    fn contacts(&self, board: &HexBoard, from: Side, to: Side) -> i32 {
        let size = board.size();
        let mut count = 0;
        for row in 0..size {
            for col in 0..size {
                let mv = Move::new(row, col);
                if board.owner(mv) == Some(from) {
                    count += board
                        .neighbors(mv)
                        .filter(|&n| board.owner(n) == Some(to))
                        .count() as i32;
                }
            }
        }
        count
    }

    fn enter_cost(&self, board: &HexBoard, side: Side, mv: Move) -> Option<i32> {
        match board.owner(mv) {
            None => Some(1),
            Some(owner) if owner == side => Some(0),
            Some(_) => match self.config.opponent_cells {
                OpponentCells::Passable => Some(1),
                OpponentCells::Blocking => None,
            },
        }
    }
}
