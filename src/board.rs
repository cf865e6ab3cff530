use anyhow::{anyhow, Result};

use std::fmt;
use std::str::FromStr;

use crate::MAX_SIZE;

mod zobrist {
    use rand::{RngCore, SeedableRng};
    use rand_xoshiro::Xoshiro256PlusPlus;

    use std::sync::OnceLock;

    use crate::MAX_SIZE;

    const SEED: u64 = 0x9E37_79B9_7F4A_7C15;

    static KEYS: OnceLock<Vec<[u64; 2]>> = OnceLock::new();

    /// Key for a stone of `side` on the cell at `row`, `col`
    ///
    /// Keys are laid out on a `MAX_SIZE` grid so that a cell has the same key
    /// whatever the size of the board it sits on.
    pub fn key(row: usize, col: usize, side: usize) -> u64 {
        KEYS.get_or_init(|| {
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(SEED);
            (0..MAX_SIZE * MAX_SIZE)
                .map(|_| [rng.next_u64(), rng.next_u64()])
                .collect()
        })[row * MAX_SIZE + col][side]
    }
}

/// Hex adjacency on a rhombus board, as (row, column) offsets
const DIRECTIONS: [(isize, isize); 6] = [(-1, 0), (-1, 1), (0, -1), (0, 1), (1, -1), (1, 0)];

/// One of the two players
///
/// `PlayerOne` moves first and connects the top row to the bottom row,
/// `PlayerTwo` connects the left column to the right column.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Side {
    PlayerOne,
    PlayerTwo,
}

impl Side {
    pub fn opponent(self) -> Self {
        match self {
            Side::PlayerOne => Side::PlayerTwo,
            Side::PlayerTwo => Side::PlayerOne,
        }
    }

    fn index(self) -> usize {
        match self {
            Side::PlayerOne => 0,
            Side::PlayerTwo => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::PlayerOne => write!(f, "Player 1"),
            Side::PlayerTwo => write!(f, "Player 2"),
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Cell {
    Empty,
    Stone(Side),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn owner(&self) -> Option<Side> {
        match self {
            Cell::Empty => None,
            Cell::Stone(side) => Some(*side),
        }
    }
}

/// A board coordinate, written as a column letter and a 1-based row number (`c4`)
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct Move {
    row: u8,
    col: u8,
}

impl Move {
    pub fn new(row: usize, col: usize) -> Self {
        debug_assert!(row < MAX_SIZE && col < MAX_SIZE);
        Self {
            row: row as u8,
            col: col as u8,
        }
    }

    pub fn row(&self) -> usize {
        self.row as usize
    }

    pub fn col(&self) -> usize {
        self.col as usize
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.col) as char, self.row + 1)
    }
}

impl FromStr for Move {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let mut chars = s.chars();
        let col = match chars.next() {
            Some(letter @ 'a'..='z') => letter as usize - 'a' as usize,
            Some(letter @ 'A'..='Z') => letter as usize - 'A' as usize,
            _ => return Err(anyhow!("could not parse '{}' as a move, expected e.g. 'c4'", s)),
        };
        let row = chars
            .as_str()
            .parse::<usize>()
            .map_err(|_| anyhow!("could not parse '{}' as a move, expected e.g. 'c4'", s))?;
        if row < 1 || row > MAX_SIZE || col >= MAX_SIZE {
            return Err(anyhow!("move '{}' is outside of any supported board", s));
        }
        Ok(Move::new(row - 1, col))
    }
}

// everything needed to take back one played stone
#[derive(Copy, Clone)]
struct Undo {
    index: usize,
    winner: Option<Side>,
}

/// An N×N Hex position with make/unmake move support
///
/// The position keeps a Zobrist fingerprint of its cell contents up to date as
/// stones are placed and taken back, and records the winner as soon as a
/// stone completes a connection.
#[derive(Clone)]
pub struct HexBoard {
    size: usize,
    cells: Vec<Cell>,
    to_move: Side,
    winner: Option<Side>,
    stones: usize,
    fingerprint: u64,
    history: Vec<Undo>,
    // flood fill scratch space, a cell is visited when its mark equals `stamp`
    marks: Vec<u32>,
    stamp: u32,
}

impl HexBoard {
    /// Creates an empty board with `PlayerOne` to move
    pub fn new(size: usize) -> Result<Self> {
        if size < 1 || size > MAX_SIZE {
            return Err(anyhow!(
                "Invalid board size {}, sizes must be between 1 and {}",
                size,
                MAX_SIZE
            ));
        }
        Ok(Self {
            size,
            cells: vec![Cell::Empty; size * size],
            to_move: Side::PlayerOne,
            winner: None,
            stones: 0,
            fingerprint: 0,
            history: Vec::with_capacity(size * size),
            marks: vec![0; size * size],
            stamp: 0,
        })
    }

    /// Creates a board by playing whitespace separated moves from an empty board
    pub fn from_moves<S: AsRef<str>>(size: usize, moves: S) -> Result<Self> {
        let mut board = Self::new(size)?;
        for token in moves.as_ref().split_whitespace() {
            let mv = token.parse::<Move>()?;
            board.play_checked(mv)?;
        }
        Ok(board)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cell(&self, row: usize, col: usize) -> Cell {
        self.cells[row * self.size + col]
    }

    pub fn owner(&self, mv: Move) -> Option<Side> {
        self.cells[self.index(mv)].owner()
    }

    pub fn side_to_move(&self) -> Side {
        self.to_move
    }

    pub fn set_side_to_move(&mut self, side: Side) {
        self.to_move = side;
    }

    /// Number of stones on the board
    pub fn stone_count(&self) -> usize {
        self.stones
    }

    pub fn empty_count(&self) -> usize {
        self.cells.len() - self.stones
    }

    /// Key for the transposition table, a function of the cell contents only
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn winner(&self) -> Option<Side> {
        self.winner
    }

    pub fn is_terminal(&self) -> bool {
        self.winner.is_some()
    }

    pub fn contains(&self, mv: Move) -> bool {
        mv.row() < self.size && mv.col() < self.size
    }

    /// Cells adjacent to `mv`, in a fixed direction order
    pub fn neighbors(&self, mv: Move) -> impl Iterator<Item = Move> {
        let size = self.size as isize;
        let (row, col) = (mv.row() as isize, mv.col() as isize);
        DIRECTIONS.iter().filter_map(move |&(dr, dc)| {
            let (r, c) = (row + dr, col + dc);
            if r >= 0 && r < size && c >= 0 && c < size {
                Some(Move::new(r as usize, c as usize))
            } else {
                None
            }
        })
    }

    /// Empty cells in row-major order, or nothing once the game is over
    pub fn legal_moves(&self) -> Vec<Move> {
        if self.is_terminal() {
            return Vec::new();
        }
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_empty())
            .map(|(i, _)| Move::new(i / self.size, i % self.size))
            .collect()
    }

    pub fn playable(&self, mv: Move) -> bool {
        !self.is_terminal() && self.contains(mv) && self.cells[self.index(mv)].is_empty()
    }

    /// The cells a shortest connection for `side` may start from
    pub fn starting_edge(&self, side: Side) -> impl Iterator<Item = Move> {
        let size = self.size;
        (0..size).map(move |i| match side {
            Side::PlayerOne => Move::new(0, i),
            Side::PlayerTwo => Move::new(i, 0),
        })
    }

    /// Whether `mv` lies on the edge `side` is trying to reach
    pub fn on_far_edge(&self, side: Side, mv: Move) -> bool {
        match side {
            Side::PlayerOne => mv.row() == self.size - 1,
            Side::PlayerTwo => mv.col() == self.size - 1,
        }
    }

    /// Plays a move for the side to move after checking that it is legal
    pub fn play_checked(&mut self, mv: Move) -> Result<()> {
        if self.is_terminal() {
            return Err(anyhow!("Invalid move {}, the game is already over", mv));
        }
        if !self.contains(mv) {
            return Err(anyhow!(
                "Invalid move {}, outside of the {}x{} board",
                mv,
                self.size,
                self.size
            ));
        }
        if !self.cells[self.index(mv)].is_empty() {
            return Err(anyhow!("Invalid move {}, cell already occupied", mv));
        }
        self.play(mv);
        Ok(())
    }

    /// Plays a move for the side to move
    ///
    /// The move must be legal, see [`HexBoard::play_checked`].
    pub fn play(&mut self, mv: Move) {
        debug_assert!(self.playable(mv));
        let index = self.index(mv);
        let winner = self.winner;
        self.put(index, self.to_move);
        self.history.push(Undo { index, winner });
        self.to_move = self.to_move.opponent();
    }

    /// Takes back the last move made with [`HexBoard::play`], returning it
    pub fn undo(&mut self) -> Option<Move> {
        let Undo { index, winner } = self.history.pop()?;
        let side = self.to_move.opponent();
        let mv = Move::new(index / self.size, index % self.size);
        self.cells[index] = Cell::Empty;
        self.fingerprint ^= zobrist::key(mv.row(), mv.col(), side.index());
        self.stones -= 1;
        self.winner = winner;
        self.to_move = side;
        Some(mv)
    }

    /// Puts a stone for `side` on the board without changing the side to move
    ///
    /// Intended for setting up positions, the stone can't be taken back with
    /// [`HexBoard::undo`].
    pub fn place_stone(&mut self, mv: Move, side: Side) -> Result<()> {
        if !self.contains(mv) {
            return Err(anyhow!("Cannot place a stone on {}, outside of the board", mv));
        }
        if !self.cells[self.index(mv)].is_empty() {
            return Err(anyhow!("Cannot place a stone on {}, cell already occupied", mv));
        }
        let index = self.index(mv);
        self.put(index, side);
        Ok(())
    }

    /// Whether a stone for `side` on `mv` would complete a connection
    pub fn is_winning_move(&mut self, mv: Move, side: Side) -> bool {
        if !self.playable(mv) {
            return false;
        }
        let index = self.index(mv);
        self.cells[index] = Cell::Stone(side);
        let wins = self.connects(index, side);
        self.cells[index] = Cell::Empty;
        wins
    }

    /// Every empty cell on which `side` would win immediately
    pub fn winning_moves(&mut self, side: Side) -> Vec<Move> {
        self.legal_moves()
            .into_iter()
            .filter(|&mv| self.is_winning_move(mv, side))
            .collect()
    }

    fn index(&self, mv: Move) -> usize {
        mv.row() * self.size + mv.col()
    }

    fn put(&mut self, index: usize, side: Side) {
        let (row, col) = (index / self.size, index % self.size);
        self.cells[index] = Cell::Stone(side);
        self.fingerprint ^= zobrist::key(row, col, side.index());
        self.stones += 1;
        if self.winner.is_none() && self.connects(index, side) {
            self.winner = Some(side);
        }
    }

    // flood fill the group containing `index` and check that it spans both of
    // the owner's edges
    fn connects(&mut self, index: usize, side: Side) -> bool {
        self.stamp = self.stamp.wrapping_add(1);
        if self.stamp == 0 {
            self.marks.iter_mut().for_each(|m| *m = 0);
            self.stamp = 1;
        }
        let (mut start, mut end) = (false, false);
        let mut stack = vec![index];
        self.marks[index] = self.stamp;

        while let Some(current) = stack.pop() {
            let mv = Move::new(current / self.size, current % self.size);
            match side {
                Side::PlayerOne => {
                    start |= mv.row() == 0;
                    end |= mv.row() == self.size - 1;
                }
                Side::PlayerTwo => {
                    start |= mv.col() == 0;
                    end |= mv.col() == self.size - 1;
                }
            }
            if start && end {
                return true;
            }
            for next in self.neighbors(mv) {
                let i = self.index(next);
                if self.marks[i] != self.stamp && self.cells[i] == Cell::Stone(side) {
                    self.marks[i] = self.stamp;
                    stack.push(i);
                }
            }
        }
        false
    }
}

impl fmt::Display for HexBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  ")?;
        for col in 0..self.size {
            write!(f, " {}", (b'a' + col as u8) as char)?;
        }
        writeln!(f)?;
        for row in 0..self.size {
            write!(f, "{:>width$}{:>2}", "", row + 1, width = row)?;
            for col in 0..self.size {
                let symbol = match self.cell(row, col) {
                    Cell::Empty => '.',
                    Cell::Stone(Side::PlayerOne) => 'X',
                    Cell::Stone(Side::PlayerTwo) => 'O',
                };
                write!(f, " {}", symbol)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
