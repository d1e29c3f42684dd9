use std::fmt;

use super::{GameBoard, GameOutcome, MoveError, Player};

pub const SIZE: usize = 8;
pub const CELLS: usize = SIZE * SIZE;

const DIRECTIONS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Empty,
    Black,
    White,
}

/// A square to place a disc on. Row 0 is the top edge, column 0 the left edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Move {
    row: u8,
    col: u8,
}

impl Move {
    pub fn new(row: usize, col: usize) -> Self {
        assert!(row < SIZE && col < SIZE, "move ({row}, {col}) is off the board");
        Move {
            row: row as u8,
            col: col as u8,
        }
    }

    /// Inverse of [`Move::index`].
    pub fn from_index(index: usize) -> Option<Self> {
        (index < CELLS).then(|| Move::new(index / SIZE, index % SIZE))
    }

    pub fn row(self) -> usize {
        self.row as usize
    }

    pub fn col(self) -> usize {
        self.col as usize
    }

    /// Action index used by the learning agent: `row * 8 + col`.
    pub fn index(self) -> usize {
        self.row() * SIZE + self.col()
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.col) as char, self.row + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    cells: [[Cell; SIZE]; SIZE],
}

impl Board {
    /// Standard opening position: White on d4/e5, Black on e4/d5.
    pub fn new() -> Self {
        let mut board = Board::empty();
        board.put(3, 3, Cell::White);
        board.put(3, 4, Cell::Black);
        board.put(4, 3, Cell::Black);
        board.put(4, 4, Cell::White);
        board
    }

    /// A board with no discs at all.
    pub fn empty() -> Self {
        Board {
            cells: [[Cell::Empty; SIZE]; SIZE],
        }
    }

    /// Get the cell at a specific position
    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.cells[row][col]
    }

    /// Overwrite a single cell, bypassing move rules. Used to set up positions.
    pub fn put(&mut self, row: usize, col: usize, cell: Cell) {
        self.cells[row][col] = cell;
    }

    pub fn has_piece(&self, row: usize, col: usize, player: Player) -> bool {
        self.cells[row][col] == player.to_cell()
    }

    /// Number of discs owned by `player`.
    pub fn count(&self, player: Player) -> usize {
        let cell = player.to_cell();
        self.cells.iter().flatten().filter(|&&c| c == cell).count()
    }

    /// Discs that playing `mv` would flip for `player`, empty if the move is illegal.
    pub fn flips(&self, player: Player, mv: Move) -> Vec<Move> {
        if self.get(mv.row(), mv.col()) != Cell::Empty {
            return Vec::new();
        }
        let mut flipped = Vec::new();
        for &(dr, dc) in &DIRECTIONS {
            let run = self.run_length(player, mv, dr, dc);
            for step in 1..=run as isize {
                let row = (mv.row() as isize + dr * step) as usize;
                let col = (mv.col() as isize + dc * step) as usize;
                flipped.push(Move::new(row, col));
            }
        }
        flipped
    }

    pub fn is_legal(&self, player: Player, mv: Move) -> bool {
        self.get(mv.row(), mv.col()) == Cell::Empty
            && DIRECTIONS
                .iter()
                .any(|&(dr, dc)| self.run_length(player, mv, dr, dc) > 0)
    }

    /// Legal moves for `player` in row-major order.
    pub fn legal_moves(&self, player: Player) -> Vec<Move> {
        (0..CELLS)
            .filter_map(Move::from_index)
            .filter(|&mv| self.is_legal(player, mv))
            .collect()
    }

    pub fn has_legal_move(&self, player: Player) -> bool {
        (0..CELLS)
            .filter_map(Move::from_index)
            .any(|mv| self.is_legal(player, mv))
    }

    /// Place a disc for `player` and flip the captured discs. Returns the
    /// number of flipped discs.
    pub fn play(&mut self, player: Player, mv: Move) -> Result<usize, MoveError> {
        if self.is_terminal() {
            return Err(MoveError::GameOver);
        }
        if self.get(mv.row(), mv.col()) != Cell::Empty {
            return Err(MoveError::Occupied {
                row: mv.row(),
                col: mv.col(),
            });
        }
        let flipped = self.flips(player, mv);
        if flipped.is_empty() {
            return Err(MoveError::NoFlips {
                row: mv.row(),
                col: mv.col(),
            });
        }

        let cell = player.to_cell();
        self.put(mv.row(), mv.col(), cell);
        for square in &flipped {
            self.put(square.row(), square.col(), cell);
        }
        Ok(flipped.len())
    }

    /// The game is over once neither side can move.
    pub fn is_terminal(&self) -> bool {
        !self.has_legal_move(Player::Black) && !self.has_legal_move(Player::White)
    }

    /// Disc-count result, or `None` while the game is still running.
    pub fn outcome(&self) -> Option<GameOutcome> {
        if !self.is_terminal() {
            return None;
        }
        let black = self.count(Player::Black);
        let white = self.count(Player::White);
        Some(match black.cmp(&white) {
            std::cmp::Ordering::Greater => GameOutcome::Winner(Player::Black),
            std::cmp::Ordering::Less => GameOutcome::Winner(Player::White),
            std::cmp::Ordering::Equal => GameOutcome::Draw,
        })
    }

    /// Length of the opponent run starting next to `mv` in direction
    /// `(dr, dc)` that is capped by one of `player`'s discs; 0 otherwise.
    fn run_length(&self, player: Player, mv: Move, dr: isize, dc: isize) -> usize {
        let own = player.to_cell();
        let opponent = player.other().to_cell();
        let mut row = mv.row() as isize + dr;
        let mut col = mv.col() as isize + dc;
        let mut run = 0;

        while in_bounds(row, col) && self.cells[row as usize][col as usize] == opponent {
            run += 1;
            row += dr;
            col += dc;
        }

        if run > 0 && in_bounds(row, col) && self.cells[row as usize][col as usize] == own {
            run
        } else {
            0
        }
    }
}

fn in_bounds(row: isize, col: isize) -> bool {
    (0..SIZE as isize).contains(&row) && (0..SIZE as isize).contains(&col)
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.cells {
            let line: String = row
                .iter()
                .map(|cell| match cell {
                    Cell::Empty => '.',
                    Cell::Black => 'X',
                    Cell::White => 'O',
                })
                .collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

impl GameBoard for Board {
    type Move = Move;

    fn legal_moves(&self, player: Player) -> Vec<Move> {
        Board::legal_moves(self, player)
    }

    fn apply_move(&mut self, player: Player, mv: Move) -> Result<(), MoveError> {
        self.play(player, mv).map(|_| ())
    }

    fn is_terminal(&self) -> bool {
        Board::is_terminal(self)
    }

    fn outcome(&self) -> Option<GameOutcome> {
        Board::outcome(self)
    }
}
