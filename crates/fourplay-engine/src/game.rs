//! The board, the move history and the win check.

use fourplay_protocol::Player;

use crate::PlayError;

/// Number of columns on the board.
pub const COLUMNS: usize = 7;

/// Number of rows on the board. Row 0 is the bottom.
pub const ROWS: usize = 6;

/// Discs in a line needed to win.
const LINE: usize = 4;

/// One completed move. Never changes once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub player: Player,
    pub column: usize,
    pub row: usize,
}

/// One game of Connect Four.
///
/// ```text
///  row 5 │ . . . . . . . │
///        │ . . . . . . . │
///        │ . . . . . . . │
///        │ . . . . . . . │
///        │ . . . Y . . . │
///  row 0 │ . . R R . . . │
///          0 1 2 3 4 5 6   column
/// ```
#[derive(Debug, Clone, Default)]
pub struct Game {
    /// `board[column][row]`, filled from row 0 upwards.
    board: [[Option<Player>; ROWS]; COLUMNS],
    /// Height of each column, i.e. the row the next disc lands on.
    heights: [usize; COLUMNS],
    /// Append-only history, in play order.
    moves: Vec<Move>,
    winner: Option<Player>,
}

impl Game {
    /// Creates an empty board. Red moves first.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops `player`'s disc into `column` and returns the row it landed on.
    ///
    /// On error nothing is recorded.
    ///
    /// # Errors
    /// - [`PlayError::ColumnOutOfRange`] if `column >= COLUMNS`
    /// - [`PlayError::GameOver`] if somebody already won
    /// - [`PlayError::NotYourTurn`] if `player` made the previous move
    ///   (or is Yellow on an empty board)
    /// - [`PlayError::ColumnFull`] if the column holds `ROWS` discs
    pub fn play(&mut self, player: Player, column: usize) -> Result<usize, PlayError> {
        if column >= COLUMNS {
            return Err(PlayError::ColumnOutOfRange);
        }
        if self.winner.is_some() {
            return Err(PlayError::GameOver);
        }
        if player != self.next_player() {
            return Err(PlayError::NotYourTurn);
        }
        let row = self.heights[column];
        if row == ROWS {
            return Err(PlayError::ColumnFull);
        }

        self.board[column][row] = Some(player);
        self.heights[column] += 1;
        self.moves.push(Move {
            player,
            column,
            row,
        });

        if self.completes_line(player, column, row) {
            self.winner = Some(player);
        }

        Ok(row)
    }

    /// The player whose turn it is.
    pub fn next_player(&self) -> Player {
        match self.moves.last() {
            Some(last) => last.player.other(),
            None => Player::Red,
        }
    }

    /// The winner, once somebody has connected four.
    pub fn winner(&self) -> Option<Player> {
        self.winner
    }

    /// Every completed move, oldest first.
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    /// Returns `true` if every column is full.
    pub fn is_full(&self) -> bool {
        self.heights.iter().all(|h| *h == ROWS)
    }

    /// Checks the four line directions through the disc just placed.
    fn completes_line(&self, player: Player, column: usize, row: usize) -> bool {
        const DIRECTIONS: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

        DIRECTIONS.iter().any(|&(dc, dr)| {
            1 + self.run(player, column, row, dc, dr)
                + self.run(player, column, row, -dc, -dr)
                >= LINE
        })
    }

    /// Counts `player`'s consecutive discs from (`column`, `row`) outwards,
    /// not counting the starting cell.
    fn run(&self, player: Player, column: usize, row: usize, dc: isize, dr: isize) -> usize {
        let mut count = 0;
        let (mut c, mut r) = (column as isize, row as isize);
        loop {
            c += dc;
            r += dr;
            if c < 0 || r < 0 || c >= COLUMNS as isize || r >= ROWS as isize {
                return count;
            }
            if self.board[c as usize][r as usize] != Some(player) {
                return count;
            }
            count += 1;
        }
    }
}
