//! Error types for the game engine.

/// Why a move was rejected.
///
/// The `Display` text is shown to the player as-is, inside an `error`
/// event, so it is written for humans rather than for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PlayError {
    /// The column index is past the right edge of the board.
    #[error("This column doesn't exist.")]
    ColumnOutOfRange,

    /// The column already holds a full stack of discs.
    #[error("This slot is full.")]
    ColumnFull,

    /// The same player tried to move twice in a row.
    #[error("It isn't your turn.")]
    NotYourTurn,

    /// Somebody already won.
    #[error("The game is over.")]
    GameOver,
}
