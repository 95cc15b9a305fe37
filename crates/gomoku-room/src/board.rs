//! Board rules: move legality, five-in-a-row and full-board detection.
//!
//! Everything here is pure. The room service calls these after its own
//! status and turn checks.

use gomoku_protocol::{BOARD_SIZE, Board, Color, EMPTY};

use crate::RoomError;

/// Stones in a row needed to win.
const WIN_LENGTH: usize = 5;

/// Horizontal, vertical, and the two diagonals.
const AXES: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// Returns a copy of `board` with `color` placed at `(row, col)`.
///
/// # Errors
/// [`RoomError::IllegalMove`] if the cell is off the grid or occupied.
pub fn apply_move(board: &Board, row: usize, col: usize, color: Color) -> Result<Board, RoomError> {
    match board.get(row, col) {
        None => Err(RoomError::IllegalMove(format!(
            "({row}, {col}) is outside the {BOARD_SIZE}x{BOARD_SIZE} board"
        ))),
        Some(EMPTY) => {
            let mut next = board.clone();
            next.0[row][col] = color.cell();
            Ok(next)
        }
        Some(_) => Err(RoomError::IllegalMove(format!("({row}, {col}) is occupied"))),
    }
}

/// Returns `true` if the stone at `(row, col)` is part of five or more in a
/// line. An empty or off-grid cell never wins.
pub fn check_win(board: &Board, row: usize, col: usize) -> bool {
    let stone = match board.get(row, col) {
        Some(EMPTY) | None => return false,
        Some(stone) => stone,
    };

    AXES.iter().any(|&(dr, dc)| {
        1 + run_length(board, row, col, dr, dc, stone) + run_length(board, row, col, -dr, -dc, stone)
            >= WIN_LENGTH
    })
}

/// Returns `true` if no empty cell remains.
pub fn check_draw(board: &Board) -> bool {
    board.0.iter().flatten().all(|cell| *cell != EMPTY)
}

/// Counts matching stones walking away from `(row, col)`, at most four steps.
fn run_length(board: &Board, row: usize, col: usize, dr: isize, dc: isize, stone: u8) -> usize {
    let mut count = 0;
    for step in 1..WIN_LENGTH as isize {
        let (Some(r), Some(c)) = (
            row.checked_add_signed(dr * step),
            col.checked_add_signed(dc * step),
        ) else {
            break;
        };
        if board.get(r, c) != Some(stone) {
            break;
        }
        count += 1;
    }
    count
}
