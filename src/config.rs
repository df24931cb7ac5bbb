use std::{env, time::Duration};

use crate::board::Board;

// Gameplay constants.
pub const BOARD_WIDTH: i32 = 40;
pub const BOARD_HEIGHT: i32 = 20;
pub const BOARD: Board = Board::new(BOARD_WIDTH, BOARD_HEIGHT);
pub const INITIAL_SNAKE_LENGTH: usize = 3;

/// Keystrokes buffered between the input thread and the game loop.
pub const INPUT_QUEUE_CAPACITY: usize = 10;

// Runtime values, overridable through the environment (or a `.env` file).

pub fn tick_interval() -> Duration {
    Duration::from_millis(millis_var("SNAKE_TICK_MS", 150).max(1))
}

/// How long the final summary stays on screen before the process exits.
pub fn summary_delay() -> Duration {
    Duration::from_millis(millis_var("SNAKE_SUMMARY_DELAY_MS", 3000))
}

pub fn log_file() -> String {
    env::var("SNAKE_LOG_FILE").unwrap_or_else(|_| "snake.log".to_string())
}

pub fn json_logs() -> bool {
    matches!(env::var("LOG_FORMAT").as_deref(), Ok("json"))
}

fn millis_var(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}
