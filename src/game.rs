use rand::rngs::ThreadRng;
use rand::seq::IteratorRandom;
use rand::Rng;
use tracing::debug;

use crate::board::{Board, Direction, Point};
use crate::config::INITIAL_SNAKE_LENGTH;
use crate::snake::{Collision, MoveResult, Snake};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EndReason {
    Quit,
    Wall,
    SelfCollision,
    /// No free cell left for food: the snake fills the board.
    BoardFull,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Moved,
    Ate,
    Ended(EndReason),
}

/// Read-only view of the game handed to the renderer once per tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub width: i32,
    pub height: i32,
    /// Head first.
    pub body: Vec<Point>,
    pub direction: Direction,
    pub food: Point,
    pub score: u32,
    pub game_over: bool,
    pub end: Option<EndReason>,
}

impl Snapshot {
    pub fn head(&self) -> Option<Point> {
        self.body.first().copied()
    }
}

/// Owns the snake, the food and the score. Only `step`, `turn` and `quit`
/// mutate it.
pub struct Game<R = ThreadRng> {
    board: Board,
    snake: Snake,
    food: Point,
    score: u32,
    end: Option<EndReason>,
    rng: R,
}

impl Game<ThreadRng> {
    pub fn new(board: Board) -> Self {
        Game::with_rng(board, rand::thread_rng())
    }
}

impl<R: Rng> Game<R> {
    pub fn with_rng(board: Board, rng: R) -> Self {
        let snake = Snake::new(board.center(), INITIAL_SNAKE_LENGTH, Direction::Right);
        let food = snake.head();
        let mut game = Game { board, snake, food, score: 0, end: None, rng };

        if !game.spawn_food() {
            game.end = Some(EndReason::BoardFull);
        }
        game
    }

    /// Advances the simulation by one tick. A finished game is left untouched.
    pub fn step(&mut self) -> StepOutcome {
        if let Some(reason) = self.end {
            return StepOutcome::Ended(reason);
        }

        match self.snake.move_step(&self.board, self.food) {
            MoveResult::Crashed(collision) => {
                let reason = match collision {
                    Collision::Wall => EndReason::Wall,
                    Collision::Body => EndReason::SelfCollision,
                };
                self.end = Some(reason);
                StepOutcome::Ended(reason)
            }
            MoveResult::Moved { old_tail: None, new_head } => {
                self.score += 1;
                debug!(x = new_head.x, y = new_head.y, score = self.score, "food eaten");

                if !self.spawn_food() {
                    self.end = Some(EndReason::BoardFull);
                    return StepOutcome::Ended(EndReason::BoardFull);
                }
                StepOutcome::Ate
            }
            MoveResult::Moved { .. } => StepOutcome::Moved,
        }
    }

    /// Places food on a random cell the snake does not occupy. Returns `false`
    /// when there is no such cell.
    ///
    /// Rejection sampling is uniform over the free cells and cheap while the
    /// board is mostly empty. Once it has failed `4 * area` times the free
    /// cells are enumerated instead, so a nearly full board cannot spin forever.
    pub fn spawn_food(&mut self) -> bool {
        let area = self.board.area();
        if area <= self.snake.len() {
            return false;
        }

        let (width, height) = (self.board.width(), self.board.height());
        for _ in 0..area * 4 {
            let candidate = Point::new(self.rng.gen_range(0..width), self.rng.gen_range(0..height));
            if !self.snake.occupies(candidate) {
                self.food = candidate;
                return true;
            }
        }

        let snake = &self.snake;
        let free = self.board.cells().filter(|p| !snake.occupies(*p));
        match free.choose(&mut self.rng) {
            Some(p) => {
                debug!(x = p.x, y = p.y, "food placed by free-cell scan");
                self.food = p;
                true
            }
            None => false,
        }
    }
}

impl<R> Game<R> {
    #[cfg(test)]
    pub fn from_parts(board: Board, snake: Snake, food: Point, rng: R) -> Self {
        Game { board, snake, food, score: 0, end: None, rng }
    }

    /// Reversals are ignored, as is any turn once the game is over.
    pub fn turn(&mut self, direction: Direction) -> bool {
        self.end.is_none() && self.snake.turn(direction)
    }

    pub fn quit(&mut self) {
        if self.end.is_none() {
            self.end = Some(EndReason::Quit);
        }
    }

    pub fn is_over(&self) -> bool {
        self.end.is_some()
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    #[cfg(test)]
    pub fn food(&self) -> Point {
        self.food
    }

    pub fn snake(&self) -> &Snake {
        &self.snake
    }

    #[cfg(test)]
    pub fn board(&self) -> Board {
        self.board
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            width: self.board.width(),
            height: self.board.height(),
            body: self.snake.body().iter().copied().collect(),
            direction: self.snake.direction(),
            food: self.food,
            score: self.score,
            game_over: self.is_over(),
            end: self.end,
        }
    }
}
