use std::collections::VecDeque;

use crate::board::{Board, Direction, Point};
use MoveResult::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Collision {
    Wall,
    Body,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoveResult {
    /// `old_tail` is `None` when the snake grew this step.
    Moved { new_head: Point, old_tail: Option<Point> },
    Crashed(Collision),
}

#[derive(Clone, Debug)]
pub struct Snake {
    // Head at the front.
    body: VecDeque<Point>,
    direction: Direction,
}

impl Snake {
    /// Builds a straight snake with its head at `head`, trailing away from `direction`.
    pub fn new(head: Point, size: usize, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        let body = (0..size as i32)
            .map(|i| Point::new(head.x - dx * i, head.y - dy * i))
            .collect();
        Snake { body, direction }
    }

    #[cfg(test)]
    pub fn from_body(body: Vec<Point>, direction: Direction) -> Self {
        Snake { body: body.into(), direction }
    }

    pub fn body(&self) -> &VecDeque<Point> {
        &self.body
    }

    pub fn head(&self) -> Point {
        self.body[0]
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn occupies(&self, p: Point) -> bool {
        self.body.contains(&p)
    }

    /// Reversals are ignored; any other direction applies immediately.
    pub fn turn(&mut self, new_direction: Direction) -> bool {
        if new_direction == self.direction.opposite() {
            return false;
        }
        self.direction = new_direction;
        true
    }

    /// Advances one cell. The body is left untouched on a crash, and the tail
    /// stays in place when the new head lands on `food`.
    pub fn move_step(&mut self, board: &Board, food: Point) -> MoveResult {
        let new_head = self.head().moved(self.direction);

        if !board.contains(new_head) {
            return Crashed(Collision::Wall);
        }

        // The tail still counts: it has not moved out of the way yet.
        if self.occupies(new_head) {
            return Crashed(Collision::Body);
        }

        self.body.push_front(new_head);

        if new_head == food {
            Moved { new_head, old_tail: None }
        } else {
            let old_tail = self.body.pop_back();
            Moved { new_head, old_tail }
        }
    }
}
