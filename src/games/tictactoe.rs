//! Tic-tac-toe rules.
//!
//! Bots answer with `place_mark <x> <y>`, `x` being the column and `y` the row, both in
//! `0..3`. The field is sent row by row as nine comma separated cells: `.` for an empty
//! cell, the owner's player id otherwise.

use std::{fmt::Display, str::FromStr};

use anyhow::{anyhow, bail, Context};
use serde::Serialize;

use crate::{logic::Rules, player::PlayerId};

const SIZE: usize = 3;

const LINES: [[(usize, usize); 3]; 8] = [
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    [(0, 0), (1, 1), (2, 2)],
    [(2, 0), (1, 1), (0, 2)],
];

/// Put the player's mark on cell (`x`, `y`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlaceMark {
    /// Column.
    pub x: u8,
    /// Row.
    pub y: u8,
}

impl PlaceMark {
    /// Mark at column `x`, row `y`.
    pub fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }
}

impl Display for PlaceMark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "place_mark {} {}", self.x, self.y)
    }
}

impl FromStr for PlaceMark {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        match words.next() {
            Some("place_mark") => {}
            Some(other) => bail!("unknown command '{other}'"),
            None => bail!("empty command"),
        }
        let x = words.next().context("missing x")?.parse().context("invalid x")?;
        let y = words.next().context("missing y")?.parse().context("invalid y")?;
        if let Some(extra) = words.next() {
            return Err(anyhow!("unexpected argument '{extra}'"));
        }
        Ok(PlaceMark { x, y })
    }
}

/// The 3x3 board, owning the authoritative game state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    cells: [[Option<PlayerId>; SIZE]; SIZE],
}

impl Board {
    /// Empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Owner of cell (`x`, `y`), if any. Out of range cells are empty.
    pub fn cell(&self, x: usize, y: usize) -> Option<PlayerId> {
        self.cells.get(y).and_then(|row| row.get(x)).copied().flatten()
    }

    /// Marks cell (`x`, `y`) for `player`.
    ///
    /// # Error
    /// Returned when the position is off the board, the cell is taken, or the game is
    /// already won.
    pub fn place_mark(&mut self, x: usize, y: usize, player: PlayerId) -> anyhow::Result<()> {
        if x >= SIZE || y >= SIZE {
            bail!("position ({x}, {y}) is outside the board");
        }
        if let Some(winner) = self.winner_id() {
            bail!("game already won by player {winner}");
        }
        if let Some(owner) = self.cells[y][x] {
            bail!("cell ({x}, {y}) is already taken by player {owner}");
        }
        self.cells[y][x] = Some(player);
        Ok(())
    }

    /// True while at least one cell is empty.
    pub fn has_empty_cell(&self) -> bool {
        self.cells.iter().flatten().any(Option::is_none)
    }

    /// Owner of a complete line, if any.
    pub fn winner_id(&self) -> Option<PlayerId> {
        LINES.into_iter().find_map(|line| {
            let [a, b, c] = line.map(|(x, y)| self.cells[y][x]);
            match a {
                Some(owner) if a == b && b == c => Some(owner),
                _ => None,
            }
        })
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let field = self
            .cells
            .iter()
            .flatten()
            .map(|cell| match cell {
                Some(id) => id.to_string(),
                None => ".".to_string(),
            })
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{field}")
    }
}

/// Tic-tac-toe as plugged into [`TurnLogic`](crate::logic::TurnLogic).
#[derive(Debug, Clone, Default)]
pub struct TicTacToe {
    board: Board,
}

impl TicTacToe {
    /// New game on an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current board.
    pub fn board(&self) -> &Board {
        &self.board
    }
}

impl Rules for TicTacToe {
    type Action = PlaceMark;
    type State = Board;

    fn state(&self) -> Board {
        self.board.clone()
    }

    fn apply(&mut self, player: PlayerId, action: &PlaceMark) -> anyhow::Result<()> {
        self.board
            .place_mark(action.x as usize, action.y as usize, player)
    }

    fn has_possible_move(&self) -> bool {
        self.board.has_empty_cell()
    }

    fn winner(&self) -> Option<PlayerId> {
        self.board.winner_id()
    }
}
