//! Rule sets shipped with the engine.

pub mod tictactoe;
