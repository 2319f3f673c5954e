//! Board controller, cue editor and front-end state

pub mod board;
pub mod editor;
pub mod state;

pub use board::{Board, CueListing};
pub use editor::CueEditor;
pub use state::{BoardCommand, BoardSnapshot, View};
