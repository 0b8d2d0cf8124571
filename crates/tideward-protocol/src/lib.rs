mod command;
mod event;
mod grid;
mod ids;
mod replay;
mod snapshot;
pub mod wire;

pub use crate::command::*;
pub use crate::event::*;
pub use crate::grid::*;
pub use crate::ids::*;
pub use crate::replay::*;
pub use crate::snapshot::*;
