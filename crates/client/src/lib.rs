pub mod api;
pub mod board;

pub use api::{ApiClient, ClientError, Session};
pub use board::{BoardState, MoveUndo};
