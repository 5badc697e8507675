//! Error type shared by the grid model, the wire codec and the sync loop.

use thiserror::Error;

use crate::grid::Group;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The request never produced an HTTP status (network down, CORS, aborted fetch).
    #[error("transport: {0}")]
    Transport(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The body parsed but is not an 8×8 array of colour strings.
    #[error("malformed grid frame: {0}")]
    Shape(String),

    #[error("{group:?} cell ({x}, {y}) is outside the grid")]
    Coordinate { group: Group, x: u32, y: u32 },

    #[error("config: {0}")]
    Config(String),
}
