//! Error types
use thiserror::Error;

use crate::surface::SurfaceError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Style identifier not known to the host
    #[error("unknown animation style `{0}`")]
    UnknownStyle(String),

    /// Malformed animation option
    #[error("invalid option `{name}`: {reason}")]
    InvalidOption { name: &'static str, reason: String },

    /// The render surface refused an operation
    #[error("render surface: {0}")]
    Surface(#[from] SurfaceError),

    /// `update` called on an animation that was never built
    #[error("animation `{0}` is not built")]
    NotBuilt(&'static str),

    /// Simulation produced a non-finite value and was reset locally
    #[error("{style}: degenerate simulation state in {what}")]
    Degenerate {
        style: &'static str,
        what: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
