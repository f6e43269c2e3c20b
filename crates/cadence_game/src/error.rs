use cadence_core::ecs::{SystemRegistrationError, WorldError};
use cadence_services::SaveError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced at the encounter boundary. Nothing inside a tick
/// returns these; systems log and carry on.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("chart is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid chart: {0}")]
    InvalidChart(String),

    #[error("no chart registered under '{0}'")]
    UnknownChart(String),

    #[error(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    Registration(#[from] SystemRegistrationError),

    #[error(transparent)]
    Save(#[from] SaveError),
}

pub type Result<T> = std::result::Result<T, GameError>;
