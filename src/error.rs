use thiserror::Error;

/// Errors surfaced by the simulator, agents, and persistence layer
///
/// Simulation faults ([`Error::InvalidAction`]) are kept distinct from storage faults
/// ([`Error::Storage`]) and snapshot format faults ([`Error::MalformedSnapshot`]) so
/// callers can tell bad input apart from an environment or storage problem.
#[derive(Debug, Error)]
pub enum Error {
    /// An action index outside the discrete action set was supplied
    #[error("invalid action index {0}: not in the discrete action set")]
    InvalidAction(usize),

    /// Opening, writing, or renaming the snapshot file failed
    #[error("model storage failure")]
    Storage(#[from] std::io::Error),

    /// The persisted snapshot is missing mandatory fields or is not decodable
    #[error("malformed model snapshot: missing value table or episode counter")]
    MalformedSnapshot(#[source] bincode::Error),

    /// Encoding the in-memory state into a snapshot failed
    #[error("snapshot encoding failed")]
    Encode(#[source] bincode::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
