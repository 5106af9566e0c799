use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("consensus error: {0}")]
    Consensus(#[from] spos_consensus::ConsensusError),

    #[error("sharding error: {0}")]
    Sharding(#[from] spos_sharding::NodesCoordinatorError),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(#[from] hex::FromHexError),

    #[error("logging error: {0}")]
    Logging(String),

    #[error("node already started")]
    AlreadyStarted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("shutdown timeout")]
    ShutdownTimeout,

    #[error("{0}")]
    Other(String),
}
