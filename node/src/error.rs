use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("store error: {0}")]
    Store(#[from] guild_store::StoreError),

    #[error("LMDB error: {0}")]
    Lmdb(#[from] guild_store_lmdb::LmdbError),

    #[error("engine error: {0}")]
    Engine(#[from] guild_groups::GroupError),

    #[error("config error: {0}")]
    Config(String),

    #[error("data directory rejected: {0}")]
    DataDir(String),

    #[error("integrity check failed: {0}")]
    Integrity(String),

    #[error("notifier setup failed: {0}")]
    Notifier(String),

    #[error("logging already initialised: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
