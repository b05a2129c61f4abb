use poset_hashes::Hash;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("key {0} not found")]
    KeyNotFound(Hash),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
