//! Authentication session state and its durable storage.

mod storage;
mod store;

pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use store::{Session, SessionStore, EXPIRES_AT_KEY, ROLES_KEY, SUBJECT_KEY, TOKEN_KEY};
