//! Credential ownership and persistence.

pub mod credential_store;
pub mod token_manager;

pub use credential_store::FileCredentialStore;
pub use token_manager::TokenManager;
