//! Abstract persistence traits for the drip faucet.
//!
//! The database engine lives behind these traits; the rest of the workspace
//! depends only on them. Backends implement `SessionStore`; tests use the
//! in-memory implementation from `drip_nullables`.

pub mod error;
pub mod session;

pub use error::StoreError;
pub use session::SessionStore;
