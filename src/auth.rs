//! Auth-domain models: redacted secrets, credential pairs, and access-token claims.

pub mod claims;
pub mod credential;
pub mod secret;

pub use claims::*;
pub use credential::*;
pub use secret::*;
