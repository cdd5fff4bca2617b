//! Credential models: redacted secrets, issued token records, and the shared credential.

pub mod credential;
pub mod secret;
pub mod token;

pub use credential::*;
pub use secret::*;
pub use token::*;
