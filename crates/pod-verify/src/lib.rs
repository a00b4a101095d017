//! Read-path verification for the PoD commitment core.
//!
//! [`VerificationLayer::fetch_and_verify`] resolves the digest committed at
//! an address, fetches the payload from the content store, and recomputes
//! its hash. A mismatch is reported as `verified: false`, not as an error.

pub mod error;
pub mod verifier;

pub use error::{VerifyError, VerifyResult};
pub use verifier::{VerificationLayer, VerifiedContent};
