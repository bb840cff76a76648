//! The iterative query controller, certificate fetcher, and validator
//! (spec §4.6, §4.7, §4.8): the client-side half of the system, built on
//! top of `ndns-face`'s transport abstraction and `ndns-crypto`'s
//! certificates and signing.

pub mod cache;
pub mod cert_fetcher;
pub mod error;
pub mod iterative;
pub mod validator;

pub use cache::FifoCache;
pub use cert_fetcher::CertificateFetcher;
pub use error::ResolutionError;
pub use iterative::{IterativeQueryController, Outcome};
pub use validator::Validator;
