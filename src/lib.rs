pub mod cli;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod index;
pub mod lookup;
mod metrics;
mod server;
pub mod store;
pub mod utils;

pub use config::Opts;
pub use error::{Error, Result};
pub use fingerprint::{FingerprintMode, Fingerprinter};
pub use index::{Metric, SimilarityIndex};
pub use lookup::{LookupService, Match};
pub use store::{FingerprintRecord, FingerprintStore};
