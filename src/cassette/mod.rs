//! Cassettes: the persisted interaction store and its on-disk format.

pub mod body;
pub mod duration;
pub mod fingerprint;
pub mod format;
pub mod replayer;
pub mod store;

pub use fingerprint::{DefaultFingerprinter, Fingerprinter, RequestHasher};
pub use format::{Interaction, RecordedRequest, RecordedResponse, FORMAT_VERSION};
pub use replayer::{verify_handler, MismatchField, ReplayMismatch};
pub use store::{Cassette, ReplayExhaustion};
