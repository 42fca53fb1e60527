//! Stream file addressing.
//!
//! Nodes publish balance, event and record streams as self-describing files. The name of
//! each file carries its consensus timestamp, its stream, whether it is data, a signature
//! or a record sidecar, and its compression. The downloader relies on this module to
//! interpret listings, pair signatures with data files and sequence them.

mod error;
mod filename;
mod stream_type;

pub use error::{Result, StreamFileError};
pub use filename::{Compressor, StreamFilename};
pub use stream_type::{FileType, StreamType, SIGNATURE_SUFFIX};
