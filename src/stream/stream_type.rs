//! Stream types and their file extensions.
//!
//! A constant table: each stream type lists its data and signature extensions in order of
//! preference (index 0 is what new filenames use), plus where its files live.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::StreamFileError;

/// Suffix appended to a data extension to form the signature extension.
pub const SIGNATURE_SUFFIX: &str = "_sig";

/// Kind of file within a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Data,
    Signature,
    Sidecar,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Data => "data",
            FileType::Signature => "signature",
            FileType::Sidecar => "sidecar",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consensus stream published by network nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    Balance,
    Event,
    Record,
}

struct StreamTypeInfo {
    path: &'static str,
    node_prefix: &'static str,
    suffix: &'static str,
    data_extensions: &'static [&'static str],
    signature_extensions: &'static [&'static str],
    sidecar_directory: Option<&'static str>,
    file_close_interval: Duration,
}

const BALANCE: StreamTypeInfo = StreamTypeInfo {
    path: "accountBalances",
    node_prefix: "balance",
    suffix: "_Balances",
    data_extensions: &["pb", "csv"],
    signature_extensions: &["pb_sig", "csv_sig"],
    sidecar_directory: None,
    file_close_interval: Duration::from_secs(15 * 60),
};

const EVENT: StreamTypeInfo = StreamTypeInfo {
    path: "eventsStreams",
    node_prefix: "events_",
    suffix: "",
    data_extensions: &["evts"],
    signature_extensions: &["evts_sig"],
    sidecar_directory: None,
    file_close_interval: Duration::from_secs(5),
};

const RECORD: StreamTypeInfo = StreamTypeInfo {
    path: "recordstreams",
    node_prefix: "record",
    suffix: "",
    data_extensions: &["rcd"],
    signature_extensions: &["rcd_sig"],
    sidecar_directory: Some("sidecar"),
    file_close_interval: Duration::from_secs(2),
};

impl StreamType {
    pub const ALL: [StreamType; 3] = [StreamType::Balance, StreamType::Event, StreamType::Record];

    fn info(self) -> &'static StreamTypeInfo {
        match self {
            StreamType::Balance => &BALANCE,
            StreamType::Event => &EVENT,
            StreamType::Record => &RECORD,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamType::Balance => "balance",
            StreamType::Event => "event",
            StreamType::Record => "record",
        }
    }

    pub fn data_extensions(self) -> &'static [&'static str] {
        self.info().data_extensions
    }

    pub fn signature_extensions(self) -> &'static [&'static str] {
        self.info().signature_extensions
    }

    /// Valid extensions for a file type. Sidecars share the data extensions.
    pub fn extensions(self, file_type: FileType) -> &'static [&'static str] {
        match file_type {
            FileType::Data | FileType::Sidecar => self.data_extensions(),
            FileType::Signature => self.signature_extensions(),
        }
    }

    /// The extension used when generating a new filename.
    pub fn preferred_extension(self, file_type: FileType) -> &'static str {
        self.extensions(file_type)[0]
    }

    /// Reverse lookup from a bare extension (no compressor) to its stream and file type.
    pub fn from_extension(extension: &str) -> Option<(StreamType, FileType)> {
        Self::ALL.into_iter().find_map(|stream_type| {
            if stream_type.data_extensions().contains(&extension) {
                Some((stream_type, FileType::Data))
            } else if stream_type.signature_extensions().contains(&extension) {
                Some((stream_type, FileType::Signature))
            } else {
                None
            }
        })
    }

    /// Tag between the timestamp and the extension (`_Balances` for balance files).
    pub fn suffix(self) -> &'static str {
        self.info().suffix
    }

    /// Top-level directory of the stream in the bucket.
    pub fn path(self) -> &'static str {
        self.info().path
    }

    pub fn node_prefix(self) -> &'static str {
        self.info().node_prefix
    }

    /// Directory holding one node's files, e.g. `recordstreams/record0.0.3`.
    pub fn node_directory(self, node: &str) -> String {
        format!("{}/{}{}", self.path(), self.node_prefix(), node)
    }

    /// Subdirectory of the node directory holding sidecar files, if the stream has any.
    pub fn sidecar_directory(self) -> Option<&'static str> {
        self.info().sidecar_directory
    }

    /// How often nodes close a file and start the next one.
    pub fn file_close_interval(self) -> Duration {
        self.info().file_close_interval
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamType {
    type Err = StreamFileError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stream_type| stream_type.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| StreamFileError::IllegalArgument(format!("unknown stream type: {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_extensions_pair_with_data_extensions() {
        for stream_type in StreamType::ALL {
            let expected: Vec<String> = stream_type
                .data_extensions()
                .iter()
                .map(|ext| format!("{ext}{SIGNATURE_SUFFIX}"))
                .collect();
            assert_eq!(stream_type.signature_extensions(), expected.as_slice());
        }
    }

    #[test]
    fn test_preferred_extension() {
        assert_eq!(StreamType::Balance.preferred_extension(FileType::Data), "pb");
        assert_eq!(
            StreamType::Balance.preferred_extension(FileType::Signature),
            "pb_sig"
        );
        assert_eq!(StreamType::Record.preferred_extension(FileType::Data), "rcd");
        assert_eq!(StreamType::Record.preferred_extension(FileType::Sidecar), "rcd");
        assert_eq!(
            StreamType::Event.preferred_extension(FileType::Signature),
            "evts_sig"
        );
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(
            StreamType::from_extension("csv"),
            Some((StreamType::Balance, FileType::Data))
        );
        assert_eq!(
            StreamType::from_extension("csv_sig"),
            Some((StreamType::Balance, FileType::Signature))
        );
        assert_eq!(
            StreamType::from_extension("evts"),
            Some((StreamType::Event, FileType::Data))
        );
        assert_eq!(
            StreamType::from_extension("rcd_sig"),
            Some((StreamType::Record, FileType::Signature))
        );
        assert_eq!(StreamType::from_extension("rcd.gz"), None);
        assert_eq!(StreamType::from_extension("txt"), None);
        assert_eq!(StreamType::from_extension(""), None);
    }

    #[test]
    fn test_layout() {
        assert_eq!(
            StreamType::Record.node_directory("0.0.3"),
            "recordstreams/record0.0.3"
        );
        assert_eq!(
            StreamType::Event.node_directory("0.0.3"),
            "eventsStreams/events_0.0.3"
        );
        assert_eq!(StreamType::Record.sidecar_directory(), Some("sidecar"));
        assert_eq!(StreamType::Balance.sidecar_directory(), None);
        assert_eq!(
            StreamType::Balance.file_close_interval(),
            Duration::from_secs(900)
        );
    }

    #[test]
    fn test_from_str() {
        assert_eq!("record".parse::<StreamType>().unwrap(), StreamType::Record);
        assert_eq!("BALANCE".parse::<StreamType>().unwrap(), StreamType::Balance);
        assert!("blocks".parse::<StreamType>().is_err());
    }
}
