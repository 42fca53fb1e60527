//! Stream filename grammar.
//!
//! ```text
//! filename   := timestamp tag? "." extension
//! timestamp  := YYYY-MM-DD "T" HH_MM_SS ["." 1-9 digits] "Z"
//! tag        := "_Balances" | "_" 2-digit sidecar index
//! extension  := base_ext ["_sig"] ["." compressor]
//! ```
//!
//! Examples: `2020-06-03T16_45_00.1Z_Balances.csv_sig`, `2020-06-03T16_45_00.1Z.rcd`,
//! `2020-06-03T16_45_00.100200345Z_02.rcd.gz`.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use super::error::{Result, StreamFileError};
use super::stream_type::{FileType, StreamType, SIGNATURE_SUFFIX};

/// First record/signature file version whose record files are always gzip-compressed.
const COMPRESSED_RECORD_VERSION: u8 = 6;

const MAX_SIDECAR_INDEX: u32 = 99;

/// Whole-second part of a filename timestamp; `d` is any ASCII digit.
const TIMESTAMP_SHAPE: &str = "dddd-dd-ddTdd_dd_dd";

/// Compression applied to a stream file, named by its trailing extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compressor {
    Gzip,
    Zstd,
}

impl Compressor {
    pub fn extension(&self) -> &'static str {
        match self {
            Compressor::Gzip => "gz",
            Compressor::Zstd => "zst",
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "gz" => Some(Compressor::Gzip),
            "zst" => Some(Compressor::Zstd),
            _ => None,
        }
    }
}

/// A parsed stream filename.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamFilename {
    raw: String,
    timestamp: String,
    compressor: Option<Compressor>,
    base_extension: String,
    file_type: FileType,
    full_extension: String,
    instant: DateTime<Utc>,
    sidecar_index: Option<String>,
    stream_type: StreamType,
}

impl StreamFilename {
    /// Parse a filename. A leading directory path is ignored.
    pub fn parse(name: &str) -> Result<Self> {
        let raw = name.rsplit('/').next().unwrap_or(name);
        let invalid = || StreamFileError::InvalidFormat(name.to_string());

        if raw.contains(':') {
            return Err(invalid());
        }

        let timestamp_end = raw.find('Z').ok_or_else(invalid)? + 1;
        let (timestamp, rest) = raw.split_at(timestamp_end);
        let instant = parse_instant(timestamp).ok_or_else(invalid)?;

        let (tag, full_extension) = rest.split_once('.').ok_or_else(invalid)?;

        let mut parts = full_extension.split('.');
        let extension = parts.next().filter(|ext| !ext.is_empty()).ok_or_else(invalid)?;
        let compressor = parts
            .next()
            .map(|ext| Compressor::from_extension(ext).ok_or_else(invalid))
            .transpose()?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        let (stream_type, extension_file_type) =
            StreamType::from_extension(extension).ok_or_else(invalid)?;
        let base_extension = extension
            .strip_suffix(SIGNATURE_SUFFIX)
            .unwrap_or(extension)
            .to_string();

        let suffix = stream_type.suffix();
        let sidecar_index = if tag.is_empty() {
            None
        } else if !suffix.is_empty() && tag == suffix {
            None
        } else {
            Some(parse_sidecar_index(tag).ok_or_else(invalid)?)
        };

        // Balance files must carry their tag.
        if !suffix.is_empty() && tag != suffix {
            return Err(invalid());
        }

        let file_type = match (extension_file_type, &sidecar_index) {
            (FileType::Signature, None) => FileType::Signature,
            (FileType::Data, None) => FileType::Data,
            (FileType::Data, Some(_)) if stream_type == StreamType::Record => FileType::Sidecar,
            _ => return Err(invalid()),
        };

        Ok(Self {
            raw: raw.to_string(),
            timestamp: timestamp.to_string(),
            compressor,
            base_extension,
            file_type,
            full_extension: full_extension.to_string(),
            instant,
            sidecar_index,
            stream_type,
        })
    }

    pub fn is_valid(name: &str) -> bool {
        Self::parse(name).is_ok()
    }

    /// Build a filename for `instant` with the preferred extension of the stream.
    pub fn filename(
        stream_type: StreamType,
        file_type: FileType,
        instant: DateTime<Utc>,
    ) -> Result<String> {
        if file_type == FileType::Sidecar {
            return Err(StreamFileError::IllegalArgument(format!(
                "File type {file_type} is not supported"
            )));
        }

        Ok(format!(
            "{}{}.{}",
            format_instant(instant),
            stream_type.suffix(),
            stream_type.preferred_extension(file_type)
        ))
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn compressor(&self) -> Option<Compressor> {
        self.compressor
    }

    /// Extension without signature suffix or compressor, e.g. `rcd`.
    pub fn base_extension(&self) -> &str {
        &self.base_extension
    }

    /// Everything after the first dot, e.g. `rcd_sig` or `pb.gz`.
    pub fn full_extension(&self) -> &str {
        &self.full_extension
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    pub fn sidecar_index(&self) -> Option<&str> {
        self.sidecar_index.as_deref()
    }

    pub fn stream_type(&self) -> StreamType {
        self.stream_type
    }

    /// Whether the file content is compressed.
    ///
    /// True for an explicit compressor extension, and for balance protobuf files which are
    /// always gzip-compressed even when (as for `.pb_sig`) no compressor is spelled out.
    pub fn is_compressed(&self) -> bool {
        self.compressor.is_some() || self.conventional_compressor().is_some()
    }

    /// The data file signed by this signature file.
    ///
    /// `version` is the signature file format version. From version 6 on, record and balance
    /// protobuf data files are gzip-compressed regardless of how the signature is named;
    /// older versions keep the signature's own compression.
    pub fn data_filename(&self, version: u8) -> Result<String> {
        if self.file_type != FileType::Signature {
            return Err(StreamFileError::IllegalState(format!(
                "{} is not a signature file",
                self.raw
            )));
        }

        let compressor = if version >= COMPRESSED_RECORD_VERSION && self.compressed_since_v6() {
            self.compressor.or(Some(Compressor::Gzip))
        } else {
            self.compressor.or(self.conventional_compressor())
        };

        Ok(format!(
            "{}{}.{}{}",
            self.timestamp,
            self.stream_type.suffix(),
            self.base_extension,
            compressor_extension(compressor)
        ))
    }

    /// Prefix marking the cut point for a remote "list after" request: the timestamp,
    /// followed by the `_Balances` tag for balance files.
    ///
    /// Remote listings compare names byte-wise. That only agrees with chronological order
    /// between timestamps written with the same number of fractional digits, so callers
    /// holding parsed filenames should compare [`Self::instant`] instead.
    pub fn filename_after(&self) -> String {
        format!("{}{}", self.timestamp, self.stream_type.suffix())
    }

    /// The sidecar file with the given index for this record data file.
    pub fn sidecar_filename(&self, index: u32) -> Result<String> {
        if self.file_type != FileType::Data || self.stream_type != StreamType::Record {
            return Err(StreamFileError::IllegalState(format!(
                "No sidecar filename for {} {} file {}",
                self.stream_type, self.file_type, self.raw
            )));
        }

        if index == 0 || index > MAX_SIDECAR_INDEX {
            return Err(StreamFileError::IllegalArgument(format!(
                "Sidecar index {index} out of range 1..={MAX_SIDECAR_INDEX}"
            )));
        }

        Ok(format!(
            "{}_{:02}.{}{}",
            self.timestamp,
            index,
            self.base_extension,
            compressor_extension(self.compressor)
        ))
    }

    fn conventional_compressor(&self) -> Option<Compressor> {
        (self.stream_type == StreamType::Balance && self.base_extension == "pb")
            .then_some(Compressor::Gzip)
    }

    fn compressed_since_v6(&self) -> bool {
        self.stream_type == StreamType::Record || self.conventional_compressor().is_some()
    }
}

impl fmt::Display for StreamFilename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialOrd for StreamFilename {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Chronological, then by name: a data file sorts before its signature and sidecars.
impl Ord for StreamFilename {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant
            .cmp(&other.instant)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

/// Parse `YYYY-MM-DDTHH_MM_SS[.fffffffff]Z`, nothing looser.
fn parse_instant(timestamp: &str) -> Option<DateTime<Utc>> {
    let seconds = timestamp.get(..TIMESTAMP_SHAPE.len())?;
    let fraction = timestamp
        .get(TIMESTAMP_SHAPE.len()..)?
        .strip_suffix('Z')?;

    let shaped = seconds
        .bytes()
        .zip(TIMESTAMP_SHAPE.bytes())
        .all(|(byte, shape)| match shape {
            b'd' => byte.is_ascii_digit(),
            _ => byte == shape,
        });
    let fraction_valid = fraction.is_empty()
        || fraction.strip_prefix('.').is_some_and(|digits| {
            (1..=9).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
        });
    if !shaped || !fraction_valid {
        return None;
    }

    NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H_%M_%S%.fZ")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Render like the network does: 0, 3, 6 or 9 fractional digits, ':' replaced by '_'.
fn format_instant(instant: DateTime<Utc>) -> String {
    instant
        .to_rfc3339_opts(SecondsFormat::AutoSi, true)
        .replace(':', "_")
}

fn parse_sidecar_index(tag: &str) -> Option<String> {
    let index = tag.strip_prefix('_')?;
    let valid = index.len() == 2 && index.bytes().all(|b| b.is_ascii_digit()) && index != "00";
    valid.then(|| index.to_string())
}

fn compressor_extension(compressor: Option<Compressor>) -> String {
    compressor
        .map(|c| format!(".{}", c.extension()))
        .unwrap_or_default()
}
