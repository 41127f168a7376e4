use needletail::errors::ParseError;
use needletail::parser::SequenceRecord;
use thiserror::Error;

/// A single FASTQ read.
///
/// # Fields
///
/// * `identifier` - The header line without the leading `@`. The token up to the first space is
///   the core ID; anything after it is instrument metadata and is kept verbatim.
/// * `sequence` - The bases of the read
/// * `quality_header` - The content of the separator line after the `+`, usually empty
/// * `quality` - Per-base quality string, always the same length as `sequence`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRecord {
    pub identifier: String,
    pub sequence: String,
    pub quality_header: String,
    pub quality: String,
}

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("record `{identifier}` has {seq_len} bases but {qual_len} quality scores")]
    QualityLength {
        identifier: String,
        seq_len: usize,
        qual_len: usize,
    },

    #[error("record `{identifier}` has no quality line (is the input FASTA?)")]
    MissingQuality { identifier: String },

    #[error("record `{identifier}` contains non-ASCII sequence or quality data")]
    NonAscii { identifier: String },

    #[error("record is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("unable to open {path}")]
    Open {
        path: String,
        #[source]
        source: ParseError,
    },

    #[error("unable to open {path}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl RecordError {
    /// Whether the error came from opening an input rather than from a record in it.
    pub fn is_open_failure(&self) -> bool {
        matches!(self, RecordError::Open { .. } | RecordError::Unreadable { .. })
    }
}

impl ReadRecord {
    /// Builds a record, checking that the sequence and quality strings line up.
    pub fn new(
        identifier: impl Into<String>,
        sequence: impl Into<String>,
        quality_header: impl Into<String>,
        quality: impl Into<String>,
    ) -> Result<Self, RecordError> {
        let rec = ReadRecord {
            identifier: identifier.into(),
            sequence: sequence.into(),
            quality_header: quality_header.into(),
            quality: quality.into(),
        };

        if !rec.sequence.is_ascii() || !rec.quality.is_ascii() {
            return Err(RecordError::NonAscii {
                identifier: rec.identifier,
            });
        }

        if rec.sequence.len() != rec.quality.len() {
            return Err(RecordError::QualityLength {
                seq_len: rec.sequence.len(),
                qual_len: rec.quality.len(),
                identifier: rec.identifier,
            });
        }

        Ok(rec)
    }

    /// The leading token of the identifier, used to match mates against each other.
    pub fn core_id(&self) -> &str {
        match self.identifier.find(' ') {
            Some(i) => &self.identifier[..i],
            None => &self.identifier,
        }
    }

    /// Appends `label` to the core ID, immediately before any remainder.
    pub fn append_label(&mut self, label: &str) {
        let at = self.identifier.find(' ').unwrap_or(self.identifier.len());
        self.identifier.insert_str(at, label);
    }

    /// Shortens the sequence and quality strings to `len` bases. Returns whether the read was
    /// actually shortened.
    pub fn truncate(&mut self, len: usize) -> bool {
        if len >= self.sequence.len() {
            return false;
        }
        self.sequence.truncate(len);
        self.quality.truncate(len);
        true
    }
}

impl TryFrom<SequenceRecord<'_>> for ReadRecord {
    type Error = RecordError;

    fn try_from(rec: SequenceRecord<'_>) -> Result<Self, Self::Error> {
        let identifier = String::from_utf8(rec.id().to_vec())?;

        let Some(qual) = rec.qual() else {
            return Err(RecordError::MissingQuality { identifier });
        };

        // needletail does not expose the separator line, so recover it from the raw record
        let quality_header = rec
            .all()
            .split(|b| *b == b'\n')
            .nth(2)
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
            .map(|line| line.strip_prefix(b"+").unwrap_or(line))
            .unwrap_or_default();

        ReadRecord::new(
            identifier,
            String::from_utf8(rec.raw_seq().to_vec())?,
            String::from_utf8(quality_header.to_vec())?,
            String::from_utf8(qual.to_vec())?,
        )
    }
}
