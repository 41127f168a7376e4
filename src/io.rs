use crate::record::{ReadRecord, RecordError};
use anyhow::Context;
use flate2::write::GzEncoder;
use flate2::Compression;
use needletail::errors::ParseErrorKind;
use needletail::FastxReader;
use std::fs::File;
use std::io::{stdout, BufWriter, Stdout, Write};
use std::path::Path;

/// Anything that yields reads one at a time. The source is released when it is dropped.
pub trait ReadSource: Iterator<Item = Result<ReadRecord, RecordError>> {}

impl<T> ReadSource for T where T: Iterator<Item = Result<ReadRecord, RecordError>> {}

/// Accepts reads in emission order.
pub trait ReadSink {
    fn write_record(&mut self, record: &ReadRecord) -> std::io::Result<()>;

    /// Flushes anything buffered. Called once, after the last record.
    fn finish(&mut self) -> std::io::Result<()>;
}

/// In-memory sink, mostly useful for tests.
impl ReadSink for Vec<ReadRecord> {
    fn write_record(&mut self, record: &ReadRecord) -> std::io::Result<()> {
        self.push(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Streams FASTQ records from one or more files, read back to back as a single sequence.
///
/// The path `-` reads from standard input. Compressed input is detected by needletail.
pub struct FastqSource {
    pending: std::vec::IntoIter<String>,
    current: Option<Box<dyn FastxReader>>,
}

impl FastqSource {
    /// Opens the first input immediately and checks that the others exist, so that a missing
    /// file is reported before any output is written. The remaining inputs are opened as the
    /// previous one runs out.
    pub fn open(paths: &[String]) -> Result<Self, RecordError> {
        for path in paths.iter().skip(1).filter(|p| *p != "-") {
            std::fs::metadata(path).map_err(|source| RecordError::Unreadable {
                path: path.clone(),
                source,
            })?;
        }

        let mut source = FastqSource {
            pending: paths.to_vec().into_iter(),
            current: None,
        };

        if let Some(path) = source.pending.next() {
            source.current = open_reader(&path)?;
        }

        Ok(source)
    }
}

/// Returns `None` for an empty file, which needletail otherwise treats as an error.
fn open_reader(path: &str) -> Result<Option<Box<dyn FastxReader>>, RecordError> {
    let reader = if path == "-" {
        needletail::parse_fastx_reader(std::io::stdin())
    } else {
        needletail::parse_fastx_file(path)
    };

    match reader {
        Ok(r) => {
            debug!("Opened {path}");
            Ok(Some(r))
        }
        Err(e) if matches!(e.kind, ParseErrorKind::EmptyFile) => {
            warn!("Input {path} is empty");
            Ok(None)
        }
        Err(source) => Err(RecordError::Open {
            path: path.to_string(),
            source,
        }),
    }
}

impl Iterator for FastqSource {
    type Item = Result<ReadRecord, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(reader) = self.current.as_mut() {
                if let Some(rec) = reader.next() {
                    return Some(rec.map_err(RecordError::from).and_then(ReadRecord::try_from));
                }
                self.current = None;
            }

            let path = self.pending.next()?;
            match open_reader(&path) {
                Ok(reader) => self.current = reader,
                Err(e) => {
                    // stop here, the caller should not see records from later files
                    self.pending = Vec::new().into_iter();
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Writes records as four-line FASTQ.
pub struct FastqWriter<W: Write> {
    writer: W,
}

impl<W: Write> FastqWriter<W> {
    pub fn new(writer: W) -> Self {
        FastqWriter { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReadSink for FastqWriter<W> {
    fn write_record(&mut self, record: &ReadRecord) -> std::io::Result<()> {
        writeln!(
            self.writer,
            "@{}\n{}\n+{}\n{}",
            record.identifier, record.sequence, record.quality_header, record.quality
        )
    }

    fn finish(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

/// Destination of merged reads: a file (gzip-compressed when its name ends in `.gz`) or
/// standard output.
pub enum Output {
    Stdout(BufWriter<Stdout>),
    File(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl Output {
    /// Creates the output for the given option, defaulting to standard output when `None`.
    pub fn create(output: &Option<String>) -> anyhow::Result<Self> {
        let Some(path) = output else {
            return Ok(Output::Stdout(BufWriter::new(stdout())));
        };

        let file = File::create(Path::new(path))
            .with_context(|| format!("Unable to create output file {path}"))?;
        let writer = BufWriter::new(file);

        if path.ends_with(".gz") {
            Ok(Output::Gzip(GzEncoder::new(writer, Compression::default())))
        } else {
            Ok(Output::File(writer))
        }
    }

    /// Flushes the output and writes the gzip trailer if needed.
    pub fn close(self) -> std::io::Result<()> {
        match self {
            Output::Stdout(mut w) => w.flush(),
            Output::File(mut w) => w.flush(),
            Output::Gzip(w) => w.finish()?.flush(),
        }
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Output::Stdout(w) => w.write(buf),
            Output::File(w) => w.write(buf),
            Output::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Output::Stdout(w) => w.flush(),
            Output::File(w) => w.flush(),
            Output::Gzip(w) => w.flush(),
        }
    }
}
