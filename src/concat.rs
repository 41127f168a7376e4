use itertools::Itertools;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConcatError {
    #[error("read {read} has a mix of gzipped and uncompressed files: {files:?}")]
    MixedCompression { read: usize, files: Vec<String> },
}

/// Builds one shell command per read number that concatenates its FASTQ files into
/// `<out_prefix>_R<n>.fastq.gz`.
///
/// `reads[0]` holds the read 1 files, `reads[1]` the read 2 files and so on. A read with fewer
/// than two files has nothing to concatenate and gets `None`.
///
/// # Errors
///
/// Returns an error if a read mixes `.gz` and uncompressed files.
pub fn concat_commands(
    out_prefix: &str,
    reads: &[Vec<String>],
) -> Result<Vec<Option<String>>, ConcatError> {
    reads
        .iter()
        .enumerate()
        .map(|(i, files)| {
            let read = i + 1;

            if files.len() < 2 {
                warn!(
                    "Prefix {out_prefix}, R{read}, has {} files and won't be processed",
                    files.len()
                );
                return Ok(None);
            }

            let gzipped = files.iter().filter(|f| f.ends_with(".gz")).count();
            let program = if gzipped == 0 {
                "cat"
            } else if gzipped == files.len() {
                "zcat"
            } else {
                return Err(ConcatError::MixedCompression {
                    read,
                    files: files.clone(),
                });
            };

            Ok(Some(format!(
                "{program} {} | gzip > {out_prefix}_R{read}.fastq.gz",
                files.iter().join(" ")
            )))
        })
        .collect()
}
