use crate::io::{ReadSink, ReadSource};
use crate::metrics::MergeMetrics;
use crate::record::{ReadRecord, RecordError};
use thiserror::Error;

const PROGRESS_INTERVAL: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mate {
    One,
    Two,
}

impl std::fmt::Display for Mate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mate::One => f.write_str("read 1"),
            Mate::Two => f.write_str("read 2"),
        }
    }
}

/// Fatal merge errors. `pair` is the 1-based number of the read pair being processed.
#[derive(Error, Debug)]
pub enum MergeError {
    #[error(
        "input FASTQ files contain unmatched reads at pair {pair}:
    read 1: `{id1}`
    read 2: `{id2}`"
    )]
    MismatchedPair {
        pair: usize,
        id1: String,
        id2: String,
    },

    #[error("{longer} input has more reads than its mate (first unpaired read at pair {pair})")]
    UnequalInputs { pair: usize, longer: Mate },

    #[error("malformed {mate} record at pair {pair}")]
    MalformedRecord {
        pair: usize,
        mate: Mate,
        #[source]
        source: RecordError,
    },

    #[error("could not open the next {mate} input at pair {pair}")]
    Open {
        pair: usize,
        mate: Mate,
        #[source]
        source: RecordError,
    },

    #[error("unable to write pair {pair}")]
    Write {
        pair: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("the trim sequence must not be empty")]
    EmptyTrimSequence,
}

/// Settings for [`merge_label_trim_pair`].
#[derive(Debug, Clone)]
pub struct TrimOptions {
    trim_seq: String,
    min_length: usize,
    label1: Option<String>,
    label2: Option<String>,
    check_ids: bool,
}

impl TrimOptions {
    /// Reads are cut directly after the first occurrence of `trim_seq`, and pairs where a cut
    /// read ends up shorter than `min_length` are dropped. Mate IDs are checked by default.
    pub fn new(trim_seq: impl Into<String>, min_length: usize) -> Result<Self, MergeError> {
        let trim_seq = trim_seq.into();
        if trim_seq.is_empty() {
            return Err(MergeError::EmptyTrimSequence);
        }

        Ok(TrimOptions {
            trim_seq,
            min_length,
            label1: None,
            label2: None,
            check_ids: true,
        })
    }

    /// Labels to append to the core IDs. Empty labels are ignored.
    pub fn labels(mut self, label1: Option<String>, label2: Option<String>) -> Self {
        self.label1 = label1.filter(|l| !l.is_empty());
        self.label2 = label2.filter(|l| !l.is_empty());
        self
    }

    pub fn check_ids(mut self, check_ids: bool) -> Self {
        self.check_ids = check_ids;
        self
    }
}

/// Advances two read sources in lockstep.
struct Pairs<R1, R2> {
    read1: R1,
    read2: R2,
    pair: usize,
}

impl<R1: ReadSource, R2: ReadSource> Pairs<R1, R2> {
    fn new(read1: R1, read2: R2) -> Self {
        Pairs { read1, read2, pair: 0 }
    }

    fn next_pair(&mut self) -> Result<Option<(ReadRecord, ReadRecord)>, MergeError> {
        let pair = self.pair + 1;

        let mate1 = self.read1.next().transpose().map_err(|e| source_error(pair, Mate::One, e))?;
        let mate2 = self.read2.next().transpose().map_err(|e| source_error(pair, Mate::Two, e))?;

        match (mate1, mate2) {
            (Some(mate1), Some(mate2)) => {
                self.pair = pair;
                Ok(Some((mate1, mate2)))
            }
            (None, None) => Ok(None),
            (Some(_), None) => Err(MergeError::UnequalInputs { pair, longer: Mate::One }),
            (None, Some(_)) => Err(MergeError::UnequalInputs { pair, longer: Mate::Two }),
        }
    }
}

fn source_error(pair: usize, mate: Mate, source: RecordError) -> MergeError {
    if source.is_open_failure() {
        MergeError::Open { pair, mate, source }
    } else {
        MergeError::MalformedRecord { pair, mate, source }
    }
}

fn check_ids(pair: usize, mate1: &ReadRecord, mate2: &ReadRecord) -> Result<(), MergeError> {
    if mate1.core_id() != mate2.core_id() {
        return Err(MergeError::MismatchedPair {
            pair,
            id1: mate1.core_id().to_string(),
            id2: mate2.core_id().to_string(),
        });
    }
    Ok(())
}

fn emit(
    sink: &mut impl ReadSink,
    pair: usize,
    mate1: &ReadRecord,
    mate2: &ReadRecord,
) -> Result<(), MergeError> {
    sink.write_record(mate1)
        .and_then(|_| sink.write_record(mate2))
        .map_err(|source| MergeError::Write { pair, source })
}

/// Length a read is cut to: everything up to and including the first `trim_seq`.
fn trim_length(sequence: &str, trim_seq: &str) -> Option<usize> {
    sequence.find(trim_seq).map(|p| p + trim_seq.len())
}

/// Interleaves two mate files into one, appending `label1` and `label2` to the core IDs of
/// read 1 and read 2 respectively.
///
/// # Returns
///
/// The number of pairs written.
///
/// # Errors
///
/// Stops at the first pair whose core IDs differ, at the first malformed record, or when one
/// input runs out before the other. Nothing is written for the offending pair.
pub fn merge_label_pair(
    read1: impl ReadSource,
    read2: impl ReadSource,
    sink: &mut impl ReadSink,
    label1: &str,
    label2: &str,
) -> Result<usize, MergeError> {
    let mut pairs = Pairs::new(read1, read2);

    while let Some((mut mate1, mut mate2)) = pairs.next_pair()? {
        check_ids(pairs.pair, &mate1, &mate2)?;

        mate1.append_label(label1);
        mate2.append_label(label2);
        emit(sink, pairs.pair, &mate1, &mate2)?;

        if pairs.pair % PROGRESS_INTERVAL == 0 {
            info!("Processed: {} read pairs", pairs.pair);
        }
    }

    sink.finish()
        .map_err(|source| MergeError::Write { pair: pairs.pair, source })?;

    Ok(pairs.pair)
}

/// Interleaves two mate files into one, trimming each read directly after the first occurrence
/// of the trim sequence.
///
/// A pair is dropped (and counted as `short`) when either read contains the trim sequence and
/// the cut would leave fewer than `min_length` bases. Reads without the trim sequence are never
/// dropped.
///
/// # Returns
///
/// Counts of the pairs seen, dropped and trimmed.
///
/// # Errors
///
/// As for [`merge_label_pair`]. The mate ID check can be switched off through
/// [`TrimOptions::check_ids`].
pub fn merge_label_trim_pair(
    read1: impl ReadSource,
    read2: impl ReadSource,
    sink: &mut impl ReadSink,
    opts: &TrimOptions,
) -> Result<MergeMetrics, MergeError> {
    let mut metrics = MergeMetrics::default();
    let mut pairs = Pairs::new(read1, read2);

    while let Some((mut mate1, mut mate2)) = pairs.next_pair()? {
        metrics.total += 1;
        if metrics.total % PROGRESS_INTERVAL == 0 {
            info!("Processed: {} read pairs", metrics.total);
        }

        if opts.check_ids {
            check_ids(pairs.pair, &mate1, &mate2)?;
        }

        let trim1 = trim_length(&mate1.sequence, &opts.trim_seq);
        let trim2 = trim_length(&mate2.sequence, &opts.trim_seq);

        if [trim1, trim2].into_iter().flatten().any(|t| t < opts.min_length) {
            metrics.short += 1;
            continue;
        }

        if trim1.is_some_and(|t| mate1.truncate(t)) {
            metrics.trim1 += 1;
        }
        if trim2.is_some_and(|t| mate2.truncate(t)) {
            metrics.trim2 += 1;
        }

        if let Some(label) = &opts.label1 {
            mate1.append_label(label);
        }
        if let Some(label) = &opts.label2 {
            mate2.append_label(label);
        }

        emit(sink, pairs.pair, &mate1, &mate2)?;
    }

    sink.finish()
        .map_err(|source| MergeError::Write { pair: pairs.pair, source })?;

    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, seq: &str) -> ReadRecord {
        // quality letters follow position so truncation is visible
        let qual: String = (0..seq.len()).map(|i| (b'A' + (i % 26) as u8) as char).collect();
        ReadRecord::new(id, seq, "", qual).unwrap()
    }

    fn source(reads: &[(&str, &str)]) -> std::vec::IntoIter<Result<ReadRecord, RecordError>> {
        reads
            .iter()
            .map(|(id, seq)| Ok(rec(id, seq)))
            .collect::<Vec<_>>()
            .into_iter()
    }

    fn trim(trim_seq: &str, min_length: usize) -> TrimOptions {
        TrimOptions::new(trim_seq, min_length)
            .unwrap()
            .labels(Some(":1".into()), Some(":2".into()))
    }

    #[test]
    fn label_pair_appends_labels() {
        let mut out: Vec<ReadRecord> = Vec::new();
        let n = merge_label_pair(
            source(&[("readA", "ACGT"), ("readB 1:N:0", "GG")]),
            source(&[("readA", "TTTT"), ("readB 2:N:0", "CC")]),
            &mut out,
            ":1",
            ":2",
        )
        .unwrap();

        assert_eq!(n, 2);
        let ids: Vec<_> = out.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec!["readA:1", "readA:2", "readB:1 1:N:0", "readB:2 2:N:0"]);
        assert_eq!(out[0].sequence, "ACGT");
        assert_eq!(out[1].sequence, "TTTT");
    }

    #[test]
    fn label_pair_rejects_mismatched_ids() {
        let mut out: Vec<ReadRecord> = Vec::new();
        let err = merge_label_pair(
            source(&[("readA", "ACGT"), ("readB", "ACGT")]),
            source(&[("readA", "ACGT"), ("readC", "ACGT")]),
            &mut out,
            ":1",
            ":2",
        )
        .unwrap_err();

        assert!(matches!(err, MergeError::MismatchedPair { pair: 2, .. }));
        // only the first pair made it out
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn unequal_inputs_are_fatal() {
        let mut out: Vec<ReadRecord> = Vec::new();
        let err = merge_label_pair(
            source(&[("readA", "ACGT")]),
            source(&[("readA", "ACGT"), ("readB", "ACGT")]),
            &mut out,
            "",
            "",
        )
        .unwrap_err();
        assert!(matches!(err, MergeError::UnequalInputs { pair: 2, longer: Mate::Two }));

        let err = merge_label_trim_pair(
            source(&[("readA", "ACGT"), ("readB", "ACGT")]),
            source(&[("readA", "ACGT")]),
            &mut Vec::<ReadRecord>::new(),
            &trim("TT", 1),
        )
        .unwrap_err();
        assert!(matches!(err, MergeError::UnequalInputs { pair: 2, longer: Mate::One }));
    }

    #[test]
    fn malformed_record_reports_pair_and_mate() {
        let read2 = vec![
            Ok(rec("readA", "ACGT")),
            Err(RecordError::MissingQuality { identifier: "readB".into() }),
        ];
        let err = merge_label_pair(
            source(&[("readA", "ACGT"), ("readB", "ACGT")]),
            read2.into_iter(),
            &mut Vec::<ReadRecord>::new(),
            ":1",
            ":2",
        )
        .unwrap_err();

        assert!(matches!(
            err,
            MergeError::MalformedRecord { pair: 2, mate: Mate::Two, .. }
        ));
    }

    #[test]
    fn unopenable_input_is_not_a_malformed_record() {
        let read1 = vec![
            Ok(rec("readA", "ACGT")),
            Err(RecordError::Unreadable {
                path: "gone.fastq".into(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
        ];
        let mut out: Vec<ReadRecord> = Vec::new();
        let err = merge_label_trim_pair(
            read1.into_iter(),
            source(&[("readA", "ACGT"), ("readB", "ACGT")]),
            &mut out,
            &trim("TT", 1),
        )
        .unwrap_err();

        assert!(matches!(err, MergeError::Open { pair: 2, mate: Mate::One, .. }));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn trims_after_first_marker() {
        let mut out: Vec<ReadRecord> = Vec::new();
        let metrics = merge_label_trim_pair(
            source(&[("r", "ACGTTT")]),
            source(&[("r", "AC")]),
            &mut out,
            &trim("TT", 3),
        )
        .unwrap();

        assert_eq!(out[0].sequence, "ACGTT");
        assert_eq!(out[0].quality, "ABCDE");
        assert_eq!(out[1].sequence, "AC");
        assert_eq!(metrics, MergeMetrics { total: 1, short: 0, trim1: 1, trim2: 0 });
    }

    #[test]
    fn short_pair_is_dropped_but_counted() {
        let mut out: Vec<ReadRecord> = Vec::new();
        let metrics = merge_label_trim_pair(
            source(&[("a", "TTGCGCGC"), ("b", "GCGCGCGC")]),
            source(&[("a", "GCGCGCGC"), ("b", "GGGGGGTT")]),
            &mut out,
            &trim("TT", 5),
        )
        .unwrap();

        assert_eq!(metrics, MergeMetrics { total: 2, short: 1, trim1: 0, trim2: 0 });
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].identifier, "b:1");
        // read 2 of pair b ends with the marker, so nothing is cut
        assert_eq!(out[1].sequence, "GGGGGGTT");
    }

    #[test]
    fn min_length_boundary_is_inclusive() {
        // marker ends at position 5 in both reads
        let run = |min_length| {
            merge_label_trim_pair(
                source(&[("r", "ACGTTAAA")]),
                source(&[("r", "GGGTTCCC")]),
                &mut Vec::<ReadRecord>::new(),
                &trim("TT", min_length),
            )
            .unwrap()
        };

        assert_eq!(run(5).short, 0);
        assert_eq!(run(6).short, 1);
    }

    #[test]
    fn no_marker_behaves_like_label_only() {
        let reads1 = [("readA x", "ACGACG"), ("readB", "CCCC")];
        let reads2 = [("readA y", "GGGAAA"), ("readB", "A")];

        let mut labelled: Vec<ReadRecord> = Vec::new();
        merge_label_pair(source(&reads1), source(&reads2), &mut labelled, ":1", ":2").unwrap();

        let mut trimmed: Vec<ReadRecord> = Vec::new();
        let metrics = merge_label_trim_pair(
            source(&reads1),
            source(&reads2),
            &mut trimmed,
            &trim("TT", 50),
        )
        .unwrap();

        assert_eq!(labelled, trimmed);
        assert_eq!(metrics, MergeMetrics { total: 2, short: 0, trim1: 0, trim2: 0 });
    }

    #[test]
    fn trimming_twice_changes_nothing() {
        let opts = TrimOptions::new("AGAT", 4).unwrap();
        let reads1 = [("a", "CCAGATCCCC"), ("b", "AGATGG"), ("c", "CCCCCC")];
        let reads2 = [("a", "GGGGGG"), ("b", "TTAGATT"), ("c", "AG")];

        let mut once: Vec<ReadRecord> = Vec::new();
        let first =
            merge_label_trim_pair(source(&reads1), source(&reads2), &mut once, &opts).unwrap();

        let split = |mate: usize| -> Vec<Result<ReadRecord, RecordError>> {
            once.iter().skip(mate).step_by(2).cloned().map(Ok).collect()
        };
        let mut twice: Vec<ReadRecord> = Vec::new();
        let second = merge_label_trim_pair(
            split(0).into_iter(),
            split(1).into_iter(),
            &mut twice,
            &opts,
        )
        .unwrap();

        assert_eq!(once, twice);
        assert_eq!(first, MergeMetrics { total: 3, short: 0, trim1: 2, trim2: 1 });
        assert_eq!(second, MergeMetrics { total: 3, short: 0, trim1: 0, trim2: 0 });
        assert!(twice.iter().all(|r| r.sequence.len() == r.quality.len()));
    }

    #[test]
    fn id_check_can_be_disabled() {
        let run = |check| {
            merge_label_trim_pair(
                source(&[("readA", "ACGT")]),
                source(&[("readB", "ACGT")]),
                &mut Vec::<ReadRecord>::new(),
                &trim("TT", 1).check_ids(check),
            )
        };

        assert!(matches!(run(true), Err(MergeError::MismatchedPair { pair: 1, .. })));
        assert_eq!(run(false).unwrap().total, 1);
    }

    #[test]
    fn empty_labels_are_skipped() {
        let opts = TrimOptions::new("TT", 1)
            .unwrap()
            .labels(Some(String::new()), Some("/2".into()));
        let mut out: Vec<ReadRecord> = Vec::new();
        merge_label_trim_pair(source(&[("r", "A")]), source(&[("r", "C")]), &mut out, &opts)
            .unwrap();

        assert_eq!(out[0].identifier, "r");
        assert_eq!(out[1].identifier, "r/2");
    }

    #[test]
    fn empty_trim_sequence_is_rejected() {
        assert!(matches!(
            TrimOptions::new("", 20),
            Err(MergeError::EmptyTrimSequence)
        ));
    }
}
