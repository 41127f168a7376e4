//! Shell command strings for GATK 3 indel realignment and base quality score recalibration.
//!
//! Nothing here runs GATK; the returned commands are handed to whatever schedules the pipeline.

use itertools::Itertools;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GatkError {
    #[error("BAM filenames must end '.bam', got `{path}`")]
    NotBam { path: String },
}

/// How to invoke GATK.
#[derive(Debug, Clone)]
pub struct GatkOptions {
    pub java: String,
    pub gatk_jar: String,
    /// Java heap size in GB, passed as `-Xmx<N>g`
    pub memory_gb: Option<u32>,
}

impl Default for GatkOptions {
    fn default() -> Self {
        GatkOptions {
            java: String::from("java"),
            gatk_jar: String::from("GenomeAnalysisTK.jar"),
            memory_gb: None,
        }
    }
}

impl GatkOptions {
    /// `java [-Xmx<N>g] -jar <gatk> -T <tool>` followed by `args`, joined by spaces. A heap size
    /// of zero is the same as none.
    fn command(&self, tool: &str, args: &[&str]) -> String {
        let memory = self
            .memory_gb
            .filter(|&m| m > 0)
            .map(|m| format!("-Xmx{m}g"));

        let command = std::iter::once(self.java.as_str())
            .chain(memory.as_deref())
            .chain(["-jar", self.gatk_jar.as_str(), "-T", tool])
            .chain(args.iter().copied())
            .join(" ");
        command
    }

    /// Finds the intervals that need local realignment around known indels.
    pub fn realign_target_creator(
        &self,
        in_bam: &str,
        known_vcf: &str,
        reference: &str,
        output_list: &str,
        threads: usize,
    ) -> String {
        let threads = threads.to_string();
        self.command(
            "RealignerTargetCreator",
            &[
                "-I", in_bam, "-R", reference, "-known", known_vcf, "-o", output_list, "-nt",
                threads.as_str(),
            ],
        )
    }

    /// Realigns reads over the intervals found by [`Self::realign_target_creator`].
    pub fn realign_from_target(
        &self,
        in_bam: &str,
        known_vcf: &str,
        reference: &str,
        target_list: &str,
        out_bam: &str,
    ) -> String {
        self.command(
            "IndelRealigner",
            &[
                "-I", in_bam, "-R", reference, "-known", known_vcf, "-targetIntervals",
                target_list, "-o", out_bam,
            ],
        )
    }

    /// Builds the recalibration table from known variant sites.
    pub fn base_recalibrator(
        &self,
        in_bam: &str,
        known_vcf: &str,
        table: &str,
        reference: &str,
    ) -> String {
        self.command(
            "BaseRecalibrator",
            &["-R", reference, "-I", in_bam, "--knownSites", known_vcf, "-o", table],
        )
    }

    /// Applies a recalibration table, writing a new BAM.
    pub fn print_reads(&self, in_bam: &str, out_bam: &str, reference: &str, table: &str) -> String {
        self.command(
            "PrintReads",
            &["-R", reference, "-I", in_bam, "-BQSR", table, "-o", out_bam],
        )
    }
}

/// Path of `path` without its `.bam` suffix, checking that the suffix is present.
fn bam_stem(path: &str) -> Result<&str, GatkError> {
    path.strip_suffix(".bam").ok_or_else(|| GatkError::NotBam {
        path: path.to_string(),
    })
}

/// Indel realignment of one BAM file.
///
/// # Fields
///
/// * `target_list` - Where to keep the realignment intervals. When `None`, they are written
///   next to the input as `<stem>_target.list` and deleted afterwards.
/// * `delete_input` - Remove the input BAM and its index once realignment has finished
#[derive(Debug, Clone)]
pub struct RealignJob {
    pub in_bam: String,
    pub out_bam: String,
    pub known_vcf: String,
    pub reference: String,
    pub target_list: Option<String>,
    pub threads: usize,
    pub delete_input: bool,
}

/// Target creation and realignment chained with `&&`, followed by clean-up.
pub fn realign(job: &RealignJob, opts: &GatkOptions) -> Result<String, GatkError> {
    let stem = bam_stem(&job.in_bam)?;
    bam_stem(&job.out_bam)?;

    let (target_list, delete_list) = match job.target_list.as_deref().filter(|l| !l.is_empty()) {
        Some(list) => (list.to_string(), false),
        None => (format!("{stem}_target.list"), true),
    };

    let mut command = format!(
        "{} && {}",
        opts.realign_target_creator(
            &job.in_bam,
            &job.known_vcf,
            &job.reference,
            &target_list,
            job.threads
        ),
        opts.realign_from_target(
            &job.in_bam,
            &job.known_vcf,
            &job.reference,
            &target_list,
            &job.out_bam
        ),
    );

    match (job.delete_input, delete_list) {
        (true, true) => command += &format!(" && rm {stem}.ba?* {target_list}"),
        (true, false) => command += &format!(" && rm {stem}.ba?*"),
        (false, true) => command += &format!(" && rm {target_list}"),
        (false, false) => {}
    }

    Ok(command)
}

/// Base quality score recalibration of one BAM file.
///
/// When `table` is `None`, the report is written next to the input as `<stem>_bsqr.grp`. The
/// report is kept either way.
#[derive(Debug, Clone)]
pub struct RecalibrateJob {
    pub in_bam: String,
    pub out_bam: String,
    pub known_vcf: String,
    pub reference: String,
    pub table: Option<String>,
    pub delete_input: bool,
}

pub fn recalibrate(job: &RecalibrateJob, opts: &GatkOptions) -> Result<String, GatkError> {
    let stem = bam_stem(&job.in_bam)?;
    bam_stem(&job.out_bam)?;

    let table = match job.table.as_deref().filter(|t| !t.is_empty()) {
        Some(table) => table.to_string(),
        None => format!("{stem}_bsqr.grp"),
    };

    let mut command = format!(
        "{} && {}",
        opts.base_recalibrator(&job.in_bam, &job.known_vcf, &table, &job.reference),
        opts.print_reads(&job.in_bam, &job.out_bam, &job.reference, &table),
    );

    if job.delete_input {
        command += &format!(" && rm {stem}.ba?*");
    }

    Ok(command)
}
