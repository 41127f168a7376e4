use clap::builder::styling::AnsiColor;
use clap::builder::Styles;
use clap::{Args, Parser, Subcommand};

const fn extra_build_info() -> &'static str {
    match option_env!("CARGO_BUILD_DESC") {
        Some(e) => e,
        None => env!("CARGO_PKG_VERSION"),
    }
}
pub const VERSION: &str = extra_build_info();
const INFO_STRING: &str = "
pairmerge version ";
const AFTER_STRING: &str = "
   ──────────────────────────────────
   merge and trim paired FASTQ files, and build GATK realignment/recalibration commands";

// colouring of the help
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().bold())
    .usage(AnsiColor::BrightMagenta.on_default().bold())
    .literal(AnsiColor::BrightMagenta.on_default())
    .placeholder(AnsiColor::White.on_default());

#[derive(Parser)]
#[command(
    version = VERSION,
    about = format!("{}{}{}", INFO_STRING, VERSION, AFTER_STRING),
    arg_required_else_help = true,
    flatten_help = true,
    styles = STYLES
)]
pub struct Cli {
    /// more logging output; repeat for trace level
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// The two mate inputs. Each may be several files, which are read one after another.
#[derive(Args)]
pub struct PairedInput {
    /// read 1 .fastq file(s), optionally compressed. `-` reads standard input
    #[arg(long, num_args = 1.., required = true)]
    pub read1: Vec<String>,

    /// read 2 .fastq file(s), in the same order as --read1
    #[arg(long, num_args = 1.., required = true)]
    pub read2: Vec<String>,

    /// the output .fastq, gzipped if it ends in .gz (default: standard output)
    #[arg(short, long)]
    pub output: Option<String>,
}

#[derive(Args)]
pub struct GatkArgs {
    /// path to java
    #[arg(long, default_value = "java")]
    pub java: String,

    /// path to the GATK jar file
    #[arg(long, default_value = "GenomeAnalysisTK.jar")]
    pub gatk_jar: String,

    /// java heap size, in GB
    #[arg(long)]
    pub memory: Option<u32>,
}

impl From<&GatkArgs> for crate::gatk::GatkOptions {
    fn from(args: &GatkArgs) -> Self {
        crate::gatk::GatkOptions {
            java: args.java.clone(),
            gatk_jar: args.gatk_jar.clone(),
            memory_gb: args.memory,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interleave paired .fastq files, labelling each read with its mate
    #[command(arg_required_else_help = true)]
    Label {
        #[command(flatten)]
        input: PairedInput,

        /// label appended to read 1 IDs
        #[arg(long, default_value = ":1", allow_hyphen_values = true)]
        label1: String,

        /// label appended to read 2 IDs
        #[arg(long, default_value = ":2", allow_hyphen_values = true)]
        label2: String,
    },

    /// Interleave paired .fastq files, cutting reads after a trim sequence and dropping pairs
    /// which become too short
    #[command(arg_required_else_help = true)]
    Trim {
        #[command(flatten)]
        input: PairedInput,

        /// reads are cut directly after the first occurrence of this sequence
        #[arg(long, value_parser = clap::builder::NonEmptyStringValueParser::new())]
        trim_seq: String,

        /// pairs in which a trimmed read is shorter than this are discarded
        #[arg(long, default_value_t = 20)]
        min_length: usize,

        /// label appended to read 1 IDs; pass an empty string for no label
        #[arg(long, default_value = ":1", allow_hyphen_values = true)]
        label1: String,

        /// label appended to read 2 IDs; pass an empty string for no label
        #[arg(long, default_value = ":2", allow_hyphen_values = true)]
        label2: String,

        /// write trimming metrics to this file as JSON
        #[arg(long)]
        metrics: Option<String>,

        /// do not check that the two reads of each pair have the same ID
        #[arg(long, action)]
        skip_id_check: bool,
    },

    /// Print the GATK command for local realignment around indels
    #[command(arg_required_else_help = true)]
    Realign {
        /// the input .bam
        #[arg(long)]
        input: String,

        /// the output .bam
        #[arg(long)]
        output: String,

        /// .vcf of known indels, may be gzipped
        #[arg(long)]
        known: String,

        /// reference genome .fasta
        #[arg(long)]
        reference: String,

        /// where to save the target intervals. if not given, a temporary
        /// `<input>_target.list` is created and removed afterwards
        #[arg(long, verbatim_doc_comment)]
        target_list: Option<String>,

        /// the number of threads to use
        #[arg(short, long, default_value_t = 1)]
        threads: usize,

        /// keep the input .bam and its index
        #[arg(long, action)]
        keep_input: bool,

        #[command(flatten)]
        gatk: GatkArgs,
    },

    /// Print the GATK command for base quality score recalibration
    #[command(arg_required_else_help = true)]
    Recalibrate {
        /// the input .bam
        #[arg(long)]
        input: String,

        /// the output .bam
        #[arg(long)]
        output: String,

        /// .vcf of known SNPs, may be gzipped
        #[arg(long)]
        known: String,

        /// reference genome .fasta
        #[arg(long)]
        reference: String,

        /// where to save the recalibration report (default: `<input>_bsqr.grp`)
        #[arg(long)]
        table: Option<String>,

        /// keep the input .bam and its index
        #[arg(long, action)]
        keep_input: bool,

        #[command(flatten)]
        gatk: GatkArgs,
    },

    /// Print commands which concatenate the .fastq files of each read into one gzipped file
    #[command(arg_required_else_help = true)]
    Concat {
        /// output files are named `<prefix>_R1.fastq.gz`, `<prefix>_R2.fastq.gz`
        #[arg(long)]
        prefix: String,

        /// read 1 files, in order
        #[arg(long, num_args = 1.., required = true)]
        read1: Vec<String>,

        /// read 2 files, in order
        #[arg(long, num_args = 1..)]
        read2: Vec<String>,
    },
}
