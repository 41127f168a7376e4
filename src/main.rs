extern crate env_logger;
#[macro_use]
extern crate log;
use std::fs::File;
use std::io::BufWriter;

use anyhow::{bail, Context, Result};
use clap::Parser;

mod cli;
mod concat;
mod gatk;
mod io;
mod merge;
mod metrics;
mod record;

use cli::{Cli, Commands, PairedInput};
use io::{FastqSource, FastqWriter, Output};

/// Opens both mate inputs and the output. Both inputs are opened before the output is created,
/// so a missing input never leaves an empty output file behind.
fn open_paired(input: &PairedInput) -> Result<(FastqSource, FastqSource, FastqWriter<Output>)> {
    // two readers sharing stdin would each buffer part of the stream
    if input.read1.iter().chain(&input.read2).filter(|p| *p == "-").count() > 1 {
        bail!("Standard input (`-`) can be given as at most one input file");
    }

    let read1 = FastqSource::open(&input.read1).context("Could not open read 1 input")?;
    let read2 = FastqSource::open(&input.read2).context("Could not open read 2 input")?;
    let output = Output::create(&input.output)?;
    Ok((read1, read2, FastqWriter::new(output)))
}

fn write_metrics(path: &str, metrics: &metrics::MergeMetrics) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Unable to create {path}"))?;
    serde_json::to_writer_pretty(BufWriter::new(file), metrics)
        .context("Could not write metrics")?;
    Ok(())
}

fn try_main(cli: Cli) -> Result<()> {
    info!("pairmerge v{}", cli::VERSION);

    match cli.command {
        Commands::Label {
            input,
            label1,
            label2,
        } => {
            let (read1, read2, mut writer) = open_paired(&input)?;

            let pairs = merge::merge_label_pair(read1, read2, &mut writer, &label1, &label2)?;
            writer.into_inner().close().context("Could not close output")?;

            info!("Completed successfully: {pairs} read pairs written.")
        }
        Commands::Trim {
            input,
            trim_seq,
            min_length,
            label1,
            label2,
            metrics,
            skip_id_check,
        } => {
            let opts = merge::TrimOptions::new(trim_seq, min_length)?
                .labels(Some(label1), Some(label2))
                .check_ids(!skip_id_check);
            if skip_id_check {
                warn!("Read IDs of each pair will not be checked against each other");
            }

            let (read1, read2, mut writer) = open_paired(&input)?;

            let stats = merge::merge_label_trim_pair(read1, read2, &mut writer, &opts)?;
            writer.into_inner().close().context("Could not close output")?;

            info!("Stats: {stats}; {} pairs written", stats.written());
            if let Some(path) = metrics {
                write_metrics(&path, &stats)?;
                info!("Wrote metrics to {path}");
            }

            info!("Completed successfully.")
        }
        Commands::Realign {
            input,
            output,
            known,
            reference,
            target_list,
            threads,
            keep_input,
            gatk: gatk_args,
        } => {
            let job = gatk::RealignJob {
                in_bam: input,
                out_bam: output,
                known_vcf: known,
                reference,
                target_list,
                threads,
                delete_input: !keep_input,
            };
            println!("{}", gatk::realign(&job, &(&gatk_args).into())?);
        }
        Commands::Recalibrate {
            input,
            output,
            known,
            reference,
            table,
            keep_input,
            gatk: gatk_args,
        } => {
            let job = gatk::RecalibrateJob {
                in_bam: input,
                out_bam: output,
                known_vcf: known,
                reference,
                table,
                delete_input: !keep_input,
            };
            println!("{}", gatk::recalibrate(&job, &(&gatk_args).into())?);
        }
        Commands::Concat {
            prefix,
            read1,
            read2,
        } => {
            let mut reads = vec![read1];
            if !read2.is_empty() {
                reads.push(read2);
            }

            for command in concat::concat_commands(&prefix, &reads)?.into_iter().flatten() {
                println!("{command}");
            }
        }
    };
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_target(false)
        .init();

    if let Err(err) = try_main(cli) {
        error!("{}", err);

        // report any errors that are produced
        err.chain()
            .skip(1)
            .for_each(|cause| error!("  because: {}", cause));

        std::process::exit(1);
    }
}
