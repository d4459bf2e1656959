use clap::Args;

use crate::cli::{load_segments, InputArgs, OutputFormat};
use crate::core::segment::{RawSegment, Segment};

#[derive(Args)]
pub struct ScanArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

/// Execute scan subcommand
///
/// # Errors
///
/// Returns an error if the input cannot be scanned or output cannot be serialized.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: ScanArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let segments = load_segments(&args.input, verbose)?;

    if segments.is_empty() {
        eprintln!("No segments found.");
        return Ok(());
    }

    match format {
        OutputFormat::Text => print_text_segments(&segments),
        OutputFormat::Json => print_json_segments(segments)?,
        OutputFormat::Tsv => print_tsv_segments(&segments),
    }

    Ok(())
}

fn print_text_segments(segments: &[RawSegment]) {
    let name_width = segments
        .iter()
        .map(|s| s.readid.len())
        .max()
        .unwrap_or(0)
        .max("Read".len());

    println!("Segments: {}", segments.len());
    println!("{}", "=".repeat(60));
    println!(
        "{:<name_width$}  {:<12} {:>12} {:>6} {:>8} {:>8} {:>8}",
        "Read", "Chrom", "Position", "Strand", "Offset", "RefLen", "QryLen"
    );
    for s in segments {
        println!(
            "{:<name_width$}  {:<12} {:>12} {:>6} {:>8} {:>8} {:>8}",
            s.readid, s.chrom, s.pos, s.strand, s.offset, s.rlen, s.qlen
        );
    }
}

fn print_json_segments(segments: Vec<RawSegment>) -> anyhow::Result<()> {
    let segments: Vec<Segment> = segments.into_iter().map(Segment::from).collect();
    println!("{}", serde_json::to_string_pretty(&segments)?);
    Ok(())
}

fn print_tsv_segments(segments: &[RawSegment]) {
    println!("readid\tchrom\tpos\tstrand\toffset\trlen\tqlen");
    for s in segments {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            s.readid, s.chrom, s.pos, s.strand, s.offset, s.rlen, s.qlen
        );
    }
}
