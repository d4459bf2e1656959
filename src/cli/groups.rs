use clap::Args;

use crate::cli::{load_segments, InputArgs, OutputFormat};
use crate::grouping::groups::{group_segments, SegmentGroup};

#[derive(Args)]
pub struct GroupsArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Only report groups with at least this many segments
    #[arg(long, default_value = "1")]
    pub min_segments: usize,
}

/// Execute groups subcommand
///
/// # Errors
///
/// Returns an error if the input cannot be scanned or output cannot be serialized.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: GroupsArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let segments = load_segments(&args.input, verbose)?;

    let groups: Vec<SegmentGroup> = group_segments(&segments)
        .into_iter()
        .filter(|g| g.segments.len() >= args.min_segments)
        .collect();

    if verbose {
        eprintln!(
            "Formed {} groups from {} segments",
            groups.len(),
            segments.len()
        );
    }

    if groups.is_empty() {
        eprintln!("No segment groups found.");
        return Ok(());
    }

    match format {
        OutputFormat::Text => print_text_groups(&groups),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&groups)?),
        OutputFormat::Tsv => print_tsv_groups(&groups),
    }

    Ok(())
}

fn print_text_groups(groups: &[SegmentGroup]) {
    println!("Segment Groups: {}", groups.len());
    println!("{}", "=".repeat(60));

    for group in groups {
        println!(
            "\n{} ({} segments, {} bp)",
            group.name(),
            group.segments.len(),
            group.width()
        );
        for s in &group.segments {
            let s = &s.raw;
            println!(
                "  {} {}:{}-{} ({}) read offset {} length {}",
                s.readid,
                s.chrom,
                s.pos,
                s.end() - 1,
                s.strand,
                s.offset,
                s.qlen
            );
        }
    }
}

fn print_tsv_groups(groups: &[SegmentGroup]) {
    println!("group\treadid\tchrom\tpos\tstrand\toffset\trlen\tqlen");
    for group in groups {
        let name = group.name();
        for s in &group.segments {
            let s = &s.raw;
            println!(
                "{name}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                s.readid, s.chrom, s.pos, s.strand, s.offset, s.rlen, s.qlen
            );
        }
    }
}
