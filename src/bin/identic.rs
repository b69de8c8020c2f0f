//! Identic CLI - byte-for-byte file comparison.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use identic::{CancelToken, StreamComparer, Verdict, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_IN_FLIGHT};

const DEFAULT_PARALLEL_CHUNK: usize = identic::DEFAULT_PARALLEL_CHUNK_SIZE;

/// Identic - streaming binary equality verification
#[derive(Parser)]
#[command(name = "identic")]
#[command(version)]
#[command(about = "byte-for-byte file comparison with bounded memory")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two files byte for byte
    Cmp {
        /// First file
        #[arg(required = true)]
        a: PathBuf,

        /// Second file
        #[arg(required = true)]
        b: PathBuf,

        /// Bytes read from each file per chunk
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// Chunk size for the parallel in-memory comparison
        #[arg(long, default_value_t = DEFAULT_PARALLEL_CHUNK)]
        parallel_chunk: usize,

        /// Maximum chunks buffered per file before its reader blocks
        #[arg(long, default_value_t = DEFAULT_MAX_IN_FLIGHT)]
        in_flight: usize,

        /// Wait for both reader threads to terminate before exiting
        #[arg(long)]
        force_finish: bool,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Cmp {
            a,
            b,
            chunk_size,
            parallel_chunk,
            in_flight,
            force_finish,
            verbose,
        } => {
            validate_positive("chunk-size", chunk_size)?;
            validate_positive("parallel-chunk", parallel_chunk)?;
            validate_positive("in-flight", in_flight)?;

            let comparer = StreamComparer::builder()
                .chunk_size(chunk_size)
                .compare_chunk_size(parallel_chunk)
                .max_in_flight(in_flight)
                .force_finish(force_finish)
                .build();

            if verbose {
                eprintln!("Comparing {} <-> {}", a.display(), b.display());
                eprintln!("Chunk size: {chunk_size} bytes, {in_flight} in flight");
            }

            let report = comparer.compare_files(&a, &b, &CancelToken::new())?;

            if verbose {
                eprintln!("Bytes confirmed equal: {}", report.bytes_compared);
                for outcome in [&report.reader_a, &report.reader_b]
                    .into_iter()
                    .flatten()
                {
                    match &outcome.fault {
                        Some(e) => eprintln!(
                            "Reader {:?}: {} bytes read, fault: {e}",
                            outcome.source, outcome.bytes_read
                        ),
                        None => eprintln!(
                            "Reader {:?}: {} bytes read",
                            outcome.source, outcome.bytes_read
                        ),
                    }
                }
            }

            match report.verdict {
                Verdict::Equal => {
                    println!("{} == {}", a.display(), b.display());
                    Ok(true)
                }
                Verdict::Unequal => {
                    println!("{} != {}", a.display(), b.display());
                    Ok(false)
                }
                Verdict::Cancelled => {
                    println!("comparison cancelled");
                    Ok(false)
                }
            }
        }
    }
}

fn validate_positive(name: &str, value: usize) -> Result<(), String> {
    if value == 0 {
        return Err(format!("{name} must be at least 1, got 0"));
    }
    Ok(())
}
