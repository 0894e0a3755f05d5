use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use zobject::config::CodecConfig;
use zobject::digest::ContentHash;
use zobject::object;

#[derive(Parser)]
#[command(name = "zobject", about = "Compress, name and restore content-addressed objects")]
struct Cli {
    /// JSON codec configuration (level, chunk_size, read_chunk_size, checksum)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the working chunk size in bytes
    #[arg(long, global = true)]
    chunk_size: Option<usize>,
    /// Override the bulk read size in bytes
    #[arg(long, global = true)]
    read_chunk_size: Option<usize>,
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file into an object and print its name
    Compress {
        input:  PathBuf,
        output: PathBuf,
    },
    /// Restore an object, optionally checking it against its name
    Decompress {
        input:  PathBuf,
        output: PathBuf,
        /// Expected object name (hex digest of the compressed bytes)
        #[arg(long)]
        expect: Option<String>,
    },
    /// Print the name a file would have as an object, without storing it
    Digest {
        input: PathBuf,
    },
    /// Copy a file, keeping its permission bits
    Copy {
        input:  PathBuf,
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let cfg = load_config(&cli)?;

    match cli.command {

        // ── Compress ─────────────────────────────────────────────────────────
        Commands::Compress { input, output } => {
            let (name, stats) = object::compress_path_to_path_hashed(&input, &output, &cfg)?;
            eprintln!("  {} → {} ({} B → {} B)",
                input.display(), output.display(), stats.bytes_in, stats.bytes_out);
            println!("{name}");
        }

        // ── Decompress ───────────────────────────────────────────────────────
        Commands::Decompress { input, output, expect } => {
            let stats = match expect {
                Some(hex) => {
                    let expected = ContentHash::from_hex(&hex)?;
                    object::decompress_path_to_path_verified(&input, &output, &expected, &cfg)?
                }
                None => object::decompress_path_to_path(&input, &output, &cfg)?,
            };
            eprintln!("  {} → {} ({} B → {} B)",
                input.display(), output.display(), stats.bytes_in, stats.bytes_out);
        }

        // ── Digest ───────────────────────────────────────────────────────────
        Commands::Digest { input } => {
            println!("{}", object::compress_path_to_digest(&input, &cfg)?);
        }

        // ── Copy ─────────────────────────────────────────────────────────────
        Commands::Copy { input, output } => {
            let n = object::copy_path_to_path(&input, &output)?;
            eprintln!("  copied {n} B → {}", output.display());
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "warn,zobject=debug",
        _ => "warn,zobject=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<CodecConfig, Box<dyn std::error::Error>> {
    let mut cfg = match &cli.config {
        Some(path) => CodecConfig::load(path)?,
        None       => CodecConfig::default(),
    };
    if let Some(n) = cli.chunk_size      { cfg.chunk_size = n; }
    if let Some(n) = cli.read_chunk_size { cfg.read_chunk_size = n; }
    cfg.validate()?;
    Ok(cfg)
}
