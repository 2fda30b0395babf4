//! shiftd - Convert tabular data between formats

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use shiftd::config::BatchMode;
use shiftd::{Config, Engine};

/// Convert tabular data between formats (CSV, JSON, Parquet, Excel, SQLite, TOON, ...)
#[derive(Parser, Debug)]
#[command(name = "shiftd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    options: CodecArgs,

    /// More log output (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert one file
    Convert {
        /// Output format (inferred from OUTPUT's extension by default)
        #[arg(long)]
        to: Option<String>,

        input: PathBuf,

        output: PathBuf,
    },

    /// Convert many files into a directory, all to the same format
    Batch {
        /// Output format
        #[arg(long)]
        to: String,

        /// Convert every input and report failures at the end
        #[arg(long)]
        keep_going: bool,

        /// Convert inputs in parallel
        #[arg(long)]
        parallel: bool,

        /// Input files followed by the output directory
        #[arg(required = true, num_args = 2..)]
        paths: Vec<PathBuf>,
    },

    /// List readable and writable formats
    Formats {
        /// Print the list as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Options forwarded to the codecs
#[derive(Args, Debug)]
struct CodecArgs {
    /// Database table to read or write (sqlite, duckdb)
    #[arg(long, global = true)]
    table: Option<String>,

    /// Worksheet to read (xlsx)
    #[arg(long, global = true)]
    sheet: Option<String>,

    /// JSON indent width
    #[arg(long, global = true, conflicts_with = "compact")]
    indent: Option<usize>,

    /// Write JSON without whitespace
    #[arg(long, global = true)]
    compact: bool,

    /// XML root element name
    #[arg(long, global = true)]
    root_tag: Option<String>,

    /// XML row element name
    #[arg(long, global = true)]
    row_tag: Option<String>,

    /// Coerce csv/tsv cells to numbers and booleans
    #[arg(long, global = true)]
    infer_types: bool,
}

impl CodecArgs {
    fn to_config(&self) -> Config {
        let mut config = Config::new().with_infer_types(self.infer_types);

        if let Some(ref table) = self.table {
            config = config.with_sql_table(table);
        }
        if let Some(ref sheet) = self.sheet {
            config = config.with_sheet_name(sheet);
        }
        if self.compact {
            config = config.with_json_indent(None);
        } else if let Some(indent) = self.indent {
            config = config.with_json_indent(Some(indent));
        }
        if self.root_tag.is_some() || self.row_tag.is_some() {
            let root = self.root_tag.clone().unwrap_or(config.xml.root_tag.clone());
            let row = self.row_tag.clone().unwrap_or(config.xml.row_tag.clone());
            config = config.with_xml_tags(root, row);
        }
        config
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.options.to_config();

    match cli.command {
        Command::Convert { to, input, output } => {
            ensure_inputs_exist(std::slice::from_ref(&input))?;

            let engine = Engine::with_config(config);
            let written = engine
                .convert(&input, &output, to.as_deref())
                .with_context(|| format!("Failed to convert {}", input.display()))?;
            println!("Converted {} -> {}", input.display(), written.display());
        }

        Command::Batch {
            to,
            keep_going,
            parallel,
            mut paths,
        } => {
            let Some(output_dir) = paths.pop() else {
                bail!("batch requires at least one INPUT and an OUTPUT_DIR");
            };
            ensure_inputs_exist(&paths)?;

            let mode = if keep_going {
                BatchMode::BestEffort
            } else {
                BatchMode::FailFast
            };
            let engine = Engine::with_config(config.with_batch_mode(mode).with_parallel(parallel));

            if keep_going {
                let report = engine.batch_convert_report(&paths, &output_dir, &to)?;
                for path in &report.converted {
                    println!("  -> {}", path.display());
                }
                println!("Converted {} file(s)", report.converted.len());
                for (source, err) in &report.failed {
                    eprintln!("Failed: {}: {}", source.display(), err);
                }
                if !report.is_success() {
                    bail!("{} of {} file(s) failed", report.failed.len(), paths.len());
                }
            } else {
                let results = engine.batch_convert(&paths, &output_dir, &to)?;
                for path in &results {
                    println!("  -> {}", path.display());
                }
                println!("Converted {} file(s)", results.len());
            }
        }

        Command::Formats { json } => {
            let formats = Engine::with_config(config).formats();
            if json {
                println!("{}", serde_json::to_string_pretty(&formats)?);
            } else {
                println!("Read:  {}", formats.read.join(", "));
                println!("Write: {}", formats.write.join(", "));
            }
        }
    }

    Ok(())
}

fn ensure_inputs_exist(inputs: &[PathBuf]) -> Result<()> {
    for input in inputs {
        if !input.exists() {
            bail!("Input not found: {}", input.display());
        }
    }
    Ok(())
}
