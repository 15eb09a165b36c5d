//! Ownership CLI - Clean a company ownership register
//!
//! # Main Command
//!
//! ```bash
//! ownership process                          # data.xlsx -> result_data.xlsx
//! ownership process input.csv -o result      # CSV sheets into ./result/
//! ownership process input.xlsx --json r.json # also dump the report as JSON
//! ```
//!
//! `OWNERSHIP_INPUT` / `OWNERSHIP_OUTPUT` (environment or `.env`) replace the
//! default paths.
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! ownership parse input.xlsx        # Raw rows as JSON
//! ownership normalize input.xlsx    # Cleaned records as JSON
//! ownership analyze input.xlsx      # Full report as JSON
//! ownership validate input.xlsx     # Schema check of cleaned records
//! ```

use clap::{Parser, Subcommand};
use ownership::{
    build_records, parse_input_file, process_file, run_batch, validate_records, write_json,
    PipelineOptions, RunPaths, LOG_BROADCASTER,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "ownership")]
#[command(about = "Clean and analyze a company ownership register", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full run: read, normalize, analyze and write the report
    Process {
        /// Input register (default: $OWNERSHIP_INPUT or data.xlsx)
        input: Option<PathBuf>,

        /// Output workbook (.xlsx), JSON file (.json) or CSV directory
        /// (default: $OWNERSHIP_OUTPUT or result_data.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the report as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// Skip schema validation of cleaned records
        #[arg(long)]
        no_validate: bool,

        /// Only print the result line
        #[arg(short, long)]
        quiet: bool,
    },

    /// Parse the register and output raw rows as JSON
    Parse {
        /// Input register
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Normalize the register and output cleaned records as JSON
    Normalize {
        /// Input register
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the analyses and output the report as JSON
    Analyze {
        /// Input register
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate cleaned records against the record schema
    Validate {
        /// Input register
        input: PathBuf,
    },
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Process {
            input,
            output,
            json,
            no_validate,
            quiet,
        } => cmd_process(input, output, json.as_deref(), no_validate, quiet),

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Normalize { input, output } => cmd_normalize(&input, output.as_deref()),

        Commands::Analyze { input, output } => cmd_analyze(&input, output.as_deref()),

        Commands::Validate { input } => cmd_validate(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_process(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    json: Option<&Path>,
    no_validate: bool,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    LOG_BROADCASTER.set_echo(!quiet);

    let paths = RunPaths::resolve(input, output);
    let options = PipelineOptions {
        validate_records: !no_validate,
        ..PipelineOptions::default()
    };

    let result = run_batch(&paths.input, &paths.output, &options)?;

    if let Some(json_path) = json {
        write_json(&result.report, json_path)?;
        eprintln!("Report JSON written to: {}", json_path.display());
    }

    println!("Result saved to {}", paths.output.display());
    Ok(())
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Parsing: {}", input.display());

    let result = parse_input_file(input)?;
    eprintln!("   Encoding: {}", result.encoding);
    eprintln!("   Columns: {}", result.headers.join(", "));
    eprintln!("Parsed {} records", result.records.len());

    write_output(&result.records, output)
}

fn cmd_normalize(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Normalizing: {}", input.display());

    let parsed = parse_input_file(input)?;
    let built = build_records(&parsed.records, &parsed.columns);
    eprintln!("{}", built.summary());
    for failure in built.failures.iter().take(10) {
        eprintln!(
            "   line {}, {}: '{}' ({})",
            failure.line, failure.column, failure.value, failure.reason
        );
    }

    write_output(&built.records, output)
}

fn cmd_analyze(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let options = PipelineOptions {
        validate_records: false,
        ..PipelineOptions::default()
    };
    let result = process_file(input, &options)?;
    write_output(&result.report, output)
}

fn cmd_validate(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Validating: {}", input.display());

    let parsed = parse_input_file(input)?;
    let built = build_records(&parsed.records, &parsed.columns);
    let violations = validate_records(&built.records)?;

    for violation in violations.iter().take(5) {
        eprintln!("\nLine {} invalid:", violation.line);
        for err in violation.errors.iter().take(3) {
            eprintln!("   - {}", err);
        }
    }

    let invalid = violations.len();
    eprintln!(
        "\nResults: {} valid, {} invalid",
        built.records.len() - invalid,
        invalid
    );

    if invalid > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn write_output<T: Serialize + ?Sized>(
    value: &T,
    path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = serde_json::to_string_pretty(value)?;
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
