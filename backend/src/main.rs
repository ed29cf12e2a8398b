//! Rosterload CLI - normalize student roster exports
//!
//! # Main Commands
//!
//! ```bash
//! rosterload transform students.csv     # Full run: clean records + report
//! rosterload serve                      # Start HTTP server (port 3000)
//! ```
//!
//! # Inspection Commands
//!
//! ```bash
//! rosterload parse students.csv         # Just parse CSV to JSON rows
//! rosterload audit students.csv         # Data-quality audit of raw rows
//! rosterload validate clean.json        # Check records against the schema
//! rosterload rules                      # Print the default rules
//! ```

use clap::{Parser, Subcommand};
use rosterload::parser::parse_string_with_metadata;
use rosterload::transform::format_delimiter;
use rosterload::{
    audit_records, collect_headers, decode_content, init_logging, parse_csv_file_auto,
    records_from_json, run_file, run_json, validate_student_record, NormalizationRules,
    PipelineRun, RunOptions, Settings,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "rosterload")]
#[command(about = "Normalize messy student roster spreadsheets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a CSV file and output JSON rows
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Full pipeline: extract, deduplicate, clean, validate
    Transform {
        /// Input file (.csv, or .json array of rows)
        input: PathBuf,

        /// Normalization rules JSON (default: built-in rules)
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Output file for normalized records (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Skip the output schema check
        #[arg(long)]
        no_verify: bool,
    },

    /// Validate normalized records against the student schema
    Validate {
        /// Input JSON file (array of records)
        input: PathBuf,
    },

    /// Audit raw rows for data-quality problems
    Audit {
        /// Input CSV file
        input: PathBuf,

        /// Normalization rules JSON (default: built-in rules)
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Print the audit as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the default normalization rules
    Rules,

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: ROSTERLOAD_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Normalization rules JSON (default: built-in rules)
        #[arg(short, long)]
        rules: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    };

    let _log_guard = match init_logging(settings.log_format, settings.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("❌ Cannot open log directory: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, delimiter, output.as_deref()),

        Commands::Transform {
            input,
            rules,
            output,
            report,
            no_verify,
        } => cmd_transform(
            &input,
            &settings.with_rules(rules),
            output.as_deref(),
            report.as_deref(),
            no_verify,
        ),

        Commands::Validate { input } => cmd_validate(&input),

        Commands::Audit { input, rules, json } => {
            cmd_audit(&input, &settings.with_rules(rules), json)
        }

        Commands::Rules => cmd_rules(),

        Commands::Serve { port, rules } => {
            cmd_serve(port.unwrap_or(settings.port), &settings.with_rules(rules)).await
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_parse(input: &Path, delimiter: Option<char>, output: Option<&Path>) -> CliResult {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let mut result = parse_csv_file_auto(input)?;

    if let Some(d) = delimiter.filter(|d| *d != result.delimiter) {
        let text = decode_content(&fs::read(input)?, &result.encoding);
        result = parse_string_with_metadata(&text, d, result.encoding)?;
    }

    eprintln!("   Encoding: {}", result.encoding);
    eprintln!(
        "   Delimiter: '{}'{}",
        format_delimiter(result.delimiter),
        if delimiter.is_none() { " (auto-detected)" } else { "" }
    );
    eprintln!("   Columns: {}", result.headers.join(", "));
    eprintln!("✅ Parsed {} records", result.records.len());

    let json = serde_json::to_string_pretty(&result.records)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_transform(
    input: &Path,
    settings: &Settings,
    output: Option<&Path>,
    report_path: Option<&Path>,
    no_verify: bool,
) -> CliResult {
    eprintln!("📄 Processing: {}", input.display());

    let rules = settings.load_rules()?;
    let options = RunOptions {
        verify_output: !no_verify,
        source: Some(input.display().to_string()),
    };

    let outcome = if is_json(input) {
        let value: Value = serde_json::from_str(&fs::read_to_string(input)?)?;
        run_json(&value, &rules, &options)
    } else {
        run_file(input, &rules, &options)
    };

    let run = match outcome {
        Ok(run) => run,
        Err(failure) => {
            failure.report.log_summary();
            if let Some(path) = report_path {
                fs::write(path, serde_json::to_string_pretty(&failure.report)?)?;
            }
            return Err(Box::new(failure));
        }
    };

    print_run(&run);
    run.report.log_summary();

    if let Some(path) = report_path {
        fs::write(path, serde_json::to_string_pretty(&run.report)?)?;
        eprintln!("   💾 Report saved to: {}", path.display());
    }

    let json = serde_json::to_string_pretty(&run.records)?;
    write_output(&json, output)?;

    eprintln!("\n✨ Done!");
    Ok(())
}

fn print_run(run: &PipelineRun) {
    let extract = &run.report.extract;
    if let Some(encoding) = &extract.encoding {
        eprintln!("   Encoding: {}", encoding);
    }
    if let Some(d) = extract.delimiter {
        eprintln!("   Delimiter: '{}'", format_delimiter(d));
    }
    eprintln!("   Rows: {}", extract.records_extracted);
    eprintln!("   Columns: {}", extract.columns.join(", "));

    if let Some(t) = &run.report.transform {
        eprintln!("\n⚙️  Normalized: {}", t.summary());
        for err in t.validation_errors.iter().take(5) {
            eprintln!("     - {}", err);
        }
    }
    if run.report.schema_violations > 0 {
        eprintln!("   ❌ Schema violations: {}", run.report.schema_violations);
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

fn cmd_validate(input: &Path) -> CliResult {
    eprintln!("✔️  Validating: {}", input.display());

    let content = fs::read_to_string(input)?;
    let records: Vec<Value> = serde_json::from_str(&content)?;

    let mut valid = 0;
    let mut invalid = 0;

    for (i, record) in records.iter().enumerate() {
        match validate_student_record(record) {
            Ok(()) => valid += 1,
            Err(errors) => {
                invalid += 1;
                if invalid <= 5 {
                    eprintln!("\n❌ Record {} invalid:", i);
                    for err in errors.iter().take(3) {
                        eprintln!("   - {}", err);
                    }
                }
            }
        }
    }

    eprintln!("\n📊 Results: {} valid, {} invalid", valid, invalid);

    if invalid > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_audit(input: &Path, settings: &Settings, json: bool) -> CliResult {
    eprintln!("🔎 Auditing: {}", input.display());

    let rules = settings.load_rules()?;
    let (records, headers) = if is_json(input) {
        let value: Value = serde_json::from_str(&fs::read_to_string(input)?)?;
        let records = records_from_json(&value)?;
        let headers = collect_headers(&records);
        (records, headers)
    } else {
        let parsed = parse_csv_file_auto(input)?;
        (parsed.records, parsed.headers)
    };

    let report = audit_records(&records, &headers, &rules);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }
    Ok(())
}

fn cmd_rules() -> CliResult {
    println!("{}", NormalizationRules::default().to_json()?);
    Ok(())
}

async fn cmd_serve(port: u16, settings: &Settings) -> CliResult {
    let rules = settings.load_rules()?;
    rosterload::server::start_server(port, rules).await?;
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> CliResult {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
