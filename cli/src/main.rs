//! sheetbind CLI - streaming XLSX row extraction
//!
//! Lists sheets, shows resolved titles, and dumps rows as JSON objects
//! keyed by title.

use clap::{Args, Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use sheetbind::{Connector, ConnectorConfig, ReaderConfig, SheetDesignator, SheetReader};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Streaming XLSX reader
#[derive(Parser)]
#[command(
    name = "sheetbind",
    author = "iyulab",
    version,
    about = "Read rows out of XLSX workbooks",
    long_about = "sheetbind - Streaming XLSX row reader.\n\n\
                  Reads sheets row by row without loading the workbook, optionally \
                  capping how much of the shared string table is parsed."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the sheets of a workbook
    Sheets {
        /// Input file path
        input: PathBuf,
    },

    /// Show the resolved column titles of a sheet
    Titles {
        /// Input file path
        input: PathBuf,

        #[command(flatten)]
        reader: ReaderArgs,
    },

    /// Dump the data rows of a sheet as JSON
    Rows {
        /// Input file path
        input: PathBuf,

        #[command(flatten)]
        reader: ReaderArgs,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output one compact JSON object per line
        #[arg(long)]
        compact: bool,

        /// Stop after this many rows
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show version information
    Version,
}

/// Options shared by the sheet-reading commands
#[derive(Args)]
struct ReaderArgs {
    /// JSON file with `connector` and `reader` sections
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sheet name, or 1-based position (hidden sheets counted)
    #[arg(short, long)]
    sheet: Option<String>,

    /// Zero-based index of the title row
    #[arg(short, long)]
    title_row: Option<usize>,

    /// Non-blank rows to skip after the title row
    #[arg(long)]
    skip: Option<usize>,

    /// Prefix added to every title
    #[arg(long)]
    name_prefix: Option<String>,

    /// Suffix added to every title
    #[arg(long)]
    name_suffix: Option<String>,

    /// Prefix added to the sheet name
    #[arg(long)]
    sheet_prefix: Option<String>,

    /// Suffix added to the sheet name
    #[arg(long)]
    sheet_suffix: Option<String>,

    /// Maximum bytes of the shared string table to parse
    #[arg(long)]
    max_shared_bytes: Option<u64>,
}

/// Layout of the `--config` file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    connector: ConnectorConfig,
    reader: ReaderConfig,
}

impl ReaderArgs {
    /// Merge the config file with the flags; flags win.
    fn resolve(&self) -> Result<(ConnectorConfig, ReaderConfig), Box<dyn std::error::Error>> {
        let ConfigFile {
            mut connector,
            mut reader,
        } = match &self.config {
            Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
            None => ConfigFile::default(),
        };

        if let Some(sheet) = &self.sheet {
            reader.sheet = parse_sheet(sheet);
        }
        if let Some(index) = self.title_row {
            reader.title_row_index = index;
        }
        if let Some(skip) = self.skip {
            reader.skip_rows = skip;
        }
        if let Some(prefix) = &self.name_prefix {
            reader.name_prefix = prefix.clone();
        }
        if let Some(suffix) = &self.name_suffix {
            reader.name_suffix = suffix.clone();
        }
        if let Some(prefix) = &self.sheet_prefix {
            reader.sheet_prefix = prefix.clone();
        }
        if let Some(suffix) = &self.sheet_suffix {
            reader.sheet_suffix = suffix.clone();
        }
        if let Some(bytes) = self.max_shared_bytes {
            connector.max_shared_string_bytes = Some(bytes);
        }

        Ok((connector, reader))
    }
}

fn parse_sheet(value: &str) -> SheetDesignator {
    match value.parse::<usize>() {
        Ok(position) => SheetDesignator::Position(position),
        Err(_) => SheetDesignator::Name(value.to_string()),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Sheets { input } => {
            let conn = sheetbind::open(&input)?;

            println!("{}", "Sheets".cyan().bold());
            println!("{}", "─".repeat(40));
            for (i, name) in conn.sheet_names().iter().enumerate() {
                println!("{:>3}  {}", (i + 1).to_string().bold(), name);
            }
        }

        Commands::Titles { input, reader } => {
            let (conn, rd) = open_reader(&input, &reader)?;

            println!(
                "{} {}",
                "Titles of".cyan().bold(),
                rd.sheet_name().cyan().bold()
            );
            println!("{}", "─".repeat(40));
            for (i, title) in rd.titles().iter().enumerate() {
                let shown = if title.is_empty() {
                    "(empty)".dimmed().to_string()
                } else {
                    title.clone()
                };
                println!("{:>3}  {}", i.to_string().bold(), shown);
            }
            report_budget(&conn);
        }

        Commands::Rows {
            input,
            reader,
            output,
            compact,
            limit,
        } => {
            let (conn, mut rd) = open_reader(&input, &reader)?;

            let pb = output
                .as_ref()
                .map(|_| create_progress(rd.stream_size()));
            let count = match &output {
                Some(path) => {
                    let file = BufWriter::new(fs::File::create(path)?);
                    write_rows(&mut rd, file, compact, limit, pb.as_ref())?
                }
                None => write_rows(&mut rd, io::stdout().lock(), compact, limit, None)?,
            };
            rd.close()?;

            if let Some(pb) = pb {
                pb.finish_and_clear();
            }
            if let Some(path) = output {
                println!(
                    "{} Wrote {} rows to {}",
                    "✓".green().bold(),
                    count,
                    path.display()
                );
            }
            report_budget(&conn);
        }

        Commands::Version => {
            print_version();
        }
    }

    Ok(())
}

fn open_reader(
    input: &Path,
    args: &ReaderArgs,
) -> Result<(Connector, SheetReader), Box<dyn std::error::Error>> {
    let (connector_config, reader_config) = args.resolve()?;
    let mut conn = Connector::new();
    conn.open_with_config(input, connector_config)?;
    let rd = conn.new_reader_with_config(&reader_config)?;
    Ok((conn, rd))
}

/// Write rows as a JSON array, or as JSON lines when `compact`.
fn write_rows<W: Write>(
    rd: &mut SheetReader,
    mut out: W,
    compact: bool,
    limit: Option<usize>,
    pb: Option<&ProgressBar>,
) -> Result<usize, Box<dyn std::error::Error>> {
    let mut count = 0;
    if !compact {
        writeln!(out, "[")?;
    }

    while limit.is_none_or(|limit| count < limit) && rd.next()? {
        let row: serde_json::Map<String, serde_json::Value> = rd.read()?;
        if compact {
            serde_json::to_writer(&mut out, &row)?;
            writeln!(out)?;
        } else {
            if count > 0 {
                writeln!(out, ",")?;
            }
            serde_json::to_writer_pretty(&mut out, &row)?;
        }
        count += 1;

        if let Some(pb) = pb {
            pb.set_position(rd.byte_offset());
        }
    }

    if !compact {
        if count > 0 {
            writeln!(out)?;
        }
        writeln!(out, "]")?;
    }
    out.flush()?;
    Ok(count)
}

fn report_budget(conn: &Connector) {
    if conn.exceeded_shared_string_budget() {
        eprintln!(
            "{} Shared string budget exhausted; some strings were read as empty",
            "!".yellow().bold()
        );
    }
}

fn print_version() {
    println!("{} {}", "sheetbind".green().bold(), env!("CARGO_PKG_VERSION"));
    println!("Streaming XLSX row reader with typed row binding");
}

fn create_progress(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.blue} [{bar:30.cyan/blue}] {bytes}/{total_bytes} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb.set_message("Reading rows...");
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sheet() {
        assert_eq!(parse_sheet("2"), SheetDesignator::Position(2));
        assert_eq!(
            parse_sheet("Advance"),
            SheetDesignator::Name("Advance".to_string())
        );
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "sheetbind",
            "rows",
            "book.xlsx",
            "--sheet",
            "Advance",
            "--title-row",
            "1",
            "--max-shared-bytes",
            "200",
        ]);
        let Commands::Rows { reader, .. } = cli.command else {
            panic!("expected rows command");
        };
        let (connector, config) = reader.resolve().unwrap();
        assert_eq!(connector.max_shared_string_bytes, Some(200));
        assert_eq!(config.title_row_index, 1);
        assert_eq!(config.sheet, SheetDesignator::Name("Advance".to_string()));
    }
}
