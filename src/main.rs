//! # Folio CLI
//!
//! ```bash
//! # Render a definition to PDF
//! folio invoice.json -o invoice.pdf
//!
//! # Convert between definition formats while rendering
//! folio invoice.xml -o invoice.pdf --json invoice.json
//!
//! # Write the PDF as a data URL
//! folio invoice.json --data-url invoice.txt
//!
//! # Read the definition from stdin
//! cat invoice.json | folio - -o invoice.pdf
//! ```
//!
//! Set `RUST_LOG=debug` to see binding and pagination decisions.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use folio::error::ReportError;
use folio::Report;

/// Folio - render banded reports to PDF
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Definition file (.json or .xml), or `-` for stdin
    input: PathBuf,

    /// Definition format; guessed from the file extension when omitted
    #[arg(long, value_enum)]
    format: Option<Format>,

    /// Where to write the PDF
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Also write the definition as XML
    #[arg(long, value_name = "FILE")]
    xml: Option<PathBuf>,

    /// Also write the definition as JSON
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,

    /// Also write the PDF as a base64 data URL
    #[arg(long, value_name = "FILE")]
    data_url: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Xml,
}

impl Format {
    fn detect(path: &Path, content: &str) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xml") => Format::Xml,
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ if content.trim_start().starts_with('<') => Format::Xml,
            _ => Format::Json,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("nothing to do: pass -o, --xml, --json or --data-url")]
    NoOutput,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("✗ {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.output.is_none() && cli.xml.is_none() && cli.json.is_none() && cli.data_url.is_none() {
        return Err(CliError::NoOutput);
    }

    let input = read_input(&cli.input)?;
    let format = cli
        .format
        .unwrap_or_else(|| Format::detect(&cli.input, &input));
    log::debug!("reading {} as {format:?}", cli.input.display());
    let report = match format {
        Format::Json => Report::from_json(&input)?,
        Format::Xml => Report::from_xml(&input)?,
    };

    if let Some(path) = &cli.xml {
        write_output(path, report.to_xml()?.as_bytes())?;
    }
    if let Some(path) = &cli.json {
        write_output(path, report.to_json()?.as_bytes())?;
    }
    if cli.output.is_none() && cli.data_url.is_none() {
        return Ok(());
    }

    let pdf = report.to_pdf()?;
    if let Some(path) = &cli.output {
        write_output(path, &pdf)?;
    }
    if let Some(path) = &cli.data_url {
        let name = cli
            .output
            .as_deref()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
            .unwrap_or("report.pdf");
        let url = folio::codec::data_url::encode(&pdf, name);
        write_output(path, url.as_bytes())?;
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<String, CliError> {
    let io_error = |source| CliError::Io {
        path: path.to_path_buf(),
        source,
    };
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).map_err(io_error)?;
        Ok(buf)
    } else {
        fs::read_to_string(path).map_err(io_error)
    }
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<(), CliError> {
    fs::write(path, bytes).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    eprintln!("✓ Written {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
