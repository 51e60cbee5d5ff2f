//! texmark CLI - LaTeX subset to Markdown with math spans

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use log::{debug, info};
#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::io::{self, IsTerminal, Read, Write};
#[cfg(feature = "cli")]
use texmark::{
    transpile_with_diagnostics, utils::CliDiagnostic, ConversionError, ConversionResult,
    TranspileOptions, TranspileResult,
};

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "texmark")]
#[command(version)]
#[command(about = "texmark - LaTeX subset to Markdown with math spans", long_about = None)]
struct Cli {
    /// Input file path (reads from stdin if not provided)
    input_file: Option<String>,

    /// Output file path (writes to stdout if not provided)
    #[arg(short, long)]
    output: Option<String>,

    /// Emit the short one-line preview forms
    #[arg(short, long)]
    preview: bool,

    /// JSON file with transpile options; --preview overrides its `preview` field
    #[arg(long)]
    options: Option<String>,

    /// Print conversion warnings to stderr
    #[arg(short, long)]
    diagnostics: bool,

    /// Print the full result (output, warnings, metadata, labels) as JSON
    #[arg(long)]
    json: bool,

    /// Disable colored diagnostics
    #[arg(long)]
    no_color: bool,
}

#[cfg(feature = "cli")]
fn load_options(cli: &Cli) -> ConversionResult<TranspileOptions> {
    let mut options = match cli.options {
        Some(ref path) => {
            debug!("loading options from {}", path);
            TranspileOptions::from_json(&fs::read_to_string(path)?)?
        }
        None => TranspileOptions::default(),
    };
    if cli.preview {
        options.preview = true;
    }
    Ok(options)
}

#[cfg(feature = "cli")]
fn read_input(path: Option<&str>) -> ConversionResult<String> {
    match path {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

#[cfg(feature = "cli")]
fn write_output(path: Option<&str>, content: &str) -> ConversionResult<()> {
    match path {
        Some(path) => fs::write(path, content)?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            if !content.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn print_diagnostics(result: &TranspileResult, color: bool) {
    for warning in &result.warnings {
        let diag = CliDiagnostic::from(warning.clone());
        if color {
            eprintln!("{}{}\x1b[0m", diag.color_code(), diag);
        } else {
            eprintln!("{}", diag);
        }
    }
    if result.has_warnings() {
        eprintln!("{} warning(s)", result.warnings.len());
    }
}

#[cfg(feature = "cli")]
fn run(cli: &Cli) -> ConversionResult<()> {
    let options = load_options(cli)?;
    let input = read_input(cli.input_file.as_deref())?;
    info!(
        "converting {} bytes (preview: {})",
        input.len(),
        options.preview
    );

    let result = transpile_with_diagnostics(&input, &options);

    if cli.diagnostics {
        print_diagnostics(&result, !cli.no_color && io::stderr().is_terminal());
    }

    let content = if cli.json {
        serde_json::to_string_pretty(&result)
            .map_err(|e| ConversionError::internal(format!("cannot serialize result: {}", e)))?
    } else {
        result.output
    };
    write_output(cli.output.as_deref(), &content)
}

#[cfg(feature = "cli")]
fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("texmark: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Build with --features cli");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  cargo install texmark --features cli");
    eprintln!("  texmark [OPTIONS] [INPUT_FILE]");
}
