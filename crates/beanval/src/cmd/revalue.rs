//! Implementation of the `beanval` command.

use anyhow::{Context, Result};
use beanval_core::{sort_directives, BookingMethod, Directive};
use beanval_plugin::{
    valuation, CommodityAnchor, PluginInput, PluginOptions, PluginOutput, DEFAULT_PRECISION,
};
use clap::{Parser, ValueEnum};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Output format for the resulting ledger.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Directives in ledger syntax, followed by diagnostics
    #[default]
    Text,
    /// A single JSON object with `directives` and `errors`
    Json,
}

/// Where auto-defined commodities are dated.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum Anchor {
    /// The last input directive
    #[default]
    Last,
    /// The first directive that used the unit
    FirstUse,
}

impl From<Anchor> for CommodityAnchor {
    fn from(anchor: Anchor) -> Self {
        match anchor {
            Anchor::Last => Self::LastDirective,
            Anchor::FirstUse => Self::FirstUse,
        }
    }
}

/// Re-denominate externally valued accounts into synthetic priced units.
#[derive(Parser, Debug)]
#[command(name = "beanval", author, version, about, long_about = None)]
pub struct Args {
    /// JSON file holding the directive list
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Account mapping as a JSON object
    #[arg(short, long, value_name = "JSON")]
    pub config: Option<String>,

    /// Default booking method for rewritten transactions
    #[arg(long, value_name = "METHOD", default_value = "STRICT")]
    pub booking_method: BookingMethod,

    /// Decimal places of synthetic quantities
    #[arg(long, value_name = "N", default_value_t = DEFAULT_PRECISION)]
    pub precision: u32,

    /// Date auto-defined commodities at the last directive or at first use
    #[arg(long, value_enum, default_value = "last")]
    pub commodity_anchor: Anchor,

    /// Output format (text or json)
    #[arg(long, short = 'f', value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Keep the input order instead of sorting by date
    #[arg(long)]
    pub no_sort: bool,

    /// Show debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Do not print diagnostics (just use exit code)
    #[arg(short, long)]
    pub quiet: bool,
}

fn load(args: &Args) -> Result<Vec<Directive>> {
    let source = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let mut directives: Vec<Directive> = serde_json::from_str(&source)
        .with_context(|| format!("failed to parse directives in {}", args.file.display()))?;
    if !args.no_sort {
        sort_directives(&mut directives);
    }
    Ok(directives)
}

fn write_text<W: Write>(out: &mut W, output: &PluginOutput, quiet: bool) -> io::Result<()> {
    for (i, directive) in output.directives.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "{directive}")?;
    }

    if !quiet && !output.errors.is_empty() {
        writeln!(out)?;
        for error in &output.errors {
            writeln!(out, "error[{}]: {error}", error.kind)?;
        }
    }
    Ok(())
}

fn run(args: &Args) -> Result<ExitCode> {
    let directives = load(args)?;
    tracing::debug!(count = directives.len(), "loaded directives");

    let output = valuation(PluginInput {
        directives,
        options: PluginOptions {
            booking_method: args.booking_method,
            precision: args.precision,
            commodity_anchor: args.commodity_anchor.into(),
        },
        config: args.config.clone(),
    })
    .context("valuation pass aborted")?;

    let mut stdout = io::stdout().lock();
    match args.format {
        OutputFormat::Text => write_text(&mut stdout, &output, args.quiet)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut stdout, &output)?;
            writeln!(stdout)?;
        }
    }

    if output.errors.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}

/// Main entry point for the `beanval` command.
pub fn main() -> ExitCode {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt().with_writer(io::stderr);
    if args.verbose {
        subscriber.with_max_level(Level::DEBUG).init();
    } else {
        subscriber
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .init();
    }

    match run(&args) {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beanval_core::{Amount, NaiveDate, Price};
    use beanval_plugin::{ErrorKind, ValuationError};

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["beanval", "ledger.json"]).unwrap();
        assert_eq!(args.booking_method, BookingMethod::Strict);
        assert_eq!(args.precision, 7);
        assert!(matches!(args.commodity_anchor, Anchor::Last));
        assert!(matches!(args.format, OutputFormat::Text));
        assert!(!args.no_sort);
    }

    #[test]
    fn test_args_parse_options() {
        let args = Args::try_parse_from([
            "beanval",
            "--booking-method",
            "fifo",
            "--commodity-anchor",
            "first-use",
            "--format",
            "json",
            "ledger.json",
        ])
        .unwrap();
        assert_eq!(args.booking_method, BookingMethod::Fifo);
        assert_eq!(
            CommodityAnchor::from(args.commodity_anchor),
            CommodityAnchor::FirstUse
        );
        assert!(matches!(args.format, OutputFormat::Json));
    }

    #[test]
    fn test_text_output_separates_directives_and_lists_errors() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let price = |n: i64| {
            Directive::Price(Price::new(date, "BROKERU", Amount::new(n.into(), "USD")))
        };
        let output = PluginOutput {
            directives: vec![price(1), price(2)],
            errors: vec![ValuationError::new(
                ErrorKind::Sequencing,
                "valuation of Assets:X before any balance",
                date,
                &beanval_core::Metadata::new(),
            )],
        };

        let mut buf = Vec::new();
        write_text(&mut buf, &output, false).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "2024-01-01 price BROKERU 1 USD\n\n2024-01-01 price BROKERU 2 USD\n\n\
             error[sequencing]: valuation of Assets:X before any balance (2024-01-01)\n"
        );

        let mut quiet = Vec::new();
        write_text(&mut quiet, &output, true).unwrap();
        assert!(!String::from_utf8(quiet).unwrap().contains("error["));
    }
}
