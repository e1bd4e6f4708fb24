//! trstatement - CLI tool for converting Trade Republic exports into a normalized statement.

use clap::Parser;
use std::fs::File;
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;
use trstatement::{
    output::{write_statement, OutputFormat},
    InputFormat, PluginSettings, Result, Statement, TradeRepublicPlugin,
};

#[derive(Parser)]
#[command(name = "trstatement")]
#[command(about = "Convert Trade Republic CSV or JSON exports into a normalized statement", long_about = None)]
struct Cli {
    /// Input file path (or stdin if not provided; then --input-format is required)
    #[arg(short, long)]
    input: Option<String>,

    /// Input format (csv, json); detected from the file extension when omitted
    #[arg(long = "input-format")]
    input_format: Option<String>,

    /// Output format (csv, json)
    #[arg(long = "output-format", default_value = "csv")]
    output_format: String,

    /// Output file path (or stdout if not provided)
    #[arg(short, long)]
    output: Option<String>,

    /// Account currency
    #[arg(long, default_value = "EUR")]
    currency: String,

    /// Account identification
    #[arg(long)]
    account: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let output_format = cli.output_format.parse::<OutputFormat>()?;
    let input_format = cli
        .input_format
        .as_deref()
        .map(str::parse::<InputFormat>)
        .transpose()?;

    let plugin = TradeRepublicPlugin::new(PluginSettings {
        currency: cli.currency,
        account_id: cli.account,
        ..PluginSettings::default()
    });

    let statement = read_statement(&plugin, cli.input.as_deref(), input_format)?;
    statement.validate()?;

    if let Some(ref output_path) = cli.output {
        let mut file = File::create(output_path)?;
        write_statement(&mut file, &statement, output_format)?;
        file.flush()?;
    } else {
        let mut stdout = io::stdout();
        write_statement(&mut stdout, &statement, output_format)?;
    }

    Ok(())
}

fn read_statement(
    plugin: &TradeRepublicPlugin,
    input: Option<&str>,
    format: Option<InputFormat>,
) -> Result<Statement> {
    match (input, format) {
        (Some(path), None) => plugin.get_parser(path)?.parse(),
        (Some(path), Some(format)) => plugin.parser_for(io::BufReader::new(File::open(path)?), format).parse(),
        (None, Some(format)) => plugin.parser_for(io::stdin().lock(), format).parse(),
        (None, None) => Err(trstatement::Error::InvalidFormat(
            "reading stdin requires --input-format".to_string(),
        )),
    }
}
