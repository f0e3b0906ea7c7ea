// ABOUTME: Command-line front end: one message in, a rendered report or one diagnostic line out.
// ABOUTME: Flags mirror the web form (-m message, -i framing, -t/-l private sub-structures).

use clap::{Parser, ValueEnum};
use emv_parser::{execute, DecodeRequest, Mode, OutputFormat};
use log::LevelFilter;
use std::io::{self, IsTerminal, Read};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "emv_parser")]
#[command(about = "Decode EMV BER-TLV and ISO 8583 messages given as hex")]
#[command(version)]
struct Cli {
    /// Message as hex; read from stdin when omitted
    #[arg(short = 'm', long = "message")]
    message: Option<String>,

    /// Strip the 2-byte length prefix and 5-byte header
    #[arg(short = 'i', long = "include-header-and-length")]
    include_header_and_length: bool,

    /// Decode TLV private fields (ICC data)
    #[arg(short = 't', long = "parse-private-tlv")]
    parse_private_tlv: bool,

    /// Decode LTV private fields
    #[arg(short = 'l', long = "parse-private-ltv")]
    parse_private_ltv: bool,

    /// Message family of the body
    #[arg(long, value_enum, default_value_t = CliMode::Iso8583)]
    mode: CliMode,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = CliFormat::Text)]
    format: CliFormat,

    /// Log to stderr; repeat for more detail
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliMode {
    Emv,
    Iso8583,
}

impl From<CliMode> for Mode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Emv => Mode::Emv,
            CliMode::Iso8583 => Mode::Iso8583,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliFormat {
    Text,
    Json,
}

impl From<CliFormat> for OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Text => OutputFormat::Text,
            CliFormat::Json => OutputFormat::Json,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Off,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        3 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();
}

fn read_message() -> io::Result<String> {
    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        eprintln!("Enter message (hex), then Ctrl-D:");
    }
    let mut message = String::new();
    stdin.read_to_string(&mut message)?;
    Ok(message)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let message = match cli.message {
        Some(message) => message,
        None => match read_message() {
            Ok(message) => message,
            Err(err) => {
                eprintln!("{}", emv_parser::Error::from(err));
                return ExitCode::FAILURE;
            }
        },
    };

    let request = DecodeRequest {
        message,
        include_header_and_length: cli.include_header_and_length,
        parse_private_tlv: cli.parse_private_tlv,
        parse_private_ltv: cli.parse_private_ltv,
        mode: cli.mode.into(),
        format: cli.format.into(),
    };

    let outcome = execute(&request);
    if outcome.success {
        print!("{}", outcome.text);
        if !outcome.text.ends_with('\n') {
            println!();
        }
    } else {
        eprintln!("{}", outcome.text);
    }
    ExitCode::from(outcome.exit_code())
}
