//! CLI tool for running expect sessions against a serial console.

use anyhow::{bail, Context};
use clap::Parser;
use serialexpect::task::TaskFile;
use serialexpect::{
    open_serial, ExpectSession, LineEnding, Pattern, PatternKind, ResponseSpec, SerialTransport,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{prelude::*, EnvFilter};

const DEFAULT_DEVICE: &str = "/dev/ttyUSB0";
const DEFAULT_BAUD: u32 = 115_200;

#[derive(Parser, Debug)]
#[command(name = "serial-expect")]
#[command(author, version, about = "Send a command over a serial line and answer its prompts", long_about = None)]
struct Args {
    /// Serial device [default: /dev/ttyUSB0]
    #[arg(short, long, env = "SERIAL_EXPECT_DEVICE")]
    device: Option<String>,

    /// Baud rate [default: 115200]
    #[arg(short, long, env = "SERIAL_EXPECT_BAUD")]
    baud: Option<u32>,

    /// TOML task file; other options override its values
    #[arg(short, long)]
    task: Option<PathBuf>,

    /// Command to send before awaiting any pattern
    #[arg(short, long)]
    command: Option<String>,

    /// Expected pattern and its response, as PATTERN=RESPONSE (repeatable)
    #[arg(short, long = "respond", value_name = "PATTERN=RESPONSE", value_parser = parse_rule)]
    respond: Vec<(String, String)>,

    /// Treat --respond patterns as literal text instead of regexes
    #[arg(long)]
    exact: bool,

    /// Print each response as it is sent
    #[arg(long)]
    echo: bool,

    /// Seconds to wait for each pattern
    #[arg(long, value_name = "SECS", conflicts_with = "no_timeout")]
    timeout: Option<u64>,

    /// Wait for each pattern forever
    #[arg(long)]
    no_timeout: bool,

    /// Terminator appended to every send
    #[arg(long, value_enum)]
    line_ending: Option<LineEnding>,

    /// Remove ANSI escape sequences before matching
    #[arg(long)]
    strip_ansi: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Split `PATTERN=RESPONSE` on the first `=`.
fn parse_rule(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((pattern, _)) if pattern.is_empty() => Err("pattern must not be empty".into()),
        Some((pattern, response)) => Ok((pattern.to_owned(), response.to_owned())),
        None => Err(format!("expected PATTERN=RESPONSE, got {s:?}")),
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        1 => "debug".into(),
        _ => "trace".into(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(EnvFilter::new(filter)),
        )
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let task = args
        .task
        .as_ref()
        .map(|path| {
            TaskFile::load(path).with_context(|| format!("loading {}", path.display()))
        })
        .transpose()?;

    let command = match (args.command.clone(), &task) {
        (Some(command), _) => command,
        (None, Some(task)) => task.command.clone(),
        (None, None) => bail!("nothing to send: pass --command or --task"),
    };

    let mut responses = match &task {
        Some(task) => task.response_pairs()?,
        None => Vec::new(),
    };
    let kind = if args.exact {
        PatternKind::Exact
    } else {
        PatternKind::Regex
    };
    for (pattern, response) in &args.respond {
        let pattern = Pattern::parse(kind, pattern)
            .with_context(|| format!("invalid pattern {pattern:?}"))?;
        responses.push((pattern, ResponseSpec::from(response.as_str())));
    }

    let timeout = if args.no_timeout {
        None
    } else if let Some(secs) = args.timeout {
        Some(Duration::from_secs(secs))
    } else {
        match &task {
            Some(task) => task.timeout.as_duration(),
            None => Some(Duration::from_secs(serialexpect::DEFAULT_TIMEOUT_SECS)),
        }
    };

    let line_ending = args
        .line_ending
        .or(task.as_ref().map(|t| t.line_ending))
        .unwrap_or_default();
    let echo = args.echo || task.as_ref().is_some_and(|t| t.echo);
    let strip_ansi = args.strip_ansi || task.as_ref().is_some_and(|t| t.strip_ansi);

    let device = args
        .device
        .clone()
        .or_else(|| task.as_ref().and_then(|t| t.serial.device.clone()))
        .unwrap_or_else(|| DEFAULT_DEVICE.to_owned());
    let baud = args
        .baud
        .or(task.as_ref().and_then(|t| t.serial.baud))
        .unwrap_or(DEFAULT_BAUD);

    let mut session = ExpectSession::builder(command)
        .responses(responses)
        .timeout_opt(timeout)
        .line_ending(line_ending)
        .strip_ansi(strip_ansi)
        .echo(echo)
        .echo_sink(|key: &str, response: &str| println!("[{key}] -> {response}"))
        .build()
        .context("invalid session configuration")?;

    let mut port =
        open_serial(&device, baud).with_context(|| format!("opening {device} at {baud} baud"))?;
    let mut transport = SerialTransport::new(port.as_mut());

    tracing::info!(device, baud, steps = session.responses().len(), "starting session");
    let summary = session
        .run(&mut transport)
        .with_context(|| format!("session on {device} failed"))?;

    tracing::info!(
        matches = summary.matches.len(),
        elapsed = ?summary.elapsed,
        "session completed"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rule_splits_on_first_equals() {
        assert_eq!(
            parse_rule("a=b=c").unwrap(),
            ("a".to_string(), "b=c".to_string())
        );
        assert_eq!(parse_rule("login:=").unwrap(), ("login:".into(), "".into()));
    }

    #[test]
    fn test_parse_rule_rejects_malformed() {
        assert!(parse_rule("no-separator").is_err());
        assert!(parse_rule("=x").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "serial-expect",
            "--command",
            "reboot",
            "--respond",
            "login:=root",
            "-r",
            "Password:=toor",
            "--no-timeout",
            "--line-ending",
            "crlf",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.command.as_deref(), Some("reboot"));
        assert_eq!(args.respond.len(), 2);
        assert!(args.no_timeout);
        assert_eq!(args.line_ending, Some(LineEnding::CrLf));
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_timeout_conflicts_with_no_timeout() {
        let err = Args::try_parse_from(["serial-expect", "--timeout", "5", "--no-timeout"]);
        assert!(err.is_err());
    }
}
