mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "avfifo", version, about = "SPSC media message fifo CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stream_subcommand() {
        let cli = Cli::try_parse_from([
            "avfifo",
            "stream",
            "--frames",
            "10",
            "--frame-size",
            "512",
        ])
        .expect("stream args should parse");

        assert!(matches!(cli.command, Command::Stream(_)));
    }

    #[test]
    fn parses_bench_with_capacity() {
        let cli = Cli::try_parse_from(["avfifo", "bench", "--capacity", "65536"])
            .expect("bench args should parse");
        assert!(matches!(cli.command, Command::Bench(_)));
    }

    #[test]
    fn rejects_unknown_log_level() {
        Cli::try_parse_from(["avfifo", "--log-level", "loud", "version"])
            .expect_err("bad level should fail");
    }
}
