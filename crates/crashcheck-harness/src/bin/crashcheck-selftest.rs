//! CLI entrypoint exercising the crashcheck harness end to end.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use crashcheck_core::{ColorMode, SignalPolicy};
use crashcheck_harness::{
    Harness, HarnessConfig, HarnessError, Session, Severity, SignalKind, Stream, TestFn,
    TestResult, check, check_eq, check_false, check_lt, check_not_null,
};

/// Printed by the test that must never run after a fatal check.
const UNREACHED_MARKER: &str = "second test ran";

/// Self-test driver for the crashcheck harness.
#[derive(Debug, Parser)]
#[command(name = "crashcheck-selftest")]
#[command(about = "Runs canned suites against the crashcheck harness")]
struct Cli {
    /// Write a JSONL event log to this path.
    #[arg(long, global = true)]
    log: Option<PathBuf>,
    /// Disable ANSI colors.
    #[arg(long, global = true)]
    no_color: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Three tests: all checks pass, one check fails, no checks.
    Suite,
    /// A fatal check fails in the first of two tests.
    Fatal,
    /// Start a test and raise a fatal signal inside it.
    Crash {
        /// Signal to raise (e.g. SIGSEGV, SIG_SEGMFAULT, 11).
        #[arg(long)]
        signal: SignalKind,
    },
    /// Write around a muted stream.
    Mute {
        /// Mute stderr instead of stdout.
        #[arg(long)]
        stderr: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("crashcheck-selftest: {err}");
            std::process::exit(2);
        }
    }
}

fn run(cli: Cli) -> Result<i32, HarnessError> {
    let mut config = HarnessConfig::from_env();
    if cli.log.is_some() {
        config.log_path = cli.log;
    }
    if cli.no_color {
        config.color = ColorMode::Never;
    }

    match cli.command {
        Command::Suite => {
            let tests: [TestFn; 3] = [two_passing_checks, one_failing_check, no_checks];
            Ok(Harness::with_config(config)?.run(tests))
        }
        Command::Fatal => {
            let tests: [TestFn; 2] = [fatal_check, unreached];
            Ok(Harness::with_config(config)?.run(tests))
        }
        Command::Crash { signal } => {
            config.signals = SignalPolicy::CatchAll;
            let harness = Harness::with_config(config)?;
            Ok(harness.run([move |t: &mut Session| crash(t, signal)]))
        }
        Command::Mute { stderr } => {
            config.signals = SignalPolicy::None;
            let stream = if stderr { Stream::Stderr } else { Stream::Stdout };
            let mut harness = Harness::with_config(config)?;
            mute_round_trip(harness.session(), stream)?;
            Ok(0)
        }
    }
}

fn two_passing_checks(t: &mut Session) -> TestResult {
    t.start("two passing checks");
    check_eq!(t, 1 + 1, 2, Severity::NonFatal)?;
    check_lt!(t, 1, 2, Severity::NonFatal)?;
    t.end();
    Ok(())
}

fn one_failing_check(t: &mut Session) -> TestResult {
    t.start("one failing check");
    check_false!(t, 2 > 1, Severity::NonFatal, "2 > 1 should not hold")?;
    t.end();
    Ok(())
}

fn no_checks(t: &mut Session) -> TestResult {
    t.start("no checks");
    t.end();
    Ok(())
}

fn fatal_check(t: &mut Session) -> TestResult {
    t.start("fatal check");
    check_not_null!(t, None::<u8>, Severity::Fatal, "value must be present")?;
    t.end();
    Ok(())
}

fn unreached(t: &mut Session) -> TestResult {
    println!("{UNREACHED_MARKER}");
    t.start("unreached");
    t.end();
    Ok(())
}

fn crash(t: &mut Session, signal: SignalKind) -> TestResult {
    t.start(format!("crash on {}", signal.posix_name()));
    check!(t, true, Severity::NonFatal)?;
    check!(t, false, Severity::NonFatal, "deliberate failure before {signal}")?;
    if let Err(err) = crashcheck_abi::raise(signal) {
        check!(t, false, Severity::Fatal, "{err}")?;
    }
    t.end();
    Ok(())
}

fn mute_round_trip(t: &mut Session, stream: Stream) -> Result<(), HarnessError> {
    emit(stream, "before");
    t.mute(stream)?;
    t.mute(stream)?;
    emit(stream, "hidden");
    t.unmute(stream)?;
    t.unmute(stream)?;
    emit(stream, "after");
    Ok(())
}

fn emit(stream: Stream, line: &str) {
    let _ = match stream {
        Stream::Stdout => {
            let mut out = std::io::stdout();
            writeln!(out, "{line}").and_then(|()| out.flush())
        }
        Stream::Stderr => writeln!(std::io::stderr(), "{line}"),
    };
}
