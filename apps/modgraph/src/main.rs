use clap::Parser;
use colored::Colorize;
use log::{debug, info};
use modgraph_core::ConfigError;
use modgraph_graph::Config;
use std::ffi::OsString;
use std::io::{BufWriter, Write};
use std::process::ExitCode;
use std::time::Instant;

fn main() -> ExitCode {
    env_logger::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(usage) = err.downcast_ref::<clap::Error>() {
                // clap renders its own "error:" prefix and usage hint
                let _ = usage.print();
            } else if err.downcast_ref::<ConfigError>().is_some() {
                eprintln!("{} {}", "error:".red().bold(), err);
            } else {
                eprintln!("{} {:#}", "error:".red().bold(), err);
            }
            ExitCode::FAILURE
        }
    }
}

/// `Ok(None)` when clap already printed help.
fn parse_config<I, T>(args: I) -> anyhow::Result<Option<Config>>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Config::try_parse_from(args) {
        Ok(cfg) => Ok(Some(cfg)),
        Err(err) if !err.use_stderr() => {
            err.print()?;
            Ok(None)
        }
        // A usage error is a configuration error: exit 1 rather than clap's 2
        Err(err) => Err(err.into()),
    }
}

fn run() -> anyhow::Result<()> {
    // stdio is blocked by LineWriter, use a BufWriter to reduce syscalls.
    // See https://github.com/rust-lang/rust/issues/60673
    let mut stdout = BufWriter::new(std::io::stdout());

    let Some(cfg) = parse_config(std::env::args_os())? else {
        return Ok(());
    };
    debug!("Parsed CLI arguments: {:?}", cfg);

    let start = Instant::now();
    let num_threads = rayon::current_num_threads();
    info!("Building module graph (using {} threads)", num_threads);

    let report = modgraph_graph::run_module_graph(cfg.clone())?;
    modgraph_graph::write_graph(&cfg.output, &report.graph, cfg.compact)?;

    let elapsed_ms = start.elapsed().as_millis();
    modgraph_graph::print_summary(&mut stdout, &report, &cfg.output)?;
    writeln!(
        stdout,
        "\n{} Finished in {}ms on {} files (using {} threads).",
        "●".bright_blue(),
        elapsed_ms.to_string().cyan(),
        report.files_analyzed.to_string().cyan(),
        num_threads.to_string().cyan()
    )?;
    stdout.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_root_is_a_failure() {
        let err = parse_config(["modgraph", "apps"]).unwrap_err();
        assert!(err.downcast_ref::<clap::Error>().is_some());
    }

    #[test]
    fn test_unknown_flag_is_a_failure() {
        assert!(parse_config(["modgraph", "apps", "libs", "--bogus"]).is_err());
    }

    #[test]
    fn test_help_is_not_a_failure() {
        assert!(parse_config(["modgraph", "--help"]).unwrap().is_none());
    }

    #[test]
    fn test_parses_roots() {
        let cfg = parse_config(["modgraph", "apps", "libs"]).unwrap().unwrap();
        assert_eq!(cfg.app_root, std::path::PathBuf::from("apps"));
        assert_eq!(cfg.lib_root, std::path::PathBuf::from("libs"));
    }
}
