mod commands;
mod settings;

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use flag_registry::{Category, FileStore, FlagRegistry};
use settings::{FileSettings, Settings};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let id = || Arg::new("id").required(true).help("Flag id");

    Command::new("flagctl")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Inspect and manage the feature-flag registry")
        .subcommand_required(true)
        .arg(
            Arg::new("dir")
                .long("dir")
                .global(true)
                .env("FLAGCTL_DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Directory of the persisted flag snapshot"),
        )
        .arg(
            Arg::new("session-dir")
                .long("session-dir")
                .global(true)
                .env("FLAGCTL_SESSION_DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Directory of the session id and group"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML settings file"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug logging"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("list").about("List flags").arg(
                Arg::new("category")
                    .long("category")
                    .value_parser(|s: &str| s.parse::<Category>().map_err(|e| e.to_string()))
                    .help("Only flags in this category"),
            ),
        )
        .subcommand(Command::new("show").about("Show one flag").arg(id()))
        .subcommand(Command::new("eval").about("Evaluate a flag for this session").arg(id()))
        .subcommand(Command::new("enable").about("Enable a flag").arg(id()))
        .subcommand(Command::new("disable").about("Disable a flag").arg(id()))
        .subcommand(Command::new("toggle").about("Toggle a flag").arg(id()))
        .subcommand(
            Command::new("export").about("Export all flags as JSON").arg(
                Arg::new("out")
                    .long("out")
                    .value_parser(value_parser!(PathBuf))
                    .help("Write to file instead of stdout"),
            ),
        )
        .subcommand(
            Command::new("import").about("Import flags from an export file").arg(
                Arg::new("file")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
            ),
        )
        .subcommand(Command::new("reset").about("Reset all flags to defaults"))
        .subcommand(Command::new("validate").about("Validate the catalog"))
        .subcommand(Command::new("summary").about("Show flag counts for this session"))
        .subcommand(
            Command::new("simulate")
                .about("Simulate a flag's rollout over random sessions")
                .arg(id())
                .arg(
                    Arg::new("sessions")
                        .long("sessions")
                        .default_value("1000")
                        .value_parser(value_parser!(usize))
                        .help("Number of sessions to simulate"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                ),
        )
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn open_registry(matches: &ArgMatches) -> anyhow::Result<FlagRegistry> {
    let file = matches
        .get_one::<PathBuf>("config")
        .map(|path| FileSettings::load(path))
        .transpose()?;
    let settings = Settings::resolve(
        file,
        matches.get_one::<PathBuf>("dir").cloned(),
        matches.get_one::<PathBuf>("session-dir").cloned(),
    );
    tracing::debug!(?settings, "opening registry");

    Ok(FlagRegistry::builder()
        .config(settings.registry)
        .local_store(FileStore::new(settings.dir))
        .session_store(FileStore::new(settings.session_dir))
        .build())
}

fn id_arg(args: &ArgMatches) -> anyhow::Result<&str> {
    args.get_one::<String>("id")
        .map(String::as_str)
        .context("missing flag id")
}

fn run(matches: &ArgMatches) -> anyhow::Result<bool> {
    let mut registry = open_registry(matches)?;
    let stdout = std::io::stdout();
    let out = &mut stdout.lock();

    match matches.subcommand() {
        Some(("list", args)) => {
            commands::list(&registry, args.get_one::<Category>("category").copied(), out)
        }
        Some(("show", args)) => commands::show(&registry, id_arg(args)?, out),
        Some(("eval", args)) => commands::eval(&registry, id_arg(args)?, out),
        Some(("enable", args)) => commands::set_state(&mut registry, id_arg(args)?, true, out),
        Some(("disable", args)) => commands::set_state(&mut registry, id_arg(args)?, false, out),
        Some(("toggle", args)) => commands::toggle(&mut registry, id_arg(args)?, out),
        Some(("export", args)) => commands::export(
            &registry,
            args.get_one::<PathBuf>("out").map(PathBuf::as_path),
            out,
        ),
        Some(("import", args)) => {
            let file = args
                .get_one::<PathBuf>("file")
                .context("missing import file")?;
            commands::import(&mut registry, file, out)
        }
        Some(("reset", _)) => commands::reset(&mut registry, out),
        Some(("validate", _)) => commands::validate(&registry, out),
        Some(("summary", _)) => commands::summary(&registry, out),
        Some(("simulate", args)) => {
            let sessions = args.get_one::<usize>("sessions").copied().unwrap_or(1000);
            let seed = args.get_one::<u64>("seed").copied().unwrap_or(42);
            commands::simulate(&registry, id_arg(args)?, sessions, seed, out)
        }
        _ => Ok(false),
    }
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("verbose"), matches.get_flag("log-json"));

    match run(&matches) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn parses_category_filter() {
        let matches = cli()
            .try_get_matches_from(["flagctl", "list", "--category", "ui"])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        assert_eq!(args.get_one::<Category>("category"), Some(&Category::Ui));
    }

    #[test]
    fn run_against_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("local");
        let local_arg = local.to_string_lossy().into_owned();

        let matches = cli()
            .try_get_matches_from(["flagctl", "disable", "lazy-loading", "--dir", local_arg.as_str()])
            .unwrap();
        assert!(run(&matches).unwrap());
        assert!(local.join("feature-flags.json").exists());

        let matches = cli()
            .try_get_matches_from(["flagctl", "eval", "lazy-loading", "--dir", local_arg.as_str()])
            .unwrap();
        assert!(!run(&matches).unwrap());
    }
}
