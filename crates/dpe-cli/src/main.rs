use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use dpe_artifact::{ArtifactKey, DiagramKind, Validation};
use dpe_cli::commands::{self, Applied, Flavor};
use dpe_cli::Settings;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let previous = Arg::new("previous")
        .long("previous")
        .value_parser(value_parser!(PathBuf))
        .help("Document to patch; omit to start from an empty document");
    let ops = Arg::new("ops")
        .long("ops")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("JSON file with the operations, bare list or {\"operations\": [...]}");
    let output = Arg::new("output")
        .long("output")
        .short('o')
        .value_parser(value_parser!(PathBuf))
        .help("Write the result here instead of stdout");

    Command::new("dpe")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Diagram patch engine tools")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML settings file"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("apply-context")
                .about("Apply operations to a JSON context document")
                .arg(previous.clone())
                .arg(ops.clone())
                .arg(output.clone()),
        )
        .subcommand(
            Command::new("apply-text")
                .about("Apply operations to a PlantUML description")
                .arg(previous)
                .arg(ops)
                .arg(output.clone()),
        )
        .subcommand(
            Command::new("validate")
                .about("Check a document; exits 1 when it is invalid")
                .arg(
                    Arg::new("flavor")
                        .long("flavor")
                        .required(true)
                        .value_parser(value_parser!(Flavor)),
                )
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("history")
                .about("List stored versions of one diagram")
                .arg(
                    Arg::new("store")
                        .long("store")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(Arg::new("owner").long("owner").required(true))
                .arg(Arg::new("conversation").long("conversation").required(true))
                .arg(
                    Arg::new("kind")
                        .long("kind")
                        .required(true)
                        .value_parser(value_parser!(DiagramKind)),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print full records as JSON"),
                ),
        )
        .subcommand(
            Command::new("render")
                .about("Render a PlantUML description to PNG")
                .arg(
                    Arg::new("jar")
                        .long("jar")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Path to plantuml.jar"),
                )
                .arg(
                    Arg::new("timeout")
                        .long("timeout")
                        .default_value("30")
                        .value_parser(value_parser!(u64))
                        .help("Seconds before the renderer is killed"),
                )
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(output.required(true)),
        )
}

fn init_tracing(settings: &Settings, force_json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);

    if force_json || settings.logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn path<'a>(args: &'a ArgMatches, name: &str) -> Option<&'a Path> {
    args.get_one::<PathBuf>(name).map(PathBuf::as_path)
}

fn required<'a, T: Clone + Send + Sync + 'static>(args: &'a ArgMatches, name: &str) -> Result<&'a T> {
    args.get_one::<T>(name)
        .with_context(|| format!("missing --{name}"))
}

fn emit(bytes: &[u8], output: Option<&Path>) -> Result<()> {
    use std::io::Write;
    match output {
        Some(target) => std::fs::write(target, bytes)
            .with_context(|| format!("failed to write {}", target.display())),
        None => std::io::stdout()
            .write_all(bytes)
            .context("failed to write to stdout"),
    }
}

fn emit_applied(applied: &Applied, output: Option<&Path>) -> Result<()> {
    for warning in applied.report.warnings() {
        eprintln!("warning: operation {} ({}): {}", warning.index, warning.operation, warning.outcome);
    }
    let mut text = applied.output.clone();
    if !text.ends_with('\n') {
        text.push('\n');
    }
    emit(text.as_bytes(), output)
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let settings = Settings::load(path(&matches, "config"))?;
    init_tracing(&settings, matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("apply-context", args)) => {
            let applied = commands::apply_context(
                path(args, "previous"),
                required::<PathBuf>(args, "ops")?,
                &settings.engine,
            )?;
            emit_applied(&applied, path(args, "output"))
        }
        Some(("apply-text", args)) => {
            let applied = commands::apply_text(path(args, "previous"), required::<PathBuf>(args, "ops")?)?;
            emit_applied(&applied, path(args, "output"))
        }
        Some(("validate", args)) => {
            let flavor = *required::<Flavor>(args, "flavor")?;
            match commands::validate(flavor, required::<PathBuf>(args, "file")?)? {
                Validation::Passed => {
                    println!("valid");
                    Ok(())
                }
                Validation::Failed(reason) => {
                    println!("invalid: {reason}");
                    std::process::exit(1);
                }
            }
        }
        Some(("history", args)) => {
            let key = ArtifactKey::new(
                required::<String>(args, "owner")?.as_str(),
                required::<String>(args, "conversation")?.as_str(),
                *required::<DiagramKind>(args, "kind")?,
            );
            let listing = commands::history(
                required::<PathBuf>(args, "store")?,
                &key,
                args.get_flag("json"),
            )?;
            print!("{listing}");
            Ok(())
        }
        Some(("render", args)) => {
            let timeout = Duration::from_secs(*required::<u64>(args, "timeout")?);
            let png = commands::render(
                required::<PathBuf>(args, "jar")?,
                required::<PathBuf>(args, "file")?,
                timeout,
            )
            .await?;
            emit(&png, path(args, "output"))
        }
        _ => Ok(()),
    }
}
