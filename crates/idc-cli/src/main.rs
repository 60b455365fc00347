mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use idc_core::state::StartMode;
use idc_core::{AppContext, BuildOptions, LifecycleCommand};
use idc_runtime::LifecycleError;
use tracing::warn;

#[derive(Parser)]
#[command(name = "idc", about = "Build and run applications in local dev containers")]
#[command(version)]
struct Cli {
    /// Answer yes to every cleanup confirmation
    #[arg(long, short = 'y', global = true)]
    yes: bool,

    /// Application directory (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    app_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the application in development mode from now on
    Dev,
    /// Start the application in production mode from now on
    Prod,
    /// Build the image if needed, start the container and build the application
    Build {
        /// Full clean build of the application
        #[arg(long)]
        clean: bool,
        /// Build with the production profile
        #[arg(long)]
        prod: bool,
        /// Extra arguments handed to the application build
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        profile_args: Vec<String>,
    },
    /// Start the application
    Start,
    /// Start the application with the debugger attached
    Debug,
    /// Stop the application
    Stop,
    /// Clean the application's build output
    Clean,
    /// Follow the application log
    Tail,
    /// Show the stored state and runtime status of the application
    StatusTracker {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Open a shell in the container (not supported)
    Shell,
    /// Tear down the container and image; the next build recreates them
    ContainerRefresh,
    /// Remove the container and image and forget the application
    ContainerRemove,
    /// Remove every idc container and image on this machine
    SystemCleanup,
    /// Store a setting (KEY=VALUE; a value of `null` removes it)
    Set {
        /// root-password, debug-port or workspace-origin
        key_value: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            warn!(error = %e, "ignoring unreadable .env file");
        }
    }

    let cli = Cli::parse_from(normalize_args(std::env::args()));

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Shell = cli.command {
        commands::shell();
        return Ok(());
    }

    let app_dir = match cli.app_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let ctx = AppContext::load(&app_dir, env_lookup)?;

    let command = match cli.command {
        Commands::Dev => return commands::set_mode(&ctx, StartMode::Dev),
        Commands::Prod => return commands::set_mode(&ctx, StartMode::Prod),
        Commands::Set { key_value } => return commands::set(&ctx, &key_value),
        Commands::StatusTracker { json } => return commands::status_tracker(ctx, json).await,
        Commands::Shell => return Ok(()),
        Commands::Build {
            clean,
            prod,
            profile_args,
        } => LifecycleCommand::Build(BuildOptions {
            clean,
            production: prod,
            profile_args,
        }),
        Commands::Start => LifecycleCommand::Start,
        Commands::Debug => LifecycleCommand::Debug,
        Commands::Stop => LifecycleCommand::Stop,
        Commands::Clean => LifecycleCommand::Clean,
        Commands::Tail => LifecycleCommand::Tail,
        Commands::ContainerRefresh => LifecycleCommand::ContainerRefresh,
        Commands::ContainerRemove => LifecycleCommand::ContainerRemove,
        Commands::SystemCleanup => LifecycleCommand::SystemCleanup,
    };

    commands::lifecycle(ctx, command, cli.yes).await
}

fn env_lookup(key: &str) -> Option<String> {
    // arch-lint: allow(no-silent-result-drop) reason="an unset or non-UTF-8 variable is treated as no override"
    std::env::var(key).ok()
}

/// Lowercase the subcommand token so `idc Build` and `idc BUILD` work.
fn normalize_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out = Vec::new();
    let mut found = false;
    let mut takes_value = false;

    for (i, arg) in args.into_iter().enumerate() {
        if i == 0 || found {
            out.push(arg);
            continue;
        }
        if takes_value {
            takes_value = false;
            out.push(arg);
            continue;
        }
        if arg.starts_with('-') {
            takes_value = arg == "--app-dir";
            out.push(arg);
            continue;
        }
        found = true;
        out.push(arg.to_lowercase());
    }
    out
}

fn exit_code(err: &anyhow::Error) -> u8 {
    let code = if let Some(e) = err.downcast_ref::<LifecycleError>() {
        e.exit_code()
    } else if let Some(e) = err.downcast_ref::<idc_core::Error>() {
        if e.is_configuration() { 2 } else { 1 }
    } else {
        1
    };
    u8::try_from(code).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn normalize_lowercases_subcommand_only() {
        assert_eq!(
            normalize_args(args(&["idc", "BUILD", "--clean", "-PMyProfile"])),
            args(&["idc", "build", "--clean", "-PMyProfile"])
        );
    }

    #[test]
    fn normalize_skips_global_flags_and_their_values() {
        assert_eq!(
            normalize_args(args(&["idc", "--yes", "--app-dir", "/Work/App", "Container-Remove"])),
            args(&["idc", "--yes", "--app-dir", "/Work/App", "container-remove"])
        );
    }

    #[test]
    fn normalize_keeps_set_values() {
        assert_eq!(
            normalize_args(args(&["idc", "Set", "workspace-origin=/Home/Me"])),
            args(&["idc", "set", "workspace-origin=/Home/Me"])
        );
    }

    #[test]
    fn exit_code_follows_error_category() {
        let err = anyhow::Error::new(LifecycleError::MissingBuildDescriptor(PathBuf::from(
            "pom.xml",
        )));
        assert_eq!(exit_code(&err), 2);

        let err = anyhow::Error::new(idc_core::Error::InvalidSetting {
            name: "IDC_KUBE",
            value: "maybe".to_owned(),
            reason: "expected a boolean",
        });
        assert_eq!(exit_code(&err), 2);

        assert_eq!(exit_code(&anyhow::anyhow!("anything else")), 1);
    }
}
