use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};

use fpspack::commands;
use fpspack::{Panel, Settings, TargetMode};

fn ids_arg(help: &'static str) -> Arg {
    Arg::new("ids")
        .help(help)
        .required(true)
        .num_args(1..)
        .index(1)
}

fn categories_arg() -> Arg {
    Arg::new("categories")
        .help("Cleanup categories (system_temp, app_temp, browser_cache, system_cache, system_logs, recycle_bin)")
        .num_args(1..)
        .index(1)
}

fn yes_arg() -> Arg {
    Arg::new("yes")
        .short('y')
        .long("yes")
        .help("Do not ask for confirmation")
        .action(ArgAction::SetTrue)
}

fn cli() -> Command {
    Command::new("fpspack")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Windows performance tuning: live metrics, reversible tweaks and safe cleanup")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("simulate")
                .long("simulate")
                .global(true)
                .help("Apply tweaks to simulated targets instead of the real system")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("monitor")
                .about("Show live CPU, memory and disk usage")
                .arg(
                    Arg::new("interval")
                        .short('i')
                        .long("interval")
                        .value_name("MS")
                        .help("Sampling interval in milliseconds (default from settings)")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("count")
                        .short('n')
                        .long("count")
                        .help("Stop after this many samples")
                        .value_parser(clap::value_parser!(usize)),
                ),
        )
        .subcommand(
            Command::new("tweaks")
                .about("List, apply and revert system tweaks")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("list").about("List available tweaks").arg(
                        Arg::new("category")
                            .short('c')
                            .long("category")
                            .help("Only show one category (services, network, gaming, visual, privacy)"),
                    ),
                )
                .subcommand(Command::new("apply").about("Apply tweaks").arg(ids_arg("Tweak ids to apply")))
                .subcommand(Command::new("revert").about("Revert tweaks").arg(ids_arg("Tweak ids to revert")))
                .subcommand(
                    Command::new("status")
                        .about("Show whether tweaks are in effect")
                        .arg(Arg::new("id").help("Tweak id (all tweaks when omitted)").index(1)),
                ),
        )
        .subcommand(
            Command::new("backups")
                .about("Inspect recorded previous values")
                .subcommand(Command::new("list").about("List backup records"))
                .subcommand(
                    Command::new("purge")
                        .about("Delete a backup record")
                        .arg(Arg::new("id").help("Tweak id").required(true).index(1))
                        .arg(yes_arg()),
                ),
        )
        .subcommand(
            Command::new("clean")
                .about("Remove temporary and cache files")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("plan")
                        .about("Show what would be removed")
                        .arg(categories_arg())
                        .arg(min_age_arg()),
                )
                .subcommand(
                    Command::new("run")
                        .about("Remove files")
                        .arg(categories_arg())
                        .arg(min_age_arg())
                        .arg(yes_arg()),
                ),
        )
        .subcommand(
            Command::new("turbo")
                .about("Apply the curated tweak set and run the default cleanups")
                .arg(yes_arg())
                .arg(
                    Arg::new("confirm")
                        .long("confirm")
                        .value_name("TWEAK")
                        .help("Allow a tweak above the auto-apply risk ceiling")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("categories")
                        .long("clean")
                        .value_name("CATEGORY")
                        .num_args(1..)
                        .help("Cleanup categories to run instead of the defaults"),
                )
                .arg(
                    Arg::new("no-cleanup")
                        .long("no-cleanup")
                        .help("Only apply tweaks")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("categories"),
                )
                .subcommand(Command::new("deactivate").about("Revert the tweaks of the last Turbo session")),
        )
        .subcommand(
            Command::new("config")
                .about("Show or reset settings")
                .subcommand(Command::new("show").about("Print the effective settings"))
                .subcommand(Command::new("path").about("Print the settings and data locations"))
                .subcommand(Command::new("reset").about("Restore default settings").arg(yes_arg())),
        )
        .subcommand(Command::new("version").about("Shows version information"))
}

fn min_age_arg() -> Arg {
    Arg::new("min-age")
        .long("min-age")
        .value_name("HOURS")
        .help("Only remove files older than this many hours")
        .value_parser(clap::value_parser!(u64))
}

fn open_panel(matches: &clap::ArgMatches) -> Result<Panel> {
    let mode = if matches.get_flag("simulate") {
        TargetMode::Simulated
    } else {
        TargetMode::System
    };
    Panel::open(Settings::load(), mode).context("Failed to initialise fpspack")
}

#[tokio::main]
async fn main() -> Result<()> {
    fpspack::init_logging();
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("version", _)) => commands::version::execute(),
        Some(("config", sub)) => commands::config::execute(sub),
        Some(("monitor", sub)) => commands::monitor::execute(&open_panel(&matches)?, sub).await,
        Some(("tweaks", sub)) => commands::tweaks::execute(&open_panel(&matches)?, sub).await,
        Some(("backups", sub)) => commands::backups::execute(&open_panel(&matches)?, sub),
        Some(("clean", sub)) => commands::clean::execute(&open_panel(&matches)?, sub).await,
        Some(("turbo", sub)) => commands::turbo::execute(&open_panel(&matches)?, sub).await,
        _ => Ok(()),
    }
}
