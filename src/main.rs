use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use daily_reminder::{ReminderService, Settings};
use tokio_util::sync::CancellationToken;

/// Daily reminder scheduler.
#[derive(Parser, Debug)]
#[command(name = "daily-reminder", version, about)]
struct Cli {
    /// Defaults to `run`.
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Keep reminders armed and deliver them until Ctrl-C.
    Run,
    /// Turn the daily reminder on.
    Enable,
    /// Turn the daily reminder off.
    Disable,
    /// Change the time of day the reminder fires at.
    SetTime {
        /// Local time as HH:MM.
        #[arg(value_parser = parse_time)]
        time: TimeArg,
    },
    /// Print the stored reminder settings.
    Status,
}

/// Range checks are left to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TimeArg {
    hour: i32,
    minute: i32,
}

fn parse_time(value: &str) -> Result<TimeArg, String> {
    let (hour, minute) = value
        .split_once(':')
        .ok_or_else(|| format!("expected HH:MM, got {value}"))?;

    Ok(TimeArg {
        hour: hour.trim().parse().map_err(|e| format!("invalid hour: {e}"))?,
        minute: minute
            .trim()
            .parse()
            .map_err(|e| format!("invalid minute: {e}"))?,
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    pretty_env_logger::init();

    let cli = Cli::parse();

    match run(cli.command.unwrap_or(Command::Run)).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> anyhow::Result<ExitCode> {
    let settings = Settings::load().context("Could not load settings")?;
    let (service, fired) = ReminderService::from_settings(&settings)?;

    let scheduler = service.scheduler();
    match command {
        Command::Run => {
            // Timers do not outlive the process, so every start is a boot.
            service.on_device_boot();

            let shutdown = CancellationToken::new();
            let ctrl_c_token = shutdown.clone();
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    log::error!("Could not listen for Ctrl-C: {}", e);
                }
                ctrl_c_token.cancel();
            });

            log::info!("Reminder service started");
            service.run(fired, shutdown).await;
            Ok(ExitCode::SUCCESS)
        }
        Command::Enable => {
            if scheduler.set_enabled(true) {
                println!(
                    "Reminders enabled at {}; takes effect when the service (re)starts",
                    scheduler.config().fire_at
                );
                Ok(ExitCode::SUCCESS)
            } else {
                println!("Notifications are not permitted; grant permission and try again");
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Disable => {
            if scheduler.set_enabled(false) {
                println!("Reminders disabled");
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Command::SetTime { time } => {
            scheduler.set_time(time.hour, time.minute)?;
            println!("Reminder time set to {}", scheduler.config().fire_at);
            Ok(ExitCode::SUCCESS)
        }
        Command::Status => {
            let config = scheduler.config();
            println!("enabled: {}\ntime: {}", config.enabled, config.fire_at);
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_runs_the_service() {
        let cli = Cli::try_parse_from(["daily-reminder"]).unwrap();

        assert_eq!(cli.command, None);
    }

    #[test]
    fn set_time_is_parsed_without_range_checks() {
        let cli = Cli::try_parse_from(["daily-reminder", "set-time", "24:00"]).unwrap();

        assert_eq!(
            cli.command,
            Some(Command::SetTime {
                time: TimeArg {
                    hour: 24,
                    minute: 0
                }
            })
        );
        assert!(Cli::try_parse_from(["daily-reminder", "set-time", "0930"]).is_err());
        assert!(Cli::try_parse_from(["daily-reminder", "set-time"]).is_err());
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(Cli::try_parse_from(["daily-reminder", "snooze"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;

        Cli::command().debug_assert();
    }
}
