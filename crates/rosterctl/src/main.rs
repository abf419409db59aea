//! rosterctl - command-line client for rosterd
//!
//! Speaks the same NDJSON protocol as the chat front end. Every ledger
//! command is sent on behalf of the member given with `--as`, carrying the
//! roles given with `--role`.

mod render;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use roster_api::{Caller, Command, ResponseResult};
use roster_ipc::IpcClient;
use roster_util::{RoleId, UserId, default_socket_path};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "rosterctl")]
#[command(about = "Talk to the rosterd duty ledger")]
#[command(version)]
struct Cli {
    /// rosterd socket
    #[arg(short, long, env = "ROSTER_SOCKET", default_value_os_t = default_socket_path())]
    socket: PathBuf,

    /// Member the command is issued as
    #[arg(long = "as", value_name = "USER_ID", env = "ROSTER_AS")]
    as_user: Option<String>,

    /// Role held by that member (repeatable)
    #[arg(long = "role", value_name = "ROLE_ID")]
    roles: Vec<String>,

    /// Print raw JSON instead of text
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Go on duty (yourself, or another member as admin)
    Start { user: Option<String> },

    /// Go off duty
    Stop { user: Option<String> },

    /// Duty state and total time
    Status { user: Option<String> },

    /// Total recorded duty time
    Total { user: Option<String> },

    /// Most recent shifts
    History {
        user: Option<String>,
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Members ranked by duty time
    Leaderboard {
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Everyone on duty right now
    Active,

    /// Credit a member with extra minutes
    AddTime { user: String, minutes: i64 },

    /// Take minutes off a member's most recent long-enough shift
    RemoveTime { user: String, minutes: i64 },

    /// Erase all shift data
    Wipe {
        /// Confirm the wipe; nothing happens without it
        #[arg(long)]
        yes: bool,
    },

    /// Print ledger events as they happen
    Watch,

    /// Daemon health
    Health,

    /// Check the daemon is answering
    Ping,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("rosterctl: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut client = IpcClient::connect(&cli.socket)
        .await
        .with_context(|| format!("Failed to connect to rosterd at {:?}", cli.socket))?;

    if let Commands::Watch = cli.command {
        let mut events = client.subscribe().await.context("Subscription refused")?;
        loop {
            let event = events.next().await.context("Event stream ended")?;
            if cli.json {
                println!("{}", serde_json::to_string(&event)?);
            } else {
                println!(
                    "[{}] {}",
                    roster_util::format_datetime_full(&event.timestamp),
                    render::event(&event.payload)
                );
            }
        }
    }

    let caller = caller(cli.as_user.as_deref(), &cli.roles)?;
    let command = build_command(cli.command, caller.as_ref())?;

    let response = match &caller {
        Some(caller) => client.send_as(caller, command).await?,
        None => client.send(command).await?,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    }

    match response.result {
        ResponseResult::Ok(payload) => {
            if !cli.json {
                println!("{}", render::response(&payload));
            }
            Ok(ExitCode::SUCCESS)
        }
        ResponseResult::Err(e) => {
            if !cli.json {
                eprintln!("{}", e.message);
            }
            Ok(ExitCode::from(1))
        }
    }
}

fn caller(as_user: Option<&str>, roles: &[String]) -> Result<Option<Caller>> {
    let Some(user) = as_user else {
        if !roles.is_empty() {
            bail!("--role needs --as");
        }
        return Ok(None);
    };

    let user_id = UserId::parse(user)?;
    let roles = roles
        .iter()
        .map(|r| RoleId::parse(r))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(Caller::new(user_id).with_roles(roles)))
}

/// Resolve a target member, defaulting to the caller
fn target(user: Option<String>, caller: Option<&Caller>) -> Result<UserId> {
    match (user, caller) {
        (Some(user), _) => Ok(UserId::parse(&user)?),
        (None, Some(caller)) => Ok(caller.user_id.clone()),
        (None, None) => bail!("No member given; pass one or use --as"),
    }
}

fn build_command(command: Commands, caller: Option<&Caller>) -> Result<Command> {
    let needs_caller = !matches!(command, Commands::Health | Commands::Ping);
    if needs_caller && caller.is_none() {
        bail!("This command needs --as <USER_ID>");
    }

    Ok(match command {
        Commands::Start { user } => Command::StartShift {
            user_id: target(user, caller)?,
        },
        Commands::Stop { user } => Command::StopShift {
            user_id: target(user, caller)?,
        },
        Commands::Status { user } => Command::ShiftStatus {
            user_id: target(user, caller)?,
        },
        Commands::Total { user } => Command::TotalDutyTime {
            user_id: target(user, caller)?,
        },
        Commands::History { user, limit } => Command::RecentHistory {
            user_id: target(user, caller)?,
            limit,
        },
        Commands::Leaderboard { limit } => Command::Leaderboard { limit },
        Commands::Active => Command::ActiveShifts,
        Commands::AddTime { user, minutes } => Command::AdminAddTime {
            user_id: UserId::parse(&user)?,
            minutes,
        },
        Commands::RemoveTime { user, minutes } => Command::AdminRemoveTime {
            user_id: UserId::parse(&user)?,
            minutes,
        },
        Commands::Wipe { yes } => Command::Wipe { confirm: yes },
        Commands::Health => Command::GetHealth,
        Commands::Ping => Command::Ping,
        Commands::Watch => Command::SubscribeEvents,
    })
}
