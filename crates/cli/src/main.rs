mod config;
mod error;

use std::path::{Path, PathBuf};

use authz::{BasicGasMeter, Coins, GasMeter, MSG_SEND_TYPE_URL, Msg, SendAuthorization};
use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use keeper::{ExecOutcome, Keeper};
use sim::Simulation;
use storage::{Grant, GrantEvent, GrantEventKind, Store};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "sendauthz.toml";

#[derive(Parser)]
#[command(name = "sendauthz")]
#[command(about = "Delegated, consumable spend authorizations", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Grant database (overrides the config file)
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check an authorization file without storing it
    Validate {
        /// TOML file with spend_limit and allow_list
        file: PathBuf,
    },
    /// Grant an authorization from GRANTER to GRANTEE
    Grant {
        granter: String,
        grantee: String,
        /// Spend limit, e.g. 100atom,40stake
        #[arg(short, long, conflicts_with = "file")]
        spend_limit: Option<Coins>,
        /// Permitted recipient (repeatable)
        #[arg(short, long = "allow", conflicts_with = "file")]
        allow: Vec<String>,
        /// Read the authorization from a TOML file instead
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Revoke a grant
    Revoke {
        granter: String,
        grantee: String,
        /// Instruction kind the grant covers
        #[arg(long, default_value = MSG_SEND_TYPE_URL)]
        msg_type: String,
    },
    /// Send GRANTER's funds as GRANTEE
    Exec {
        grantee: String,
        /// Address whose funds are sent
        #[arg(long)]
        from: String,
        /// Recipient
        #[arg(long)]
        to: String,
        /// Amount, e.g. 40atom
        #[arg(long)]
        amount: Coins,
        /// Gas budget (defaults to the config value)
        #[arg(long)]
        gas_limit: Option<u64>,
    },
    /// Credit coins to an address
    Fund { address: String, coins: Coins },
    /// Show an address's balance
    Balance { address: String },
    /// List stored grants
    Grants {
        /// Only grants issued by this address
        #[arg(long, conflicts_with = "grantee")]
        granter: Option<String>,
        /// Only grants held by this address
        #[arg(long)]
        grantee: Option<String>,
    },
    /// Show the grant event log
    Events {
        /// Only events for grants issued by this address
        #[arg(long)]
        granter: Option<String>,
        /// Filter by event kind (granted, revoked, updated, exhausted, executed, rejected)
        #[arg(short, long)]
        kind: Option<String>,
        /// Show only the last N events
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Run random grant/revoke/exec operations against an in-memory store
    Simulate {
        #[arg(long, default_value = "0")]
        seed: u64,
        #[arg(long, default_value = "1000")]
        ops: usize,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let db = cli.db;

    match cli.command {
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Simulate { seed, ops } => cmd_simulate(&config, seed, ops),
        Commands::Grant {
            granter,
            grantee,
            spend_limit,
            allow,
            file,
        } => {
            let authorization = match (spend_limit, file) {
                (_, Some(file)) => SendAuthorization::load(file)?,
                (Some(limit), None) => SendAuthorization::new(limit, allow),
                (None, None) => return Err(Error::MissingSpendLimit),
            };
            let grant = open_keeper(&config, db)?.grant(&granter, &grantee, authorization)?;
            print_grant(&grant);
            Ok(())
        }
        Commands::Revoke {
            granter,
            grantee,
            msg_type,
        } => {
            open_keeper(&config, db)?.revoke(&granter, &grantee, &msg_type)?;
            println!("Revoked {granter} -> {grantee} ({msg_type})");
            Ok(())
        }
        Commands::Exec {
            grantee,
            from,
            to,
            amount,
            gas_limit,
        } => {
            let mut keeper = open_keeper(&config, db)?;
            let mut meter = BasicGasMeter::new(gas_limit.unwrap_or(config.gas_limit));
            let msg = Msg::send(from, to, amount);
            match keeper.exec(&grantee, &msg, &mut meter)? {
                ExecOutcome::Direct => println!("Sent (no grant needed)"),
                ExecOutcome::Updated(next) => {
                    println!("Sent; remaining spend limit: {}", next.spend_limit)
                }
                ExecOutcome::Exhausted => println!("Sent; grant exhausted and deleted"),
            }
            println!("Gas used: {}", meter.gas_consumed());
            Ok(())
        }
        Commands::Fund { address, coins } => {
            let balance = open_keeper(&config, db)?.fund(&address, &coins)?;
            println!("{address}: {balance}");
            Ok(())
        }
        Commands::Balance { address } => {
            let balance = open_keeper(&config, db)?.balance(&address)?;
            println!("{address}: {balance}");
            Ok(())
        }
        Commands::Grants { granter, grantee } => {
            let keeper = open_keeper(&config, db)?;
            cmd_grants(keeper.store(), granter.as_deref(), grantee.as_deref())
        }
        Commands::Events {
            granter,
            kind,
            limit,
        } => {
            let keeper = open_keeper(&config, db)?;
            cmd_events(keeper.store(), granter.as_deref(), kind.as_deref(), limit)
        }
    }
}

fn cmd_validate(file: &Path) -> Result<()> {
    let authorization = SendAuthorization::load(file)?;
    authorization.validate_basic()?;
    println!(
        "OK: spend limit {}, {}",
        authorization.spend_limit,
        if authorization.allow_list.is_empty() {
            "any recipient".to_string()
        } else {
            format!("{} allowed recipients", authorization.allow_list.len())
        }
    );
    Ok(())
}

fn cmd_simulate(config: &Config, seed: u64, ops: usize) -> Result<()> {
    let mut simulation = Simulation::new(seed, config.simulation.clone())?;
    let report = simulation.run(ops)?;
    println!("Seed: {seed}\n");
    println!("{report}");
    Ok(())
}

fn cmd_grants(store: &Store, granter: Option<&str>, grantee: Option<&str>) -> Result<()> {
    let grants = match (granter, grantee) {
        (Some(granter), _) => store.grants_by_granter(granter)?,
        (None, Some(grantee)) => store.grants_by_grantee(grantee)?,
        (None, None) => store.all_grants()?,
    };

    if grants.is_empty() {
        println!("No grants found.");
        return Ok(());
    }

    for grant in &grants {
        print_grant(grant);
    }
    Ok(())
}

fn print_grant(grant: &Grant) {
    let created = Local
        .from_utc_datetime(&grant.created_at.naive_utc())
        .format("%Y-%m-%d %H:%M");
    println!("{}  [{created}]", grant.key);
    println!("  spend limit: {}", grant.authorization.spend_limit);
    if !grant.authorization.allow_list.is_empty() {
        println!("  allow list:  {}", grant.authorization.allow_list.join(", "));
    }
}

fn cmd_events(
    store: &Store,
    granter: Option<&str>,
    kind: Option<&str>,
    limit: Option<usize>,
) -> Result<()> {
    let events = store.load_events(granter, kind)?;

    if events.is_empty() {
        println!("No events found.");
        return Ok(());
    }

    let skip = limit.map_or(0, |n| events.len().saturating_sub(n));
    for event in events.iter().skip(skip) {
        print_event(event);
    }
    Ok(())
}

fn print_event(event: &GrantEvent) {
    let time = Local
        .from_utc_datetime(&event.timestamp.naive_utc())
        .format("%Y-%m-%d %H:%M:%S");
    let key = &event.key;

    match &event.kind {
        GrantEventKind::Granted { authorization } => {
            println!("[{time}] GRANTED {key}: {}", authorization.spend_limit);
        }
        GrantEventKind::Revoked => println!("[{time}] REVOKED {key}"),
        GrantEventKind::Updated { spent, remaining } => {
            println!("[{time}] SPENT {key}: {spent}, remaining {remaining}");
        }
        GrantEventKind::Exhausted { spent } => {
            println!("[{time}] EXHAUSTED {key}: {spent}");
        }
        GrantEventKind::Executed { msg } => {
            println!("[{time}] EXECUTED {key}: {}", msg.type_url());
        }
        GrantEventKind::Rejected { reason } => {
            println!("[{time}] REJECTED {key}: {reason}");
        }
    }
}

fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Ok(Config::load(path)?)
    } else {
        Ok(Config::default_config())
    }
}

fn open_keeper(config: &Config, db: Option<PathBuf>) -> Result<Keeper> {
    let db_path = match db {
        Some(path) => path,
        None => config.database_path()?,
    };
    if let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    tracing::debug!(path = %db_path.display(), "opening grant store");
    Ok(Keeper::new(Store::open(&db_path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_allow_conflicts_with_file() {
        let err = Cli::try_parse_from([
            "sendauthz", "grant", "alice", "bob", "--allow", "carol", "--file", "auth.toml",
        ])
        .err()
        .unwrap();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_allow_with_spend_limit() {
        let cli = Cli::try_parse_from([
            "sendauthz", "grant", "alice", "bob", "-s", "10atom", "-a", "carol", "-a", "dave",
        ])
        .unwrap();
        let Commands::Grant { allow, file, .. } = cli.command else {
            panic!("expected grant");
        };
        assert_eq!(allow, ["carol", "dave"]);
        assert!(file.is_none());
    }
}
