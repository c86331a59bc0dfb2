use std::error::Error as _;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};
use flow_core::{CommitContext, OrgId};
use flowcommit::{load_sessions, Runtime, RuntimeError};
use log::error;

#[derive(Parser, Debug)]
#[command(name = "flow-cli", version, about = "Commit batches of flow session events")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run pending database migrations
    Migrate,
    /// Dispatch and commit a batch of sessions read from a JSON file
    Process {
        /// Org every session in the batch belongs to
        #[arg(long)]
        org: i64,
        /// JSON array of sessions with their events
        #[arg(long)]
        batch: PathBuf,
        /// Cancel the batch if it has not committed after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

fn main() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).format_timestamp_millis()
                                                                                             .try_init();
    if let Err(err) = run(Cli::parse()) {
        error!("flow-cli failed: {err}");
        eprintln!("error: {err}");
        let mut source = err.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = cause.source();
        }
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), RuntimeError> {
    match cli.command {
        Commands::Migrate => {
            flow_persistence::init_dotenv();
            let pool = flow_persistence::build_dev_pool_from_env()?;
            let mut conn = pool.get()
                               .map_err(|e| flow_persistence::PersistenceError::TransientIo(format!("pool error: {e}")))?;
            let applied = flow_persistence::migrations::run_pending_migrations(&mut conn)?;
            println!("migrations up to date (applied now: {applied})");
            Ok(())
        }
        Commands::Process { org,
                            batch,
                            timeout_secs, } => {
            let mut sessions = load_sessions(&batch)?;
            if let Some(other) = sessions.iter().find(|s| s.org_id != OrgId(org)) {
                return Err(flow_core::CoreError::MixedOrgs { expected: OrgId(org),
                                                             found: other.org_id }.into());
            }
            let ctx = match timeout_secs {
                Some(secs) => CommitContext::with_timeout(Duration::from_secs(secs)),
                None => CommitContext::new(),
            };
            let runtime = Runtime::from_env()?;
            let outcome = runtime.process_batch(&ctx, &mut sessions)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_process_arguments() {
        let cli = Cli::try_parse_from(["flow-cli", "process", "--org", "7", "--batch", "turn.json"]).expect("args");
        match cli.command {
            Commands::Process { org,
                                batch,
                                timeout_secs, } => {
                assert_eq!(org, 7);
                assert_eq!(batch, PathBuf::from("turn.json"));
                assert_eq!(timeout_secs, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn process_requires_org() {
        assert!(Cli::try_parse_from(["flow-cli", "process", "--batch", "turn.json"]).is_err());
    }
}
