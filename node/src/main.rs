use std::{fs, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use log::info;
use settings::{Role, Settings};
use tokio::signal;

/// Runs one party of a federated logistic regression.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// The TOML configuration shared by every party.
    #[arg(long)]
    config: PathBuf,

    /// `coordinator` or the name of a participant in the roster.
    #[arg(long)]
    role: String,

    /// Also write the final model, as a JSON array, to this file.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let settings = Settings::from_path(&args.config)?;
    let role = Role::resolve(&settings, &args.role)?;
    info!("starting as {}", role.party().name());

    let run = async {
        match role {
            Role::Coordinator(_) => node::coordinate(&settings).await,
            Role::Participant(party) => {
                let source = node::shard_source(&args.config);
                node::participate(&settings, party.name(), &source).await
            }
        }
    };

    let weights = tokio::select! {
        weights = run => weights?,
        _ = signal::ctrl_c() => anyhow::bail!("interrupted"),
    };

    let json = serde_json::to_string(&weights.to_vec())?;
    println!("{json}");

    if let Some(path) = args.output {
        fs::write(&path, &json)
            .with_context(|| format!("cannot write the model to {}", path.display()))?;
    }

    Ok(())
}
