//! Generate one digest from the command line and print it as JSON.
//!
//! Interests are positional: `team:Warriors athlete:"Caitlin Clark" "trade deadline"`.
//! Anything without a `team:`/`athlete:` prefix is a custom topic. Ctrl-C cancels the run.

use anyhow::Context;
use sports_digest_curator::{Curator, CuratorConfig, GenerateError, Interest};

fn parse_interest(arg: &str) -> Interest {
    match arg.split_once(':') {
        Some(("team", name)) => Interest::team(name),
        Some(("athlete", name)) => Interest::athlete(name),
        _ => Interest::custom(arg),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let interests: Vec<Interest> = std::env::args().skip(1).map(|a| parse_interest(&a)).collect();
    if interests.is_empty() {
        eprintln!("usage: digest-demo team:<name> athlete:<name> <topic> ...");
        std::process::exit(2);
    }

    let cfg = CuratorConfig::load_default()?;
    let curator = Curator::from_config(&cfg);
    let gen_cfg = cfg.generation_config();

    let cancel = gen_cfg.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    match curator.generate(&interests, &gen_cfg).await {
        Ok(digest) => {
            let out = serde_json::to_string_pretty(&digest).context("serializing digest")?;
            println!("{out}");
            Ok(())
        }
        Err(GenerateError::Cancelled) => {
            eprintln!("digest-demo cancelled");
            std::process::exit(130);
        }
        Err(e) => Err(e.into()),
    }
}
