//! Demo binary: runs the bot-matching core with NPC-only synthetic seats so
//! the match → hand → stats loop is observable end to end. Wire-level
//! connection handling is out of scope here (spec §1), so seats are created
//! directly via `Bot::spawn_standalone` instead of a real transport.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use botpoker::bot::Bot;
use botpoker::config::Config;
use botpoker::pool::BotPool;
use botpoker_shared::{BotId, Role};

#[derive(Parser, Debug)]
#[command(name = "botpoker", about = "Bot-matching and hand-execution core demo")]
struct Cli {
    #[arg(long, default_value = "botpoker.toml")]
    config: PathBuf,
    /// Override `max_players` (table size) for this run.
    #[arg(long)]
    bots: Option<usize>,
    /// Override `hand_limit` for this run.
    #[arg(long)]
    hand_limit: Option<u64>,
    /// Persist the above overrides back to the config file.
    #[arg(long, default_value_t = false)]
    persist: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let cfg = Config::load_or_create_with_overrides(&cli.config, cli.bots, cli.hand_limit, cli.persist)
        .with_context(|| format!("loading config '{}'", cli.config.display()))?;

    let game_id = format!("game-{}", std::process::id());
    tracing::info!(
        config = %cli.config.display(),
        max_players = cfg.max_players,
        hand_limit = cfg.hand_limit,
        game_id = %game_id,
        "starting botpoker demo"
    );

    let (pool, handle) = BotPool::new(cfg.clone(), game_id).context("invalid pool config")?;
    tokio::spawn(pool.run());

    for i in 0..cfg.max_players {
        let id = BotId::from(format!("npc-{i}"));
        let (bot, mut rx) = Bot::spawn_standalone(
            id,
            format!("npc-{i}"),
            Role::Npc,
            cfg.start_chips,
            cfg.channel_buffer_size,
        );
        tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if let Some(line) = botpoker::pretty::render(&frame) {
                    tracing::info!("{line}");
                }
            }
        });
        handle.register(bot);
    }

    loop {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(200)) => {
                match handle.snapshot().await {
                    Some(snapshot) if cfg.hand_limit > 0 && snapshot.hand_limit_notified => {
                        tracing::info!(hands = snapshot.hands_completed, "hand limit reached, stopping");
                        break;
                    }
                    Some(_) => {}
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("ctrl-c received, stopping");
                break;
            }
        }
    }

    handle.stop();
    Ok(())
}
