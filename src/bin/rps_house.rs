use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use homomorphic_rps::cache::InMemoryGameStateCache;
use homomorphic_rps::chain::{
    ChainClient, GameCall, GameId, InMemoryChain, TransactionRequest,
};
use homomorphic_rps::config::EngineConfig;
use homomorphic_rps::nonce::SignerPool;
use homomorphic_rps::orchestration::{
    FixedHouseStrategy, GameOrchestrator, HouseService, HouseStrategy, JoinState,
    RandomHouseStrategy, ResolveRequest,
};
use homomorphic_rps::resolution::{move_commitment, EncodedMoveScheme, Move};
use homomorphic_rps::telemetry::init_tracing;

const LOG_TARGET: &str = "bin::rps_house";
const PLAYER: &str = "0xplayer";
const JOIN_POLL: Duration = Duration::from_millis(50);
const JOIN_POLL_ATTEMPTS: usize = 100;

#[derive(Debug, Parser)]
#[command(name = "rps_house")]
#[command(about = "Play encrypted rock-paper-scissors against the house on a local chain", long_about = None)]
struct Args {
    /// Player move: rock, paper or scissors
    #[arg(long, env = "RPS_PLAYER_MOVE", default_value = "rock")]
    player_move: Move,

    /// Fix the house move instead of drawing it at random
    #[arg(long, env = "RPS_HOUSE_MOVE")]
    house_move: Option<Move>,

    /// Number of games to play
    #[arg(long, default_value_t = 1)]
    games: u32,

    /// Toggle structured (JSON) logs
    #[arg(long, env = "RPS_LOG_JSON", default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let args = Args::parse();
    init_tracing(args.json)?;

    let config = EngineConfig::from_env().context("failed to load engine configuration")?;
    let scheme_kind = config.keys.kind();
    let scheme = config
        .keys
        .into_scheme()
        .context("failed to build move scheme")?;
    info!(target: LOG_TARGET, scheme = %scheme_kind, "move scheme ready");

    let cancel = CancellationToken::new();
    let chain = InMemoryChain::new();
    let client: Arc<dyn ChainClient> = Arc::new(chain.clone());
    let signers = SignerPool::spawn(
        &config.orchestrator.signers,
        Arc::clone(&client),
        config.orchestrator.nonce_refresh_interval,
        cancel.clone(),
    )?;
    let house: Arc<dyn HouseStrategy> = match args.house_move {
        Some(mv) => Arc::new(FixedHouseStrategy(mv)),
        None => Arc::new(RandomHouseStrategy),
    };
    let orchestrator = Arc::new(GameOrchestrator::new(
        Arc::clone(&scheme),
        client,
        Arc::new(InMemoryGameStateCache::new()),
        signers,
        house,
        config.orchestrator,
    ));

    let service = HouseService::new(Arc::clone(&orchestrator));
    let listener = service.spawn(cancel.clone());

    for round in 1..=args.games {
        let (game_id, player_move) = create_game(&chain, scheme.as_ref(), args.player_move).await?;
        info!(target: LOG_TARGET, round, game_id, player_move = %args.player_move, "game created");

        wait_for_join(&service, game_id).await;
        let response = orchestrator
            .resolve(ResolveRequest {
                game_id,
                player_move,
            })
            .await;
        println!("{}", serde_json::to_string_pretty(&response)?);
        if !response.success {
            warn!(target: LOG_TARGET, game_id, error = ?response.error, "game did not resolve");
        }
    }

    cancel.cancel();
    listener.await?;
    Ok(())
}

fn load_dotenv() {
    let manifest_env_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(".env");
    dotenv::from_filename(manifest_env_path).ok();
    dotenv::dotenv().ok();
}

async fn create_game(
    chain: &InMemoryChain,
    scheme: &dyn EncodedMoveScheme,
    player_move: Move,
) -> Result<(GameId, Vec<u8>)> {
    let ciphertext = scheme.encrypt_move_encoded(player_move)?;
    let from = PLAYER.to_string();
    let request = TransactionRequest {
        nonce: chain.pending_nonce(&from).await?,
        from,
        call: GameCall::CreateGame {
            bet: 1_000,
            commitment: move_commitment(&ciphertext).to_vec(),
        },
    };
    let tx_hash = chain.submit(request).await?;
    let receipt = chain.wait_for_receipt(&tx_hash, Duration::from_secs(5)).await?;
    let game_id = receipt
        .game_id
        .ok_or_else(|| anyhow!("create_game receipt {tx_hash} carries no game id"))?;
    Ok((game_id, ciphertext))
}

/// Give the house service a chance to join first; resolving joins anyway.
async fn wait_for_join(service: &HouseService, game_id: GameId) {
    for _ in 0..JOIN_POLL_ATTEMPTS {
        if service.join_state(game_id) == Some(JoinState::Joined) {
            return;
        }
        tokio::time::sleep(JOIN_POLL).await;
    }
    warn!(target: LOG_TARGET, game_id, "house service did not join in time");
}
