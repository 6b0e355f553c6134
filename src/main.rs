//! Duel Arena Server
//!
//! Runs a simulated ranked season against in-memory collaborators and
//! verifies that replaying it reproduces the same state hash.

use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use duel_arena::{
    arena::{
        memory::MemoryProviders, snapshot::ArenaSnapshot, types::Element, Address, ArenaConfig,
        ArenaState, CharacterId, WeaponId,
    },
    core::hash::StateHash,
    service::{ArenaService, ManualClock},
    FIXED_ONE, VERSION,
};

/// Players in the demo world.
const PLAYERS: u8 = 4;

/// Characters owned by each player.
const CHARACTERS_PER_PLAYER: u64 = 3;

/// Simulated rounds of duel requests.
const ROUNDS: u64 = 12;

/// Randomness seed for the demo.
const DEMO_SEED: u64 = 12345;

const SEASON_START: u64 = 1_700_000_000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Duel Arena Server v{}", VERSION);

    let config = load_config()?;
    info!(?config, "configuration loaded");

    demo_season(config).await
}

/// `ARENA_CONFIG` names a JSON file; otherwise defaults plus `ARENA_*` overrides.
fn load_config() -> anyhow::Result<ArenaConfig> {
    match std::env::var("ARENA_CONFIG") {
        Ok(path) => ArenaConfig::from_json_file(&path)
            .with_context(|| format!("loading arena config from {}", path)),
        Err(_) => ArenaConfig::from_env().context("reading ARENA_* environment"),
    }
}

fn player(index: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[0] = 0xd0;
    bytes[19] = index;
    Address::new(bytes)
}

/// Characters and weapons spread over two tiers, each player funded.
fn demo_world(seed: u64) -> MemoryProviders {
    let mut providers = MemoryProviders::seeded(seed);

    for p in 0..PLAYERS {
        let owner = player(p);
        providers.ledger.fund(owner, 1_000_000);

        for c in 0..CHARACTERS_PER_PLAYER {
            let id = p as u64 * 10 + c + 1;
            let level = 10 + ((id * 7) % 20) as u8;
            let element = Element::from_index((id % 4) as u8).unwrap_or(Element::Fire);
            let weapon_element = Element::from_index(((id + c) % 4) as u8).unwrap_or(element);
            providers.entities.add_character(CharacterId(id), owner, level, element, 900 + id * 13);
            providers.entities.add_weapon(
                WeaponId(id),
                owner,
                weapon_element,
                FIXED_ONE + (id as i64 % 5) * (FIXED_ONE / 20),
                id * 3,
            );
        }
    }
    providers
}

/// Run one season through the service and return its final hash and snapshot.
async fn run_season(config: ArenaConfig, seed: u64) -> anyhow::Result<(StateHash, ArenaSnapshot)> {
    let arena = ArenaState::new(config, demo_world(seed))?;
    let clock = Arc::new(ManualClock::new(SEASON_START));
    let service = ArenaService::new(arena, clock.clone());

    let roster: Vec<(Address, CharacterId)> = (0..PLAYERS)
        .flat_map(|p| (0..CHARACTERS_PER_PLAYER).map(move |c| (player(p), CharacterId(p as u64 * 10 + c + 1))))
        .collect();

    for (owner, character_id) in &roster {
        let stake = service
            .enter_arena(*owner, *character_id, WeaponId(character_id.0), None, false)
            .await?;
        info!(character = %character_id, stake, "entered");
    }

    for round in 0..ROUNDS {
        clock.advance(150);

        for (owner, character_id) in &roster {
            if !service.read(|a| a.is_character_in_arena(*character_id)).await {
                continue;
            }

            let assigned = if service.read(|a| a.has_pending_duel(*character_id)).await {
                service.reroll_opponent(*owner, *character_id).await
            } else {
                service.request_opponent(*owner, *character_id).await
            };
            if let Err(err) = assigned {
                info!(round, character = %character_id, %err, "no duel this round");
                continue;
            }

            clock.advance(5);
            match service.perform_duel(*owner, *character_id).await {
                Ok(outcome) => info!(
                    round,
                    winner = %outcome.winner_id,
                    loser = %outcome.loser_id,
                    reward = outcome.split.winner_reward,
                    evicted = outcome.loser_evicted,
                    "duel"
                ),
                Err(err) => warn!(round, character = %character_id, %err, "duel failed"),
            }
        }
    }

    for p in 0..PLAYERS {
        let owner = player(p);
        if let Ok(amount) = service.withdraw_rewards(owner).await {
            info!(player = %owner, amount, "rewards claimed");
        }
    }

    clock.advance(60);
    let paid_out = service.end_season().await;
    info!(paid_out, "season closed");

    Ok((service.state_hash().await, service.snapshot().await))
}

async fn demo_season(config: ArenaConfig) -> anyhow::Result<()> {
    info!("=== Running Demo Season ===");
    let (hash, snapshot) = run_season(config.clone(), DEMO_SEED).await?;
    info!("Final State Hash: {}", hex::encode(hash));
    info!(
        fighters = snapshot.fighters.len(),
        fees = snapshot.collected_fees,
        season = snapshot.season,
        "final state"
    );

    info!("=== Verifying Snapshot ===");
    let bytes = snapshot.to_bytes()?;
    let restored = ArenaState::restore(ArenaSnapshot::from_bytes(&bytes)?, demo_world(DEMO_SEED), config.clone())?;
    if restored.state_hash() != hash {
        bail!("snapshot restore changed the state hash");
    }
    info!(bytes = bytes.len(), "snapshot restore verified");

    info!("=== Verifying Determinism ===");
    let (replay_hash, _) = run_season(config, DEMO_SEED).await?;
    info!("Replay State Hash: {}", hex::encode(replay_hash));

    if hash == replay_hash {
        info!("DETERMINISM VERIFIED: Hashes match!");
        Ok(())
    } else {
        bail!("DETERMINISM FAILURE: Hashes differ!")
    }
}
