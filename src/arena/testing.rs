//! Shared fixtures for arena tests.

use crate::core::fixed::FIXED_ONE;

use super::config::ArenaConfig;
use super::memory::MemoryProviders;
use super::state::ArenaState;
use super::types::{Address, CharacterId, Element, ShieldId, Timestamp, WeaponId};

pub const ALICE_SHIELD: ShieldId = ShieldId(1);

pub const STARTING_BALANCE: u64 = 10_000;

pub fn alice() -> Address {
    Address::new([0xa1; 20])
}

pub fn bob() -> Address {
    Address::new([0xb0; 20])
}

pub fn carol() -> Address {
    Address::new([0xc0; 20])
}

/// Owner of each fixture character.
pub fn owner_of(id: u64) -> Address {
    match id {
        1 | 2 => alice(),
        3 | 4 => bob(),
        _ => carol(),
    }
}

/// Arena priced so a tier-1 duel costs 100 tokens (entry wager 300).
///
/// | character | owner | level | element   | weapon |
/// |-----------|-------|-------|-----------|--------|
/// | 1         | alice | 12    | Fire      | 1      |
/// | 2         | alice | 14    | Earth     | 2      |
/// | 3         | bob   | 15    | Lightning | 3      |
/// | 4         | bob   | 11    | Water     | 4      |
/// | 5         | carol | 18    | Fire      | 5      |
/// | 6         | carol | 3     | Earth     | 6      |
///
/// Every character has power 1000; each weapon shares its wielder's id,
/// has a neutral multiplier and no bonus power. Randomness is scripted to
/// always return 0.
pub fn world() -> ArenaState<MemoryProviders> {
    let config = ArenaConfig {
        base_wager_usd_cents: 90,
        tier_wager_usd_cents: 10,
        ..ArenaConfig::default()
    };
    let mut providers = MemoryProviders::scripted([0]);

    let roster = [
        (1, 12, Element::Fire),
        (2, 14, Element::Earth),
        (3, 15, Element::Lightning),
        (4, 11, Element::Water),
        (5, 18, Element::Fire),
        (6, 3, Element::Earth),
    ];
    for (id, level, element) in roster {
        let owner = owner_of(id);
        providers.entities.add_character(CharacterId(id), owner, level, element, 1_000);
        providers.entities.add_weapon(WeaponId(id), owner, element, FIXED_ONE, 0);
    }
    providers.entities.add_shield(ALICE_SHIELD, alice());

    for player in [alice(), bob(), carol()] {
        providers.ledger.fund(player, STARTING_BALANCE);
    }

    match ArenaState::new(config, providers) {
        Ok(arena) => arena,
        Err(err) => panic!("fixture config rejected: {err}"),
    }
}

/// Enter fixture characters with their own weapons and no shield.
pub fn enter_all(arena: &mut ArenaState<MemoryProviders>, ids: &[u64], now: Timestamp) {
    for id in ids {
        arena
            .enter_arena(owner_of(*id), CharacterId(*id), WeaponId(*id), None, now)
            .unwrap();
    }
}
