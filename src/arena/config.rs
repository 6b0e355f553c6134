//! Arena Configuration
//!
//! Economy and timing parameters. Loaded from defaults, a JSON file, or
//! `ARENA_*` environment variables, and always validated before use.

use std::path::Path;

use serde::{Serialize, Deserialize};
use thiserror::Error;

use super::types::{Amount, Tier};

/// Number of ranked slots per tier leaderboard.
pub const TOP_RANKS: usize = 3;

/// Arena configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// USD base of the duel cost (cents).
    pub base_wager_usd_cents: u64,
    /// USD added to the duel cost per tier (cents).
    pub tier_wager_usd_cents: u64,
    /// Entry wager = duel cost × this factor.
    pub wagering_factor: u64,
    /// Re-roll fee as a percentage of the duel cost.
    pub reroll_fee_percent: u64,
    /// Share of the bounty diverted to the tier pool (percent).
    pub pool_tax_percent: u64,
    /// Ranking points awarded for a win.
    pub winning_points: u64,
    /// Ranking points removed for a loss.
    pub losing_points: u64,
    /// Seconds an attacker has to perform a requested duel.
    pub decision_seconds: u64,
    /// Seconds a character stays unattackable after arena activity.
    pub unattackable_seconds: u64,
    /// Levels per tier bucket.
    pub levels_per_tier: u8,
    /// Season prize split for ranks 1..3 (percent of the tier pool).
    pub prize_percentages: [u64; TOP_RANKS],
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            base_wager_usd_cents: 500,
            tier_wager_usd_cents: 700,
            wagering_factor: 3,
            reroll_fee_percent: 25,
            pool_tax_percent: 15,
            winning_points: 5,
            losing_points: 3,
            decision_seconds: 180,     // 3 minutes
            unattackable_seconds: 120, // 2 minutes
            levels_per_tier: 10,
            prize_percentages: [60, 30, 10],
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Tier width must be positive.
    #[error("levels_per_tier must be greater than zero")]
    InvalidTierWidth,

    /// Tax above half the bounty would eat into the loser's duel cost.
    #[error("pool_tax_percent {0} exceeds 50")]
    TaxTooHigh(u64),

    /// Season prizes cannot pay out more than the pool.
    #[error("prize_percentages sum to {0}, more than 100")]
    PrizeSplitTooHigh(u64),

    /// Entry wager would be zero.
    #[error("wagering_factor must be greater than zero")]
    ZeroWageringFactor,

    /// Re-roll cannot cost more than the duel.
    #[error("reroll_fee_percent {0} exceeds 100")]
    RerollFeeTooHigh(u64),

    /// Environment variable holds a non-numeric value.
    #[error("invalid value for {key}: {value}")]
    InvalidEnv {
        /// Variable name.
        key: String,
        /// Offending value.
        value: String,
    },

    /// Config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON for this schema.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ArenaConfig {
    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.levels_per_tier == 0 {
            return Err(ConfigError::InvalidTierWidth);
        }
        if self.pool_tax_percent > 50 {
            return Err(ConfigError::TaxTooHigh(self.pool_tax_percent));
        }
        let prize_total: u64 = self.prize_percentages.iter().sum();
        if prize_total > 100 {
            return Err(ConfigError::PrizeSplitTooHigh(prize_total));
        }
        if self.wagering_factor == 0 {
            return Err(ConfigError::ZeroWageringFactor);
        }
        if self.reroll_fee_percent > 100 {
            return Err(ConfigError::RerollFeeTooHigh(self.reroll_fee_percent));
        }
        Ok(())
    }

    /// Load from a JSON file; missing fields fall back to defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Create config from defaults overridden by `ARENA_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        override_from_env("ARENA_BASE_WAGER_USD_CENTS", &mut config.base_wager_usd_cents)?;
        override_from_env("ARENA_TIER_WAGER_USD_CENTS", &mut config.tier_wager_usd_cents)?;
        override_from_env("ARENA_WAGERING_FACTOR", &mut config.wagering_factor)?;
        override_from_env("ARENA_REROLL_FEE_PERCENT", &mut config.reroll_fee_percent)?;
        override_from_env("ARENA_POOL_TAX_PERCENT", &mut config.pool_tax_percent)?;
        override_from_env("ARENA_WINNING_POINTS", &mut config.winning_points)?;
        override_from_env("ARENA_LOSING_POINTS", &mut config.losing_points)?;
        override_from_env("ARENA_DECISION_SECONDS", &mut config.decision_seconds)?;
        override_from_env("ARENA_UNATTACKABLE_SECONDS", &mut config.unattackable_seconds)?;
        override_from_env("ARENA_LEVELS_PER_TIER", &mut config.levels_per_tier)?;

        config.validate()?;
        Ok(config)
    }

    /// Tier bucket for a character level.
    #[inline]
    pub fn tier_for_level(&self, level: u8) -> Tier {
        level / self.levels_per_tier.max(1)
    }

    /// USD value of the duel cost at `tier` (cents).
    #[inline]
    pub fn duel_cost_usd_cents(&self, tier: Tier) -> u64 {
        self.base_wager_usd_cents
            .saturating_add(self.tier_wager_usd_cents.saturating_mul(tier as u64))
    }

    /// Re-roll fee for a given duel cost.
    #[inline]
    pub fn reroll_fee(&self, duel_cost: Amount) -> Amount {
        duel_cost.saturating_mul(self.reroll_fee_percent) / 100
    }
}

fn override_from_env<T: std::str::FromStr>(key: &str, slot: &mut T) -> Result<(), ConfigError> {
    match std::env::var(key) {
        Ok(value) => {
            *slot = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: key.to_string(),
                value,
            })?;
            Ok(())
        }
        Err(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ArenaConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reroll_fee(100), 25);
    }

    #[test]
    fn test_tier_for_level() {
        let config = ArenaConfig::default();
        assert_eq!(config.tier_for_level(0), 0);
        assert_eq!(config.tier_for_level(9), 0);
        assert_eq!(config.tier_for_level(10), 1);
        assert_eq!(config.tier_for_level(255), 25);
    }

    #[test]
    fn test_duel_cost_grows_per_tier() {
        let config = ArenaConfig::default();
        assert_eq!(config.duel_cost_usd_cents(0), 500);
        assert_eq!(config.duel_cost_usd_cents(2), 1_900);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = ArenaConfig::default();
        config.pool_tax_percent = 51;
        assert!(matches!(config.validate(), Err(ConfigError::TaxTooHigh(51))));

        let mut config = ArenaConfig::default();
        config.prize_percentages = [60, 30, 20];
        assert!(matches!(config.validate(), Err(ConfigError::PrizeSplitTooHigh(110))));

        let mut config = ArenaConfig::default();
        config.levels_per_tier = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTierWidth)));

        let mut config = ArenaConfig::default();
        config.wagering_factor = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroWageringFactor)));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ArenaConfig = serde_json::from_str(r#"{"pool_tax_percent": 20}"#).unwrap();
        assert_eq!(config.pool_tax_percent, 20);
        assert_eq!(config.wagering_factor, 3);
    }

    #[test]
    fn test_json_file_is_validated() {
        let dir = std::env::temp_dir();
        let good = dir.join(format!("arena-config-good-{}.json", std::process::id()));
        let bad = dir.join(format!("arena-config-bad-{}.json", std::process::id()));
        std::fs::write(&good, r#"{"decision_seconds": 60}"#).unwrap();
        std::fs::write(&bad, r#"{"levels_per_tier": 0}"#).unwrap();

        assert_eq!(ArenaConfig::from_json_file(&good).unwrap().decision_seconds, 60);
        assert!(matches!(ArenaConfig::from_json_file(&bad), Err(ConfigError::InvalidTierWidth)));
        assert!(matches!(
            ArenaConfig::from_json_file(dir.join("arena-config-missing.json")),
            Err(ConfigError::Io(_))
        ));

        let _ = std::fs::remove_file(good);
        let _ = std::fs::remove_file(bad);
    }

    // Only test touching ARENA_* variables.
    #[test]
    fn test_env_overrides() {
        std::env::set_var("ARENA_WINNING_POINTS", " 8 ");
        let config = ArenaConfig::from_env().unwrap();
        assert_eq!(config.winning_points, 8);
        assert_eq!(config.losing_points, 3);

        std::env::set_var("ARENA_WINNING_POINTS", "eight");
        assert!(matches!(ArenaConfig::from_env(), Err(ConfigError::InvalidEnv { .. })));

        std::env::remove_var("ARENA_WINNING_POINTS");
    }
}
