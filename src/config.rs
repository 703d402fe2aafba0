use std::{env, fmt::Display, str::FromStr};

use anyhow::{anyhow, Context};
use tracing::{info, warn};

use crate::metrics::ScoreWeights;

pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub feed_capacity: usize,
    pub weights: ScoreWeights,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL")
            .context("DATABASE_URL must be set to the placement admin Postgres instance")?;
        let defaults = ScoreWeights::default();

        Ok(Self {
            database_url,
            max_connections: try_load(&lookup, "PLACEMENT_ADMIN_MAX_CONNECTIONS", 5)?,
            feed_capacity: try_load(&lookup, "PLACEMENT_ADMIN_FEED_CAPACITY", 256)?,
            weights: ScoreWeights {
                per_completed_placement: try_load(
                    &lookup,
                    "SCORE_PER_COMPLETED_PLACEMENT",
                    defaults.per_completed_placement,
                )?,
                per_company: try_load(&lookup, "SCORE_PER_COMPANY", defaults.per_company)?,
                days_factor: try_load(&lookup, "SCORE_DAYS_FACTOR", defaults.days_factor)?,
                cap: try_load(&lookup, "SCORE_CAP", defaults.cap)?,
                missing_time_score: try_load(
                    &lookup,
                    "SCORE_MISSING_TIME",
                    defaults.missing_time_score,
                )?,
            },
        })
    }
}

fn try_load<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e| {
            warn!("Invalid {key} value: {e}");
            anyhow!("invalid {key} value {raw:?}: {e}")
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
