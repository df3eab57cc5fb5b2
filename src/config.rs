//! Application-level configuration loading: engine constants, capability
//! table, shop catalog and scheduler timings.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{info, warn};

use crate::state::engine::ActionKind;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "KODOMOCHI_CONFIG_PATH";

const HOUR_MS: i64 = 60 * 60 * 1000;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Rules driving the pet state engine.
    pub engine: EngineConfig,
    /// Timings of the background tick sweep.
    pub scheduler: SchedulerConfig,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        shop_items = app_config.engine.shop.len(),
                        tick_interval_secs = app_config.scheduler.tick_interval.as_secs(),
                        "loaded engine configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

/// How the pet's local clock moves forward on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ClockAdvance {
    /// Advance by the wall-clock time elapsed since the last update.
    Elapsed,
    /// Advance by a fixed number of hours per tick.
    FixedStep {
        /// Hours added on every tick.
        hours: f64,
    },
}

/// Effect applied when a shop item is bought.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShopEffect {
    /// Suspend hunger and happiness decay.
    DecayShield {
        /// Protection length in hours.
        hours: u32,
    },
    /// Suspend random sickness.
    SicknessShield {
        /// Protection length in hours.
        hours: u32,
    },
    /// Raise happiness to the maximum.
    FillHappiness,
    /// Rice meals grant extra hunger from now on.
    Cookbook,
}

/// Entry of the static shop catalog.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShopItem {
    /// Display name.
    pub name: String,
    /// Short description shown by clients.
    pub description: String,
    /// Price in coins.
    pub price: u32,
    /// What the item does once bought.
    pub effect: ShopEffect,
}

/// Constants and capability table of the pet state engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound of hunger and happiness.
    pub max_stat: u32,
    /// Hunger and happiness of a new pet.
    pub start_stat: u32,
    /// Lightest possible weight.
    pub min_weight: u32,
    /// Weight at which overfeeding makes the pet sick.
    pub max_weight: u32,
    /// Weight of a new pet.
    pub start_weight: u32,
    /// Most droppings the pet can accumulate.
    pub poop_limit: u32,
    /// Care mistakes after which the pet is dead.
    pub care_mistake_limit: u32,
    /// Coins of a new pet.
    pub starting_coins: u32,
    /// Price of a rice meal.
    pub rice_cost: u32,
    /// Price of a candy.
    pub candy_cost: u32,
    /// Price of a medicine dose.
    pub medicine_cost: u32,
    /// Coins earned by cleaning.
    pub clean_reward: u32,
    /// Coins earned by watching a video.
    pub video_reward: u32,
    /// Minimum delay between two video rewards.
    pub video_cooldown_ms: i64,
    /// Coins earned by collecting a drop.
    pub coin_drop_reward: u32,
    /// Minimum delay between two coin drops.
    pub coin_drop_cooldown_ms: i64,
    /// Coins granted to the referrer.
    pub referral_bonus: u32,
    /// Coins granted to a referred newcomer.
    pub referee_bonus: u32,
    /// Price of reviving a dead pet.
    pub revive_fee: u32,
    /// Price of starting over.
    pub reset_fee: u32,
    /// Price of one crown.
    pub crown_price: u32,
    /// Extra hunger granted by rice once the cookbook is owned.
    pub cookbook_rice_bonus: u32,
    /// Probability of winning the play minigame.
    pub play_win_chance: f64,
    /// Per-tick probability of losing one hunger point.
    pub hunger_decay_chance: f64,
    /// Per-tick probability of losing one happiness point.
    pub happiness_decay_chance: f64,
    /// Per-tick probability of falling sick.
    pub sickness_chance: f64,
    /// Per-tick probability of a new dropping.
    pub poop_chance: f64,
    /// How the in-game clock advances on each tick.
    pub clock: ClockAdvance,
    /// Hour at which the pet falls asleep.
    pub sleep_hour: f64,
    /// Hour at which the pet wakes up.
    pub wake_hour: f64,
    /// In-game hour of a new pet.
    pub initial_clock_time: f64,
    /// Actions still accepted once the pet is dead.
    pub dead_allowed: Vec<ActionKind>,
    /// Actions rejected while the pet sleeps.
    pub sleep_blocked: Vec<ActionKind>,
    /// Shop catalog keyed by item id, in display order.
    pub shop: IndexMap<String, ShopItem>,
}

impl EngineConfig {
    /// Sleep window rule: asleep from `sleep_hour` until `wake_hour`, wrapping midnight.
    pub fn is_sleep_time(&self, clock_time: f64) -> bool {
        if self.sleep_hour > self.wake_hour {
            clock_time >= self.sleep_hour || clock_time < self.wake_hour
        } else {
            clock_time >= self.sleep_hour && clock_time < self.wake_hour
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_stat: 5,
            start_stat: 2,
            min_weight: 1,
            max_weight: 10,
            start_weight: 5,
            poop_limit: 3,
            care_mistake_limit: 10,
            starting_coins: 0,
            rice_cost: 1,
            candy_cost: 2,
            medicine_cost: 1,
            clean_reward: 5,
            video_reward: 10,
            video_cooldown_ms: 24 * HOUR_MS,
            coin_drop_reward: 1,
            coin_drop_cooldown_ms: HOUR_MS,
            referral_bonus: 5,
            referee_bonus: 5,
            revive_fee: 10,
            reset_fee: 0,
            crown_price: 100,
            cookbook_rice_bonus: 1,
            play_win_chance: 0.7,
            hunger_decay_chance: 0.25,
            happiness_decay_chance: 0.25,
            sickness_chance: 0.1,
            poop_chance: 0.2,
            clock: ClockAdvance::Elapsed,
            sleep_hour: 21.0,
            wake_hour: 9.0,
            initial_clock_time: 12.0,
            dead_allowed: vec![ActionKind::Revive, ActionKind::WatchVideo],
            sleep_blocked: vec![ActionKind::Feed, ActionKind::Play],
            shop: default_shop(),
        }
    }
}

/// Timings of the background tick sweep.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Delay between two sweeps; the first sweep runs immediately.
    pub tick_interval: Duration,
    /// Upper bound for ticking a single pet before it is skipped.
    pub user_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(10 * 60),
            user_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    engine: EngineConfig,
    #[serde(default)]
    scheduler: RawSchedulerConfig,
}

#[derive(Debug, Default, Deserialize)]
struct RawSchedulerConfig {
    tick_interval_secs: Option<u64>,
    user_timeout_ms: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = SchedulerConfig::default();
        let scheduler = SchedulerConfig {
            tick_interval: value
                .scheduler
                .tick_interval_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.tick_interval),
            user_timeout: value
                .scheduler
                .user_timeout_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.user_timeout),
        };

        Self {
            engine: value.engine,
            scheduler,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in shop catalog shipped with the binary.
fn default_shop() -> IndexMap<String, ShopItem> {
    let mut shop = IndexMap::new();
    shop.insert(
        "robot".to_string(),
        ShopItem {
            name: "Robot".into(),
            description: "Hire a robot sitter to prevent stat decay for 24 hours".into(),
            price: 10,
            effect: ShopEffect::DecayShield { hours: 24 },
        },
    );
    shop.insert(
        "discoball".to_string(),
        ShopItem {
            name: "Disco Ball".into(),
            description: "Instantly increase happiness to full".into(),
            price: 5,
            effect: ShopEffect::FillHappiness,
        },
    );
    shop.insert(
        "pill".to_string(),
        ShopItem {
            name: "Multivitamin".into(),
            description: "Prevents sickness for 24 hours".into(),
            price: 10,
            effect: ShopEffect::SicknessShield { hours: 24 },
        },
    );
    shop.insert(
        "cookbook".to_string(),
        ShopItem {
            name: "Gourmet Cookbook".into(),
            description: "Learn to cook special meals for the same price".into(),
            price: 50,
            effect: ShopEffect::Cookbook,
        },
    );
    shop
}
