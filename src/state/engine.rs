//! Pet state engine: pure transition functions applying user actions and
//! periodic ticks to a [`Pet`].
//!
//! Every function takes the current pet by reference and returns a new value;
//! a rejected action never yields a partially updated pet.

use serde::Deserialize;
use thiserror::Error;

use crate::{
    config::{ClockAdvance, EngineConfig, ShopEffect},
    state::{pet::Pet, random::RandomSource},
};

const HOUR_MS: i64 = 60 * 60 * 1000;
const MINUTE_MS: f64 = 60.0 * 1000.0;

/// Food that can be fed to the pet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoodType {
    /// Cheap meal raising hunger.
    Rice,
    /// Treat raising happiness.
    Candy,
}

/// Discriminant of [`PetAction`], used by the capability table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    /// See [`PetAction::Feed`].
    Feed,
    /// See [`PetAction::Play`].
    Play,
    /// See [`PetAction::Clean`].
    Clean,
    /// See [`PetAction::ToggleLight`].
    ToggleLight,
    /// See [`PetAction::Medicine`].
    Medicine,
    /// See [`PetAction::Revive`].
    Revive,
    /// See [`PetAction::WatchVideo`].
    WatchVideo,
    /// See [`PetAction::SetTime`].
    SetTime,
    /// See [`PetAction::BuyCrown`].
    BuyCrown,
    /// See [`PetAction::PurchaseItem`].
    PurchaseItem,
    /// See [`PetAction::CollectCoin`].
    CollectCoin,
    /// See [`PetAction::Reset`].
    Reset,
}

impl ActionKind {
    /// Name used in URLs and in the activity log.
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Feed => "feed",
            ActionKind::Play => "play",
            ActionKind::Clean => "clean",
            ActionKind::ToggleLight => "toggleLight",
            ActionKind::Medicine => "medicine",
            ActionKind::Revive => "revive",
            ActionKind::WatchVideo => "watchVideo",
            ActionKind::SetTime => "setTime",
            ActionKind::BuyCrown => "buyCrown",
            ActionKind::PurchaseItem => "purchaseItem",
            ActionKind::CollectCoin => "collectCoin",
            ActionKind::Reset => "reset",
        }
    }

    /// Parse the action name found in a request path.
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "feed" => ActionKind::Feed,
            "play" => ActionKind::Play,
            "clean" => ActionKind::Clean,
            "toggleLight" => ActionKind::ToggleLight,
            "medicine" => ActionKind::Medicine,
            "revive" => ActionKind::Revive,
            "watchVideo" => ActionKind::WatchVideo,
            "setTime" => ActionKind::SetTime,
            "buyCrown" => ActionKind::BuyCrown,
            "purchaseItem" => ActionKind::PurchaseItem,
            "collectCoin" => ActionKind::CollectCoin,
            "reset" => ActionKind::Reset,
            _ => return None,
        };
        Some(kind)
    }
}

/// User-initiated event applied to a pet.
#[derive(Debug, Clone, PartialEq)]
pub enum PetAction {
    /// Buy and serve a meal.
    Feed(FoodType),
    /// Minigame; may raise happiness, always burns weight.
    Play,
    /// Remove all droppings for a reward.
    Clean,
    /// Switch the light; turning it on over a sleeping pet is a care mistake.
    ToggleLight,
    /// Cure sickness.
    Medicine,
    /// Bring a dead pet back as a fresh hatchling.
    Revive,
    /// Claim the video reward.
    WatchVideo,
    /// Align the in-game clock with the owner's local time, once.
    SetTime {
        /// Local hour, `0..=23`.
        hours: u32,
        /// Local minute, `0..=59`.
        minutes: u32,
    },
    /// Exchange coins for a crown.
    BuyCrown,
    /// Buy a shop item by id.
    PurchaseItem(String),
    /// Claim the periodic coin drop.
    CollectCoin,
    /// Pay to start over with a new hatchling.
    Reset,
}

impl PetAction {
    /// Capability-table discriminant of this action.
    pub fn kind(&self) -> ActionKind {
        match self {
            PetAction::Feed(_) => ActionKind::Feed,
            PetAction::Play => ActionKind::Play,
            PetAction::Clean => ActionKind::Clean,
            PetAction::ToggleLight => ActionKind::ToggleLight,
            PetAction::Medicine => ActionKind::Medicine,
            PetAction::Revive => ActionKind::Revive,
            PetAction::WatchVideo => ActionKind::WatchVideo,
            PetAction::SetTime { .. } => ActionKind::SetTime,
            PetAction::BuyCrown => ActionKind::BuyCrown,
            PetAction::PurchaseItem(_) => ActionKind::PurchaseItem,
            PetAction::CollectCoin => ActionKind::CollectCoin,
            PetAction::Reset => ActionKind::Reset,
        }
    }
}

/// Business-rule rejection of an action. The pet is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// Only revive and reward claims are accepted once the pet is dead.
    #[error("your pet has passed away")]
    PetDeceased,
    /// The action cannot be performed while the pet sleeps.
    #[error("your pet is sleeping")]
    PetSleeping,
    /// Balance below the price of the action.
    #[error("not enough coins (need {required}, have {available})")]
    InsufficientFunds {
        /// Price of the action.
        required: u32,
        /// Current balance.
        available: u32,
    },
    /// Weight at the minimum: playing is not allowed.
    #[error("too weak to play")]
    TooWeak,
    /// No poop to clean.
    #[error("nothing to clean")]
    NothingToClean,
    /// Medicine given to a healthy pet.
    #[error("doesn't need medicine now")]
    NotSick,
    /// The local clock can only be set once.
    #[error("time has already been set")]
    TimeAlreadySet,
    /// Time-gated reward claimed during its cooldown.
    #[error("reward not available yet (retry in {retry_in_ms} ms)")]
    RewardNotAvailable {
        /// Milliseconds until the reward can be claimed.
        retry_in_ms: i64,
    },
    /// Revive requested for a living pet.
    #[error("your pet is still alive")]
    StillAlive,
    /// Purchase of an item missing from the catalog.
    #[error("unknown shop item `{0}`")]
    UnknownItem(String),
    /// Clock value outside of a day.
    #[error("invalid time {hours}:{minutes:02}")]
    InvalidTime {
        /// Requested hour.
        hours: u32,
        /// Requested minute.
        minutes: u32,
    },
}

/// Result of a successful action.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome {
    /// Pet after the action.
    pub pet: Pet,
    /// Minigame result, only set for `play`.
    pub won: Option<bool>,
}

/// Condition worth telling the owner about, raised while ticking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickNotice {
    /// Hunger reached zero.
    Hungry,
    /// Happiness reached zero.
    Sad,
    /// The pet fell sick.
    Sick,
    /// A new dropping appeared.
    Pooped,
    /// The sleep window started.
    FellAsleep,
    /// The sleep window ended.
    WokeUp,
    /// Care mistakes reached the limit.
    Died,
}

impl TickNotice {
    /// Human-readable message forwarded to the messaging sink.
    pub fn message(self) -> &'static str {
        match self {
            TickNotice::Hungry => "Your KodoMochi is hungry. Feed it now to avoid a care mistake.",
            TickNotice::Sad => "Your KodoMochi is sad. Play with it to make it happy.",
            TickNotice::Sick => "Your KodoMochi is sick, time for a potion.",
            TickNotice::Pooped => "Your KodoMochi pooped, you should clean it up.",
            TickNotice::FellAsleep => {
                "Your KodoMochi is sleeping, turn the light off to give it a good night rest."
            }
            TickNotice::WokeUp => "Your KodoMochi is awake. :)",
            TickNotice::Died => "Your KodoMochi has passed away. Revive it to start over.",
        }
    }
}

/// Result of ticking a living pet.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    /// Pet after the tick.
    pub pet: Pet,
    /// Notifications raised during the tick, in evaluation order.
    pub notices: Vec<TickNotice>,
}

/// Apply a user action, returning the updated pet or the rule it violates.
pub fn apply_action(
    pet: &Pet,
    action: &PetAction,
    now: i64,
    config: &EngineConfig,
    rng: &dyn RandomSource,
) -> Result<ActionOutcome, ActionError> {
    let kind = action.kind();
    if pet.is_dead(config) && !config.dead_allowed.contains(&kind) {
        return Err(ActionError::PetDeceased);
    }
    if pet.is_sleeping && config.sleep_blocked.contains(&kind) {
        return Err(ActionError::PetSleeping);
    }

    let mut next = pet.clone();
    let mut won = None;

    match action {
        PetAction::Feed(food) => {
            let cost = match food {
                FoodType::Rice => config.rice_cost,
                FoodType::Candy => config.candy_cost,
            };
            spend(&mut next, cost)?;
            match food {
                FoodType::Rice => {
                    let gain = if next.has_cookbook {
                        1 + config.cookbook_rice_bonus
                    } else {
                        1
                    };
                    next.hunger = (next.hunger + gain).min(config.max_stat);
                }
                FoodType::Candy => {
                    next.happiness = (next.happiness + 1).min(config.max_stat);
                }
            }
            next.weight = (next.weight + 1).min(config.max_weight);
            if next.weight >= config.max_weight {
                next.is_sick = true;
            }
        }
        PetAction::Play => {
            if next.weight <= config.min_weight {
                return Err(ActionError::TooWeak);
            }
            let outcome = rng.chance(config.play_win_chance);
            if outcome {
                next.happiness = (next.happiness + 1).min(config.max_stat);
            }
            next.weight = next.weight.saturating_sub(1).max(config.min_weight);
            won = Some(outcome);
        }
        PetAction::Clean => {
            if next.poop == 0 {
                return Err(ActionError::NothingToClean);
            }
            next.poop = 0;
            next.coins = next.coins.saturating_add(config.clean_reward);
        }
        PetAction::ToggleLight => {
            next.is_light_on = !next.is_light_on;
            if next.is_sleeping && next.is_light_on {
                add_care_mistakes(&mut next, 1, config);
            }
        }
        PetAction::Medicine => {
            if !next.is_sick {
                return Err(ActionError::NotSick);
            }
            spend(&mut next, config.medicine_cost)?;
            next.is_sick = false;
        }
        PetAction::Revive => {
            if !pet.is_dead(config) {
                return Err(ActionError::StillAlive);
            }
            spend(&mut next, config.revive_fee)?;
            next = next.rehatch(now, config);
        }
        PetAction::WatchVideo => {
            claim_reward(
                now,
                &mut next.last_video_watch_time,
                config.video_cooldown_ms,
            )?;
            next.coins = next.coins.saturating_add(config.video_reward);
        }
        PetAction::SetTime { hours, minutes } => {
            if next.time_set {
                return Err(ActionError::TimeAlreadySet);
            }
            if *hours > 23 || *minutes > 59 {
                return Err(ActionError::InvalidTime {
                    hours: *hours,
                    minutes: *minutes,
                });
            }
            next.clock_time = f64::from(*hours) + f64::from(*minutes) / 60.0;
            next.time_set = true;
            next.last_update_time = now;
            next.is_sleeping = config.is_sleep_time(next.clock_time);
            next.is_light_on = !next.is_sleeping;
        }
        PetAction::BuyCrown => {
            spend(&mut next, config.crown_price)?;
            next.crowns = next.crowns.saturating_add(1);
        }
        PetAction::PurchaseItem(item_id) => {
            let item = config
                .shop
                .get(item_id)
                .ok_or_else(|| ActionError::UnknownItem(item_id.clone()))?;
            spend(&mut next, item.price)?;
            match item.effect {
                ShopEffect::DecayShield { hours } => {
                    next.decay_shield_until = shield_end(next.decay_shield_until, now, hours);
                }
                ShopEffect::SicknessShield { hours } => {
                    next.sickness_shield_until =
                        shield_end(next.sickness_shield_until, now, hours);
                }
                ShopEffect::FillHappiness => next.happiness = config.max_stat,
                ShopEffect::Cookbook => next.has_cookbook = true,
            }
        }
        PetAction::CollectCoin => {
            claim_reward(now, &mut next.last_coin_drop, config.coin_drop_cooldown_ms)?;
            next.coins = next.coins.saturating_add(config.coin_drop_reward);
        }
        PetAction::Reset => {
            spend(&mut next, config.reset_fee)?;
            next = next.rehatch(now, config);
        }
    }

    Ok(ActionOutcome { pet: next, won })
}

/// Apply the passive tick to a pet. Dead pets are not ticked at all.
///
/// Random draws happen in a fixed order while awake: hunger decay, happiness
/// decay, sickness, poop. Shields skip their draws entirely.
pub fn tick(
    pet: &Pet,
    now: i64,
    config: &EngineConfig,
    rng: &dyn RandomSource,
) -> Option<TickOutcome> {
    if pet.is_dead(config) {
        return None;
    }

    let mut next = pet.clone();
    let mut notices = Vec::new();

    next.clock_time = advance_clock(pet, now, config);
    let sleep_time = config.is_sleep_time(next.clock_time);

    if !pet.is_sleeping {
        // Care mistakes judge the state the pet was left in since the last tick.
        let mut mistakes = 0;
        if pet.hunger == 0 || pet.happiness == 0 {
            mistakes += 1;
            notices.push(if pet.hunger == 0 {
                TickNotice::Hungry
            } else {
                TickNotice::Sad
            });
        }
        if pet.is_sick {
            mistakes += 1;
            notices.push(TickNotice::Sick);
        }
        if pet.poop > 0 && pet.poop + 1 == config.poop_limit {
            notices.push(TickNotice::Pooped);
        }
        if pet.poop >= config.poop_limit {
            mistakes += 1;
            next.poop = 0;
        }
        add_care_mistakes(&mut next, mistakes, config);

        // Broke owners always get something to clean.
        if pet.coins == 0 {
            next.poop = (next.poop + 1).min(config.poop_limit);
        }

        if now >= pet.decay_shield_until {
            if rng.chance(config.hunger_decay_chance) {
                next.hunger = next.hunger.saturating_sub(1);
            }
            if rng.chance(config.happiness_decay_chance) {
                next.happiness = next.happiness.saturating_sub(1);
            }
        }
        if now >= pet.sickness_shield_until && rng.chance(config.sickness_chance) {
            next.is_sick = true;
        }
        if next.poop < config.poop_limit && rng.chance(config.poop_chance) {
            next.poop += 1;
        }
    }

    if sleep_time && !pet.is_sleeping {
        next.is_sleeping = true;
        notices.push(TickNotice::FellAsleep);
    } else if !sleep_time && pet.is_sleeping {
        next.is_sleeping = false;
        next.is_light_on = true;
        next.care_mistakes = 0;
        next.age += 1;
        next.poop = (next.poop + 1).min(config.poop_limit);
        notices.push(TickNotice::WokeUp);
    }

    next.last_update_time = now;

    if next.is_dead(config) {
        notices.push(TickNotice::Died);
    }

    Some(TickOutcome { pet: next, notices })
}

/// Credit the referrer of a newly hatched pet.
pub fn referral_bonus(referrer: &Pet, config: &EngineConfig) -> Pet {
    let mut next = referrer.clone();
    next.coins = next.coins.saturating_add(config.referral_bonus);
    next.referral_count += 1;
    next
}

/// Credit coins and crowns bought through an external payment provider.
pub fn credit(pet: &Pet, coins: u32, crowns: u32) -> Pet {
    let mut next = pet.clone();
    next.coins = next.coins.saturating_add(coins);
    next.crowns = next.crowns.saturating_add(crowns);
    next
}

fn spend(pet: &mut Pet, cost: u32) -> Result<(), ActionError> {
    if pet.coins < cost {
        return Err(ActionError::InsufficientFunds {
            required: cost,
            available: pet.coins,
        });
    }
    pet.coins -= cost;
    Ok(())
}

fn claim_reward(now: i64, last_claim: &mut i64, cooldown_ms: i64) -> Result<(), ActionError> {
    let elapsed = now - *last_claim;
    if elapsed < cooldown_ms {
        return Err(ActionError::RewardNotAvailable {
            retry_in_ms: cooldown_ms - elapsed,
        });
    }
    *last_claim = now;
    Ok(())
}

fn add_care_mistakes(pet: &mut Pet, count: u32, config: &EngineConfig) {
    pet.care_mistakes = (pet.care_mistakes + count).min(config.care_mistake_limit);
}

fn shield_end(current_end: i64, now: i64, hours: u32) -> i64 {
    current_end.max(now) + i64::from(hours) * HOUR_MS
}

fn advance_clock(pet: &Pet, now: i64, config: &EngineConfig) -> f64 {
    let hours = match config.clock {
        ClockAdvance::Elapsed => {
            let elapsed_minutes = (now - pet.last_update_time).max(0) as f64 / MINUTE_MS;
            elapsed_minutes / 60.0
        }
        ClockAdvance::FixedStep { hours } => hours,
    };
    let clock = (pet.clock_time + hours).rem_euclid(24.0);
    // rem_euclid can round up to exactly 24.0 for tiny negative inputs.
    if clock >= 24.0 { 0.0 } else { clock }
}
