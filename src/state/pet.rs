use crate::{
    config::EngineConfig,
    dao::models::PetEntity,
    state::random::RandomSource,
};

/// Runtime representation of a single virtual pet, one per user.
#[derive(Debug, Clone, PartialEq)]
pub struct Pet {
    /// Owner identifier, primary key of the record.
    pub user_id: String,
    /// Satiety level in `[0, max_stat]`.
    pub hunger: u32,
    /// Mood level in `[0, max_stat]`.
    pub happiness: u32,
    /// Body weight in `[min_weight, max_weight]`.
    pub weight: u32,
    /// Days lived, incremented on every sleep to wake transition.
    pub age: u32,
    /// Pending droppings in `[0, poop_limit]`.
    pub poop: u32,
    /// Accumulated care mistakes; reaching the limit kills the pet.
    pub care_mistakes: u32,
    /// Whether the local clock currently falls inside the sleep window.
    pub is_sleeping: bool,
    /// Whether the pet needs medicine.
    pub is_sick: bool,
    /// Whether the room light is on.
    pub is_light_on: bool,
    /// Currency balance.
    pub coins: u32,
    /// Local hour of day in `[0, 24)`.
    pub clock_time: f64,
    /// Whether the owner already set the local clock.
    pub time_set: bool,
    /// Epoch milliseconds of the last clock advance.
    pub last_update_time: i64,
    /// Epoch milliseconds of the last video reward claim.
    pub last_video_watch_time: i64,
    /// Epoch milliseconds of the last coin drop collection.
    pub last_coin_drop: i64,
    /// Number of friends that hatched a pet with this user's referral code.
    pub referral_count: u32,
    /// Cosmetic hue rotation fixed at creation.
    pub tamahue: i32,
    /// Premium cosmetic counter.
    pub crowns: u32,
    /// Stat decay is suspended until this epoch millisecond.
    pub decay_shield_until: i64,
    /// Random sickness is suspended until this epoch millisecond.
    pub sickness_shield_until: i64,
    /// Rice meals are more nutritious once the cookbook was bought.
    pub has_cookbook: bool,
}

impl Pet {
    /// Build a freshly hatched pet for `user_id` using the configured defaults.
    pub fn hatch(user_id: String, now: i64, config: &EngineConfig, rng: &dyn RandomSource) -> Self {
        Self {
            user_id,
            hunger: config.start_stat,
            happiness: config.start_stat,
            weight: config.start_weight,
            age: 1,
            poop: 0,
            care_mistakes: 0,
            is_sleeping: false,
            is_sick: false,
            is_light_on: true,
            coins: config.starting_coins,
            clock_time: config.initial_clock_time,
            time_set: false,
            last_update_time: now,
            last_video_watch_time: 0,
            last_coin_drop: 0,
            referral_count: 0,
            tamahue: rng.hue(),
            crowns: 0,
            decay_shield_until: 0,
            sickness_shield_until: 0,
            has_cookbook: false,
        }
    }

    /// Re-initialise the life-cycle fields in place, keeping the economy and
    /// cosmetic progression (coins, crowns, referrals, hue).
    pub fn rehatch(&self, now: i64, config: &EngineConfig) -> Self {
        Self {
            user_id: self.user_id.clone(),
            hunger: config.start_stat,
            happiness: config.start_stat,
            weight: config.start_weight,
            age: 1,
            poop: 0,
            care_mistakes: 0,
            is_sleeping: false,
            is_sick: false,
            is_light_on: true,
            coins: self.coins,
            clock_time: config.initial_clock_time,
            time_set: false,
            last_update_time: now,
            last_video_watch_time: self.last_video_watch_time,
            last_coin_drop: self.last_coin_drop,
            referral_count: self.referral_count,
            tamahue: self.tamahue,
            crowns: self.crowns,
            decay_shield_until: 0,
            sickness_shield_until: 0,
            has_cookbook: self.has_cookbook,
        }
    }

    /// A pet is dead once its care mistakes reach the configured limit.
    pub fn is_dead(&self, config: &EngineConfig) -> bool {
        self.care_mistakes >= config.care_mistake_limit
    }
}

impl From<PetEntity> for Pet {
    fn from(value: PetEntity) -> Self {
        Self {
            user_id: value.user_id,
            hunger: value.hunger,
            happiness: value.happiness,
            weight: value.weight,
            age: value.age,
            poop: value.poop,
            care_mistakes: value.care_mistakes,
            is_sleeping: value.is_sleeping,
            is_sick: value.is_sick,
            is_light_on: value.is_light_on,
            coins: value.coins,
            clock_time: value.clock_time,
            time_set: value.time_set,
            last_update_time: value.last_update_time,
            last_video_watch_time: value.last_video_watch_time,
            last_coin_drop: value.last_coin_drop,
            referral_count: value.referral_count,
            tamahue: value.tamahue,
            crowns: value.crowns,
            decay_shield_until: value.decay_shield_until,
            sickness_shield_until: value.sickness_shield_until,
            has_cookbook: value.has_cookbook,
        }
    }
}

impl From<Pet> for PetEntity {
    fn from(value: Pet) -> Self {
        Self {
            user_id: value.user_id,
            hunger: value.hunger,
            happiness: value.happiness,
            weight: value.weight,
            age: value.age,
            poop: value.poop,
            care_mistakes: value.care_mistakes,
            is_sleeping: value.is_sleeping,
            is_sick: value.is_sick,
            is_light_on: value.is_light_on,
            coins: value.coins,
            clock_time: value.clock_time,
            time_set: value.time_set,
            last_update_time: value.last_update_time,
            last_video_watch_time: value.last_video_watch_time,
            last_coin_drop: value.last_coin_drop,
            referral_count: value.referral_count,
            tamahue: value.tamahue,
            crowns: value.crowns,
            decay_shield_until: value.decay_shield_until,
            sickness_shield_until: value.sickness_shield_until,
            has_cookbook: value.has_cookbook,
        }
    }
}
