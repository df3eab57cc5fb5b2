use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dto::validation::validate_user_id,
    state::{
        engine::{ActionKind, FoodType, PetAction},
        pet::Pet,
    },
};

/// Payload used to hatch a pet.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePetRequest {
    /// Messaging-platform identity; a random id is generated when omitted.
    #[validate(custom(function = "validate_user_id"))]
    pub user_id: Option<String>,
    /// User id of the friend who shared their referral link.
    #[validate(custom(function = "validate_user_id"))]
    pub referral_code: Option<String>,
}

/// Food accepted by the `feed` action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FoodInput {
    /// See [`FoodType::Rice`].
    Rice,
    /// See [`FoodType::Candy`].
    Candy,
}

impl From<FoodInput> for FoodType {
    fn from(value: FoodInput) -> Self {
        match value {
            FoodInput::Rice => FoodType::Rice,
            FoodInput::Candy => FoodType::Candy,
        }
    }
}

/// Action-specific parameters of `POST /pets/{userId}/{action}`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    /// Required by `feed`.
    pub food_type: Option<FoodInput>,
    /// Required by `purchaseItem`.
    pub item_id: Option<String>,
    /// Local hour, required by `setTime`.
    pub hours: Option<u32>,
    /// Local minute, required by `setTime`.
    pub minutes: Option<u32>,
}

impl ActionRequest {
    /// Combine the action named in the path with its body parameters.
    pub fn into_action(self, kind: ActionKind) -> Result<PetAction, String> {
        let action = match kind {
            ActionKind::Feed => {
                let food = self.food_type.ok_or("feed requires a foodType")?;
                PetAction::Feed(food.into())
            }
            ActionKind::Play => PetAction::Play,
            ActionKind::Clean => PetAction::Clean,
            ActionKind::ToggleLight => PetAction::ToggleLight,
            ActionKind::Medicine => PetAction::Medicine,
            ActionKind::Revive => PetAction::Revive,
            ActionKind::WatchVideo => PetAction::WatchVideo,
            ActionKind::SetTime => match (self.hours, self.minutes) {
                (Some(hours), Some(minutes)) => PetAction::SetTime { hours, minutes },
                _ => return Err("setTime requires hours and minutes".into()),
            },
            ActionKind::BuyCrown => PetAction::BuyCrown,
            ActionKind::PurchaseItem => {
                let item_id = self.item_id.ok_or("purchaseItem requires an itemId")?;
                PetAction::PurchaseItem(item_id)
            }
            ActionKind::CollectCoin => PetAction::CollectCoin,
            ActionKind::Reset => PetAction::Reset,
        };
        Ok(action)
    }
}

/// Body of `POST /pets/{userId}/setTime`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SetTimeRequest {
    /// Local hour.
    #[validate(range(max = 23))]
    pub hours: u32,
    /// Local minute.
    #[validate(range(max = 59))]
    pub minutes: u32,
}

/// Full pet snapshot as exposed to clients.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PetView {
    /// Owner identity, also the pet key.
    pub user_id: String,
    /// Fullness, `0` is starving.
    pub hunger: u32,
    /// Mood, `0` is miserable.
    pub happiness: u32,
    /// Grows with meals, shrinks with play.
    pub weight: u32,
    /// Days lived, counted at each wake-up.
    pub age: u32,
    /// Droppings waiting to be cleaned.
    pub poop: u32,
    /// Neglect counter; the pet dies at the configured limit.
    pub care_mistakes: u32,
    /// Set during the sleep window.
    pub is_sleeping: bool,
    /// Cured by medicine.
    pub is_sick: bool,
    /// Room light state.
    pub is_light_on: bool,
    /// Spendable balance.
    pub coins: u32,
    /// In-game hour as a fraction, `0.0..24.0`.
    pub clock_time: f64,
    /// Whether the owner aligned the clock with their local time.
    pub time_set: bool,
    /// Epoch milliseconds of the last tick or clock change.
    pub last_update_time: i64,
    /// Epoch milliseconds of the last video reward.
    pub last_video_watch_time: i64,
    /// Epoch milliseconds of the last collected coin drop.
    pub last_coin_drop: i64,
    /// Friends who hatched a pet through this owner's link.
    pub referral_count: u32,
    /// Cosmetic hue of the pet sprite.
    pub tamahue: i32,
    /// Premium currency.
    pub crowns: u32,
    /// Epoch milliseconds until which stats do not decay.
    pub decay_shield_until: i64,
    /// Epoch milliseconds until which the pet cannot fall sick.
    pub sickness_shield_until: i64,
    /// Whether rice meals grant the cookbook bonus.
    pub has_cookbook: bool,
}

impl From<&Pet> for PetView {
    fn from(pet: &Pet) -> Self {
        Self {
            user_id: pet.user_id.clone(),
            hunger: pet.hunger,
            happiness: pet.happiness,
            weight: pet.weight,
            age: pet.age,
            poop: pet.poop,
            care_mistakes: pet.care_mistakes,
            is_sleeping: pet.is_sleeping,
            is_sick: pet.is_sick,
            is_light_on: pet.is_light_on,
            coins: pet.coins,
            clock_time: pet.clock_time,
            time_set: pet.time_set,
            last_update_time: pet.last_update_time,
            last_video_watch_time: pet.last_video_watch_time,
            last_coin_drop: pet.last_coin_drop,
            referral_count: pet.referral_count,
            tamahue: pet.tamahue,
            crowns: pet.crowns,
            decay_shield_until: pet.decay_shield_until,
            sickness_shield_until: pet.sickness_shield_until,
            has_cookbook: pet.has_cookbook,
        }
    }
}

/// Updated pet returned by the action endpoints.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActionResponse {
    /// Pet after the action.
    #[serde(flatten)]
    pub pet: PetView,
    /// Minigame outcome, only present for `play`.
    pub won: Option<bool>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn feed_requires_food_type() {
        let err = ActionRequest::default()
            .into_action(ActionKind::Feed)
            .unwrap_err();
        assert!(err.contains("foodType"));

        let body: ActionRequest = serde_json::from_value(json!({ "foodType": "candy" })).unwrap();
        assert_eq!(
            body.into_action(ActionKind::Feed).unwrap(),
            PetAction::Feed(FoodType::Candy)
        );
    }

    #[test]
    fn parameterless_actions_ignore_the_body() {
        let body: ActionRequest = serde_json::from_value(json!({ "itemId": "robot" })).unwrap();
        assert_eq!(body.into_action(ActionKind::Clean).unwrap(), PetAction::Clean);
    }

    #[test]
    fn set_time_range_is_validated() {
        assert!(SetTimeRequest { hours: 23, minutes: 59 }.validate().is_ok());
        assert!(SetTimeRequest { hours: 24, minutes: 0 }.validate().is_err());
        assert!(SetTimeRequest { hours: 8, minutes: 60 }.validate().is_err());
    }

    #[test]
    fn create_request_checks_ids() {
        let ok: CreatePetRequest =
            serde_json::from_value(json!({ "userId": "42", "referralCode": "7" })).unwrap();
        assert!(ok.validate().is_ok());

        let bad: CreatePetRequest =
            serde_json::from_value(json!({ "userId": "a b" })).unwrap();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn won_flag_only_serialized_for_play() {
        let pet = Pet::hatch(
            "42".into(),
            0,
            &Default::default(),
            &crate::state::random::ScriptedRandom::never(),
        );
        let plain = serde_json::to_value(ActionResponse {
            pet: PetView::from(&pet),
            won: None,
        })
        .unwrap();
        assert_eq!(plain["userId"], "42");
        assert_eq!(plain["careMistakes"], 0);
        assert!(plain.get("won").is_none());

        let played = serde_json::to_value(ActionResponse {
            pet: PetView::from(&pet),
            won: Some(true),
        })
        .unwrap();
        assert_eq!(played["won"], true);
    }
}
