//! Action dispatcher: loads a pet, runs the engine, persists the result and
//! fans out the side effects.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::pet_store::PetStore,
    dto::{
        pet::{ActionRequest, ActionResponse, CreatePetRequest, PetView},
        payment::CreditRequest,
        shop::ShopItemView,
    },
    error::ServiceError,
    services::pet_events::{publish_pet, record_activity},
    state::{
        SharedState,
        engine::{self, ActionKind, PetAction},
        now_ms,
        pet::Pet,
    },
};

const HATCHED_ACTION: &str = "hatched";
const REFERRAL_ACTION: &str = "referral";
const CREDIT_ACTION: &str = "credit";

enum Creation {
    Existing(Pet),
    Hatched { pet: Pet, referrer: Option<String> },
}

/// Hatch a pet for the requested (or a generated) user id.
///
/// Creation is idempotent: an existing pet is returned unchanged and no
/// referral bonus is granted twice.
pub async fn create_pet(
    state: &SharedState,
    request: CreatePetRequest,
) -> Result<PetView, ServiceError> {
    let store = state.require_store().await?;
    let config = &state.config().engine;
    let user_id = request
        .user_id
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    let referral_code = request.referral_code.filter(|code| *code != user_id);

    let creation = state
        .with_pet_lock(&user_id, || async {
            if let Some(existing) = store.find_pet(user_id.clone()).await? {
                return Ok(Creation::Existing(existing.into()));
            }

            let mut pet = Pet::hatch(user_id.clone(), now_ms(), config, state.rng());
            let referrer = match referral_code {
                Some(code) => store.find_pet(code.clone()).await?.map(|_| code),
                None => None,
            };
            if referrer.is_some() {
                pet.coins = pet.coins.saturating_add(config.referee_bonus);
            }

            store.save_pet(pet.clone().into()).await?;
            Ok(Creation::Hatched { pet, referrer })
        })
        .await?;

    match creation {
        Creation::Existing(pet) => {
            debug!(user_id = %pet.user_id, "pet already exists");
            Ok(PetView::from(&pet))
        }
        Creation::Hatched { pet, referrer } => {
            info!(user_id = %pet.user_id, referred_by = ?referrer, "pet hatched");
            record_activity(state, store.as_ref(), &pet.user_id, HATCHED_ACTION, pet.last_update_time)
                .await;
            publish_pet(state, &pet);

            if let Some(referrer_id) = referrer {
                if let Err(err) = reward_referrer(state, store.as_ref(), &referrer_id).await {
                    warn!(referrer_id, error = %err, "failed to credit referral bonus");
                }
            }
            Ok(PetView::from(&pet))
        }
    }
}

async fn reward_referrer(
    state: &SharedState,
    store: &dyn PetStore,
    referrer_id: &str,
) -> Result<(), ServiceError> {
    let config = &state.config().engine;
    let rewarded = state
        .with_pet_lock(referrer_id, || async {
            let referrer = load_pet(store, referrer_id).await?;
            let rewarded = engine::referral_bonus(&referrer, config);
            store.save_pet(rewarded.clone().into()).await?;
            Ok(rewarded)
        })
        .await?;

    record_activity(state, store, referrer_id, REFERRAL_ACTION, now_ms()).await;
    publish_pet(state, &rewarded);
    state.notifier().notify(
        referrer_id,
        "A friend hatched a KodoMochi with your link, enjoy your bonus coins!",
    );
    Ok(())
}

/// Current state of the pet owned by `user_id`.
pub async fn get_pet(state: &SharedState, user_id: &str) -> Result<PetView, ServiceError> {
    let store = state.require_store().await?;
    let pet = load_pet(store.as_ref(), user_id).await?;
    Ok(PetView::from(&pet))
}

/// Resolve the action named in a request path together with its parameters.
pub fn parse_action(name: &str, body: ActionRequest) -> Result<PetAction, ServiceError> {
    let kind = ActionKind::from_name(name)
        .ok_or_else(|| ServiceError::InvalidInput(format!("unknown action `{name}`")))?;
    body.into_action(kind).map_err(ServiceError::InvalidInput)
}

/// Apply `action` to the pet of `user_id` under its lock, then persist and notify.
pub async fn perform_action(
    state: &SharedState,
    user_id: &str,
    action: PetAction,
) -> Result<ActionResponse, ServiceError> {
    let store = state.require_store().await?;
    let config = &state.config().engine;
    let kind = action.kind();

    let outcome = state
        .with_pet_lock(user_id, || async {
            let pet = load_pet(store.as_ref(), user_id).await?;
            let outcome = engine::apply_action(&pet, &action, now_ms(), config, state.rng())
                .inspect_err(|rule| {
                    debug!(user_id, action = kind.as_str(), reason = %rule, "action rejected");
                })?;
            store.save_pet(outcome.pet.clone().into()).await?;
            Ok(outcome)
        })
        .await?;

    info!(user_id, action = kind.as_str(), won = ?outcome.won, "action applied");
    record_activity(state, store.as_ref(), user_id, kind.as_str(), now_ms()).await;
    publish_pet(state, &outcome.pet);

    Ok(ActionResponse {
        pet: PetView::from(&outcome.pet),
        won: outcome.won,
    })
}

/// Credit coins and crowns confirmed by the payment provider.
pub async fn credit(state: &SharedState, request: CreditRequest) -> Result<PetView, ServiceError> {
    let store = state.require_store().await?;
    let user_id = request.user_id.as_str();

    let credited = state
        .with_pet_lock(user_id, || async {
            let pet = load_pet(store.as_ref(), user_id).await?;
            let credited = engine::credit(&pet, request.coins, request.crowns);
            store.save_pet(credited.clone().into()).await?;
            Ok(credited)
        })
        .await?;

    info!(user_id, coins = request.coins, crowns = request.crowns, "payment credited");
    record_activity(state, store.as_ref(), user_id, CREDIT_ACTION, now_ms()).await;
    publish_pet(state, &credited);
    Ok(PetView::from(&credited))
}

/// Static shop catalog in display order.
pub fn shop_catalog(state: &SharedState) -> Vec<ShopItemView> {
    state
        .config()
        .engine
        .shop
        .iter()
        .map(|(id, item)| ShopItemView::new(id, item))
        .collect()
}

async fn load_pet(store: &dyn PetStore, user_id: &str) -> Result<Pet, ServiceError> {
    store
        .find_pet(user_id.to_owned())
        .await?
        .map(Pet::from)
        .ok_or_else(|| ServiceError::NotFound(format!("no pet for user `{user_id}`")))
}
