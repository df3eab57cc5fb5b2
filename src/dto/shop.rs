use serde::Serialize;
use utoipa::ToSchema;

use crate::config::{ShopEffect, ShopItem};

/// Catalog entry as displayed by clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShopItemView {
    /// Value to send as `itemId` to `purchaseItem`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Short description.
    pub description: String,
    /// Price in coins.
    pub price: u32,
    /// Length of the protection for timed items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_hours: Option<u32>,
}

impl ShopItemView {
    /// Project catalog entry `id` for display.
    pub fn new(id: &str, item: &ShopItem) -> Self {
        let duration_hours = match item.effect {
            ShopEffect::DecayShield { hours } | ShopEffect::SicknessShield { hours } => Some(hours),
            ShopEffect::FillHappiness | ShopEffect::Cookbook => None,
        };
        Self {
            id: id.to_owned(),
            name: item.name.clone(),
            description: item.description.clone(),
            price: item.price,
            duration_hours,
        }
    }
}
