use serde::Deserialize;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::dto::validation::validate_user_id;

/// Credit issued by the payment webhook once the provider confirmed an order.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_credit_amounts"))]
pub struct CreditRequest {
    /// Buyer, who must already own a pet.
    #[validate(custom(function = "validate_user_id"))]
    pub user_id: String,
    /// Coins to add.
    #[serde(default)]
    pub coins: u32,
    /// Crowns to add.
    #[serde(default)]
    pub crowns: u32,
}

fn validate_credit_amounts(request: &CreditRequest) -> Result<(), ValidationError> {
    if request.coins == 0 && request.crowns == 0 {
        let mut err = ValidationError::new("empty_credit");
        err.message = Some("Credit must add coins or crowns".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_credit_is_rejected() {
        let request = CreditRequest {
            user_id: "42".into(),
            coins: 0,
            crowns: 0,
        };
        assert!(request.validate().is_err());

        let request = CreditRequest {
            crowns: 1,
            ..request
        };
        assert!(request.validate().is_ok());
    }
}
