use crate::{
    dao::pet_store::ACTIVITY_LOG_CAPACITY,
    dto::activity::{ActivityEntry, LeaderboardEntry, LeaderboardQuery},
    error::ServiceError,
    state::SharedState,
};

/// Latest actions performed by any user, newest first.
pub async fn recent_activity(state: &SharedState) -> Result<Vec<ActivityEntry>, ServiceError> {
    let store = state.require_store().await?;
    let entries = store.recent_activity(ACTIVITY_LOG_CAPACITY).await?;
    Ok(entries.into_iter().map(ActivityEntry::from).collect())
}

/// Richest pets, recomputed from the stored records on every call.
pub async fn leaderboard(
    state: &SharedState,
    query: &LeaderboardQuery,
) -> Result<Vec<LeaderboardEntry>, ServiceError> {
    let store = state.require_store().await?;
    let rows = store.leaderboard(query.limit()).await?;
    Ok(rows.into_iter().map(LeaderboardEntry::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::{models::ActivityEntity, pet_store::PetStore},
        dto::pet::CreatePetRequest,
        services::pet_service,
        state::testing::test_app,
    };

    #[tokio::test]
    async fn activity_feed_is_capped_and_newest_first() {
        let app = test_app(AppConfig::default()).await;
        for timestamp in 0..60 {
            app.store
                .push_activity(ActivityEntity {
                    user_id: "42".into(),
                    action: "play".into(),
                    timestamp,
                })
                .await
                .unwrap();
        }

        let feed = recent_activity(&app.state).await.unwrap();
        assert_eq!(feed.len(), ACTIVITY_LOG_CAPACITY);
        assert_eq!(feed[0].timestamp, 59);
        assert_eq!(feed.last().unwrap().timestamp, 10);
    }

    #[tokio::test]
    async fn leaderboard_reflects_current_coins() {
        let app = test_app(AppConfig::default()).await;
        for user in ["alice", "bob", "carol"] {
            pet_service::create_pet(
                &app.state,
                CreatePetRequest {
                    user_id: Some(user.into()),
                    referral_code: None,
                },
            )
            .await
            .unwrap();
        }
        let mut bob = app.store.find_pet("bob".into()).await.unwrap().unwrap();
        bob.coins = 12;
        app.store.save_pet(bob).await.unwrap();

        let top = leaderboard(&app.state, &LeaderboardQuery { limit: Some(2) })
            .await
            .unwrap();
        let users: Vec<_> = top.iter().map(|row| row.user_id.as_str()).collect();
        assert_eq!(users, ["bob", "alice"]);
        assert_eq!(top[0].coins, 12);
    }
}
