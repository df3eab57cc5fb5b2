use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Document, doc},
    error::ErrorKind,
    options::IndexOptions,
};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoActivityDocument, MongoLeaderboardRow, MongoPetDocument, doc_id},
};
use crate::dao::{
    models::{ActivityEntity, LeaderboardEntity, PetEntity},
    pet_store::{ACTIVITY_LOG_CAPACITY, PetStore},
    storage::StorageResult,
};

const PET_COLLECTION_NAME: &str = "pets";
const ACTIVITY_COLLECTION_NAME: &str = "activity";
/// Server error code returned when creating a collection that already exists.
const NAMESPACE_EXISTS: i32 = 48;
const ACTIVITY_COLLECTION_BYTES: u64 = 64 * 1024;

/// [`PetStore`](crate::dao::pet_store::PetStore) backed by MongoDB collections.
#[derive(Clone)]
pub struct MongoPetStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = self.state.read().await.database.clone();
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoPetStore {
    /// Connect to MongoDB and prepare the collections and indexes.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let store = Self {
            inner: Arc::new(MongoInner {
                state: RwLock::new(MongoState { client, database }),
                config,
            }),
        };
        store.prepare_collections().await?;
        Ok(store)
    }

    async fn prepare_collections(&self) -> MongoResult<()> {
        let database = self.database().await;

        let index = IndexModel::builder()
            .keys(doc! { "coins": -1, "_id": 1 })
            .options(
                IndexOptions::builder()
                    .name(Some("pet_coins_idx".to_owned()))
                    .build(),
            )
            .build();
        database
            .collection::<Document>(PET_COLLECTION_NAME)
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::PrepareCollection {
                collection: PET_COLLECTION_NAME,
                source,
            })?;

        // A capped collection keeps insertion order and drops the oldest entries.
        let created = database
            .create_collection(ACTIVITY_COLLECTION_NAME)
            .capped(true)
            .size(ACTIVITY_COLLECTION_BYTES)
            .max(ACTIVITY_LOG_CAPACITY as u64)
            .await;
        match created {
            Ok(()) => Ok(()),
            Err(err)
                if matches!(err.kind.as_ref(), ErrorKind::Command(command) if command.code == NAMESPACE_EXISTS) =>
            {
                Ok(())
            }
            Err(source) => Err(MongoDaoError::PrepareCollection {
                collection: ACTIVITY_COLLECTION_NAME,
                source,
            }),
        }
    }

    async fn database(&self) -> Database {
        self.inner.state.read().await.database.clone()
    }

    async fn pets(&self) -> Collection<MongoPetDocument> {
        self.database().await.collection(PET_COLLECTION_NAME)
    }

    async fn activity(&self) -> Collection<MongoActivityDocument> {
        self.database().await.collection(ACTIVITY_COLLECTION_NAME)
    }

    async fn find_pet(&self, user_id: String) -> MongoResult<Option<PetEntity>> {
        let document = self
            .pets()
            .await
            .find_one(doc_id(&user_id))
            .await
            .map_err(|source| MongoDaoError::LoadPet { user_id, source })?;
        Ok(document.map(|doc| doc.pet))
    }

    async fn save_pet(&self, pet: PetEntity) -> MongoResult<()> {
        let user_id = pet.user_id.clone();
        let document = MongoPetDocument::from(pet);
        self.pets()
            .await
            .replace_one(doc_id(&user_id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SavePet { user_id, source })?;
        Ok(())
    }

    async fn list_user_ids(&self) -> MongoResult<Vec<String>> {
        let collection = self
            .database()
            .await
            .collection::<Document>(PET_COLLECTION_NAME);
        let documents: Vec<Document> = collection
            .find(doc! {})
            .projection(doc! { "_id": 1 })
            .await
            .map_err(|source| MongoDaoError::ListUsers { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListUsers { source })?;

        Ok(documents
            .iter()
            .filter_map(|doc| doc.get_str("_id").ok().map(str::to_owned))
            .collect())
    }

    async fn push_activity(&self, entry: ActivityEntity) -> MongoResult<()> {
        self.activity()
            .await
            .insert_one(MongoActivityDocument::from(entry))
            .await
            .map_err(|source| MongoDaoError::PushActivity { source })?;
        Ok(())
    }

    async fn recent_activity(&self, limit: usize) -> MongoResult<Vec<ActivityEntity>> {
        let documents: Vec<MongoActivityDocument> = self
            .activity()
            .await
            .find(doc! {})
            .sort(doc! { "$natural": -1 })
            .limit(limit as i64)
            .await
            .map_err(|source| MongoDaoError::ReadActivity { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ReadActivity { source })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn leaderboard(&self, limit: usize) -> MongoResult<Vec<LeaderboardEntity>> {
        let collection = self
            .database()
            .await
            .collection::<MongoLeaderboardRow>(PET_COLLECTION_NAME);
        let rows: Vec<MongoLeaderboardRow> = collection
            .find(doc! {})
            .projection(doc! { "coins": 1, "age": 1 })
            .sort(doc! { "coins": -1, "_id": 1 })
            .limit(limit as i64)
            .await
            .map_err(|source| MongoDaoError::Leaderboard { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Leaderboard { source })?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

impl PetStore for MongoPetStore {
    fn find_pet(&self, user_id: String) -> BoxFuture<'static, StorageResult<Option<PetEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_pet(user_id).await.map_err(Into::into) })
    }

    fn save_pet(&self, pet: PetEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_pet(pet).await.map_err(Into::into) })
    }

    fn list_user_ids(&self) -> BoxFuture<'static, StorageResult<Vec<String>>> {
        let store = self.clone();
        Box::pin(async move { store.list_user_ids().await.map_err(Into::into) })
    }

    fn push_activity(&self, entry: ActivityEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.push_activity(entry).await.map_err(Into::into) })
    }

    fn recent_activity(
        &self,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<ActivityEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.recent_activity(limit).await.map_err(Into::into) })
    }

    fn leaderboard(
        &self,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.leaderboard(limit).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
