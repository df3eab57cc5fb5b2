use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::from_value;
use tracing::debug;

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        ACTIVITY_DOC_ID, AllDocsResponse, CouchActivityDocument, CouchPetDocument, END_SUFFIX,
        PET_PREFIX, pet_doc_id, user_id_from_doc_id,
    },
};
use crate::dao::{
    models::{ActivityEntity, LeaderboardEntity, PetEntity},
    pet_store::{ACTIVITY_LOG_CAPACITY, PetStore, rank_leaderboard},
    storage::StorageResult,
};

const ALL_DOCS: &str = "_all_docs";
const MAX_WRITE_ATTEMPTS: u32 = 5;

/// [`PetStore`](crate::dao::pet_store::PetStore) backed by a CouchDB database.
#[derive(Clone)]
pub struct CouchPetStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchPetStore {
    /// Connect to CouchDB and create the database when missing.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let store = Self {
            client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            database: Arc::from(config.database),
            auth: config
                .username
                .zip(config.password)
                .map(|(user, pass)| (Arc::from(user), Arc::from(pass))),
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.auth {
            Some((ref user, ref pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.database_url(), path);
        self.authorize(self.client.request(method, url))
    }

    async fn database_status(&self) -> CouchResult<StatusCode> {
        let response = self
            .authorize(self.client.get(self.database_url()))
            .send()
            .await
            .map_err(|source| CouchDaoError::Database {
                database: self.database.to_string(),
                source,
            })?;
        Ok(response.status())
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        match self.database_status().await? {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .authorize(self.client.put(self.database_url()))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::Database {
                        database: database.clone(),
                        source,
                    })?;
                if create.status().is_success() {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_string(),
                        source,
                    }
                })
            }
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<()>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: response.status(),
            })
        }
    }

    async fn all_docs(&self, prefix: &str, include_docs: bool) -> CouchResult<AllDocsResponse> {
        let query = [
            ("include_docs", include_docs.to_string()),
            ("startkey", format!("\"{prefix}\"")),
            ("endkey", format!("\"{prefix}{END_SUFFIX}\"")),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)
            .query(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: ALL_DOCS.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: ALL_DOCS.to_string(),
                status: response.status(),
            });
        }

        response
            .json::<AllDocsResponse>()
            .await
            .map_err(|source| CouchDaoError::DecodeResponse {
                path: ALL_DOCS.to_string(),
                source,
            })
    }

    async fn list_documents<T>(&self, prefix: &str) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let payload = self.all_docs(prefix, true).await?;
        payload
            .rows
            .into_iter()
            .filter_map(|row| row.doc.map(|doc| (row.id, doc)))
            .map(|(id, doc)| {
                from_value(doc).map_err(|source| CouchDaoError::DeserializeValue { path: id, source })
            })
            .collect()
    }

    async fn save_pet(&self, pet: PetEntity) -> CouchResult<()> {
        let doc_id = pet_doc_id(&pet.user_id);
        let mut doc = CouchPetDocument::from((pet, None));
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            doc.rev = self
                .get_document::<CouchPetDocument>(&doc_id)
                .await?
                .and_then(|existing| existing.rev);
            match self.put_document(&doc_id, &doc).await {
                Err(err) if err.is_conflict() => {
                    debug!(doc_id, attempt, "revision conflict while saving pet");
                }
                other => return other,
            }
        }
        Err(CouchDaoError::Contended {
            path: doc_id,
            attempts: MAX_WRITE_ATTEMPTS,
        })
    }

    async fn push_activity(&self, entry: ActivityEntity) -> CouchResult<()> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut doc = self
                .get_document::<CouchActivityDocument>(ACTIVITY_DOC_ID)
                .await?
                .unwrap_or_else(CouchActivityDocument::empty);
            doc.push(entry.clone(), ACTIVITY_LOG_CAPACITY);
            match self.put_document(ACTIVITY_DOC_ID, &doc).await {
                Err(err) if err.is_conflict() => {
                    debug!(attempt, "revision conflict while appending activity");
                }
                other => return other,
            }
        }
        Err(CouchDaoError::Contended {
            path: ACTIVITY_DOC_ID.to_string(),
            attempts: MAX_WRITE_ATTEMPTS,
        })
    }
}

impl PetStore for CouchPetStore {
    fn find_pet(&self, user_id: String) -> BoxFuture<'static, StorageResult<Option<PetEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = store
                .get_document::<CouchPetDocument>(&pet_doc_id(&user_id))
                .await?;
            Ok(doc.map(|doc| doc.pet))
        })
    }

    fn save_pet(&self, pet: PetEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_pet(pet).await.map_err(Into::into) })
    }

    fn list_user_ids(&self) -> BoxFuture<'static, StorageResult<Vec<String>>> {
        let store = self.clone();
        Box::pin(async move {
            let payload = store.all_docs(PET_PREFIX, false).await?;
            Ok(payload
                .rows
                .iter()
                .filter_map(|row| user_id_from_doc_id(&row.id).map(str::to_owned))
                .collect())
        })
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
        Box::pin(async move {
            let doc = store
                .get_document::<CouchActivityDocument>(ACTIVITY_DOC_ID)
                .await?;
            Ok(doc
                .map(|doc| doc.entries.into_iter().take(limit).collect())
                .unwrap_or_default())
        })
    }

    fn leaderboard(
        &self,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let docs = store.list_documents::<CouchPetDocument>(PET_PREFIX).await?;
            let rows = docs
                .iter()
                .map(|doc| LeaderboardEntity::from(&doc.pet))
                .collect();
            Ok(rank_leaderboard(rows, limit))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let status = store.database_status().await?;
            if status.is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::DatabaseStatus {
                    database: store.database.to_string(),
                    status,
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
