//! Document database backend.
//!
//! # Responsibilities
//! - Create the database and the item view on first use
//! - Answer `get_all`/`count` from the view instead of scanning documents
//! - Carry the revision token on every write (fetch, then write)
//!
//! # Design Decisions
//! - The revision protocol is two explicit steps (`current_revision`, then
//!   `write_with_revision`/`delete_with_revision`), so a concurrent writer
//!   can slip in between them; the database rejects the stale write
//! - A missing document is a `StoreError`, not an absent result
//! - No client-side locking

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use url::Url;

use crate::store::shadow::{
    design_document, ReducedRows, ShadowRecord, ViewRows, WriteResponse, DESIGN_DOC_NAME,
    VIEW_NAME,
};
use crate::store::types::{Item, StoreError, StoreResult};
use crate::store::Store;

/// Connection settings for the document database.
#[derive(Clone)]
pub struct DocumentEndpoint {
    /// Server base URL without credentials.
    pub base_url: Url,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl DocumentEndpoint {
    /// Parse a server URL, moving any embedded `user:password@` into basic
    /// auth credentials.
    pub fn parse(raw: &str) -> StoreResult<Self> {
        let mut base_url = Url::parse(raw)
            .map_err(|e| StoreError::Config(format!("invalid document store URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Config(format!(
                "document store URL '{}' cannot carry a path",
                raw
            )));
        }

        let username = Some(base_url.username().to_string()).filter(|u| !u.is_empty());
        let password = base_url.password().map(str::to_string);
        // Both setters only fail for cannot-be-a-base URLs, rejected above.
        let _ = base_url.set_username("");
        let _ = base_url.set_password(None);

        Ok(Self {
            base_url,
            username,
            password,
        })
    }

    /// Replace the credentials, keeping the URL.
    pub fn with_credentials(mut self, username: Option<String>, password: Option<String>) -> Self {
        if username.is_some() {
            self.username = username;
            self.password = password;
        }
        self
    }
}

impl std::fmt::Debug for DocumentEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentEndpoint")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .finish()
    }
}

/// Item store backed by a revisioned document database.
pub struct DocumentStore {
    client: Client,
    endpoint: DocumentEndpoint,
    db_url: Url,
    database: String,
}

impl DocumentStore {
    /// Connect to the database, creating it and the item view if missing.
    pub async fn connect(endpoint: DocumentEndpoint, database: &str) -> StoreResult<Self> {
        Self::with_client(Client::new(), endpoint, database).await
    }

    /// Like [`DocumentStore::connect`] with a caller-supplied HTTP client.
    pub async fn with_client(
        client: Client,
        endpoint: DocumentEndpoint,
        database: &str,
    ) -> StoreResult<Self> {
        let mut db_url = endpoint.base_url.clone();
        db_url
            .path_segments_mut()
            .map_err(|_| StoreError::Config("document store URL cannot carry a path".into()))?
            .pop_if_empty()
            .push(database);

        let store = Self {
            client,
            endpoint,
            db_url,
            database: database.to_string(),
        };

        store.ensure_database().await?;
        store.ensure_design_document().await?;

        tracing::info!(
            url = %store.endpoint.base_url,
            database = %store.database,
            "Document store ready"
        );
        Ok(store)
    }

    /// Name of the database holding the items.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// URL of the database extended by `segments`.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.db_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    fn view_url(&self, reduce: bool) -> Url {
        let mut url = self.url(&["_design", DESIGN_DOC_NAME, "_view", VIEW_NAME]);
        url.query_pairs_mut()
            .append_pair("reduce", if reduce { "true" } else { "false" });
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.endpoint.username {
            Some(user) => builder.basic_auth(user, self.endpoint.password.as_deref()),
            None => builder,
        }
    }

    async fn send(&self, operation: &'static str, builder: RequestBuilder) -> StoreResult<Response> {
        builder
            .send()
            .await
            .map_err(|source| StoreError::Http { operation, source })
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        operation: &'static str,
        response: Response,
    ) -> StoreResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|source| StoreError::Http { operation, source })
    }

    async fn ensure_database(&self) -> StoreResult<()> {
        self.ensure_resource("create database", self.db_url.clone(), None).await
    }

    async fn ensure_design_document(&self) -> StoreResult<()> {
        let url = self.url(&["_design", DESIGN_DOC_NAME]);
        self.ensure_resource("create design document", url, Some(design_document()))
            .await
    }

    /// GET `url`; on 404 PUT it (with `body` when given) and require
    /// 201 Created or 202 Accepted.
    async fn ensure_resource(
        &self,
        operation: &'static str,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> StoreResult<()> {
        let existing = self
            .send(operation, self.request(Method::GET, url.clone()))
            .await?;
        match existing.status() {
            StatusCode::NOT_FOUND => {}
            s if s.is_success() => {
                tracing::debug!(url = %url, "Resource already exists");
                return Ok(());
            }
            s => {
                tracing::warn!(url = %url, status = %s, "Unexpected status probing resource, continuing");
                return Ok(());
            }
        }

        tracing::info!(url = %url, "Resource missing, creating it");
        let mut create = self.request(Method::PUT, url);
        if let Some(body) = body {
            create = create.json(&body);
        }
        let created = self.send(operation, create).await?;
        match created.status() {
            StatusCode::CREATED | StatusCode::ACCEPTED => Ok(()),
            s => Err(StoreError::Status {
                operation,
                status: s.as_u16(),
            }),
        }
    }

    /// Step one of every write: fetch the stored record and its revision.
    pub async fn current_revision(&self, id: &str) -> StoreResult<ShadowRecord> {
        const OP: &str = "fetch document";
        let response = self.send(OP, self.request(Method::GET, self.url(&[id]))).await?;
        if response.status() != StatusCode::OK {
            return Err(StoreError::Status {
                operation: OP,
                status: response.status().as_u16(),
            });
        }
        Self::decode(OP, response).await
    }

    /// Step two of an update: PUT the record with its revision as precondition.
    /// Only 201 Created counts as success.
    pub async fn write_with_revision(&self, record: &ShadowRecord) -> StoreResult<WriteResponse> {
        const OP: &str = "update document";
        let (id, rev) = Self::identity(record)?;
        let mut url = self.url(&[id]);
        url.query_pairs_mut().append_pair("rev", rev);

        let response = self
            .send(OP, self.request(Method::PUT, url).json(record))
            .await?;
        if response.status() != StatusCode::CREATED {
            tracing::warn!(id = %id, rev = %rev, status = %response.status(), "Revisioned write rejected");
            return Err(StoreError::Status {
                operation: OP,
                status: response.status().as_u16(),
            });
        }
        let written: WriteResponse = Self::decode(OP, response).await?;
        tracing::debug!(id = %written.id, rev = %written.rev, "Document updated");
        Ok(written)
    }

    /// Step two of a delete: DELETE with the revision as precondition.
    /// Only 200 OK counts as success.
    pub async fn delete_with_revision(&self, id: &str, rev: &str) -> StoreResult<()> {
        const OP: &str = "delete document";
        let mut url = self.url(&[id]);
        url.query_pairs_mut().append_pair("rev", rev);

        let response = self.send(OP, self.request(Method::DELETE, url)).await?;
        if response.status() != StatusCode::OK {
            tracing::warn!(id = %id, rev = %rev, status = %response.status(), "Revisioned delete rejected");
            return Err(StoreError::Status {
                operation: OP,
                status: response.status().as_u16(),
            });
        }
        tracing::debug!(id = %id, rev = %rev, "Document deleted");
        Ok(())
    }

    fn identity(record: &ShadowRecord) -> StoreResult<(&str, &str)> {
        match (record.id.as_deref(), record.rev.as_deref()) {
            (Some(id), Some(rev)) => Ok((id, rev)),
            _ => Err(StoreError::Malformed(
                "revisioned write needs both _id and _rev".into(),
            )),
        }
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("endpoint", &self.endpoint)
            .field("database", &self.database)
            .finish()
    }
}

#[async_trait]
impl Store for DocumentStore {
    fn backend(&self) -> &'static str {
        "document"
    }

    async fn get_all(&self) -> StoreResult<Vec<Item>> {
        const OP: &str = "list documents";
        let response = self
            .send(OP, self.request(Method::GET, self.view_url(false)))
            .await?;
        if response.status() != StatusCode::OK {
            return Err(StoreError::Status {
                operation: OP,
                status: response.status().as_u16(),
            });
        }
        let view: ViewRows = Self::decode(OP, response).await?;
        Ok(view.rows.into_iter().map(|row| row.into_item()).collect())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Item>> {
        let record = self.current_revision(id).await?;
        Ok(Some(record.into_item()))
    }

    async fn persist(&self, item: Item) -> StoreResult<Item> {
        const OP: &str = "create document";
        let mut record = ShadowRecord::from_item(&item);
        record.id = None;

        let response = self
            .send(OP, self.request(Method::POST, self.db_url.clone()).json(&record))
            .await?;
        if response.status() != StatusCode::CREATED {
            return Err(StoreError::Status {
                operation: OP,
                status: response.status().as_u16(),
            });
        }
        let created: WriteResponse = Self::decode(OP, response).await?;
        tracing::debug!(id = %created.id, rev = %created.rev, "Document created");
        Ok(item.with_id(created.id))
    }

    async fn update(&self, id: &str, item: Item) -> StoreResult<Option<Item>> {
        let current = self.current_revision(id).await?;

        let mut record = ShadowRecord::from_item(&item);
        record.id = Some(id.to_string());
        record.rev = current.rev;

        let written = self.write_with_revision(&record).await?;
        Ok(Some(item.with_id(written.id)))
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let current = self.current_revision(id).await?;
        let rev = current
            .rev
            .ok_or_else(|| StoreError::Malformed(format!("document {} has no _rev", id)))?;
        self.delete_with_revision(id, &rev).await
    }

    async fn count(&self) -> StoreResult<usize> {
        const OP: &str = "count documents";
        let response = self
            .send(OP, self.request(Method::GET, self.view_url(true)))
            .await?;
        if response.status() != StatusCode::OK {
            return Err(StoreError::Status {
                operation: OP,
                status: response.status().as_u16(),
            });
        }
        let reduced: ReducedRows = Self::decode(OP, response).await?;
        Ok(reduced.count())
    }
}
