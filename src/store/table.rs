//! Object-store backend keyed by server-generated ObjectIds.
//!
//! Records carry `_id`, `title`, `completed` and `order`. There is no
//! server-side count: `count` is the length of a full scan.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Bson, Document},
    Client, Collection,
};

use crate::store::types::{Item, StoreError, StoreResult};
use crate::store::Store;

/// Item store backed by a MongoDB-compatible collection.
#[derive(Debug, Clone)]
pub struct TableStore {
    collection: Collection<Document>,
}

impl TableStore {
    /// Connect using a connection string and check the server answers. The
    /// database named in the URI is used when present, `fallback_database`
    /// otherwise.
    pub async fn connect(
        uri: &str,
        fallback_database: &str,
        collection: &str,
    ) -> StoreResult<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|source| StoreError::Table { operation: "connect", source })?;
        let database = client
            .default_database()
            .unwrap_or_else(|| client.database(fallback_database));

        // The driver connects lazily; ping so unreachable servers and bad
        // credentials fail here rather than on the first request.
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| StoreError::Table { operation: "connect", source })?;

        tracing::info!(
            database = %database.name(),
            collection = %collection,
            "Table store ready"
        );
        Ok(Self::from_collection(database.collection::<Document>(collection)))
    }

    /// Wrap an existing collection handle.
    pub fn from_collection(collection: Collection<Document>) -> Self {
        Self { collection }
    }

    async fn find_by_id(&self, id: ObjectId) -> StoreResult<Option<Item>> {
        let found = self
            .collection
            .find_one(doc! { "_id": id })
            .await
            .map_err(|source| StoreError::Table { operation: "find item", source })?;
        found.as_ref().map(item_from_record).transpose()
    }
}

/// Parse an identifier into the backend's native id.
pub fn parse_id(id: &str) -> StoreResult<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| StoreError::InvalidId(id.to_string()))
}

/// Build a full backend record. `_id` is omitted when absent so the server
/// generates one.
pub fn record_from_item(item: &Item, id: Option<ObjectId>) -> Document {
    let mut record = doc! {
        "title": item.title.as_str(),
        "completed": item.completed,
        "order": item.order,
    };
    if let Some(id) = id {
        record.insert("_id", id);
    }
    record
}

/// Convert a backend record to an item.
pub fn item_from_record(record: &Document) -> StoreResult<Item> {
    let id = record
        .get_object_id("_id")
        .map_err(|e| StoreError::Malformed(format!("record _id: {}", e)))?;
    let order = match record.get("order") {
        Some(Bson::Int32(v)) => i64::from(*v),
        Some(Bson::Int64(v)) => *v,
        Some(Bson::Double(v)) if v.fract() == 0.0 => *v as i64,
        None | Some(Bson::Null) => 0,
        Some(other) => {
            return Err(StoreError::Malformed(format!(
                "record {} has non-integer order {}",
                id, other
            )))
        }
    };

    Ok(Item {
        id: Some(id.to_hex()),
        title: record.get_str("title").unwrap_or_default().to_string(),
        completed: record.get_bool("completed").unwrap_or(false),
        order,
    })
}

#[async_trait]
impl Store for TableStore {
    fn backend(&self) -> &'static str {
        "table"
    }

    async fn get_all(&self) -> StoreResult<Vec<Item>> {
        const OP: &str = "scan items";
        let mut cursor = self
            .collection
            .find(doc! {})
            .await
            .map_err(|source| StoreError::Table { operation: OP, source })?;

        let mut items = Vec::new();
        while let Some(record) = cursor
            .try_next()
            .await
            .map_err(|source| StoreError::Table { operation: OP, source })?
        {
            items.push(item_from_record(&record)?);
        }
        Ok(items)
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Item>> {
        // An id that does not parse cannot name a stored record.
        let Ok(oid) = ObjectId::parse_str(id) else {
            return Ok(None);
        };
        self.find_by_id(oid).await
    }

    async fn persist(&self, item: Item) -> StoreResult<Item> {
        let record = record_from_item(&item, None);
        let inserted = self
            .collection
            .insert_one(record)
            .await
            .map_err(|source| StoreError::Table { operation: "insert item", source })?;

        let oid = match inserted.inserted_id {
            Bson::ObjectId(oid) => oid,
            other => {
                return Err(StoreError::Malformed(format!(
                    "insert returned non-ObjectId id {}",
                    other
                )))
            }
        };
        tracing::debug!(id = %oid, "Item inserted");

        self.find_by_id(oid)
            .await?
            .ok_or_else(|| StoreError::Malformed(format!("inserted record {} not found", oid)))
    }

    async fn update(&self, id: &str, item: Item) -> StoreResult<Option<Item>> {
        let oid = parse_id(id)?;
        let replacement = record_from_item(&item, Some(oid));
        let result = self
            .collection
            .replace_one(doc! { "_id": oid }, replacement)
            .await
            .map_err(|source| StoreError::Table { operation: "update item", source })?;
        tracing::debug!(id = %oid, matched = result.matched_count, "Item replaced");

        self.find_by_id(oid).await
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let oid = parse_id(id)?;
        let result = self
            .collection
            .delete_one(doc! { "_id": oid })
            .await
            .map_err(|source| StoreError::Table { operation: "delete item", source })?;
        tracing::debug!(id = %oid, deleted = result.deleted_count, "Item removed");
        Ok(())
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.get_all().await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_omits_absent_id() {
        let record = record_from_item(&Item::new("t", true, 2), None);
        assert!(record.get("_id").is_none());
        assert_eq!(record.get_str("title").unwrap(), "t");
        assert!(record.get_bool("completed").unwrap());
        assert_eq!(record.get_i64("order").unwrap(), 2);
    }

    #[test]
    fn test_record_round_trip_with_id() {
        let oid = ObjectId::new();
        let record = record_from_item(&Item::new("t", false, 5), Some(oid));
        let item = item_from_record(&record).unwrap();
        assert_eq!(item, Item::new("t", false, 5).with_id(oid.to_hex()));
        assert_eq!(item.id.unwrap().len(), 24);
    }

    #[test]
    fn test_item_from_record_tolerates_missing_fields() {
        let oid = ObjectId::new();
        let item = item_from_record(&doc! { "_id": oid, "order": 3_i32 }).unwrap();
        assert_eq!(item.title, "");
        assert!(!item.completed);
        assert_eq!(item.order, 3);
    }

    #[test]
    fn test_item_from_record_rejects_bad_order() {
        let record = doc! { "_id": ObjectId::new(), "order": "first" };
        assert!(matches!(item_from_record(&record), Err(StoreError::Malformed(_))));
    }

    #[test]
    fn test_item_from_record_requires_object_id() {
        let record = doc! { "_id": "plain-string", "title": "x" };
        assert!(matches!(item_from_record(&record), Err(StoreError::Malformed(_))));
    }

    #[test]
    fn test_parse_id() {
        assert!(parse_id("507f1f77bcf86cd799439011").is_ok());
        assert!(matches!(parse_id("xyz"), Err(StoreError::InvalidId(id)) if id == "xyz"));
    }
}
