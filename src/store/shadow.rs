//! Wire records exchanged with the document database.
//!
//! A shadow record mirrors an [`Item`] plus the revision token the database
//! requires on every write.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::store::types::Item;

/// Name of the design document holding the item view.
pub const DESIGN_DOC_NAME: &str = "todos";

/// Name of the map/reduce view inside the design document.
pub const VIEW_NAME: &str = "allTodos";

const VIEW_MAP: &str = "function(doc){if(doc.title && doc.completed != null){emit(doc.order,{title: doc.title,completed: doc.completed})}}";

/// Design document defining the `(order, {title, completed})` view with a
/// `_count` reduction.
pub fn design_document() -> Value {
    json!({
        "views": {
            VIEW_NAME: {
                "map": VIEW_MAP,
                "reduce": "_count"
            }
        }
    })
}

/// An item as stored in the document database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub completed: bool,

    #[serde(default)]
    pub order: i64,
}

impl ShadowRecord {
    /// Build a record from an item, without a revision.
    pub fn from_item(item: &Item) -> Self {
        Self {
            id: item.id.clone(),
            rev: None,
            title: item.title.clone(),
            completed: item.completed,
            order: item.order,
        }
    }

    /// Convert back to the domain item.
    pub fn into_item(self) -> Item {
        Item {
            id: self.id,
            title: self.title,
            completed: self.completed,
            order: self.order,
        }
    }
}

/// Response to a document create or update.
#[derive(Debug, Clone, Deserialize)]
pub struct WriteResponse {
    #[serde(default)]
    pub ok: bool,
    pub id: String,
    pub rev: String,
}

/// Value emitted by the view for each document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewValue {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

/// One unreduced view row: key is the item's order.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewRow {
    pub id: String,
    /// Null when the document's order is null.
    #[serde(default)]
    pub key: Option<i64>,
    #[serde(default)]
    pub value: ViewValue,
}

impl ViewRow {
    pub fn into_item(self) -> Item {
        Item {
            id: Some(self.id),
            title: self.value.title,
            completed: self.value.completed,
            order: self.key.unwrap_or(0),
        }
    }
}

/// Unreduced view result.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewRows {
    #[serde(default)]
    pub total_rows: u64,
    #[serde(default)]
    pub rows: Vec<ViewRow>,
}

/// One reduced view row carrying the `_count` value.
#[derive(Debug, Clone, Deserialize)]
pub struct ReducedRow {
    #[serde(default)]
    pub key: Value,
    pub value: u64,
}

/// Reduced view result. Empty when the view has no documents.
#[derive(Debug, Clone, Deserialize)]
pub struct ReducedRows {
    #[serde(default)]
    pub rows: Vec<ReducedRow>,
}

impl ReducedRows {
    pub fn count(&self) -> usize {
        self.rows.first().map(|r| r.value as usize).unwrap_or(0)
    }
}
