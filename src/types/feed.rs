//! Feed items and pages
//!
//! A feed endpoint answers with a JSON array of post objects, newest first.
//! Only the fields needed for synchronization are decoded; the rest of the
//! object travels untouched as the item payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// One record of a feed page.
///
/// `id` is the post GUID and is the only de-duplication key. The pod's
/// numeric id is kept as metadata because it differs between pods for the
/// same federated post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: String,
    pub numeric_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub payload: Value,
}

#[derive(Deserialize)]
struct ItemHeader {
    guid: String,
    #[serde(default)]
    id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl FeedItem {
    /// Decode the synchronization fields out of a raw post object
    pub fn from_payload(payload: Value) -> Result<Self> {
        let header = ItemHeader::deserialize(&payload)?;
        Ok(Self {
            id: header.guid,
            numeric_id: header.id,
            created_at: header.created_at,
            payload,
        })
    }
}

/// The items returned by one feed request, in server order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamPage {
    items: Vec<FeedItem>,
}

impl StreamPage {
    pub fn new(items: Vec<FeedItem>) -> Self {
        Self { items }
    }

    /// Decode a JSON array response body
    pub fn parse(body: &str) -> Result<Self> {
        let raw: Vec<Value> = serde_json::from_str(body)?;
        let items = raw
            .into_iter()
            .map(FeedItem::from_payload)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { items })
    }

    /// Oldest timestamp on the page. Items inside a page are not guaranteed
    /// to be sorted, so this scans all of them.
    pub fn oldest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.items.iter().map(|item| item.created_at).min()
    }

    pub fn items(&self) -> &[FeedItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<FeedItem> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Outcome of a point read against a single resource
#[derive(Debug, Clone, PartialEq)]
pub enum Presence {
    Found(Value),
    Gone,
}

impl Presence {
    pub fn is_gone(&self) -> bool {
        matches!(self, Presence::Gone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_keys_on_guid() {
        let item = FeedItem::from_payload(json!({
            "id": 42,
            "guid": "a1b2c3",
            "created_at": "2013-05-01T10:00:00Z",
            "text": "hello"
        }))
        .unwrap();

        assert_eq!(item.id, "a1b2c3");
        assert_eq!(item.numeric_id, Some(42));
        assert_eq!(item.payload["text"], "hello");
    }

    #[test]
    fn test_item_without_guid_is_rejected() {
        let result = FeedItem::from_payload(json!({
            "id": 42,
            "created_at": "2013-05-01T10:00:00Z"
        }));
        assert!(matches!(result, Err(crate::Error::Json(_))));
    }

    #[test]
    fn test_page_oldest_timestamp_scans_unsorted_items() {
        let page = StreamPage::parse(
            r#"[
                {"guid": "a", "created_at": "2013-05-03T00:00:00Z"},
                {"guid": "b", "created_at": "2013-05-01T00:00:00Z"},
                {"guid": "c", "created_at": "2013-05-02T00:00:00Z"}
            ]"#,
        )
        .unwrap();

        assert_eq!(page.len(), 3);
        assert_eq!(
            page.oldest_timestamp().unwrap().to_rfc3339(),
            "2013-05-01T00:00:00+00:00"
        );
    }

    #[test]
    fn test_empty_page() {
        let page = StreamPage::parse("[]").unwrap();
        assert!(page.is_empty());
        assert_eq!(page.oldest_timestamp(), None);
    }

    #[test]
    fn test_non_array_body_is_rejected() {
        assert!(StreamPage::parse(r#"{"error": "nope"}"#).is_err());
    }
}
