use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::navigate::{get, get_array, get_str};
use crate::path;

/// Value of an extracted field: a single text or an ordered list of texts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Apply `f` to every string held by this value.
    pub fn map_strings(&mut self, mut f: impl FnMut(&str) -> String) {
        match self {
            FieldValue::Text(text) => *text = f(text),
            FieldValue::List(items) => {
                for item in items.iter_mut() {
                    *item = f(item);
                }
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Text(text)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::List(items)
    }
}

/// Insertion-ordered map of extracted fields.
///
/// Inserting an existing key replaces the value and keeps the key's
/// original position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldMap(IndexMap<String, FieldValue>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field. Returns the previous value if the key was present.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Merge `other` into `self`, later values winning. Returns the keys
    /// that were overwritten.
    pub fn merge(&mut self, other: FieldMap) -> Vec<String> {
        other
            .0
            .into_iter()
            .filter_map(|(key, value)| self.0.insert(key.clone(), value).map(|_| key))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut FieldValue> {
        self.0.values_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Flat extraction result for one listing.
///
/// Serializes as a single JSON object: `listing_id` first, then every
/// extracted field in the order it was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedListing {
    pub listing_id: String,
    #[serde(flatten)]
    pub fields: FieldMap,
}

impl ParsedListing {
    pub fn new(listing_id: impl Into<String>) -> Self {
        Self {
            listing_id: listing_id.into(),
            fields: FieldMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// True when nothing beyond `listing_id` could be extracted.
    pub fn is_bare(&self) -> bool {
        self.fields.is_empty()
    }
}

/// One flattened search-API result, as written to the dump CSV.
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
pub struct SearchRecord {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    #[serde(rename = "isSuperhost")]
    pub is_superhost: bool,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub persons: i64,
    pub rating: f64,
    #[serde(rename = "reviewsCount")]
    pub reviews_count: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "cancelPolicy")]
    pub cancel_policy: String,
    pub deeplink: String,
    #[serde(rename = "hostThumbnail")]
    pub host_thumbnail: String,
    pub price_currency: String,
    pub price_rate: f64,
    pub price_total: f64,
    pub bathrooms: f64,
    pub bedrooms: i64,
    pub beds: i64,
    #[serde(rename = "previewAmenities")]
    pub preview_amenities: String,
    pub url: String,
    /// JSON array of image URLs.
    pub images: String,
    /// JSON array of amenity ids.
    #[serde(rename = "amenityIds")]
    pub amenity_ids: String,
}

impl SearchRecord {
    /// Flatten one entry of the search API's `results` array.
    pub fn from_result(result: &Value) -> Self {
        let text = |key: &str| get(result, &path![key]).map(plain_string).unwrap_or_default();
        let int = |key: &str| get(result, &path![key]).and_then(as_i64).unwrap_or(0);
        let float = |key: &str| get(result, &path![key]).and_then(as_f64).unwrap_or(0.0);
        let price = |key: &str| {
            get(result, &path!["price", key])
                .and_then(as_f64)
                .unwrap_or(0.0)
        };

        let preview_amenities = get_array(result, &path!["previewAmenities"])
            .iter()
            .map(plain_string)
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            id: text("id"),
            user_id: text("userId"),
            name: text("name"),
            address: text("address"),
            city: text("city"),
            is_superhost: get(result, &path!["isSuperhost"])
                .and_then(Value::as_bool)
                .unwrap_or(false),
            lat: get(result, &path!["lat"]).and_then(as_f64),
            lng: get(result, &path!["lng"]).and_then(as_f64),
            persons: int("persons"),
            rating: float("rating"),
            reviews_count: int("reviewsCount"),
            kind: text("type"),
            cancel_policy: text("cancelPolicy"),
            deeplink: text("deeplink"),
            host_thumbnail: text("hostThumbnail"),
            price_currency: get_str(result, &path!["price", "currency"])
                .unwrap_or_default()
                .to_string(),
            price_rate: price("rate"),
            price_total: price("total"),
            bathrooms: float("bathrooms"),
            bedrooms: int("bedrooms"),
            beds: int("beds"),
            preview_amenities,
            url: text("url"),
            images: json_array_string(result, "images"),
            amenity_ids: json_array_string(result, "amenityIds"),
        }
    }
}

/// Render a scalar without JSON quoting: strings verbatim, numbers and
/// booleans via `to_string`, `null` as empty.
pub fn plain_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        other => other.as_f64(),
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        other => other.as_i64().or_else(|| other.as_f64().map(|f| f as i64)),
    }
}

fn json_array_string(result: &Value, key: &str) -> String {
    let items = get_array(result, &path![key]);
    Value::Array(items.to_vec()).to_string()
}
