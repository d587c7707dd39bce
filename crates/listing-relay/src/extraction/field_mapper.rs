//! Project raw vendor listings into the webform's field layout.
//!
//! The projection is a declarative table (output field -> vendor key) plus a
//! registry of named transforms keyed by output field. Missing vendor keys
//! never fail a mapping; the field is emitted empty.

use crate::acquisition::listing_client::ListingRecord;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::info;

/// One `(output_field, source_key)` pair of the mapping table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub output: String,
    pub source: String,
}

/// Ordered mapping table read from the `api_extraction` config object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapping {
    rules: Vec<FieldRule>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule (builder style).
    pub fn with(mut self, output: &str, source: &str) -> Self {
        self.rules.push(FieldRule {
            output: output.to_string(),
            source: source.to_string(),
        });
        self
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// A JSON object visited entry by entry keeps document order without
// depending on serde_json's `preserve_order` feature.
impl<'de> Deserialize<'de> for FieldMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MappingVisitor;

        impl<'de> Visitor<'de> for MappingVisitor {
            type Value = FieldMapping;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of output field to source key")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FieldMapping, A::Error> {
                let mut rules = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((output, source)) = access.next_entry::<String, String>()? {
                    rules.push(FieldRule { output, source });
                }
                Ok(FieldMapping { rules })
            }
        }

        deserializer.deserialize_map(MappingVisitor)
    }
}

/// A normalized record ready for delivery, in mapping order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MappedRecord {
    fields: Vec<(String, Value)>,
}

impl MappedRecord {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The record as a JSON object (field order follows serde_json's map).
    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.iter().cloned().collect())
    }

    /// Flatten into `application/x-www-form-urlencoded` pairs.
    ///
    /// Arrays become repeated keys, objects are sent as JSON text and null
    /// as an empty value.
    pub fn form_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.fields.len());
        for (name, value) in &self.fields {
            match value {
                Value::Array(items) => {
                    for item in items {
                        pairs.push((name.clone(), form_scalar(item)));
                    }
                }
                other => pairs.push((name.clone(), form_scalar(other))),
            }
        }
        pairs
    }
}

fn form_scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// A named transform applied to the raw vendor value of one output field.
pub type Transform = fn(&Value) -> Value;

/// Output field name -> transform.
#[derive(Clone)]
pub struct TransformRegistry {
    transforms: HashMap<String, Transform>,
}

impl TransformRegistry {
    /// An empty registry: every field passes through unchanged.
    pub fn empty() -> Self {
        Self {
            transforms: HashMap::new(),
        }
    }

    /// Register (or replace) the transform for an output field.
    pub fn register(&mut self, field: &str, transform: Transform) -> &mut Self {
        self.transforms.insert(field.to_string(), transform);
        self
    }

    pub fn get(&self, field: &str) -> Option<Transform> {
        self.transforms.get(field).copied()
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register("photourl", first_photo)
            .register("status", status_label);
        registry
    }
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.transforms.keys().collect();
        names.sort();
        f.debug_struct("TransformRegistry")
            .field("fields", &names)
            .finish()
    }
}

/// First photo of a photo list. Empty lists and null become `""`.
pub fn first_photo(value: &Value) -> Value {
    match value {
        Value::Array(items) => items
            .first()
            .cloned()
            .unwrap_or_else(|| Value::String(String::new())),
        Value::Null => Value::String(String::new()),
        other => other.clone(),
    }
}

/// Vendor status code -> label shown on the webform.
pub fn status_label(value: &Value) -> Value {
    let label = match value.as_str() {
        Some("comingSoon") => "Coming Soon",
        Some("active" | "openHouse" | "justListed") => "Available",
        Some("priceReduced") => "Price reduced",
        Some("sold") => "Sold",
        _ => "Available",
    };
    Value::String(label.to_string())
}

/// Applies a [`FieldMapping`] to listing records.
#[derive(Debug, Clone, Default)]
pub struct FieldMapper {
    registry: TransformRegistry,
}

impl FieldMapper {
    pub fn new(registry: TransformRegistry) -> Self {
        Self { registry }
    }

    pub fn map(&self, record: &ListingRecord, mapping: &FieldMapping) -> MappedRecord {
        let mut fields = Vec::with_capacity(mapping.len());

        for rule in mapping.rules() {
            let value = match record.get(&rule.source) {
                Some(raw) => match self.registry.get(&rule.output) {
                    Some(transform) => transform(raw),
                    None => raw.clone(),
                },
                None => {
                    info!(
                        "field {} not found in listing (source key {})",
                        rule.output, rule.source
                    );
                    Value::String(String::new())
                }
            };
            fields.push((rule.output.clone(), value));
        }

        MappedRecord { fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_eq;
    use serde_json::json;

    fn listing(value: Value) -> ListingRecord {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_mapping_preserves_document_order() {
        let mapping: FieldMapping =
            serde_json::from_str(r#"{"zip": "postalCode", "address": "fullAddress", "beds": "bedrooms"}"#)
                .unwrap();
        let outputs: Vec<_> = mapping.rules().iter().map(|r| r.output.as_str()).collect();
        assert_eq!(outputs, ["zip", "address", "beds"]);
    }

    #[test]
    fn test_mapping_rejects_non_string_sources() {
        let result: Result<FieldMapping, _> = serde_json::from_str(r#"{"zip": 5}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_map_passes_through_and_fills_missing() {
        let mapping = FieldMapping::new()
            .with("address", "fullAddress")
            .with("price", "listPrice")
            .with("agent", "agentName");
        let record = listing(json!({"fullAddress": "18 Greenbrush Court", "listPrice": 525000}));

        let mapped = FieldMapper::default().map(&record, &mapping);
        assert_eq!(mapped.len(), 3);
        assert_json_eq!(
            mapped.to_json(),
            json!({"address": "18 Greenbrush Court", "price": 525000, "agent": ""})
        );
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(status_label(&json!("sold")), json!("Sold"));
        assert_eq!(status_label(&json!("comingSoon")), json!("Coming Soon"));
        assert_eq!(status_label(&json!("openHouse")), json!("Available"));
        assert_eq!(status_label(&json!("priceReduced")), json!("Price reduced"));
        assert_eq!(status_label(&json!("unknownValue")), json!("Available"));
        assert_eq!(status_label(&json!(7)), json!("Available"));
    }

    #[test]
    fn test_first_photo() {
        assert_eq!(first_photo(&json!(["a.jpg", "b.jpg"])), json!("a.jpg"));
        assert_eq!(first_photo(&json!([])), json!(""));
        assert_eq!(first_photo(&Value::Null), json!(""));
        assert_eq!(first_photo(&json!("single.jpg")), json!("single.jpg"));
    }

    #[test]
    fn test_transforms_apply_by_output_field() {
        let mapping = FieldMapping::new()
            .with("photourl", "photos")
            .with("status", "listingStatus")
            .with("photos_raw", "photos");
        let record = listing(json!({
            "photos": ["front.jpg", "back.jpg"],
            "listingStatus": "justListed"
        }));

        let mapped = FieldMapper::default().map(&record, &mapping);
        assert_eq!(mapped.get("photourl"), Some(&json!("front.jpg")));
        assert_eq!(mapped.get("status"), Some(&json!("Available")));
        assert_eq!(mapped.get("photos_raw"), Some(&json!(["front.jpg", "back.jpg"])));
    }

    #[test]
    fn test_missing_special_field_is_empty_not_default() {
        let mapping = FieldMapping::new().with("status", "listingStatus");
        let mapped = FieldMapper::default().map(&ListingRecord::new(), &mapping);
        assert_eq!(mapped.get("status"), Some(&json!("")));
    }

    #[test]
    fn test_custom_transform_registration() {
        fn upper(value: &Value) -> Value {
            json!(value.as_str().unwrap_or_default().to_uppercase())
        }

        let mut registry = TransformRegistry::empty();
        registry.register("city", upper);
        let mapper = FieldMapper::new(registry);

        let mapping = FieldMapping::new().with("city", "city").with("status", "status");
        let record = listing(json!({"city": "hempstead", "status": "sold"}));
        let mapped = mapper.map(&record, &mapping);

        assert_eq!(mapped.get("city"), Some(&json!("HEMPSTEAD")));
        // No status transform in an empty registry.
        assert_eq!(mapped.get("status"), Some(&json!("sold")));
    }

    #[test]
    fn test_form_pairs() {
        let mapping = FieldMapping::new()
            .with("beds", "beds")
            .with("tags", "tags")
            .with("pool", "pool")
            .with("hoa", "hoa")
            .with("geo", "geo");
        let record = listing(json!({
            "beds": 3,
            "tags": ["corner", "garage"],
            "pool": false,
            "hoa": null,
            "geo": {"lat": 1.5}
        }));

        let pairs = FieldMapper::default().map(&record, &mapping).form_pairs();
        assert_eq!(
            pairs,
            vec![
                ("beds".to_string(), "3".to_string()),
                ("tags".to_string(), "corner".to_string()),
                ("tags".to_string(), "garage".to_string()),
                ("pool".to_string(), "false".to_string()),
                ("hoa".to_string(), String::new()),
                ("geo".to_string(), r#"{"lat":1.5}"#.to_string()),
            ]
        );
    }
}
