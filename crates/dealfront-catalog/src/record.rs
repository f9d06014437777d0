//! Boundary codecs between typed entities and persisted JSON.
//!
//! Both the local mirror and the remote store deal in loosely-typed JSON.
//! Everything crossing those boundaries goes through the functions here so
//! a malformed record surfaces as a [`ValidationError`] instead of leaking
//! into the catalog.

use serde_json::Value;

use crate::{CatalogEntity, ValidationError};

/// A flat field map, the shape of one remote record without its id.
pub type FieldMap = serde_json::Map<String, Value>;

const ID_FIELD: &str = "id";

/// Split an entity into the field map stored remotely (id removed).
pub fn to_fields<T: CatalogEntity>(entity: &T) -> Result<FieldMap, serde_json::Error> {
    match serde_json::to_value(entity)? {
        Value::Object(mut map) => {
            map.remove(ID_FIELD);
            Ok(map)
        }
        other => Ok(FieldMap::from_iter([("value".to_string(), other)])),
    }
}

/// Rebuild an entity from its remote key and field map.
pub fn from_fields<T: CatalogEntity>(id: &str, mut fields: FieldMap) -> Result<T, ValidationError> {
    fields.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    decode_entity(Value::Object(fields))
}

/// Decode and validate one entity.
pub fn decode_entity<T: CatalogEntity>(value: Value) -> Result<T, ValidationError> {
    let entity: T = serde_json::from_value(value)?;
    entity.validate()?;
    Ok(entity)
}

/// Decode a persisted collection snapshot.
///
/// Singleton collections are stored as a bare object (or null); sequence
/// collections as an array. `Null` decodes to an empty snapshot for both.
pub fn decode_snapshot<T: CatalogEntity>(value: Value) -> Result<Vec<T>, ValidationError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(_) => decode_sequence(value),
        Value::Object(_) if T::COLLECTION.is_singleton() => Ok(vec![decode_entity(value)?]),
        other => Err(ValidationError::NotASequence(json_kind(&other))),
    }
}

/// Decode a JSON array of entities, all-or-nothing.
///
/// The first failing item aborts the decode and is reported with its index.
pub fn decode_sequence<T: CatalogEntity>(value: Value) -> Result<Vec<T>, ValidationError> {
    let items = match value {
        Value::Array(items) => items,
        other => return Err(ValidationError::NotASequence(json_kind(&other))),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            decode_entity(item).map_err(|e| ValidationError::Item {
                index,
                source: Box::new(e),
            })
        })
        .collect()
}

/// Encode a collection snapshot in its persisted shape.
///
/// Returns `None` for an empty singleton collection, meaning the key should
/// be removed rather than written.
pub fn encode_snapshot<T: CatalogEntity>(
    entities: &[T],
) -> Result<Option<Value>, serde_json::Error> {
    if T::COLLECTION.is_singleton() {
        return entities.first().map(serde_json::to_value).transpose();
    }
    serde_json::to_value(entities).map(Some)
}

/// Reject a batch in which two entities share an id.
pub fn check_unique_ids<T: CatalogEntity>(entities: &[T]) -> Result<(), ValidationError> {
    let mut seen = std::collections::HashSet::new();
    for entity in entities {
        if !seen.insert(entity.id()) {
            return Err(ValidationError::DuplicateId(entity.id().to_string()));
        }
    }
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Banner, DailyDeal, NewProduct, Price, Product};
    use serde_json::json;

    fn widget() -> Product {
        Product::from_draft(
            "r1".to_string(),
            NewProduct::new("Widget", Price::from_decimal(100.0), Price::from_decimal(80.0))
                .with_affiliate_link("https://x"),
        )
    }

    #[test]
    fn test_fields_exclude_id() {
        let fields = to_fields(&widget()).unwrap();
        assert!(!fields.contains_key("id"));
        assert_eq!(fields["name"], json!("Widget"));
        assert_eq!(fields["originalPrice"], json!(100));
    }

    #[test]
    fn test_from_fields_restores_id() {
        let fields = to_fields(&widget()).unwrap();
        let product: Product = from_fields("r1", fields).unwrap();
        assert_eq!(product, widget());
    }

    #[test]
    fn test_from_fields_minimal_remote_record() {
        let fields = json!({
            "name": "Widget",
            "originalPrice": 100,
            "discountPrice": 80,
            "affiliateLink": "https://x"
        });
        let Value::Object(fields) = fields else { unreachable!() };
        let product: Product = from_fields("r1", fields).unwrap();
        assert_eq!(product.id.as_str(), "r1");
        assert_eq!(product.discount_price.cents, 8000);
        assert_eq!(product.category, None);
    }

    #[test]
    fn test_decode_snapshot_rejects_scalar() {
        let err = decode_snapshot::<Product>(json!("oops")).unwrap_err();
        assert_eq!(err, ValidationError::NotASequence("a string"));
    }

    #[test]
    fn test_decode_snapshot_null_is_empty() {
        assert!(decode_snapshot::<Banner>(Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_decode_sequence_reports_failing_index() {
        let value = json!([
            {"id": "1", "name": "Ok", "originalPrice": 1, "discountPrice": 1},
            {"id": "2", "name": "Broken"}
        ]);
        match decode_sequence::<Product>(value).unwrap_err() {
            ValidationError::Item { index, .. } => assert_eq!(index, 1),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_singleton_snapshot_shape() {
        let deals = DailyDeal::defaults();
        let encoded = encode_snapshot(&deals).unwrap().unwrap();
        assert!(encoded.is_object());
        let decoded: Vec<DailyDeal> = decode_snapshot(encoded).unwrap();
        assert_eq!(decoded, deals);

        assert_eq!(encode_snapshot::<DailyDeal>(&[]).unwrap(), None);
    }

    #[test]
    fn test_sequence_snapshot_shape() {
        let encoded = encode_snapshot(&[widget()]).unwrap().unwrap();
        assert!(encoded.is_array());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let batch = vec![widget(), widget()];
        assert_eq!(
            check_unique_ids(&batch),
            Err(ValidationError::DuplicateId("r1".to_string()))
        );
        assert!(check_unique_ids(&batch[..1]).is_ok());
    }
}
