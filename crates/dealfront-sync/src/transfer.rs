//! Export and import of whole collections.

use dealfront_catalog::record::{check_unique_ids, decode_sequence};
use dealfront_catalog::{CatalogEntity, Collection, ValidationError};
use serde_json::Value;

use crate::reconciler::SyncReport;
use crate::SyncError;

/// Outcome of an accepted import.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    pub collection: Collection,
    /// Entities now in the local mirror.
    pub imported: usize,
    /// Entities the import replaced.
    pub replaced: usize,
    /// Result of pushing the imported collection to the remote.
    pub sync: SyncReport,
}

/// Serialize entities as a pretty-printed JSON array.
pub fn export_entities<T: CatalogEntity>(entities: &[T]) -> Result<String, SyncError> {
    serde_json::to_string_pretty(entities).map_err(|e| ValidationError::from(e).into())
}

/// Parse an export file back into entities.
///
/// The payload must be a JSON array. Every item must decode into a valid
/// entity and ids must be unique; otherwise the whole payload is rejected.
pub fn parse_import<T: CatalogEntity>(payload: &str) -> Result<Vec<T>, SyncError> {
    let value: Value = serde_json::from_str(payload).map_err(ValidationError::from)?;
    let entities: Vec<T> = decode_sequence(value)?;
    check_unique_ids(&entities)?;
    if T::COLLECTION.is_singleton() && entities.len() > 1 {
        return Err(ValidationError::Malformed(format!(
            "{} holds at most one record, got {}",
            T::COLLECTION,
            entities.len()
        ))
        .into());
    }
    Ok(entities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealfront_catalog::{DailyDeal, Product};

    #[test]
    fn test_export_is_a_pretty_array() {
        let exported = export_entities(&Product::defaults()).unwrap();
        assert!(exported.starts_with("[\n"));
        let back: Vec<Product> = parse_import(&exported).unwrap();
        assert_eq!(back, Product::defaults());
    }

    #[test]
    fn test_non_array_rejected() {
        let err = parse_import::<Product>(r#"{"id":"p1"}"#).unwrap_err();
        assert_eq!(
            err,
            SyncError::ValidationFailed(ValidationError::NotASequence("an object"))
        );
        assert!(parse_import::<Product>("not json").is_err());
    }

    #[test]
    fn test_malformed_item_rejects_everything() {
        let payload = r#"[
            {"id":"p1","name":"Fine","originalPrice":10,"discountPrice":5},
            {"id":"p2","name":"Broken"}
        ]"#;
        assert!(matches!(
            parse_import::<Product>(payload),
            Err(SyncError::ValidationFailed(ValidationError::Item { index: 1, .. }))
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let payload = r#"[
            {"id":"p1","name":"A","originalPrice":10,"discountPrice":5},
            {"id":"p1","name":"B","originalPrice":10,"discountPrice":5}
        ]"#;
        assert!(matches!(
            parse_import::<Product>(payload),
            Err(SyncError::ValidationFailed(ValidationError::DuplicateId(_)))
        ));
    }

    #[test]
    fn test_single_deal_only() {
        let mut deals = DailyDeal::defaults();
        let mut second = deals[0].clone();
        second.id = "another".into();
        deals.push(second);
        let payload = export_entities(&deals).unwrap();
        assert!(parse_import::<DailyDeal>(&payload).is_err());
        assert!(parse_import::<DailyDeal>("[]").unwrap().is_empty());
    }
}
