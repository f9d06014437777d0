//! The common shape every catalog entity shares.

use serde::{de::DeserializeOwned, Serialize};
use std::fmt;

use crate::{Collection, ValidationError};

/// A record kind stored in one catalog collection.
///
/// Implemented by [`Product`](crate::Product), [`Banner`](crate::Banner) and
/// [`DailyDeal`](crate::DailyDeal). The sync layer is written once against
/// this trait and instantiated per collection.
pub trait CatalogEntity:
    Serialize + DeserializeOwned + Clone + PartialEq + fmt::Debug + Send + Sync + 'static
{
    /// The entity without its id, as submitted for creation.
    type Draft: Clone + fmt::Debug + Send + Sync + 'static;

    /// Collection this entity lives in.
    const COLLECTION: Collection;

    /// The entity id as a string.
    fn id(&self) -> &str;

    /// Build the entity from a freshly assigned id and a draft.
    fn from_draft(id: String, draft: Self::Draft) -> Self;

    /// Check field-level rules that decoding alone cannot express.
    fn validate(&self) -> Result<(), ValidationError>;

    /// The bundled dataset shown when no other source has data.
    fn defaults() -> Vec<Self>;
}
