//! Affiliate product types.

use crate::ids::ProductId;
use crate::price::Price;
use crate::{defaults, CatalogEntity, Collection, ValidationError};
use serde::{Deserialize, Serialize};

/// A product as submitted by the admin panel, before an id is assigned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    /// Product name.
    pub name: String,
    /// Image URL.
    #[serde(default)]
    pub image: String,
    /// List price before discount.
    pub original_price: Price,
    /// Price the affiliate link currently sells at.
    pub discount_price: Price,
    /// Optional category label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Outbound affiliate URL.
    #[serde(default)]
    pub affiliate_link: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

impl NewProduct {
    /// Create a draft with the required fields.
    pub fn new(name: impl Into<String>, original_price: Price, discount_price: Price) -> Self {
        Self {
            name: name.into(),
            image: String::new(),
            original_price,
            discount_price,
            category: None,
            affiliate_link: String::new(),
            description: String::new(),
        }
    }

    /// Set the image URL.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Set the category label.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the affiliate link.
    pub fn with_affiliate_link(mut self, link: impl Into<String>) -> Self {
        self.affiliate_link = link.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Percentage saved versus the original price.
    ///
    /// Negative when the discount price exceeds the original price. The
    /// catalog stores such listings unchanged; rendering them is a display
    /// concern.
    pub fn discount_percent(&self) -> f64 {
        self.original_price.percent_off(self.discount_price)
    }

    /// Check the field rules shared by products and deals.
    pub(crate) fn validate_fields(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        check_price("originalPrice", self.original_price)?;
        check_price("discountPrice", self.discount_price)?;
        Ok(())
    }
}

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique product identifier.
    pub id: ProductId,
    /// Product name.
    pub name: String,
    /// Image URL.
    #[serde(default)]
    pub image: String,
    /// List price before discount.
    pub original_price: Price,
    /// Price the affiliate link currently sells at.
    pub discount_price: Price,
    /// Optional category label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Outbound affiliate URL.
    #[serde(default)]
    pub affiliate_link: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

impl Product {
    /// Build a product from an id and a draft.
    pub fn new(id: ProductId, draft: NewProduct) -> Self {
        Self {
            id,
            name: draft.name,
            image: draft.image,
            original_price: draft.original_price,
            discount_price: draft.discount_price,
            category: draft.category,
            affiliate_link: draft.affiliate_link,
            description: draft.description,
        }
    }

    /// Strip the id, e.g. to feed the product into a new daily deal.
    pub fn to_draft(&self) -> NewProduct {
        NewProduct {
            name: self.name.clone(),
            image: self.image.clone(),
            original_price: self.original_price,
            discount_price: self.discount_price,
            category: self.category.clone(),
            affiliate_link: self.affiliate_link.clone(),
            description: self.description.clone(),
        }
    }

    /// Percentage saved versus the original price (negative if priced above it).
    pub fn discount_percent(&self) -> f64 {
        self.original_price.percent_off(self.discount_price)
    }

    /// Discount percentage rounded for badges.
    pub fn rounded_discount_percent(&self) -> i64 {
        self.discount_percent().round() as i64
    }

    /// Amount saved; negative when the listing is priced above its original.
    pub fn savings(&self) -> Price {
        self.original_price - self.discount_price
    }

    /// Whether the discount price exceeds the original price.
    pub fn has_price_anomaly(&self) -> bool {
        self.discount_price > self.original_price
    }

    /// Check if the product carries the given category (case-insensitive).
    pub fn in_category(&self, category: &str) -> bool {
        self.category
            .as_deref()
            .map(|c| c.eq_ignore_ascii_case(category))
            .unwrap_or(false)
    }
}

impl CatalogEntity for Product {
    type Draft = NewProduct;
    const COLLECTION: Collection = Collection::Products;

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn from_draft(id: String, draft: NewProduct) -> Self {
        Product::new(ProductId::new(id), draft)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_blank() {
            return Err(ValidationError::EmptyField("id"));
        }
        self.to_draft().validate_fields()
    }

    fn defaults() -> Vec<Self> {
        defaults::default_products()
    }
}

pub(crate) fn check_price(field: &'static str, price: Price) -> Result<(), ValidationError> {
    if price.is_negative() {
        return Err(ValidationError::NegativePrice {
            field,
            value: price.display_amount(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(original: f64, discount: f64) -> Product {
        Product::new(
            ProductId::new("p1"),
            NewProduct::new("Headphones", Price::from_decimal(original), Price::from_decimal(discount)),
        )
    }

    #[test]
    fn test_product_creation() {
        let p = product(2999.0, 1499.0);
        assert_eq!(p.name, "Headphones");
        assert_eq!(p.id.as_str(), "p1");
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_discount_percent() {
        let p = product(200.0, 150.0);
        assert!((p.discount_percent() - 25.0).abs() < 1e-9);
        assert_eq!(p.rounded_discount_percent(), 25);
        assert_eq!(p.savings(), Price::from_decimal(50.0));
    }

    #[test]
    fn test_price_anomaly_is_tolerated() {
        let p = product(50.0, 80.0);
        assert!(p.validate().is_ok());
        assert!(p.has_price_anomaly());
        assert!(p.discount_percent() < 0.0);
    }

    #[test]
    fn test_negative_price_rejected() {
        let p = product(-1.0, 0.0);
        assert!(matches!(
            p.validate(),
            Err(ValidationError::NegativePrice { field: "originalPrice", .. })
        ));
    }

    #[test]
    fn test_blank_name_rejected() {
        let mut p = product(10.0, 5.0);
        p.name = "   ".to_string();
        assert_eq!(p.validate(), Err(ValidationError::EmptyField("name")));
    }

    #[test]
    fn test_serializes_camel_case() {
        let p = product(10.0, 5.0);
        let json = serde_json::to_value(&p).unwrap();
        assert!(json.get("originalPrice").is_some());
        assert!(json.get("affiliateLink").is_some());
        assert!(json.get("category").is_none());
    }

    #[test]
    fn test_draft_round_trip() {
        let p = product(10.0, 5.0);
        let rebuilt = Product::from_draft("p1".to_string(), p.to_draft());
        assert_eq!(rebuilt, p);
    }

    #[test]
    fn test_in_category() {
        let mut p = product(10.0, 5.0);
        p.category = Some("Audio".to_string());
        assert!(p.in_category("audio"));
        assert!(!p.in_category("video"));
    }
}
