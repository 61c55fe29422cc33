//! Product listing and detail API types

use decilo_core::{TemplateSummary, VariantId};
use decilo_variants::{Candidate, TemplateQuery};
use serde::{Deserialize, Serialize};

/// Default page size when a listing request does not set one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Request to list products.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListProductsRequest {
    /// Case-insensitive name filter
    #[serde(default)]
    pub search: Option<String>,
    /// Page size
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

impl ListProductsRequest {
    pub fn to_query(&self) -> TemplateQuery {
        let mut query = TemplateQuery::new()
            .limit(self.limit.unwrap_or(DEFAULT_PAGE_SIZE))
            .offset(self.offset);
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            query = query.search(term);
        }
        query
    }
}

/// One page of products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductListResponse {
    pub products: Vec<TemplateSummary>,
    /// Total matching products across all pages
    pub total: usize,
    pub offset: usize,
}

/// A purchasable variant of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSummary {
    pub id: VariantId,
    pub display_name: Option<String>,
}

impl From<&Candidate> for VariantSummary {
    fn from(candidate: &Candidate) -> Self {
        Self {
            id: candidate.variant_id,
            display_name: candidate.display_name.clone(),
        }
    }
}

/// Product detail with its variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetailResponse {
    #[serde(flatten)]
    pub product: TemplateSummary,
    pub default_variant: Option<VariantId>,
    pub variants: Vec<VariantSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use decilo_core::{AttributeSummary, TemplateId};
    use serde_json::json;

    #[test]
    fn test_list_request_defaults_page_size() {
        let query = ListProductsRequest::default().to_query();
        assert_eq!(query.limit, Some(DEFAULT_PAGE_SIZE));
        assert_eq!(query.offset, 0);
        assert_eq!(query.search, None);
    }

    #[test]
    fn test_blank_search_is_dropped() {
        let request = ListProductsRequest {
            search: Some("  ".to_string()),
            limit: Some(5),
            offset: 10,
        };
        let query = request.to_query();
        assert_eq!(query.search, None);
        assert_eq!(query.limit, Some(5));
        assert_eq!(query.offset, 10);
    }

    #[test]
    fn test_detail_flattens_product_fields() {
        let detail = ProductDetailResponse {
            product: TemplateSummary {
                id: TemplateId::from_raw(7),
                name: "Dome".to_string(),
                list_price: Some(4.5),
                default_code: None,
                description: None,
                attributes: vec![AttributeSummary {
                    attribute: "Size".to_string(),
                    values: vec!["S".to_string()],
                }],
            },
            default_variant: None,
            variants: vec![VariantSummary {
                id: VariantId::from_raw(70),
                display_name: Some("Dome (S)".to_string()),
            }],
        };

        let value = serde_json::to_value(&detail).unwrap();
        assert_eq!(value["id"], json!(7));
        assert_eq!(value["name"], json!("Dome"));
        assert_eq!(value["variants"][0]["id"], json!(70));
        assert!(value.get("product").is_none());
    }
}
