//! Catalog browsing: template listings and detail views.
//!
//! Attribute summaries for a whole page of templates are fetched with one
//! read for all attribute lines and one for all their values, never per
//! template.

use decilo_core::{
    AttributeId, AttributeLine, AttributeLineId, AttributeSummary, AttributeValueId,
    CatalogFilter, Template, TemplateId, TemplateSummary,
};
use decilo_storage::{CatalogClient, Domain, SearchOptions, StoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::unique;

/// Default listing order.
pub const DEFAULT_TEMPLATE_ORDER: &str = "name asc, id asc";

/// Paging and search parameters for a template listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateQuery {
    /// Case-insensitive substring of the template name.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub order: Option<String>,
}

impl TemplateQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    fn search_options(&self) -> SearchOptions {
        let mut options = SearchOptions::new()
            .offset(self.offset)
            .order(self.order.as_deref().unwrap_or(DEFAULT_TEMPLATE_ORDER));
        options.limit = self.limit;
        options
    }
}

#[derive(Debug, Clone)]
pub struct CatalogBrowser {
    client: CatalogClient,
    filter: CatalogFilter,
}

impl CatalogBrowser {
    pub fn new(client: CatalogClient, filter: CatalogFilter) -> Self {
        Self { client, filter }
    }

    fn domain(&self, query: &TemplateQuery) -> Domain {
        self.client
            .listing_domain(&self.filter, query.search.as_deref())
    }

    pub async fn templates(
        &self,
        query: &TemplateQuery,
        locale: &str,
    ) -> StoreResult<Vec<TemplateSummary>> {
        let templates = self
            .client
            .search_templates(&self.domain(query), query.search_options(), locale)
            .await?;
        self.summarize(templates, locale).await
    }

    /// Total matching templates, ignoring paging.
    pub async fn count_templates(&self, query: &TemplateQuery) -> StoreResult<usize> {
        self.client.count_templates(&self.domain(query)).await
    }

    /// One template, or `None` if it does not exist.
    ///
    /// Detail views are not subject to the listing filter.
    pub async fn template_detail(
        &self,
        template: TemplateId,
        locale: &str,
    ) -> StoreResult<Option<TemplateSummary>> {
        let Some(found) = self.client.template(template, locale).await? else {
            return Ok(None);
        };
        Ok(self.summarize(vec![found], locale).await?.into_iter().next())
    }

    async fn summarize(
        &self,
        templates: Vec<Template>,
        locale: &str,
    ) -> StoreResult<Vec<TemplateSummary>> {
        let line_ids: Vec<AttributeLineId> = unique(
            templates
                .iter()
                .flat_map(|t| t.attribute_lines.iter().copied()),
        );
        let lines = self.client.attribute_lines(&line_ids, locale).await?;

        let value_ids: Vec<AttributeValueId> =
            unique(lines.iter().flat_map(|line| line.values.iter().copied()));
        let unnamed: Vec<AttributeId> = unique(
            lines
                .iter()
                .filter(|line| line.attribute_name.is_none())
                .map(|line| line.attribute),
        );
        let (values, attributes) = tokio::try_join!(
            self.client.attribute_values(&value_ids, locale),
            self.client.attributes(&unnamed, locale),
        )?;

        let lines: HashMap<AttributeLineId, &AttributeLine> =
            lines.iter().map(|line| (line.id, line)).collect();
        let value_names: HashMap<AttributeValueId, &str> =
            values.iter().map(|v| (v.id, v.name.as_str())).collect();
        let attribute_names: HashMap<AttributeId, &str> =
            attributes.iter().map(|a| (a.id, a.name.as_str())).collect();

        Ok(templates
            .into_iter()
            .map(|template| {
                let attributes = template
                    .attribute_lines
                    .iter()
                    .filter_map(|id| lines.get(id))
                    .map(|line| AttributeSummary {
                        attribute: line
                            .attribute_name
                            .clone()
                            .or_else(|| attribute_names.get(&line.attribute).map(|n| n.to_string()))
                            .unwrap_or_default(),
                        values: line
                            .values
                            .iter()
                            .filter_map(|id| value_names.get(id))
                            .map(|name| name.to_string())
                            .collect(),
                    })
                    .collect();
                TemplateSummary {
                    id: template.id,
                    name: template.name,
                    list_price: template.list_price,
                    default_code: template.default_code,
                    description: template.description,
                    attributes,
                }
            })
            .collect())
    }
}
