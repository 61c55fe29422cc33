//! Exclusion computation.
//!
//! An exclusion group hangs off one TAV and lists the options that cannot be
//! combined with it. Exclusions are directional as stored: if A excludes B,
//! nothing is said about B excluding A.
//!
//! Group members are normally TAV ids. Some catalogs store raw attribute
//! value ids instead, so each member is looked up as a TAV first and as an
//! attribute value second.

use decilo_core::{
    AttributeValue, AttributeValueId, Exclusion, ExclusionGroup, ExclusionGroupId, RecordId,
    RecordIdType, TemplateAttributeValue, TemplateId,
};
use decilo_storage::{CatalogClient, StoreResult};
use std::collections::HashMap;

use crate::unique;

/// Computes exclusions on demand. Results are not cached.
#[derive(Debug, Clone)]
pub struct ExclusionComputer {
    client: CatalogClient,
    locale: String,
}

impl ExclusionComputer {
    pub fn new(client: CatalogClient, locale: impl Into<String>) -> Self {
        Self {
            client,
            locale: locale.into(),
        }
    }

    /// Forbidden combinations for `template`, grouped by declaring value name.
    ///
    /// Costs one TAV search, one concurrent pair of reads for value names and
    /// groups, and one extra value read only when some member is not a TAV
    /// of this template.
    pub async fn get_exclusions(&self, template: TemplateId) -> StoreResult<Vec<Exclusion>> {
        let tavs = self
            .client
            .template_attribute_values(template, &self.locale)
            .await?;
        let group_ids = unique(tavs.iter().flat_map(|tav| tav.exclusion_groups.iter().copied()));
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }

        let value_ids = unique(tavs.iter().map(|tav| tav.attribute_value));
        let (values, groups) = tokio::try_join!(
            self.client.attribute_values(&value_ids, &self.locale),
            self.client.exclusion_groups(&group_ids),
        )?;

        let mut index = ExclusionIndex::new(template, &tavs, &values, groups);
        let unresolved = index.unresolved_members();
        if !unresolved.is_empty() {
            tracing::debug!(
                template_id = %template,
                count = unresolved.len(),
                "Exclusion members are not TAVs, trying attribute values"
            );
            let extra = self
                .client
                .attribute_values(&unresolved, &self.locale)
                .await?;
            index.add_values(&extra);
        }

        Ok(index.exclusions())
    }
}

/// Name lookup tables over one template's TAVs and exclusion groups.
struct ExclusionIndex<'a> {
    tavs: &'a [TemplateAttributeValue],
    groups: HashMap<ExclusionGroupId, ExclusionGroup>,
    value_names: HashMap<AttributeValueId, String>,
    tav_values: HashMap<RecordId, AttributeValueId>,
}

impl<'a> ExclusionIndex<'a> {
    fn new(
        template: TemplateId,
        tavs: &'a [TemplateAttributeValue],
        values: &[AttributeValue],
        groups: Vec<ExclusionGroup>,
    ) -> Self {
        let groups = groups
            .into_iter()
            .filter(|group| {
                let owned = group.template == Some(template);
                if !owned {
                    tracing::debug!(
                        template_id = %template,
                        group = %group.id,
                        owner = ?group.template.map(|t| t.raw()),
                        "Ignoring exclusion group owned by another template"
                    );
                }
                owned
            })
            .map(|group| (group.id, group))
            .collect();

        let mut index = Self {
            tavs,
            groups,
            value_names: HashMap::new(),
            tav_values: tavs
                .iter()
                .map(|tav| (tav.id.raw(), tav.attribute_value))
                .collect(),
        };
        index.add_values(values);
        index
    }

    fn add_values(&mut self, values: &[AttributeValue]) {
        for value in values {
            self.value_names
                .entry(value.id)
                .or_insert_with(|| value.name.clone());
        }
    }

    /// TAV id first, raw attribute value id second.
    fn member_name(&self, member: RecordId) -> Option<&str> {
        let by_tav = self
            .tav_values
            .get(&member)
            .and_then(|value| self.value_names.get(value));
        by_tav
            .or_else(|| self.value_names.get(&AttributeValueId::new(member)))
            .map(String::as_str)
    }

    fn declared_members(&self, tav: &TemplateAttributeValue) -> Vec<RecordId> {
        unique(
            tav.exclusion_groups
                .iter()
                .filter_map(|id| self.groups.get(id))
                .flat_map(|group| group.members.iter().copied()),
        )
    }

    /// Members that resolve neither as a TAV nor as a known value.
    fn unresolved_members(&self) -> Vec<AttributeValueId> {
        unique(
            self.tavs
                .iter()
                .flat_map(|tav| self.declared_members(tav))
                .filter(|member| self.member_name(*member).is_none())
                .map(AttributeValueId::new),
        )
    }

    fn exclusions(&self) -> Vec<Exclusion> {
        let mut result: Vec<Exclusion> = Vec::new();

        for tav in self.tavs {
            let members = self.declared_members(tav);
            if members.is_empty() {
                continue;
            }
            let Some(declaring) = self.value_names.get(&tav.attribute_value) else {
                continue;
            };

            let names = members.into_iter().filter_map(|member| {
                let name = self.member_name(member);
                if name.is_none() {
                    tracing::trace!(tav = %tav.id, member, "Unresolvable exclusion member");
                }
                name
            });

            // Two TAVs may share a display name; merge their lists.
            let entry = match result
                .iter_mut()
                .position(|e| e.declaring_value_name == *declaring)
            {
                Some(at) => &mut result[at],
                None => {
                    result.push(Exclusion {
                        declaring_value_name: declaring.clone(),
                        excluded_value_names: Vec::new(),
                    });
                    let last = result.len() - 1;
                    &mut result[last]
                }
            };
            for name in names {
                if !entry.excluded_value_names.iter().any(|n| n == name) {
                    entry.excluded_value_names.push(name.to_string());
                }
            }
        }

        result.retain(|e| !e.excluded_value_names.is_empty());
        result
    }
}
