//! Variant resolution.
//!
//! Pure in-memory matching of a [`Selection`] against a [`Snapshot`]. Nothing
//! here performs I/O, so the same selection and snapshot always give the same
//! answer.

use decilo_core::{AmbiguityPolicy, ResolutionError, Selection, TavId, TemplateId, VariantId};
use serde::Serialize;

use crate::metadata::Snapshot;

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved {
    /// `None` only for an empty selection on a template with neither a
    /// default variant nor exactly one candidate.
    pub variant_id: Option<VariantId>,
    /// TAVs implied by the selection, in selection order.
    pub needed: Vec<TavId>,
    pub display_name: Option<String>,
    /// Other candidates that also matched. Empty unless the catalog holds
    /// duplicate or under-specified variants.
    pub ambiguous_with: Vec<VariantId>,
}

impl Resolved {
    fn unresolved() -> Self {
        Self {
            variant_id: None,
            needed: Vec::new(),
            display_name: None,
            ambiguous_with: Vec::new(),
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        !self.ambiguous_with.is_empty()
    }
}

/// Resolve `selection` to a variant of `template_id`.
///
/// 1. An empty selection yields the declared default variant, else the
///    single candidate if there is exactly one, else no variant.
/// 2. Each selected pair is normalised and looked up. An attribute the
///    template lacks fails with `UnknownAttribute`, a value it does not bind
///    fails with `OptionNotAvailable`.
/// 3. The first candidate, in snapshot order, whose TAV set contains every
///    needed TAV wins. No candidate fails with `NoMatchingVariant`.
pub fn resolve(
    template_id: TemplateId,
    selection: &Selection,
    snapshot: &Snapshot,
    policy: AmbiguityPolicy,
) -> Result<Resolved, ResolutionError> {
    debug_assert_eq!(template_id, snapshot.template_id());

    if selection.is_empty() {
        return Ok(resolve_empty(snapshot));
    }

    let mut needed = Vec::with_capacity(selection.len());
    for option in selection.iter() {
        let (attribute, value) = option.selector();
        if !snapshot.has_attribute(&attribute) {
            return Err(ResolutionError::UnknownAttribute {
                attribute: option.attribute.clone(),
            });
        }
        let tav = snapshot
            .lookup(&attribute, &value)
            .ok_or_else(|| ResolutionError::OptionNotAvailable {
                attribute: option.attribute.clone(),
                value: option.value.clone(),
            })?;
        if !needed.contains(&tav) {
            needed.push(tav);
        }
    }

    let mut matching = snapshot
        .candidates()
        .iter()
        .filter(|candidate| needed.iter().all(|tav| candidate.tav_set.contains(tav)));

    let Some(first) = matching.next() else {
        tracing::debug!(
            template_id = %template_id,
            selection = %selection.canonical(),
            "No variant matches selection"
        );
        return Err(ResolutionError::NoMatchingVariant);
    };
    let others: Vec<VariantId> = matching.map(|candidate| candidate.variant_id).collect();

    if !others.is_empty() {
        tracing::warn!(
            template_id = %template_id,
            selection = %selection.canonical(),
            chosen = %first.variant_id,
            also_matching = others.len(),
            "Selection matches more than one variant"
        );
        if policy == AmbiguityPolicy::Reject {
            let mut candidates = vec![first.variant_id];
            candidates.extend(others);
            return Err(ResolutionError::AmbiguousSelection { candidates });
        }
    }

    Ok(Resolved {
        variant_id: Some(first.variant_id),
        needed,
        display_name: first.display_name.clone(),
        ambiguous_with: others,
    })
}

fn resolve_empty(snapshot: &Snapshot) -> Resolved {
    if let Some(default) = snapshot.default_variant() {
        return Resolved {
            variant_id: Some(default),
            display_name: snapshot
                .candidate(default)
                .and_then(|candidate| candidate.display_name.clone()),
            ..Resolved::unresolved()
        };
    }
    match snapshot.candidates() {
        [only] => Resolved {
            variant_id: Some(only.variant_id),
            display_name: only.display_name.clone(),
            ..Resolved::unresolved()
        },
        _ => Resolved::unresolved(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decilo_storage::{Clock, SystemClock};

    const TEMPLATE: TemplateId = TemplateId::from_raw(1);

    fn tav(id: i64) -> TavId {
        TavId::from_raw(id)
    }

    fn variant(id: i64) -> VariantId {
        VariantId::from_raw(id)
    }

    /// Size {S, M} x Side {Left, Right}, one variant per combination.
    fn snapshot() -> Snapshot {
        Snapshot::new(TEMPLATE, "en_US", SystemClock.now())
            .with_selector("Size", "S", tav(1))
            .with_selector("Size", "M", tav(2))
            .with_selector("Side", "Left", tav(3))
            .with_selector("Side", "Right", tav(4))
            .with_candidate(variant(10), [tav(1), tav(3)], Some("Tip (S, Left)".into()))
            .with_candidate(variant(11), [tav(1), tav(4)], Some("Tip (S, Right)".into()))
            .with_candidate(variant(12), [tav(2), tav(3)], Some("Tip (M, Left)".into()))
            .with_candidate(variant(13), [tav(2), tav(4)], Some("Tip (M, Right)".into()))
    }

    #[test]
    fn test_full_selection_resolves() {
        let selection = Selection::new().with("size", "M").with("SIDE", " right ");
        let resolved = resolve(TEMPLATE, &selection, &snapshot(), AmbiguityPolicy::FirstMatch)
            .unwrap();
        assert_eq!(resolved.variant_id, Some(variant(13)));
        assert_eq!(resolved.needed, vec![tav(2), tav(4)]);
        assert_eq!(resolved.display_name.as_deref(), Some("Tip (M, Right)"));
        assert!(!resolved.is_ambiguous());
    }

    #[test]
    fn test_unknown_attribute() {
        let selection = Selection::new().with("Colour (typo)", "Red");
        let err = resolve(TEMPLATE, &selection, &snapshot(), AmbiguityPolicy::FirstMatch)
            .unwrap_err();
        assert_eq!(
            err,
            ResolutionError::UnknownAttribute {
                attribute: "Colour (typo)".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_value_reports_user_spelling() {
        let selection = Selection::new().with("Size", "XL");
        let err = resolve(TEMPLATE, &selection, &snapshot(), AmbiguityPolicy::FirstMatch)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Option 'Size: XL' not available for this product"
        );
    }

    #[test]
    fn test_no_candidate_has_combination() {
        let snapshot = Snapshot::new(TEMPLATE, "en_US", SystemClock.now())
            .with_selector("Size", "S", tav(1))
            .with_selector("Side", "Left", tav(3))
            .with_candidate(variant(10), [tav(1)], None)
            .with_candidate(variant(11), [tav(3)], None);
        let selection = Selection::new().with("Size", "S").with("Side", "Left");
        let err = resolve(TEMPLATE, &selection, &snapshot, AmbiguityPolicy::FirstMatch)
            .unwrap_err();
        assert_eq!(err, ResolutionError::NoMatchingVariant);
    }

    #[test]
    fn test_under_specified_selection_first_match() {
        let selection = Selection::new().with("Size", "S");
        let resolved = resolve(TEMPLATE, &selection, &snapshot(), AmbiguityPolicy::FirstMatch)
            .unwrap();
        assert_eq!(resolved.variant_id, Some(variant(10)));
        assert_eq!(resolved.ambiguous_with, vec![variant(11)]);
    }

    #[test]
    fn test_under_specified_selection_rejected() {
        let selection = Selection::new().with("Size", "S");
        let err = resolve(TEMPLATE, &selection, &snapshot(), AmbiguityPolicy::Reject).unwrap_err();
        assert_eq!(
            err,
            ResolutionError::AmbiguousSelection {
                candidates: vec![variant(10), variant(11)]
            }
        );
    }

    #[test]
    fn test_empty_selection_prefers_default() {
        let snapshot = snapshot().with_default_variant(Some(variant(12)));
        let resolved =
            resolve(TEMPLATE, &Selection::new(), &snapshot, AmbiguityPolicy::Reject).unwrap();
        assert_eq!(resolved.variant_id, Some(variant(12)));
        assert_eq!(resolved.display_name.as_deref(), Some("Tip (M, Left)"));
        assert!(resolved.needed.is_empty());
    }

    #[test]
    fn test_empty_selection_without_default() {
        let resolved = resolve(
            TEMPLATE,
            &Selection::new(),
            &snapshot(),
            AmbiguityPolicy::FirstMatch,
        )
        .unwrap();
        assert_eq!(resolved.variant_id, None);

        let single = Snapshot::new(TEMPLATE, "en_US", SystemClock.now())
            .with_candidate(variant(7), [], None);
        let resolved =
            resolve(TEMPLATE, &Selection::new(), &single, AmbiguityPolicy::FirstMatch).unwrap();
        assert_eq!(resolved.variant_id, Some(variant(7)));
    }

    #[test]
    fn test_template_without_attributes() {
        let empty = Snapshot::new(TEMPLATE, "en_US", SystemClock.now());
        let selection = Selection::new().with("Size", "M");
        assert!(matches!(
            resolve(TEMPLATE, &selection, &empty, AmbiguityPolicy::FirstMatch),
            Err(ResolutionError::UnknownAttribute { .. })
        ));
    }
}
