//! Collections: owning containers of resources with ordering and
//! relation queries.
//!
//! A collection is populated during the read phase, sorted exactly once
//! after population, and never structurally mutated afterwards - only the
//! `data`/`content` of member resources changes during the transform
//! phase.

use chrono::NaiveDateTime;
use serde_yaml::Value;

use crate::config::{CollectionConfig, RelationKind, SortDirection};

use super::resource::Resource;

/// An owning container of resources sharing a directory convention and
/// metadata schema.
#[derive(Debug)]
pub struct Collection {
    pub label: String,
    pub config: CollectionConfig,
    /// Insertion order = read order until `sort` runs
    pub resources: Vec<Resource>,
}

impl Collection {
    pub fn new(config: CollectionConfig) -> Self {
        Self {
            label: config.name.clone(),
            config,
            resources: Vec::new(),
        }
    }

    pub fn push(&mut self, resource: Resource) {
        self.resources.push(resource);
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    // =========================================================================
    // Sorting
    // =========================================================================

    /// Sort members once after the read phase.
    ///
    /// With a `sort_by` key: decorate-sort-undecorate. Resources missing
    /// the key are warned about (once each) and ordered after all present
    /// values regardless of the requested direction; equal values fall
    /// back to natural ordering. Without `sort_by`, natural ordering
    /// applies directly. A descending direction reverses the present
    /// values only - missing values stay pinned at the end.
    pub fn sort(&mut self) {
        let direction = self.config.sort_direction;
        match self.config.sort_by.clone() {
            Some(key) => self.sort_by_key(&key, direction),
            None => {
                self.resources.sort_by(|a, b| natural_key(a).cmp(&natural_key(b)));
                if direction == SortDirection::Descending {
                    self.resources.reverse();
                }
            }
        }
    }

    fn sort_by_key(&mut self, key: &str, direction: SortDirection) {
        // Decorate
        let mut present: Vec<(Value, (Option<NaiveDateTime>, String), Resource)> = Vec::new();
        let mut missing: Vec<((Option<NaiveDateTime>, String), Resource)> = Vec::new();

        for resource in self.resources.drain(..) {
            let natural = natural_key(&resource);
            match resource.data.get(key) {
                Some(value) if !value.is_null() => {
                    present.push((value.clone(), natural, resource));
                }
                _ => {
                    tracing::warn!(
                        path = %resource.relative_path.display(),
                        key,
                        "resource has no value for sort key; ordering it last"
                    );
                    missing.push((natural, resource));
                }
            }
        }

        // Sort
        present.sort_by(|(va, na, _), (vb, nb, _)| {
            compare_values(va, vb).then_with(|| na.cmp(nb))
        });
        if direction == SortDirection::Descending {
            present.reverse();
        }
        missing.sort_by(|(na, _), (nb, _)| na.cmp(nb));

        // Undecorate
        self.resources = present
            .into_iter()
            .map(|(_, _, r)| r)
            .chain(missing.into_iter().map(|(_, r)| r))
            .collect();
    }

    // =========================================================================
    // Sibling queries
    // =========================================================================

    /// Index of a resource by identity (collection + path), not equality.
    pub fn position_of(&self, resource: &Resource) -> Option<usize> {
        self.resources.iter().position(|r| r.same_identity(resource))
    }

    /// The member after this one in sorted order; `None` at the boundary.
    pub fn next_resource(&self, resource: &Resource) -> Option<&Resource> {
        let idx = self.position_of(resource)?;
        self.resources.get(idx + 1)
    }

    /// The member before this one in sorted order; `None` at the boundary.
    pub fn previous_resource(&self, resource: &Resource) -> Option<&Resource> {
        let idx = self.position_of(resource)?;
        idx.checked_sub(1).and_then(|i| self.resources.get(i))
    }

    // =========================================================================
    // Relation queries
    // =========================================================================

    /// Resources in `other` related to `resource` under `kind`.
    ///
    /// Computed lazily on every call by linear scan - never cached, since
    /// the resource graph may mutate between calls during a live-reload
    /// cycle.
    pub fn resources_for_relation<'a>(
        &self,
        resource: &Resource,
        kind: RelationKind,
        other: &'a Collection,
    ) -> Vec<&'a Resource> {
        match kind {
            RelationKind::BelongsTo | RelationKind::BelongsToMany => {
                // Foreign keys live on this resource: the singular target
                // label for belongs_to, the plural for belongs_to_many.
                let key = match kind {
                    RelationKind::BelongsTo => singular(&other.label),
                    _ => other.label.clone(),
                };
                let wanted = resource.data.string_list(&key);
                other
                    .resources
                    .iter()
                    .filter(|candidate| wanted.iter().any(|w| *w == candidate.slug()))
                    .collect()
            }
            RelationKind::HasMany | RelationKind::HasOne => {
                // Foreign keys live on the other side, pointing back at us.
                let singular_key = singular(&self.label);
                let plural_key = &self.label;
                let slug = resource.slug();
                let matches: Vec<&Resource> = other
                    .resources
                    .iter()
                    .filter(|candidate| {
                        candidate.data.string_list(&singular_key).contains(&slug)
                            || candidate.data.string_list(plural_key).contains(&slug)
                    })
                    .collect();
                match kind {
                    RelationKind::HasOne => matches.into_iter().take(1).collect(),
                    _ => matches,
                }
            }
        }
    }
}

/// Natural ordering: effective date, then path. Undated resources sort
/// before dated ones.
fn natural_key(resource: &Resource) -> (Option<NaiveDateTime>, String) {
    (
        resource.date(),
        resource.relative_path.to_string_lossy().to_string(),
    )
}

/// Compare two YAML scalar values for sorting. Mixed or non-scalar types
/// compare equal, falling back to natural ordering.
fn compare_values(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Naive singularization for relation foreign keys: "authors" -> "author".
fn singular(label: &str) -> String {
    label.strip_suffix('s').unwrap_or(label).to_string()
}
