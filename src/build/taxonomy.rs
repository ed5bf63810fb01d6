//! Taxonomies: categorization axes extracted from resource data.
//!
//! Terms are declared by resources (`categories`, `tags` front matter) and
//! indexed site-wide for listing pages. The index references resources by
//! identity key, never by pointer, and lookups never mutate resources.

use std::collections::BTreeMap;

use super::resource::Resource;

/// Identity key for a resource inside the site arena.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceKey {
    pub collection: String,
    pub relative_path: String,
}

impl ResourceKey {
    pub fn of(resource: &Resource) -> Self {
        Self {
            collection: resource.collection.clone(),
            relative_path: resource.relative_path.to_string_lossy().to_string(),
        }
    }
}

/// A single term within a taxonomy type ("rust" within "tag").
#[derive(Debug, Default)]
pub struct TaxonomyTerm {
    pub resources: Vec<ResourceKey>,
}

/// Site-wide index of taxonomy types ("category", "tag") to their terms.
#[derive(Debug, Default)]
pub struct TaxonomyIndex {
    types: BTreeMap<String, BTreeMap<String, TaxonomyTerm>>,
}

impl TaxonomyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the taxonomy terms a resource declares. Called once per
    /// resource during the read phase.
    pub fn index_resource(&mut self, resource: &Resource) {
        let key = ResourceKey::of(resource);
        for category in resource.categories() {
            self.add("category", &category, key.clone());
        }
        for tag in resource.tags() {
            self.add("tag", &tag, key.clone());
        }
    }

    fn add(&mut self, taxonomy: &str, term: &str, key: ResourceKey) {
        self.types
            .entry(taxonomy.to_string())
            .or_default()
            .entry(term.to_string())
            .or_default()
            .resources
            .push(key);
    }

    /// All terms of one taxonomy type, sorted by term label.
    pub fn terms(&self, taxonomy: &str) -> impl Iterator<Item = (&String, &TaxonomyTerm)> {
        self.types.get(taxonomy).into_iter().flatten()
    }

    /// Resource keys declaring a specific term.
    pub fn resources_for(&self, taxonomy: &str, term: &str) -> &[ResourceKey] {
        self.types
            .get(taxonomy)
            .and_then(|terms| terms.get(term))
            .map(|t| t.resources.as_slice())
            .unwrap_or(&[])
    }
}
