//! Composable query descriptions.
//!
//! A [`Query`] is a lazy, not-yet-executed description of a filtered,
//! sorted, optionally eager-loading, optionally paged read. Callers layer
//! conditions onto it fluently; the repository executes it.
//!
//! The [`FilterChain`] replaces per-call-site `if` ladders: each
//! `where_if(condition, predicate)` appends its predicate only when the
//! condition holds, and all appended predicates combine with logical AND,
//! evaluated left-to-right.

use std::cmp::Ordering;
use std::sync::Arc;

use storefront_common::pagination::{PageRequest, SortDirection, SortParams};
use storefront_domain::Entity;

/// A chain of independently-optional boolean predicates combined with AND.
pub struct FilterChain<T> {
    predicates: Vec<Arc<dyn Fn(&T) -> bool + Send + Sync>>,
}

impl<T> FilterChain<T> {
    /// An empty chain that matches every row.
    pub fn new() -> Self {
        Self {
            predicates: Vec::new(),
        }
    }

    /// Append `predicate` to the chain only when `condition` is true;
    /// otherwise return the chain unchanged.
    pub fn where_if<P>(mut self, condition: bool, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        if condition {
            self.predicates.push(Arc::new(predicate));
        }
        self
    }

    /// Append `predicate` unconditionally.
    pub fn filter<P>(self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.where_if(true, predicate)
    }

    /// Whether `item` satisfies every predicate in the chain.
    pub fn matches(&self, item: &T) -> bool {
        self.predicates.iter().all(|p| p(item))
    }

    /// Number of predicates currently in the chain.
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// Whether the chain is empty (matches all rows).
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl<T> Default for FilterChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for FilterChain<T> {
    fn clone(&self) -> Self {
        Self {
            predicates: self.predicates.clone(),
        }
    }
}

/// Eager-load specification: relation paths to hydrate on the result.
///
/// Each path is a dot-separated chain of navigation field names, e.g.
/// `"subcategories.products"` loads each category's subcategories and each
/// subcategory's products.
#[derive(Debug, Clone, Default)]
pub struct Include {
    paths: Vec<String>,
}

impl Include {
    /// An empty specification: no related entities are loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a relation path.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }

    /// The configured relation paths.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Whether any path is configured.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

enum SortKind<T> {
    /// Dynamic key name resolved through the entity's allow-list.
    Key(SortParams),
    /// Caller-supplied comparator.
    Custom(Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>),
}

impl<T> Clone for SortKind<T> {
    fn clone(&self) -> Self {
        match self {
            SortKind::Key(params) => SortKind::Key(params.clone()),
            SortKind::Custom(cmp) => SortKind::Custom(cmp.clone()),
        }
    }
}

/// A lazy query description over one entity type.
///
/// Nothing executes until the query is handed to a repository; callers may
/// keep layering filters, ordering, includes, and paging onto it first.
pub struct Query<T: Entity> {
    pub(crate) filter: FilterChain<T>,
    sort: Option<SortKind<T>>,
    pub(crate) include: Include,
    pub(crate) page: PageRequest,
}

impl<T: Entity> Query<T> {
    /// A query matching all rows, unsorted, without eager loading or paging.
    pub fn new() -> Self {
        Self {
            filter: FilterChain::new(),
            sort: None,
            include: Include::new(),
            page: PageRequest::default(),
        }
    }

    /// A query seeded with an already-composed filter chain.
    pub fn with_filter(chain: FilterChain<T>) -> Self {
        Self {
            filter: chain,
            ..Self::new()
        }
    }

    /// Append an unconditional filter predicate.
    pub fn filter<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filter = self.filter.filter(predicate);
        self
    }

    /// Append a filter predicate only when `condition` is true.
    pub fn where_if<P>(mut self, condition: bool, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filter = self.filter.where_if(condition, predicate);
        self
    }

    /// Sort by a dynamic key name and direction.
    ///
    /// The key resolves through the entity's allow-list; unrecognized keys
    /// fall back to the default sort key (creation time).
    pub fn sort(mut self, params: SortParams) -> Self {
        self.sort = Some(SortKind::Key(params));
        self
    }

    /// Sort with a caller-supplied comparator.
    pub fn sort_by<F>(mut self, comparator: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        self.sort = Some(SortKind::Custom(Arc::new(comparator)));
        self
    }

    /// Eagerly load a relation path (dot-separated navigation names).
    pub fn include(mut self, path: impl Into<String>) -> Self {
        self.include = self.include.path(path);
        self
    }

    /// Skip the first `n` rows of the filtered, sorted result.
    pub fn skip(mut self, n: u32) -> Self {
        self.page.skip = Some(n);
        self
    }

    /// Return at most `n` rows after skipping.
    pub fn take(mut self, n: u32) -> Self {
        self.page.take = Some(n);
        self
    }

    /// Apply the configured ordering, if any.
    pub(crate) fn apply_sort(&self, items: &mut [T]) {
        match &self.sort {
            Some(SortKind::Key(params)) => {
                let field = params.field.clone();
                let descending = params.direction == SortDirection::Desc;
                items.sort_by(|a, b| {
                    let ord = T::compare_by(&field, a, b);
                    if descending {
                        ord.reverse()
                    } else {
                        ord
                    }
                });
            }
            Some(SortKind::Custom(cmp)) => items.sort_by(|a, b| cmp(a, b)),
            None => {}
        }
    }
}

impl<T: Entity> Default for Query<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            filter: self.filter.clone(),
            sort: self.sort.clone(),
            include: self.include.clone(),
            page: self.page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use storefront_domain::Category;

    fn matching(chain: &FilterChain<i32>, values: &[i32]) -> Vec<i32> {
        values.iter().copied().filter(|v| chain.matches(v)).collect()
    }

    #[test]
    fn test_empty_chain_matches_everything() {
        let chain = FilterChain::<i32>::new();
        assert!(chain.is_empty());
        assert!(chain.matches(&42));
    }

    #[test]
    fn test_where_if_false_is_a_no_op() {
        let with = FilterChain::<i32>::new()
            .filter(|v| *v > 2)
            .where_if(false, |v| *v < 0);
        let without = FilterChain::<i32>::new().filter(|v| *v > 2);

        let values = [1, 2, 3, 4, 5];
        assert_eq!(matching(&with, &values), matching(&without, &values));
        assert_eq!(with.len(), 1);
    }

    #[test]
    fn test_where_if_true_ands_predicates() {
        let chain = FilterChain::<i32>::new()
            .where_if(true, |v| *v > 2)
            .where_if(true, |v| *v < 5);
        assert_eq!(matching(&chain, &[1, 2, 3, 4, 5, 6]), vec![3, 4]);
    }

    #[test]
    fn test_query_sort_key_direction() {
        let mut items = vec![
            Category::new("banana"),
            Category::new("Apple"),
            Category::new("cherry"),
        ];
        let query = Query::<Category>::new().sort(SortParams::desc("name"));
        query.apply_sort(&mut items);
        let names: Vec<_> = items.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["cherry", "banana", "Apple"]);
    }

    #[test]
    fn test_query_custom_comparator() {
        let mut items = vec![Category::new("bb"), Category::new("a"), Category::new("ccc")];
        let query = Query::<Category>::new().sort_by(|a, b| a.name.len().cmp(&b.name.len()));
        query.apply_sort(&mut items);
        assert_eq!(items[0].name, "a");
        assert_eq!(items[2].name, "ccc");
    }

    #[test]
    fn test_include_paths_accumulate() {
        let include = Include::new().path("subcategories").path("subcategories.products");
        assert_eq!(include.paths().len(), 2);
    }

    proptest! {
        // where_if(false, p) never changes the matched set, for any inputs.
        #[test]
        fn prop_where_if_false_never_changes_result(values in proptest::collection::vec(-1000i32..1000, 0..50), threshold in -1000i32..1000) {
            let base = FilterChain::<i32>::new().filter(move |v| *v % 2 == 0);
            let chained = base.clone().where_if(false, move |v| *v > threshold);
            prop_assert_eq!(matching(&base, &values), matching(&chained, &values));
        }

        // where_if(true, p1).where_if(true, p2) is exactly p1 AND p2.
        #[test]
        fn prop_where_if_true_is_conjunction(values in proptest::collection::vec(-1000i32..1000, 0..50), low in -500i32..0, high in 0i32..500) {
            let chain = FilterChain::<i32>::new()
                .where_if(true, move |v| *v >= low)
                .where_if(true, move |v| *v <= high);
            let expected: Vec<i32> = values.iter().copied().filter(|v| *v >= low && *v <= high).collect();
            prop_assert_eq!(matching(&chain, &values), expected);
        }
    }
}
