//! Listing parameters for the post feed.

use postboard_core::{DomainError, DomainResult};

/// Page size used when the caller does not pass `limit`.
pub const DEFAULT_LIMIT: i64 = 10;

/// Validated listing parameters: case-insensitive title substring filter plus
/// offset pagination. Results are always ordered by post id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    search: String,
    limit: i64,
    skip: i64,
}

impl Default for PostQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            limit: DEFAULT_LIMIT,
            skip: 0,
        }
    }
}

impl PostQuery {
    pub fn new(search: Option<String>, limit: Option<i64>, skip: Option<i64>) -> DomainResult<Self> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        let skip = skip.unwrap_or(0);

        if limit < 0 {
            return Err(DomainError::validation("limit must be greater than or equal to 0"));
        }
        if skip < 0 {
            return Err(DomainError::validation("skip must be greater than or equal to 0"));
        }

        Ok(Self {
            search: search.unwrap_or_default(),
            limit,
            skip,
        })
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn skip(&self) -> i64 {
        self.skip
    }

    /// Title filter, as applied by the in-memory store. The Postgres store
    /// expresses the same rule with `ILIKE`.
    pub fn matches_title(&self, title: &str) -> bool {
        self.search.is_empty() || title.to_lowercase().contains(&self.search.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let q = PostQuery::new(None, None, None).unwrap();
        assert_eq!(q, PostQuery::default());
        assert_eq!(q.limit(), 10);
        assert_eq!(q.skip(), 0);
        assert_eq!(q.search(), "");
    }

    #[test]
    fn negative_paging_is_rejected() {
        assert!(matches!(PostQuery::new(None, Some(-1), None), Err(DomainError::Validation(_))));
        assert!(matches!(PostQuery::new(None, None, Some(-5)), Err(DomainError::Validation(_))));
    }

    #[test]
    fn title_filter_is_case_insensitive_substring() {
        let q = PostQuery::new(Some("RuSt".to_string()), None, None).unwrap();
        assert!(q.matches_title("Learning rust today"));
        assert!(q.matches_title("RUST"));
        assert!(!q.matches_title("Go"));

        let everything = PostQuery::default();
        assert!(everything.matches_title(""));
        assert!(everything.matches_title("anything"));
    }
}
