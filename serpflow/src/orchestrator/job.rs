//! Search jobs: one resolved input item ready for the orchestrator.
//!
//! A job owns the query for its first page and the [`Limit`] that bounds
//! how far pagination may go.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::SearchQuery;
use crate::errors::ConfigurationError;
use crate::pagination::Limit;
use crate::query::{QueryBuilder, QueryParams};

/// One input item: a first query plus how far to paginate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchJob {
    /// Job identifier.
    pub id: Uuid,
    /// Query for the first page.
    pub first_query: SearchQuery,
    /// Pagination limit.
    pub limit: Limit,
}

impl SearchJob {
    /// Creates a job from an already built query.
    #[must_use]
    pub fn new(first_query: SearchQuery, limit: Limit) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_query,
            limit,
        }
    }

    /// Builds the first query and validates the limit.
    pub fn from_params(
        builder: &QueryBuilder,
        params: &QueryParams,
        limit: Limit,
    ) -> Result<Self, ConfigurationError> {
        limit.validate()?;
        Ok(Self::new(builder.build(params)?, limit))
    }

    /// The search term.
    #[must_use]
    pub fn term(&self) -> &str {
        self.first_query.term()
    }
}
