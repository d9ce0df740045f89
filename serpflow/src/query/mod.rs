//! Query construction.

mod builder;

pub use builder::{
    base_headers, clamp_results_per_page, first_offset, page_ceiling, QueryBuilder, QueryParams,
    BING_SEARCH_URL, MAX_RESULTS_PER_PAGE, MAX_RESULTS_PER_QUERY, MIN_RESULTS_PER_PAGE,
};
