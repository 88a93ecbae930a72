pub mod models;
pub mod search_cache;

pub use models::form_schema::FormData;
pub use search_cache::SearchFormCache;
