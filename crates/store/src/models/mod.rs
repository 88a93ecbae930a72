pub mod form_schema;
pub mod pagination;
pub mod route;
pub mod user;
