pub mod account;
pub mod admin_api;
pub mod catalog;
pub mod config;
pub mod edit_page;
pub mod forms;
pub mod list_page;
pub mod notification;
pub mod page_script;
pub mod panel_registry;
pub mod route_permission;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;
