pub mod api;
pub mod forms;
pub mod models;
