// Library exports for Blogicum
// This allows integration tests and external code to use Blogicum modules

pub mod auth;
pub mod blog;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod forms;
pub mod manage;
pub mod media;
pub mod routes;
pub mod state;
