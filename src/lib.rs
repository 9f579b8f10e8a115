pub mod app_config;
pub mod create_user;
pub mod db;
pub mod middleware;
pub mod orm;
pub mod pdf;
pub mod role;
pub mod session;
pub mod survey;
pub mod user;
pub mod validation;
pub mod web;
