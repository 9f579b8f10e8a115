//! SeaORM entities.

pub mod answer_options;
pub mod answers;
pub mod questions;
pub mod responses;
pub mod roles;
pub mod sessions;
pub mod surveys;
pub mod user_roles;
pub mod users;
