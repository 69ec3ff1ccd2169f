pub mod auth;
pub mod docs;
pub mod model;
pub mod participant;
pub mod sports_post;
