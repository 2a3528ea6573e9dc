pub mod analytics;
pub mod auth;
pub mod comments;
pub mod health;
pub mod labels;
pub mod projects;
pub mod tasks;
