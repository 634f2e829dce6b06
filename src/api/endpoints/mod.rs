//! HTTP endpoint handlers.

pub mod article;
pub mod health;
pub mod history;
