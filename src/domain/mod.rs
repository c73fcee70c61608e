pub mod code;
pub mod delivery;
pub mod error;
pub mod id;
pub mod money;
pub mod notification;
pub mod payment;
pub mod provider;
pub mod repo;
pub mod templates;
pub mod transition;
pub mod user;
