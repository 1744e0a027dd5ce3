//! Domain models

pub mod agent;
pub mod message;
pub mod notification;
pub mod ticket;
pub mod user;
