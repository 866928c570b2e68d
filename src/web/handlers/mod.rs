//! HTTP request handlers, one module per API area

pub mod catalog;
pub mod categories;
pub mod channels;
pub mod health;
pub mod sources;
pub mod validation;
