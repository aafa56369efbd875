pub mod auction;
pub mod database;
pub mod handlers;
pub mod service;
pub mod store;
