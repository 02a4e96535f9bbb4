pub mod api;
pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod listener;
pub mod state;
pub mod store;
