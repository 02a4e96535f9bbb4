pub mod factory;
pub mod listener;
pub mod services;
pub mod store;
