pub mod http_client;
pub mod resolver;

pub use http_client::{HttpListener, ListenerHttpError};
pub use resolver::HttpListenerResolver;
