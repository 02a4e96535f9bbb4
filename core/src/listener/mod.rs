pub mod handle;
pub mod static_resolver;
pub mod r#trait;

pub use handle::ClientHandle;
pub use r#trait::{ListenerResolver, StateListener};
pub use static_resolver::StaticResolver;
