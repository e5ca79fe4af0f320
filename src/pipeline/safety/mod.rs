pub mod types;
pub mod keywords;
pub mod redact;
pub mod reply;
pub mod routing;

pub use types::*;
pub use keywords::*;
pub use redact::*;
pub use reply::*;
pub use routing::*;
