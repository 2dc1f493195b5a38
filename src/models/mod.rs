// Re-export all model types
pub use self::cart::*;
pub use self::catalog::*;
pub use self::errors::*;
pub use self::session::*;

mod cart;
mod catalog;
mod errors;
mod session;
