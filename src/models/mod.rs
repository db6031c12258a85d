pub mod chat;
pub mod curriculum;
pub mod diagnostics;
pub mod envelope;
pub mod error;
pub mod events;
pub mod health;
pub mod version;

pub use chat::*;
pub use curriculum::*;
pub use diagnostics::*;
pub use envelope::*;
pub use error::*;
pub use events::*;
pub use health::*;
pub use version::*;
