//! Request handlers.

pub mod clips;
pub mod health;
pub mod recordings;
pub mod render;
pub mod slots;
pub mod webhook;

pub use clips::*;
pub use health::*;
pub use recordings::*;
pub use render::*;
pub use slots::*;
pub use webhook::*;
