//! WhatsApp Cloud API adapter: speaks the provider's REST surface
//! directly over `reqwest` since no dedicated SDK crate exists.

pub mod adapter;
pub mod error;
pub mod formatter;
pub mod lid_map;

pub use adapter::WhatsAppChannel;
pub use error::WhatsAppError;
pub use formatter::WhatsAppFormatter;
pub use lid_map::LidMap;
