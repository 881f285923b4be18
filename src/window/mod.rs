//! Window-system adapter and focus controller.

pub mod adapter;
pub mod focus;

pub use adapter::{NetFeature, Platform, Window, X11Platform};
pub use focus::FocusControl;
