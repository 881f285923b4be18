//! Buffers and dispatches synthetic key output to the previously focused
//! application window.

pub mod buffer;
pub mod dispatch;
pub mod modifiers;

pub use buffer::Buffer;
pub use dispatch::{key_sym_string, Dispatcher};
pub use modifiers::{mod_string, ModifierFlag};
