//! Configuration file formats and live-reload wiring: key bindings,
//! character sets, and main settings.

pub mod charset_file;
pub mod keybindings;
pub mod settings;

pub use keybindings::{Binding, Bindings, CHORD_KEY_ACTIONS};
pub use settings::MainSettings;
