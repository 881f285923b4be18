//! A five-key chorded input daemon: captures simultaneous key-releases on
//! five designated chord keys, maps the resulting chord to a character
//! through a configurable character-set registry, and dispatches the result
//! to whichever window was focused before chord entry began.

pub mod charset;
pub mod chord;
pub mod condition;
pub mod config;
pub mod controller;
pub mod input_source;
pub mod output;
pub mod recognizer;
pub mod window;
