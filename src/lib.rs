//! Biblio application library
//!
//! Wires the workspace crates into the personal library tracker: the `users`
//! module serves login and registration, the `books` module serves each
//! user's reading list.

pub mod app;
pub mod modules;

pub use app::{run, Application};
