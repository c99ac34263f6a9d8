//! StudioFE editing-session engine.
//!
//! An [`session::EditorSession`] owns one image's snapshot history and its
//! interactive overlays (text, pasted components). Commits rasterize on the
//! CPU; AI edits go through the [`ops::ai::ImageService`] trait.

#![allow(clippy::too_many_arguments)]

pub mod logger;
pub mod cli;
pub mod components;
pub mod error;
pub mod geometry;
pub mod io;
pub mod ops;
pub mod session;
pub mod settings;
pub mod snapshot;

pub use error::EditError;
pub use geometry::{DisplayBox, Geometry};
pub use session::{EditorSession, SessionView};
pub use snapshot::Snapshot;
