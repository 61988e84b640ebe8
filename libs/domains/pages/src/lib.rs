//! Page Generation Domain
//!
//! Two workers share this crate: `pages` writes full static pages,
//! `skeleton_pages` writes the lightweight placeholders served while a
//! full page loads. Both resolve their target through [`PageStore`],
//! fetch bytes from a [`PageRenderer`], and swap files into the output
//! root atomically.

pub mod error;
pub mod handler;
pub mod models;
pub mod renderer;
pub mod store;

// Re-export commonly used types
pub use error::{PagesError, PagesResult};
pub use handler::PageHandler;
pub use models::{PageOptions, PageRef, PageTarget, PageTask, RenderMode};
pub use renderer::{HttpPageRenderer, PageRenderer};
pub use store::{HttpPageStore, PageStore};
