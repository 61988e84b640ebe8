use serde::{Deserialize, Serialize};

/// Queue payload asking for pages to be (re)generated.
#[derive(Debug, Clone, Deserialize)]
pub struct PageTask {
    /// What `value` refers to.
    #[serde(rename = "type")]
    pub kind: PageTarget,
    pub value: String,
    #[serde(default)]
    pub options: PageOptions,
}

/// How the task's `value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageTarget {
    /// A single page path.
    Url,
    /// A named group of pages ("posts", "archive", "home").
    Scope,
    /// A server-side batch id prepared by the admin backend.
    Batch,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageOptions {
    /// Regenerate even when the store reports the page as current.
    #[serde(default)]
    pub force: bool,
}

/// Which artifact a render produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// The full static page.
    Static,
    /// The lightweight skeleton served while the full page loads.
    Skeleton,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Static => "static",
            RenderMode::Skeleton => "skeleton",
        }
    }
}

/// A concrete page the store resolved out of a task target.
#[derive(Debug, Clone, Deserialize)]
pub struct PageRef {
    /// Output path relative to the output root, e.g. `posts/42/index.html`.
    pub path: String,
    /// Whether the stored artifact is already up to date.
    pub current: bool,
}
