use std::path::{Component, Path, PathBuf};

use amqp_worker::{TaskError, TaskHandler, TaskOutcome};
use async_trait::async_trait;
use tokio::fs;
use uuid::Uuid;

use crate::error::{PagesError, PagesResult};
use crate::models::{PageTask, RenderMode};
use crate::renderer::PageRenderer;
use crate::store::PageStore;

/// Regenerates static page artifacts under an output root.
///
/// The same handler serves both page workers; `mode` selects whether it
/// produces full pages or skeletons. Pages the store reports as current
/// are left alone unless the task forces a rebuild, which makes batch
/// retries resumable: pages finished on an earlier attempt resolve as
/// current and drop out.
pub struct PageHandler<S, R> {
    store: S,
    renderer: R,
    mode: RenderMode,
    output_root: PathBuf,
}

impl<S, R> PageHandler<S, R> {
    pub fn new(store: S, renderer: R, mode: RenderMode, output_root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            renderer,
            mode,
            output_root: output_root.into(),
        }
    }
}

#[async_trait]
impl<S, R> TaskHandler for PageHandler<S, R>
where
    S: PageStore,
    R: PageRenderer,
{
    type Payload = PageTask;

    fn name(&self) -> &str {
        match self.mode {
            RenderMode::Static => "pages",
            RenderMode::Skeleton => "skeleton_pages",
        }
    }

    async fn handle(&self, task: PageTask) -> Result<TaskOutcome, TaskError> {
        if task.value.trim().is_empty() {
            return Err(TaskError::payload("page target value must not be empty"));
        }

        let pages = self.store.resolve(task.kind, &task.value).await?;
        if pages.is_empty() {
            tracing::info!(target = %task.value, "Target resolved to no pages");
            return Ok(TaskOutcome::skipped("no pages resolved for target"));
        }

        let stale: Vec<_> = pages
            .iter()
            .filter(|p| task.options.force || !p.current)
            .collect();
        if stale.is_empty() {
            return Ok(TaskOutcome::skipped("all pages already current"));
        }

        for page in &stale {
            let bytes = self.renderer.render(&page.path, self.mode).await?;
            write_atomic(&self.output_root, &page.path, &bytes).await?;
            self.store.mark_rendered(&page.path, self.mode).await?;
            tracing::debug!(path = %page.path, bytes = bytes.len(), "Page written");
        }

        tracing::info!(
            target = %task.value,
            kind = ?task.kind,
            mode = self.mode.as_str(),
            rendered = stale.len(),
            "Pages generated"
        );
        Ok(TaskOutcome::Completed)
    }
}

fn safe_join(root: &Path, rel: &str) -> PagesResult<PathBuf> {
    let rel_path = Path::new(rel);
    if rel_path.is_absolute()
        || rel_path
            .components()
            .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(PagesError::BadPath(rel.to_string()));
    }
    Ok(root.join(rel_path))
}

/// Write to a sibling temp file, then rename. The same-directory rename
/// keeps the swap atomic, so readers never see a half-written page.
async fn write_atomic(root: &Path, rel: &str, bytes: &[u8]) -> PagesResult<()> {
    let target = safe_join(root, rel)?;
    let parent = target
        .parent()
        .ok_or_else(|| PagesError::BadPath(rel.to_string()))?;
    fs::create_dir_all(parent).await?;

    let file_name = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| PagesError::BadPath(rel.to_string()))?;
    let tmp = parent.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, &target).await?;
    Ok(())
}
