//! [`PageBackend`] over a static page snapshot.
//!
//! Snapshots carry image pixel data inline as data-URI sources, so encoding
//! means stripping the prefix; images with external sources are not readable
//! here, which mirrors the tainted-canvas failure on a live page. Synthetic
//! events have no page to land on and are only logged.

use async_trait::async_trait;
use capsolv_engine::PageHandle;
use capsolv_engine::backend::{PageBackend, PageError, SyntheticEvent};
use tracing::debug;

pub struct SnapshotBackend {
    page: PageHandle,
}

impl SnapshotBackend {
    pub fn new(page: PageHandle) -> Self {
        Self { page }
    }
}

#[async_trait]
impl PageBackend for SnapshotBackend {
    async fn await_image_load(&self, image: u32) -> Result<(), PageError> {
        let (complete, errored) = {
            let page = self.page.read().await;
            let node = page
                .node(image)
                .ok_or(PageError::UnknownNode(image))?;
            (
                node.attr("complete") != Some("false"),
                node.attr("load_error").is_some(),
            )
        };
        if errored {
            return Err(PageError::Load("image resource failed".into()));
        }
        if !complete {
            // An incomplete image in a static snapshot never finishes.
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn encode_image(&self, image: u32) -> Result<String, PageError> {
        let page = self.page.read().await;
        let node = page.node(image).ok_or(PageError::UnknownNode(image))?;
        let src = node
            .attr("src")
            .ok_or_else(|| PageError::Encoding("image has no source".into()))?;
        match src.split_once("base64,") {
            Some((_, body)) => Ok(body.to_string()),
            None => Err(PageError::Encoding(
                "pixel data not readable from snapshot (external source)".into(),
            )),
        }
    }

    async fn set_value(&self, field: u32, value: &str) -> Result<(), PageError> {
        let mut page = self.page.write().await;
        let node = page.node_mut(field).ok_or(PageError::UnknownNode(field))?;
        node.value = Some(value.to_string());
        Ok(())
    }

    async fn dispatch(&self, field: u32, event: SyntheticEvent) -> Result<(), PageError> {
        let page = self.page.read().await;
        page.node(field).ok_or(PageError::UnknownNode(field))?;
        debug!(field, ?event, "synthetic event");
        Ok(())
    }
}
