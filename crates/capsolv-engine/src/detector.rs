//! Challenge image detection over the page model.
//!
//! The detector scans the whole document on activation and incrementally on
//! structural mutations, which arrive as an event stream feeding
//! [`ChallengeDetector::run`]. Each first-seen image identity dispatches one
//! resolution task; identities reset when detection stops.

use crate::PageHandle;
use crate::gate::ActivationGate;
use crate::resolver::ChallengeResolver;
use capsolv_common::protocol::{Node, PageMutation};
use capsolv_common::relay::ControlMessage;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Marker token in image ids/classes that flags a challenge image.
const IMAGE_MARKER: &str = "captchaimage";

/// Legacy fixed dimensions some challenge providers render at.
const LEGACY_DIMENSIONS: (&str, &str) = ("250", "50");

/// Events consumed by the detector loop.
#[derive(Debug, Clone)]
pub enum DetectorEvent {
    Mutation(PageMutation),
    Control(ControlMessage),
}

pub struct ChallengeDetector {
    page: PageHandle,
    resolver: Arc<ChallengeResolver>,
    gate: ActivationGate,
    seen: HashSet<String>,
}

impl ChallengeDetector {
    pub fn new(page: PageHandle, resolver: Arc<ChallengeResolver>) -> Self {
        Self {
            page,
            resolver,
            gate: ActivationGate::new(),
            seen: HashSet::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.gate.is_active()
    }

    /// Start detection and immediately scan existing content. Idempotent:
    /// calling while already active does nothing.
    pub async fn activate(&mut self) -> Option<JoinHandle<()>> {
        if !self.gate.activate() {
            return None;
        }
        info!("image challenge detector started");
        let root = self.page.read().await.root();
        match root {
            Some(root) => self.scan(root).await,
            None => None,
        }
    }

    /// Stop detection and forget every seen identity. Images processed
    /// before this point become eligible again after the next activation.
    pub fn deactivate(&mut self) {
        if !self.gate.deactivate() {
            return;
        }
        info!("image challenge detector stopped");
        self.seen.clear();
    }

    /// Scan `root` and its descendants for a qualifying challenge image and
    /// dispatch resolution for it if its identity is first-seen.
    ///
    /// Only the first match per scan call is considered; further qualifying
    /// images in the same subtree wait for a later mutation scan. Returns
    /// the handle of the spawned resolution, if one was dispatched.
    pub async fn scan(&mut self, root: u32) -> Option<JoinHandle<()>> {
        if !self.gate.is_active() {
            return None;
        }

        let found = {
            let page = self.page.read().await;
            page.descendants(root)
                .into_iter()
                .find(|n| qualifies(n))
                .map(|n| (n.id, n.attr("src").unwrap_or_default().to_string()))
        };
        let (image, key) = found?;

        if !self.seen.insert(key) {
            return None;
        }
        debug!(image, "challenge image detected");

        let resolver = Arc::clone(&self.resolver);
        let token = self.gate.token();
        Some(tokio::spawn(async move {
            match resolver.resolve(image, token).await {
                Ok(outcome) => debug!(image, ?outcome, "resolution finished"),
                Err(e) => warn!(image, error = %e, "challenge resolution failed"),
            }
        }))
    }

    /// Handle one event from the stream. Mutations arriving while inactive
    /// are dropped, which covers observer records still in flight when
    /// detection stopped.
    pub async fn handle_event(&mut self, event: DetectorEvent) -> Option<JoinHandle<()>> {
        match event {
            DetectorEvent::Mutation(m) => {
                if !self.gate.is_active() {
                    return None;
                }
                self.scan(m.added_root).await
            }
            DetectorEvent::Control(ControlMessage::ToggleStateChanged { is_enabled }) => {
                if is_enabled {
                    self.activate().await
                } else {
                    self.deactivate();
                    None
                }
            }
        }
    }

    /// Drain the event stream until the sender side closes.
    pub async fn run(&mut self, mut events: mpsc::UnboundedReceiver<DetectorEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
    }
}

/// Qualifying image signature: embedded-data source, marker token in id or
/// class, or the legacy fixed dimension pair.
fn qualifies(node: &Node) -> bool {
    if node.tag != "img" {
        return false;
    }
    if node.attr("src").unwrap_or_default().contains("base64") {
        return true;
    }
    if node.attr_lower("id").contains(IMAGE_MARKER) || node.attr_lower("class").contains(IMAGE_MARKER)
    {
        return true;
    }
    node.attr("width") == Some(LEGACY_DIMENSIONS.0) && node.attr("height") == Some(LEGACY_DIMENSIONS.1)
}
