use async_trait::async_trait;
use capsolv_engine::backend::{PageBackend, PageError, SyntheticEvent};
use capsolv_engine::detector::{ChallengeDetector, DetectorEvent};
use capsolv_engine::page_handle;
use capsolv_engine::protocol::{Node, PageMutation, PageSnapshot, Rect};
use capsolv_engine::relay::{ChallengePayload, ControlMessage, RelayResponse, SolverRelay};
use capsolv_engine::resolver::ChallengeResolver;
use capsolv_engine::PageHandle;
use std::sync::{Arc, Mutex};

fn node(id: u32, tag: &str, parent: Option<u32>, attrs: &[(&str, &str)]) -> Node {
    Node {
        id,
        tag: tag.into(),
        attributes: attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        rect: Rect::default(),
        parent,
        children: Vec::new(),
        value: None,
    }
}

fn challenge_subtree(base: u32, parent: u32, src: &str) -> Vec<Node> {
    vec![
        node(base, "div", Some(parent), &[]),
        node(base + 1, "img", Some(base), &[("src", src)]),
        node(base + 2, "input", Some(base), &[("name", "captcha")]),
    ]
}

/// Backend where every image is loaded and encodable.
struct InstantBackend;

#[async_trait]
impl PageBackend for InstantBackend {
    async fn await_image_load(&self, _image: u32) -> Result<(), PageError> {
        Ok(())
    }
    async fn encode_image(&self, _image: u32) -> Result<String, PageError> {
        Ok("PIXELS".to_string())
    }
    async fn set_value(&self, _field: u32, _value: &str) -> Result<(), PageError> {
        Ok(())
    }
    async fn dispatch(&self, _field: u32, _event: SyntheticEvent) -> Result<(), PageError> {
        Ok(())
    }
}

#[derive(Default)]
struct CountingRelay {
    calls: Mutex<Vec<ChallengePayload>>,
}

#[async_trait]
impl SolverRelay for CountingRelay {
    async fn solve(&self, payload: ChallengePayload) -> RelayResponse {
        self.calls.lock().unwrap().push(payload);
        RelayResponse::Solution {
            solution: "8x7f".into(),
        }
    }
}

struct Fixture {
    page: PageHandle,
    relay: Arc<CountingRelay>,
    detector: ChallengeDetector,
}

impl Fixture {
    fn new(page: PageSnapshot) -> Self {
        let page = page_handle(page);
        let relay = Arc::new(CountingRelay::default());
        let resolver = Arc::new(ChallengeResolver::new(
            page.clone(),
            Arc::new(InstantBackend),
            relay.clone(),
        ));
        let detector = ChallengeDetector::new(page.clone(), resolver);
        Self {
            page,
            relay,
            detector,
        }
    }

    fn dispatches(&self) -> usize {
        self.relay.calls.lock().unwrap().len()
    }
}

fn page_with_challenge() -> PageSnapshot {
    let mut page = PageSnapshot::default();
    page.insert(node(0, "body", None, &[]));
    for n in challenge_subtree(1, 0, "data:image/png;base64,AAA") {
        page.insert(n);
    }
    page
}

#[tokio::test(start_paused = true)]
async fn inactive_detector_never_dispatches() {
    let mut f = Fixture::new(page_with_challenge());

    assert!(f.detector.scan(0).await.is_none());
    let handled = f
        .detector
        .handle_event(DetectorEvent::Mutation(PageMutation { added_root: 0 }))
        .await;
    assert!(handled.is_none());
    assert_eq!(f.dispatches(), 0);
}

#[tokio::test(start_paused = true)]
async fn activation_scans_existing_content_once() {
    let mut f = Fixture::new(page_with_challenge());

    let handle = f.detector.activate().await.expect("one dispatch");
    handle.await.unwrap();
    assert_eq!(f.dispatches(), 1);

    // Idempotent: a second activate neither rescans nor re-dispatches.
    assert!(f.detector.activate().await.is_none());
    // Same identity key: further scans are no-ops.
    assert!(f.detector.scan(0).await.is_none());
    assert_eq!(f.dispatches(), 1);
}

#[tokio::test(start_paused = true)]
async fn dedup_state_resets_across_activation_cycle() {
    let mut f = Fixture::new(page_with_challenge());

    f.detector.activate().await.expect("dispatch").await.unwrap();
    f.detector.deactivate();

    let handle = f.detector.activate().await.expect("re-dispatch");
    handle.await.unwrap();
    assert_eq!(f.dispatches(), 2);
}

#[tokio::test(start_paused = true)]
async fn mutation_scan_picks_up_added_subtree() {
    let mut page = PageSnapshot::default();
    page.insert(node(0, "body", None, &[]));
    let mut f = Fixture::new(page);

    assert!(f.detector.activate().await.is_none());

    {
        let mut page = f.page.write().await;
        for n in challenge_subtree(1, 0, "data:image/png;base64,BBB") {
            page.insert(n);
        }
    }
    let handle = f
        .detector
        .handle_event(DetectorEvent::Mutation(PageMutation { added_root: 1 }))
        .await
        .expect("dispatch from mutation");
    handle.await.unwrap();
    assert_eq!(f.dispatches(), 1);
}

#[tokio::test(start_paused = true)]
async fn only_first_match_per_scan_is_processed() {
    let mut page = page_with_challenge();
    for n in challenge_subtree(10, 0, "data:image/png;base64,SECOND") {
        page.insert(n);
    }
    let mut f = Fixture::new(page);

    f.detector.activate().await.expect("dispatch").await.unwrap();
    assert_eq!(f.dispatches(), 1);

    // The second image qualifies but the first (already seen) match shadows
    // it within a single scan call.
    assert!(f.detector.scan(0).await.is_none());
    assert_eq!(f.dispatches(), 1);

    // A scan rooted at the second subtree does reach it.
    let handle = f.detector.scan(10).await.expect("dispatch");
    handle.await.unwrap();
    assert_eq!(f.dispatches(), 2);
}

#[tokio::test(start_paused = true)]
async fn control_broadcast_toggles_detection() {
    let mut f = Fixture::new(page_with_challenge());

    let handle = f
        .detector
        .handle_event(DetectorEvent::Control(ControlMessage::ToggleStateChanged {
            is_enabled: true,
        }))
        .await
        .expect("enable triggers scan");
    handle.await.unwrap();
    assert!(f.detector.is_active());
    assert_eq!(f.dispatches(), 1);

    f.detector
        .handle_event(DetectorEvent::Control(ControlMessage::ToggleStateChanged {
            is_enabled: false,
        }))
        .await;
    assert!(!f.detector.is_active());
}

#[tokio::test(start_paused = true)]
async fn deactivation_strands_queued_resolution() {
    let mut f = Fixture::new(page_with_challenge());

    let handle = f.detector.activate().await.expect("dispatch");
    // Deactivate before the spawned resolution gets to run: its token is
    // stale, so it must not contact the relay.
    f.detector.deactivate();
    handle.await.unwrap();
    assert_eq!(f.dispatches(), 0);
}
