//! Scripted in-memory page for tests.
//!
//! Nodes appear and disappear on a timeline measured from the last
//! navigation using tokio's clock, so tests can run under
//! `#[tokio::test(start_paused = true)]` and be exact about timing.

use crate::{ActionKind, Driver, DriverError, Locator};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// An element on the scripted page.
#[derive(Debug, Clone)]
pub struct MemoryNode {
    locator: String,
    appears_after: Duration,
    disappears_after: Option<Duration>,
    hides: Vec<String>,
}

impl MemoryNode {
    /// A node matched by `locator`, present from page load.
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            appears_after: Duration::ZERO,
            disappears_after: None,
            hides: Vec::new(),
        }
    }

    pub fn appears_after(mut self, delay: Duration) -> Self {
        self.appears_after = delay;
        self
    }

    pub fn disappears_after(mut self, delay: Duration) -> Self {
        self.disappears_after = Some(delay);
        self
    }

    /// Clicking this node removes every node matched by `locator`.
    pub fn hides(mut self, locator: impl Into<String>) -> Self {
        self.hides.push(locator.into());
        self
    }
}

/// Handle returned by [`MemoryDriver::query`](Driver::query).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryElement {
    locator: String,
    index: usize,
    generation: u64,
}

impl MemoryElement {
    pub fn locator(&self) -> &str {
        &self.locator
    }
}

/// An action the driver actually applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedAction {
    pub locator: String,
    pub action: ActionKind,
    /// Time since the driver was created.
    pub at: Duration,
}

#[derive(Debug)]
struct Node {
    script: MemoryNode,
    removed: bool,
    value: Option<String>,
}

impl Node {
    fn visible(&self, since_load: Duration) -> bool {
        !self.removed
            && since_load >= self.script.appears_after
            && self.script.disappears_after.map_or(true, |d| since_load < d)
    }
}

#[derive(Debug)]
struct State {
    created: Instant,
    loaded: Instant,
    generation: u64,
    url: String,
    nodes: Vec<Node>,
    pages: HashMap<String, Vec<MemoryNode>>,
    probes: Vec<(String, Duration)>,
    actions: Vec<AppliedAction>,
    navigations: Vec<String>,
    query_fault: Option<String>,
    action_fault: Option<String>,
    strict_stale: bool,
    action_latency: Duration,
}

impl State {
    fn load(&mut self, nodes: Vec<MemoryNode>) {
        self.nodes = nodes
            .into_iter()
            .map(|script| Node {
                script,
                removed: false,
                value: None,
            })
            .collect();
    }
}

/// In-memory [`Driver`] with a scripted document.
#[derive(Debug)]
pub struct MemoryDriver {
    state: Mutex<State>,
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDriver {
    /// An empty `about:blank` page.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            state: Mutex::new(State {
                created: now,
                loaded: now,
                generation: 0,
                url: "about:blank".into(),
                nodes: Vec::new(),
                pages: HashMap::new(),
                probes: Vec::new(),
                actions: Vec::new(),
                navigations: Vec::new(),
                query_fault: None,
                action_fault: None,
                strict_stale: false,
                action_latency: Duration::ZERO,
            }),
        }
    }

    /// Add a node to the current page. Its timeline counts from the last navigation.
    pub fn add_node(&self, node: MemoryNode) -> &Self {
        self.state.lock().nodes.push(Node {
            script: node,
            removed: false,
            value: None,
        });
        self
    }

    /// Register the document loaded when navigating to `url`.
    pub fn add_page(&self, url: impl Into<String>, nodes: Vec<MemoryNode>) -> &Self {
        self.state.lock().pages.insert(url.into(), nodes);
        self
    }

    /// Remove every node matched by `locator` right now.
    pub fn remove(&self, locator: &str) {
        let mut state = self.state.lock();
        for node in state.nodes.iter_mut().filter(|n| n.script.locator == locator) {
            node.removed = true;
        }
    }

    /// Make every query fail with `message` (or stop failing with `None`).
    pub fn set_query_fault(&self, message: Option<&str>) {
        self.state.lock().query_fault = message.map(String::from);
    }

    /// Make every action fail with `message` (or stop failing with `None`).
    pub fn set_action_fault(&self, message: Option<&str>) {
        self.state.lock().action_fault = message.map(String::from);
    }

    /// When true, acting on a vanished element returns
    /// [`DriverError::StaleElement`]; otherwise it is a silent no-op.
    pub fn set_strict_stale(&self, strict: bool) {
        self.state.lock().strict_stale = strict;
    }

    /// Delay every action by `latency` before it touches the page, like a
    /// CDP round-trip. Nodes can vanish in between.
    pub fn set_action_latency(&self, latency: Duration) {
        self.state.lock().action_latency = latency;
    }

    /// Total number of queries, faulted ones included.
    pub fn probe_count(&self) -> usize {
        self.state.lock().probes.len()
    }

    pub fn probe_count_for(&self, locator: &str) -> usize {
        self.state
            .lock()
            .probes
            .iter()
            .filter(|(l, _)| l == locator)
            .count()
    }

    /// When each query for `locator` happened, relative to driver creation.
    pub fn probe_times(&self, locator: &str) -> Vec<Duration> {
        self.state
            .lock()
            .probes
            .iter()
            .filter(|(l, _)| l == locator)
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn actions(&self) -> Vec<AppliedAction> {
        self.state.lock().actions.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().navigations.clone()
    }

    /// Value last filled into the first node matched by `locator`.
    pub fn value_of(&self, locator: &str) -> Option<String> {
        self.state
            .lock()
            .nodes
            .iter()
            .find(|n| n.script.locator == locator)
            .and_then(|n| n.value.clone())
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    type Element = MemoryElement;

    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        let nodes = state.pages.get(url).cloned().unwrap_or_default();
        state.load(nodes);
        state.loaded = Instant::now();
        state.generation += 1;
        state.url = url.to_string();
        state.navigations.push(url.to_string());
        debug!("memory: navigated to {}", url);
        Ok(())
    }

    async fn query(&self, locator: &Locator) -> Result<Vec<MemoryElement>, DriverError> {
        let mut state = self.state.lock();
        let now = Instant::now();
        let at = now - state.created;
        state.probes.push((locator.to_string(), at));
        if let Some(ref message) = state.query_fault {
            return Err(DriverError::Backend(message.clone()));
        }

        let since_load = now - state.loaded;
        let generation = state.generation;
        Ok(state
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.script.locator == locator.as_str() && n.visible(since_load))
            .map(|(index, _)| MemoryElement {
                locator: locator.to_string(),
                index,
                generation,
            })
            .collect())
    }

    async fn apply_action(
        &self,
        element: &MemoryElement,
        action: &ActionKind,
    ) -> Result<(), DriverError> {
        let latency = self.state.lock().action_latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock();
        if let Some(ref message) = state.action_fault {
            return Err(DriverError::Backend(message.clone()));
        }
        let now = Instant::now();
        let since_load = now - state.loaded;
        let live = element.generation == state.generation
            && state
                .nodes
                .get(element.index)
                .is_some_and(|n| n.visible(since_load));
        if !live {
            if state.strict_stale {
                return Err(DriverError::StaleElement(element.locator.clone()));
            }
            debug!("memory: '{}' is gone, {} skipped", element.locator, action);
            return Ok(());
        }

        match action {
            ActionKind::Click => {
                let hides = state.nodes[element.index].script.hides.clone();
                for node in state
                    .nodes
                    .iter_mut()
                    .filter(|n| hides.contains(&n.script.locator))
                {
                    node.removed = true;
                }
            }
            ActionKind::Fill { value } => {
                state.nodes[element.index].value = Some(value.clone());
            }
        }

        let at = now - state.created;
        state.actions.push(AppliedAction {
            locator: element.locator.clone(),
            action: action.clone(),
            at,
        });
        Ok(())
    }

    async fn wait_ms(&self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.state.lock().url.clone())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        Ok(b"\x89PNG\r\n\x1a\n".to_vec())
    }
}
