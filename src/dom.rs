//! Browser page abstraction
//!
//! The adapters and the orchestrator talk to the rendered DOM through these
//! traits rather than a concrete automation engine, so they can be exercised
//! against an in-memory fake in tests. The live implementation backed by
//! chromiumoxide lives in the `browser` module.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Errors surfaced by DOM queries and page commands
#[derive(Debug, Error)]
pub enum DomError {
    /// No element matched the selector
    #[error("No element matched selector {0:?}")]
    NotFound(String),

    /// A required attribute was missing from a matched element
    #[error("Element is missing the {0:?} attribute")]
    MissingAttribute(&'static str),

    /// The page reported no usable URL
    #[error("Page has no resolvable URL")]
    NoUrl,

    /// The underlying browser command failed
    #[error("Browser command failed: {0}")]
    Command(String),
}

/// A handle to a single element in the rendered DOM.
pub type Element = Box<dyn DomElement>;

/// One loaded browser page.
#[async_trait]
pub trait PageDom: Send + Sync {
    /// The page's currently loaded URL. Follows in-adapter navigation, so
    /// relative links resolve against where the page actually is.
    async fn current_url(&self) -> Result<Url, DomError>;

    async fn navigate(&self, url: &str) -> Result<(), DomError>;

    /// Blocks until the last navigation has completed and the page has
    /// settled enough to read.
    async fn wait_settled(&self) -> Result<(), DomError>;

    /// Blocks until data requests triggered by an in-page action (season
    /// click, lazy-load scroll) have had a chance to resolve.
    async fn wait_quiesced(&self) -> Result<(), DomError>;

    async fn find(&self, selector: &str) -> Result<Element, DomError>;

    async fn find_all(&self, selector: &str) -> Result<Vec<Element>, DomError>;

    async fn exists(&self, selector: &str) -> Result<bool, DomError> {
        Ok(!self.find_all(selector).await?.is_empty())
    }
}

/// One element within a page.
#[async_trait]
pub trait DomElement: Send + Sync {
    async fn attribute(&self, name: &str) -> Result<Option<String>, DomError>;

    async fn text(&self) -> Result<String, DomError>;

    async fn click(&self) -> Result<(), DomError>;

    async fn scroll_into_view(&self) -> Result<(), DomError>;

    /// Finds the first descendant matching `selector`.
    async fn find(&self, selector: &str) -> Result<Element, DomError>;

    /// Finds all descendants matching `selector`.
    async fn find_all(&self, selector: &str) -> Result<Vec<Element>, DomError>;
}

/// Polls the page until one of `selectors` matches, returning the index of
/// the first match.
///
/// Used to race mutually exclusive page states, e.g. a sign-in wall against
/// the expected content container.
pub(crate) async fn first_present(
    page: &dyn PageDom,
    selectors: &[&str],
    timeout: Duration,
) -> Result<usize, DomError> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        for (index, selector) in selectors.iter().enumerate() {
            if page.exists(selector).await? {
                return Ok(index);
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(DomError::NotFound(selectors.join(", ")));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory DOM for adapter tests.
    //!
    //! Selectors are opaque keys: a fake page maps each selector string the
    //! code under test uses to a list of nodes. Clicking a node can patch
    //! the current page's selector map, which is how season-expansion
    //! reloads are modeled.

    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use url::Url;

    use super::{DomElement, DomError, Element, PageDom};

    #[derive(Debug, Clone, Default)]
    pub(crate) struct FakeNode {
        attrs: Vec<(String, String)>,
        text: String,
        children: Vec<(String, Vec<FakeNode>)>,
        click_patches: Vec<(String, Vec<FakeNode>)>,
    }

    impl FakeNode {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn attr(mut self, name: &str, value: &str) -> Self {
            self.attrs.push((name.to_string(), value.to_string()));
            self
        }

        pub(crate) fn text(mut self, text: &str) -> Self {
            self.text = text.to_string();
            self
        }

        pub(crate) fn child(mut self, selector: &str, nodes: Vec<FakeNode>) -> Self {
            self.children.push((selector.to_string(), nodes));
            self
        }

        /// On click, replace the nodes behind `selector` on the current page.
        pub(crate) fn patch_on_click(mut self, selector: &str, nodes: Vec<FakeNode>) -> Self {
            self.click_patches.push((selector.to_string(), nodes));
            self
        }
    }

    type SelectorMap = HashMap<String, Vec<FakeNode>>;

    #[derive(Debug)]
    struct DomState {
        pages: HashMap<String, SelectorMap>,
        current: String,
    }

    #[derive(Debug, Clone)]
    pub(crate) struct FakePage {
        state: Arc<Mutex<DomState>>,
    }

    impl FakePage {
        /// A single page at `url` with the given selector → nodes map.
        pub(crate) fn single(url: &str, selectors: Vec<(&str, Vec<FakeNode>)>) -> Self {
            Self::with_pages(url, vec![(url, selectors)])
        }

        /// Several pages reachable by navigation, starting at `current`.
        pub(crate) fn with_pages(
            current: &str,
            pages: Vec<(&str, Vec<(&str, Vec<FakeNode>)>)>,
        ) -> Self {
            let pages = pages
                .into_iter()
                .map(|(url, selectors)| {
                    let map = selectors
                        .into_iter()
                        .map(|(selector, nodes)| (selector.to_string(), nodes))
                        .collect();
                    (url.to_string(), map)
                })
                .collect();
            Self {
                state: Arc::new(Mutex::new(DomState {
                    pages,
                    current: current.to_string(),
                })),
            }
        }

        fn lookup(&self, selector: &str) -> Vec<FakeNode> {
            let state = self.state.lock().unwrap();
            state
                .pages
                .get(&state.current)
                .and_then(|page| page.get(selector))
                .cloned()
                .unwrap_or_default()
        }

        fn element(&self, node: FakeNode) -> Element {
            Box::new(FakeElement {
                node,
                state: Arc::clone(&self.state),
            })
        }
    }

    #[async_trait]
    impl PageDom for FakePage {
        async fn current_url(&self) -> Result<Url, DomError> {
            let current = self.state.lock().unwrap().current.clone();
            Url::parse(&current).map_err(|_| DomError::NoUrl)
        }

        async fn navigate(&self, url: &str) -> Result<(), DomError> {
            let mut state = self.state.lock().unwrap();
            state.pages.entry(url.to_string()).or_default();
            state.current = url.to_string();
            Ok(())
        }

        async fn wait_settled(&self) -> Result<(), DomError> {
            Ok(())
        }

        async fn wait_quiesced(&self) -> Result<(), DomError> {
            Ok(())
        }

        async fn find(&self, selector: &str) -> Result<Element, DomError> {
            self.lookup(selector)
                .into_iter()
                .next()
                .map(|node| self.element(node))
                .ok_or_else(|| DomError::NotFound(selector.to_string()))
        }

        async fn find_all(&self, selector: &str) -> Result<Vec<Element>, DomError> {
            Ok(self
                .lookup(selector)
                .into_iter()
                .map(|node| self.element(node))
                .collect())
        }
    }

    struct FakeElement {
        node: FakeNode,
        state: Arc<Mutex<DomState>>,
    }

    impl FakeElement {
        fn children(&self, selector: &str) -> Vec<FakeNode> {
            self.node
                .children
                .iter()
                .find(|(sel, _)| sel == selector)
                .map(|(_, nodes)| nodes.clone())
                .unwrap_or_default()
        }

        fn element(&self, node: FakeNode) -> Element {
            Box::new(FakeElement {
                node,
                state: Arc::clone(&self.state),
            })
        }
    }

    #[async_trait]
    impl DomElement for FakeElement {
        async fn attribute(&self, name: &str) -> Result<Option<String>, DomError> {
            Ok(self
                .node
                .attrs
                .iter()
                .find(|(attr, _)| attr == name)
                .map(|(_, value)| value.clone()))
        }

        async fn text(&self) -> Result<String, DomError> {
            Ok(self.node.text.clone())
        }

        async fn click(&self) -> Result<(), DomError> {
            let mut state = self.state.lock().unwrap();
            let current = state.current.clone();
            if let Some(page) = state.pages.get_mut(&current) {
                for (selector, nodes) in &self.node.click_patches {
                    page.insert(selector.clone(), nodes.clone());
                }
            }
            Ok(())
        }

        async fn scroll_into_view(&self) -> Result<(), DomError> {
            Ok(())
        }

        async fn find(&self, selector: &str) -> Result<Element, DomError> {
            self.children(selector)
                .into_iter()
                .next()
                .map(|node| self.element(node))
                .ok_or_else(|| DomError::NotFound(selector.to_string()))
        }

        async fn find_all(&self, selector: &str) -> Result<Vec<Element>, DomError> {
            Ok(self
                .children(selector)
                .into_iter()
                .map(|node| self.element(node))
                .collect())
        }
    }
}
