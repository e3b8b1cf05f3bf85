//! Per-URL processing boundary
//!
//! Resolves each start URL to its provider, drives a page through navigation
//! and extraction, and converts every failure into a diagnostic scoped to
//! that URL so the rest of the batch is unaffected.

use tracing::{error, info};
use url::Url;

use crate::browser::BrowserSession;
use crate::dom::PageDom;
use crate::providers::{ExtractError, Provider};
use crate::record::StreamLinkSink;

/// Processes one start URL end to end. Never fails the batch: every error is
/// reported and swallowed here.
pub(crate) async fn process_url(session: &BrowserSession, sink: &StreamLinkSink, raw: &str) {
    let parsed = match Url::parse(raw) {
        Ok(parsed) => parsed,
        Err(error) => {
            error!("unrecognized URL {raw:?}: {error}");
            return;
        }
    };
    let host = parsed.host_str().unwrap_or_default();
    let Some(provider) = Provider::for_host(host) else {
        error!("unrecognized domain: {host}");
        return;
    };

    info!("loading page: {raw}");
    let page = match session.new_page().await {
        Ok(page) => page,
        Err(error) => {
            error!("failed to open a page for {raw}: {error}");
            return;
        }
    };

    let outcome = harvest_page(&page, provider, raw, sink).await;
    page.close().await;

    match outcome {
        Ok(written) => info!("harvested {written} stream link(s) from {raw}"),
        Err(ExtractError::SignInRequired) => {
            error!("please sign in to your {} account first", provider.name());
        }
        Err(error) => error!("failed to process {raw}: {error}"),
    }
}

/// Navigates a page to `url`, waits for it to settle, and runs the
/// provider's extraction on it.
pub(crate) async fn harvest_page(
    page: &dyn PageDom,
    provider: Provider,
    url: &str,
    sink: &StreamLinkSink,
) -> Result<usize, ExtractError> {
    page.navigate(url).await?;
    page.wait_settled().await?;
    provider.harvest(page, sink).await
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::dom::fake::{FakeNode, FakePage};

    #[tokio::test]
    async fn test_harvest_page_navigates_before_extracting() {
        let dir = tempfile::tempdir().unwrap();
        let sink = StreamLinkSink::new(dir.path());
        let target = "https://www.sho.com/black-monday";
        let page = FakePage::with_pages(
            "about:blank",
            vec![(
                target,
                vec![(
                    "a[data-episode-id]",
                    vec![FakeNode::new()
                        .attr("data-episode-id", "42")
                        .attr("data-label", "stream:Black Monday:season:1:episode:2")],
                )],
            )],
        );

        let written = harvest_page(&page, Provider::Showtime, target, &sink)
            .await
            .unwrap();

        assert_eq!(written, 1);
        let record = dir.path().join("TV/Black Monday/S1E2.strmlnk");
        assert_eq!(
            fs::read_to_string(record).unwrap(),
            "https://www.showtimeanytime.com/#/episode/42\n"
        );
    }
}
