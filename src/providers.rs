//! Per-platform episode extraction strategies
//!
//! Each supported platform gets one variant of [`Provider`], resolved from
//! the start URL's host. A harvest walks the loaded page, expanding season
//! selector UI where the platform paginates its listing, normalizes the
//! platform's attribute encoding into a canonical episode tuple, and hands
//! every complete tuple to the sink. Incomplete or unparseable elements are
//! logged and skipped; failures that invalidate the whole page propagate to
//! the orchestrator.

use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

use crate::dom::{DomError, Element, PageDom, first_present};
use crate::normalize::{
    label_number, link_fields, resolve_href, split_season_episode, strip_prefix, tracking_fields,
};
use crate::record::{EpisodeLink, StreamLinkSink};

const PARAMOUNT_SEASON_ENTRIES: &str = r#"ul[aa-region="season filter"] ul.content a"#;
const PARAMOUNT_SEASON_FILTER_BUTTON: &str = r#"ul[aa-region="season filter"] button"#;
const PARAMOUNT_EPISODE_LINKS: &str = "section#latest-episodes a.link";
const PARAMOUNT_DAILY_SHOW_SUFFIX: &str = "/shows/the-daily-show/";
const PARAMOUNT_WEEK_IN_REVIEW: &str = r#"section[aria-label="Week in Review"]"#;

const SHOWTIME_EPISODES: &str = "a[data-episode-id]";
const SHOWTIME_EPISODE_BASE: &str = "https://www.showtimeanytime.com/#/episode/";

const HBO_HEADING: &str = "div[role=heading]";
const HBO_SELECTED_SEASON: &str = r#"div[role=button][aria-label^="Selected, Season"]"#;
const HBO_SEASON_BUTTONS: &str = r#"div[role=button][aria-label^="Season"]"#;
const HBO_EPISODE_LINKS: &str = r#"a[role=link][href^="/episode"]"#;

const APPLE_TITLE: &str = "h1.details-title";
const APPLE_SEASON_LINKS: &str = "div.seasons-dropdown a";
const APPLE_EPISODE_LINKS: &str = "div.season-episodes a.mini";
const APPLE_EPISODE_NUMBER: &str = "p.num";
const APPLE_TOOLS_HOST: &str = "tools.applemediaservices.com";
const APPLE_PLAY_HOST: &str = "tv.apple.com";

const HULU_EPISODES: &str = ".EpisodeCollection__item";

const PEACOCK_SIGN_IN: &str = ".sign-in-form";
const PEACOCK_DETAILS: &str = ".program-details__content";
const PEACOCK_TITLE_IMAGE: &str = ".program-details__content img[alt]";
const PEACOCK_EPISODES: &str = ".episode";
const PEACOCK_SEASON_EPISODE: &str = ".episode__metadata-item--season-episode";

/// How long the sign-in wall is raced against the listing container.
const PEACOCK_GATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that invalidate a whole page's extraction
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The platform is showing its sign-in wall instead of the listing
    #[error("Sign-in required before episodes are visible")]
    SignInRequired,

    /// A DOM element or attribute the strategy depends on was absent
    #[error(transparent)]
    Dom(#[from] DomError),
}

/// The set of supported platforms, keyed by listing-page host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    ParamountPlus,
    Showtime,
    HboMax,
    AppleTv,
    Hulu,
    Peacock,
}

impl Provider {
    /// Resolves a start URL's host to its adapter, if the host is supported.
    pub fn for_host(host: &str) -> Option<Self> {
        match host {
            "www.paramountplus.com" => Some(Self::ParamountPlus),
            "www.sho.com" => Some(Self::Showtime),
            "play.hbomax.com" => Some(Self::HboMax),
            "tools.applemediaservices.com" => Some(Self::AppleTv),
            "www.hulu.com" => Some(Self::Hulu),
            "www.peacocktv.com" => Some(Self::Peacock),
            _ => None,
        }
    }

    /// Platform name for user-facing diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ParamountPlus => "Paramount+",
            Self::Showtime => "Showtime",
            Self::HboMax => "HBO Max",
            Self::AppleTv => "Apple TV",
            Self::Hulu => "Hulu",
            Self::Peacock => "PeacockTV",
        }
    }

    /// Extracts every episode on the loaded page, returning how many stream
    /// links were written.
    pub async fn harvest(
        &self,
        page: &dyn PageDom,
        sink: &StreamLinkSink,
    ) -> Result<usize, ExtractError> {
        match self {
            Self::ParamountPlus => harvest_paramount(page, sink).await,
            Self::Showtime => harvest_showtime(page, sink).await,
            Self::HboMax => harvest_hbomax(page, sink).await,
            Self::AppleTv => harvest_appletv(page, sink).await,
            Self::Hulu => harvest_hulu(page, sink).await,
            Self::Peacock => harvest_peacock(page, sink).await,
        }
    }
}

/// Validates and writes one tuple; returns whether a record was persisted.
fn emit(sink: &StreamLinkSink, show: &str, season: &str, episode: &str, url: &str) -> bool {
    let Some(link) = EpisodeLink::new(show, season, episode, url) else {
        warn!(
            "incomplete episode tuple (show={show:?} season={season:?} episode={episode:?}), skipping"
        );
        return false;
    };
    match sink.write(&link) {
        Ok(path) => {
            info!("generating stream link: {}", path.display());
            true
        }
        Err(error) => {
            error!("{error}");
            false
        }
    }
}

/// Reads an attribute the strategy cannot proceed without.
async fn required_attr(element: &Element, name: &'static str) -> Result<String, DomError> {
    element
        .attribute(name)
        .await?
        .ok_or(DomError::MissingAttribute(name))
}

/// Resolves the `href` of the first anchor below `element`, or reports why
/// the element was skipped.
async fn item_link(page_url: &Url, element: &Element) -> Result<Option<Url>, ExtractError> {
    let Ok(anchor) = element.find("a").await else {
        warn!("episode item has no link, skipping");
        return Ok(None);
    };
    let Some(href) = anchor.attribute("href").await? else {
        warn!("episode item link has no href, skipping");
        return Ok(None);
    };
    match resolve_href(page_url, &href) {
        Some(target) => Ok(Some(target)),
        None => {
            warn!("could not resolve episode href {href:?}, skipping");
            Ok(None)
        }
    }
}

async fn harvest_paramount(
    page: &dyn PageDom,
    sink: &StreamLinkSink,
) -> Result<usize, ExtractError> {
    if page
        .current_url()
        .await?
        .path()
        .ends_with(PARAMOUNT_DAILY_SHOW_SUFFIX)
    {
        return harvest_week_in_review(page, sink).await;
    }

    let mut written = 0;
    for entry in page.find_all(PARAMOUNT_SEASON_ENTRIES).await? {
        // The pre-selected season is already listed; every other entry has
        // to be activated through the filter dropdown first.
        if entry.attribute("data-selected").await?.is_none() {
            page.find(PARAMOUNT_SEASON_FILTER_BUTTON)
                .await?
                .click()
                .await?;
            entry.click().await?;
            page.wait_quiesced().await?;
        }
        written += harvest_paramount_listing(page, sink).await?;
    }
    Ok(written)
}

/// The Daily Show landing page lazy-loads its "Week in Review" carousel;
/// the section has to be scrolled into view before its links exist.
async fn harvest_week_in_review(
    page: &dyn PageDom,
    sink: &StreamLinkSink,
) -> Result<usize, ExtractError> {
    let section = page.find(PARAMOUNT_WEEK_IN_REVIEW).await?;
    section.scroll_into_view().await?;
    page.wait_quiesced().await?;

    let page_url = page.current_url().await?;
    let mut written = 0;
    for element in section.find_all("a.link").await? {
        if paramount_episode(&page_url, &element, sink).await? {
            written += 1;
        }
    }
    Ok(written)
}

async fn harvest_paramount_listing(
    page: &dyn PageDom,
    sink: &StreamLinkSink,
) -> Result<usize, ExtractError> {
    let page_url = page.current_url().await?;
    let mut written = 0;
    for element in page.find_all(PARAMOUNT_EPISODE_LINKS).await? {
        if paramount_episode(&page_url, &element, sink).await? {
            written += 1;
        }
    }
    Ok(written)
}

async fn paramount_episode(
    page_url: &Url,
    element: &Element,
    sink: &StreamLinkSink,
) -> Result<bool, ExtractError> {
    let Some(href) = element.attribute("href").await? else {
        warn!("episode link without href, skipping");
        return Ok(false);
    };
    let Some(target) = resolve_href(page_url, &href) else {
        warn!("could not resolve episode href {href:?}, skipping");
        return Ok(false);
    };

    // Which attribute is present decides the encoding; a present but
    // unparseable attribute fails the element without falling through.
    let fields = if let Some(raw) = element.attribute("data-tracking").await? {
        tracking_fields(&raw)
    } else if let Some(raw) = element.attribute("aa-link").await? {
        link_fields(&raw)
    } else {
        None
    };
    let Some(fields) = fields else {
        error!("could not find episode information for {href}");
        return Ok(false);
    };

    Ok(emit(
        sink,
        &fields.show,
        &fields.season,
        &fields.episode,
        target.as_str(),
    ))
}

async fn harvest_showtime(
    page: &dyn PageDom,
    sink: &StreamLinkSink,
) -> Result<usize, ExtractError> {
    let mut written = 0;
    for element in page.find_all(SHOWTIME_EPISODES).await? {
        let Some(id) = element.attribute("data-episode-id").await? else {
            continue;
        };
        let Some(label) = element.attribute("data-label").await? else {
            warn!("episode {id} has no data-label, skipping");
            continue;
        };
        // data-label: stream:<show>:season:<n>:episode:<n>
        let parts: Vec<&str> = label.split(':').collect();
        if parts.len() < 6 {
            error!("could not find episode information in label {label:?}");
            continue;
        }
        let url = format!("{SHOWTIME_EPISODE_BASE}{id}");
        if emit(sink, parts[1], parts[3], parts[5], &url) {
            written += 1;
        }
    }
    Ok(written)
}

async fn harvest_hbomax(page: &dyn PageDom, sink: &StreamLinkSink) -> Result<usize, ExtractError> {
    // The listing keeps loading after the navigation settles
    page.wait_quiesced().await?;

    let heading = page.find(HBO_HEADING).await?;
    let show = required_attr(&heading, "aria-label").await?;

    let selected = page.find(HBO_SELECTED_SEASON).await?;
    let season = label_number(
        &required_attr(&selected, "aria-label").await?,
        "Selected, Season ",
    );
    let mut written = harvest_hbomax_season(page, &show, &season, sink).await?;

    // Every other season; the selected one is excluded by its label prefix
    for button in page.find_all(HBO_SEASON_BUTTONS).await? {
        let Some(label) = button.attribute("aria-label").await? else {
            continue;
        };
        let season = label_number(&label, "Season ");
        button.click().await?;
        page.wait_quiesced().await?;
        written += harvest_hbomax_season(page, &show, &season, sink).await?;
    }
    Ok(written)
}

async fn harvest_hbomax_season(
    page: &dyn PageDom,
    show: &str,
    season: &str,
    sink: &StreamLinkSink,
) -> Result<usize, ExtractError> {
    let page_url = page.current_url().await?;
    let mut written = 0;
    for element in page.find_all(HBO_EPISODE_LINKS).await? {
        let Some(href) = element.attribute("href").await? else {
            warn!("episode link without href, skipping");
            continue;
        };
        let Some(target) = resolve_href(&page_url, &href) else {
            warn!("could not resolve episode href {href:?}, skipping");
            continue;
        };
        let Some(label) = element.attribute("aria-label").await? else {
            warn!("episode link {href} has no aria-label, skipping");
            continue;
        };
        let episode = label_number(&label, "Episode, ");
        if emit(sink, show, season, &episode, target.as_str()) {
            written += 1;
        }
    }
    Ok(written)
}

async fn harvest_appletv(page: &dyn PageDom, sink: &StreamLinkSink) -> Result<usize, ExtractError> {
    let show = page.find(APPLE_TITLE).await?.text().await?.trim().to_string();
    info!("show: {show}");

    let page_url = page.current_url().await?;
    let mut season_pages = Vec::new();
    for link in page.find_all(APPLE_SEASON_LINKS).await? {
        let Some(href) = link.attribute("href").await? else {
            continue;
        };
        // "#" is the disabled placeholder for the season already shown
        if href == "#" {
            continue;
        }
        if let Some(target) = resolve_href(&page_url, &href) {
            season_pages.push(target);
        }
    }

    let mut written = 0;
    for target in season_pages {
        page.navigate(target.as_str()).await?;
        page.wait_settled().await?;

        let heading = page.find(APPLE_TITLE).await?.text().await?;
        let season = strip_prefix(heading.trim(), "Season ").to_string();
        let page_url = page.current_url().await?;

        for element in page.find_all(APPLE_EPISODE_LINKS).await? {
            let Some(href) = element.attribute("href").await? else {
                warn!("episode link without href, skipping");
                continue;
            };
            let Some(mut target) = resolve_href(&page_url, &href) else {
                warn!("could not resolve episode href {href:?}, skipping");
                continue;
            };
            // The tools host only serves the listing; playback lives on
            // tv.apple.com.
            if target.domain() == Some(APPLE_TOOLS_HOST)
                && target.set_host(Some(APPLE_PLAY_HOST)).is_err()
            {
                warn!("could not rewrite host for {href:?}, skipping");
                continue;
            }
            let number = match element.find(APPLE_EPISODE_NUMBER).await {
                Ok(node) => node.text().await?,
                Err(_) => {
                    warn!("episode link {href} has no number, skipping");
                    continue;
                }
            };
            let episode = strip_prefix(number.trim(), "Episode ").to_string();
            if emit(sink, &show, &season, &episode, target.as_str()) {
                written += 1;
            }
        }
    }
    Ok(written)
}

async fn harvest_hulu(page: &dyn PageDom, sink: &StreamLinkSink) -> Result<usize, ExtractError> {
    let page_url = page.current_url().await?;
    let mut written = 0;
    for element in page.find_all(HULU_EPISODES).await? {
        let Some(target) = item_link(&page_url, &element).await? else {
            continue;
        };
        let show = meta_content(&element, "partOfSeries").await?;
        let season = meta_content(&element, "partOfSeason").await?;
        let episode = meta_content(&element, "episodeNumber").await?;
        let (Some(show), Some(season), Some(episode)) = (show, season, episode) else {
            warn!("episode item is missing structured metadata, skipping");
            continue;
        };
        if emit(sink, &show, &season, &episode, target.as_str()) {
            written += 1;
        }
    }
    Ok(written)
}

/// Reads the `content` of a `meta[itemprop=...]` tag below `element`.
async fn meta_content(element: &Element, itemprop: &str) -> Result<Option<String>, ExtractError> {
    let selector = format!(r#"meta[itemprop="{itemprop}"]"#);
    match element.find(&selector).await {
        Ok(meta) => Ok(meta.attribute("content").await?),
        Err(_) => Ok(None),
    }
}

async fn harvest_peacock(page: &dyn PageDom, sink: &StreamLinkSink) -> Result<usize, ExtractError> {
    // The sign-in wall and the listing render mutually exclusively;
    // whichever appears first decides whether this page is harvestable.
    if first_present(page, &[PEACOCK_SIGN_IN, PEACOCK_DETAILS], PEACOCK_GATE_TIMEOUT).await? == 0 {
        return Err(ExtractError::SignInRequired);
    }

    let image = page.find(PEACOCK_TITLE_IMAGE).await?;
    let show = required_attr(&image, "alt").await?;

    let page_url = page.current_url().await?;
    let mut written = 0;
    for element in page.find_all(PEACOCK_EPISODES).await? {
        let Some(target) = item_link(&page_url, &element).await? else {
            continue;
        };
        let text = match element.find(PEACOCK_SEASON_EPISODE).await {
            Ok(node) => node.text().await?,
            Err(_) => {
                warn!("episode item has no season/episode metadata, skipping");
                continue;
            }
        };
        let Some((season, episode)) = split_season_episode(text.trim()) else {
            error!("could not find episode information for {target}");
            continue;
        };
        if emit(sink, &show, &season, &episode, target.as_str()) {
            written += 1;
        }
    }
    Ok(written)
}
