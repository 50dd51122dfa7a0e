//! DOM-to-record mapping.
//!
//! Each item container is read with a fixed resolution order per field:
//! configured selector chain first, then generic fallbacks that cover the
//! usual listing-site markup, then container data attributes.

pub mod selector;
pub mod text;

use scraper::{ElementRef, Html};
use url::Url;

use crate::models::{CompiledSource, RawRecord};
use crate::scraper::RenderedPage;
use crate::{AppError, Result};

use selector::{element_text, non_empty_attr, SelectorChain};
use text::{clean_title, normalize_whitespace};

const LINK_TITLE_SELECTORS: &[&str] = &["span.title", "h1", "h2", "h3", "strong"];
const COMPANY_FALLBACK_SELECTORS: &[&str] =
    &["span.company", ".company", ".company-name", "[class*='company']"];
const LOCATION_FALLBACK_SELECTORS: &[&str] = &[
    "span.region",
    ".region",
    "span.location",
    ".location",
    "[class*='location']",
];
const COMPANY_ATTRIBUTES: &[&str] = &["data-company", "data-company-name"];
const LOCATION_ATTRIBUTES: &[&str] = &["data-location", "data-job-location"];

/// Generic selectors shared by every source.
#[derive(Debug, Clone)]
pub struct Extractor {
    link_title: SelectorChain,
    company_fallback: SelectorChain,
    location_fallback: SelectorChain,
    base: SelectorChain,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    pub fn new() -> Self {
        Self {
            link_title: SelectorChain::from_static(LINK_TITLE_SELECTORS),
            company_fallback: SelectorChain::from_static(COMPANY_FALLBACK_SELECTORS),
            location_fallback: SelectorChain::from_static(LOCATION_FALLBACK_SELECTORS),
            base: SelectorChain::from_static(&["base[href]"]),
        }
    }

    /// Read up to `limit` listings from `page`, in document order.
    ///
    /// Fails with [`AppError::SourceUnavailable`] when no container matches
    /// the item selector. Records with neither title nor link are dropped.
    pub fn extract(&self, page: &RenderedPage, source: &CompiledSource) -> Result<Vec<RawRecord>> {
        let config = &source.config;
        let document = Html::parse_document(&page.html);
        let base = self.document_base(&document, &page.url);

        let containers: Vec<ElementRef<'_>> = document.select(&source.item).collect();
        if containers.is_empty() {
            return Err(AppError::source_unavailable(
                &config.name,
                &config.url,
                &config.item_selector,
                "no elements matched",
            ));
        }

        let matched = containers.len();
        let records: Vec<RawRecord> = containers
            .into_iter()
            .take(config.limit)
            .map(|container| self.extract_item(container, source, &base))
            .filter(|record| !record.is_blank())
            .collect();

        tracing::debug!(
            source = %config.name,
            matched,
            kept = records.len(),
            "Extracted listings"
        );
        Ok(records)
    }

    fn extract_item(&self, container: ElementRef<'_>, source: &CompiledSource, base: &Url) -> RawRecord {
        let title_el = source.title.primary_element(container);
        let link_el = source.link.first_element(container);

        let raw_title = source
            .title
            .first_text(container)
            .or_else(|| self.fallback_title(link_el, title_el))
            .unwrap_or_default();
        let title = clean_title(&raw_title, &source.config.strip_after, &source.title_patterns);

        let company = self.resolve_field(
            container,
            link_el,
            &source.company,
            &self.company_fallback,
            COMPANY_ATTRIBUTES,
        );
        let location = self.resolve_field(
            container,
            link_el,
            &source.location,
            &self.location_fallback,
            LOCATION_ATTRIBUTES,
        );

        RawRecord {
            title,
            link: resolve_link(link_el, title_el, base),
            company,
            location,
            source: source.config.name.clone(),
        }
    }

    fn fallback_title(&self, link_el: Option<ElementRef<'_>>, title_el: Option<ElementRef<'_>>) -> Option<String> {
        link_el
            .and_then(|el| self.link_title.first_text(el))
            .or_else(|| attr(link_el, "aria-label"))
            .or_else(|| attr(link_el, "title"))
            .or_else(|| link_el.map(element_text).filter(|text| !text.is_empty()))
            .or_else(|| attr(title_el, "aria-label"))
            .or_else(|| attr(title_el, "title"))
    }

    fn resolve_field(
        &self,
        container: ElementRef<'_>,
        link_el: Option<ElementRef<'_>>,
        configured: &SelectorChain,
        fallback: &SelectorChain,
        attributes: &[&str],
    ) -> Option<String> {
        configured
            .first_text(container)
            .or_else(|| link_el.and_then(|el| configured.first_text(el)))
            .or_else(|| fallback.first_text(container))
            .or_else(|| {
                attributes
                    .iter()
                    .find_map(|name| non_empty_attr(container, name))
                    .map(str::to_string)
            })
            .map(|text| normalize_whitespace(&text))
            .filter(|text| !text.is_empty())
    }

    /// The page URL, or the document's `<base href>` resolved against it.
    fn document_base(&self, document: &Html, page_url: &Url) -> Url {
        self.base
            .first_element(document.root_element())
            .and_then(|base| base.value().attr("href"))
            .and_then(|href| page_url.join(href).ok())
            .unwrap_or_else(|| page_url.clone())
    }
}

fn attr(element: Option<ElementRef<'_>>, name: &str) -> Option<String> {
    element
        .and_then(|el| non_empty_attr(el, name))
        .map(str::to_string)
}

fn anchor_href<'a>(element: Option<ElementRef<'a>>) -> Option<&'a str> {
    element
        .filter(|el| el.value().name() == "a")
        .and_then(|el| non_empty_attr(el, "href"))
}

/// Absolute address for the listing: anchors first (as a browser would resolve
/// them), then a raw `href` on any element, resolved against `base`.
fn resolve_link(link_el: Option<ElementRef<'_>>, title_el: Option<ElementRef<'_>>, base: &Url) -> String {
    let href = anchor_href(link_el)
        .or_else(|| anchor_href(title_el))
        .or_else(|| link_el.and_then(|el| non_empty_attr(el, "href")))
        .or_else(|| title_el.and_then(|el| non_empty_attr(el, "href")));

    match href {
        Some(href) => match base.join(href.trim()) {
            Ok(url) => url.to_string(),
            Err(e) => {
                tracing::debug!(href = %href, error = %e, "Unresolvable link");
                String::new()
            }
        },
        None => String::new(),
    }
}
