//! Biography stage: portrait candidate, lead paragraphs, and the link to the
//! structured-data page.

use lol_html::{element, rewrite_str, RewriteStrSettings};
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::normalize::normalize;
use crate::types::LaureateRecord;

/// `id` of the element that ends the lead section.
const TOC_ID: &str = "toc";

/// Everything the biography page contributes to a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BiographyExtract {
    /// Zero or one portrait candidate from the info box.
    pub image_urls: Vec<Url>,
    /// Lead paragraphs, hyperlinks made absolute.
    pub mini_bio: String,
    /// Structured-data page, when the sidebar links one.
    pub wikidata_url: Option<Url>,
}

impl BiographyExtract {
    /// Merge into `record` and hand back the next stage's URL, if any.
    pub fn apply(self, record: &mut LaureateRecord) -> Option<Url> {
        record.image_urls = self.image_urls;
        record.mini_bio = Some(self.mini_bio);
        self.wikidata_url
    }
}

/// Extract the biography fields. `page_url` is the URL the page was served
/// from and is the base for every relative link.
pub fn extract_biography(html: &str, page_url: &Url) -> BiographyExtract {
    let document = Html::parse_document(html);
    let image_sel = Selector::parse("table.infobox img[src]").unwrap();
    let content_sel = Selector::parse("#mw-content-text > .mw-parser-output > *").unwrap();
    let wikidata_sel = Selector::parse("#t-wikibase a[href]").unwrap();

    let image_urls = document
        .select(&image_sel)
        .next()
        .and_then(|img| img.value().attr("src"))
        .and_then(|src| normalize(src, page_url))
        .into_iter()
        .collect();

    let mut raw_bio = String::new();
    for el in document.select(&content_sel) {
        if el.value().id() == Some(TOC_ID) {
            break;
        }
        if el.value().name() == "p" {
            raw_bio.push_str(&el.html());
        }
    }

    let wikidata_url = document
        .select(&wikidata_sel)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| normalize(href, page_url));

    BiographyExtract {
        image_urls,
        mini_bio: absolutize_links(&raw_bio, page_url),
        wikidata_url,
    }
}

/// Rewrite every `href` in an HTML fragment to its normalized absolute form.
///
/// Falls back to the fragment unchanged if the rewriter rejects it.
pub fn absolutize_links(fragment: &str, base: &Url) -> String {
    if fragment.is_empty() {
        return String::new();
    }
    let rewritten = rewrite_str(
        fragment,
        RewriteStrSettings {
            element_content_handlers: vec![element!("[href]", |el| {
                if let Some(href) = el.get_attribute("href") {
                    if let Some(absolute) = normalize(&href, base) {
                        el.set_attribute("href", absolute.as_str())?;
                    }
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    );
    match rewritten {
        Ok(html) => html,
        Err(e) => {
            debug!("link rewrite failed, keeping raw fragment: {e}");
            fragment.to_string()
        }
    }
}
