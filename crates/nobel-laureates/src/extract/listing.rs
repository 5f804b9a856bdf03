//! Listing stage: split the by-country index page into seed records.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::normalize::normalize;
use crate::types::{Category, LaureateRecord, SeedFields};

/// Marker that flags an entry as a cross-reference to another country.
const CROSS_REFERENCE_MARKER: char = '*';

/// Parse the index page and return one seed record per followable entry,
/// in document order. Duplicate entries are kept.
pub fn extract_listing(html: &str, page_url: &Url) -> Vec<LaureateRecord> {
    let document = Html::parse_document(html);
    let heading_sel = Selector::parse(".mw-parser-output h3").unwrap();
    let headline_sel = Selector::parse(".mw-headline").unwrap();
    let entry_sel = Selector::parse("li").unwrap();
    let link_sel = Selector::parse("a[href]").unwrap();

    let mut seeds = Vec::new();
    for heading in document.select(&heading_sel) {
        let country = heading_text(&heading, &headline_sel);
        if country.is_empty() {
            continue;
        }
        let Some(list) = following_list(heading) else {
            debug!("no entry list after heading '{country}'");
            continue;
        };

        for entry in list.select(&entry_sel) {
            let Some(link_el) = entry.select(&link_sel).next() else {
                debug!("skipping unlinked entry under '{country}'");
                continue;
            };
            let href = link_el.value().attr("href").unwrap_or_default();
            let Some(link) = normalize(href, page_url) else {
                debug!("skipping entry with unusable href '{href}'");
                continue;
            };

            let name: String = link_el.text().collect();
            let text: String = entry.text().collect();
            seeds.push(LaureateRecord::seed(
                link,
                seed_fields(name.trim(), &text, &country),
            ));
        }
    }
    seeds
}

/// Derive the listing-stage fields from an entry's link text, full text, and
/// the enclosing country heading.
pub fn seed_fields(name: &str, entry_text: &str, country: &str) -> SeedFields {
    let cross_reference = entry_text.contains(CROSS_REFERENCE_MARKER);
    SeedFields {
        name: name.to_string(),
        year: last_year(entry_text),
        category: last_category(entry_text),
        country: if cross_reference {
            String::new()
        } else {
            country.to_string()
        },
        place_of_birth: cross_reference.then(|| country.to_string()),
    }
}

/// The last run of four ASCII digits, scanning left to right without
/// overlap. 0 when there is none.
pub fn last_year(text: &str) -> u32 {
    let bytes = text.as_bytes();
    let mut last = None;
    let mut i = 0;
    while i + 4 <= bytes.len() {
        if bytes[i..i + 4].iter().all(u8::is_ascii_digit) {
            last = Some(&text[i..i + 4]);
            i += 4;
        } else {
            i += 1;
        }
    }
    last.and_then(|y| y.parse().ok()).unwrap_or(0)
}

/// The last category name mentioned in `text`. Entries sometimes mention a
/// related field before the awarded one, so the final mention wins.
pub fn last_category(text: &str) -> Category {
    let mut last = Category::Unspecified;
    let mut rest = text;
    while let Some(ch) = rest.chars().next() {
        match Category::ALL.iter().find(|c| rest.starts_with(c.label())) {
            Some(category) => {
                last = *category;
                rest = &rest[category.label().len()..];
            }
            None => rest = &rest[ch.len_utf8()..],
        }
    }
    last
}

fn heading_text(heading: &ElementRef<'_>, headline_sel: &Selector) -> String {
    let text: String = match heading.select(headline_sel).next() {
        Some(headline) => headline.text().collect(),
        None => heading.text().collect(),
    };
    text.trim().to_string()
}

/// The first `ol` following the heading. Newer markup wraps the `h3` in a
/// `div.mw-heading`, in which case the wrapper's siblings are searched.
fn following_list(heading: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let anchor = heading
        .parent()
        .and_then(ElementRef::wrap)
        .filter(|parent| parent.value().classes().any(|c| c == "mw-heading"))
        .unwrap_or(heading);

    anchor
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "ol")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://en.wikipedia.org/wiki/List_of_Nobel_laureates_by_country").unwrap()
    }

    const LISTING: &str = r#"
    <html><body><div class="mw-parser-output">
      <h3><span class="mw-headline" id="Norway">Norway</span><span class="mw-editsection">[edit]</span></h3>
      <ol>
        <li><a href="/wiki/John_Smith">John Smith</a>, Physics, 1995</li>
        <li><a href="/wiki/Jane_Roe">Jane <b>Roe</b></a>*, Chemistry, 2001</li>
        <li>Unlinked Person, Peace, 1950</li>
      </ol>
      <div class="mw-heading mw-heading3"><h3 id="Poland">Poland</h3></div>
      <ol>
        <li><a href="//en.wikipedia.org/wiki/Marie_Curie">Marie Curie</a>, Physics, 1903; Chemistry, 1911</li>
      </ol>
      <h3><span class="mw-headline">Empty Country</span></h3>
      <p>No entries here.</p>
    </div></body></html>
    "#;

    #[test]
    fn test_seed_from_plain_entry() {
        let fields = seed_fields("John Smith", "John Smith 1995 Physics", "Norway");
        assert_eq!(
            fields,
            SeedFields {
                name: "John Smith".into(),
                year: 1995,
                category: Category::Physics,
                country: "Norway".into(),
                place_of_birth: None,
            }
        );
    }

    #[test]
    fn test_asterisk_entry_moves_country_to_place_of_birth() {
        let fields = seed_fields("Jane Roe", "Jane Roe*, Chemistry, 2001", "Norway");
        assert!(fields.country.is_empty());
        assert_eq!(fields.place_of_birth.as_deref(), Some("Norway"));
    }

    #[test]
    fn test_last_year_wins() {
        assert_eq!(last_year("Physics, 1903; Chemistry, 1911"), 1911);
        assert_eq!(last_year("no digits"), 0);
        assert_eq!(last_year("born 123"), 0);
        // non-overlapping: 12345678 splits into 1234 and 5678
        assert_eq!(last_year("12345678"), 5678);
        assert_eq!(last_year("year 19955"), 1995);
    }

    #[test]
    fn test_last_category_wins() {
        assert_eq!(
            last_category("Physics, 1903; Chemistry, 1911"),
            Category::Chemistry
        );
        assert_eq!(
            last_category("Physiology or Medicine, 1950"),
            Category::PhysiologyOrMedicine
        );
        assert_eq!(
            last_category("worked in Economics, awarded Peace"),
            Category::Peace
        );
        assert_eq!(last_category("Mathematics"), Category::Unspecified);
        assert_eq!(last_category("Zoë — Literature"), Category::Literature);
    }

    #[test]
    fn test_extract_listing_partitions_entries() {
        let seeds = extract_listing(LISTING, &page_url());
        assert_eq!(seeds.len(), 3);

        let smith = &seeds[0];
        assert_eq!(smith.name, "John Smith");
        assert_eq!(smith.link().as_str(), "https://en.wikipedia.org/wiki/John_Smith");
        assert_eq!(smith.year, 1995);
        assert_eq!(smith.category, Category::Physics);
        assert_eq!(smith.country, "Norway");
        assert!(smith.place_of_birth.is_none());

        let roe = &seeds[1];
        assert_eq!(roe.name, "Jane Roe");
        assert!(roe.country.is_empty());
        assert_eq!(roe.place_of_birth.as_deref(), Some("Norway"));

        let curie = &seeds[2];
        assert_eq!(curie.link().as_str(), "https://en.wikipedia.org/wiki/Marie_Curie");
        assert_eq!(curie.country, "Poland");
        assert_eq!(curie.year, 1911);
        assert_eq!(curie.category, Category::Chemistry);
    }

    #[test]
    fn test_duplicate_entries_are_not_merged() {
        let html = r#"<div class="mw-parser-output">
          <h3><span class="mw-headline">Sweden</span></h3>
          <ol>
            <li><a href="/wiki/A">A</a> Peace 1921</li>
            <li><a href="/wiki/A">A</a> Peace 1921</li>
          </ol></div>"#;
        let seeds = extract_listing(html, &page_url());
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0], seeds[1]);
    }

    #[test]
    fn test_malformed_page_yields_nothing() {
        assert!(extract_listing("<html><p>garbage", &page_url()).is_empty());
        assert!(extract_listing("", &page_url()).is_empty());
    }
}
