//! Structured-data stage: demographic properties from a Wikidata item page.
//!
//! Each property is located by walking a fixed chain of child elements down
//! from the statement block whose `id` is the property identifier. The page
//! layout nests the main value nine levels deep; place and gender values sit
//! one level further inside an anchor.

use scraper::{ElementRef, Html, Node, Selector};

use crate::types::LaureateRecord;

/// The five properties read from the structured-data page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    DateOfBirth,
    DateOfDeath,
    PlaceOfBirth,
    PlaceOfDeath,
    Gender,
}

impl Property {
    pub const ALL: [Property; 5] = [
        Property::DateOfBirth,
        Property::DateOfDeath,
        Property::PlaceOfBirth,
        Property::PlaceOfDeath,
        Property::Gender,
    ];

    /// Wikidata property identifier.
    pub fn code(self) -> &'static str {
        match self {
            Self::DateOfBirth => "P569",
            Self::DateOfDeath => "P570",
            Self::PlaceOfBirth => "P19",
            Self::PlaceOfDeath => "P20",
            Self::Gender => "P21",
        }
    }

    /// Whether the value text lives inside an anchor below the value element.
    pub fn anchored(self) -> bool {
        matches!(self, Self::PlaceOfBirth | Self::PlaceOfDeath | Self::Gender)
    }

    fn field(self, record: &mut LaureateRecord) -> &mut Option<String> {
        match self {
            Self::DateOfBirth => &mut record.date_of_birth,
            Self::DateOfDeath => &mut record.date_of_death,
            Self::PlaceOfBirth => &mut record.place_of_birth,
            Self::PlaceOfDeath => &mut record.place_of_death,
            Self::Gender => &mut record.gender,
        }
    }
}

/// One child-element step: a tag name and an optional 1-based position among
/// same-tag siblings. Without a position every same-tag child matches.
#[derive(Debug, Clone, Copy)]
struct Step {
    tag: &'static str,
    nth: Option<usize>,
}

const fn div(nth: Option<usize>) -> Step {
    Step { tag: "div", nth }
}

/// From the statement block down to the main value element.
const VALUE_PATH: [Step; 9] = [
    div(Some(2)),
    div(None),
    div(None),
    div(Some(2)),
    div(Some(1)),
    div(None),
    div(Some(2)),
    div(Some(2)),
    div(Some(1)),
];

const ANCHOR_STEP: Step = Step {
    tag: "a",
    nth: None,
};

/// Property values resolved from one structured-data page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WikidataExtract {
    pub values: Vec<(Property, String)>,
}

impl WikidataExtract {
    pub fn get(&self, property: Property) -> Option<&str> {
        self.values
            .iter()
            .find(|(p, _)| *p == property)
            .map(|(_, v)| v.as_str())
    }

    /// Overwrite each resolved field; unresolved fields keep whatever the
    /// earlier stages put there.
    pub fn apply(&self, record: &mut LaureateRecord) {
        for (property, value) in &self.values {
            *property.field(record) = Some(value.clone());
        }
    }
}

/// Resolve every [`Property`] on the page.
pub fn extract_wikidata(html: &str) -> WikidataExtract {
    let document = Html::parse_document(html);
    let values = Property::ALL
        .iter()
        .filter_map(|&p| resolve(&document, p).map(|v| (p, v)))
        .collect();
    WikidataExtract { values }
}

fn resolve(document: &Html, property: Property) -> Option<String> {
    let sel = Selector::parse(&format!(r#"[id="{}"]"#, property.code())).ok()?;
    let mut current: Vec<ElementRef<'_>> = document.select(&sel).collect();

    let anchor = property.anchored().then_some(ANCHOR_STEP);
    for step in VALUE_PATH.iter().chain(anchor.iter()) {
        current = current
            .iter()
            .flat_map(|el| matching_children(*el, *step))
            .collect();
        if current.is_empty() {
            return None;
        }
    }

    current.iter().find_map(|el| first_text(*el))
}

fn matching_children(el: ElementRef<'_>, step: Step) -> Vec<ElementRef<'_>> {
    let same_tag = el
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == step.tag);
    match step.nth {
        Some(n) => same_tag.skip(n.saturating_sub(1)).take(1).collect(),
        None => same_tag.collect(),
    }
}

/// First non-blank direct text child, trimmed.
fn first_text(el: ElementRef<'_>) -> Option<String> {
    el.children().find_map(|child| match child.value() {
        Node::Text(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        _ => None,
    })
}
