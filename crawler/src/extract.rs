//! Structural extraction of authors and publications from rendered portal pages.
//!
//! Optional fields degrade to `None`; records missing a required field are
//! skipped with a logged reason and counted in [`Extracted::skipped`].

use lazy_static::lazy_static;
use pubsearch_core::{Author, Publication};
use scraper::{ElementRef, Html, Selector};
use url::Url;

lazy_static! {
    static ref LISTING_ENTRY: Selector = Selector::parse("h3.title").expect("valid selector");
    static ref PERSON_LINK: Selector = Selector::parse("a.link.person").expect("valid selector");
    static ref RESULT_ITEM: Selector = Selector::parse("li.list-result-item").expect("valid selector");
    static ref ITEM_TITLE: Selector = Selector::parse("h3.title").expect("valid selector");
    static ref TITLE_LINK: Selector = Selector::parse("h3.title a").expect("valid selector");
    static ref ANY_LINK: Selector = Selector::parse("a.link").expect("valid selector");
    static ref YEAR: Selector = Selector::parse("div.search-result-group").expect("valid selector");
    static ref JOURNAL: Selector = Selector::parse("span.journal").expect("valid selector");
    static ref VOLUME: Selector = Selector::parse("span.volume").expect("valid selector");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted<T> {
    pub items: Vec<T>,
    /// Entries found on the page, including skipped ones.
    pub entries: usize,
    pub skipped: usize,
}

impl<T> Extracted<T> {
    /// True when the page had no listing entries at all, which ends pagination.
    pub fn is_empty_page(&self) -> bool { self.entries == 0 }
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn first_text(scope: ElementRef<'_>, sel: &Selector) -> Option<String> {
    scope.select(sel).next().map(text_of).filter(|t| !t.is_empty())
}

fn resolve(page: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    page.join(href).ok().map(String::from)
}

fn person(a: ElementRef<'_>, page: &Url) -> Option<Author> {
    let name = text_of(a);
    let profile_link = resolve(page, a.value().attr("href")?)?;
    Some(Author { name, profile_link })
}

/// Authors on one page of the staff listing.
pub fn extract_authors(html: &str, page: &Url) -> Extracted<Author> {
    let doc = Html::parse_document(html);
    let mut out = Extracted { items: Vec::new(), entries: 0, skipped: 0 };
    for entry in doc.select(&LISTING_ENTRY) {
        out.entries += 1;
        let name = text_of(entry);
        match entry.select(&PERSON_LINK).next().and_then(|a| person(a, page)) {
            Some(author) => out.items.push(Author { name, ..author }),
            None => {
                tracing::warn!(%name, %page, "listing entry has no profile link, skipping");
                out.skipped += 1;
            }
        }
    }
    out
}

fn publication_link(item: ElementRef<'_>, page: &Url) -> Option<String> {
    let href = item
        .select(&TITLE_LINK)
        .chain(item.select(&ANY_LINK))
        .filter(|a| !a.value().classes().any(|c| c == "person"))
        .find_map(|a| a.value().attr("href"))?;
    resolve(page, href)
}

/// Publications on one author's publication listing.
pub fn extract_publications(html: &str, page: &Url) -> Extracted<Publication> {
    let doc = Html::parse_document(html);
    let mut out = Extracted { items: Vec::new(), entries: 0, skipped: 0 };
    for item in doc.select(&RESULT_ITEM) {
        out.entries += 1;
        let Some(title) = first_text(item, &ITEM_TITLE) else {
            tracing::warn!(%page, "publication without a title, skipping");
            out.skipped += 1;
            continue;
        };
        let Some(publication_year) = first_text(item, &YEAR) else {
            tracing::warn!(%title, "no publication year found, skipping");
            out.skipped += 1;
            continue;
        };
        let Some(link) = publication_link(item, page) else {
            tracing::warn!(%title, "publication has no link, skipping");
            out.skipped += 1;
            continue;
        };
        let authors = item
            .select(&PERSON_LINK)
            .filter_map(|a| {
                let author = person(a, page);
                if author.is_none() {
                    tracing::debug!(%title, "co-author without profile link dropped");
                }
                author
            })
            .collect();
        out.items.push(Publication {
            title,
            authors,
            publication_year,
            journal: first_text(item, &JOURNAL),
            volume: first_text(item, &VOLUME),
            link,
        });
    }
    out
}
