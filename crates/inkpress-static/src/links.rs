//! Link index of the documents under a scope.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use inkpress_directive::PageLink;

/// Every document under a scope, newest first.
#[derive(Debug, Clone, Default)]
pub struct LinkIndex {
    pages: Vec<PageLink>,
    urls: BTreeSet<String>,
}

impl LinkIndex {
    /// Build an index, ordering pages by date (newest first) then url.
    pub fn build(pages: impl IntoIterator<Item = PageLink>) -> Self {
        let mut pages: Vec<PageLink> = pages.into_iter().collect();
        pages.sort_by(compare);

        let urls = pages.iter().map(|page| page.url.clone()).collect();

        Self { pages, urls }
    }

    /// Whether `url` is a document in the index.
    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Indexed pages in order.
    pub fn pages(&self) -> &[PageLink] {
        &self.pages
    }

    pub fn into_pages(self) -> Vec<PageLink> {
        self.pages
    }
}

impl From<&[PageLink]> for LinkIndex {
    fn from(pages: &[PageLink]) -> Self {
        Self::build(pages.iter().cloned())
    }
}

fn compare(a: &PageLink, b: &PageLink) -> Ordering {
    // Undated pages sort after dated ones.
    match (&a.date, &b.date) {
        (Some(x), Some(y)) => y.cmp(x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.url.cmp(&b.url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn link(url: &str, date: Option<&str>) -> PageLink {
        PageLink {
            url: url.to_string(),
            title: url.to_string(),
            date: date.map(str::to_string),
            summary: String::new(),
            source: PathBuf::from(url),
        }
    }

    #[test]
    fn orders_newest_first_then_url() {
        let index = LinkIndex::build([
            link("/blog/c.md", None),
            link("/blog/a.md", Some("2024-01-01")),
            link("/blog/b.md", Some("2024-06-01")),
            link("/blog/a2.md", None),
        ]);

        let urls: Vec<_> = index.pages().iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, ["/blog/b.md", "/blog/a.md", "/blog/a2.md", "/blog/c.md"]);
    }

    #[test]
    fn looks_up_by_url() {
        let index = LinkIndex::build([link("/x.md", None), link("/y.md", Some("2020-01-01"))]);

        assert!(index.contains("/x.md"));
        assert!(!index.contains("/z.md"));
    }

    #[test]
    fn round_trips_published_pages() {
        let pages = [link("/b.md", Some("2021-01-01")), link("/a.md", Some("2022-01-01"))];

        let index = LinkIndex::from(&pages[..]);

        assert!(index.contains("/a.md"));
        let urls: Vec<_> = index.into_pages().into_iter().map(|p| p.url).collect();
        assert_eq!(urls, ["/a.md", "/b.md"]);
    }
}
