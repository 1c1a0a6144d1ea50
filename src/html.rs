//! Minimal view over a parsed HTML page.
//!
//! Form and assertion scanning only need two things from a document: find an
//! element by id, and enumerate `<input>` elements. Keeping that behind a trait
//! lets the scanning logic run against hand-built trees in tests.

pub trait HtmlElement {
    fn attr(&self, name: &str) -> Option<&str>;
}

pub trait HtmlDocument {
    type Element<'a>: HtmlElement
    where
        Self: 'a;

    fn find_by_id(&self, id: &str) -> Option<Self::Element<'_>>;

    /// `<input>` descendants of `root` (tag names compared case-insensitively),
    /// or of the whole document when `root` is `None`, in document order.
    fn all_inputs<'a>(&'a self, root: Option<&Self::Element<'a>>) -> Vec<Self::Element<'a>>;
}

/// [`HtmlDocument`] backed by html5ever through `scraper`.
pub struct ScraperDocument(scraper::Html);

impl ScraperDocument {
    pub fn parse(html: &str) -> Self {
        Self(scraper::Html::parse_document(html))
    }
}

impl std::fmt::Debug for ScraperDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScraperDocument").finish()
    }
}

impl HtmlElement for scraper::ElementRef<'_> {
    fn attr(&self, name: &str) -> Option<&str> {
        self.value().attr(name)
    }
}

impl HtmlDocument for ScraperDocument {
    type Element<'a> = scraper::ElementRef<'a>;

    fn find_by_id(&self, id: &str) -> Option<scraper::ElementRef<'_>> {
        self.0
            .root_element()
            .descendants()
            .filter_map(scraper::ElementRef::wrap)
            .find(|e| e.value().id() == Some(id))
    }

    fn all_inputs<'a>(
        &'a self,
        root: Option<&scraper::ElementRef<'a>>,
    ) -> Vec<scraper::ElementRef<'a>> {
        let root = match root {
            Some(r) => *r,
            None => self.0.root_element(),
        };
        root.descendants()
            .filter_map(scraper::ElementRef::wrap)
            .filter(|e| e.value().name().eq_ignore_ascii_case("input"))
            .collect()
    }
}
