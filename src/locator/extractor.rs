use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

/// Pulls the spreadsheet download link out of an index page
pub trait LinkExtractor: Send + Sync {
    /// Absolute URL of the first matching link, resolved against `page_url`
    fn extract(&self, html: &str, page_url: &Url) -> Option<Url>;
}

/// First `<a href>` whose path ends in `.xls` or `.xlsx`
pub struct SpreadsheetLinkExtractor {
    selector: Selector,
    extension: Regex,
}

impl Default for SpreadsheetLinkExtractor {
    fn default() -> Self {
        Self {
            selector: Selector::parse("a[href]").expect("valid selector"),
            extension: Regex::new(r"(?i)\.xlsx?$").expect("valid regex"),
        }
    }
}

impl LinkExtractor for SpreadsheetLinkExtractor {
    fn extract(&self, html: &str, page_url: &Url) -> Option<Url> {
        let document = Html::parse_document(html);

        document
            .select(&self.selector)
            .filter_map(|element| element.value().attr("href"))
            .map(str::trim)
            .filter(|href| {
                !href.is_empty()
                    && !href.starts_with('#')
                    && !href.starts_with("javascript:")
                    && !href.starts_with("mailto:")
            })
            .filter_map(|href| page_url.join(href).ok())
            .find(|url| {
                matches!(url.scheme(), "http" | "https") && self.extension.is_match(url.path())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://ec.example.test/growth/cosing/annexes/list/III").unwrap()
    }

    fn extract(html: &str) -> Option<String> {
        SpreadsheetLinkExtractor::default()
            .extract(html, &page())
            .map(|u| u.to_string())
    }

    #[test]
    fn test_first_spreadsheet_link_wins() {
        let html = r#"
            <html><body>
              <a href="/growth/cosing/help">Help</a>
              <a href="https://cdn.example.test/COSING_Annex_III_v2.xlsx">XLSX</a>
              <a href="https://cdn.example.test/COSING_Annex_III_v1.xls">Old</a>
            </body></html>"#;

        assert_eq!(
            extract(html).as_deref(),
            Some("https://cdn.example.test/COSING_Annex_III_v2.xlsx")
        );
    }

    #[test]
    fn test_root_relative_link_resolves_against_origin() {
        let html = r#"<a href="/assets/data/COSING_Annex_III_v2.xls">get</a>"#;
        assert_eq!(
            extract(html).as_deref(),
            Some("https://ec.example.test/assets/data/COSING_Annex_III_v2.xls")
        );
    }

    #[test]
    fn test_relative_link_resolves_against_page() {
        let html = r#"<a href="files/annex.XLSX">get</a>"#;
        assert_eq!(
            extract(html).as_deref(),
            Some("https://ec.example.test/growth/cosing/annexes/list/files/annex.XLSX")
        );
    }

    #[test]
    fn test_query_string_is_ignored_for_matching() {
        let html = r#"<a href="/export.xlsx?lang=en#top">get</a>"#;
        assert_eq!(
            extract(html).as_deref(),
            Some("https://ec.example.test/export.xlsx?lang=en#top")
        );
    }

    #[test]
    fn test_lookalike_paths_do_not_match() {
        let html = r#"
            <a href="/annex.xlsx.html">page</a>
            <a href="/download?file=annex.xlsx">query only</a>
            <a href="mailto:help@example.test?subject=a.xls">mail</a>
            <a href="/annex.csv">csv</a>"#;
        assert_eq!(extract(html), None);
    }

    #[test]
    fn test_no_links() {
        assert_eq!(extract("<html><body><p>No downloads</p></body></html>"), None);
    }
}
