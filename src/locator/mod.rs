//! Source locator
//!
//! Finds the current download URL of an annex spreadsheet on its index page.
//! All knowledge of the page markup lives in a [`LinkExtractor`]; when the
//! site changes its layout only the extractor needs to follow.

mod extractor;

pub use extractor::{LinkExtractor, SpreadsheetLinkExtractor};

use crate::net::{FetchError, Transport};
use tracing::debug;
use url::Url;

/// Fetches index pages and hands them to an extractor
pub struct SourceLocator<'a> {
    transport: &'a dyn Transport,
    extractor: &'a dyn LinkExtractor,
}

impl<'a> SourceLocator<'a> {
    pub fn new(transport: &'a dyn Transport, extractor: &'a dyn LinkExtractor) -> Self {
        Self {
            transport,
            extractor,
        }
    }

    /// Resolve the spreadsheet URL linked from `page_url`
    ///
    /// `Ok(None)` means the page loaded but carried no matching link.
    pub async fn locate(&self, page_url: &Url) -> Result<Option<Url>, FetchError> {
        let html = self.transport.get_text(page_url).await?;
        let found = self.extractor.extract(&html, page_url);
        debug!(%page_url, found = ?found.as_ref().map(Url::as_str), "index page scanned");
        Ok(found)
    }
}

/// Lower-cased extension of the last path segment, `xlsx` when there is none
pub fn file_extension(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "xlsx".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::Freshness;
    use async_trait::async_trait;

    struct OnePage(Result<String, u16>);

    #[async_trait]
    impl Transport for OnePage {
        async fn get_text(&self, url: &Url) -> Result<String, FetchError> {
            self.0
                .clone()
                .map_err(|status| FetchError::status(url, status))
        }

        async fn head(&self, _url: &Url) -> Result<Option<Freshness>, FetchError> {
            unreachable!("locator never issues HEAD requests")
        }

        async fn get_bytes(&self, _url: &Url) -> Result<Vec<u8>, FetchError> {
            unreachable!("locator never downloads files")
        }
    }

    fn page() -> Url {
        Url::parse("https://example.test/cosing/annexes/II").unwrap()
    }

    #[tokio::test]
    async fn test_locate_resolves_root_relative_link() {
        let transport = OnePage(Ok(
            r#"<a href="/assets/data/COSING_Annex_II_v2.xlsx">Download</a>"#.to_string(),
        ));
        let extractor = SpreadsheetLinkExtractor::default();
        let locator = SourceLocator::new(&transport, &extractor);

        let url = locator.locate(&page()).await.unwrap().unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.test/assets/data/COSING_Annex_II_v2.xlsx"
        );
    }

    #[tokio::test]
    async fn test_locate_not_found() {
        let transport = OnePage(Ok("<p>maintenance</p>".to_string()));
        let extractor = SpreadsheetLinkExtractor::default();
        let locator = SourceLocator::new(&transport, &extractor);

        assert!(locator.locate(&page()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_locate_page_error() {
        let transport = OnePage(Err(404));
        let extractor = SpreadsheetLinkExtractor::default();
        let locator = SourceLocator::new(&transport, &extractor);

        let err = locator.locate(&page()).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[test]
    fn test_file_extension() {
        let url = Url::parse("https://example.test/a/COSING_Annex_III_v2.XLS?x=1").unwrap();
        assert_eq!(file_extension(&url), "xls");

        let url = Url::parse("https://example.test/a/download").unwrap();
        assert_eq!(file_extension(&url), "xlsx");
    }
}
