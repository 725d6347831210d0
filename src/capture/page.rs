use async_trait::async_trait;

/// Title and address of the page being captured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    pub title: String,
    pub link: String,
}

/// Metadata scraped from the page source, available some time after the
/// page info itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: Option<String>,
    /// May be relative to the page URL.
    pub image_url: Option<String>,
}

impl PageMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.as_deref().is_none_or(str::is_empty)
            && self.image_url.as_deref().is_none_or(str::is_empty)
    }
}

/// Host-side source of page information.
#[async_trait]
pub trait PageInfoProvider: Send + Sync {
    async fn tab_info(&self) -> Result<PageInfo, String>;

    /// One-shot metadata fetch. `Ok(None)` when the page has none.
    async fn metadata(&self) -> Result<Option<PageMetadata>, String>;
}

/// Provider for page information known up front, e.g. from the command line.
#[derive(Debug, Clone, Default)]
pub struct StaticPage {
    pub info: PageInfo,
    pub metadata: Option<PageMetadata>,
}

#[async_trait]
impl PageInfoProvider for StaticPage {
    async fn tab_info(&self) -> Result<PageInfo, String> {
        Ok(self.info.clone())
    }

    async fn metadata(&self) -> Result<Option<PageMetadata>, String> {
        Ok(self.metadata.clone())
    }
}
