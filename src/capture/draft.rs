use std::sync::Arc;

use crate::core::card::Draft;
use crate::core::location::{LocationPath, SiteTag, upsert_location};
use crate::error::CacheError;
use crate::sync::cache::{CacheData, LocalCache};

use super::page::{PageInfo, PageInfoProvider, PageMetadata};
use super::resolver::{default_cover_for, resolve_path};
use super::url::resolve_relative_image_url;

/// Browser pages that stand for "no page".
pub const DEFAULT_NEW_TAB_URLS: &[&str] = &["chrome://newtab/", "about:newtab", "about:blank"];

/// Owns the single draft held in the local cache.
pub struct DraftStore {
    cache: Arc<LocalCache>,
    new_tab_urls: Vec<String>,
}

impl DraftStore {
    pub fn new(cache: Arc<LocalCache>) -> Self {
        Self {
            cache,
            new_tab_urls: DEFAULT_NEW_TAB_URLS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_new_tab_urls(mut self, urls: Vec<String>) -> Self {
        self.new_tab_urls = urls;
        self
    }

    pub fn cache(&self) -> &Arc<LocalCache> {
        &self.cache
    }

    pub async fn draft(&self) -> Draft {
        self.cache.read().await.draft
    }

    /// Restore the persisted snapshot, seeding defaults when there is none.
    /// Returns true if defaults were written.
    pub async fn seed_defaults(&self) -> Result<bool, CacheError> {
        if self.cache.restore().await? {
            return Ok(false);
        }
        log::info!("First run, seeding default draft and locations");
        self.cache.write(CacheData::defaults()).await;
        Ok(true)
    }

    fn is_new_tab(&self, link: &str) -> bool {
        self.new_tab_urls.iter().any(|u| u == link)
    }

    /// Start a draft for a newly opened page.
    pub async fn observe_new_page(&self, page: PageInfo) -> Draft {
        let page = if self.is_new_tab(&page.link) {
            PageInfo::default()
        } else {
            page
        };
        let cover = default_cover_for(&page.link);
        self.write_observed(page, cover).await
    }

    /// Apply scraped metadata on top of an earlier observation of `page`.
    pub async fn refine_page(&self, page: &PageInfo, metadata: PageMetadata) -> Draft {
        if self.is_new_tab(&page.link) {
            return self.draft().await;
        }

        let title = metadata
            .title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| page.title.clone());

        let cover = metadata
            .image_url
            .map(|img| resolve_relative_image_url(&img, &page.link))
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| default_cover_for(&page.link));

        let refined = PageInfo {
            title,
            link: page.link.clone(),
        };
        self.write_observed(refined, cover).await
    }

    /// Page fields overwrite the previous draft; location fields are only
    /// overwritten when a remembered location matches.
    async fn write_observed(&self, page: PageInfo, cover: String) -> Draft {
        let view = self.cache.read().await;
        let mut draft = view.draft;
        draft.title = page.title;
        draft.link = page.link;
        draft.cover = cover;

        match resolve_path(&draft.link, &view.locations) {
            Some(path) => draft.set_path(path),
            None => log::debug!("No location resolved for '{}', keeping previous", draft.link),
        }

        self.cache.write(CacheData::draft(draft.clone())).await;
        draft
    }

    /// Read the tab, observe it, then refine it with page metadata once
    /// that arrives. A metadata failure leaves the first observation.
    pub async fn capture(&self, provider: &dyn PageInfoProvider) -> Result<Draft, String> {
        let page = provider.tab_info().await?;
        log::info!("Capturing '{}'", page.link);
        let draft = self.observe_new_page(page.clone()).await;

        match provider.metadata().await {
            Ok(Some(metadata)) if !metadata.is_empty() => {
                Ok(self.refine_page(&page, metadata).await)
            }
            Ok(_) => Ok(draft),
            Err(e) => {
                log::warn!("Page metadata unavailable for '{}': {}", page.link, e);
                Ok(draft)
            }
        }
    }

    /// Apply a user edit to the draft.
    pub async fn edit_draft(&self, edit: impl FnOnce(&mut Draft)) -> Draft {
        let mut draft = self.draft().await;
        edit(&mut draft);
        self.cache.write(CacheData::draft(draft.clone())).await;
        draft
    }

    /// Move the draft to `path` and remember it as the last location.
    pub async fn set_draft_location(&self, path: LocationPath) -> Draft {
        self.bookmark_last_location(&path).await;
        self.edit_draft(|d| d.set_path(path)).await
    }

    pub async fn bookmark_last_location(&self, path: &LocationPath) {
        self.upsert(SiteTag::LastLocation, path).await;
    }

    pub async fn set_new_tab_location(&self, path: &LocationPath) {
        self.upsert(SiteTag::NewTab, path).await;
    }

    /// Remember `path` for pages whose URL contains `site`.
    pub async fn remember_site_location(&self, site: &str, path: &LocationPath) {
        let site = SiteTag::from(site.trim().to_string());
        if matches!(&site, SiteTag::Site(s) if s.is_empty()) {
            log::warn!("Ignoring site location with empty site fragment");
            return;
        }
        self.upsert(site, path).await;
    }

    async fn upsert(&self, site: SiteTag, path: &LocationPath) {
        let mut locations = self.cache.read().await.locations;
        log::debug!("Bookmarking {} -> '{}'", site.as_str(), path.encode());
        upsert_location(&mut locations, site, path);
        self.cache.write(CacheData::locations(locations)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::page::StaticPage;
    use crate::core::location::find_location;

    async fn seeded_store() -> DraftStore {
        let store = DraftStore::new(Arc::new(LocalCache::in_memory()));
        assert!(store.seed_defaults().await.unwrap());
        store
    }

    fn page(title: &str, link: &str) -> PageInfo {
        PageInfo {
            title: title.to_string(),
            link: link.to_string(),
        }
    }

    #[tokio::test]
    async fn seeding_is_skipped_when_snapshot_exists() {
        let store = seeded_store().await;
        store.edit_draft(|d| d.description = "kept".into()).await;
        store.cache().persist().await.unwrap();

        assert!(!store.seed_defaults().await.unwrap());
        assert_eq!(store.draft().await.description, "kept");
    }

    #[tokio::test]
    async fn observe_prefills_matching_site() {
        let store = seeded_store().await;
        let path = LocationPath::new(Some("T"), "B", "L");
        store.remember_site_location("github.com", &path).await;

        let draft = store.observe_new_page(page("Repo", "https://github.com/x/y")).await;
        assert_eq!(draft.title, "Repo");
        assert_eq!(draft.path(), path);
    }

    #[tokio::test]
    async fn unresolved_page_keeps_previous_location() {
        let store = seeded_store().await;
        store.edit_draft(|d| {
            d.board_id = "manual-board".into();
            d.list_id = "manual-list".into();
            d.description = "my notes".into();
        }).await;

        let draft = store.observe_new_page(page("Other", "https://other.com")).await;
        assert_eq!(draft.board_id, "manual-board");
        assert_eq!(draft.list_id, "manual-list");
        assert_eq!(draft.description, "my notes");
        assert_eq!(draft.link, "https://other.com");
    }

    #[tokio::test]
    async fn new_tab_page_uses_new_tab_location() {
        let store = seeded_store().await;
        let path = LocationPath::new(None::<String>, "B", "L");
        store.set_new_tab_location(&path).await;

        let draft = store.observe_new_page(page("New Tab", "chrome://newtab/")).await;
        assert_eq!(draft.title, "");
        assert_eq!(draft.link, "");
        assert_eq!(draft.path(), path);
    }

    #[tokio::test]
    async fn youtube_page_gets_default_cover() {
        let store = seeded_store().await;
        let draft = store
            .observe_new_page(page("Video", "https://www.youtube.com/watch?v=dQw4w9WgXcQ"))
            .await;
        assert_eq!(draft.cover, "https://img.youtube.com/vi/dQw4w9WgXcQ/maxresdefault.jpg");
    }

    #[tokio::test]
    async fn capture_refines_with_metadata() {
        let store = seeded_store().await;
        let provider = StaticPage {
            info: page("Tab title", "https://site.com/a/b"),
            metadata: Some(PageMetadata {
                title: Some("Article title".into()),
                image_url: Some("img.jpg".into()),
            }),
        };

        let draft = store.capture(&provider).await.unwrap();
        assert_eq!(draft.title, "Article title");
        assert_eq!(draft.cover, "https://site.com/a/img.jpg");
        assert_eq!(store.draft().await, draft);
    }

    #[tokio::test]
    async fn capture_without_metadata_keeps_tab_info() {
        let store = seeded_store().await;
        let provider = StaticPage {
            info: page("Tab title", "https://site.com/"),
            metadata: None,
        };
        let draft = store.capture(&provider).await.unwrap();
        assert_eq!(draft.title, "Tab title");
        assert_eq!(draft.cover, "");
    }

    #[tokio::test]
    async fn set_draft_location_bookmarks_last_location() {
        let store = seeded_store().await;
        let path = LocationPath::new(Some("T"), "B", "L");
        store.set_draft_location(path.clone()).await;

        let view = store.cache().read().await;
        assert_eq!(view.draft.path(), path);
        let last = find_location(&view.locations, &SiteTag::LastLocation).unwrap();
        assert_eq!(last.path_str, "T/B/L");
    }

    #[tokio::test]
    async fn empty_site_fragment_is_ignored() {
        let store = seeded_store().await;
        store
            .remember_site_location("  ", &LocationPath::new(Some("T"), "B", "L"))
            .await;
        assert_eq!(store.cache().read().await.locations.len(), 2);
    }
}
