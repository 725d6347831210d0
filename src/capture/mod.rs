pub mod draft;
pub mod page;
pub mod resolver;
pub mod url;

pub use draft::DraftStore;
pub use page::{PageInfo, PageInfoProvider, PageMetadata, StaticPage};
pub use resolver::{default_cover_for, resolve_path};
pub use url::resolve_relative_image_url;
