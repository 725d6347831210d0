pub mod card;
pub mod location;
pub mod tree;

pub use card::{Attachment, CardPosition, Draft, Settings, Spinner, SpinnerKind};
pub use location::{Board, List, Location, LocationPath, Organization, SiteTag};
pub use tree::LocationTree;
