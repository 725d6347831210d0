use serde::{Deserialize, Serialize};

/// Path component written in place of the missing organization id.
pub const NO_ORGANIZATION: &str = "null";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    /// `None` is the synthetic bucket for boards without an organization.
    pub id: Option<String>,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct List {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "idOrganization", default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub lists: Vec<List>,
}

/// A filing destination: organization, board and list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationPath {
    pub organization_id: Option<String>,
    pub board_id: String,
    pub list_id: String,
}

impl LocationPath {
    pub fn new(
        organization_id: Option<impl Into<String>>,
        board_id: impl Into<String>,
        list_id: impl Into<String>,
    ) -> Self {
        Self {
            organization_id: organization_id.map(Into::into),
            board_id: board_id.into(),
            list_id: list_id.into(),
        }
    }

    /// Serialize to "org/board/list". Incomplete paths encode as "".
    pub fn encode(&self) -> String {
        if self.board_id.is_empty() || self.list_id.is_empty() {
            return String::new();
        }
        let org = match self.organization_id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => NO_ORGANIZATION,
        };
        format!("{}/{}/{}", org, self.board_id, self.list_id)
    }

    /// Parse "org/board/list". Anything malformed yields `None`.
    pub fn decode(s: &str) -> Option<Self> {
        if s.is_empty() {
            return None;
        }
        let mut parts = s.split('/');
        let (org, board, list) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() || board.is_empty() || list.is_empty() {
            return None;
        }
        let organization_id = if org == NO_ORGANIZATION || org.is_empty() {
            None
        } else {
            Some(org.to_string())
        };
        Some(Self {
            organization_id,
            board_id: board.to_string(),
            list_id: list.to_string(),
        })
    }
}

/// Role of a remembered location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SiteTag {
    /// Destination of the most recent submission.
    LastLocation,
    /// Destination for pages opened from an empty tab.
    NewTab,
    /// Destination for pages whose URL contains this fragment.
    Site(String),
}

impl SiteTag {
    pub fn as_str(&self) -> &str {
        match self {
            Self::LastLocation => "lastLocation",
            Self::NewTab => "newTab",
            Self::Site(fragment) => fragment,
        }
    }
}

impl From<String> for SiteTag {
    fn from(s: String) -> Self {
        match s.as_str() {
            "lastLocation" => Self::LastLocation,
            "newTab" => Self::NewTab,
            _ => Self::Site(s),
        }
    }
}

impl From<SiteTag> for String {
    fn from(tag: SiteTag) -> Self {
        tag.as_str().to_string()
    }
}

/// A bookmarked path, stored encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: u32,
    pub site: SiteTag,
    pub path_str: String,
}

impl Location {
    pub fn new(id: u32, site: SiteTag, path: Option<&LocationPath>) -> Self {
        Self {
            id,
            site,
            path_str: path.map(LocationPath::encode).unwrap_or_default(),
        }
    }

    pub fn path(&self) -> Option<LocationPath> {
        LocationPath::decode(&self.path_str)
    }
}

/// The bookmarks every fresh cache starts with.
pub fn default_locations() -> Vec<Location> {
    vec![
        Location::new(0, SiteTag::LastLocation, None),
        Location::new(1, SiteTag::NewTab, None),
    ]
}

/// Find the single entry with the given role.
pub fn find_location<'a>(locations: &'a [Location], site: &SiteTag) -> Option<&'a Location> {
    locations.iter().find(|l| &l.site == site)
}

/// Point the entry tagged `site` at `path`, appending it if absent.
pub fn upsert_location(locations: &mut Vec<Location>, site: SiteTag, path: &LocationPath) {
    let path_str = path.encode();
    if let Some(existing) = locations.iter_mut().find(|l| l.site == site) {
        existing.path_str = path_str;
        return;
    }
    let id = locations.iter().map(|l| l.id + 1).max().unwrap_or(0);
    locations.push(Location { id, site, path_str });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let paths = vec![
            LocationPath::new(Some("team1"), "board1", "list1"),
            LocationPath::new(None::<String>, "board2", "list2"),
        ];
        for path in paths {
            let encoded = path.encode();
            assert_eq!(LocationPath::decode(&encoded), Some(path));
        }
    }

    #[test]
    fn null_organization_sentinel() {
        let path = LocationPath::new(None::<String>, "b", "l");
        assert_eq!(path.encode(), "null/b/l");
        assert_eq!(LocationPath::decode("null/b/l").unwrap().organization_id, None);
    }

    #[test]
    fn incomplete_path_encodes_empty() {
        assert_eq!(LocationPath::new(Some("t"), "b", "").encode(), "");
        assert_eq!(LocationPath::new(Some("t"), "", "l").encode(), "");
    }

    #[test]
    fn malformed_strings_decode_to_none() {
        assert_eq!(LocationPath::decode(""), None);
        assert_eq!(LocationPath::decode("only-one"), None);
        assert_eq!(LocationPath::decode("a/b"), None);
        assert_eq!(LocationPath::decode("a/b/c/d"), None);
        assert_eq!(LocationPath::decode("a//c"), None);
    }

    #[test]
    fn site_tag_serializes_as_plain_string() {
        let loc = Location {
            id: 3,
            site: SiteTag::Site("github.com".into()),
            path_str: "t/b/l".into(),
        };
        let json = serde_json::to_string(&loc).unwrap();
        assert_eq!(json, r#"{"id":3,"site":"github.com","pathStr":"t/b/l"}"#);

        let back: Location = serde_json::from_str(r#"{"id":0,"site":"lastLocation","pathStr":""}"#).unwrap();
        assert_eq!(back.site, SiteTag::LastLocation);
    }

    #[test]
    fn upsert_rewrites_or_appends() {
        let mut locations = default_locations();
        let path = LocationPath::new(Some("t"), "b", "l");

        upsert_location(&mut locations, SiteTag::LastLocation, &path);
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].path_str, "t/b/l");

        upsert_location(&mut locations, SiteTag::Site("example.com".into()), &path);
        assert_eq!(locations.len(), 3);
        assert_eq!(locations[2].id, 2);
    }
}
