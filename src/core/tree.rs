//! Organization → board → list hierarchy used to validate and present
//! filing destinations.

use super::location::{Board, List, LocationPath, Organization};

/// Display name of the synthetic organization holding personal boards.
pub const NO_ORGANIZATION_NAME: &str = "Private";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardNode {
    pub id: String,
    pub name: String,
    pub lists: Vec<List>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationNode {
    pub id: Option<String>,
    pub name: String,
    pub boards: Vec<BoardNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationTree {
    pub organizations: Vec<OrganizationNode>,
}

impl LocationTree {
    /// Group boards under their organizations. The no-organization node is
    /// always first; boards whose organization is not listed are dropped.
    pub fn build(organizations: &[Organization], boards: &[Board]) -> Self {
        let private = Organization {
            id: None,
            display_name: NO_ORGANIZATION_NAME.to_string(),
        };

        let organizations = std::iter::once(&private)
            .chain(organizations.iter().filter(|o| o.id.is_some()))
            .map(|org| OrganizationNode {
                id: org.id.clone(),
                name: org.display_name.clone(),
                boards: boards
                    .iter()
                    .filter(|b| b.organization_id == org.id)
                    .map(|b| BoardNode {
                        id: b.id.clone(),
                        name: b.name.clone(),
                        lists: b.lists.clone(),
                    })
                    .collect(),
            })
            .collect();

        Self { organizations }
    }

    pub fn organization(&self, id: Option<&str>) -> Option<&OrganizationNode> {
        self.organizations.iter().find(|o| o.id.as_deref() == id)
    }

    /// True only when every level of `path` exists in the tree.
    pub fn validate(&self, path: &LocationPath) -> bool {
        let Some(org) = self.organization(path.organization_id.as_deref()) else {
            return false;
        };
        let Some(board) = org.board(&path.board_id) else {
            return false;
        };
        board.list(&path.list_id).is_some()
    }

    /// "Org / Board / List" for a valid path.
    pub fn label(&self, path: &LocationPath) -> Option<String> {
        let org = self.organization(path.organization_id.as_deref())?;
        let board = org.board(&path.board_id)?;
        let list = board.list(&path.list_id)?;
        Some(format!("{} / {} / {}", org.name, board.name, list.name))
    }

    pub fn board_count(&self) -> usize {
        self.organizations.iter().map(|o| o.boards.len()).sum()
    }
}

impl OrganizationNode {
    pub fn board(&self, id: &str) -> Option<&BoardNode> {
        self.boards.iter().find(|b| b.id == id)
    }
}

impl BoardNode {
    pub fn list(&self, id: &str) -> Option<&List> {
        self.lists.iter().find(|l| l.id == id)
    }
}
