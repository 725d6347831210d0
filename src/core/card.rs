use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::location::LocationPath;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardPosition {
    #[default]
    Top,
    Bottom,
}

impl CardPosition {
    pub fn as_param(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
        }
    }
}

fn default_due_time() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// The single card being prepared for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub title: String,
    pub link: String,
    pub description: String,
    /// Image URL or base64 data URL.
    pub cover: String,
    pub position: CardPosition,
    pub due_date: Option<NaiveDate>,
    pub due_time: NaiveTime,
    pub labels: BTreeSet<String>,
    pub assignees: BTreeSet<String>,
    pub organization_id: Option<String>,
    pub board_id: String,
    pub list_id: String,
}

impl Default for Draft {
    fn default() -> Self {
        Self {
            title: String::new(),
            link: String::new(),
            description: String::new(),
            cover: String::new(),
            position: CardPosition::Top,
            due_date: None,
            due_time: default_due_time(),
            labels: BTreeSet::new(),
            assignees: BTreeSet::new(),
            organization_id: None,
            board_id: String::new(),
            list_id: String::new(),
        }
    }
}

impl Draft {
    /// A draft may be submitted once it has a title and a target list.
    pub fn is_submittable(&self) -> bool {
        !self.title.is_empty() && !self.list_id.is_empty()
    }

    pub fn path(&self) -> LocationPath {
        LocationPath {
            organization_id: self.organization_id.clone(),
            board_id: self.board_id.clone(),
            list_id: self.list_id.clone(),
        }
    }

    pub fn set_path(&mut self, path: LocationPath) {
        self.organization_id = path.organization_id;
        self.board_id = path.board_id;
        self.list_id = path.list_id;
    }

    /// Combine the due date and time in `tz` into an ISO-8601 UTC timestamp.
    pub fn due_timestamp<Tz: TimeZone>(&self, tz: &Tz) -> Option<String> {
        let date = self.due_date?;
        let local = NaiveDateTime::new(date, self.due_time);
        let zoned = tz.from_local_datetime(&local).earliest()?;
        Some(
            zoned
                .with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        )
    }

    /// Flat key/value parameters for the card-creation call.
    pub fn submit_params<Tz: TimeZone>(&self, tz: &Tz) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("name", self.title.clone()),
            ("desc", self.description.clone()),
            ("pos", self.position.as_param().to_string()),
        ];
        if let Some(due) = self.due_timestamp(tz) {
            params.push(("due", due));
        }
        params.push(("idLabels", join_ids(&self.labels)));
        params.push(("idMembers", join_ids(&self.assignees)));
        params.push(("idList", self.list_id.clone()));
        params
    }

    /// Cover first, then link. Order is significant to the remote service.
    pub fn attachments(&self) -> Vec<Attachment> {
        let mut attachments = Vec::new();
        if !self.cover.is_empty() {
            attachments.push(Attachment::Cover(self.cover.clone()));
        }
        if !self.link.is_empty() {
            attachments.push(Attachment::Url(self.link.clone()));
        }
        attachments
    }
}

fn join_ids(ids: &BTreeSet<String>) -> String {
    ids.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}

/// Something attached to a card after it exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    Cover(String),
    Url(String),
}

impl Attachment {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Cover(_) => "cover",
            Self::Url(_) => "url",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpinnerKind {
    #[default]
    Loading,
    Done,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spinner {
    pub kind: SpinnerKind,
    pub visible: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub spinner: Spinner,
}
