use async_trait::async_trait;
use base64::Engine;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;

use crate::core::card::Attachment;
use crate::core::location::{Board, Organization};
use crate::core::tree::LocationTree;
use crate::error::RemoteError;

pub const DEFAULT_API_URL: &str = "https://api.trello.com/1";

/// File name given to uploaded cover images.
const COVER_FILE_NAME: &str = "cover.jpg";

/// Identifier assigned to a newly created card.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedCard {
    pub id: String,
}

/// Calls the board service makes on behalf of a submission.
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Create a card from flat submission parameters.
    async fn create_card(&self, params: &[(&'static str, String)]) -> Result<CreatedCard, RemoteError>;

    async fn create_attachment(&self, card_id: &str, attachment: &Attachment) -> Result<(), RemoteError>;
}

/// REST client for the Trello API.
pub struct TrelloClient {
    base_url: String,
    api_key: String,
    token: String,
    http: Client,
}

impl TrelloClient {
    pub fn new(base_url: &str, api_key: &str, token: &str) -> Result<Self, RemoteError> {
        let http = Client::builder().build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            token: token.to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn auth(&self) -> [(&'static str, &str); 2] {
        [("key", self.api_key.as_str()), ("token", self.token.as_str())]
    }

    /// Organizations the current member belongs to.
    pub async fn organizations(&self) -> Result<Vec<Organization>, RemoteError> {
        let endpoint = "members/me/organizations";
        let resp = self
            .http
            .get(self.url(endpoint))
            .query(&self.auth())
            .query(&[("fields", "displayName")])
            .send()
            .await?;
        Ok(check(resp, endpoint).await?.json().await?)
    }

    /// Open boards of the current member, with their open lists.
    pub async fn boards(&self) -> Result<Vec<Board>, RemoteError> {
        let endpoint = "members/me/boards";
        let resp = self
            .http
            .get(self.url(endpoint))
            .query(&self.auth())
            .query(&[
                ("filter", "open"),
                ("fields", "name,idOrganization"),
                ("lists", "open"),
                ("list_fields", "name"),
            ])
            .send()
            .await?;
        Ok(check(resp, endpoint).await?.json().await?)
    }

    /// Fetch organizations and boards and build the filing hierarchy.
    pub async fn location_tree(&self) -> Result<LocationTree, RemoteError> {
        let organizations = self.organizations().await?;
        let boards = self.boards().await?;
        log::info!(
            "Fetched {} organizations and {} boards",
            organizations.len(),
            boards.len()
        );
        Ok(LocationTree::build(&organizations, &boards))
    }
}

#[async_trait]
impl RemoteService for TrelloClient {
    async fn create_card(&self, params: &[(&'static str, String)]) -> Result<CreatedCard, RemoteError> {
        let endpoint = "cards";
        let resp = self
            .http
            .post(self.url(endpoint))
            .query(&self.auth())
            .query(params)
            .send()
            .await?;
        Ok(check(resp, endpoint).await?.json().await?)
    }

    async fn create_attachment(&self, card_id: &str, attachment: &Attachment) -> Result<(), RemoteError> {
        let endpoint = format!("cards/{}/attachments", card_id);
        let resp = self
            .http
            .post(self.url(&endpoint))
            .query(&self.auth())
            .multipart(attachment_form(attachment)?)
            .send()
            .await?;
        check(resp, &endpoint).await?;
        Ok(())
    }
}

/// Turn non-success responses into errors carrying the response body.
async fn check(resp: Response, endpoint: &str) -> Result<Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(RemoteError::Status {
        endpoint: endpoint.to_string(),
        status,
        body,
    })
}

/// Upload base64 data URLs as files; send anything else as a URL.
fn attachment_form(attachment: &Attachment) -> Result<Form, RemoteError> {
    let form = Form::new();
    match attachment {
        Attachment::Url(url) => Ok(form.text("url", url.clone())),
        Attachment::Cover(cover) => match decode_data_url(cover) {
            Some((mime, bytes)) => {
                let part = Part::bytes(bytes)
                    .file_name(COVER_FILE_NAME)
                    .mime_str(&mime)
                    .map_err(|e| RemoteError::Attachment(format!("bad MIME type '{}': {}", mime, e)))?;
                Ok(form.part("file", part))
            }
            None => Ok(form.text("url", cover.clone())),
        },
    }
}

/// Split a `data:<mime>;base64,<payload>` URL into MIME type and bytes.
pub fn decode_data_url(s: &str) -> Option<(String, Vec<u8>)> {
    let rest = s.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    let mime = if mime.is_empty() { "application/octet-stream" } else { mime };
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .ok()?;
    Some((mime.to_string(), bytes))
}
