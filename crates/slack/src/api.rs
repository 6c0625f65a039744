//! Thin client for the Slack Web API.
//!
//! Method URLs are resolved against `<server_url>/api/`, authenticated with
//! the instance bot token. Every response is checked twice: HTTP status
//! first, then the JSON `ok` field, so callers can special-case Slack error
//! strings like `already_in_channel`.

use std::{collections::HashSet, time::Duration};

use {
    reqwest::multipart,
    secrecy::{ExposeSecret, Secret},
    serde_json::json,
    url::Url,
};

/// Request timeout for file uploads.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Error from a single Slack Web API call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("slack request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response; the body is kept to surface Slack's error message.
    #[error("slack returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// 2xx response with `ok: false`.
    #[error("slack {method} returned not ok, error type: {error}")]
    Slack {
        method: &'static str,
        error: String,
        errors: Vec<String>,
    },

    #[error("invalid slack server URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("malformed slack response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed slack response: missing {0}")]
    MissingField(&'static str),
}

impl ApiError {
    /// Slack's `error` string when this is an application-level error.
    pub fn slack_error(&self) -> Option<&str> {
        match self {
            Self::Slack { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Client for one Slack workspace.
pub struct SlackApi {
    http: reqwest::Client,
    base: Url,
    token: Secret<String>,
}

impl SlackApi {
    pub fn new(server_url: &str, token: Secret<String>) -> Result<Self, ApiError> {
        let base = Url::parse(server_url)?.join("api/")?;
        Ok(Self {
            http: reqwest::Client::new(),
            base,
            token,
        })
    }

    fn method_url(&self, method: &'static str) -> Result<Url, ApiError> {
        Ok(self.base.join(method)?)
    }

    /// Check HTTP status and the `ok` field, returning the parsed body.
    async fn check(
        response: reqwest::Response,
        method: &'static str,
    ) -> Result<serde_json::Value, ApiError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status { status, body });
        }

        let value: serde_json::Value = serde_json::from_str(&body)?;
        if !value.get("ok").and_then(|ok| ok.as_bool()).unwrap_or(false) {
            let error = value
                .get("error")
                .and_then(|e| e.as_str())
                .unwrap_or("<error field missing>")
                .to_string();
            let errors = value
                .get("errors")
                .and_then(|e| e.as_array())
                .map(|list| {
                    list.iter()
                        .filter_map(|e| e.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();
            return Err(ApiError::Slack {
                method,
                error,
                errors,
            });
        }
        Ok(value)
    }

    /// Look up a Slack user ID by email (`users.lookupByEmail`).
    pub async fn lookup_user_by_email(&self, email: &str) -> Result<String, ApiError> {
        let response = self
            .http
            .get(self.method_url("users.lookupByEmail")?)
            .bearer_auth(self.token.expose_secret())
            .query(&[("email", email)])
            .send()
            .await?;
        let value = Self::check(response, "users.lookupByEmail").await?;
        value
            .pointer("/user/id")
            .and_then(|id| id.as_str())
            .map(str::to_string)
            .ok_or(ApiError::MissingField("user.id"))
    }

    /// Join a channel (`conversations.join`). Succeeds when the bot is
    /// already a member; Slack then responds ok with a warning.
    pub async fn join_channel(&self, channel: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.method_url("conversations.join")?)
            .bearer_auth(self.token.expose_secret())
            .json(&json!({ "channel": channel }))
            .send()
            .await?;
        Self::check(response, "conversations.join").await.map(drop)
    }

    /// All member user IDs of a channel, following pagination cursors
    /// (`conversations.members`).
    pub async fn channel_members(&self, channel: &str) -> Result<HashSet<String>, ApiError> {
        let mut members = HashSet::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut query = vec![("channel", channel.to_string())];
            if let Some(c) = &cursor {
                query.push(("cursor", c.clone()));
            }
            let response = self
                .http
                .get(self.method_url("conversations.members")?)
                .bearer_auth(self.token.expose_secret())
                .query(&query)
                .send()
                .await?;
            let value = Self::check(response, "conversations.members").await?;

            if let Some(ids) = value.get("members").and_then(|m| m.as_array()) {
                members.extend(ids.iter().filter_map(|id| id.as_str().map(str::to_string)));
            }

            cursor = value
                .pointer("/response_metadata/next_cursor")
                .and_then(|c| c.as_str())
                .filter(|c| !c.is_empty())
                .map(str::to_string);
            if cursor.is_none() {
                break;
            }
        }
        Ok(members)
    }

    /// Invite users to a channel (`conversations.invite`).
    pub async fn invite(&self, channel: &str, user_ids: &[String]) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.method_url("conversations.invite")?)
            .bearer_auth(self.token.expose_secret())
            .json(&json!({ "channel": channel, "users": user_ids.join(",") }))
            .send()
            .await?;
        Self::check(response, "conversations.invite").await.map(drop)
    }

    /// Upload a file shared to a channel (`files.upload`); returns the
    /// file's permalink for referencing it from a message.
    pub async fn upload_file(
        &self,
        channel: &str,
        file_name: &str,
        data: Vec<u8>,
    ) -> Result<String, ApiError> {
        let part = multipart::Part::bytes(data).file_name(file_name.to_string());
        let form = multipart::Form::new()
            .text("filename", file_name.to_string())
            .text("channels", channel.to_string())
            .part("file", part);
        let response = self
            .http
            .post(self.method_url("files.upload")?)
            .bearer_auth(self.token.expose_secret())
            .timeout(UPLOAD_TIMEOUT)
            .multipart(form)
            .send()
            .await?;
        let value = Self::check(response, "files.upload").await?;
        value
            .pointer("/file/permalink")
            .and_then(|link| link.as_str())
            .map(str::to_string)
            .ok_or(ApiError::MissingField("file.permalink"))
    }

    /// Post a message (`chat.postMessage`); returns the message `ts`.
    /// `text` shows in notifications when blocks are rendered.
    pub async fn post_message(
        &self,
        channel: &str,
        text: &str,
        blocks: &[serde_json::Value],
    ) -> Result<String, ApiError> {
        let response = self
            .http
            .post(self.method_url("chat.postMessage")?)
            .bearer_auth(self.token.expose_secret())
            .json(&json!({ "channel": channel, "text": text, "blocks": blocks }))
            .send()
            .await?;
        let value = Self::check(response, "chat.postMessage").await?;
        value
            .get("ts")
            .and_then(|ts| ts.as_str())
            .map(str::to_string)
            .ok_or(ApiError::MissingField("ts"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use {super::*, mockito::Matcher};

    fn api(server: &mockito::Server) -> SlackApi {
        SlackApi::new(&server.url(), Secret::new("xoxb-test".into())).unwrap()
    }

    #[test]
    fn method_urls_join_under_api() {
        let api = SlackApi::new("https://slack.com", Secret::new("t".into())).unwrap();
        assert_eq!(
            api.method_url("chat.postMessage").unwrap().as_str(),
            "https://slack.com/api/chat.postMessage"
        );
    }

    #[test]
    fn rejects_unparseable_server_url() {
        assert!(SlackApi::new("not a url", Secret::new("t".into())).is_err());
    }

    #[tokio::test]
    async fn lookup_sends_bearer_token_and_email() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/users.lookupByEmail")
            .match_header("authorization", "Bearer xoxb-test")
            .match_query(Matcher::UrlEncoded("email".into(), "alice@example.com".into()))
            .with_body(r#"{"ok": true, "user": {"id": "U123"}}"#)
            .create_async()
            .await;

        let id = api(&server)
            .lookup_user_by_email("alice@example.com")
            .await
            .unwrap();
        assert_eq!(id, "U123");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn not_ok_body_maps_to_slack_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/users.lookupByEmail")
            .match_query(Matcher::Any)
            .with_body(r#"{"ok": false, "error": "users_not_found"}"#)
            .create_async()
            .await;

        let err = api(&server)
            .lookup_user_by_email("nobody@example.com")
            .await
            .unwrap_err();
        assert_eq!(err.slack_error(), Some("users_not_found"));
    }

    #[tokio::test]
    async fn http_failure_keeps_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/conversations.join")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let err = api(&server).join_channel("C1").await.unwrap_err();
        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status.as_u16(), 429);
                assert_eq!(body, "rate limited");
            },
            other => panic!("expected Status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn members_follow_pagination_cursor() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/api/conversations.members")
            .match_query(Matcher::UrlEncoded("channel".into(), "C1".into()))
            .with_body(
                r#"{"ok": true, "members": ["U1", "U2"],
                    "response_metadata": {"next_cursor": "abc"}}"#,
            )
            .create_async()
            .await;
        let second = server
            .mock("GET", "/api/conversations.members")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("channel".into(), "C1".into()),
                Matcher::UrlEncoded("cursor".into(), "abc".into()),
            ]))
            .with_body(r#"{"ok": true, "members": ["U3"], "response_metadata": {"next_cursor": ""}}"#)
            .create_async()
            .await;

        let members = api(&server).channel_members("C1").await.unwrap();
        assert_eq!(members.len(), 3);
        assert!(members.contains("U3"));
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn invite_joins_user_ids_with_commas() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/conversations.invite")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "channel": "C1",
                "users": "U1,U2"
            })))
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        api(&server)
            .invite("C1", &["U1".into(), "U2".into()])
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn upload_returns_permalink() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/files.upload")
            .with_body(r#"{"ok": true, "file": {"permalink": "https://files.slack.com/f1"}}"#)
            .create_async()
            .await;

        let link = api(&server)
            .upload_file("C1", "graph.png", vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(link, "https://files.slack.com/f1");
    }

    #[tokio::test]
    async fn post_message_returns_ts() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat.postMessage")
            .match_body(Matcher::PartialJson(serde_json::json!({ "channel": "C1" })))
            .with_body(r#"{"ok": true, "ts": "1712345678.000100"}"#)
            .create_async()
            .await;

        let ts = api(&server)
            .post_message("C1", "Service is ERROR", &[])
            .await
            .unwrap();
        assert_eq!(ts, "1712345678.000100");
    }
}
