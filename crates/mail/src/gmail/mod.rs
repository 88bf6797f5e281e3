//! Gmail API integration
//!
//! This module provides:
//! - OAuth2 access tokens minted from a stored refresh token
//! - A Gmail REST client implementing [`crate::transport::MailTransport`]

mod auth;
mod client;

pub use auth::GmailAuth;
pub use client::{GmailApiError, GmailClient};

/// Gmail API response types
pub mod api {
    use serde::{Deserialize, Serialize};

    /// Response from listing messages
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListMessagesResponse {
        pub messages: Option<Vec<MessageRef>>,
        pub next_page_token: Option<String>,
        pub result_size_estimate: Option<u32>,
    }

    /// Reference to a message (just ID and thread ID)
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageRef {
        pub id: String,
        pub thread_id: Option<String>,
    }

    /// Message fetched with `format=raw`
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RawMessage {
        pub id: String,
        pub thread_id: Option<String>,
        pub label_ids: Option<Vec<String>>,
        /// base64url-encoded RFC 5322 source
        pub raw: Option<String>,
    }

    /// Body of a `messages.modify` request
    #[derive(Debug, Default, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ModifyMessageRequest {
        #[serde(skip_serializing_if = "Vec::is_empty")]
        pub add_label_ids: Vec<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        pub remove_label_ids: Vec<String>,
    }

    impl ModifyMessageRequest {
        pub fn for_label(label: &str, remove: bool) -> Self {
            let labels = vec![label.to_string()];
            if remove {
                Self {
                    remove_label_ids: labels,
                    ..Self::default()
                }
            } else {
                Self {
                    add_label_ids: labels,
                    ..Self::default()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::api::*;

    #[test]
    fn test_parse_list_response() {
        let json = r#"{
            "messages": [
                {"id": "18c1", "threadId": "18c1"},
                {"id": "18c0", "threadId": "18b9"}
            ],
            "nextPageToken": "09876",
            "resultSizeEstimate": 201
        }"#;

        let list: ListMessagesResponse = serde_json::from_str(json).unwrap();
        let ids: Vec<&str> = list
            .messages
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(ids, vec!["18c1", "18c0"]);
        assert_eq!(list.next_page_token.as_deref(), Some("09876"));
        assert_eq!(list.result_size_estimate, Some(201));
    }

    #[test]
    fn test_parse_empty_list_response() {
        let list: ListMessagesResponse =
            serde_json::from_str(r#"{"resultSizeEstimate": 0}"#).unwrap();
        assert!(list.messages.is_none());
        assert!(list.next_page_token.is_none());
    }

    #[test]
    fn test_parse_raw_message() {
        let json = r#"{
            "id": "18c1",
            "threadId": "18c1",
            "labelIds": ["INBOX", "UNREAD"],
            "raw": "U3ViamVjdDogSGkNCg0KQm9keQ"
        }"#;

        let message: RawMessage = serde_json::from_str(json).unwrap();
        assert_eq!(message.id, "18c1");
        assert_eq!(message.raw.as_deref(), Some("U3ViamVjdDogSGkNCg0KQm9keQ"));
        assert_eq!(message.label_ids.unwrap(), vec!["INBOX", "UNREAD"]);
    }

    #[test]
    fn test_modify_request_body() {
        let body = serde_json::to_value(ModifyMessageRequest::for_label("UNREAD", true)).unwrap();
        assert_eq!(body, serde_json::json!({"removeLabelIds": ["UNREAD"]}));

        let body = serde_json::to_value(ModifyMessageRequest::for_label("STARRED", false)).unwrap();
        assert_eq!(body, serde_json::json!({"addLabelIds": ["STARRED"]}));
    }
}
