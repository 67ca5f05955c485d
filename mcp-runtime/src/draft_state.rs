//! Draft status preservation for article updates.
//!
//! When an update omits `draft`, the remote would default to publishing.
//! The current status is probed instead: drafts first, then published
//! articles, and the first collection that knows the id decides the flag.
//! Probe failures are control flow here, not errors.

use emlog_core::models::Flag;
use serde_json::{Value, json};

use crate::client::EmlogClient;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Drafts,
    Published,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Drafts => "drafts",
            Collection::Published => "published",
        }
    }

    /// Draft flag an article keeps when found in this collection.
    pub fn flag(self) -> Flag {
        match self {
            Collection::Drafts => Flag::Yes,
            Collection::Published => Flag::No,
        }
    }
}

pub const PROBE_ORDER: [Collection; 2] = [Collection::Drafts, Collection::Published];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftResolution {
    Explicit(Flag),
    Inferred { flag: Flag, source: Collection },
    /// Neither collection knows the id. The update still goes out without a flag.
    Unknown,
}

impl DraftResolution {
    pub fn effective_flag(self) -> Option<Flag> {
        match self {
            DraftResolution::Explicit(flag) | DraftResolution::Inferred { flag, .. } => Some(flag),
            DraftResolution::Unknown => None,
        }
    }

    pub fn status_label(self) -> Option<&'static str> {
        match self.effective_flag() {
            Some(Flag::Yes) => Some("(saved as draft)"),
            Some(Flag::No) => Some("(published)"),
            None => None,
        }
    }

    pub fn to_value(self) -> Value {
        match self {
            DraftResolution::Explicit(flag) => json!({
                "mode": "explicit",
                "draft": flag.as_str(),
            }),
            DraftResolution::Inferred { flag, source } => json!({
                "mode": "inferred",
                "draft": flag.as_str(),
                "source": source.as_str(),
            }),
            DraftResolution::Unknown => json!({
                "mode": "unknown",
                "draft": Value::Null,
            }),
        }
    }
}

pub async fn resolve_draft_state<T: Transport>(
    client: &EmlogClient<T>,
    id: u64,
    explicit: Option<Flag>,
) -> DraftResolution {
    resolve_with_probes(client, id, explicit, &PROBE_ORDER).await
}

pub async fn resolve_with_probes<T: Transport>(
    client: &EmlogClient<T>,
    id: u64,
    explicit: Option<Flag>,
    probes: &[Collection],
) -> DraftResolution {
    if let Some(flag) = explicit {
        return DraftResolution::Explicit(flag);
    }

    for &collection in probes {
        if probe(client, collection, id).await {
            tracing::debug!(
                article_id = id,
                collection = collection.as_str(),
                "preserving current draft status"
            );
            return DraftResolution::Inferred {
                flag: collection.flag(),
                source: collection,
            };
        }
    }

    tracing::warn!(
        article_id = id,
        "article not found in drafts or published articles; updating without draft flag"
    );
    DraftResolution::Unknown
}

async fn probe<T: Transport>(client: &EmlogClient<T>, collection: Collection, id: u64) -> bool {
    let result = match collection {
        Collection::Drafts => client
            .get_draft_detail(id)
            .await
            .map(|payload| payload.get("draft").is_some_and(|draft| !draft.is_null())),
        Collection::Published => client.get_article_detail(id, None).await.map(|_| true),
    };
    match result {
        Ok(found) => found,
        Err(err) => {
            tracing::debug!(
                article_id = id,
                collection = collection.as_str(),
                error = %err,
                "draft status probe missed"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdapterError;
    use crate::testing::RecordingTransport;

    fn missing(endpoint: &str) -> AdapterError {
        AdapterError::RemoteApi {
            code: 1,
            message: format!("{endpoint}: not found"),
        }
    }

    #[tokio::test]
    async fn explicit_flag_skips_all_probes() {
        let client = EmlogClient::new(RecordingTransport::new());
        let resolution = resolve_draft_state(&client, 5, Some(Flag::No)).await;
        assert_eq!(resolution, DraftResolution::Explicit(Flag::No));
        assert_eq!(client.transport().call_count(), 0);
    }

    #[tokio::test]
    async fn id_found_among_drafts_resolves_to_draft() {
        let transport = RecordingTransport::new()
            .respond("draft_detail", json!({"draft": {"id": 5, "title": "wip"}}));
        let client = EmlogClient::new(transport);
        let resolution = resolve_draft_state(&client, 5, None).await;
        assert_eq!(resolution.effective_flag(), Some(Flag::Yes));
        assert_eq!(client.transport().endpoints_called(), vec!["draft_detail"]);
    }

    #[tokio::test]
    async fn id_found_only_among_published_resolves_to_publish() {
        let transport = RecordingTransport::new()
            .fail("draft_detail", missing("draft_detail"))
            .respond("article_detail", json!({"article": {"id": 5}}));
        let client = EmlogClient::new(transport);
        let resolution = resolve_draft_state(&client, 5, None).await;
        assert_eq!(
            resolution,
            DraftResolution::Inferred {
                flag: Flag::No,
                source: Collection::Published
            }
        );
        assert_eq!(
            client.transport().endpoints_called(),
            vec!["draft_detail", "article_detail"]
        );
    }

    #[tokio::test]
    async fn id_absent_from_both_leaves_flag_unset() {
        let transport = RecordingTransport::new()
            .fail("draft_detail", missing("draft_detail"))
            .fail(
                "article_detail",
                AdapterError::Transport {
                    status: Some(404),
                    message: "Not Found".to_string(),
                },
            );
        let client = EmlogClient::new(transport);
        let resolution = resolve_draft_state(&client, 5, None).await;
        assert_eq!(resolution, DraftResolution::Unknown);
        assert_eq!(resolution.effective_flag(), None);
        assert_eq!(resolution.status_label(), None);
    }

    #[tokio::test]
    async fn empty_draft_payload_falls_through_to_published() {
        let transport = RecordingTransport::new()
            .respond("draft_detail", json!({"draft": null}))
            .respond("article_detail", json!({"article": {"id": 5}}));
        let client = EmlogClient::new(transport);
        let resolution = resolve_draft_state(&client, 5, None).await;
        assert_eq!(resolution.effective_flag(), Some(Flag::No));
    }

    #[tokio::test]
    async fn probe_order_is_data() {
        let transport = RecordingTransport::new()
            .respond("draft_detail", json!({"draft": {"id": 5}}))
            .respond("article_detail", json!({"article": {"id": 5}}));
        let client = EmlogClient::new(transport);
        let resolution =
            resolve_with_probes(&client, 5, None, &[Collection::Published, Collection::Drafts])
                .await;
        assert_eq!(resolution.effective_flag(), Some(Flag::No));
        assert_eq!(client.transport().endpoints_called(), vec!["article_detail"]);
    }

    #[test]
    fn resolution_serializes_mode_and_source() {
        let value = DraftResolution::Inferred {
            flag: Flag::Yes,
            source: Collection::Drafts,
        }
        .to_value();
        assert_eq!(value["mode"], "inferred");
        assert_eq!(value["draft"], "y");
        assert_eq!(value["source"], "drafts");
        assert_eq!(DraftResolution::Unknown.to_value()["draft"], Value::Null);
    }
}
