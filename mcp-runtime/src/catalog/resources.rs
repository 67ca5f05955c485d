//! Read-only resources addressed by `emlog://` URIs.

use serde_json::{Value, json};
use url::Url;

use super::Render;
use crate::client::{ArticleQuery, EmlogClient};
use crate::error::AdapterError;
use crate::transport::Transport;

pub const SCHEME: &str = "emlog";
pub const JSON_MIME: &str = "application/json";
pub const DEFAULT_COMMENTS_ARTICLE_ID: u64 = 1;
const NOTES_PAGE_SIZE: u64 = 20;
const DRAFTS_PAGE_SIZE: u64 = 20;

#[derive(Debug)]
pub struct ResourceDefinition {
    pub uri: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub render: Render,
}

#[derive(Debug)]
pub struct ResourceTemplate {
    pub uri_template: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub render: Render,
}

pub static RESOURCES: &[ResourceDefinition] = &[
    ResourceDefinition {
        uri: "emlog://articles",
        name: "articles",
        description: "All articles from the Emlog blog",
        render: Render::Structured,
    },
    ResourceDefinition {
        uri: "emlog://categories",
        name: "categories",
        description: "All categories from the Emlog blog",
        render: Render::Structured,
    },
    ResourceDefinition {
        uri: "emlog://comments",
        name: "comments",
        description: "Comments for a specific article. Use emlog://comments/{article_id} to choose the article.",
        render: Render::Structured,
    },
    ResourceDefinition {
        uri: "emlog://notes",
        name: "notes",
        description: "Recent micro-notes from the Emlog blog",
        render: Render::Structured,
    },
    ResourceDefinition {
        uri: "emlog://users",
        name: "users",
        description: "The user owning the configured API key",
        render: Render::Structured,
    },
    ResourceDefinition {
        uri: "emlog://drafts",
        name: "drafts",
        description: "Draft articles from the Emlog blog",
        render: Render::Structured,
    },
];

pub static TEMPLATES: &[ResourceTemplate] = &[
    ResourceTemplate {
        uri_template: "emlog://articles/{id}",
        name: "article",
        description: "A single article. Append ?password=... for protected articles.",
        render: Render::Structured,
    },
    ResourceTemplate {
        uri_template: "emlog://comments/{id}",
        name: "article-comments",
        description: "Comments for the article with the given id",
        render: Render::Structured,
    },
];

/// A resource URI with its embedded identifier extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceTarget {
    Articles,
    Article { id: u64, password: Option<String> },
    Categories,
    Comments { article_id: u64 },
    Notes,
    CurrentUser,
    Drafts,
}

impl ResourceTarget {
    /// Name of the listed resource or template this target is served under.
    pub fn entry_name(&self) -> &'static str {
        match self {
            ResourceTarget::Articles => "articles",
            ResourceTarget::Article { .. } => "article",
            ResourceTarget::Categories => "categories",
            ResourceTarget::Comments { .. } => "comments",
            ResourceTarget::Notes => "notes",
            ResourceTarget::CurrentUser => "users",
            ResourceTarget::Drafts => "drafts",
        }
    }

    pub fn render(&self) -> Render {
        let name = self.entry_name();
        RESOURCES
            .iter()
            .find(|resource| resource.name == name)
            .map(|resource| resource.render)
            .or_else(|| {
                TEMPLATES
                    .iter()
                    .find(|template| template.name == name)
                    .map(|template| template.render)
            })
            .unwrap_or(Render::Structured)
    }
}

pub fn resolve(uri: &str) -> Result<ResourceTarget, AdapterError> {
    let parsed = Url::parse(uri)
        .map_err(|err| AdapterError::invalid("uri", format!("Invalid resource URI '{uri}': {err}")))?;
    if parsed.scheme() != SCHEME {
        return Err(AdapterError::invalid(
            "uri",
            format!("Unsupported URI scheme '{}'; expected {SCHEME}://", parsed.scheme()),
        ));
    }

    let collection = parsed.host_str().unwrap_or_default();
    let segments: Vec<&str> = parsed
        .path()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.len() > 1 {
        return Err(unknown_resource(uri));
    }
    let segment = segments.first().copied();

    let target = match (collection, segment) {
        ("articles", None) => ResourceTarget::Articles,
        ("articles", Some(raw)) => ResourceTarget::Article {
            id: parse_id(raw, "emlog://articles/{id}")?,
            password: parsed
                .query_pairs()
                .find(|(key, _)| key == "password")
                .map(|(_, value)| value.into_owned())
                .filter(|value| !value.is_empty()),
        },
        ("comments", None) => ResourceTarget::Comments {
            article_id: DEFAULT_COMMENTS_ARTICLE_ID,
        },
        ("comments", Some(raw)) => ResourceTarget::Comments {
            article_id: parse_id(raw, "emlog://comments/{article_id}")?,
        },
        ("categories", None) => ResourceTarget::Categories,
        ("notes", None) => ResourceTarget::Notes,
        ("users", None) => ResourceTarget::CurrentUser,
        ("drafts", None) => ResourceTarget::Drafts,
        _ => return Err(unknown_resource(uri)),
    };
    Ok(target)
}

fn parse_id(raw: &str, format: &str) -> Result<u64, AdapterError> {
    match raw.parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AdapterError::invalid(
            "uri",
            format!("Invalid article ID '{raw}' in URI. Use format: {format}"),
        )),
    }
}

fn unknown_resource(uri: &str) -> AdapterError {
    AdapterError::invalid("uri", format!("Unknown resource URI '{uri}'"))
}

pub(super) async fn read<T: Transport>(
    client: &EmlogClient<T>,
    target: &ResourceTarget,
) -> Result<Value, AdapterError> {
    match target {
        ResourceTarget::Articles => client.get_article_list(ArticleQuery::default()).await,
        ResourceTarget::Article { id, password } => {
            client.get_article_detail(*id, password.clone()).await
        }
        ResourceTarget::Categories => client.get_sort_list().await,
        ResourceTarget::Comments { article_id } => {
            let payload = client.get_comment_list_simple(*article_id).await?;
            let comments = match payload.get("comments") {
                Some(Value::Null) | None => Value::Array(Vec::new()),
                Some(comments) => comments.clone(),
            };
            let total = match &comments {
                Value::Array(items) => items.len(),
                Value::Object(items) => items.len(),
                _ => 0,
            };
            Ok(json!({
                "articleId": article_id,
                "comments": comments,
                "totalComments": total,
            }))
        }
        ResourceTarget::Notes => {
            client
                .get_note_list(Some(1), Some(NOTES_PAGE_SIZE), None)
                .await
        }
        ResourceTarget::CurrentUser => client.get_current_user().await,
        ResourceTarget::Drafts => client.get_draft_list(Some(DRAFTS_PAGE_SIZE)).await,
    }
}
