use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Emlog's two-state switch, transmitted as `"y"` / `"n"`.
///
/// Used for draft status, pinning, comment permission, note privacy and
/// the password-protection marker on articles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flag {
    #[serde(rename = "y")]
    Yes,
    #[serde(rename = "n")]
    No,
}

impl Flag {
    pub const WIRE_VALUES: [&'static str; 2] = ["y", "n"];

    pub fn as_str(self) -> &'static str {
        match self {
            Flag::Yes => "y",
            Flag::No => "n",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "y" => Some(Flag::Yes),
            "n" => Some(Flag::No),
            _ => None,
        }
    }
}

/// An article as returned by `article_list`, `article_detail`, `draft_list`
/// and `draft_detail`. Drafts share the same shape.
///
/// The adapter never stores one of these; it is decoded transiently for
/// narration and then dropped. Every field is optional because the remote
/// omits fields depending on endpoint and plugin version.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Article {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub id: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub author_id: Option<u64>,
    #[serde(default)]
    pub author_name: Option<String>,
    /// Category id (`sort_id` on the wire)
    #[serde(default, deserialize_with = "lenient_u64")]
    pub sort_id: Option<u64>,
    #[serde(default)]
    pub sort_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub views: Option<u64>,
    /// Comment count (`comnum` on the wire)
    #[serde(default, deserialize_with = "lenient_u64")]
    pub comnum: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub like_count: Option<u64>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_tags")]
    pub tags: Vec<Tag>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub need_pwd: Option<Flag>,
}

impl Article {
    /// Tag names joined for display, or `None` when the article has no tags.
    pub fn tag_names(&self) -> Option<String> {
        if self.tags.is_empty() {
            return None;
        }
        Some(
            self.tags
                .iter()
                .map(|tag| tag.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Payload of `article_list`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticlePage {
    #[serde(default)]
    pub articles: Vec<Article>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub page: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub total_pages: Option<u64>,
    #[serde(default)]
    pub has_more: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Comment {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub cid: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub gid: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub pid: Option<u64>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// Comments arrive either as an array (`comment_list_simple`) or as an
/// object keyed by comment id (`comment_list`). Both decode to a flat list;
/// undecodable entries are skipped.
pub fn comments_from_value(value: Option<&Value>) -> Vec<Comment> {
    let items: Vec<&Value> = match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Object(map)) => map.values().collect(),
        _ => Vec::new(),
    };
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item.clone()).ok())
        .collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInfo {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub uid: Option<u64>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Payload of `upload`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Media {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub media_id: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Like {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub gid: Option<u64>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// The remote encodes numeric fields as numbers on some endpoints and as
/// numeric strings on others.
fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<Flag>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_str).and_then(Flag::parse))
}

/// Tags are a list of `{name, url}` objects, but older plugins send a
/// comma-separated string.
fn lenient_tags<'de, D>(deserializer: D) -> Result<Vec<Tag>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(name) => Some(Tag { name, url: None }),
                other => serde_json::from_value(other).ok(),
            })
            .collect(),
        Some(Value::String(raw)) => raw
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| Tag {
                name: name.to_string(),
                url: None,
            })
            .collect(),
        _ => Vec::new(),
    })
}
