//! Tool table, dispatch, and narrated results.

use emlog_core::models::{
    Article, ArticlePage, Flag, Like, Media, UserInfo, comments_from_value,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::Render;
use super::schema::{Arguments, FieldKind, FieldSpec};
use crate::client::{ArticleQuery, ArticleUpdate, EmlogClient, NewArticle, NewComment};
use crate::draft_state::{DraftResolution, resolve_draft_state};
use crate::error::AdapterError;
use crate::transport::Transport;

const NOTE_PREVIEW_CHARS: usize = 50;
const YES_NO: FieldKind = FieldKind::Enum(&Flag::WIRE_VALUES);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    CreateArticle,
    UpdateArticle,
    GetArticle,
    SearchArticles,
    LikeArticle,
    UnlikeArticle,
    GetArticleLikes,
    AddComment,
    GetComments,
    LikeComment,
    CreateNote,
    UploadFile,
    GetUserInfo,
    GetUserDetail,
    GetDraftList,
    GetDraftDetail,
}

#[derive(Debug)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub kind: ToolKind,
    pub fields: &'static [FieldSpec],
    pub render: Render,
}

pub static TOOLS: &[ToolDefinition] = &[
    ToolDefinition {
        name: "create_article",
        title: "Create Article",
        description: "Create a new blog article",
        kind: ToolKind::CreateArticle,
        fields: &[
            FieldSpec::required("title", FieldKind::Text, "The title of the article"),
            FieldSpec::required("content", FieldKind::Text, "The content of the article"),
            FieldSpec::optional("excerpt", FieldKind::Text, "The excerpt/summary of the article"),
            FieldSpec::optional("cover", FieldKind::Text, "The cover image URL"),
            FieldSpec::optional("sort_id", FieldKind::Integer, "The category ID for the article"),
            FieldSpec::optional("tags", FieldKind::Text, "Comma-separated tags for the article"),
            FieldSpec::optional("draft", YES_NO, "Whether to save as draft (y) or publish (n)"),
            FieldSpec::optional("top", YES_NO, "Whether to pin to homepage"),
            FieldSpec::optional("sortop", YES_NO, "Whether to pin within its category"),
            FieldSpec::optional("allow_remark", YES_NO, "Whether to allow comments"),
            FieldSpec::optional("password", FieldKind::Text, "Password protecting the article"),
            FieldSpec::optional("link", FieldKind::Text, "External link the article redirects to"),
            FieldSpec::optional("post_date", FieldKind::Text, "Publish date, e.g. 2024-01-15 10:30:00"),
            FieldSpec::optional("auto_cover", YES_NO, "Use the first image in the content as cover"),
            FieldSpec::optional("field_keys", FieldKind::TextList, "Custom field names"),
            FieldSpec::optional("field_values", FieldKind::TextList, "Custom field values, aligned with field_keys"),
        ],
        render: Render::Narrated,
    },
    ToolDefinition {
        name: "update_article",
        title: "Update Article",
        description: "Update an existing blog article. If no draft parameter is specified, the article keeps its current draft/published status.",
        kind: ToolKind::UpdateArticle,
        fields: &[
            FieldSpec::required("id", FieldKind::Id, "The ID of the article to update"),
            FieldSpec::required("title", FieldKind::Text, "The new title of the article"),
            FieldSpec::optional("content", FieldKind::Text, "The new content of the article"),
            FieldSpec::optional("excerpt", FieldKind::Text, "The new excerpt/summary"),
            FieldSpec::optional("cover", FieldKind::Text, "The new cover image URL"),
            FieldSpec::optional("sort_id", FieldKind::Integer, "The new category ID"),
            FieldSpec::optional("tags", FieldKind::Text, "New comma-separated tags"),
            FieldSpec::optional("post_date", FieldKind::Text, "New publish date"),
            FieldSpec::optional("draft", YES_NO, "Save as draft (y) or publish (n). If omitted, the current status is kept."),
        ],
        render: Render::Narrated,
    },
    ToolDefinition {
        name: "get_article",
        title: "Get Article",
        description: "Get a specific article by ID",
        kind: ToolKind::GetArticle,
        fields: &[
            FieldSpec::required("id", FieldKind::Id, "The ID of the article to retrieve"),
            FieldSpec::optional("password", FieldKind::Text, "Password for protected articles"),
        ],
        render: Render::Narrated,
    },
    ToolDefinition {
        name: "search_articles",
        title: "Search Articles",
        description: "Search articles by keyword, tag, or category",
        kind: ToolKind::SearchArticles,
        fields: &[
            FieldSpec::optional("keyword", FieldKind::Text, "Search keyword for article titles"),
            FieldSpec::optional("tag", FieldKind::Text, "Filter by tag"),
            FieldSpec::optional("sort_id", FieldKind::Integer, "Filter by category ID"),
            FieldSpec::optional("page", FieldKind::Id, "Page number (default: 1)"),
            FieldSpec::optional("count", FieldKind::Id, "Number of articles per page"),
            FieldSpec::optional("order", FieldKind::Enum(&["views", "comnum"]), "Sort by view count (views) or comment count (comnum)"),
        ],
        render: Render::Narrated,
    },
    ToolDefinition {
        name: "like_article",
        title: "Like Article",
        description: "Like an article",
        kind: ToolKind::LikeArticle,
        fields: &[
            FieldSpec::required("gid", FieldKind::Id, "The ID of the article to like"),
            FieldSpec::optional("name", FieldKind::Text, "Name of the person liking"),
            FieldSpec::optional("avatar", FieldKind::Text, "Avatar URL of the person liking"),
        ],
        render: Render::Narrated,
    },
    ToolDefinition {
        name: "unlike_article",
        title: "Unlike Article",
        description: "Remove a like from an article",
        kind: ToolKind::UnlikeArticle,
        fields: &[FieldSpec::required("gid", FieldKind::Id, "The ID of the article")],
        render: Render::Narrated,
    },
    ToolDefinition {
        name: "get_article_likes",
        title: "Get Article Likes",
        description: "List likes, optionally for a single article",
        kind: ToolKind::GetArticleLikes,
        fields: &[FieldSpec::optional("id", FieldKind::Id, "The ID of the article")],
        render: Render::Narrated,
    },
    ToolDefinition {
        name: "add_comment",
        title: "Add Comment",
        description: "Add a comment to an article",
        kind: ToolKind::AddComment,
        fields: &[
            FieldSpec::required("gid", FieldKind::Id, "The ID of the article to comment on"),
            FieldSpec::required("comname", FieldKind::Text, "Name of the commenter"),
            FieldSpec::required("comment", FieldKind::Text, "The comment content"),
            FieldSpec::optional("commail", FieldKind::Text, "Email of the commenter"),
            FieldSpec::optional("comurl", FieldKind::Text, "Website URL of the commenter"),
            FieldSpec::optional("avatar", FieldKind::Text, "Avatar URL of the commenter"),
            FieldSpec::optional("pid", FieldKind::Integer, "Parent comment ID for replies"),
        ],
        render: Render::Narrated,
    },
    ToolDefinition {
        name: "get_comments",
        title: "Get Comments",
        description: "Get comments for an article. Passing page uses the paginated comment list.",
        kind: ToolKind::GetComments,
        fields: &[
            FieldSpec::required("id", FieldKind::Id, "The ID of the article"),
            FieldSpec::optional("page", FieldKind::Id, "Page number for paginated comments (requires backend pagination enabled)"),
        ],
        render: Render::Narrated,
    },
    ToolDefinition {
        name: "like_comment",
        title: "Like Comment",
        description: "Like a comment",
        kind: ToolKind::LikeComment,
        fields: &[FieldSpec::required("cid", FieldKind::Id, "The ID of the comment")],
        render: Render::Narrated,
    },
    ToolDefinition {
        name: "create_note",
        title: "Create Note",
        description: "Create a new micro-note",
        kind: ToolKind::CreateNote,
        fields: &[
            FieldSpec::required("t", FieldKind::Text, "The content of the micro-note"),
            FieldSpec::optional("private", YES_NO, "Whether the note is private (y) or public (n)"),
        ],
        render: Render::Narrated,
    },
    ToolDefinition {
        name: "upload_file",
        title: "Upload File",
        description: "Upload a local file (image, document, etc.)",
        kind: ToolKind::UploadFile,
        fields: &[
            FieldSpec::required("file_path", FieldKind::Text, "Local path to the file to upload"),
            FieldSpec::optional("sid", FieldKind::Integer, "Resource category ID"),
        ],
        render: Render::Narrated,
    },
    ToolDefinition {
        name: "get_user_info",
        title: "Get User Info",
        description: "Get current user information",
        kind: ToolKind::GetUserInfo,
        fields: &[],
        render: Render::Narrated,
    },
    ToolDefinition {
        name: "get_user_detail",
        title: "Get User Detail",
        description: "Get a user's public profile by ID",
        kind: ToolKind::GetUserDetail,
        fields: &[FieldSpec::required("id", FieldKind::Id, "The ID of the user")],
        render: Render::Narrated,
    },
    ToolDefinition {
        name: "get_draft_list",
        title: "Get Draft List",
        description: "Get list of draft articles",
        kind: ToolKind::GetDraftList,
        fields: &[FieldSpec::optional("count", FieldKind::Id, "Number of drafts to retrieve")],
        render: Render::Narrated,
    },
    ToolDefinition {
        name: "get_draft_detail",
        title: "Get Draft Detail",
        description: "Get details of a specific draft",
        kind: ToolKind::GetDraftDetail,
        fields: &[FieldSpec::required("id", FieldKind::Id, "The ID of the draft to retrieve")],
        render: Render::Narrated,
    },
];

pub fn find_tool(name: &str) -> Option<&'static ToolDefinition> {
    TOOLS.iter().find(|tool| tool.name == name)
}

pub(super) async fn execute<T: Transport>(
    client: &EmlogClient<T>,
    kind: ToolKind,
    args: &Arguments,
) -> Result<Value, AdapterError> {
    match kind {
        ToolKind::CreateArticle => {
            client
                .create_article(NewArticle {
                    title: args.required_text("title")?,
                    content: args.required_text("content")?,
                    excerpt: args.text("excerpt"),
                    cover: args.text("cover"),
                    sort_id: args.number("sort_id"),
                    tags: args.text("tags"),
                    draft: args.flag("draft"),
                    top: args.flag("top"),
                    sortop: args.flag("sortop"),
                    allow_remark: args.flag("allow_remark"),
                    password: args.text("password"),
                    link: args.text("link"),
                    post_date: args.text("post_date"),
                    auto_cover: args.flag("auto_cover"),
                    field_keys: args.list("field_keys"),
                    field_values: args.list("field_values"),
                })
                .await
        }
        ToolKind::UpdateArticle => {
            let id = args.required_number("id")?;
            let resolution = resolve_draft_state(client, id, args.flag("draft")).await;
            let response = client
                .update_article(ArticleUpdate {
                    id,
                    title: args.required_text("title")?,
                    content: args.text("content"),
                    excerpt: args.text("excerpt"),
                    cover: args.text("cover"),
                    sort_id: args.number("sort_id"),
                    tags: args.text("tags"),
                    post_date: args.text("post_date"),
                    draft: resolution.effective_flag(),
                })
                .await?;
            Ok(json!({
                "response": response,
                "draft_state": resolution.to_value(),
            }))
        }
        ToolKind::GetArticle => {
            client
                .get_article_detail(args.required_number("id")?, args.text("password"))
                .await
        }
        ToolKind::SearchArticles => {
            client
                .get_article_list(ArticleQuery {
                    page: args.number("page"),
                    count: args.number("count"),
                    sort_id: args.number("sort_id"),
                    keyword: args.text("keyword"),
                    tag: args.text("tag"),
                    order: args.text("order"),
                })
                .await
        }
        ToolKind::LikeArticle => {
            client
                .like_article(
                    args.required_number("gid")?,
                    args.text("name"),
                    args.text("avatar"),
                )
                .await
        }
        ToolKind::UnlikeArticle => client.unlike_article(args.required_number("gid")?).await,
        ToolKind::GetArticleLikes => client.get_article_likes(args.number("id")).await,
        ToolKind::AddComment => {
            client
                .add_comment(NewComment {
                    gid: args.required_number("gid")?,
                    comname: args.required_text("comname")?,
                    comment: args.required_text("comment")?,
                    commail: args.text("commail"),
                    comurl: args.text("comurl"),
                    avatar: args.text("avatar"),
                    pid: args.number("pid"),
                })
                .await
        }
        ToolKind::GetComments => {
            let id = args.required_number("id")?;
            match args.number("page") {
                Some(page) => client.get_comment_list(id, Some(page)).await,
                None => client.get_comment_list_simple(id).await,
            }
        }
        ToolKind::LikeComment => client.like_comment(args.required_number("cid")?).await,
        ToolKind::CreateNote => {
            client
                .publish_note(args.required_text("t")?, args.flag("private"))
                .await
        }
        ToolKind::UploadFile => {
            client
                .upload_file(&args.required_text("file_path")?, args.number("sid"))
                .await
        }
        ToolKind::GetUserInfo => client.get_current_user().await,
        ToolKind::GetUserDetail => client.get_user_detail(args.required_number("id")?).await,
        ToolKind::GetDraftList => client.get_draft_list(args.number("count")).await,
        ToolKind::GetDraftDetail => client.get_draft_detail(args.required_number("id")?).await,
    }
}

/// Short human-readable summary of a successful tool call.
pub(super) fn narrate(kind: ToolKind, args: &Arguments, payload: &Value) -> String {
    match kind {
        ToolKind::CreateArticle => {
            let id = payload
                .get("article_id")
                .and_then(display_scalar)
                .unwrap_or_else(|| "unknown".to_string());
            format!(
                "Successfully created article: {} (ID: {id})",
                args.text("title").unwrap_or_default()
            )
        }
        ToolKind::UpdateArticle => narrate_update(args, payload),
        ToolKind::GetArticle => {
            let article: Article = decode(payload);
            let category = article
                .sort_name
                .clone()
                .or_else(|| article.sort_id.map(|id| id.to_string()));
            format!(
                "Article: {}\n\nContent: {}\n\nExcerpt: {}\nCategory: {}\nTags: {}\nViews: {}\nComments: {}",
                article.title.as_deref().unwrap_or("Untitled"),
                article.content.as_deref().unwrap_or_default(),
                or_na(article.excerpt.as_deref()),
                or_na(category.as_deref()),
                or_na(article.tag_names().as_deref()),
                article.views.unwrap_or(0),
                article.comnum.unwrap_or(0),
            )
        }
        ToolKind::SearchArticles => {
            let page: ArticlePage = decode(payload);
            let lines = page
                .articles
                .iter()
                .map(|article| {
                    format!(
                        "- {} (ID: {}) - Views: {}, Comments: {}",
                        article.title.as_deref().unwrap_or("Untitled"),
                        or_unknown(article.id),
                        article.views.unwrap_or(0),
                        article.comnum.unwrap_or(0)
                    )
                })
                .collect::<Vec<_>>();
            format!(
                "Found {} articles (Page {}/{}):\n\n{}",
                page.articles.len(),
                page.page.or(args.number("page")).unwrap_or(1),
                or_unknown(page.total_pages),
                list_or(&lines, "No articles found")
            )
        }
        ToolKind::LikeArticle => format!(
            "Successfully liked article with ID: {}",
            or_unknown(args.number("gid"))
        ),
        ToolKind::UnlikeArticle => format!(
            "Successfully removed like from article with ID: {}",
            or_unknown(args.number("gid"))
        ),
        ToolKind::GetArticleLikes => {
            let likes: Vec<Like> = payload
                .get("likes")
                .map(decode)
                .unwrap_or_default();
            let lines = likes
                .iter()
                .map(|like| {
                    format!(
                        "- {} ({})",
                        like.poster.as_deref().unwrap_or("anonymous"),
                        or_na(like.date.as_deref())
                    )
                })
                .collect::<Vec<_>>();
            let scope = match args.number("id") {
                Some(id) => format!("Likes for article {id}"),
                None => "Likes".to_string(),
            };
            format!(
                "{scope} ({} found):\n\n{}",
                likes.len(),
                list_or(&lines, "No likes found")
            )
        }
        ToolKind::AddComment => format!(
            "Successfully added comment to article {} by {}",
            or_unknown(args.number("gid")),
            args.text("comname").unwrap_or_default()
        ),
        ToolKind::GetComments => {
            let id = or_unknown(args.number("id"));
            let comments = comments_from_value(payload.get("comments"));
            let lines = comments
                .iter()
                .map(|comment| {
                    format!(
                        "- {}: {} ({})",
                        comment.poster.as_deref().unwrap_or("anonymous"),
                        comment.comment.as_deref().unwrap_or_default(),
                        or_na(comment.date.as_deref())
                    )
                })
                .collect::<Vec<_>>();
            let list = list_or(&lines, "No comments found");
            match args.number("page") {
                Some(page) => format!(
                    "Comments for article {id} (page {page}):\n\n{list}\n\nPage URL: {}",
                    or_na(payload.get("commentPageUrl").and_then(Value::as_str))
                ),
                None => format!("Comments for article {id}:\n\n{list}"),
            }
        }
        ToolKind::LikeComment => format!(
            "Successfully liked comment with ID: {}",
            or_unknown(args.number("cid"))
        ),
        ToolKind::CreateNote => {
            let text = args.text("t").unwrap_or_default();
            let preview: String = text.chars().take(NOTE_PREVIEW_CHARS).collect();
            let ellipsis = if text.chars().count() > NOTE_PREVIEW_CHARS {
                "..."
            } else {
                ""
            };
            format!("Successfully created micro-note: {preview}{ellipsis}")
        }
        ToolKind::UploadFile => {
            let media: Media = decode(payload);
            format!(
                "Successfully uploaded file: {}",
                media.url.as_deref().unwrap_or("(no URL returned)")
            )
        }
        ToolKind::GetUserInfo | ToolKind::GetUserDetail => {
            let user: UserInfo = payload.get("userinfo").map(decode).unwrap_or_default();
            let mut text = format!(
                "User: {}\nEmail: {}\nUID: {}\nDescription: {}",
                or_na(user.nickname.as_deref()),
                or_na(user.email.as_deref()),
                or_unknown(user.uid),
                or_na(user.description.as_deref())
            );
            if let Some(role) = user.role.as_deref() {
                text.push_str(&format!("\nRole: {role}"));
            }
            text
        }
        ToolKind::GetDraftList => {
            let drafts: Vec<Article> = payload
                .get("drafts")
                .map(decode)
                .unwrap_or_default();
            let lines = drafts
                .iter()
                .map(|draft| {
                    format!(
                        "- ID: {}, Title: {}, Date: {}",
                        or_unknown(draft.id),
                        draft.title.as_deref().unwrap_or("Untitled"),
                        or_na(draft.date.as_deref())
                    )
                })
                .collect::<Vec<_>>();
            format!(
                "Draft articles ({} found):\n\n{}",
                drafts.len(),
                list_or(&lines, "No drafts found")
            )
        }
        ToolKind::GetDraftDetail => {
            let draft: Article = payload.get("draft").map(decode).unwrap_or_default();
            format!(
                "Draft Details:\n\nTitle: {}\nID: {}\nDate: {}\nAuthor: {}\nCategory: {}\nExcerpt: {}\n\n--- Content ---\n{}",
                draft.title.as_deref().unwrap_or("Untitled"),
                or_unknown(draft.id),
                or_na(draft.date.as_deref()),
                or_na(draft.author_name.as_deref()),
                draft.sort_name.as_deref().unwrap_or("Uncategorized"),
                draft.excerpt.as_deref().unwrap_or("No excerpt"),
                draft.content.as_deref().unwrap_or_default()
            )
        }
    }
}

fn narrate_update(args: &Arguments, payload: &Value) -> String {
    let id = or_unknown(args.number("id"));
    let title = args.text("title").unwrap_or_default();
    let mut text = format!("Successfully updated article: {title} (ID: {id})");

    let state = payload.get("draft_state");
    let label = state
        .and_then(|s| s.get("draft"))
        .and_then(Value::as_str)
        .and_then(Flag::parse)
        .and_then(|flag| DraftResolution::Explicit(flag).status_label());
    if let Some(label) = label {
        text.push(' ');
        text.push_str(label);
    }
    let unknown = state
        .and_then(|s| s.get("mode"))
        .and_then(Value::as_str)
        .is_some_and(|mode| mode == "unknown");
    if unknown {
        text.push_str(&format!(
            "\nNote: article {id} was not found in drafts or published articles; the draft flag was left unset."
        ));
    }
    text
}

fn decode<D: DeserializeOwned + Default>(value: &Value) -> D {
    serde_json::from_value(value.clone()).unwrap_or_default()
}

fn display_scalar(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn or_na(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => "N/A",
    }
}

fn or_unknown(value: Option<u64>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}

fn list_or(lines: &[String], empty: &str) -> String {
    if lines.is_empty() {
        empty.to_string()
    } else {
        lines.join("\n")
    }
}
