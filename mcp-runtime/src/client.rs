use std::path::Path;

use emlog_core::models::Flag;
use serde_json::Value;

use crate::error::AdapterError;
use crate::transport::{Endpoint, FilePart, RequestSpec, Transport};

pub const ARTICLE_LIST: Endpoint = Endpoint::Rest("article_list");
pub const ARTICLE_DETAIL: Endpoint = Endpoint::Rest("article_detail");
pub const ARTICLE_POST: Endpoint = Endpoint::Rest("article_post");
pub const ARTICLE_UPDATE: Endpoint = Endpoint::Rest("article_update");
pub const DRAFT_LIST: Endpoint = Endpoint::Rest("draft_list");
pub const DRAFT_DETAIL: Endpoint = Endpoint::Rest("draft_detail");
pub const SORT_LIST: Endpoint = Endpoint::Rest("sort_list");
pub const COMMENT_LIST: Endpoint = Endpoint::Rest("comment_list");
pub const COMMENT_LIST_SIMPLE: Endpoint = Endpoint::Rest("comment_list_simple");
pub const NOTE_LIST: Endpoint = Endpoint::Rest("note_list");
pub const NOTE_POST: Endpoint = Endpoint::Rest("note_post");
pub const USER_INFO: Endpoint = Endpoint::Rest("userinfo");
pub const USER_DETAIL: Endpoint = Endpoint::Rest("user_detail");
pub const LIKE_LIST: Endpoint = Endpoint::Rest("like_list");
pub const UPLOAD: Endpoint = Endpoint::Rest("upload");
pub const ADD_LIKE: Endpoint = Endpoint::Action("addlike");
pub const UNLIKE: Endpoint = Endpoint::Action("unlike");
pub const ADD_COMMENT: Endpoint = Endpoint::Action("addcom");
pub const LIKE_COMMENT: Endpoint = Endpoint::Action("likecom");

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleQuery {
    pub page: Option<u64>,
    pub count: Option<u64>,
    pub sort_id: Option<u64>,
    pub keyword: Option<String>,
    pub tag: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub cover: Option<String>,
    pub sort_id: Option<u64>,
    pub tags: Option<String>,
    pub draft: Option<Flag>,
    pub top: Option<Flag>,
    pub sortop: Option<Flag>,
    pub allow_remark: Option<Flag>,
    pub password: Option<String>,
    pub link: Option<String>,
    pub post_date: Option<String>,
    pub auto_cover: Option<Flag>,
    pub field_keys: Option<Vec<String>>,
    pub field_values: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleUpdate {
    pub id: u64,
    pub title: String,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub cover: Option<String>,
    pub sort_id: Option<u64>,
    pub tags: Option<String>,
    pub post_date: Option<String>,
    pub draft: Option<Flag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewComment {
    pub gid: u64,
    pub comname: String,
    pub comment: String,
    pub commail: Option<String>,
    pub comurl: Option<String>,
    pub avatar: Option<String>,
    pub pid: Option<u64>,
}

/// Typed operations over the remote blog. Each one builds a single
/// [`RequestSpec`] and hands it to the transport.
pub struct EmlogClient<T> {
    transport: T,
}

impl<T: Transport> EmlogClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn get_article_list(&self, query: ArticleQuery) -> Result<Value, AdapterError> {
        let spec = RequestSpec::read(ARTICLE_LIST)
            .optional("page", query.page)
            .optional("count", query.count)
            .optional("sort_id", query.sort_id)
            .optional("keyword", query.keyword)
            .optional("tag", query.tag)
            .optional("order", query.order);
        self.transport.send(spec).await
    }

    /// Returns the `article` object from the detail payload.
    pub async fn get_article_detail(
        &self,
        id: u64,
        password: Option<String>,
    ) -> Result<Value, AdapterError> {
        let spec = RequestSpec::read(ARTICLE_DETAIL)
            .param("id", id)
            .optional("password", password);
        let payload = self.transport.send(spec).await?;
        Ok(take_field(payload, "article"))
    }

    pub async fn create_article(&self, article: NewArticle) -> Result<Value, AdapterError> {
        let spec = RequestSpec::write(ARTICLE_POST)
            .param("title", article.title)
            .param("content", article.content)
            .optional("excerpt", article.excerpt)
            .optional("cover", article.cover)
            .optional("sort_id", article.sort_id)
            .optional("tags", article.tags)
            .optional("draft", article.draft)
            .optional("top", article.top)
            .optional("sortop", article.sortop)
            .optional("allow_remark", article.allow_remark)
            .optional("password", article.password)
            .optional("link", article.link)
            .optional("post_date", article.post_date)
            .optional("auto_cover", article.auto_cover)
            .optional("field_keys", article.field_keys)
            .optional("field_values", article.field_values);
        self.transport.send(spec).await
    }

    pub async fn update_article(&self, update: ArticleUpdate) -> Result<Value, AdapterError> {
        let spec = RequestSpec::write(ARTICLE_UPDATE)
            .param("id", update.id)
            .param("title", update.title)
            .optional("content", update.content)
            .optional("excerpt", update.excerpt)
            .optional("cover", update.cover)
            .optional("sort_id", update.sort_id)
            .optional("tags", update.tags)
            .optional("post_date", update.post_date)
            .optional("draft", update.draft);
        self.transport.send(spec).await
    }

    pub async fn like_article(
        &self,
        gid: u64,
        name: Option<String>,
        avatar: Option<String>,
    ) -> Result<Value, AdapterError> {
        let spec = RequestSpec::write(ADD_LIKE)
            .param("gid", gid)
            .optional("name", name)
            .optional("avatar", avatar);
        self.transport.send(spec).await
    }

    pub async fn unlike_article(&self, gid: u64) -> Result<Value, AdapterError> {
        let spec = RequestSpec::write(UNLIKE).param("gid", gid);
        self.transport.send(spec).await
    }

    pub async fn get_article_likes(&self, id: Option<u64>) -> Result<Value, AdapterError> {
        let spec = RequestSpec::read(LIKE_LIST).optional("id", id);
        self.transport.send(spec).await
    }

    pub async fn get_draft_list(&self, count: Option<u64>) -> Result<Value, AdapterError> {
        let spec = RequestSpec::read(DRAFT_LIST).optional("count", count);
        self.transport.send(spec).await
    }

    pub async fn get_draft_detail(&self, id: u64) -> Result<Value, AdapterError> {
        let spec = RequestSpec::read(DRAFT_DETAIL).param("id", id);
        self.transport.send(spec).await
    }

    pub async fn get_sort_list(&self) -> Result<Value, AdapterError> {
        self.transport.send(RequestSpec::read(SORT_LIST)).await
    }

    /// Paginated comment tree (`comment_list`).
    pub async fn get_comment_list(&self, id: u64, page: Option<u64>) -> Result<Value, AdapterError> {
        let spec = RequestSpec::read(COMMENT_LIST)
            .param("id", id)
            .optional("page", page);
        self.transport.send(spec).await
    }

    /// Flat comment list (`comment_list_simple`).
    pub async fn get_comment_list_simple(&self, id: u64) -> Result<Value, AdapterError> {
        let spec = RequestSpec::read(COMMENT_LIST_SIMPLE).param("id", id);
        self.transport.send(spec).await
    }

    pub async fn add_comment(&self, comment: NewComment) -> Result<Value, AdapterError> {
        let spec = RequestSpec::write(ADD_COMMENT)
            .param("gid", comment.gid)
            .param("comname", comment.comname)
            .param("comment", comment.comment)
            .optional("commail", comment.commail)
            .optional("comurl", comment.comurl)
            .optional("avatar", comment.avatar)
            .optional("pid", comment.pid)
            .param("resp", "json");
        self.transport.send(spec).await
    }

    pub async fn like_comment(&self, cid: u64) -> Result<Value, AdapterError> {
        let spec = RequestSpec::write(LIKE_COMMENT).param("cid", cid);
        self.transport.send(spec).await
    }

    pub async fn publish_note(
        &self,
        content: String,
        private: Option<Flag>,
    ) -> Result<Value, AdapterError> {
        let spec = RequestSpec::write(NOTE_POST)
            .param("t", content)
            .param("private", private.unwrap_or(Flag::No));
        self.transport.send(spec).await
    }

    pub async fn get_note_list(
        &self,
        page: Option<u64>,
        count: Option<u64>,
        author_uid: Option<u64>,
    ) -> Result<Value, AdapterError> {
        let spec = RequestSpec::read(NOTE_LIST)
            .optional("page", page)
            .optional("count", count)
            .optional("author_uid", author_uid);
        self.transport.send(spec).await
    }

    pub async fn get_current_user(&self) -> Result<Value, AdapterError> {
        self.transport.send(RequestSpec::read(USER_INFO)).await
    }

    pub async fn get_user_detail(&self, id: u64) -> Result<Value, AdapterError> {
        let spec = RequestSpec::read(USER_DETAIL).param("id", id);
        self.transport.send(spec).await
    }

    /// Reads a local file and posts it as multipart. A missing path fails
    /// with `NotFound` before anything is sent; any other local failure is an
    /// `InvalidRequest` on `file_path` carrying the io error.
    pub async fn upload_file(
        &self,
        local_path: &str,
        sid: Option<u64>,
    ) -> Result<Value, AdapterError> {
        let path = Path::new(local_path);
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|err| local_file_error(local_path, err))?;
        if !meta.is_file() {
            return Err(AdapterError::invalid(
                "file_path",
                format!("'{local_path}' is not a regular file"),
            ));
        }
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| local_file_error(local_path, err))?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload.bin")
            .to_string();

        let spec = RequestSpec::write(UPLOAD)
            .optional("sid", sid)
            .file(FilePart {
                field: "file".to_string(),
                file_name,
                bytes,
            });
        self.transport.send(spec).await
    }
}

fn local_file_error(local_path: &str, err: std::io::Error) -> AdapterError {
    match err.kind() {
        std::io::ErrorKind::NotFound => AdapterError::NotFound {
            path: local_path.to_string(),
        },
        _ => AdapterError::invalid(
            "file_path",
            format!("Cannot read '{local_path}': {err}"),
        ),
    }
}

fn take_field(payload: Value, key: &str) -> Value {
    match payload {
        Value::Object(mut map) => map.remove(key).unwrap_or(Value::Object(map)),
        other => other,
    }
}
