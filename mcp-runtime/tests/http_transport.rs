use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use serde_json::{Map, Value, json};

use emlog_mcp_runtime::catalog::Catalog;
use emlog_mcp_runtime::client::{EmlogClient, NewArticle};
use emlog_mcp_runtime::config::RuntimeConfig;
use emlog_mcp_runtime::error::AdapterError;
use emlog_mcp_runtime::transport::HttpTransport;

const API_KEY: &str = "test-key";

#[derive(Debug, Clone, Default)]
struct Seen {
    method: String,
    path: String,
    user_agent: Option<String>,
    query: Vec<(String, String)>,
    body: Vec<(String, String)>,
    file: Option<(String, String, Vec<u8>)>,
}

impl Seen {
    fn query_value(&self, key: &str) -> Option<&str> {
        lookup(&self.query, key)
    }

    fn body_value(&self, key: &str) -> Option<&str> {
        lookup(&self.body, key)
    }
}

fn lookup<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

type Log = Arc<Mutex<Vec<Seen>>>;

async fn fake_blog(State(log): State<Log>, request: Request) -> Response {
    let mut seen = Seen {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        user_agent: request
            .headers()
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        query: url::form_urlencoded::parse(request.uri().query().unwrap_or_default().as_bytes())
            .into_owned()
            .collect(),
        ..Seen::default()
    };

    let is_multipart = request
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));
    if is_multipart {
        let mut multipart = Multipart::from_request(request, &()).await.unwrap();
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await.unwrap().to_vec();
                    seen.file = Some((name, file_name, bytes));
                }
                None => {
                    let text = field.text().await.unwrap();
                    seen.body.push((name, text));
                }
            }
        }
    } else {
        let bytes = axum::body::to_bytes(request.into_body(), usize::MAX)
            .await
            .unwrap();
        seen.body = url::form_urlencoded::parse(&bytes).into_owned().collect();
    }

    let selector = seen
        .query_value("rest-api")
        .or_else(|| seen.query_value("action"))
        .unwrap_or_default()
        .to_string();
    let password = seen.query_value("password").map(str::to_string);
    log.lock().unwrap().push(seen);

    match selector.as_str() {
        "sort_list" => Json(json!({
            "code": 0,
            "msg": "ok",
            "data": [{"sid": 1, "sortname": "News"}]
        }))
        .into_response(),
        "article_detail" if password.as_deref() == Some("wrong") => Json(json!({
            "code": 7,
            "msg": "bad password",
            "data": null
        }))
        .into_response(),
        "article_detail" => Json(json!({
            "code": 0,
            "msg": "ok",
            "data": {"article": {"id": 7, "title": "Locked"}}
        }))
        .into_response(),
        "draft_detail" => Json(json!({
            "code": 0,
            "msg": "ok",
            "data": {"draft": {"id": 5, "title": "wip"}}
        }))
        .into_response(),
        "userinfo" => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        "draft_list" => (
            StatusCode::FORBIDDEN,
            Json(json!({"code": 403, "msg": "api key error"})),
        )
            .into_response(),
        "note_list" => (StatusCode::OK, "<html>maintenance</html>").into_response(),
        "upload" => Json(json!({
            "code": 0,
            "msg": "ok",
            "data": {"media_id": 3, "url": "/content/uploadfile/a.txt"}
        }))
        .into_response(),
        other => Json(json!({
            "code": 0,
            "msg": "ok",
            "data": {"selector": other, "article_id": 12}
        }))
        .into_response(),
    }
}

async fn spawn_fake_blog() -> (String, Log) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/", get(fake_blog).post(fake_blog))
        .route("/index.php", post(fake_blog))
        .with_state(log.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/"), log)
}

async fn client() -> (EmlogClient<HttpTransport>, Log) {
    let (base_url, log) = spawn_fake_blog().await;
    let config = RuntimeConfig::new(&base_url, API_KEY, 5).unwrap();
    (EmlogClient::new(HttpTransport::new(&config).unwrap()), log)
}

/// A remote that answers only after the client's one-second ceiling.
async fn spawn_stalled_blog() -> String {
    let app = Router::new().route(
        "/",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Json(json!({"code": 0, "msg": "ok", "data": []}))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}

fn last(log: &Log) -> Seen {
    log.lock().unwrap().last().cloned().unwrap()
}

#[tokio::test]
async fn reads_carry_selector_and_key_in_query() {
    let (client, log) = client().await;
    let payload = client.get_sort_list().await.unwrap();
    assert_eq!(payload, json!([{"sid": 1, "sortname": "News"}]));

    let seen = last(&log);
    assert_eq!(seen.method, "GET");
    assert_eq!(seen.path, "/");
    assert_eq!(seen.query_value("rest-api"), Some("sort_list"));
    assert_eq!(seen.query_value("api_key"), Some(API_KEY));
    assert!(seen.body.is_empty());
}

#[tokio::test]
async fn every_request_identifies_itself() {
    let (client, log) = client().await;
    client.get_sort_list().await.unwrap();
    let user_agent = last(&log).user_agent.unwrap();
    assert!(user_agent.starts_with("emlog-mcp/"), "{user_agent}");
}

#[tokio::test]
async fn writes_carry_key_as_form_field() {
    let (client, log) = client().await;
    let payload = client
        .create_article(NewArticle {
            title: "Hello".to_string(),
            content: "Body".to_string(),
            field_keys: Some(vec!["mood".to_string(), "song".to_string()]),
            field_values: Some(vec!["calm".to_string(), "none".to_string()]),
            ..NewArticle::default()
        })
        .await
        .unwrap();
    assert_eq!(payload["article_id"], 12);

    let seen = last(&log);
    assert_eq!(seen.method, "POST");
    assert_eq!(seen.query_value("rest-api"), Some("article_post"));
    assert_eq!(seen.query_value("api_key"), None);
    assert_eq!(seen.body_value("title"), Some("Hello"));
    assert_eq!(seen.body_value("api_key"), Some(API_KEY));
    let keys: Vec<&str> = seen
        .body
        .iter()
        .filter(|(k, _)| k == "field_keys[]")
        .map(|(_, v)| v.as_str())
        .collect();
    assert_eq!(keys, vec!["mood", "song"]);
}

#[tokio::test]
async fn action_endpoints_post_to_front_controller() {
    let (client, log) = client().await;
    client
        .like_article(3, Some("ann".to_string()), None)
        .await
        .unwrap();

    let seen = last(&log);
    assert_eq!(seen.path, "/index.php");
    assert_eq!(seen.query_value("action"), Some("addlike"));
    assert_eq!(seen.body_value("gid"), Some("3"));
    assert_eq!(seen.body_value("name"), Some("ann"));
    assert_eq!(seen.body_value("avatar"), None);
}

#[tokio::test]
async fn non_zero_envelope_code_is_remote_api_error() {
    let (client, _log) = client().await;
    let err = client
        .get_article_detail(7, Some("wrong".to_string()))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        AdapterError::RemoteApi {
            code: 7,
            message: "bad password".to_string()
        }
    );

    let article = client.get_article_detail(7, None).await.unwrap();
    assert_eq!(article["title"], "Locked");
}

#[tokio::test]
async fn non_2xx_is_transport_error_with_status() {
    let (client, _log) = client().await;
    let err = client.get_current_user().await.unwrap_err();
    assert_eq!(
        err,
        AdapterError::Transport {
            status: Some(500),
            message: "Internal Server Error".to_string()
        }
    );

    let err = client.get_draft_list(None).await.unwrap_err();
    assert_eq!(
        err,
        AdapterError::Transport {
            status: Some(403),
            message: "api key error".to_string()
        }
    );
}

#[tokio::test]
async fn slow_remote_times_out_as_transport_error() {
    let base_url = spawn_stalled_blog().await;
    let config = RuntimeConfig::new(&base_url, API_KEY, 1).unwrap();
    let client = EmlogClient::new(HttpTransport::new(&config).unwrap());

    let started = std::time::Instant::now();
    let err = client.get_sort_list().await.unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(err.code(), "transport_error");
    assert!(err.to_string().contains("timed out"), "{err}");
}

#[tokio::test]
async fn success_status_with_non_json_body_is_transport_error() {
    let (client, _log) = client().await;
    let err = client.get_note_list(None, None, None).await.unwrap_err();
    assert_eq!(err.code(), "transport_error");
    assert_eq!(err.to_string(), "HTTP 200: response body is not a JSON envelope");
}

#[tokio::test]
async fn upload_posts_multipart_with_key_part() {
    let (client, log) = client().await;
    let path = std::env::temp_dir().join(format!("emlog-it-{}.txt", uuid::Uuid::now_v7()));
    std::fs::write(&path, b"file body").unwrap();

    let payload = client
        .upload_file(path.to_str().unwrap(), Some(2))
        .await
        .unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(payload["media_id"], 3);

    let seen = last(&log);
    assert_eq!(seen.query_value("rest-api"), Some("upload"));
    assert_eq!(seen.query_value("api_key"), None);
    assert_eq!(seen.body_value("api_key"), Some(API_KEY));
    assert_eq!(seen.body_value("sid"), Some("2"));
    let (field, file_name, bytes) = seen.file.unwrap();
    assert_eq!(field, "file");
    assert!(file_name.starts_with("emlog-it-"));
    assert_eq!(bytes, b"file body");
}

#[tokio::test]
async fn update_without_flag_preserves_draft_over_http() {
    let (client, log) = client().await;
    let catalog = Catalog::new(client);
    let mut args = Map::new();
    args.insert("id".to_string(), json!(5));
    args.insert("title".to_string(), json!("Still a draft"));

    let outcome = catalog.call_tool("update_article", &args).await;
    assert!(!outcome.is_error, "{}", outcome.text);
    assert!(outcome.text.ends_with("(saved as draft)"));

    let log = log.lock().unwrap();
    let selectors: Vec<&str> = log
        .iter()
        .filter_map(|seen| seen.query_value("rest-api"))
        .collect();
    assert_eq!(selectors, vec!["draft_detail", "article_update"]);
    assert_eq!(log[1].body_value("draft"), Some("y"));
}

#[tokio::test]
async fn resource_read_renders_pretty_json() {
    let (client, _log) = client().await;
    let catalog = Catalog::new(client);
    let contents = catalog.read_resource("emlog://categories").await.unwrap();
    let parsed: Value = serde_json::from_str(&contents.text).unwrap();
    assert_eq!(parsed[0]["sortname"], "News");
    assert!(contents.text.contains('\n'));
}

#[tokio::test]
async fn article_resource_sends_password_in_query() {
    let (client, log) = client().await;
    let catalog = Catalog::new(client);
    let contents = catalog
        .read_resource("emlog://articles/7?password=s3cret")
        .await
        .unwrap();
    let parsed: Value = serde_json::from_str(&contents.text).unwrap();
    assert_eq!(parsed["title"], "Locked");

    let seen = last(&log);
    assert_eq!(seen.query_value("rest-api"), Some("article_detail"));
    assert_eq!(seen.query_value("id"), Some("7"));
    assert_eq!(seen.query_value("password"), Some("s3cret"));

    let err = catalog
        .read_resource("emlog://articles/7?password=wrong")
        .await
        .unwrap_err();
    assert_eq!(err.code(), "remote_api_error");
}
