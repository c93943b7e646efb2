//! Gateway to the backend API.
//!
//! One `reqwest::Client` is shared by every screen. The bearer token is read
//! from the [`Session`] on each call, never cached here.

pub mod auth;
pub mod followup;
pub mod repair;
pub mod settings;
pub mod store;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_DISPOSITION};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::domain::DeskError;
use crate::session::{Session, now_epoch_seconds};

/// Keys under which list endpoints nest their rows.
const ENVELOPE_KEYS: [&str; 3] = ["data", "tasks", "payments"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Post,
    Put,
}

/// A mutation, fully described before anything is sent.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    pub method: Method,
    pub path: String,
    pub body: Value,
}

impl WriteRequest {
    pub fn post(path: impl Into<String>, body: &impl Serialize) -> Result<Self, DeskError> {
        Ok(Self {
            method: Method::Post,
            path: path.into(),
            body: serde_json::to_value(body)?,
        })
    }

    pub fn put(path: impl Into<String>, body: &impl Serialize) -> Result<Self, DeskError> {
        Ok(Self {
            method: Method::Put,
            path: path.into(),
            body: serde_json::to_value(body)?,
        })
    }
}

/// A multipart file upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub path: String,
    pub field: String,
    pub file: PathBuf,
    pub fields: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct Download {
    pub file_name: String,
    pub bytes: Bytes,
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, session: Session) -> Result<Self, DeskError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, DeskError> {
        if self.session.is_active() && !self.session.check_expiry(now_epoch_seconds()) {
            return Err(DeskError::SessionExpired);
        }
        Ok(match self.session.bearer() {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {token}")),
            None => request,
        })
    }

    /// Maps non-2xx answers to errors. 401 and 403 end the session.
    async fn check(&self, response: Response) -> Result<Response, DeskError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!("Backend answered {status}, dropping session");
            if let Err(e) = self.session.logout() {
                warn!("Failed to clear session: {e}");
            }
            return Err(DeskError::Unauthorized(status.as_u16()));
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| body.chars().take(200).collect());
        Err(DeskError::Status(status.as_u16(), message))
    }

    async fn read_json(response: Response) -> Result<Value, DeskError> {
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| DeskError::Decode(e.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, DeskError> {
        let request = self.authorize(self.http.get(self.url(path)).query(query))?;
        let response = self.check(request.send().await?).await?;
        Self::read_json(response).await
    }

    /// Fetches a list endpoint and unwraps whatever envelope it uses.
    pub async fn get_rows(&self, path: &str, query: &[(String, String)]) -> Result<Vec<Value>, DeskError> {
        let rows = extract_rows(self.get_json(path, query).await?)?;
        debug!("GET {path} returned {} rows", rows.len());
        Ok(rows)
    }

    #[instrument(skip(self, body))]
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value, DeskError> {
        let request = self.authorize(self.http.post(self.url(path)).json(body))?;
        let response = self.check(request.send().await?).await?;
        let value = Self::read_json(response).await?;
        check_success(&value)?;
        Ok(value)
    }

    #[instrument(skip(self, write), fields(path = %write.path))]
    pub async fn send(&self, write: &WriteRequest) -> Result<Value, DeskError> {
        let builder = match write.method {
            Method::Post => self.http.post(self.url(&write.path)),
            Method::Put => self.http.put(self.url(&write.path)),
        };
        let request = self.authorize(builder.json(&write.body))?;
        let response = self.check(request.send().await?).await?;
        let value = Self::read_json(response).await?;
        check_success(&value)?;
        info!("{:?} {} done", write.method, write.path);
        Ok(value)
    }

    #[instrument(skip(self))]
    pub async fn download(&self, path: &str, query: &[(String, String)]) -> Result<Download, DeskError> {
        let request = self.authorize(self.http.get(self.url(path)).query(query))?;
        let response = self.check(request.send().await?).await?;
        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(content_disposition_file_name)
            .unwrap_or_else(|| fallback_file_name(path));
        let bytes = response.bytes().await?;
        Ok(Download { file_name, bytes })
    }

    #[instrument(skip(self, upload), fields(path = %upload.path))]
    pub async fn upload(&self, upload: &UploadRequest) -> Result<Value, DeskError> {
        let content = tokio::fs::read(&upload.file).await?;
        let file_name = upload
            .file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload.bin".to_string());
        let mut form = Form::new().part(upload.field.clone(), Part::bytes(content).file_name(file_name));
        for (name, value) in &upload.fields {
            form = form.text(name.clone(), value.clone());
        }
        let request = self.authorize(self.http.post(self.url(&upload.path)).multipart(form))?;
        let response = self.check(request.send().await?).await?;
        let value = Self::read_json(response).await?;
        check_success(&value)?;
        Ok(value)
    }
}

/// `{success: false, message}` is a failure even with a 2xx status.
pub fn check_success(body: &Value) -> Result<(), DeskError> {
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        let message = body
            .get("message")
            .or_else(|| body.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("request was not successful");
        return Err(DeskError::Api(message.to_string()));
    }
    Ok(())
}

/// Pulls the row list out of a bare array, `{data: [..]}`, `{tasks: [..]}`
/// or `{payments: [..]}`.
pub fn extract_rows(body: Value) -> Result<Vec<Value>, DeskError> {
    check_success(&body)?;
    match body {
        Value::Array(rows) => Ok(rows),
        Value::Object(mut object) => {
            for key in ENVELOPE_KEYS {
                match object.remove(key) {
                    Some(Value::Array(rows)) => return Ok(rows),
                    Some(Value::Null) => return Ok(Vec::new()),
                    Some(Value::Object(inner)) => {
                        if let Some(Value::Array(rows)) = inner.get("rows").cloned() {
                            return Ok(rows);
                        }
                    }
                    _ => {}
                }
            }
            Err(DeskError::Decode(format!(
                "no row list in response with keys {:?}",
                object.keys().collect::<Vec<_>>()
            )))
        }
        Value::Null => Ok(Vec::new()),
        other => Err(DeskError::Decode(format!("expected a list, got {other}"))),
    }
}

/// File name from a `Content-Disposition` header. The RFC 5987 form is
/// preferred and percent-decoded; only the last path component is kept.
pub fn content_disposition_file_name(header: &str) -> Option<String> {
    let parts: Vec<&str> = header.split(';').map(str::trim).collect();
    let extended = parts.iter().find_map(|part| {
        let value = part.strip_prefix("filename*=")?;
        let encoded = value.split_once("''").map_or(value, |(_, rest)| rest);
        urlencoding::decode(encoded.trim_matches('"'))
            .map(|decoded| decoded.into_owned())
            .ok()
    });
    let name = extended.or_else(|| {
        parts
            .iter()
            .find_map(|part| part.strip_prefix("filename="))
            .map(|name| name.trim_matches('"').to_string())
    })?;
    Path::new(&name)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .filter(|n| !n.is_empty())
}

fn fallback_file_name(path: &str) -> String {
    let stem = path
        .trim_matches('/')
        .replace("/export", "")
        .replace('/', "-");
    format!("{stem}-{}.xlsx", chrono::Local::now().format("%Y%m%d-%H%M%S"))
}

/// Writes a download into `dir`, never overwriting an existing file.
pub fn save_download(dir: &Path, download: &Download) -> Result<PathBuf, DeskError> {
    fs::create_dir_all(dir)?;
    let mut target = dir.join(&download.file_name);
    let mut counter = 1;
    while target.exists() {
        let stem = Path::new(&download.file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let ext = Path::new(&download.file_name)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        target = dir.join(format!("{stem} ({counter}){ext}"));
        counter += 1;
    }
    fs::write(&target, &download.bytes)?;
    info!("Saved {} bytes to {:?}", download.bytes.len(), target);
    Ok(target)
}

/// Percent-encodes a value used as a single path segment.
pub fn encode_segment(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

pub fn query(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::make_token;
    use axum::extract::Multipart;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::{get, post, put};
    use axum::{Json, Router};
    use serde_json::json;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn logged_in_session() -> (Session, String) {
        let session = Session::in_memory();
        let token = make_token(&json!({"exp": now_epoch_seconds() + 600, "role": "store"}));
        session.login(token.clone(), None).unwrap();
        (session, token)
    }

    fn client(base: &str, session: Session) -> ApiClient {
        ApiClient::new(base, Duration::from_secs(5), session).unwrap()
    }

    #[test]
    fn envelope_shapes() {
        let bare = extract_rows(json!([{"a": 1}, {"a": 2}])).unwrap();
        assert_eq!(bare.len(), 2);
        let data = extract_rows(json!({"success": true, "data": [{"a": 1}]})).unwrap();
        assert_eq!(data.len(), 1);
        let tasks = extract_rows(json!({"tasks": [{"a": 1}, {"a": 2}, {"a": 3}]})).unwrap();
        assert_eq!(tasks.len(), 3);
        let payments = extract_rows(json!({"payments": []})).unwrap();
        assert!(payments.is_empty());
        let nested = extract_rows(json!({"data": {"rows": [{"a": 1}]}})).unwrap();
        assert_eq!(nested.len(), 1);
        assert!(extract_rows(json!({"data": null})).unwrap().is_empty());
    }

    #[test]
    fn unsuccessful_envelope_is_an_error() {
        let err = extract_rows(json!({"success": false, "message": "Sheet not found"})).unwrap_err();
        assert!(matches!(err, DeskError::Api(ref m) if m == "Sheet not found"));
        assert!(matches!(
            extract_rows(json!({"items": []})),
            Err(DeskError::Decode(_))
        ));
        assert!(matches!(extract_rows(json!("text")), Err(DeskError::Decode(_))));
    }

    #[test]
    fn file_name_from_content_disposition() {
        assert_eq!(
            content_disposition_file_name("attachment; filename=\"stock report.xlsx\""),
            Some("stock report.xlsx".to_string())
        );
        assert_eq!(
            content_disposition_file_name("attachment; filename*=UTF-8''po.xlsx"),
            Some("po.xlsx".to_string())
        );
        assert_eq!(
            content_disposition_file_name("attachment; filename=\"../../etc/passwd\""),
            Some("passwd".to_string())
        );
        assert_eq!(
            content_disposition_file_name("attachment; filename*=UTF-8''Stock%20Report%20Jan.xlsx"),
            Some("Stock Report Jan.xlsx".to_string())
        );
        assert_eq!(
            content_disposition_file_name(
                "attachment; filename=\"fallback.xlsx\"; filename*=UTF-8''Stock%20Report.xlsx"
            ),
            Some("Stock Report.xlsx".to_string())
        );
        assert_eq!(
            content_disposition_file_name("attachment; filename*=UTF-8''..%2F..%2Fetc%2Fpasswd"),
            Some("passwd".to_string())
        );
        assert_eq!(content_disposition_file_name("attachment; filename=\"..\""), None);
        assert_eq!(content_disposition_file_name("inline"), None);
    }

    #[test]
    fn segments_are_encoded() {
        assert_eq!(encode_segment("SE/441"), "SE%2F441");
        assert_eq!(encode_segment("TR-101"), "TR-101");
        assert_eq!(encode_segment("a b"), "a%20b");
        assert_eq!(encode_segment("PO#7?x"), "PO%237%3Fx");
    }

    #[test]
    fn downloads_never_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let download = Download {
            file_name: "stock.xlsx".into(),
            bytes: Bytes::from_static(b"PK"),
        };
        let first = save_download(dir.path(), &download).unwrap();
        let second = save_download(dir.path(), &download).unwrap();
        assert_eq!(first.file_name().unwrap(), "stock.xlsx");
        assert_eq!(second.file_name().unwrap(), "stock (1).xlsx");
    }

    #[tokio::test]
    async fn bearer_token_is_attached() {
        let router = Router::new().route(
            "/repair/tasks",
            get(|headers: HeaderMap| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                Json(json!({"success": true, "data": [{"auth": auth}]}))
            }),
        );
        let base = serve(router).await;
        let (session, token) = logged_in_session();
        let rows = client(&base, session)
            .get_rows("/repair/tasks", &[])
            .await
            .unwrap();
        assert_eq!(rows[0]["auth"], json!(format!("Bearer {token}")));
    }

    #[tokio::test]
    async fn unauthorized_clears_the_session() {
        let router = Router::new().route(
            "/store/indents",
            get(|| async { (AxumStatus::UNAUTHORIZED, "expired") }),
        );
        let base = serve(router).await;
        let (session, _) = logged_in_session();
        let api = client(&base, session.clone());
        let err = api.get_rows("/store/indents", &[]).await.unwrap_err();
        assert!(matches!(err, DeskError::Unauthorized(401)));
        assert!(!session.is_active());
    }

    #[tokio::test]
    async fn server_errors_carry_the_message() {
        let router = Router::new().route(
            "/store/stock-report",
            get(|| async {
                (
                    AxumStatus::INTERNAL_SERVER_ERROR,
                    Json(json!({"message": "sheet locked"})),
                )
            }),
        );
        let base = serve(router).await;
        let err = client(&base, Session::in_memory())
            .get_rows("/store/stock-report", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, DeskError::Status(500, ref m) if m == "sheet locked"));
    }

    #[tokio::test]
    async fn put_sends_json_and_checks_success() {
        let router = Router::new()
            .route(
                "/repair/tasks/TR-1/dispatch",
                put(|Json(body): Json<Value>| async move { Json(json!({"success": true, "echo": body})) }),
            )
            .route(
                "/repair/tasks/TR-2/dispatch",
                put(|| async { Json(json!({"success": false, "message": "already dispatched"})) }),
            );
        let base = serve(router).await;
        let api = client(&base, Session::in_memory());

        let ok = WriteRequest::put("/repair/tasks/TR-1/dispatch", &json!({"vendor_name": "Acme"})).unwrap();
        let answer = api.send(&ok).await.unwrap();
        assert_eq!(answer["echo"]["vendor_name"], json!("Acme"));

        let rejected = WriteRequest::put("/repair/tasks/TR-2/dispatch", &json!({})).unwrap();
        let err = api.send(&rejected).await.unwrap_err();
        assert!(matches!(err, DeskError::Api(ref m) if m == "already dispatched"));
    }

    #[tokio::test]
    async fn download_uses_server_file_name() {
        let router = Router::new().route(
            "/store/stock-report/export",
            get(|| async {
                (
                    [("content-disposition", "attachment; filename=\"stock.xlsx\"")],
                    vec![0x50u8, 0x4b, 0x03, 0x04],
                )
            }),
        );
        let base = serve(router).await;
        let download = client(&base, Session::in_memory())
            .download("/store/stock-report/export", &[])
            .await
            .unwrap();
        assert_eq!(download.file_name, "stock.xlsx");
        assert_eq!(&download.bytes[..], &[0x50u8, 0x4b, 0x03, 0x04][..]);
    }

    #[tokio::test]
    async fn upload_is_multipart() {
        let router = Router::new().route(
            "/repair/payments/11/bill",
            post(|mut multipart: Multipart| async move {
                let mut names = Vec::new();
                while let Some(field) = multipart.next_field().await.unwrap() {
                    let name = field.name().unwrap_or("").to_string();
                    let file = field.file_name().map(str::to_string);
                    let data = field.bytes().await.unwrap();
                    names.push(json!({"name": name, "file": file, "len": data.len()}));
                }
                Json(json!({"success": true, "fields": names}))
            }),
        );
        let base = serve(router).await;
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bill.jpg");
        std::fs::write(&file, b"jpegdata").unwrap();

        let answer = client(&base, Session::in_memory())
            .upload(&UploadRequest {
                path: "/repair/payments/11/bill".into(),
                field: "bill_image".into(),
                file,
                fields: vec![("task_no".into(), "TR-101".into())],
            })
            .await
            .unwrap();
        assert_eq!(answer["fields"][0]["name"], json!("bill_image"));
        assert_eq!(answer["fields"][0]["file"], json!("bill.jpg"));
        assert_eq!(answer["fields"][0]["len"], json!(8));
        assert_eq!(answer["fields"][1]["name"], json!("task_no"));
    }
}
