use crux_http::{Error as HttpError, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::AppHttp;
use crate::chat::{SendRequest, TranscriptRequest};
use crate::config::{ClientConfig, ValidatedUrl};
use crate::directory::PageRequest;
use crate::event::Event;
use crate::model::{Contact, ContactId, ContactSummary, DirectoryPage};
use crate::profile::{LoadRequest, PhotoUpload};
use crate::transcript::RawTranscript;
use crate::{AppError, ErrorKind};

const MULTIPART_BOUNDARY: &str = "----contacts-shared-photo";

type HttpResult = crux_http::Result<Response<Vec<u8>>>;

/// Page body as served by the contact API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageBody {
    #[serde(default)]
    content: Vec<ContactSummary>,
    #[serde(default)]
    number: u32,
    #[serde(default)]
    size: u32,
    #[serde(default)]
    total_elements: u64,
}

/// The contact REST API expressed as `crux_http` requests. Every completion event
/// carries the token or epoch the request was issued under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactApi {
    base: ValidatedUrl,
}

impl ContactApi {
    pub fn new(config: &ClientConfig) -> Result<Self, AppError> {
        Ok(Self {
            base: config.base_url()?,
        })
    }

    pub fn fetch_contact(&self, http: &AppHttp, request: LoadRequest) {
        let LoadRequest { token, id } = request;
        let url = self.base.endpoint(["contacts", id.as_str()]);
        debug!(%url, %token, "GET contact");

        http.get(url.as_str()).send(move |result| Event::ContactLoaded {
            token,
            result: Box::new(body(result).and_then(|b| json(&b))),
        });
    }

    pub fn fetch_page(&self, http: &AppHttp, request: PageRequest) {
        let PageRequest {
            token,
            page_index,
            page_size,
        } = request;
        let mut url = self.base.endpoint(["contacts"]);
        url.query_pairs_mut()
            .append_pair("page", &page_index.to_string())
            .append_pair("size", &page_size.to_string());
        debug!(%url, %token, "GET contact page");

        http.get(url.as_str()).send(move |result| Event::PageLoaded {
            token,
            result: Box::new(body(result).and_then(|b| page(&b, page_size))),
        });
    }

    pub fn save_contact(&self, http: &AppHttp, contact: &Contact, close: bool) -> Result<(), AppError> {
        let payload = serde_json::to_vec(contact)
            .map_err(|e| AppError::invalid_state("Contact could not be encoded").with_internal(e.to_string()))?;
        let url = self.base.endpoint(["contacts"]);
        let id = contact.id.clone();
        debug!(%url, %id, close, "POST contact");

        http.post(url.as_str())
            .header("Content-Type", "application/json")
            .body(payload)
            .send(move |result| Event::ContactSaved {
                id,
                close,
                result: Box::new(body(result).map(drop)),
            });
        Ok(())
    }

    pub fn delete_contact(&self, http: &AppHttp, id: ContactId) {
        let url = self.base.endpoint(["contacts", id.as_str()]);
        debug!(%url, "DELETE contact");

        http.delete(url.as_str()).send(move |result| Event::ContactDeleted {
            id,
            result: Box::new(body(result).map(drop)),
        });
    }

    pub fn upload_photo(&self, http: &AppHttp, upload: PhotoUpload) {
        let url = self.base.endpoint(["contacts", "photo"]);
        let content_type = format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}");
        let payload = multipart_photo(&upload);
        let id = upload.id;
        debug!(%url, %id, bytes = payload.len(), "PUT contact photo");

        http.put(url.as_str())
            .header("Content-Type", content_type.as_str())
            .body(payload)
            .send(move |result| Event::PhotoUploadResponse {
                id,
                result: Box::new(body(result).map(drop)),
            });
    }

    pub fn send_message(&self, http: &AppHttp, request: SendRequest) {
        let SendRequest {
            epoch,
            contact_id,
            text,
        } = request;
        let url = self.base.endpoint(["chat", contact_id.as_str()]);
        let payload = serde_json::json!({ "message": text }).to_string();
        debug!(%url, epoch, "POST chat message");

        http.post(url.as_str())
            .header("Content-Type", "application/json")
            .body(payload.into_bytes())
            .send(move |result| Event::ReplyReceived {
                epoch,
                result: Box::new(body(result).map(|b| reply_text(&b))),
            });
    }

    pub fn fetch_conversation(&self, http: &AppHttp, request: TranscriptRequest) {
        let TranscriptRequest {
            token,
            local_id,
            counterpart_id,
        } = request;
        let url = self
            .base
            .endpoint(["chat", "between", local_id.as_str(), counterpart_id.as_str()]);
        debug!(%url, %token, "GET conversation");

        http.get(url.as_str()).send(move |result| Event::TranscriptLoaded {
            token,
            result: Box::new(body(result).map(|b| RawTranscript::from_body(&String::from_utf8_lossy(&b)))),
        });
    }
}

/// Unwraps a successful response body; everything else becomes an [`AppError`].
fn body(result: HttpResult) -> Result<Vec<u8>, AppError> {
    match result {
        Ok(mut response) => {
            let status = u16::from(response.status());
            let bytes = response.take_body().unwrap_or_default();
            if (200..300).contains(&status) {
                Ok(bytes)
            } else {
                Err(rejected(status, &bytes))
            }
        }
        Err(HttpError::Http(err)) => {
            Err(rejected(u16::from(err.code), &err.body.unwrap_or_default()))
        }
        Err(HttpError::Timeout) => Err(AppError::new(ErrorKind::Timeout, "Request timed out")),
        Err(e) => {
            warn!(error = %e, "http transport failure");
            Err(AppError::transport("Network Error").with_internal(e.to_string()))
        }
    }
}

fn rejected(status: u16, body: &[u8]) -> AppError {
    let text = String::from_utf8_lossy(body);
    let err = AppError::from_http_status(status, Some(&text));
    warn!(status, code = err.code(), "http request rejected");
    err
}

fn json<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body)
        .map_err(|e| AppError::new(ErrorKind::Server, "Unexpected response from server").with_internal(e.to_string()))
}

fn page(body: &[u8], requested_size: u32) -> Result<DirectoryPage, AppError> {
    let body: PageBody = json(body)?;
    Ok(DirectoryPage {
        items: body.content,
        page_index: body.number,
        page_size: if body.size == 0 { requested_size } else { body.size },
        total_available: body.total_elements,
    })
}

/// Replies come back either as plain text or as a JSON string literal.
fn reply_text(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.trim_start().starts_with('"') {
        if let Ok(serde_json::Value::String(s)) = serde_json::from_str(&text) {
            return s;
        }
    }
    text.into_owned()
}

fn multipart_photo(upload: &PhotoUpload) -> Vec<u8> {
    let file_name = upload.file_name.replace('"', "%22");
    let mut payload = Vec::with_capacity(upload.bytes.len() + 320);
    payload.extend_from_slice(
        format!(
            "--{MULTIPART_BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    payload.extend_from_slice(&upload.bytes);
    payload.extend_from_slice(
        format!(
            "\r\n--{MULTIPART_BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"id\"\r\n\r\n\
             {id}\r\n--{MULTIPART_BOUNDARY}--\r\n",
            id = upload.id
        )
        .as_bytes(),
    );
    payload
}
