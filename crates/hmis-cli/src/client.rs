//! Thin HTTP client for the HMIS API

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Non-2xx response; carries the server's error code and message
    #[error("{status} {code}: {message}")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid server URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("not logged in; pass --token or set HMIS_TOKEN")]
    MissingToken,
}

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Serialize)]
pub struct NewAdmission<'a> {
    pub patient_id: i64,
    pub category: &'a str,
    pub reason: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bed_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ward_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attending_doctor_id: Option<i64>,
}

#[derive(Serialize)]
pub struct NewPatient<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub date_of_birth: &'a str,
    pub gender: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_group: Option<&'a str>,
}

pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(server: &str, token: Option<String>) -> ClientResult<Self> {
        let mut base = Url::parse(server)?;
        // Url::join drops the last path segment unless it ends in '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    fn url(&self, path: &str) -> ClientResult<Url> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
        authenticated: bool,
    ) -> ClientResult<Value> {
        let mut req = self.http.request(method, self.url(path)?).query(query);
        if authenticated {
            let token = self.token.as_deref().ok_or(ClientError::MissingToken)?;
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        let value: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };

        if status.is_success() {
            return Ok(value);
        }
        let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);
        Err(ClientError::Api {
            status,
            code: field("error").unwrap_or_else(|| "ERROR".into()),
            message: field("message").unwrap_or_else(|| value.to_string()),
        })
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> ClientResult<Value> {
        self.request::<Value>(Method::GET, path, query, None, true).await
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ClientResult<Value> {
        self.request(Method::POST, path, &[], Some(body), true).await
    }

    /// Exchange credentials for a bearer token
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<String> {
        let body = serde_json::json!({ "username": username, "password": password });
        let resp = self
            .request(Method::POST, "api/auth/login", &[], Some(&body), false)
            .await?;
        resp.get("token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ClientError::Api {
                status: StatusCode::OK,
                code: "BAD_RESPONSE".into(),
                message: "login response has no token".into(),
            })
    }

    pub async fn search_patients(&self, q: Option<&str>, limit: i64) -> ClientResult<Value> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(q) = q {
            query.push(("q", q.to_string()));
        }
        self.get("api/patients", &query).await
    }

    pub async fn patient(&self, id: i64) -> ClientResult<Value> {
        self.get(&format!("api/patients/{}", id), &[]).await
    }

    pub async fn register_patient(&self, patient: &NewPatient<'_>) -> ClientResult<Value> {
        self.post("api/patients", patient).await
    }

    pub async fn beds(&self, available: bool, ward_type: Option<&str>) -> ClientResult<Value> {
        let mut query = Vec::new();
        if available {
            query.push(("available", "true".to_string()));
        }
        if let Some(ward_type) = ward_type {
            query.push(("ward_type", ward_type.to_string()));
        }
        self.get("api/beds", &query).await
    }

    pub async fn admit(&self, admission: &NewAdmission<'_>) -> ClientResult<Value> {
        self.post("api/admissions", admission).await
    }

    pub async fn discharge(&self, admission_id: i64, notes: Option<&str>) -> ClientResult<Value> {
        let body = serde_json::json!({ "notes": notes });
        self.post(&format!("api/admissions/{}/discharge", admission_id), &body).await
    }

    pub async fn dashboard(&self) -> ClientResult<Value> {
        self.get("api/dashboard", &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn base_path_is_kept_when_joining() {
        let client = ApiClient::new("http://hospital.local/hmis", None).unwrap();
        assert_eq!(client.url("api/beds").unwrap().as_str(), "http://hospital.local/hmis/api/beds");
    }

    #[tokio::test]
    async fn login_returns_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(body_json(json!({ "username": "admin", "password": "secret" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "jwt-123", "token_type": "Bearer" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), None).unwrap();
        assert_eq!(client.login("admin", "secret").await.unwrap(), "jwt-123");
    }

    #[tokio::test]
    async fn requests_carry_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/patients"))
            .and(query_param("q", "okafor"))
            .and(header("Authorization", "Bearer jwt-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1, "last_name": "Okafor" }])))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), Some("jwt-123".into())).unwrap();
        let patients = client.search_patients(Some("okafor"), 20).await.unwrap();
        assert_eq!(patients[0]["last_name"], "Okafor");
    }

    #[tokio::test]
    async fn server_errors_keep_their_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/admissions"))
            .respond_with(
                ResponseTemplate::new(409)
                    .set_body_json(json!({ "error": "CONFLICT", "message": "no free bed matches the admission request" })),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), Some("jwt-123".into())).unwrap();
        let err = client
            .admit(&NewAdmission {
                patient_id: 7,
                category: "icu",
                reason: "respiratory failure",
                bed_id: None,
                ward_id: None,
                attending_doctor_id: None,
            })
            .await
            .unwrap_err();

        match err {
            ClientError::Api { status, code, message } => {
                assert_eq!(status, StatusCode::CONFLICT);
                assert_eq!(code, "CONFLICT");
                assert_eq!(message, "no free bed matches the admission request");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn protected_calls_need_a_token() {
        let client = ApiClient::new("http://127.0.0.1:9", None).unwrap();
        assert!(matches!(client.dashboard().await, Err(ClientError::MissingToken)));
    }
}
