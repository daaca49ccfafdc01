//! HTTP client for the movie API

use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::E2eResult;
use crate::movie::{MovieUpdate, NewMovie, TokenResponse};

/// The API takes the raw token, no scheme
const AUTH_HEADER: &str = "Authorization";

/// Status code and decoded JSON body of a response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T = Value> {
    pub status: u16,
    pub body: T,
}

impl ApiResponse<Value> {
    /// Decode the body into a typed struct, keeping the status
    pub fn into_typed<T: DeserializeOwned>(self) -> E2eResult<ApiResponse<T>> {
        Ok(ApiResponse {
            status: self.status,
            body: serde_json::from_value(self.body)?,
        })
    }
}

/// A single API call
#[derive(Debug, Clone)]
pub struct ApiRequest<'a> {
    pub method: Method,

    /// Path relative to the base URL, e.g. `/movies/7`
    pub path: &'a str,

    /// Use this base URL instead of the client's
    pub base_url: Option<&'a str>,

    /// JSON body, sent only for POST and PUT
    pub body: Option<Value>,

    pub headers: Vec<(&'static str, String)>,

    /// Query string pairs, URL-encoded on send
    pub query: Vec<(&'static str, String)>,
}

impl<'a> ApiRequest<'a> {
    pub fn new(method: Method, path: &'a str) -> Self {
        Self {
            method,
            path,
            base_url: None,
            body: None,
            headers: Vec::new(),
            query: Vec::new(),
        }
    }

    pub fn get(path: &'a str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn query(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.query.push((name, value.into()));
        self
    }

    pub fn base_url(mut self, base_url: &'a str) -> Self {
        self.base_url = Some(base_url);
        self
    }

    fn sends_body(&self) -> bool {
        self.method == Method::POST || self.method == Method::PUT
    }
}

/// Client for the movie API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> E2eResult<Self> {
        Self::with_timeout(base_url, Duration::from_secs(10))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> E2eResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request and decode the JSON response body into `T`
    pub async fn request<T: DeserializeOwned>(&self, req: ApiRequest<'_>) -> E2eResult<ApiResponse<T>> {
        let base = req.base_url.unwrap_or(self.base_url.as_str()).trim_end_matches('/');
        let url = format!("{}{}", base, req.path);

        debug!("{} {}", req.method, url);

        let mut builder = self.http.request(req.method.clone(), &url);
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        for (name, value) in &req.headers {
            builder = builder.header(*name, value);
        }
        if req.sends_body() {
            if let Some(body) = &req.body {
                builder = builder.json(body);
            }
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.json::<T>().await?;

        debug!("{} {} -> {}", req.method, url, status);
        Ok(ApiResponse { status, body })
    }

    /// `GET /auth/fake-token`
    pub async fn fake_token(&self) -> E2eResult<ApiResponse<TokenResponse>> {
        self.request(ApiRequest::get("/auth/fake-token")).await
    }

    /// `POST /movie`
    pub async fn add_movie(&self, token: &str, movie: &NewMovie) -> E2eResult<ApiResponse> {
        let req = ApiRequest::new(Method::POST, "/movie")
            .body(serde_json::to_value(movie)?)
            .header(AUTH_HEADER, token);
        self.request(req).await
    }

    /// `GET /movies`
    pub async fn get_all_movies(&self, token: &str) -> E2eResult<ApiResponse> {
        self.request(ApiRequest::get("/movies").header(AUTH_HEADER, token))
            .await
    }

    /// `GET /movies/{id}`
    pub async fn get_movie_by_id(&self, token: &str, id: i64) -> E2eResult<ApiResponse> {
        let path = format!("/movies/{}", id);
        self.request(ApiRequest::get(&path).header(AUTH_HEADER, token))
            .await
    }

    /// `GET /movies?name={name}`
    pub async fn get_movie_by_name(&self, token: &str, name: &str) -> E2eResult<ApiResponse> {
        let req = ApiRequest::get("/movies")
            .query("name", name)
            .header(AUTH_HEADER, token);
        self.request(req).await
    }

    /// `PUT /movies/{id}`
    pub async fn update_movie(&self, token: &str, id: i64, update: &MovieUpdate) -> E2eResult<ApiResponse> {
        let path = format!("/movies/{}", id);
        let req = ApiRequest::new(Method::PUT, &path)
            .body(serde_json::to_value(update)?)
            .header(AUTH_HEADER, token);
        self.request(req).await
    }

    /// `DELETE /movies/{id}`
    pub async fn delete_movie(&self, token: &str, id: i64) -> E2eResult<ApiResponse> {
        let path = format!("/movies/{}", id);
        self.request(ApiRequest::new(Method::DELETE, &path).header(AUTH_HEADER, token))
            .await
    }
}
