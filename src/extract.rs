use std::convert::Infallible;

use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::{header, request::Parts},
    Form, Json,
};
use serde::de::DeserializeOwned;

use crate::AppError;

/// Representation picked from the `Accept` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Html,
}

impl Format {
    /// First recognised media type wins; quality values are not weighed.
    pub fn from_accept(accept: Option<&str>) -> Self {
        let Some(accept) = accept else {
            return Format::Json;
        };

        for media in accept.split(',') {
            let media = media.split(';').next().unwrap_or_default().trim();
            match media {
                "application/json" | "application/*" | "*/*" => return Format::Json,
                "text/html" | "application/xhtml+xml" => return Format::Html,
                _ => {}
            }
        }
        Format::Json
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Format {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let accept = parts.headers.get(header::ACCEPT).and_then(|v| v.to_str().ok());
        Ok(Self::from_accept(accept))
    }
}

/// `http://<host>` as the client addressed us.
#[derive(Debug, Clone)]
pub struct BaseUrl(String);

impl BaseUrl {
    pub fn new(host: &str) -> Self {
        Self(format!("http://{host}"))
    }

    pub fn join(&self, path: &str) -> String {
        format!("{}{path}", self.0)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for BaseUrl {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| parts.uri.authority().map(|authority| authority.as_str()))
            .unwrap_or("localhost");
        Ok(Self::new(host))
    }
}

/// A body that may arrive as JSON or as an urlencoded form.
pub struct JsonOrForm<T>(pub T);

impl<T, S> FromRequest<S> for JsonOrForm<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let mime = content_type.split(';').next().unwrap_or_default().trim().to_owned();

        match mime.as_str() {
            "application/json" => Json::<T>::from_request(req, state)
                .await
                .map(|Json(body)| Self(body))
                .map_err(|rejection| AppError::bad_request(rejection.body_text())),
            "application/x-www-form-urlencoded" => Form::<T>::from_request(req, state)
                .await
                .map(|Form(body)| Self(body))
                .map_err(|rejection| AppError::bad_request(rejection.body_text())),
            other => Err(AppError::bad_request(format!("unsupported content type {other:?}"))),
        }
    }
}
