//! JSON envelope shared by every API response.

use crate::error::LibrisError;
use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use libris_store_db::{Error as StoreError, FieldError};
use serde::Serialize;

#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

pub fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(Envelope {
        success: true,
        message: None,
        data: Some(data),
    })
}

pub fn created<T: Serialize>(message: &'static str, data: T) -> HttpResponse {
    HttpResponse::Created().json(Envelope {
        success: true,
        message: Some(message),
        data: Some(data),
    })
}

pub fn updated<T: Serialize>(message: &'static str, data: T) -> HttpResponse {
    HttpResponse::Ok().json(Envelope {
        success: true,
        message: Some(message),
        data: Some(data),
    })
}

pub fn message(message: &'static str) -> HttpResponse {
    HttpResponse::Ok().json(Envelope::<()> {
        success: true,
        message: Some(message),
        data: None,
    })
}

/// Machine-readable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Busy,
    Internal,
}

impl ErrorKind {
    pub fn of(err: &LibrisError) -> Self {
        match err {
            LibrisError::Store(e) => match e {
                StoreError::Validation { .. } => Self::Validation,
                StoreError::NotFound { .. } => Self::NotFound,
                StoreError::Conflict { .. } => Self::Conflict,
                StoreError::Busy(_) => Self::Busy,
                StoreError::Sqlite(_)
                | StoreError::DatabaseOpen { .. }
                | StoreError::DatabaseNotFound(_) => Self::Internal,
            },
            LibrisError::BadRequest { .. } => Self::Validation,
            LibrisError::RouteNotFound => Self::NotFound,
            LibrisError::Io { .. } | LibrisError::Config(_) | LibrisError::Server(_) => {
                Self::Internal
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Busy => "busy",
            Self::Internal => "internal",
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Busy => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [FieldError]>,
}

pub fn error(err: &LibrisError) -> HttpResponse {
    let kind = ErrorKind::of(err);
    let (message, errors) = match (kind, err) {
        (ErrorKind::Validation, LibrisError::Store(StoreError::Validation { errors })) => {
            ("Validation failed".to_string(), Some(errors.as_slice()))
        }
        (ErrorKind::Busy, _) => {
            log::warn!("{err}");
            ("Database is busy, retry the request".to_string(), None)
        }
        (ErrorKind::Internal, _) => {
            log::error!("{err}");
            ("Internal server error".to_string(), None)
        }
        _ => (err.to_string(), None),
    };
    HttpResponse::build(kind.status()).json(ErrorBody {
        success: false,
        kind: kind.as_str(),
        message,
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServerError;
    use rstest::rstest;

    #[rstest]
    #[case::validation(StoreError::validation("title", "Title is required").into(), StatusCode::BAD_REQUEST, "validation")]
    #[case::bad_request(LibrisError::BadRequest { reason: "expected integer".into() }, StatusCode::BAD_REQUEST, "validation")]
    #[case::not_found(StoreError::not_found("book").into(), StatusCode::NOT_FOUND, "not_found")]
    #[case::route(LibrisError::RouteNotFound, StatusCode::NOT_FOUND, "not_found")]
    #[case::conflict(StoreError::conflict("no copies available").into(), StatusCode::CONFLICT, "conflict")]
    #[case::storage(StoreError::DatabaseNotFound("x.sqlite".into()).into(), StatusCode::INTERNAL_SERVER_ERROR, "internal")]
    #[case::task(ServerError::Task { reason: "panicked".into() }.into(), StatusCode::INTERNAL_SERVER_ERROR, "internal")]
    fn test_error_kinds(
        #[case] err: LibrisError,
        #[case] status: StatusCode,
        #[case] kind: &str,
    ) {
        let kind_of = ErrorKind::of(&err);
        assert_eq!(kind_of.status(), status);
        assert_eq!(kind_of.as_str(), kind);
        assert_eq!(error(&err).status(), status);
    }
}
