use std::borrow::Cow;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The default REST API error (spec §7).
///
/// Build one via the associated functions, which carry the default code/message for
/// their HTTP status; override either with [`ApiError::with_code`] /
/// [`ApiError::with_message`] when a more specific error kind needs its own wording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub www_authenticate: Option<Cow<'static, str>>,
    pub body: ErrorBody,
}

/// The JSON body of an [`ApiError`] response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub code: Cow<'static, str>,
    pub message: Cow<'static, str>,
}

impl ApiError {
    fn new<T>(status: StatusCode, code: T, message: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        Self {
            status,
            www_authenticate: None,
            body: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    pub fn with_code<T: Into<Cow<'static, str>>>(mut self, code: T) -> Self {
        self.body.code = code.into();
        self
    }

    pub fn with_message<T: Into<Cow<'static, str>>>(mut self, message: T) -> Self {
        self.body.message = message.into();
        self
    }

    pub fn with_www_authenticate(mut self, value: impl Into<Cow<'static, str>>) -> Self {
        self.www_authenticate = Some(value.into());
        self
    }

    pub fn unauthenticated() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            "Missing or invalid credentials",
        )
    }

    pub fn permission_denied() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            "permission_denied",
            "The caller's role does not permit this operation",
        )
    }

    pub fn not_member() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            "not_member",
            "The caller is not a member of this group",
        )
    }

    pub fn read_only_group() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            "read_only_group",
            "This group is frozen and cannot start new calls",
        )
    }

    pub fn not_found(code: &'static str, message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }

    pub fn bad_request(code: &'static str, message: &'static str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn backend_unavailable() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "backend_unavailable",
            "The recorder backend did not respond in time",
        )
    }

    pub fn transcode_failed() -> Self {
        Self::new(
            StatusCode::BAD_GATEWAY,
            "transcode_failed",
            "The recording could not be converted to its canonical format",
        )
    }

    pub fn notifier_failed() -> Self {
        Self::new(
            StatusCode::BAD_GATEWAY,
            "notifier_failed",
            "A dependent notification could not be delivered",
        )
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_server_error",
            "An internal server error occurred",
        )
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "status={}, code={}, message={}",
            self.status, self.body.code, self.body.message
        )
    }
}

impl actix_web::ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> actix_web::HttpResponse<actix_web::body::BoxBody> {
        let mut response = actix_web::HttpResponse::build(self.status_code());
        if let Some(www_authenticate) = &self.www_authenticate {
            response.insert_header((
                actix_web::http::header::WWW_AUTHENTICATE,
                www_authenticate.as_ref(),
            ));
        }
        response.json(&self.body)
    }
}

impl From<actix_web::error::JsonPayloadError> for ApiError {
    fn from(err: actix_web::error::JsonPayloadError) -> Self {
        Self::bad_request("invalid_json", "The request body could not be parsed")
            .with_message(err.to_string())
    }
}

/// Error handler for `web::JsonConfig`, so a malformed request body comes back as an
/// [`ApiError`] JSON body instead of actix-web's default plaintext rejection.
pub fn json_error_handler(
    err: actix_web::error::JsonPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    let code = match &err {
        actix_web::error::JsonPayloadError::OverflowKnownLength { .. }
        | actix_web::error::JsonPayloadError::Overflow { .. } => "payload_overflow",
        actix_web::error::JsonPayloadError::ContentType => "invalid_content_type",
        actix_web::error::JsonPayloadError::Deserialize(_)
        | actix_web::error::JsonPayloadError::Serialize(_) => "invalid_json",
        _ => "invalid_payload",
    };

    ApiError::from(err).with_code(code).into()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn with_code_overrides_the_default() {
        let err = ApiError::not_found("call_not_found", "No such call").with_code("custom");
        assert_eq!(err.body.code, "custom");
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
