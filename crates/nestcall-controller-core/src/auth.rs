//! Bearer-JWT authentication (spec §6 "All authenticated routes require an
//! `AuthContext`"). A `HttpAuthentication::bearer` middleware validates the token
//! and stashes an [`Identity`] in the request's extensions, the same shape the
//! teacher's `OidcAuth` middleware uses for its `ReqData<User>` extractor.

use actix_web::dev::ServiceRequest;
use actix_web::web::{Data, ReqData};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use actix_web_httpauth::extractors::AuthenticationError;
use actix_web_httpauth::headers::www_authenticate::bearer::Bearer;
use jsonwebtoken::{decode, DecodingKey, Validation};
use nestcall_controller_settings::SettingsProvider;
use nestcall_signaling_core::AuthContext;
use nestcall_types_api::error::ApiError;
use nestcall_types_common::{GroupId, MemberId, Role};
use serde::{Deserialize, Serialize};

/// The claims this service expects in a bearer token. `group_id` is deliberately
/// absent: group scoping comes from the URL, not the token, so a single token works
/// across every group a member belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: MemberId,
    #[serde(default = "Claims::default_role")]
    pub role: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    pub exp: i64,
}

impl Claims {
    fn default_role() -> String {
        "member".to_owned()
    }
}

/// The authenticated caller, inserted into a request's extensions by
/// [`bearer_validator`]. Routes combine this with the `groupId` path segment to
/// build a full [`AuthContext`].
#[derive(Debug, Clone)]
pub struct Identity {
    pub member_id: MemberId,
    pub role: Role,
    pub display_name: String,
    pub email: String,
}

impl Identity {
    /// Builds the [`AuthContext`] a `CallCoordinator`/`RecorderCoordinator` method
    /// needs, scoping this identity to `group_id` from the request path.
    pub fn into_auth_context(self, group_id: GroupId) -> AuthContext {
        AuthContext {
            user_id: self.member_id,
            member_id: self.member_id,
            group_id,
            role: self.role,
            display_name: self.display_name,
            email: self.email,
        }
    }
}

/// Extractor alias matching the teacher's `ReqData<User>` convention.
pub type AuthedIdentity = ReqData<Identity>;

/// `HttpAuthentication::bearer` validator: decodes the token with the configured
/// `jwt_secret`, rejecting anything expired or malformed as `Unauthenticated`
/// (spec §7).
pub async fn bearer_validator(
    req: ServiceRequest,
    credentials: BearerAuth,
) -> Result<ServiceRequest, (actix_web::Error, ServiceRequest)> {
    let settings_provider = req
        .app_data::<Data<SettingsProvider>>()
        .expect("SettingsProvider must be registered as app data")
        .clone();
    let jwt_secret = settings_provider.get().auth.jwt_secret.clone();

    let decoded = decode::<Claims>(
        credentials.token(),
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    );

    match decoded {
        Ok(token) => {
            let claims = token.claims;
            req.extensions_mut().insert(Identity {
                member_id: claims.sub,
                role: Role::new(claims.role),
                display_name: claims.display_name,
                email: claims.email,
            });
            Ok(req)
        }
        Err(err) => {
            tracing::debug!(?err, "rejected bearer token");
            let challenge = Bearer::build().error(actix_web_httpauth::extractors::bearer::Error::InvalidToken).finish();
            Err((AuthenticationError::new(challenge).into(), req))
        }
    }
}

impl From<&Identity> for ApiError {
    fn from(_: &Identity) -> Self {
        ApiError::unauthenticated()
    }
}

/// The claims minted by `HttpRecorderBackend::callback_token` for the ghost recorder
/// to present back to the recorder-facing routes. Distinct from [`Claims`]: the
/// recorder has no `MemberId`, only the fixed subject `"recorder"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecorderClaims {
    sub: String,
    exp: i64,
}

/// Marker inserted into a request's extensions once a recorder callback token has
/// been validated. Carries no data; its presence is the authorization.
#[derive(Debug, Clone, Copy)]
pub struct RecorderIdentity;

pub type AuthedRecorder = ReqData<RecorderIdentity>;

/// `HttpAuthentication::bearer` validator for the recorder-only scope
/// (`recorder-signal`, `recording` ingest). Rejects anything that isn't a token
/// minted for `sub == "recorder"`.
pub async fn recorder_bearer_validator(
    req: ServiceRequest,
    credentials: BearerAuth,
) -> Result<ServiceRequest, (actix_web::Error, ServiceRequest)> {
    let settings_provider = req
        .app_data::<Data<SettingsProvider>>()
        .expect("SettingsProvider must be registered as app data")
        .clone();
    let jwt_secret = settings_provider.get().auth.jwt_secret.clone();

    let decoded = decode::<RecorderClaims>(
        credentials.token(),
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    );

    match decoded {
        Ok(token) if token.claims.sub == "recorder" => {
            req.extensions_mut().insert(RecorderIdentity);
            Ok(req)
        }
        Ok(_) => {
            let challenge = Bearer::build().error(actix_web_httpauth::extractors::bearer::Error::InvalidToken).finish();
            Err((AuthenticationError::new(challenge).into(), req))
        }
        Err(err) => {
            tracing::debug!(?err, "rejected recorder callback token");
            let challenge = Bearer::build().error(actix_web_httpauth::extractors::bearer::Error::InvalidToken).finish();
            Err((AuthenticationError::new(challenge).into(), req))
        }
    }
}
