//! Authentication is out of scope: a caller's identity is expected to
//! already have been established upstream (gateway, sidecar, or another
//! service) and handed to this process as trusted headers. This middleware
//! only reconstructs [`AuthUser`] from those headers and attaches it as a
//! request extension; it does not verify tokens or manage sessions.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use shared::AuthUser;
use uuid::Uuid;

use crate::KernelState;

const USER_ID_HEADER: &str = "x-user-id";
const USER_ROLES_HEADER: &str = "x-user-roles";

pub async fn require_auth(
    State(_state): State<KernelState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let user = extract_auth_user(request.headers()).ok_or(StatusCode::UNAUTHORIZED)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn extract_auth_user(headers: &HeaderMap) -> Option<AuthUser> {
    let id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())?;

    let roles = headers
        .get(USER_ROLES_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').map(str::to_string).collect())
        .unwrap_or_default();

    Some(AuthUser { id, roles })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_user_and_roles() {
        let mut headers = HeaderMap::new();
        let id = Uuid::new_v4();
        headers.insert(USER_ID_HEADER, id.to_string().parse().unwrap());
        headers.insert(USER_ROLES_HEADER, "admin,reviewer".parse().unwrap());

        let user = extract_auth_user(&headers).unwrap();
        assert_eq!(user.id, id);
        assert!(user.is_admin());
        assert_eq!(user.roles, vec!["admin", "reviewer"]);
    }

    #[test]
    fn missing_header_is_unauthenticated() {
        let headers = HeaderMap::new();
        assert!(extract_auth_user(&headers).is_none());
    }
}
