//! Tenant scoping via the `x-admin-id` header.
//!
//! Every admin account owns its own students, groups, payments and so on.
//! A request carrying the header only ever sees rows owned by that admin;
//! a request without it is unscoped.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::errors::AppError;

pub const ADMIN_ID_HEADER: &str = "x-admin-id";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TenantScope(pub Option<Uuid>);

impl TenantScope {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let Some(value) = headers.get(ADMIN_ID_HEADER) else {
            return Ok(TenantScope(None));
        };
        let raw = value
            .to_str()
            .map_err(|_| AppError::Validation(format!("{ADMIN_ID_HEADER} is not valid text")))?
            .trim();
        if raw.is_empty() {
            return Ok(TenantScope(None));
        }
        Uuid::parse_str(raw)
            .map(|id| TenantScope(Some(id)))
            .map_err(|_| AppError::Validation(format!("{ADMIN_ID_HEADER} must be a UUID")))
    }

    /// The admin id to bind into `($n::uuid IS NULL OR admin_id = $n)` filters.
    pub fn admin_id(&self) -> Option<Uuid> {
        self.0
    }

    /// Resolves the owner of a new row. The header wins over the body.
    pub fn owner_for_create(&self, body_admin_id: Option<Uuid>) -> Result<Uuid, AppError> {
        self.0
            .or(body_admin_id)
            .ok_or_else(|| AppError::Validation("admin_id is required".to_string()))
    }

    pub fn permits(&self, owner: Uuid) -> bool {
        self.0.map_or(true, |id| id == owner)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantScope
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        TenantScope::from_headers(&parts.headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ADMIN_ID_HEADER, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_missing_header_is_unscoped() {
        let scope = TenantScope::from_headers(&HeaderMap::new()).unwrap();
        assert_eq!(scope.admin_id(), None);
        assert!(scope.permits(Uuid::new_v4()));
    }

    #[test]
    fn test_blank_header_is_unscoped() {
        let scope = TenantScope::from_headers(&headers_with("  ")).unwrap();
        assert_eq!(scope, TenantScope(None));
    }

    #[test]
    fn test_valid_header_scopes() {
        let id = Uuid::new_v4();
        let scope = TenantScope::from_headers(&headers_with(&id.to_string())).unwrap();
        assert_eq!(scope.admin_id(), Some(id));
        assert!(scope.permits(id));
        assert!(!scope.permits(Uuid::new_v4()));
    }

    #[test]
    fn test_malformed_header_rejected() {
        let err = TenantScope::from_headers(&headers_with("school-7")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_owner_for_create_prefers_header() {
        let header_id = Uuid::new_v4();
        let body_id = Uuid::new_v4();
        let scope = TenantScope(Some(header_id));
        assert_eq!(scope.owner_for_create(Some(body_id)).unwrap(), header_id);
        assert_eq!(TenantScope(None).owner_for_create(Some(body_id)).unwrap(), body_id);
        assert!(TenantScope(None).owner_for_create(None).is_err());
    }
}
