mod audit;
mod auth;
mod common;
mod invites;
mod security;
mod tenant;

pub use audit::AuditLogEntryResponse;
pub use auth::{
    AcceptInviteRequest, BootstrapRequest, InvitePreviewResponse, LoginRequest, ScopeResponse,
    SessionResponse, SwitchCompanyRequest,
};
pub use common::{GenericMessageResponse, HealthResponse};
pub use invites::{CreateInviteRequest, InviteResponse};
pub use security::{
    AssignRoleRequest, CreateRoleRequest, EffectivePermissionsResponse,
    PermissionCatalogEntryResponse, RemoveRoleAssignmentRequest, RoleAssignmentResponse,
    RoleResponse, UpdateRoleRequest,
};
pub use tenant::{
    CompanyResponse, CreateCompanyRequest, CreateOfficeRequest, GrantOfficeAccessRequest,
    OfficeResponse, SetCurrentOfficeRequest, UpdateCompanyRequest, UpdateOfficeRequest,
    UpdateUserRequest, UserResponse,
};

#[cfg(test)]
mod tests {
    use ts_rs::{Config, TS};

    use super::{
        AcceptInviteRequest, AssignRoleRequest, AuditLogEntryResponse, BootstrapRequest,
        CompanyResponse, CreateCompanyRequest, CreateInviteRequest, CreateOfficeRequest,
        CreateRoleRequest, EffectivePermissionsResponse, GenericMessageResponse, GrantOfficeAccessRequest,
        HealthResponse, InvitePreviewResponse, InviteResponse, LoginRequest, OfficeResponse,
        PermissionCatalogEntryResponse, RemoveRoleAssignmentRequest, RoleAssignmentResponse,
        RoleResponse, ScopeResponse, SessionResponse, SetCurrentOfficeRequest,
        SwitchCompanyRequest, UpdateCompanyRequest, UpdateOfficeRequest, UpdateRoleRequest,
        UpdateUserRequest, UserResponse,
    };
    use crate::error::ErrorResponse;

    #[test]
    fn export_ts_bindings() -> Result<(), ts_rs::ExportError> {
        let config = Config::default();

        BootstrapRequest::export(&config)?;
        LoginRequest::export(&config)?;
        SwitchCompanyRequest::export(&config)?;
        AcceptInviteRequest::export(&config)?;
        ScopeResponse::export(&config)?;
        SessionResponse::export(&config)?;
        InvitePreviewResponse::export(&config)?;
        CreateRoleRequest::export(&config)?;
        UpdateRoleRequest::export(&config)?;
        RoleResponse::export(&config)?;
        AssignRoleRequest::export(&config)?;
        RemoveRoleAssignmentRequest::export(&config)?;
        RoleAssignmentResponse::export(&config)?;
        EffectivePermissionsResponse::export(&config)?;
        PermissionCatalogEntryResponse::export(&config)?;
        CreateCompanyRequest::export(&config)?;
        UpdateCompanyRequest::export(&config)?;
        CompanyResponse::export(&config)?;
        CreateOfficeRequest::export(&config)?;
        UpdateOfficeRequest::export(&config)?;
        OfficeResponse::export(&config)?;
        GrantOfficeAccessRequest::export(&config)?;
        SetCurrentOfficeRequest::export(&config)?;
        UpdateUserRequest::export(&config)?;
        UserResponse::export(&config)?;
        CreateInviteRequest::export(&config)?;
        InviteResponse::export(&config)?;
        AuditLogEntryResponse::export(&config)?;
        GenericMessageResponse::export(&config)?;
        HealthResponse::export(&config)?;
        ErrorResponse::export(&config)?;

        Ok(())
    }
}
