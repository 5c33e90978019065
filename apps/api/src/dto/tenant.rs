use crewdeck_domain::{Company, Office, User};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming payload for company creation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/create-company-request.ts"
)]
pub struct CreateCompanyRequest {
    pub name: String,
}

/// Incoming payload for company renames.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/update-company-request.ts"
)]
pub struct UpdateCompanyRequest {
    pub name: String,
}

/// API representation of a company.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/company-response.ts"
)]
pub struct CompanyResponse {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

/// Incoming payload for office creation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/create-office-request.ts"
)]
pub struct CreateOfficeRequest {
    pub name: String,
}

/// Incoming payload for office renames.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/update-office-request.ts"
)]
pub struct UpdateOfficeRequest {
    pub name: String,
}

/// API representation of an office.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/office-response.ts"
)]
pub struct OfficeResponse {
    pub id: String,
    pub company_id: String,
    pub name: String,
}

/// Incoming payload for granting a user access to an office.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/grant-office-access-request.ts"
)]
pub struct GrantOfficeAccessRequest {
    pub user_id: String,
}

/// Incoming payload for moving a user's current-office pointer.
///
/// `office_id: null` clears the pointer.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/set-current-office-request.ts"
)]
pub struct SetCurrentOfficeRequest {
    pub office_id: Option<String>,
}

/// Incoming payload for profile updates.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/update-user-request.ts"
)]
pub struct UpdateUserRequest {
    pub display_name: String,
}

/// API representation of a user profile.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/user-response.ts"
)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub current_office_id: Option<String>,
    pub created_at: String,
}

impl From<Company> for CompanyResponse {
    fn from(company: Company) -> Self {
        Self {
            id: company.id().to_string(),
            name: company.name().as_str().to_owned(),
            created_at: company.created_at().to_rfc3339(),
        }
    }
}

impl From<Office> for OfficeResponse {
    fn from(office: Office) -> Self {
        Self {
            id: office.id().to_string(),
            company_id: office.company_id().to_string(),
            name: office.name().as_str().to_owned(),
        }
    }
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id().to_string(),
            email: user.email().as_str().to_owned(),
            display_name: user.display_name().as_str().to_owned(),
            current_office_id: user.current_office_id().map(|id| id.to_string()),
            created_at: user.created_at().to_rfc3339(),
        }
    }
}
