pub mod assignments;
pub mod audit;
pub mod companies;
pub mod health;
pub mod invites;
pub mod offices;
pub mod permissions;
pub mod roles;
pub mod users;

use crewdeck_core::{AppError, CompanyId, OfficeId, RoleId, UserId};
use uuid::Uuid;

pub(crate) fn parse_company_id(value: &str) -> Result<CompanyId, AppError> {
    parse_uuid(value, "company").map(CompanyId::from_uuid)
}

pub(crate) fn parse_office_id(value: &str) -> Result<OfficeId, AppError> {
    parse_uuid(value, "office").map(OfficeId::from_uuid)
}

pub(crate) fn parse_role_id(value: &str) -> Result<RoleId, AppError> {
    parse_uuid(value, "role").map(RoleId::from_uuid)
}

pub(crate) fn parse_user_id(value: &str) -> Result<UserId, AppError> {
    parse_uuid(value, "user").map(UserId::from_uuid)
}

fn parse_uuid(value: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(value)
        .map_err(|_| AppError::Validation(format!("invalid {what} id '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::{parse_role_id, parse_user_id};

    #[test]
    fn well_formed_ids_parse() {
        let id = crewdeck_core::UserId::new();
        assert!(parse_user_id(&id.to_string()).is_ok());
    }

    #[test]
    fn malformed_ids_are_rejected_as_validation_errors() {
        let result = parse_role_id("not-a-uuid");
        assert!(matches!(
            result,
            Err(crewdeck_core::AppError::Validation(_))
        ));
    }
}
