//! Per-operation payload validation.
//!
//! # Design Decisions
//! - One pure function per operation; no I/O
//! - All failing fields are reported, not just the first
//! - String inputs are trimmed and inner whitespace collapsed before
//!   constraint checks
//! - Failure is a ready-to-render BadRequest reply

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::http::response::{ApiReply, ErrorDetail};
use crate::users::model::{FindUsersParams, UserPayload};

/// Pagination bounds of the list operation.
pub const OFFSET_MAX: i64 = 9999;
pub const LIMIT_MAX: i64 = 10_000;
pub const DEFAULT_OFFSET: i64 = 0;
pub const DEFAULT_LIMIT: i64 = 10_000;

const NAME_MAX: usize = 100;
const EMAIL_MAX: usize = 60;
const PHONE_MIN: usize = 4;
const PHONE_MAX: usize = 20;
const COUNTRY_CODE_MIN: i64 = 1;
const COUNTRY_CODE_MAX: i64 = 1624;

/// Validated list filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindUsersQuery {
    pub tags: Vec<String>,
    /// Closed created-at range; both bounds or neither.
    pub range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub offset: i64,
    pub limit: i64,
}

/// Validated create payload; every field is required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUserData {
    pub first_name: String,
    pub last_name: String,
    pub phone_country_code: i64,
    pub phone: String,
    pub email: String,
    pub password: String,
    pub organization_name: String,
    pub organization_phone_country_code: i64,
    pub organization_phone: String,
    pub organization_email: String,
}

/// Validated full-replace payload; absent values write NULL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateUserData {
    pub user_uuid: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_country_code: Option<i64>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub organization_name: Option<String>,
    pub organization_phone_country_code: Option<i64>,
    pub organization_phone: Option<String>,
    pub organization_email: Option<String>,
}

/// Validated partial-update payload; absent values leave columns unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchUserData {
    pub user_uuid: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_country_code: Option<i64>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub organization_name: Option<String>,
    pub organization_phone_country_code: Option<i64>,
    pub organization_phone: Option<String>,
    pub organization_email: Option<String>,
}

/// Collects one message per failing field.
#[derive(Debug, Default)]
struct FieldErrors {
    errors: Vec<ErrorDetail>,
}

impl FieldErrors {
    fn push(&mut self, message: String) {
        self.errors.push(ErrorDetail::message(message));
    }

    fn finish<T>(self, data: T) -> Result<T, ApiReply> {
        if self.errors.is_empty() {
            Ok(data)
        } else {
            Err(ApiReply::bad_request(self.errors))
        }
    }
}

/// Trim and collapse inner whitespace; empty strings become absent.
fn normalize(value: &Option<String>) -> Option<String> {
    let trimmed = value.as_ref()?.split_whitespace().collect::<Vec<_>>().join(" ");
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn check_name(errors: &mut FieldErrors, field: &str, value: &Option<String>) {
    if let Some(value) = value {
        if value.chars().count() > NAME_MAX {
            errors.push(format!(
                "\"{field}\" length must be less than or equal to {NAME_MAX} characters long"
            ));
        }
    }
}

fn check_phone(errors: &mut FieldErrors, field: &str, value: &Option<String>) {
    if let Some(value) = value {
        if !value.chars().all(|c| c.is_ascii_digit()) {
            errors.push(format!(
                "\"{field}\" with value \"{value}\" fails to match the required pattern"
            ));
            return;
        }
        if value.len() < PHONE_MIN {
            errors.push(format!(
                "\"{field}\" length must be at least {PHONE_MIN} characters long"
            ));
        } else if value.len() > PHONE_MAX {
            errors.push(format!(
                "\"{field}\" length must be less than or equal to {PHONE_MAX} characters long"
            ));
        }
    }
}

fn check_country_code(errors: &mut FieldErrors, field: &str, value: Option<i64>) {
    if let Some(value) = value {
        if value < COUNTRY_CODE_MIN {
            errors.push(format!(
                "\"{field}\" must be greater than or equal to {COUNTRY_CODE_MIN}"
            ));
        } else if value > COUNTRY_CODE_MAX {
            errors.push(format!(
                "\"{field}\" must be less than or equal to {COUNTRY_CODE_MAX}"
            ));
        }
    }
}

fn check_email(errors: &mut FieldErrors, field: &str, value: &Option<String>) {
    if let Some(value) = value {
        if !is_email(value) {
            errors.push(format!("\"{field}\" must be a valid email"));
        } else if value.chars().count() > EMAIL_MAX {
            errors.push(format!(
                "\"{field}\" length must be less than or equal to {EMAIL_MAX} characters long"
            ));
        }
    }
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.contains(char::is_whitespace)
}

fn require<T>(errors: &mut FieldErrors, field: &str, value: Option<T>) -> Option<T> {
    if value.is_none() {
        errors.push(format!("\"{field}\" is required"));
    }
    value
}

/// Validate the external user identifier.
pub fn validate_user_id(user_id: &str) -> Result<Uuid, ApiReply> {
    Uuid::parse_str(user_id).map_err(|_| {
        ApiReply::bad_request(vec![ErrorDetail::message("\"userId\" must be a valid GUID")])
    })
}

/// Validate list filters: tag pattern, paired timestamp bounds, pagination
/// ranges. Defaults apply when offset/limit are absent.
pub fn validate_find(params: &FindUsersParams) -> Result<FindUsersQuery, ApiReply> {
    let mut errors = FieldErrors::default();

    let tags = match normalize(&params.tags) {
        Some(raw) => {
            if raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ',' || c == '-')
            {
                raw.split(',')
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect()
            } else {
                errors.push(format!(
                    "\"tags\" with value \"{raw}\" fails to match the required pattern"
                ));
                Vec::new()
            }
        }
        None => Vec::new(),
    };

    let start = parse_timestamp(&mut errors, "startTimeStampTz", &params.start_time_stamp_tz);
    let end = parse_timestamp(&mut errors, "endTimeStampTz", &params.end_time_stamp_tz);
    let range = match (start, end) {
        (Some(start), Some(end)) => Some((start, end)),
        (None, None) => None,
        _ => {
            errors.push(
                "\"startTimeStampTz\" and \"endTimeStampTz\" must be provided together".to_string(),
            );
            None
        }
    };

    let offset = params.offset.unwrap_or(DEFAULT_OFFSET);
    if offset < 0 {
        errors.push("\"offset\" must be greater than or equal to 0".to_string());
    } else if offset > OFFSET_MAX {
        errors.push(format!("\"offset\" must be less than or equal to {OFFSET_MAX}"));
    }

    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if limit < 1 {
        errors.push("\"limit\" must be greater than or equal to 1".to_string());
    } else if limit > LIMIT_MAX {
        errors.push(format!("\"limit\" must be less than or equal to {LIMIT_MAX}"));
    }

    errors.finish(FindUsersQuery {
        tags,
        range,
        offset,
        limit,
    })
}

fn parse_timestamp(
    errors: &mut FieldErrors,
    field: &str,
    value: &Option<String>,
) -> Option<DateTime<Utc>> {
    let raw = normalize(value)?;
    match DateTime::parse_from_rfc3339(&raw) {
        Ok(parsed) => Some(parsed.with_timezone(&Utc)),
        Err(_) => {
            errors.push(format!("\"{field}\" must be in ISO 8601 date format"));
            None
        }
    }
}

/// Validate a create payload; every field is required.
pub fn validate_create(payload: &UserPayload) -> Result<CreateUserData, ApiReply> {
    let mut errors = FieldErrors::default();

    let first_name = require(&mut errors, "firstName", normalize(&payload.first_name));
    let last_name = require(&mut errors, "lastName", normalize(&payload.last_name));
    let phone_country_code = require(&mut errors, "phoneCountryCode", payload.phone_country_code);
    let phone = require(&mut errors, "phone", normalize(&payload.phone));
    let email = require(&mut errors, "email", normalize(&payload.email));
    let password = require(&mut errors, "password", normalize(&payload.password));
    let organization_name = require(
        &mut errors,
        "organizationName",
        normalize(&payload.organization_name),
    );
    let organization_phone_country_code = require(
        &mut errors,
        "organizationPhoneCountryCode",
        payload.organization_phone_country_code,
    );
    let organization_phone = require(
        &mut errors,
        "organizationPhone",
        normalize(&payload.organization_phone),
    );
    let organization_email = require(
        &mut errors,
        "organizationEmail",
        normalize(&payload.organization_email),
    );

    check_name(&mut errors, "firstName", &first_name);
    check_name(&mut errors, "lastName", &last_name);
    check_country_code(&mut errors, "phoneCountryCode", phone_country_code);
    check_phone(&mut errors, "phone", &phone);
    check_email(&mut errors, "email", &email);
    check_name(&mut errors, "organizationName", &organization_name);
    check_country_code(
        &mut errors,
        "organizationPhoneCountryCode",
        organization_phone_country_code,
    );
    check_phone(&mut errors, "organizationPhone", &organization_phone);
    check_email(&mut errors, "organizationEmail", &organization_email);

    if !errors.errors.is_empty() {
        return Err(ApiReply::bad_request(errors.errors));
    }

    // All fields checked present above.
    Ok(CreateUserData {
        first_name: first_name.unwrap_or_default(),
        last_name: last_name.unwrap_or_default(),
        phone_country_code: phone_country_code.unwrap_or_default(),
        phone: phone.unwrap_or_default(),
        email: email.unwrap_or_default(),
        password: password.unwrap_or_default(),
        organization_name: organization_name.unwrap_or_default(),
        organization_phone_country_code: organization_phone_country_code.unwrap_or_default(),
        organization_phone: organization_phone.unwrap_or_default(),
        organization_email: organization_email.unwrap_or_default(),
    })
}

/// Validate a full-replace payload. Fields may be empty or null (the write
/// stores NULL), but supplied values must satisfy their constraints.
pub fn validate_update(user_id: &str, payload: &UserPayload) -> Result<UpdateUserData, ApiReply> {
    let mut errors = FieldErrors::default();

    let user_uuid = match Uuid::parse_str(user_id) {
        Ok(uuid) => Some(uuid),
        Err(_) => {
            errors.push("\"userId\" must be a valid GUID".to_string());
            None
        }
    };

    let data = UpdateUserData {
        user_uuid: user_uuid.unwrap_or_default(),
        first_name: normalize(&payload.first_name),
        last_name: normalize(&payload.last_name),
        phone_country_code: payload.phone_country_code,
        phone: normalize(&payload.phone),
        email: normalize(&payload.email),
        organization_name: normalize(&payload.organization_name),
        organization_phone_country_code: payload.organization_phone_country_code,
        organization_phone: normalize(&payload.organization_phone),
        organization_email: normalize(&payload.organization_email),
    };

    check_name(&mut errors, "firstName", &data.first_name);
    check_name(&mut errors, "lastName", &data.last_name);
    check_country_code(&mut errors, "phoneCountryCode", data.phone_country_code);
    check_phone(&mut errors, "phone", &data.phone);
    check_email(&mut errors, "email", &data.email);
    check_name(&mut errors, "organizationName", &data.organization_name);
    check_country_code(
        &mut errors,
        "organizationPhoneCountryCode",
        data.organization_phone_country_code,
    );
    check_phone(&mut errors, "organizationPhone", &data.organization_phone);
    check_email(&mut errors, "organizationEmail", &data.organization_email);

    errors.finish(data)
}

/// Validate a partial-update payload; only supplied fields are checked.
pub fn validate_patch(user_id: &str, payload: &UserPayload) -> Result<PatchUserData, ApiReply> {
    let mut errors = FieldErrors::default();

    let user_uuid = match Uuid::parse_str(user_id) {
        Ok(uuid) => Some(uuid),
        Err(_) => {
            errors.push("\"userId\" must be a valid GUID".to_string());
            None
        }
    };

    let data = PatchUserData {
        user_uuid: user_uuid.unwrap_or_default(),
        first_name: normalize(&payload.first_name),
        last_name: normalize(&payload.last_name),
        phone_country_code: payload.phone_country_code,
        phone: normalize(&payload.phone),
        email: normalize(&payload.email),
        password: normalize(&payload.password),
        organization_name: normalize(&payload.organization_name),
        organization_phone_country_code: payload.organization_phone_country_code,
        organization_phone: normalize(&payload.organization_phone),
        organization_email: normalize(&payload.organization_email),
    };

    check_name(&mut errors, "firstName", &data.first_name);
    check_name(&mut errors, "lastName", &data.last_name);
    check_country_code(&mut errors, "phoneCountryCode", data.phone_country_code);
    check_phone(&mut errors, "phone", &data.phone);
    check_email(&mut errors, "email", &data.email);
    check_name(&mut errors, "organizationName", &data.organization_name);
    check_country_code(
        &mut errors,
        "organizationPhoneCountryCode",
        data.organization_phone_country_code,
    );
    check_phone(&mut errors, "organizationPhone", &data.organization_phone);
    check_email(&mut errors, "organizationEmail", &data.organization_email);

    errors.finish(data)
}
