//! Input validation utilities.
//!
//! Validators collect every failing field into a [`FieldErrors`] map instead of stopping at the
//! first problem, so a caller can report all of them at once.

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MIN_FULL_NAME_LEN, MIN_PASSWORD_LEN};
use crate::error::{CoreResult, FieldErrors};
use crate::models::money::to_cents;
use crate::models::Role;
use crate::CoreError;
use chrono::{DateTime, Utc};
use kayan_types::{EmailAddress, NonEmptyText};
use rust_decimal::Decimal;

/// Signup input after validation.
#[derive(Debug, Clone)]
pub struct ValidSignup {
    pub full_name: NonEmptyText,
    pub email: EmailAddress,
    pub password: String,
    pub role: Role,
}

/// Validates signup fields.
///
/// # Errors
///
/// Returns `CoreError::Validation` listing every invalid field.
pub fn validate_signup(
    full_name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> CoreResult<ValidSignup> {
    let mut errors = FieldErrors::new();

    let full_name = match NonEmptyText::new(full_name) {
        Ok(name) if name.char_len() >= MIN_FULL_NAME_LEN => Some(name),
        Ok(_) => {
            errors.add(
                "full_name",
                format!("Full name must be at least {MIN_FULL_NAME_LEN} characters"),
            );
            None
        }
        Err(_) => {
            errors.add("full_name", "Full name is required");
            None
        }
    };

    let email = if email.trim().is_empty() {
        errors.add("email", "Email is required");
        None
    } else {
        match EmailAddress::parse(email) {
            Ok(email) => Some(email),
            Err(_) => {
                errors.add("email", "Invalid email format");
                None
            }
        }
    };

    if password.is_empty() {
        errors.add("password", "Password is required");
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        );
    }

    let role = if role.trim().is_empty() {
        errors.add("role", "Role is required");
        None
    } else {
        match role.parse::<Role>() {
            Ok(role) => Some(role),
            Err(()) => {
                errors.add("role", "Invalid role");
                None
            }
        }
    };

    match (full_name, email, role) {
        (Some(full_name), Some(email), Some(role)) if errors.is_empty() => Ok(ValidSignup {
            full_name,
            email,
            password: password.to_owned(),
            role,
        }),
        _ => Err(CoreError::Validation(errors)),
    }
}

/// Validates login fields. Only presence and email shape are checked here.
pub fn validate_login(email: &str, password: &str) -> CoreResult<()> {
    let mut errors = FieldErrors::new();
    if email.trim().is_empty() {
        errors.add("email", "Email is required");
    } else if EmailAddress::parse(email).is_err() {
        errors.add("email", "Invalid email format");
    }
    if password.is_empty() {
        errors.add("password", "Password is required");
    }
    errors.into_result()
}

/// Rejects appointment times that are not strictly in the future.
pub fn validate_scheduled_time(
    scheduled_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    if scheduled_time <= now {
        return Err(FieldErrors::single(
            "scheduled_time",
            "Scheduled time must be in the future",
        ));
    }
    Ok(())
}

/// Converts a treatment cost into cents. Zero, negative and unrepresentable costs are rejected.
pub fn validate_cost(cost: Decimal) -> CoreResult<i64> {
    match to_cents(cost) {
        Some(cents) if cents > 0 => Ok(cents),
        _ => Err(CoreError::InvalidCost),
    }
}

/// Resolves optional page and limit values, applying defaults.
///
/// `page` must be at least 1 and `limit` must lie in `1..=MAX_PAGE_SIZE`.
pub fn validate_pagination(page: Option<u32>, limit: Option<u32>) -> CoreResult<(u32, u32)> {
    let mut errors = FieldErrors::new();
    let page = page.unwrap_or(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);

    if page < 1 {
        errors.add("page", "Page must be at least 1");
    }
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        errors.add(
            "limit",
            format!("Limit must be between 1 and {MAX_PAGE_SIZE}"),
        );
    }

    errors.into_result().map(|()| (page, limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::str::FromStr;

    #[test]
    fn test_signup_accepts_valid_input() {
        let signup = validate_signup("  Ada Lovelace ", "Ada@Example.com", "secret1", "doctor")
            .expect("valid signup");
        assert_eq!(signup.full_name.as_str(), "Ada Lovelace");
        assert_eq!(signup.email.as_str(), "ada@example.com");
        assert_eq!(signup.role, Role::Doctor);
    }

    #[test]
    fn test_signup_reports_every_invalid_field() {
        let err = validate_signup("A", "not-an-email", "123", "admin").unwrap_err();
        let CoreError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.get("full_name").is_some());
        assert_eq!(errors.get("email").unwrap(), ["Invalid email format"]);
        assert!(errors.get("password").is_some());
        assert!(errors.get("role").is_some());
    }

    #[test]
    fn test_signup_requires_fields() {
        let CoreError::Validation(errors) = validate_signup("", "", "", "").unwrap_err() else {
            panic!("expected validation error");
        };
        assert_eq!(errors.get("full_name").unwrap(), ["Full name is required"]);
        assert_eq!(errors.get("email").unwrap(), ["Email is required"]);
        assert_eq!(errors.get("password").unwrap(), ["Password is required"]);
        assert_eq!(errors.get("role").unwrap(), ["Role is required"]);
    }

    #[test]
    fn test_login_checks_presence() {
        assert!(validate_login("a@b.co", "x").is_ok());
        assert!(validate_login("", "x").is_err());
        assert!(validate_login("a@b.co", "").is_err());
    }

    #[test]
    fn test_scheduled_time_must_be_future() {
        let now = Utc::now();
        assert!(validate_scheduled_time(now + Duration::hours(1), now).is_ok());
        assert!(validate_scheduled_time(now, now).is_err());
        assert!(validate_scheduled_time(now - Duration::hours(1), now).is_err());
    }

    #[test]
    fn test_cost_must_be_positive() {
        assert_eq!(validate_cost(Decimal::from(150)).unwrap(), 15000);
        assert_eq!(
            validate_cost(Decimal::from_str("0.01").unwrap()).unwrap(),
            1
        );
        for bad in ["0", "-5", "0.001"] {
            assert!(matches!(
                validate_cost(Decimal::from_str(bad).unwrap()),
                Err(CoreError::InvalidCost)
            ));
        }
    }

    #[test]
    fn test_pagination_defaults_and_bounds() {
        assert_eq!(validate_pagination(None, None).unwrap(), (1, DEFAULT_PAGE_SIZE));
        assert_eq!(validate_pagination(Some(3), Some(50)).unwrap(), (3, 50));
        assert!(validate_pagination(Some(0), None).is_err());
        assert!(validate_pagination(None, Some(0)).is_err());
        assert!(validate_pagination(None, Some(MAX_PAGE_SIZE + 1)).is_err());
    }
}
