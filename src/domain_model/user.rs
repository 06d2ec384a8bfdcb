use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(UserId)
    }
}

/// Identity returned by the verification and login endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(alias = "ID")]
    pub id: UserId,
    #[serde(alias = "Username")]
    pub username: String,
    #[serde(default, alias = "Email", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

const PASSWORD_SPECIALS: &str = "!@#$%^&*";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PasswordPolicyError {
    #[error("password must be at least 8 characters long")]
    TooShort,
    #[error("password must contain at least one uppercase letter")]
    MissingUppercase,
    #[error("password must contain at least one lowercase letter")]
    MissingLowercase,
    #[error("password must contain at least one digit")]
    MissingDigit,
    #[error("password must contain at least one special character (!@#$%^&*)")]
    MissingSpecial,
}

/// Checks are applied in order and the first violation is reported.
pub fn validate_password(password: &str) -> Result<(), PasswordPolicyError> {
    if password.chars().count() < 8 {
        return Err(PasswordPolicyError::TooShort);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(PasswordPolicyError::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(PasswordPolicyError::MissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordPolicyError::MissingDigit);
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        return Err(PasswordPolicyError::MissingSpecial);
    }
    Ok(())
}
