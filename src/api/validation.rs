use super::ApiError;

pub const USERNAME_MIN_LEN: usize = 2;
pub const USERNAME_MAX_LEN: usize = 20;
pub const PASSWORD_MIN_LEN: usize = 6;
pub const MESSAGE_MAX_LEN: usize = 300;
pub const PROMPT_MAX_LEN: usize = 2000;

pub fn validate_username(username: &str) -> Result<&str, ApiError> {
    let trimmed = username.trim();
    let len = trimmed.chars().count();

    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(ApiError::validation(format!(
            "Username must be between {} and {} characters",
            USERNAME_MIN_LEN, USERNAME_MAX_LEN
        )));
    }

    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ApiError::validation(
            "Username must not contain special characters",
        ));
    }

    Ok(trimmed)
}

/// Returns the trimmed, lower-cased address.
pub fn validate_email(email: &str) -> Result<String, ApiError> {
    let trimmed = email.trim();
    let invalid = || ApiError::validation("Invalid email address");

    let (local, domain) = trimmed.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || trimmed.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let mut labels = domain.split('.');
    let dotted = domain.contains('.') && labels.all(|label| !label.is_empty());
    if !dotted {
        return Err(invalid());
    }

    Ok(trimmed.to_lowercase())
}

pub fn validate_password(password: &str) -> Result<&str, ApiError> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {} characters",
            PASSWORD_MIN_LEN
        )));
    }
    Ok(password)
}

pub fn validate_code(code: &str) -> Result<&str, ApiError> {
    let trimmed = code.trim();
    if trimmed.len() != crate::domain::verification::CODE_LENGTH
        || !trimmed.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(ApiError::validation(
            "Verification code must be 6 digits",
        ));
    }
    Ok(trimmed)
}

pub fn validate_message_content(content: &str) -> Result<&str, ApiError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Message content cannot be empty"));
    }
    if trimmed.chars().count() > MESSAGE_MAX_LEN {
        return Err(ApiError::validation(format!(
            "Message content must be no longer than {} characters",
            MESSAGE_MAX_LEN
        )));
    }
    Ok(trimmed)
}

pub fn validate_prompt(prompt: Option<&str>) -> Result<Option<&str>, ApiError> {
    match prompt {
        Some(p) if p.chars().count() > PROMPT_MAX_LEN => Err(ApiError::validation(format!(
            "Prompt must be no longer than {} characters",
            PROMPT_MAX_LEN
        ))),
        other => Ok(other),
    }
}

pub fn validate_required<'a>(value: &'a str, field: &str) -> Result<&'a str, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert_eq!(validate_username("alice").unwrap(), "alice");
        assert_eq!(validate_username("  bob_99 ").unwrap(), "bob_99");
        assert!(validate_username("ab").is_ok());
        assert!(validate_username(&"a".repeat(20)).is_ok());
        assert!(validate_username("a").is_err());
        assert!(validate_username(&"a".repeat(21)).is_err());
        assert!(validate_username("bad name").is_err());
        assert!(validate_username("bad-name").is_err());
        assert!(validate_username("jürgen").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email(" Alice@Example.COM ").unwrap(), "alice@example.com");
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("a@localhost").is_err());
        assert!(validate_email("a@b@c.com").is_err());
        assert!(validate_email("a@example.").is_err());
        assert!(validate_email("a b@example.com").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password("").is_err());
    }

    #[test]
    fn test_validate_code() {
        assert_eq!(validate_code("123456").unwrap(), "123456");
        assert_eq!(validate_code(" 000001 ").unwrap(), "000001");
        assert!(validate_code("12345").is_err());
        assert!(validate_code("1234567").is_err());
        assert!(validate_code("12a456").is_err());
        assert!(validate_code("١٢٣٤٥٦").is_err());
    }

    #[test]
    fn test_validate_message_content() {
        assert_eq!(validate_message_content("  hi  ").unwrap(), "hi");
        assert!(validate_message_content(&"x".repeat(300)).is_ok());
        assert!(validate_message_content(&"x".repeat(301)).is_err());
        assert!(validate_message_content("   ").is_err());
    }

    #[test]
    fn test_validate_prompt() {
        assert_eq!(validate_prompt(None).unwrap(), None);
        assert_eq!(validate_prompt(Some("hi")).unwrap(), Some("hi"));
        assert!(validate_prompt(Some(&"x".repeat(2001))).is_err());
    }

    #[test]
    fn test_validate_required() {
        assert_eq!(validate_required(" alice ", "Identifier").unwrap(), "alice");
        assert!(validate_required("  ", "Identifier").is_err());
    }
}
