use crate::errors::{CoreError, CoreResult};

/// Input checks shared by the services. Each returns the trimmed value or a
/// field-level validation error.
pub struct ValidationService;

impl ValidationService {
    pub fn validate_email(field: &str, email: &str) -> CoreResult<String> {
        let email = email.trim().to_lowercase();

        if email.is_empty() {
            return Err(CoreError::field(field, "Email cannot be empty"));
        }
        if email.len() > 254 {
            return Err(CoreError::field(field, "Email is too long"));
        }

        let (local, domain) = email
            .split_once('@')
            .ok_or_else(|| CoreError::field(field, "Invalid email format: missing @"))?;

        if local.is_empty() || domain.contains('@') {
            return Err(CoreError::field(field, "Invalid email format"));
        }
        if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
            return Err(CoreError::field(field, "Invalid email domain"));
        }

        Ok(email)
    }

    pub fn validate_username(username: &str) -> CoreResult<String> {
        let username = username.trim();

        if username.len() < 3 {
            return Err(CoreError::field(
                "username",
                "Username must be at least 3 characters long",
            ));
        }
        if username.len() > 50 {
            return Err(CoreError::field(
                "username",
                "Username is too long (max 50 characters)",
            ));
        }
        if !username
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            return Err(CoreError::field(
                "username",
                "Username can only contain letters, numbers, underscores, and hyphens",
            ));
        }

        Ok(username.to_string())
    }

    pub fn validate_password(password: &str) -> CoreResult<()> {
        if password.len() < 8 {
            return Err(CoreError::field(
                "password",
                "Password must be at least 8 characters long",
            ));
        }
        if password.len() > 72 {
            return Err(CoreError::field(
                "password",
                "Password is too long (max 72 bytes)",
            ));
        }
        Ok(())
    }

    /// Non-empty text after trimming, at most `max` characters
    pub fn required_text(field: &str, value: &str, max: usize) -> CoreResult<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(CoreError::field(field, "This field may not be blank"));
        }
        if trimmed.chars().count() > max {
            return Err(CoreError::field(
                field,
                format!("Ensure this field has no more than {} characters", max),
            ));
        }
        Ok(trimmed.to_string())
    }

    /// Optional text; blank input is stored as `None`
    pub fn optional_text(field: &str, value: Option<String>, max: usize) -> CoreResult<Option<String>> {
        match value {
            None => Ok(None),
            Some(value) if value.trim().is_empty() => Ok(None),
            Some(value) => Self::required_text(field, &value, max).map(Some),
        }
    }

    pub fn non_negative_cents(field: &str, cents: i64) -> CoreResult<i64> {
        if cents < 0 {
            return Err(CoreError::field(field, "Amount cannot be negative"));
        }
        Ok(cents)
    }

    /// `#rgb` or `#rrggbb`
    pub fn validate_color(color: &str) -> CoreResult<String> {
        let color = color.trim();
        let hex = color
            .strip_prefix('#')
            .ok_or_else(|| CoreError::field("color", "Color must start with #"))?;

        if !(hex.len() == 3 || hex.len() == 6) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CoreError::field("color", "Color must be #rgb or #rrggbb"));
        }
        Ok(color.to_lowercase())
    }

    pub fn validate_url(field: &str, url: &str) -> CoreResult<String> {
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CoreError::field(field, "Enter a valid http(s) URL"));
        }
        if url.len() > 500 {
            return Err(CoreError::field(field, "URL is too long (max 500 characters)"));
        }
        Ok(url.to_string())
    }

    pub fn parse_choice<T>(field: &str, value: &str) -> CoreResult<T>
    where
        T: std::str::FromStr<Err = String>,
    {
        value.parse().map_err(|msg: String| CoreError::field(field, msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TodoStatus;

    #[test]
    fn email_is_normalised() {
        assert_eq!(
            ValidationService::validate_email("email", "  Ann@Example.COM ").unwrap(),
            "ann@example.com"
        );
        assert!(ValidationService::validate_email("email", "ann@example").is_err());
        assert!(ValidationService::validate_email("email", "@example.com").is_err());
        assert!(ValidationService::validate_email("email", "a@b@c.com").is_err());
    }

    #[test]
    fn usernames() {
        assert!(ValidationService::validate_username("ab").is_err());
        assert!(ValidationService::validate_username("ann smith").is_err());
        assert_eq!(
            ValidationService::validate_username("ann_smith-2").unwrap(),
            "ann_smith-2"
        );
    }

    #[test]
    fn blank_optional_text_is_none() {
        assert_eq!(
            ValidationService::optional_text("notes", Some("   ".into()), 10).unwrap(),
            None
        );
        assert!(ValidationService::optional_text("notes", Some("x".repeat(11)), 10).is_err());
    }

    #[test]
    fn colors() {
        assert_eq!(ValidationService::validate_color("#ABCDEF").unwrap(), "#abcdef");
        assert!(ValidationService::validate_color("abcdef").is_err());
        assert!(ValidationService::validate_color("#abcd").is_err());
    }

    #[test]
    fn choice_errors_carry_the_field() {
        let err = ValidationService::parse_choice::<TodoStatus>("status", "done").unwrap_err();
        assert!(err.fields().unwrap().contains_key("status"));
    }
}
