use crate::utils::error::{AppError, AppResult};

pub const MAX_MESSAGE_LENGTH: usize = 4000;

pub fn validate_message_content(content: &str) -> AppResult<()> {
    if content.trim().is_empty() {
        return Err(AppError::Validation(
            "Message content cannot be empty".to_string(),
        ));
    }

    if content.len() > MAX_MESSAGE_LENGTH {
        return Err(AppError::Validation(
            "Message content must be at most 4000 characters long".to_string(),
        ));
    }

    Ok(())
}

pub fn validate_user_id(user_id: &str) -> AppResult<()> {
    if user_id.is_empty() {
        return Err(AppError::Validation("User id cannot be empty".to_string()));
    }

    if user_id.len() > 64 {
        return Err(AppError::Validation(
            "User id must be at most 64 characters long".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_content_rejected() {
        assert!(validate_message_content("").is_err());
        assert!(validate_message_content("   \n\t").is_err());
    }

    #[test]
    fn test_long_content_rejected() {
        let content = "a".repeat(MAX_MESSAGE_LENGTH + 1);
        assert!(validate_message_content(&content).is_err());
    }

    #[test]
    fn test_normal_content_accepted() {
        assert!(validate_message_content("Is this still available?").is_ok());
    }
}
