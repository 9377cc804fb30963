use bcrypt::{hash, verify, DEFAULT_COST};
use tutorlink_common::AppError;

pub struct PasswordService;

impl PasswordService {
    pub fn hash_password(password: &str) -> Result<String, AppError> {
        hash(password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    }

    pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
        verify(password, hash)
            .map_err(|e| AppError::Authentication(format!("Failed to verify password: {}", e)))
    }

    pub fn validate_password_strength(password: &str) -> Result<(), AppError> {
        if password.len() < 8 {
            return Err(AppError::Validation(
                "Password must be at least 8 characters long".to_string(),
            ));
        }

        let has_letter = password.chars().any(|c| c.is_alphabetic());
        let has_digit = password.chars().any(|c| c.is_numeric());

        if !has_letter || !has_digit {
            return Err(AppError::Validation(
                "Password must contain at least one letter and one digit".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hashed = PasswordService::hash_password("s3cret-pass").unwrap();
        assert!(PasswordService::verify_password("s3cret-pass", &hashed).unwrap());
        assert!(!PasswordService::verify_password("wrong-pass1", &hashed).unwrap());
    }

    #[test]
    fn strength_rules() {
        assert!(PasswordService::validate_password_strength("short1").is_err());
        assert!(PasswordService::validate_password_strength("alllettersonly").is_err());
        assert!(PasswordService::validate_password_strength("12345678901").is_err());
        assert!(PasswordService::validate_password_strength("goodpass42").is_ok());
    }
}
