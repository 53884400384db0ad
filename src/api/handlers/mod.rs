pub mod health;
pub use self::health::health;

pub mod signin;
pub use self::signin::signin;

pub mod signup;
pub use self::signup::signup;

pub mod session;
pub use self::session::{logout, session};

pub mod types;

// Common request-validation helpers. These run before the auth core is
// invoked; the core assumes non-empty, well-formed input.
use regex::Regex;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Password policy: at least 8 characters with upper- and lowercase letters
/// and a digit.
pub fn valid_password(password: &str) -> bool {
    password.chars().count() >= 8
        && password.chars().any(char::is_uppercase)
        && password.chars().any(char::is_lowercase)
        && password.chars().any(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::{normalize_email, valid_email, valid_password};

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Bob@Example.COM "), "bob@example.com");
    }

    #[test]
    fn valid_email_checks_basic_shape() {
        assert!(valid_email("bob@example.com"));
        assert!(valid_email("name.surname@example.co"));
        assert!(!valid_email("bob"));
        assert!(!valid_email("bob@example"));
        assert!(!valid_email("bob example@example.com"));
        assert!(!valid_email(""));
    }

    #[test]
    fn valid_password_enforces_the_policy() {
        assert!(valid_password("Password123"));
        assert!(valid_password("Sup3rSecret!"));
        assert!(!valid_password("short1A"));
        assert!(!valid_password("alllowercase1"));
        assert!(!valid_password("ALLUPPERCASE1"));
        assert!(!valid_password("NoDigitsHere"));
        assert!(!valid_password(""));
    }
}
