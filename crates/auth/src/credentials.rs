//! Username/password check against the holder directory.
//!
//! Passwords are stored and compared in cleartext; this is a local,
//! single-user bookkeeping tool and offers no authentication security.

use crate::AuthzError;

/// A record that can be logged into.
pub trait LoginAccount {
    fn username(&self) -> &str;
    fn password(&self) -> &str;
}

/// Find the account matching `username` (case-insensitive) and `password`
/// (exact).
pub fn verify_credentials<'a, A, I>(
    accounts: I,
    username: &str,
    password: &str,
) -> Result<&'a A, AuthzError>
where
    A: LoginAccount + 'a,
    I: IntoIterator<Item = &'a A>,
{
    let wanted = username.trim().to_lowercase();
    accounts
        .into_iter()
        .find(|a| a.username().to_lowercase() == wanted && a.password() == password)
        .ok_or(AuthzError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Account {
        username: &'static str,
        password: &'static str,
    }

    impl LoginAccount for Account {
        fn username(&self) -> &str {
            self.username
        }

        fn password(&self) -> &str {
            self.password
        }
    }

    fn accounts() -> Vec<Account> {
        vec![
            Account { username: "admin", password: "123" },
            Account { username: "Juan", password: "secret" },
        ]
    }

    #[test]
    fn username_match_ignores_case() {
        let accounts = accounts();
        let found = verify_credentials(&accounts, "JUAN", "secret").unwrap();
        assert_eq!(found.username, "Juan");
    }

    #[test]
    fn password_match_is_exact() {
        let accounts = accounts();
        assert_eq!(
            verify_credentials(&accounts, "juan", "Secret").err(),
            Some(AuthzError::InvalidCredentials)
        );
    }

    #[test]
    fn unknown_user_is_rejected() {
        let accounts = accounts();
        assert!(verify_credentials(&accounts, "maria", "123").is_err());
    }
}
