//! Authentication forms and flows.
//!
//! Forms are validated locally before anything reaches the identity
//! provider. Provider failures are mapped to a user-facing message that
//! depends on the action being attempted; they raise an error notice and
//! change no state.

use std::fmt;

use crate::backend::{AuthError, AuthUser, IdentityProvider, OAuthProvider};
use crate::notice::NoticeSender;

pub use crate::backend::{MIN_PASSWORD_LENGTH, is_valid_email};

/// A user-initiated authentication action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    /// Email/password sign-in.
    SignIn,
    /// Email/password registration.
    SignUp,
    /// Federated sign-in through a popup.
    Popup,
    /// Password reset email.
    PasswordReset,
    /// Ending the session.
    SignOut,
}

impl AuthAction {
    /// Notice text when the action succeeds.
    #[must_use]
    pub const fn success_message(self) -> &'static str {
        match self {
            Self::SignIn => "Signed in successfully",
            Self::SignUp => "Account created successfully",
            Self::Popup => "Signed in with Google",
            Self::PasswordReset => "Recovery email sent",
            Self::SignOut => "Signed out",
        }
    }

    /// Notice text when the provider rejects the action with `err`.
    #[must_use]
    pub fn error_message(self, err: &AuthError) -> &'static str {
        match (self, err) {
            (
                Self::SignIn,
                AuthError::InvalidCredential | AuthError::UserNotFound | AuthError::WrongPassword,
            ) => "Invalid email or password",
            (Self::SignIn, AuthError::TooManyRequests) => {
                "Too many sign-in attempts. Try again later."
            }
            (Self::SignIn, _) => "Failed to sign in",
            (Self::SignUp, AuthError::EmailAlreadyInUse) => "This email is already in use",
            (Self::SignUp, AuthError::InvalidEmail) => "Invalid email format",
            (Self::SignUp, AuthError::WeakPassword) => "Password is too weak",
            (Self::SignUp, _) => "Failed to register",
            (Self::Popup, _) => "Failed to sign in with Google",
            (Self::PasswordReset, AuthError::UserNotFound) => "No account found with this email",
            (Self::PasswordReset, _) => "Failed to send recovery email",
            (Self::SignOut, _) => "Failed to sign out",
        }
    }
}

/// Local validation failures for auth forms.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    /// The email is not shaped like an address.
    #[error("Enter a valid email address")]
    InvalidEmail,
    /// The password is shorter than the minimum.
    #[error("Password must be at least {min} characters")]
    PasswordTooShort {
        /// Minimum length in characters.
        min: usize,
    },
    /// Password and confirmation differ.
    #[error("Passwords do not match")]
    PasswordMismatch,
}

/// Why an auth flow did not complete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    /// The form was rejected before contacting the provider.
    #[error(transparent)]
    Form(#[from] FormError),
    /// The provider rejected the request.
    #[error(transparent)]
    Provider(#[from] AuthError),
}

fn check_email(email: &str) -> Result<(), FormError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(FormError::InvalidEmail)
    }
}

fn check_password(password: &str) -> Result<(), FormError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(FormError::PasswordTooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    Ok(())
}

/// Sign-in form fields.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    /// Email address.
    pub email: String,
    /// Password.
    pub password: String,
}

impl LoginForm {
    /// Checks the email shape and password length.
    ///
    /// # Errors
    ///
    /// Returns the first [`FormError`] found.
    pub fn validate(&self) -> Result<(), FormError> {
        check_email(&self.email)?;
        check_password(&self.password)
    }
}

/// Registration form fields.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RegisterForm {
    /// Email address.
    pub email: String,
    /// Password.
    pub password: String,
    /// Password typed a second time.
    pub confirm_password: String,
}

impl RegisterForm {
    /// Checks the email, both password lengths and that they match.
    ///
    /// # Errors
    ///
    /// Returns the first [`FormError`] found.
    pub fn validate(&self) -> Result<(), FormError> {
        check_email(&self.email)?;
        check_password(&self.password)?;
        check_password(&self.confirm_password)?;
        if self.password != self.confirm_password {
            return Err(FormError::PasswordMismatch);
        }
        Ok(())
    }
}

// Passwords never reach the logs.
impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for RegisterForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterForm")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("confirm_password", &"<redacted>")
            .finish()
    }
}

/// Password reset form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetForm {
    /// Email address.
    pub email: String,
}

impl ResetForm {
    /// Checks the email shape.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::InvalidEmail`].
    pub fn validate(&self) -> Result<(), FormError> {
        check_email(&self.email)
    }
}

/// Runs auth flows against an identity provider and reports the outcome as
/// notices.
pub struct Authenticator<P: IdentityProvider> {
    provider: P,
    notices: NoticeSender,
}

impl<P: IdentityProvider> Authenticator<P> {
    /// Wraps `provider`, reporting through `notices`.
    #[must_use]
    pub const fn new(provider: P, notices: NoticeSender) -> Self {
        Self { provider, notices }
    }

    /// The wrapped provider.
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    fn report<T>(
        &self,
        action: AuthAction,
        result: Result<T, AuthError>,
    ) -> Result<T, AuthFailure> {
        match result {
            Ok(value) => {
                self.notices.success(action.success_message());
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(?action, code = err.code(), "auth request rejected");
                self.notices.error(action.error_message(&err));
                Err(err.into())
            }
        }
    }

    /// Signs in with a validated login form.
    ///
    /// # Errors
    ///
    /// Returns [`AuthFailure::Form`] for invalid input (nothing is sent) or
    /// [`AuthFailure::Provider`] if the provider rejects the credentials.
    pub async fn sign_in(&self, form: &LoginForm) -> Result<AuthUser, AuthFailure> {
        form.validate()?;
        let result = self.provider.sign_in(form.email.trim(), &form.password).await;
        self.report(AuthAction::SignIn, result)
    }

    /// Registers with a validated registration form.
    ///
    /// # Errors
    ///
    /// Returns [`AuthFailure::Form`] for invalid input or
    /// [`AuthFailure::Provider`] if registration is refused.
    pub async fn sign_up(&self, form: &RegisterForm) -> Result<AuthUser, AuthFailure> {
        form.validate()?;
        let result = self.provider.sign_up(form.email.trim(), &form.password).await;
        self.report(AuthAction::SignUp, result)
    }

    /// Signs in through the Google popup flow.
    ///
    /// # Errors
    ///
    /// Returns [`AuthFailure::Provider`] if the popup fails or is closed.
    pub async fn sign_in_with_google(&self) -> Result<AuthUser, AuthFailure> {
        let result = self.provider.sign_in_with_popup(OAuthProvider::Google).await;
        self.report(AuthAction::Popup, result)
    }

    /// Sends a password reset email.
    ///
    /// # Errors
    ///
    /// Returns [`AuthFailure::Form`] for an invalid email or
    /// [`AuthFailure::Provider`] if the provider refuses.
    pub async fn send_password_reset(&self, form: &ResetForm) -> Result<(), AuthFailure> {
        form.validate()?;
        let result = self.provider.send_password_reset(form.email.trim()).await;
        self.report(AuthAction::PasswordReset, result)
    }

    /// Ends the session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthFailure::Provider`] if sign-out fails.
    pub async fn sign_out(&self) -> Result<(), AuthFailure> {
        let result = self.provider.sign_out().await;
        self.report(AuthAction::SignOut, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::InMemoryIdentityProvider;
    use crate::notice::Notice;

    #[test]
    fn debug_output_hides_passwords() {
        let form = RegisterForm {
            email: "ada@example.com".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
        };
        let shown = format!("{form:?}");
        assert!(shown.contains("ada@example.com"));
        assert!(!shown.contains("secret1"));
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("  ada@example.com "));
        assert!(!is_valid_email("ada"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada@example."));
        assert!(!is_valid_email("a da@example.com"));
    }

    #[test]
    fn sign_in_messages() {
        for err in [
            AuthError::InvalidCredential,
            AuthError::UserNotFound,
            AuthError::WrongPassword,
        ] {
            assert_eq!(
                AuthAction::SignIn.error_message(&err),
                "Invalid email or password"
            );
        }
        assert_eq!(
            AuthAction::SignIn.error_message(&AuthError::TooManyRequests),
            "Too many sign-in attempts. Try again later."
        );
        assert_eq!(
            AuthAction::SignIn.error_message(&AuthError::Network(String::new())),
            "Failed to sign in"
        );
    }

    #[test]
    fn sign_up_and_reset_messages() {
        assert_eq!(
            AuthAction::SignUp.error_message(&AuthError::EmailAlreadyInUse),
            "This email is already in use"
        );
        assert_eq!(
            AuthAction::SignUp.error_message(&AuthError::WeakPassword),
            "Password is too weak"
        );
        assert_eq!(
            AuthAction::PasswordReset.error_message(&AuthError::UserNotFound),
            "No account found with this email"
        );
        assert_eq!(
            AuthAction::Popup.error_message(&AuthError::PopupClosed),
            "Failed to sign in with Google"
        );
    }

    #[test]
    fn register_form_rules() {
        let mut form = RegisterForm {
            email: "ada@example.com".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret2".to_string(),
        };
        assert_eq!(form.validate(), Err(FormError::PasswordMismatch));
        form.confirm_password = "secret1".to_string();
        assert_eq!(form.validate(), Ok(()));
        form.password = "abc".to_string();
        assert_eq!(
            form.validate(),
            Err(FormError::PasswordTooShort { min: 6 })
        );
        form.email = "nope".to_string();
        assert_eq!(form.validate(), Err(FormError::InvalidEmail));
    }

    #[tokio::test]
    async fn invalid_form_never_reaches_provider() {
        let (notices, mut rx) = NoticeSender::channel(8);
        let auth = Authenticator::new(InMemoryIdentityProvider::new(), notices);
        let result = auth
            .sign_in(&LoginForm {
                email: "bad".to_string(),
                password: "secret1".to_string(),
            })
            .await;
        assert_eq!(result, Err(AuthFailure::Form(FormError::InvalidEmail)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn provider_errors_become_notices() {
        let (notices, mut rx) = NoticeSender::channel(8);
        let auth = Authenticator::new(InMemoryIdentityProvider::new(), notices);
        let result = auth
            .sign_in(&LoginForm {
                email: "ghost@example.com".to_string(),
                password: "secret1".to_string(),
            })
            .await;
        assert_eq!(
            result,
            Err(AuthFailure::Provider(AuthError::InvalidCredential))
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            Notice::error("Invalid email or password")
        );
        assert!(auth.provider().current_user().is_none());
    }

    #[tokio::test]
    async fn register_then_reset() {
        let (notices, mut rx) = NoticeSender::channel(8);
        let auth = Authenticator::new(InMemoryIdentityProvider::new(), notices);
        auth.sign_up(&RegisterForm {
            email: "ada@example.com".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
        })
        .await
        .unwrap();
        auth.send_password_reset(&ResetForm {
            email: "ada@example.com".to_string(),
        })
        .await
        .unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            Notice::success("Account created successfully")
        );
        assert_eq!(rx.try_recv().unwrap(), Notice::success("Recovery email sent"));
    }
}
