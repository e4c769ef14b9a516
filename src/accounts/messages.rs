//! Outgoing email texts and the links embedded in them.

const TOKEN_PLACEHOLDER: &str = "{token}";

/// Substitutes `token` into a URL template. Templates without a
/// `{token}` placeholder get the token appended as the last path segment.
pub fn build_link(template: &str, token: &str) -> String {
    if template.contains(TOKEN_PLACEHOLDER) {
        template.replace(TOKEN_PLACEHOLDER, token)
    } else {
        format!("{}/{}", template.trim_end_matches('/'), token)
    }
}

pub struct Email {
    pub subject: &'static str,
    pub body: String,
}

pub fn confirmation(first_name: &str, link: &str) -> Email {
    Email {
        subject: "Confirm your email address",
        body: format!(
            "Hello {first_name},\n\n\
             Thanks for creating an account. Please confirm your email address \
             by opening the link below:\n\n\
             {link}\n\n\
             If you did not sign up, you can ignore this message.\n"
        ),
    }
}

pub fn password_reset(link: &str) -> Email {
    Email {
        subject: "Password reset",
        body: format!(
            "Hello,\n\n\
             A password reset was requested for your account. Open the link \
             below to receive a new password:\n\n\
             {link}\n\n\
             If you did not request this, your current password stays valid.\n"
        ),
    }
}

pub fn new_password(password: &str) -> Email {
    Email {
        subject: "Your new password",
        body: format!(
            "Hello,\n\n\
             Your password has been reset. Your new password is: {password}\n\n\
             Please change it from your account settings after signing in.\n"
        ),
    }
}
