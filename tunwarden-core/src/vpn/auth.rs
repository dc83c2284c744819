//! Interactive credential prompt responder
//!
//! Answers `Enter Auth Username:` / `Enter Auth Password:` prompts by
//! writing the configured credential to the child process's input stream.
//! This component never reads process output; it only reacts to status
//! machine events.

use crate::config::Password;
use crate::vpn::classifier::AuthPrompt;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Answers credential prompts on behalf of one session
#[derive(Debug, Clone, Default)]
pub struct AuthResponder {
    username: Option<String>,
    password: Option<Password>,
}

impl AuthResponder {
    pub fn new(username: Option<String>, password: Option<Password>) -> Self {
        Self { username, password }
    }

    /// Answer `prompt` by writing the credential plus line terminator
    ///
    /// Returns `Ok(true)` when the credential was written, `Ok(false)`
    /// when none is configured (the caller then fails the connection with
    /// `auth_failed` and nothing is written).
    pub async fn respond<W>(&self, prompt: AuthPrompt, stdin: &mut W) -> std::io::Result<bool>
    where
        W: AsyncWrite + Unpin,
    {
        let credential = match prompt {
            AuthPrompt::Username => self.username.clone(),
            AuthPrompt::Password => self.password.as_ref().map(|p| p.expose().to_string()),
        };

        let Some(credential) = credential else {
            return Ok(false);
        };

        stdin.write_all(credential.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_writes_username_with_terminator() {
        let responder = AuthResponder::new(Some("alice".to_string()), None);
        let mut sink = Vec::new();

        let written = responder
            .respond(AuthPrompt::Username, &mut sink)
            .await
            .unwrap();

        assert!(written);
        assert_eq!(sink, b"alice\n");
    }

    #[tokio::test]
    async fn test_missing_password_writes_nothing() {
        let responder = AuthResponder::new(Some("alice".to_string()), None);
        let mut sink = Vec::new();

        let written = responder
            .respond(AuthPrompt::Password, &mut sink)
            .await
            .unwrap();

        assert!(!written);
        assert!(sink.is_empty());
    }
}
