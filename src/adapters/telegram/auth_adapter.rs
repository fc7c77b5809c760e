//! Implements AuthPort using grammers Client.
//!
//! Holds the same `Arc<Mutex<Client>>` handed to `GrammersTgGateway` so both
//! adapters share one underlying session. Stores login/password tokens
//! between calls for the `tg-history-login` flow — this adapter is never
//! exercised by the MCP server itself (spec.md §1: authentication is an
//! external, out-of-band setup step, not part of the read-only tool surface).

use std::sync::Arc;

use async_trait::async_trait;
use grammers_client::client::{LoginToken, PasswordToken};
use grammers_client::Client;
use tokio::sync::Mutex;

use crate::domain::{CoreError, SignInResult};
use crate::ports::AuthPort;

/// Auth adapter. Wraps grammers Client for login/2FA.
pub struct GrammersAuthAdapter {
    client: Arc<Mutex<Client>>,
    /// Token from request_login_code; consumed by sign_in.
    login_token: Mutex<Option<LoginToken>>,
    /// Token from sign_in(PasswordRequired); consumed by check_password.
    password_token: Mutex<Option<PasswordToken>>,
}

impl GrammersAuthAdapter {
    pub fn new(client: Arc<Mutex<Client>>) -> Self {
        Self {
            client,
            login_token: Mutex::new(None),
            password_token: Mutex::new(None),
        }
    }
}

#[async_trait]
impl AuthPort for GrammersAuthAdapter {
    async fn is_authenticated(&self) -> Result<bool, CoreError> {
        self.client
            .lock()
            .await
            .is_authorized()
            .await
            .map_err(|e| CoreError::Internal(format!("checking authorization: {e}")))
    }

    async fn request_login_code(&self, phone: &str, api_hash: &str) -> Result<(), CoreError> {
        let token = self
            .client
            .lock()
            .await
            .request_login_code(phone, api_hash)
            .await
            .map_err(|e| CoreError::Internal(format!("request_login_code: {e}")))?;
        *self.login_token.lock().await = Some(token);
        *self.password_token.lock().await = None;
        Ok(())
    }

    async fn sign_in(&self, code: &str) -> Result<SignInResult, CoreError> {
        let token = self.login_token.lock().await.take().ok_or_else(|| {
            CoreError::Internal("request_login_code must be called before sign_in".into())
        })?;
        match self.client.lock().await.sign_in(&token, code).await {
            Ok(_user) => Ok(SignInResult::Success),
            Err(grammers_client::SignInError::PasswordRequired(pt)) => {
                let hint = pt.hint().map(String::from);
                *self.password_token.lock().await = Some(pt);
                Ok(SignInResult::PasswordRequired { hint })
            }
            Err(grammers_client::SignInError::InvalidCode) => {
                Err(CoreError::Validation("invalid login code".into()))
            }
            Err(grammers_client::SignInError::SignUpRequired) => Err(CoreError::Validation(
                "sign-up required; create an account with the official Telegram app first".into(),
            )),
            Err(e) => Err(CoreError::Internal(format!("sign in: {e}"))),
        }
    }

    async fn check_password(&self, password: &[u8]) -> Result<(), CoreError> {
        let pt = self.password_token.lock().await.take().ok_or_else(|| {
            CoreError::Internal("sign_in must return PasswordRequired before check_password".into())
        })?;
        self.client
            .lock()
            .await
            .check_password(pt, password)
            .await
            .map_err(|e| CoreError::Internal(format!("check_password: {e}")))?;
        Ok(())
    }
}
