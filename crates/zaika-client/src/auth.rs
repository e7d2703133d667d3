//! Authentication flows.
//!
//! Login and registration are the seam between the two cart worlds: on
//! success the guest cart is pushed to the server and the socket is
//! restarted so the new token rides on the upgrade request. Logout always
//! succeeds locally, even when the server call fails.

use chrono::Utc;
use tracing::{info, warn};

use zaika_net::NetError;
use zaika_shared::UserProfile;
use zaika_store::AuthSession;

use crate::app::App;
use crate::error::Result;

impl App {
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile> {
        let response = self.api.login(email, password).await?;
        self.adopt_session(response.token, response.user.clone())
            .await?;
        Ok(response.user)
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        phone: &str,
        password: &str,
    ) -> Result<UserProfile> {
        let response = self.api.register(name, email, phone, password).await?;
        self.adopt_session(response.token, response.user.clone())
            .await?;
        Ok(response.user)
    }

    /// Sign out. The server call is best-effort; local teardown happens
    /// regardless so a dead backend can't pin a session on the device.
    pub async fn logout(&self) -> Result<()> {
        if let Err(e) = self.api.logout().await {
            warn!(error = %e, "server logout failed, clearing local session anyway");
        }
        self.drop_session()
    }

    /// Validate a restored token against the backend. A rejected token
    /// clears the local session; transport failures leave it alone.
    pub async fn check_auth(&self) -> Result<Option<UserProfile>> {
        let Some(session) = self.lock_state().auth.clone() else {
            return Ok(None);
        };

        match self.api.me().await {
            Ok(user) => {
                // Refresh the stored profile; the token stays as-is.
                let refreshed = AuthSession {
                    token: session.token,
                    user: user.clone(),
                    saved_at: Utc::now(),
                };
                self.lock_db().save_auth_session(&refreshed)?;
                self.lock_state().auth = Some(refreshed);
                Ok(Some(user))
            }
            Err(NetError::Api { status, .. }) if status == 401 => {
                info!("stored token rejected, dropping session");
                self.drop_session()?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn adopt_session(&self, token: String, user: UserProfile) -> Result<()> {
        info!(user = %user.name, "signed in");
        self.api.set_token(&token);

        let session = AuthSession {
            token,
            user: user.clone(),
            saved_at: Utc::now(),
        };
        self.lock_db().save_auth_session(&session)?;
        self.lock_state().auth = Some(session);

        // Anything collected while browsing as a guest follows the user.
        self.guest_cart.migrate_to(&self.server_cart).await?;

        self.join_user_room(user.id);
        if self.is_connected() {
            self.reconnect();
        }
        Ok(())
    }

    fn drop_session(&self) -> Result<()> {
        let previous = self.lock_state().auth.take();
        self.api.clear_token();
        self.lock_db().clear_auth_session()?;
        self.server_cart.invalidate();

        if let Some(session) = previous {
            self.leave_user_room(&session.user.id);
        }
        if self.is_connected() {
            self.reconnect();
        }
        Ok(())
    }
}
