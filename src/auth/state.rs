//! Auth configuration and shared per-process state.

use crate::auth::kdf::{Argon2Kdf, KdfError, KdfParams};
use crate::auth::session::SessionSigner;

const DEFAULT_FRONTEND_BASE_URL: &str = "http://localhost:3000";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    kdf_params: KdfParams,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            kdf_params: KdfParams::default(),
        }
    }

    #[must_use]
    pub fn with_kdf_params(mut self, params: KdfParams) -> Self {
        self.kdf_params = params;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn kdf_params(&self) -> KdfParams {
        self.kdf_params
    }

    /// Only mark cookies secure when the frontend is served over HTTPS.
    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FRONTEND_BASE_URL.to_string())
    }
}

/// Shared state handed to the request handlers: config, the production KDF,
/// and the session signer.
pub struct AuthState {
    config: AuthConfig,
    kdf: Argon2Kdf,
    signer: SessionSigner,
}

impl AuthState {
    /// Build the state, validating the configured KDF cost parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if argon2 rejects the cost parameters.
    pub fn new(config: AuthConfig, signing_key: Vec<u8>) -> Result<Self, KdfError> {
        let kdf = Argon2Kdf::new(config.kdf_params())?;
        Ok(Self {
            config,
            kdf,
            signer: SessionSigner::new(signing_key),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn kdf(&self) -> &Argon2Kdf {
        &self.kdf
    }

    #[must_use]
    pub fn signer(&self) -> &SessionSigner {
        &self.signer
    }
}
