use axum::{
    Router,
    routing::{get, post, put},
};

use crate::handlers::auth::{
    health_handler, login_handler, reset_all_passwords_handler, update_password_handler,
};
use crate::service::AuthenticationService;

#[derive(Clone)]
pub struct AuthState {
    pub service: AuthenticationService,
    /// Whether `ClientInfo` may read the client IP from proxy headers.
    pub trust_proxy_headers: bool,
}

impl AuthState {
    pub fn new(service: AuthenticationService) -> Self {
        Self {
            service,
            trust_proxy_headers: false,
        }
    }

    pub fn with_trusted_proxy(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }
}

pub fn auth_router(state: AuthState) -> Router {
    Router::new()
        .route("/login", post(login_handler))
        .route("/login/update-password", put(update_password_handler))
        .route("/login/reset-all-passwords", put(reset_all_passwords_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}
