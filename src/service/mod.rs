pub mod audit;
pub mod authentication;
pub mod credential_verifier;

pub use audit::AuditRecorder;
pub use authentication::AuthenticationService;
pub use credential_verifier::CredentialVerifier;
