pub mod auth;
pub mod client;
pub mod signature;

pub use auth::{generate_auth, GetnetAuth};
pub use client::{
    CreateSessionRequest, CreateSessionResponse, GetnetClient, SessionAmount, SessionBuyer,
    SessionInformation, SessionPayment, SessionStatus,
};
pub use signature::{notification_signature, verify_notification};
