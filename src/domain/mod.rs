pub mod event;
pub mod payment;
pub mod retry;

pub use event::{EventKind, EventRecord};
pub use payment::{Buyer, Payment, PaymentStatus};
pub use retry::{PaymentSnapshot, RetryCallback, RetryStatus};
