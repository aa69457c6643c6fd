pub mod cron;
pub mod notifications;
pub mod payments;
pub mod root;
