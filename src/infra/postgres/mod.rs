pub mod code_repo;
pub mod email_repo;
pub mod notification_repo;
pub mod payment_repo;
pub mod user_repo;

pub use code_repo::PgCodeStore;
pub use email_repo::PgEmailQueue;
pub use notification_repo::PgNotificationStore;
pub use payment_repo::PgPaymentStore;
pub use user_repo::PgUserDirectory;
