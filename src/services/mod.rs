pub mod codes;
pub mod dispatcher;
pub mod fetcher;
pub mod payment_pipeline;
pub mod worker;
