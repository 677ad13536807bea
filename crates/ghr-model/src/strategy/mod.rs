mod retry;
pub use retry::RetryPolicy;
