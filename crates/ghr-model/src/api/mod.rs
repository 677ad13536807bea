mod registration;
pub use registration::{ApiMessage, RegistrationToken, RunnerList, RunnerRecord};
