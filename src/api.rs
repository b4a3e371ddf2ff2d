//! Wire-format implementations of [`ChatCompletion`](crate::client::ChatCompletion).

pub mod openai;

pub use openai::OpenAiClient;
