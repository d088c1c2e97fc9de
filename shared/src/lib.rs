pub mod telemetry;
pub mod time;
pub mod types;
pub mod vocabulary;
