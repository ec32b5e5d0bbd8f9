mod settings;

pub use settings::{CacheConfig, LlmConfig, LoggingConfig, RetentionConfig, Settings};
