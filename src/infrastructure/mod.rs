//! Infrastructure module for external services.
//!
//! Task repositories, configuration, credential verification and the
//! generative-text provider client.

pub mod ai_client;
pub mod config;
pub mod credentials;
pub mod factory;
pub mod in_memory;
pub mod postgres;
pub mod repository;

pub use ai_client::{
    AiAssistant, AiOutcome, ChatInput, ChatMessage, ChatReply, GeminiGenerator, ProviderError,
    ResponseFormat, StubTextGenerator, TaskSuggestion, TextGenerator, UnavailableGenerator,
    fallback_suggestion, generator_from_config,
};
pub use config::{AiConfig, AppConfig, ConfigError, ServerConfig};
pub use credentials::{CredentialVerifier, StaticTokenVerifier};
pub use factory::{
    FactoryError, Repositories, RepositoryConfig, RepositoryConfigBuilder, RepositoryFactory,
    StorageMode,
};
pub use in_memory::InMemoryTaskRepository;
pub use postgres::PostgresTaskRepository;
pub use repository::{RepositoryError, TaskRepository};
