pub mod auth;
pub mod chat;
pub mod enrichment;
pub mod http;
pub mod recommender;
pub mod scheduler;
pub mod scraper;
pub mod stop_words;

pub use chat::{ChatModel, ChatService, OpenAiChatModel};
pub use enrichment::{ChatModelEnricher, DescriptionEnricher, EnrichmentService, GeminiEnricher};
pub use recommender::{Recommender, DEFAULT_TOP_N};
pub use scraper::{EventSource, HtmlEventScraper};
