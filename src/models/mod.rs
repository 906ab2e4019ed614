mod chat;
mod event;
mod user;

pub use chat::{ChatMessage, Role};
pub use event::{Event, EventDraft, DEFAULT_CATEGORY, NO_DESCRIPTION};
pub use user::{UserInfo, UserProfile, UserRecord};
