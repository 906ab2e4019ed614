use serde::{Deserialize, Serialize};

/// Category assigned to events that don't carry one
pub const DEFAULT_CATEGORY: &str = "sports";

/// Placeholder used when an event has no description
pub const NO_DESCRIPTION: &str = "No description";

/// A catalogued event
///
/// `name` is the only natural key; there is no numeric id. `date` and
/// `location` are free text as scraped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    pub date: String,
    pub location: String,
    pub description: String,
    pub link: String,
    pub category: String,
}

impl Event {
    /// Returns true if `name` matches this event's name ignoring case
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }

    /// Returns a copy of this event with a rewritten description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Inbound event shape for manual inserts
///
/// Every field except `name` is optional and defaulted explicitly when
/// converted into an [`Event`].
#[derive(Debug, Clone, Deserialize, Default)]
pub struct EventDraft {
    pub name: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl TryFrom<EventDraft> for Event {
    type Error = crate::error::AppError;

    fn try_from(draft: EventDraft) -> Result<Self, Self::Error> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(crate::error::AppError::InvalidInput(
                "Event name cannot be empty".to_string(),
            ));
        }

        Ok(Event {
            name: name.to_string(),
            date: draft.date.unwrap_or_else(|| "TBD".to_string()),
            location: draft.location.unwrap_or_else(|| "Unknown".to_string()),
            description: draft
                .description
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            link: draft.link.unwrap_or_default(),
            category: draft
                .category
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        })
    }
}
