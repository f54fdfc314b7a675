//! Static classification of event types into named categories.
//!
//! Global mode routes each event into the queue named after its category.
//! Exactly one category is the catch-all: it lists no events and receives
//! everything the other categories do not claim.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::RouterError;
use crate::event::{self, EventType};

/// Name of the catch-all category in the standard table.
pub const CATCH_ALL: &str = "others";

/// A named, ordered group of event types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub name: String,
    pub events: Vec<EventType>,
}

impl Category {
    pub fn new<I, S>(name: impl Into<String>, events: I) -> Result<Self, RouterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            name: name.into(),
            events: event::parse_events(events)?,
        })
    }

    /// Build from constants that are already in normalized form.
    fn from_known(name: &str, events: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            events: events.iter().map(|e| EventType::from_normalized(e)).collect(),
        }
    }
}

/// Immutable event → category lookup built once at startup.
#[derive(Debug, Clone)]
pub struct EventCategoryTable {
    categories: Vec<Category>,
    catch_all: String,
    owner: HashMap<EventType, usize>,
}

impl EventCategoryTable {
    /// Build a table, rejecting events listed in more than one category and
    /// a catch-all name that collides with an explicit category.
    pub fn new(categories: Vec<Category>, catch_all: impl Into<String>) -> Result<Self, RouterError> {
        let catch_all = catch_all.into();
        if catch_all.trim().is_empty() {
            return Err(RouterError::Configuration(
                "catch-all category name must not be empty".into(),
            ));
        }

        let mut owner = HashMap::new();
        for (idx, category) in categories.iter().enumerate() {
            if category.name == catch_all {
                return Err(RouterError::Configuration(format!(
                    "category '{}' collides with the catch-all name",
                    category.name
                )));
            }
            if categories[..idx].iter().any(|c| c.name == category.name) {
                return Err(RouterError::Configuration(format!(
                    "category '{}' is defined twice",
                    category.name
                )));
            }
            for event in &category.events {
                if let Some(prev) = owner.insert(event.clone(), idx) {
                    if prev != idx {
                        return Err(RouterError::CategoryOverlap {
                            event: event.to_string(),
                            first: categories[prev].name.clone(),
                            second: category.name.clone(),
                        });
                    }
                }
            }
        }

        Ok(Self {
            categories,
            catch_all,
            owner,
        })
    }

    /// The built-in table: contacts, messages, chats, groups, and `others`.
    pub fn standard() -> Self {
        let categories = vec![
            Category::from_known(
                "contacts",
                &[event::CONTACTS_SET, event::CONTACTS_UPDATE, event::CONTACTS_UPSERT],
            ),
            Category::from_known(
                "messages",
                &[
                    event::MESSAGES_DELETE,
                    event::MESSAGES_SET,
                    event::MESSAGES_UPDATE,
                    event::MESSAGES_UPSERT,
                    event::MESSAGING_HISTORY_SET,
                    event::SEND_MESSAGE,
                ],
            ),
            Category::from_known(
                "chats",
                &[
                    event::CHATS_DELETE,
                    event::CHATS_SET,
                    event::CHATS_UPDATE,
                    event::CHATS_UPSERT,
                ],
            ),
            Category::from_known(
                "groups",
                &[
                    event::GROUPS_UPDATE,
                    event::GROUPS_UPSERT,
                    event::GROUP_PARTICIPANTS_UPDATE,
                ],
            ),
        ];

        let owner = categories
            .iter()
            .enumerate()
            .flat_map(|(idx, c)| c.events.iter().map(move |e| (e.clone(), idx)))
            .collect();

        Self {
            categories,
            catch_all: CATCH_ALL.to_string(),
            owner,
        }
    }

    /// Category owning `event`, or the catch-all name.
    pub fn category_of(&self, event: &EventType) -> &str {
        match self.owner.get(event) {
            Some(&idx) => &self.categories[idx].name,
            None => &self.catch_all,
        }
    }

    /// Whether a non-catch-all category explicitly lists `event`.
    pub fn is_categorized(&self, event: &EventType) -> bool {
        self.owner.contains_key(event)
    }

    /// Explicit categories in declaration order (catch-all excluded).
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn catch_all(&self) -> &str {
        &self.catch_all
    }

    /// Events explicitly listed under `name`. Empty for the catch-all and for
    /// unknown names.
    pub fn events_of(&self, name: &str) -> &[EventType] {
        self.categories
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.events.as_slice())
            .unwrap_or(&[])
    }

    /// All category names including the catch-all, which comes last.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories
            .iter()
            .map(|c| c.name.as_str())
            .chain(std::iter::once(self.catch_all.as_str()))
    }
}

impl Default for EventCategoryTable {
    fn default() -> Self {
        Self::standard()
    }
}
