//! Built-in cycle categories and quick labels.
//!
//! Cycles store the category id as a plain string, so custom categories
//! are allowed; these are just the ones offered by default.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
}

pub const PREDEFINED_CATEGORIES: &[Category] = &[
    Category { id: "work", name: "Work", icon: "💼" },
    Category { id: "study", name: "Study", icon: "📚" },
    Category { id: "personal", name: "Personal", icon: "🏠" },
    Category { id: "health", name: "Health & Fitness", icon: "💪" },
    Category { id: "creative", name: "Creative", icon: "🎨" },
    Category { id: "learning", name: "Learning", icon: "🧠" },
    Category { id: "side-project", name: "Side Project", icon: "🚀" },
    Category { id: "admin", name: "Admin Tasks", icon: "📋" },
];

pub const QUICK_LABELS: &[&str] = &[
    "Deep Work",
    "Email & Communication",
    "Planning",
    "Code Review",
    "Meeting Prep",
    "Research",
    "Documentation",
    "Bug Fixes",
    "Learning",
    "Admin Tasks",
];

pub fn find(id: &str) -> Option<&'static Category> {
    PREDEFINED_CATEGORIES.iter().find(|c| c.id == id)
}

/// Display name for a category id; custom ids are shown as-is.
pub fn display_name(id: &str) -> &str {
    find(id).map(|c| c.name).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_and_custom() {
        assert_eq!(find("side-project").map(|c| c.name), Some("Side Project"));
        assert_eq!(display_name("health"), "Health & Fitness");
        assert_eq!(display_name("gardening"), "gardening");
    }
}
