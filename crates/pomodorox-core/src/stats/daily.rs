use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Aggregate for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub completed_cycles: u32,
    pub total_focus_min: u32,
    pub total_break_min: u32,
    /// Derived when reading a range; not persisted.
    #[serde(default)]
    pub streak: u32,
    /// Qualified cycles per category id.
    #[serde(default)]
    pub categories: BTreeMap<String, u32>,
}

impl DailyStats {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            completed_cycles: 0,
            total_focus_min: 0,
            total_break_min: 0,
            streak: 0,
            categories: BTreeMap::new(),
        }
    }

    /// Merge a patch; absent fields keep their value.
    pub fn patched(&self, patch: &StatsPatch) -> DailyStats {
        let mut next = self.clone();
        if let Some(v) = patch.completed_cycles {
            next.completed_cycles = v;
        }
        if let Some(v) = patch.total_focus_min {
            next.total_focus_min = v;
        }
        if let Some(v) = patch.total_break_min {
            next.total_break_min = v;
        }
        if let Some(ref v) = patch.categories {
            next.categories = v.clone();
        }
        next
    }

    /// `category:count` pairs joined by `;`.
    pub fn categories_summary(&self) -> String {
        self.categories
            .iter()
            .map(|(cat, count)| format!("{cat}:{count}"))
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Merge-patch for [`DailyStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsPatch {
    pub completed_cycles: Option<u32>,
    pub total_focus_min: Option<u32>,
    pub total_break_min: Option<u32>,
    pub categories: Option<BTreeMap<String, u32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_only_touches_present_fields() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let mut base = DailyStats::empty(date);
        base.total_focus_min = 50;
        base.categories.insert("work".into(), 1);

        let next = base.patched(&StatsPatch {
            total_break_min: Some(5),
            ..Default::default()
        });
        assert_eq!(next.total_focus_min, 50);
        assert_eq!(next.total_break_min, 5);
        assert_eq!(next.categories.get("work"), Some(&1));
    }

    #[test]
    fn categories_summary_is_sorted() {
        let mut stats = DailyStats::empty(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        stats.categories.insert("study".into(), 2);
        stats.categories.insert("admin".into(), 1);
        assert_eq!(stats.categories_summary(), "admin:1;study:2");
    }
}
