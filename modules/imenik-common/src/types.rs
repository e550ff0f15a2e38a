use serde::{Deserialize, Serialize};

/// Prefix every retained telephone number must carry once whitespace is removed.
pub const MOBILE_PREFIX: &str = "09";

/// Page-count estimate used until real pagination has been discovered.
pub const DEFAULT_TOTAL_PAGES: u32 = 10;

// --- Entry ---

/// One contact record scraped from the directory.
///
/// `telephone_number` keeps the formatting it was scraped with; callers clean it
/// before comparing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub telephone_number: String,
    pub street: String,
    pub city: String,
    pub full_name: String,
}

// --- Progress ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeStatus {
    Pending,
    Processing,
    Completed,
}

/// Lifecycle and page cursor of a single search term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameStatus {
    pub current_page: u32,
    pub total_pages: u32,
    pub status: ScrapeStatus,
}

impl Default for NameStatus {
    fn default() -> Self {
        Self {
            current_page: 0,
            total_pages: DEFAULT_TOTAL_PAGES,
            status: ScrapeStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_serializes_with_camel_case_keys() {
        let entry = Entry {
            telephone_number: "091 234 5678".into(),
            street: "Ilica 1".into(),
            city: "Zagreb".into(),
            full_name: "Ivan Horvat".into(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(
            json,
            r#"{"telephoneNumber":"091 234 5678","street":"Ilica 1","city":"Zagreb","fullName":"Ivan Horvat"}"#
        );
    }

    #[test]
    fn name_status_starts_pending_with_estimate() {
        let status = NameStatus::default();
        assert_eq!(status.status, ScrapeStatus::Pending);
        assert_eq!(status.current_page, 0);
        assert_eq!(status.total_pages, DEFAULT_TOTAL_PAGES);
    }
}
