//! Known merchants and how each one is cancelled.

use serde::Serialize;

use crate::model::{CancellationDifficulty, CancellationMethod};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: &'static str,
    pub name: &'static str,
    /// Monthly price.
    pub amount: f64,
    pub provider: &'static str,
    pub method: CancellationMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'static str>,
    pub url: &'static str,
    pub difficulty: CancellationDifficulty,
    pub retention_offers: &'static [&'static str],
}

static CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        id: "gym-membership",
        name: "Gym Membership",
        amount: 29.99,
        provider: "FitnessPro",
        method: CancellationMethod::Phone,
        phone: Some("+1-800-555-0123"),
        email: None,
        url: "https://fitnesspro.com/cancel",
        difficulty: CancellationDifficulty::Medium,
        retention_offers: &["50% off for 3 months", "Free personal training session"],
    },
    CatalogEntry {
        id: "netflix-1",
        name: "Netflix",
        amount: 15.99,
        provider: "Netflix",
        method: CancellationMethod::Online,
        phone: None,
        email: None,
        url: "https://netflix.com/cancel",
        difficulty: CancellationDifficulty::Easy,
        retention_offers: &["Free month", "Lower tier subscription"],
    },
    CatalogEntry {
        id: "spotify-premium",
        name: "Spotify Premium",
        amount: 11.99,
        provider: "Spotify",
        method: CancellationMethod::Online,
        phone: None,
        email: None,
        url: "https://spotify.com/cancel",
        difficulty: CancellationDifficulty::Easy,
        retention_offers: &["3 months free", "Student discount"],
    },
    CatalogEntry {
        id: "adobe-creative",
        name: "Adobe Creative Suite",
        amount: 52.99,
        provider: "Adobe",
        method: CancellationMethod::Phone,
        phone: Some("+1-800-833-6687"),
        email: None,
        url: "https://adobe.com/cancel",
        difficulty: CancellationDifficulty::Hard,
        retention_offers: &["Photography plan for $9.99", "20% discount for 6 months"],
    },
    CatalogEntry {
        id: "news-subscription",
        name: "News Subscription",
        amount: 12.99,
        provider: "NewsDaily",
        method: CancellationMethod::Email,
        phone: None,
        email: Some("cancel@newsdaily.com"),
        url: "https://newsdaily.com/cancel",
        difficulty: CancellationDifficulty::Medium,
        retention_offers: &["Weekend only subscription", "50% off for 6 months"],
    },
];

pub fn entries() -> &'static [CatalogEntry] {
    CATALOG
}

pub fn lookup(id: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|e| e.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_contacts_match_method() {
        for (i, e) in CATALOG.iter().enumerate() {
            assert!(CATALOG[i + 1..].iter().all(|o| o.id != e.id), "duplicate {}", e.id);
            match e.method {
                CancellationMethod::Phone => assert!(e.phone.is_some(), "{}", e.id),
                CancellationMethod::Email => assert!(e.email.is_some(), "{}", e.id),
                _ => {}
            }
        }
    }

    #[test]
    fn lookup_by_id() {
        assert_eq!(lookup("adobe-creative").unwrap().amount, 52.99);
        assert!(lookup("does-not-exist").is_none());
    }
}
