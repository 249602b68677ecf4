//! Per-bike match finding.
//!
//! A bike that went missing (lost or stolen) is compared against bikes that
//! turned up (found or listed for sale), and vice versa. Three independent
//! strategies produce candidate matches:
//!
//! 1. **Serial number**: exact equality, confidence 95.
//! 2. **Image fingerprint**: Hamming distance of the primary photo
//!    fingerprints, confidence `100 - 10 * distance`.
//! 3. **Keywords**: brand, model and city agreement, 40 + 40 + 20.
//!
//! Matches below [`MIN_MATCH_CONFIDENCE`] are dropped. When more than one
//! strategy finds the same candidate only the most confident entry is kept.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pyoravahti_core::{BikeMatcher, InMemoryBikeStore};
//!
//! # async fn example(bike_id: uuid::Uuid) -> pyoravahti_core::Result<()> {
//! let matcher = BikeMatcher::new(Arc::new(InMemoryBikeStore::new()));
//! for m in matcher.find_matches(bike_id).await? {
//!     println!("{} {}% {}", m.matched_bike_id, m.confidence, m.details);
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bike::Bike;
use crate::error::{Error, Result};
use crate::similarity::{confidence_from_distance, similar_distance};
use crate::store::{BikeQuery, BikeStore};

/// Confidence of an exact serial number match.
pub const SERIAL_MATCH_CONFIDENCE: u8 = 95;

/// Matches below this confidence are not reported.
pub const MIN_MATCH_CONFIDENCE: u8 = 50;

const BRAND_SCORE: u8 = 40;
const MODEL_SCORE: u8 = 40;
const CITY_SCORE: u8 = 20;

/// Which strategy produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    SerialNumber,
    Phash,
    Keywords,
}

impl MatchType {
    fn id_prefix(&self) -> &'static str {
        match self {
            MatchType::SerialNumber => "serial",
            MatchType::Phash => "phash",
            MatchType::Keywords => "keyword",
        }
    }
}

/// A candidate reunification link between two bikes. Computed on demand,
/// never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Match {
    /// `{strategy}-{bike_id}-{matched_bike_id}`
    pub id: String,
    pub bike_id: Uuid,
    pub matched_bike_id: Uuid,
    /// 0-100
    pub confidence: u8,
    pub match_type: MatchType,
    /// Human readable explanation shown in the UI
    pub details: String,
}

impl Match {
    fn new(
        match_type: MatchType,
        subject: &Bike,
        candidate: &Bike,
        confidence: u8,
        details: String,
    ) -> Self {
        Self {
            id: format!("{}-{}-{}", match_type.id_prefix(), subject.id, candidate.id),
            bike_id: subject.id,
            matched_bike_id: candidate.id,
            confidence,
            match_type,
            details,
        }
    }
}

/// Serial number strategy.
///
/// `candidates` must already be restricted to the opposite statuses.
pub fn serial_matches(subject: &Bike, candidates: &[Bike]) -> Vec<Match> {
    let Some(serial) = subject.serial() else {
        return Vec::new();
    };

    candidates
        .iter()
        .filter(|c| c.id != subject.id && c.serial_number.as_deref() == Some(serial))
        .map(|c| {
            Match::new(
                MatchType::SerialNumber,
                subject,
                c,
                SERIAL_MATCH_CONFIDENCE,
                format!("Sarjanumero täsmää: {}", serial),
            )
        })
        .collect()
}

/// Image fingerprint strategy.
pub fn phash_matches(subject: &Bike, candidates: &[Bike]) -> Vec<Match> {
    let Some(fingerprint) = subject.fingerprint() else {
        return Vec::new();
    };

    candidates
        .iter()
        .filter(|c| c.id != subject.id)
        .filter_map(|c| {
            let distance = similar_distance(fingerprint, c.fingerprint()?)?;
            let confidence = confidence_from_distance(distance);
            (confidence >= MIN_MATCH_CONFIDENCE).then(|| {
                Match::new(
                    MatchType::Phash,
                    subject,
                    c,
                    confidence,
                    format!("Visuaalinen samankaltaisuus (etäisyys: {})", distance),
                )
            })
        })
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack
        .map(|h| h.to_lowercase().contains(&needle.to_lowercase()))
        .unwrap_or(false)
}

fn eq_ci(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.to_lowercase() == b.to_lowercase(),
        _ => false,
    }
}

/// Keyword strategy.
///
/// Candidates must be in the same city (two bikes without a city count as
/// the same city) and share part of the brand or model before they are
/// scored.
pub fn keyword_matches(subject: &Bike, candidates: &[Bike]) -> Vec<Match> {
    let brand = non_blank(subject.brand.as_deref());
    let model = non_blank(subject.model.as_deref());
    if brand.is_none() && model.is_none() {
        return Vec::new();
    }

    let mut matches = Vec::new();
    for candidate in candidates {
        if candidate.id == subject.id || candidate.city != subject.city {
            continue;
        }
        let related = brand.is_some_and(|b| contains_ci(candidate.brand.as_deref(), b))
            || model.is_some_and(|m| contains_ci(candidate.model.as_deref(), m));
        if !related {
            continue;
        }

        let mut confidence = 0u8;
        let mut details = Vec::new();

        if eq_ci(brand, candidate.brand.as_deref()) {
            confidence += BRAND_SCORE;
            details.push(format!("Merkki: {}", brand.unwrap_or_default()));
        }
        if eq_ci(model, candidate.model.as_deref()) {
            confidence += MODEL_SCORE;
            details.push(format!("Malli: {}", model.unwrap_or_default()));
        }
        let city = non_blank(subject.city.as_deref());
        if eq_ci(city, non_blank(candidate.city.as_deref())) {
            confidence += CITY_SCORE;
            details.push(format!("Kaupunki: {}", city.unwrap_or_default()));
        }

        if confidence >= MIN_MATCH_CONFIDENCE {
            matches.push(Match::new(
                MatchType::Keywords,
                subject,
                candidate,
                confidence,
                details.join(", "),
            ));
        }
    }
    matches
}

/// Keep the most confident match per candidate and rank the result.
///
/// On equal confidence the entry discovered first wins. The sort is stable,
/// so equally confident matches stay in discovery order.
pub fn merge_matches(matches: Vec<Match>) -> Vec<Match> {
    let mut merged: Vec<Match> = Vec::with_capacity(matches.len());
    let mut index: HashMap<Uuid, usize> = HashMap::new();

    for m in matches {
        match index.get(&m.matched_bike_id) {
            Some(&i) => {
                if m.confidence > merged[i].confidence {
                    merged[i] = m;
                }
            }
            None => {
                index.insert(m.matched_bike_id, merged.len());
                merged.push(m);
            }
        }
    }

    merged.sort_by(|a, b| b.confidence.cmp(&a.confidence));
    merged
}

/// Outcome of a batch recompute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeSummary {
    pub bikes_processed: usize,
    pub matches_found: usize,
    pub failures: usize,
}

/// Finds matches for bikes held in a [`BikeStore`].
#[derive(Clone)]
pub struct BikeMatcher {
    store: Arc<dyn BikeStore>,
}

impl BikeMatcher {
    pub fn new(store: Arc<dyn BikeStore>) -> Self {
        Self { store }
    }

    /// Find and rank matches for a single bike.
    ///
    /// Read-only: nothing is written back to the store.
    pub async fn find_matches(&self, bike_id: Uuid) -> Result<Vec<Match>> {
        let subject = self
            .store
            .get_bike(bike_id)
            .await?
            .ok_or_else(|| Error::BikeNotFound(bike_id.to_string()))?;

        let query = BikeQuery::candidates(subject.status.opposite(), subject.id);
        let candidates = self.store.find_bikes(&query).await?;

        let mut found = serial_matches(&subject, &candidates);
        found.extend(phash_matches(&subject, &candidates));
        found.extend(keyword_matches(&subject, &candidates));

        let matches = merge_matches(found);

        tracing::debug!(
            bike_id = %bike_id,
            candidates = candidates.len(),
            matches = matches.len(),
            "Computed matches"
        );

        Ok(matches)
    }

    /// Recompute matches for every bike created since `since`, newest first.
    ///
    /// A failure on one bike is logged and counted; the batch carries on.
    /// Only the initial listing can fail the whole run.
    pub async fn recompute_since(&self, since: DateTime<Utc>) -> Result<RecomputeSummary> {
        let query = BikeQuery {
            created_after: Some(since),
            ..Default::default()
        };
        let bikes = self.store.find_bikes(&query).await?;

        tracing::info!(count = bikes.len(), since = %since, "Recomputing matches for recent bikes");

        let mut summary = RecomputeSummary::default();
        for bike in &bikes {
            summary.bikes_processed += 1;
            match self.find_matches(bike.id).await {
                Ok(matches) => {
                    summary.matches_found += matches.len();
                    for m in &matches {
                        tracing::info!(
                            bike_id = %bike.id,
                            matched_bike_id = %m.matched_bike_id,
                            confidence = m.confidence,
                            match_type = ?m.match_type,
                            "Match found"
                        );
                    }
                }
                Err(e) => {
                    summary.failures += 1;
                    tracing::error!(bike_id = %bike.id, error = %e, "Failed to compute matches");
                }
            }
        }

        tracing::info!(
            processed = summary.bikes_processed,
            matches = summary.matches_found,
            failures = summary.failures,
            "Recompute finished"
        );

        Ok(summary)
    }
}

impl std::fmt::Debug for BikeMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BikeMatcher")
            .field("store", &self.store.backend())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bike::BikeStatus;
    use crate::store::InMemoryBikeStore;
    use crate::test_support::{bike, bike_at};
    use chrono::Duration;

    fn matcher_with(bikes: Vec<Bike>) -> BikeMatcher {
        let store = InMemoryBikeStore::new();
        for b in bikes {
            store.insert(b);
        }
        BikeMatcher::new(Arc::new(store))
    }

    fn with_serial(status: BikeStatus, serial: &str) -> Bike {
        let mut b = bike(status);
        b.serial_number = Some(serial.into());
        b
    }

    fn with_phash(status: BikeStatus, phash: &str) -> Bike {
        let mut b = bike(status);
        b.phash = Some(phash.into());
        b
    }

    fn with_keywords(status: BikeStatus, brand: &str, model: Option<&str>, city: Option<&str>) -> Bike {
        let mut b = bike(status);
        b.brand = Some(brand.into());
        b.model = model.map(String::from);
        b.city = city.map(String::from);
        b
    }

    #[tokio::test]
    async fn test_serial_number_match() {
        let lost = with_serial(BikeStatus::Lost, "ABC123");
        let found = with_serial(BikeStatus::Found, "ABC123");
        let matcher = matcher_with(vec![lost.clone(), found.clone()]);

        let matches = matcher.find_matches(lost.id).await.unwrap();
        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert_eq!(m.match_type, MatchType::SerialNumber);
        assert_eq!(m.confidence, 95);
        assert_eq!(m.matched_bike_id, found.id);
        assert_eq!(m.details, "Sarjanumero täsmää: ABC123");
        assert_eq!(m.id, format!("serial-{}-{}", lost.id, found.id));
    }

    #[tokio::test]
    async fn test_same_status_never_matches() {
        let a = with_serial(BikeStatus::Lost, "ABC123");
        let b = with_serial(BikeStatus::Lost, "ABC123");
        let c = with_serial(BikeStatus::Stolen, "ABC123");
        let matcher = matcher_with(vec![a.clone(), b, c]);

        assert!(matcher.find_matches(a.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_serial_is_case_sensitive() {
        let lost = with_serial(BikeStatus::Lost, "ABC123");
        let found = with_serial(BikeStatus::Found, "abc123");
        let matcher = matcher_with(vec![lost.clone(), found]);

        assert!(matcher.find_matches(lost.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_bike() {
        let matcher = matcher_with(vec![]);
        let err = matcher.find_matches(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::BikeNotFound(_)));
    }

    #[tokio::test]
    async fn test_phash_match_confidence() {
        let lost = with_phash(BikeStatus::Lost, "0000000000000000");
        let close = with_phash(BikeStatus::ForSaleExternal, "0000000000000111");
        let far = with_phash(BikeStatus::Found, "0000000000111111");
        let matcher = matcher_with(vec![lost.clone(), close.clone(), far]);

        let matches = matcher.find_matches(lost.id).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].matched_bike_id, close.id);
        assert_eq!(matches[0].match_type, MatchType::Phash);
        assert_eq!(matches[0].confidence, 70);
        assert_eq!(matches[0].details, "Visuaalinen samankaltaisuus (etäisyys: 3)");
    }

    #[tokio::test]
    async fn test_no_fingerprint_no_phash_match() {
        let lost = bike(BikeStatus::Lost);
        let found = with_phash(BikeStatus::Found, "0000000000000000");
        let matcher = matcher_with(vec![lost.clone(), found.clone()]);
        assert!(matcher.find_matches(lost.id).await.unwrap().is_empty());

        // And the other way around
        assert!(matcher.find_matches(found.id).await.unwrap().is_empty());
    }

    #[test]
    fn test_phash_incomparable_lengths_skipped() {
        let lost = with_phash(BikeStatus::Lost, "00000000");
        let found = with_phash(BikeStatus::Found, "0000000000000000");
        assert!(phash_matches(&lost, &[found]).is_empty());
    }

    #[tokio::test]
    async fn test_keyword_match_brand_and_city() {
        let lost = with_keywords(BikeStatus::Lost, "Trek", None, Some("Helsinki"));
        let found = with_keywords(BikeStatus::Found, "trek", None, Some("Helsinki"));
        let matcher = matcher_with(vec![lost.clone(), found.clone()]);

        let matches = matcher.find_matches(lost.id).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].match_type, MatchType::Keywords);
        assert_eq!(matches[0].confidence, 60);
        assert_eq!(matches[0].details, "Merkki: Trek, Kaupunki: Helsinki");
    }

    #[tokio::test]
    async fn test_keyword_requires_same_city() {
        let lost = with_keywords(BikeStatus::Lost, "Trek", None, Some("Helsinki"));
        let found = with_keywords(BikeStatus::Found, "trek", None, Some("Espoo"));
        let matcher = matcher_with(vec![lost.clone(), found]);

        assert!(matcher.find_matches(lost.id).await.unwrap().is_empty());
    }

    #[test]
    fn test_keyword_brand_and_model_without_city() {
        let lost = with_keywords(BikeStatus::Lost, "Giant", Some("Escape 3"), None);
        let found = with_keywords(BikeStatus::Found, "GIANT", Some("escape 3"), None);

        let matches = keyword_matches(&lost, &[found]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].confidence, 80);
        assert_eq!(matches[0].details, "Merkki: Giant, Malli: Escape 3");
    }

    #[test]
    fn test_keyword_partial_brand_below_threshold() {
        // Passes the pre-filter but only earns the city bonus
        let lost = with_keywords(BikeStatus::Lost, "Trek", None, Some("Turku"));
        let found = with_keywords(BikeStatus::Found, "Trek Bicycle", None, Some("Turku"));
        assert!(keyword_matches(&lost, &[found]).is_empty());
    }

    #[test]
    fn test_keyword_needs_brand_or_model() {
        let mut lost = bike(BikeStatus::Lost);
        lost.city = Some("Oulu".into());
        lost.brand = Some(String::new());
        let mut found = bike(BikeStatus::Found);
        found.city = Some("Oulu".into());
        assert!(keyword_matches(&lost, &[found]).is_empty());
    }

    #[tokio::test]
    async fn test_merge_keeps_highest_confidence() {
        // Serial (95) and keywords (100) hit the same candidate
        let mut lost = with_keywords(BikeStatus::Lost, "Trek", Some("FX 2"), Some("Helsinki"));
        lost.serial_number = Some("WTU001".into());
        let mut found = with_keywords(BikeStatus::Found, "Trek", Some("FX 2"), Some("Helsinki"));
        found.serial_number = Some("WTU001".into());
        let matcher = matcher_with(vec![lost.clone(), found.clone()]);

        let matches = matcher.find_matches(lost.id).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].match_type, MatchType::Keywords);
        assert_eq!(matches[0].confidence, 100);
    }

    #[test]
    fn test_merge_keeps_earlier_entry_when_later_is_weaker() {
        let lost = with_serial(BikeStatus::Lost, "X1");
        let found = with_serial(BikeStatus::Found, "X1");
        let serial = serial_matches(&lost, std::slice::from_ref(&found));
        let weaker = Match::new(MatchType::Keywords, &lost, &found, 60, "Merkki: Trek".into());

        let merged = merge_matches(serial.into_iter().chain([weaker]).collect());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].match_type, MatchType::SerialNumber);
    }

    #[test]
    fn test_merge_ties_keep_discovery_order() {
        let lost = bike(BikeStatus::Lost);
        let a = bike(BikeStatus::Found);
        let b = bike(BikeStatus::Found);
        let c = bike(BikeStatus::Found);

        let found = vec![
            Match::new(MatchType::Phash, &lost, &a, 60, String::new()),
            Match::new(MatchType::Phash, &lost, &b, 90, String::new()),
            Match::new(MatchType::Keywords, &lost, &c, 60, String::new()),
        ];
        let merged = merge_matches(found);
        let order: Vec<Uuid> = merged.iter().map(|m| m.matched_bike_id).collect();
        assert_eq!(order, vec![b.id, a.id, c.id]);
    }

    #[tokio::test]
    async fn test_results_sorted_and_idempotent() {
        let mut lost = with_keywords(BikeStatus::Lost, "Trek", None, Some("Helsinki"));
        lost.phash = Some("0000000000000000".into());
        let keyword = with_keywords(BikeStatus::Found, "Trek", None, Some("Helsinki"));
        let visual = with_phash(BikeStatus::ForSaleExternal, "0000000000000001");
        let matcher = matcher_with(vec![lost.clone(), keyword, visual.clone()]);

        let first = matcher.find_matches(lost.id).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].matched_bike_id, visual.id);
        assert!(first.windows(2).all(|w| w[0].confidence >= w[1].confidence));

        let second = matcher.find_matches(lost.id).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_recompute_since_counts_recent_bikes() {
        let now = Utc::now();
        let lost = {
            let mut b = bike_at(BikeStatus::Lost, now - Duration::hours(2));
            b.serial_number = Some("R1".into());
            b
        };
        let found = {
            let mut b = bike_at(BikeStatus::Found, now - Duration::hours(1));
            b.serial_number = Some("R1".into());
            b
        };
        let old = bike_at(BikeStatus::Found, now - Duration::days(3));
        let matcher = matcher_with(vec![lost, found, old]);

        let summary = matcher
            .recompute_since(now - Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(
            summary,
            RecomputeSummary {
                bikes_processed: 2,
                matches_found: 2,
                failures: 0,
            }
        );
    }
}
