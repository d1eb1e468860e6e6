/// Service filter evaluation
///
/// Pure logic for the hotel filter query: request validation and the
/// AND-semantics post-filter applied to candidate rows fetched from the
/// relational store.
use std::collections::{HashMap, HashSet};

use thiserror::Error;

/// Filter validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterValidationError {
    /// The required-services set is empty
    #[error("required services must not be empty")]
    Empty,
}

/// Evaluator for required-service filters
pub struct ServiceFilter;

impl ServiceFilter {
    /// Validate a required-services set
    ///
    /// An empty set is rejected before any store access happens.
    pub fn validate(required: &[String]) -> Result<(), FilterValidationError> {
        if required.is_empty() {
            return Err(FilterValidationError::Empty);
        }
        Ok(())
    }

    /// Retain the hotels offering every required service
    ///
    /// `rows` holds (hotel_id, service_name) pairs: for each candidate hotel
    /// its complete association list. A hotel is kept only when its name set
    /// is a superset of `required` (AND semantics, not OR). The result is
    /// deduplicated, preserving first-occurrence order of the input rows.
    pub fn matching_hotels(rows: &[(String, String)], required: &[String]) -> Vec<String> {
        // 集約: ホテルごとの保有サービス名セット
        let mut names_by_hotel: HashMap<&str, HashSet<&str>> = HashMap::new();
        for (hotel_id, service_name) in rows {
            names_by_hotel
                .entry(hotel_id.as_str())
                .or_default()
                .insert(service_name.as_str());
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut matched = Vec::new();
        for (hotel_id, _) in rows {
            if !seen.insert(hotel_id.as_str()) {
                continue;
            }
            let names = &names_by_hotel[hotel_id.as_str()];
            if required.iter().all(|name| names.contains(name.as_str())) {
                matched.push(hotel_id.clone());
            }
        }

        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(h, s)| (h.to_string(), s.to_string()))
            .collect()
    }

    fn required(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    // ==================== Validation tests ====================

    #[test]
    fn test_validate_rejects_empty_set() {
        let result = ServiceFilter::validate(&[]);
        assert_eq!(result, Err(FilterValidationError::Empty));
    }

    #[test]
    fn test_validate_accepts_non_empty_set() {
        assert!(ServiceFilter::validate(&required(&["wifi"])).is_ok());
    }

    // ==================== Superset post-filter tests ====================

    #[test]
    fn test_single_service_matches_holder() {
        let rows = rows(&[("H1", "wifi"), ("H1", "pool")]);
        let matched = ServiceFilter::matching_hotels(&rows, &required(&["wifi"]));
        assert_eq!(matched, vec!["H1"]);
    }

    #[test]
    fn test_and_semantics_excludes_partial_match() {
        // H1 holds wifi+pool but not spa
        let rows = rows(&[("H1", "wifi"), ("H1", "pool")]);
        let matched = ServiceFilter::matching_hotels(&rows, &required(&["wifi", "spa"]));
        assert!(matched.is_empty());
    }

    #[test]
    fn test_all_required_services_present() {
        let rows = rows(&[("H1", "wifi"), ("H1", "pool"), ("H1", "spa")]);
        let matched = ServiceFilter::matching_hotels(&rows, &required(&["wifi", "pool"]));
        assert_eq!(matched, vec!["H1"]);
    }

    #[test]
    fn test_mixed_hotels_only_supersets_kept() {
        let rows = rows(&[
            ("H1", "wifi"),
            ("H1", "pool"),
            ("H2", "wifi"),
            ("H3", "pool"),
            ("H3", "wifi"),
            ("H3", "gym"),
        ]);
        let matched = ServiceFilter::matching_hotels(&rows, &required(&["wifi", "pool"]));
        assert_eq!(matched, vec!["H1", "H3"]);
    }

    #[test]
    fn test_result_is_deduplicated() {
        let rows = rows(&[("H1", "wifi"), ("H1", "pool"), ("H1", "gym")]);
        let matched = ServiceFilter::matching_hotels(&rows, &required(&["wifi"]));
        assert_eq!(matched, vec!["H1"]);
    }

    #[test]
    fn test_first_occurrence_order_preserved() {
        let rows = rows(&[("H2", "wifi"), ("H1", "wifi"), ("H2", "pool")]);
        let matched = ServiceFilter::matching_hotels(&rows, &required(&["wifi"]));
        assert_eq!(matched, vec!["H2", "H1"]);
    }

    #[test]
    fn test_empty_rows_yield_empty_result() {
        let matched = ServiceFilter::matching_hotels(&[], &required(&["wifi"]));
        assert!(matched.is_empty());
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let rows = rows(&[("H1", "Wifi")]);
        let matched = ServiceFilter::matching_hotels(&rows, &required(&["wifi"]));
        assert!(matched.is_empty());
    }
}
