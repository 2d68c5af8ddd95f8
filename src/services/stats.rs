//! Descriptive statistics over the whole response collection, recomputed on
//! every call.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::collections::HashMap;

use crate::database::models::ResponseFacets;

/// Inputs the engine needs, gathered fresh from the store.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub total_users: i64,
    pub users_completed: i64,
    pub facets: Vec<ResponseFacets>,
}

/// One group in a distribution: `{"_id": label, "count": n}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    #[serde(rename = "_id")]
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_users: i64,
    pub total_responses: i64,
    pub users_completed: i64,
    /// Percentage with two decimals; serialized as a string.
    pub completion_rate: Decimal,
    pub company_size_distribution: Vec<Bucket>,
    pub industry_distribution: Vec<Bucket>,
    pub feature_popularity: Vec<Bucket>,
}

pub fn summarize(snapshot: &Snapshot) -> Stats {
    let facets = &snapshot.facets;

    let mut company_size_distribution =
        tally(facets.iter().map(|f| f.company_size.as_str()));
    company_size_distribution.sort_by(|a, b| a.label.cmp(&b.label));

    let mut industry_distribution = tally(facets.iter().map(|f| f.industry.as_str()));
    sort_by_count_desc(&mut industry_distribution);

    // One row per (response, tag); responses without tags add nothing
    let mut feature_popularity = tally(
        facets
            .iter()
            .flat_map(|f| f.feature_interests.iter().map(|t| t.as_str())),
    );
    sort_by_count_desc(&mut feature_popularity);

    Stats {
        total_users: snapshot.total_users,
        total_responses: facets.len() as i64,
        users_completed: snapshot.users_completed,
        completion_rate: completion_rate(snapshot.users_completed, snapshot.total_users),
        company_size_distribution,
        industry_distribution,
        feature_popularity,
    }
}

/// `completed / total * 100`, half-up to two decimals; zero when there are
/// no users at all.
pub fn completion_rate(completed: i64, total: i64) -> Decimal {
    let mut rate = if total <= 0 {
        Decimal::ZERO
    } else {
        (Decimal::from(completed) * Decimal::ONE_HUNDRED / Decimal::from(total))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    };
    rate.rescale(2);
    rate
}

fn tally<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<Bucket> {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(label, count)| Bucket {
            label: label.to_string(),
            count,
        })
        .collect()
}

/// Highest count first; equal counts fall back to label order.
fn sort_by_count_desc(buckets: &mut [Bucket]) {
    buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
}
