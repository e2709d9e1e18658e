//! Goal readiness diagnostics
//!
//! Readiness combines three shares of a 0-100 score: how many people
//! support the goal (saturating at the configured target), how strong those
//! relationships are, and how many of them were contacted recently. Sector
//! highlights and alerts are plain text lines for direct display.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::GraphEngineConfig;
use crate::models::{Edge, Node, MAX_RELATIONSHIP_STRENGTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for ReadinessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ReadinessLevel::Low => "low",
            ReadinessLevel::Medium => "medium",
            ReadinessLevel::High => "high",
        })
    }
}

/// A supporting relationship: the incoming Supports edge and its person
#[derive(Debug, Clone, Copy)]
pub struct Supporter<'a> {
    pub edge: &'a Edge,
    pub person: &'a Node,
}

impl Supporter<'_> {
    /// Edge strength, falling back to the person's overall strength
    pub fn strength(&self) -> Option<u8> {
        self.edge
            .relationship_strength
            .or_else(|| self.person.relationship_strength())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalDiagnostics {
    pub goal_id: String,
    pub readiness: ReadinessLevel,
    pub readiness_score: f64,
    pub supporter_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_strength: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_recent_interaction: Option<DateTime<Utc>>,
    pub sector_highlights: Vec<String>,
    pub alerts: Vec<String>,
}

fn is_fresh(last: Option<DateTime<Utc>>, now: DateTime<Utc>, stale_after_days: i64) -> bool {
    last.is_some_and(|at| (now - at).num_days() <= stale_after_days)
}

/// Diagnose a goal from its supporters and the owner's whole network
///
/// `network` is every Person node of the owner; `now` is injected so the
/// result is reproducible.
pub fn diagnose_goal(
    goal: &Node,
    supporters: &[Supporter<'_>],
    network: &[&Node],
    config: &GraphEngineConfig,
    now: DateTime<Utc>,
) -> GoalDiagnostics {
    let weights = &config.readiness;
    let count = supporters.len();

    let strengths: Vec<f64> = supporters
        .iter()
        .map(|s| f64::from(s.strength().unwrap_or(0)))
        .collect();
    let average_strength =
        (!strengths.is_empty()).then(|| strengths.iter().sum::<f64>() / strengths.len() as f64);

    let most_recent_interaction = supporters
        .iter()
        .filter_map(|s| s.edge.last_interaction_date)
        .max();
    let fresh = supporters
        .iter()
        .filter(|s| is_fresh(s.edge.last_interaction_date, now, config.stale_after_days))
        .count();

    let readiness_score = if count == 0 {
        0.0
    } else {
        let target = config.target_supporters.max(1);
        let supporter_share = count.min(target) as f64 / target as f64;
        let strength_share =
            average_strength.unwrap_or(0.0) / f64::from(MAX_RELATIONSHIP_STRENGTH);
        let fresh_share = fresh as f64 / count as f64;
        let total = weights.supporters + weights.strength + weights.freshness;
        let points = supporter_share * weights.supporters
            + strength_share * weights.strength
            + fresh_share * weights.freshness;
        // Normalize so custom weights still land on 0-100
        (points / total * 100.0 * 10.0).round() / 10.0
    };

    let readiness = if readiness_score >= weights.high_threshold {
        ReadinessLevel::High
    } else if readiness_score >= weights.medium_threshold {
        ReadinessLevel::Medium
    } else {
        ReadinessLevel::Low
    };

    let mut alerts = Vec::new();
    if count < config.min_supporters {
        alerts.push(format!(
            "Under-supported: {} supporter{}, at least {} recommended",
            count,
            if count == 1 { "" } else { "s" },
            config.min_supporters
        ));
    }
    if count > 0 && !is_fresh(most_recent_interaction, now, config.stale_after_days) {
        let detail = match most_recent_interaction {
            Some(at) => format!("last interaction {} days ago", (now - at).num_days()),
            None => "no interactions recorded".to_string(),
        };
        alerts.push(format!(
            "No recent contact: no supporter contacted in the last {} days ({})",
            config.stale_after_days, detail
        ));
    }
    if let Some(avg) = average_strength {
        if avg < f64::from(config.weak_strength_threshold) {
            alerts.push(format!(
                "Weak support: average relationship strength {:.1}/{}",
                avg, MAX_RELATIONSHIP_STRENGTH
            ));
        }
    }
    if let Some(alert) = due_date_alert(goal, readiness, config, now.date_naive()) {
        alerts.push(alert);
    }

    GoalDiagnostics {
        goal_id: goal.id.clone(),
        readiness,
        readiness_score,
        supporter_count: count,
        average_strength,
        most_recent_interaction,
        sector_highlights: sector_highlights(supporters, network, config.sector_highlight_limit),
        alerts,
    }
}

fn due_date_alert(
    goal: &Node,
    readiness: ReadinessLevel,
    config: &GraphEngineConfig,
    today: NaiveDate,
) -> Option<String> {
    let due = goal.goal_details()?.due_date?;
    if readiness == ReadinessLevel::High {
        return None;
    }
    let days_left = (due - today).num_days();
    if days_left < 0 {
        Some(format!(
            "Overdue: goal was due on {} and readiness is {}",
            due, readiness
        ))
    } else if days_left <= config.due_soon_days {
        Some(format!(
            "Due soon: goal is due on {} ({} days) and readiness is {}",
            due, days_left, readiness
        ))
    } else {
        None
    }
}

/// Sectors over-represented in the network relative to this goal's supporters
///
/// For each sector the gap is its share of the network minus its share of
/// supporters; only positive gaps are reported, largest first.
pub fn sector_highlights(
    supporters: &[Supporter<'_>],
    network: &[&Node],
    limit: usize,
) -> Vec<String> {
    fn tally<'n>(people: impl Iterator<Item = &'n Node>) -> BTreeMap<&'n str, usize> {
        let mut counts = BTreeMap::new();
        for sector in people.filter_map(|p| p.sector()).map(str::trim) {
            if !sector.is_empty() {
                *counts.entry(sector).or_insert(0) += 1;
            }
        }
        counts
    }

    let mut seen = HashSet::new();
    let distinct_supporters = supporters
        .iter()
        .map(|s| s.person)
        .filter(|p| seen.insert(p.id.as_str()));

    let network_counts = tally(network.iter().copied());
    let supporter_counts = tally(distinct_supporters);
    let network_total: usize = network_counts.values().sum();
    let supporter_total: usize = supporter_counts.values().sum();
    if network_total == 0 {
        return Vec::new();
    }

    let mut gaps: Vec<(&str, usize, usize, f64)> = network_counts
        .iter()
        .map(|(&sector, &in_network)| {
            let supporting = supporter_counts.get(sector).copied().unwrap_or(0);
            let network_share = in_network as f64 / network_total as f64;
            let supporter_share = if supporter_total == 0 {
                0.0
            } else {
                supporting as f64 / supporter_total as f64
            };
            (sector, in_network, supporting, network_share - supporter_share)
        })
        .filter(|(_, _, _, gap)| *gap > f64::EPSILON)
        .collect();

    gaps.sort_by(|a, b| {
        b.3.total_cmp(&a.3)
            .then(b.1.cmp(&a.1))
            .then(a.0.cmp(b.0))
    });

    gaps.into_iter()
        .take(limit)
        .map(|(sector, in_network, supporting, _)| {
            format!(
                "{}: {} in your network, {} supporting this goal",
                sector, in_network, supporting
            )
        })
        .collect()
}
