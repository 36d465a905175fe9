use crate::record::SessionRecord;
use crate::section::{ScoringGroup, ScoringTable};
use crate::util::mean;

/// Most recent session across every practice type
#[derive(Debug, Clone, PartialEq)]
pub struct LatestActivity {
    pub timestamp: i64,
    pub total_score: f64,
    pub practice_type: String,
}

/// Top-line figures. Best and mean only look at full exams.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overview {
    pub session_count: usize,
    pub best_full_score: f64,
    pub mean_full_score: f64,
    pub latest: Option<LatestActivity>,
}

pub fn overview(records: &[SessionRecord]) -> Overview {
    let full_scores: Vec<f64> = records
        .iter()
        .filter(|r| r.is_full_exam())
        .map(|r| r.total_score)
        .collect();

    let best_full_score = full_scores.iter().copied().fold(0.0, f64::max);
    let mean_full_score = mean(&full_scores).unwrap_or(0.0);

    // ties resolve to the earliest stored record
    let latest = records
        .iter()
        .rev()
        .max_by_key(|r| r.timestamp)
        .map(|r| LatestActivity {
            timestamp: r.timestamp,
            total_score: r.total_score,
            practice_type: r.practice_type.clone(),
        });

    Overview {
        session_count: records.len(),
        best_full_score,
        mean_full_score,
        latest,
    }
}

/// Full-group-equivalent score of one session for a split group.
///
/// Only the attempted members count, and the raw items are scaled by
/// `group max items / attempted max items` so a partial attempt projects to
/// the whole group at the same accuracy. `None` when the session did not
/// touch the group, or when its attempted members carry no items at all.
pub fn normalized_contribution(
    record: &SessionRecord,
    group: ScoringGroup,
    table: &ScoringTable,
) -> Option<f64> {
    let attempted: Vec<_> = group
        .members()
        .iter()
        .copied()
        .filter(|s| record.is_attempted(*s))
        .collect();
    if attempted.is_empty() {
        return None;
    }

    let attempted_max: u32 = attempted.iter().map(|s| table.max_count(*s)).sum();
    if attempted_max == 0 {
        log::warn!(
            "session {} attempted {} with no gradable items, excluding it",
            record.id,
            group.label()
        );
        return None;
    }

    let raw: u32 = attempted.iter().map(|s| record.count(*s)).sum();
    let coefficient = f64::from(table.group_max_items(group)) / f64::from(attempted_max);
    Some(f64::from(raw) * coefficient * table.weight(group))
}

/// Weighted score of one session for an unsplit group.
///
/// A session counts when it logged time for the sub-section or scored above
/// zero on it; the attempt map is not consulted.
pub fn simple_contribution(
    record: &SessionRecord,
    group: ScoringGroup,
    table: &ScoringTable,
) -> Option<f64> {
    let sub = *group.members().first()?;
    let count = record.count(sub);
    if record.duration(sub) > 0 || count > 0 {
        Some(f64::from(count) * table.weight(group))
    } else {
        None
    }
}

/// Mean per-session score for `group`, or `None` when no session has data for it
pub fn normalized_group_average(
    records: &[SessionRecord],
    group: ScoringGroup,
    table: &ScoringTable,
) -> Option<f64> {
    let contributions: Vec<f64> = records
        .iter()
        .filter_map(|r| {
            if group.is_split() {
                normalized_contribution(r, group, table)
            } else {
                simple_contribution(r, group, table)
            }
        })
        .collect();
    mean(&contributions)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupAverage {
    pub group: ScoringGroup,
    pub average: Option<f64>,
}

pub fn drill_breakdown(records: &[SessionRecord], table: &ScoringTable) -> Vec<GroupAverage> {
    ScoringGroup::ALL
        .into_iter()
        .map(|group| GroupAverage {
            group,
            average: normalized_group_average(records, group, table),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub overview: Overview,
    pub breakdown: Vec<GroupAverage>,
}

pub fn summarize(records: &[SessionRecord], table: &ScoringTable) -> Summary {
    Summary {
        overview: overview(records),
        breakdown: drill_breakdown(records, table),
    }
}
