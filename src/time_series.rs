use crate::record::SessionRecord;
use crate::section::{Domain, ScoringGroup, ScoringTable, SubSection};
use crate::util::round_to_tenth;
use clap::ValueEnum;
use std::cmp::Reverse;

/// Quantity plotted by the trend view
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, strum_macros::Display)]
pub enum Metric {
    #[value(name = "total")]
    #[strum(serialize = "total")]
    Total,
    #[value(name = "listening")]
    #[strum(serialize = "listening")]
    Listening,
    #[value(name = "l_long")]
    #[strum(serialize = "l_long")]
    LongConversation,
    #[value(name = "l_pass")]
    #[strum(serialize = "l_pass")]
    Passage,
    #[value(name = "l_lect")]
    #[strum(serialize = "l_lect")]
    Lecture,
    #[value(name = "reading")]
    #[strum(serialize = "reading")]
    Reading,
    #[value(name = "r_bc")]
    #[strum(serialize = "r_bc")]
    BankedCloze,
    #[value(name = "r_mat")]
    #[strum(serialize = "r_mat")]
    Matching,
    #[value(name = "r_cr")]
    #[strum(serialize = "r_cr")]
    CarefulReading,
    #[value(name = "writing")]
    #[strum(serialize = "writing")]
    Writing,
    #[value(name = "translation")]
    #[strum(serialize = "translation")]
    Translation,
}

enum Scope {
    Total,
    Domain(Domain),
    Group(ScoringGroup),
}

impl Metric {
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Total => "Total Score",
            Metric::Listening => "Listening (All)",
            Metric::LongConversation => "Listening - Long Conv",
            Metric::Passage => "Listening - Passages",
            Metric::Lecture => "Listening - Lectures",
            Metric::Reading => "Reading (All)",
            Metric::BankedCloze => "Reading - Banked Cloze",
            Metric::Matching => "Reading - Matching",
            Metric::CarefulReading => "Reading - Careful",
            Metric::Writing => "Writing",
            Metric::Translation => "Translation",
        }
    }

    fn scope(&self) -> Scope {
        match self {
            Metric::Total => Scope::Total,
            Metric::Listening => Scope::Domain(Domain::Listening),
            Metric::Reading => Scope::Domain(Domain::Reading),
            Metric::Writing => Scope::Domain(Domain::Writing),
            Metric::Translation => Scope::Domain(Domain::Translation),
            Metric::LongConversation => Scope::Group(ScoringGroup::LongConversation),
            Metric::Passage => Scope::Group(ScoringGroup::Passage),
            Metric::Lecture => Scope::Group(ScoringGroup::Lecture),
            Metric::BankedCloze => Scope::Group(ScoringGroup::BankedCloze),
            Metric::Matching => Scope::Group(ScoringGroup::Matching),
            Metric::CarefulReading => Scope::Group(ScoringGroup::CarefulReading),
        }
    }

    /// Unrounded score and the minutes spent on it; listening has no time
    pub fn measure(&self, record: &SessionRecord, table: &ScoringTable) -> (f64, Option<u32>) {
        match self.scope() {
            Scope::Total => (record.total_score, Some(record.duration_minutes)),
            Scope::Domain(domain) => (
                record.scores().get(domain),
                minutes_for(record, domain.sub_sections()),
            ),
            Scope::Group(group) => {
                let items: u32 = group.members().iter().map(|s| record.count(*s)).sum();
                (
                    f64::from(items) * table.weight(group),
                    minutes_for(record, group.members().iter().copied()),
                )
            }
        }
    }
}

fn minutes_for(record: &SessionRecord, subs: impl Iterator<Item = SubSection>) -> Option<u32> {
    let mut subs = subs.peekable();
    if subs.peek().is_some_and(|s| !s.is_timed()) {
        return None;
    }
    Some(subs.map(|s| record.duration(s)).sum())
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub timestamp: i64,
    pub score: f64,
    pub duration: Option<u32>,
    pub practice_type: String,
}

/// The `window` most recent sessions, oldest first. Per-section metrics leave
/// out sessions that scored nothing on them.
pub fn trend(
    records: &[SessionRecord],
    metric: Metric,
    table: &ScoringTable,
    window: usize,
) -> Vec<TrendPoint> {
    let mut recent: Vec<&SessionRecord> = records.iter().collect();
    recent.sort_by_key(|r| Reverse(r.timestamp));
    recent.truncate(window);
    recent.reverse();

    recent
        .into_iter()
        .map(|r| {
            let (score, duration) = metric.measure(r, table);
            TrendPoint {
                timestamp: r.timestamp,
                score: round_to_tenth(score),
                duration,
                practice_type: r.practice_type.clone(),
            }
        })
        .filter(|p| metric == Metric::Total || p.score > 0.0)
        .collect()
}

/// Upper bound for the score axis
pub fn chart_ceiling(points: &[TrendPoint]) -> f64 {
    let highest = points.iter().map(|p| p.score).fold(0.0, f64::max);
    if highest < 1.0 {
        1.0
    } else {
        highest.ceil()
    }
}
