use crate::record::{SessionInputs, SessionRecord};
use crate::section::{Domain, ScoringGroup, ScoringTable, SubSection};
use chrono::{DateTime, Local};
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

pub const FULL_EXAM: &str = "Full Exam";
pub const MIXED_DRILL: &str = "Mixed Drill";

/// Rejections raised before a record is created. None of them touch stored data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    #[error("select at least one section to record")]
    NothingAttempted,
    #[error("attempted sections need a duration greater than 0 minutes: {}", join_ids(.0))]
    MissingDuration(Vec<SubSection>),
    #[error("attempted sections recorded a score of 0 and need confirmation: {}", join_ids(.0))]
    UnconfirmedZeroScores(Vec<SubSection>),
}

fn join_ids(subs: &[SubSection]) -> String {
    subs.iter().map(SubSection::id).join(", ")
}

/// Raw form/timer input for one practice session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawInput {
    pub counts: BTreeMap<SubSection, u32>,
    pub attempted: BTreeSet<SubSection>,
    pub durations: BTreeMap<SubSection, u32>,
}

impl RawInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_count(&mut self, sub: SubSection, count: u32) -> &mut Self {
        self.counts.insert(sub, count);
        self
    }

    pub fn set_minutes(&mut self, sub: SubSection, minutes: u32) -> &mut Self {
        self.durations.insert(sub, minutes);
        self
    }

    pub fn attempt(&mut self, sub: SubSection) -> &mut Self {
        self.attempted.insert(sub);
        self
    }

    /// Marks `sub` as not attempted and discards its count and time
    pub fn skip(&mut self, sub: SubSection) -> &mut Self {
        self.attempted.remove(&sub);
        self.counts.remove(&sub);
        self.durations.remove(&sub);
        self
    }

    /// Adds stopwatch minutes to `sub`; logging time implies an attempt
    pub fn log_minutes(&mut self, sub: SubSection, minutes: u32) -> &mut Self {
        *self.durations.entry(sub).or_insert(0) += minutes;
        self.attempted.insert(sub);
        self
    }

    pub fn is_attempted(&self, sub: SubSection) -> bool {
        self.attempted.contains(&sub)
    }

    pub fn duration(&self, sub: SubSection) -> u32 {
        self.durations.get(&sub).copied().unwrap_or(0)
    }

    /// Count that contributes to scoring: skipped sub-sections count as 0
    pub fn effective_count(&self, sub: SubSection) -> u32 {
        if self.is_attempted(sub) {
            self.counts.get(&sub).copied().unwrap_or(0)
        } else {
            0
        }
    }

    /// Rebuilds the input bundle a stored record was created from
    pub fn from_record(record: &SessionRecord) -> Self {
        let mut input = Self::new();
        for sub in SubSection::ALL {
            if record.is_attempted(sub) {
                input.attempt(sub);
            }
            let count = record.count(sub);
            if count > 0 {
                input.set_count(sub, count);
            }
            let minutes = record.duration(sub);
            if minutes > 0 {
                input.set_minutes(sub, minutes);
            }
        }
        input
    }
}

/// Outcome of a successful validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    /// Attempted sub-sections whose count is exactly 0
    pub requires_confirmation: Vec<SubSection>,
}

impl Validation {
    pub fn needs_confirmation(&self) -> bool {
        !self.requires_confirmation.is_empty()
    }
}

/// Whether the caller has acknowledged zero-but-attempted sub-sections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Pending,
    ZeroScoresConfirmed,
}

pub fn validate(input: &RawInput) -> Result<Validation, ScoreError> {
    if input.attempted.is_empty() {
        return Err(ScoreError::NothingAttempted);
    }

    let missing: Vec<SubSection> = SubSection::ALL
        .into_iter()
        .filter(|s| s.is_timed() && input.is_attempted(*s) && input.duration(*s) == 0)
        .collect();
    if !missing.is_empty() {
        return Err(ScoreError::MissingDuration(missing));
    }

    let requires_confirmation = SubSection::ALL
        .into_iter()
        .filter(|s| input.is_attempted(*s) && input.effective_count(*s) == 0)
        .collect();

    Ok(Validation {
        requires_confirmation,
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DomainScores {
    pub listening: f64,
    pub reading: f64,
    pub writing: f64,
    pub translation: f64,
}

impl DomainScores {
    pub fn get(&self, domain: Domain) -> f64 {
        match domain {
            Domain::Listening => self.listening,
            Domain::Reading => self.reading,
            Domain::Writing => self.writing,
            Domain::Translation => self.translation,
        }
    }

    fn get_mut(&mut self, domain: Domain) -> &mut f64 {
        match domain {
            Domain::Listening => &mut self.listening,
            Domain::Reading => &mut self.reading,
            Domain::Writing => &mut self.writing,
            Domain::Translation => &mut self.translation,
        }
    }

    pub fn total(&self) -> f64 {
        self.listening + self.reading + self.writing + self.translation
    }
}

/// Weighted score of one group: members are summed before the shared weight applies
pub fn group_score(input: &RawInput, group: ScoringGroup, table: &ScoringTable) -> f64 {
    let items: u32 = group
        .members()
        .iter()
        .map(|s| input.effective_count(*s))
        .sum();
    f64::from(items) * table.weight(group)
}

pub fn score(input: &RawInput, table: &ScoringTable) -> DomainScores {
    let mut scores = DomainScores::default();
    for group in ScoringGroup::ALL {
        *scores.get_mut(group.domain()) += group_score(input, group, table);
    }
    scores
}

pub fn practice_type(attempted: &BTreeSet<SubSection>) -> String {
    let present: Vec<Domain> = Domain::ALL
        .into_iter()
        .filter(|d| attempted.iter().any(|s| s.domain() == *d))
        .collect();

    match present.len() {
        4 => FULL_EXAM.to_string(),
        n if n > 2 => MIXED_DRILL.to_string(),
        _ => present.iter().map(Domain::label).join(" & "),
    }
}

pub fn total_duration(durations: &BTreeMap<SubSection, u32>) -> u32 {
    durations.values().sum()
}

/// Turns validated input into session records
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    table: ScoringTable,
}

impl Scorer {
    pub fn new(table: ScoringTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &ScoringTable {
        &self.table
    }

    pub fn build(
        &self,
        input: &RawInput,
        confirmation: Confirmation,
        now: DateTime<Local>,
    ) -> Result<SessionRecord, ScoreError> {
        let input = self.clamped(input);
        let validation = validate(&input)?;
        if validation.needs_confirmation() && confirmation == Confirmation::Pending {
            return Err(ScoreError::UnconfirmedZeroScores(
                validation.requires_confirmation,
            ));
        }

        let scores = score(&input, &self.table);
        let mut inputs = SessionInputs::default();
        for sub in SubSection::ALL {
            inputs.set_count(sub, input.effective_count(sub));
        }
        let durations: BTreeMap<SubSection, u32> = input
            .durations
            .iter()
            .filter(|(sub, _)| sub.is_timed() && input.is_attempted(**sub))
            .map(|(sub, minutes)| (*sub, *minutes))
            .collect();
        let attempts = SubSection::ALL
            .into_iter()
            .map(|s| (s, input.is_attempted(s)))
            .collect();

        let record = SessionRecord {
            id: now.timestamp_millis().to_string(),
            timestamp: now.timestamp_millis(),
            duration_minutes: total_duration(&durations),
            practice_type: practice_type(&input.attempted),
            inputs: SessionInputs {
                durations: Some(durations),
                ..inputs
            },
            attempts: Some(attempts),
            score_listening: scores.listening,
            score_reading: scores.reading,
            score_writing: scores.writing,
            score_translation: scores.translation,
            total_score: scores.total(),
        };
        log::debug!(
            "scored session {} as '{}' with total {:.1}",
            record.id,
            record.practice_type,
            record.total_score
        );
        Ok(record)
    }

    fn clamped(&self, input: &RawInput) -> RawInput {
        let mut input = input.clone();
        for (sub, count) in input.counts.iter_mut() {
            let max = self.table.max_count(*sub);
            if *count > max {
                log::warn!("{sub} count {count} exceeds maximum {max}, clamping");
                *count = max;
            }
        }
        input
    }
}
