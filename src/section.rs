use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One of the four scored parts of the exam
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Listening,
    Reading,
    Writing,
    Translation,
}

impl Domain {
    pub const ALL: [Domain; 4] = [
        Domain::Listening,
        Domain::Reading,
        Domain::Writing,
        Domain::Translation,
    ];

    /// Fragment used when building a practice-type label
    pub fn label(&self) -> &'static str {
        match self {
            Domain::Listening => "Listening",
            Domain::Reading => "Reading",
            Domain::Writing => "Writing",
            Domain::Translation => "Trans",
        }
    }

    pub fn sub_sections(&self) -> impl Iterator<Item = SubSection> + '_ {
        SubSection::ALL.into_iter().filter(move |s| s.domain() == *self)
    }
}

/// A gradable unit of the exam; the serialized id is stable across records,
/// attempt maps and duration maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SubSection {
    #[serde(rename = "l_lc1")]
    LongConversation1,
    #[serde(rename = "l_lc2")]
    LongConversation2,
    #[serde(rename = "l_p1")]
    Passage1,
    #[serde(rename = "l_p2")]
    Passage2,
    #[serde(rename = "l_lec1")]
    Lecture1,
    #[serde(rename = "l_lec2")]
    Lecture2,
    #[serde(rename = "l_lec3")]
    Lecture3,
    #[serde(rename = "r_bc")]
    BankedCloze,
    #[serde(rename = "r_mat")]
    Matching,
    #[serde(rename = "r_cr1")]
    CarefulReading1,
    #[serde(rename = "r_cr2")]
    CarefulReading2,
    #[serde(rename = "w_writ")]
    Writing,
    #[serde(rename = "t_trans")]
    Translation,
}

impl SubSection {
    pub const ALL: [SubSection; 13] = [
        SubSection::LongConversation1,
        SubSection::LongConversation2,
        SubSection::Passage1,
        SubSection::Passage2,
        SubSection::Lecture1,
        SubSection::Lecture2,
        SubSection::Lecture3,
        SubSection::BankedCloze,
        SubSection::Matching,
        SubSection::CarefulReading1,
        SubSection::CarefulReading2,
        SubSection::Writing,
        SubSection::Translation,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            SubSection::LongConversation1 => "l_lc1",
            SubSection::LongConversation2 => "l_lc2",
            SubSection::Passage1 => "l_p1",
            SubSection::Passage2 => "l_p2",
            SubSection::Lecture1 => "l_lec1",
            SubSection::Lecture2 => "l_lec2",
            SubSection::Lecture3 => "l_lec3",
            SubSection::BankedCloze => "r_bc",
            SubSection::Matching => "r_mat",
            SubSection::CarefulReading1 => "r_cr1",
            SubSection::CarefulReading2 => "r_cr2",
            SubSection::Writing => "w_writ",
            SubSection::Translation => "t_trans",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SubSection::LongConversation1 => "Long Conv 1",
            SubSection::LongConversation2 => "Long Conv 2",
            SubSection::Passage1 => "Passage 1",
            SubSection::Passage2 => "Passage 2",
            SubSection::Lecture1 => "Lecture 1",
            SubSection::Lecture2 => "Lecture 2",
            SubSection::Lecture3 => "Lecture 3",
            SubSection::BankedCloze => "Banked Cloze",
            SubSection::Matching => "Matching",
            SubSection::CarefulReading1 => "Careful Reading 1",
            SubSection::CarefulReading2 => "Careful Reading 2",
            SubSection::Writing => "Writing",
            SubSection::Translation => "Translation",
        }
    }

    pub fn group(&self) -> ScoringGroup {
        match self {
            SubSection::LongConversation1 | SubSection::LongConversation2 => {
                ScoringGroup::LongConversation
            }
            SubSection::Passage1 | SubSection::Passage2 => ScoringGroup::Passage,
            SubSection::Lecture1 | SubSection::Lecture2 | SubSection::Lecture3 => {
                ScoringGroup::Lecture
            }
            SubSection::BankedCloze => ScoringGroup::BankedCloze,
            SubSection::Matching => ScoringGroup::Matching,
            SubSection::CarefulReading1 | SubSection::CarefulReading2 => {
                ScoringGroup::CarefulReading
            }
            SubSection::Writing => ScoringGroup::Writing,
            SubSection::Translation => ScoringGroup::Translation,
        }
    }

    pub fn domain(&self) -> Domain {
        self.group().domain()
    }

    /// Listening is played from audio and never timed by hand
    pub fn is_timed(&self) -> bool {
        self.domain() != Domain::Listening
    }
}

impl fmt::Display for SubSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sub-section id '{0}'")]
pub struct UnknownSubSection(pub String);

impl FromStr for SubSection {
    type Err = UnknownSubSection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        SubSection::ALL
            .into_iter()
            .find(|sub| sub.id() == needle)
            .ok_or_else(|| UnknownSubSection(s.to_string()))
    }
}

/// Sub-sections that share one per-item weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringGroup {
    LongConversation,
    Passage,
    Lecture,
    BankedCloze,
    Matching,
    CarefulReading,
    Writing,
    Translation,
}

impl ScoringGroup {
    pub const ALL: [ScoringGroup; 8] = [
        ScoringGroup::LongConversation,
        ScoringGroup::Passage,
        ScoringGroup::Lecture,
        ScoringGroup::BankedCloze,
        ScoringGroup::Matching,
        ScoringGroup::CarefulReading,
        ScoringGroup::Writing,
        ScoringGroup::Translation,
    ];

    pub fn members(&self) -> &'static [SubSection] {
        match self {
            ScoringGroup::LongConversation => {
                &[SubSection::LongConversation1, SubSection::LongConversation2]
            }
            ScoringGroup::Passage => &[SubSection::Passage1, SubSection::Passage2],
            ScoringGroup::Lecture => &[
                SubSection::Lecture1,
                SubSection::Lecture2,
                SubSection::Lecture3,
            ],
            ScoringGroup::BankedCloze => &[SubSection::BankedCloze],
            ScoringGroup::Matching => &[SubSection::Matching],
            ScoringGroup::CarefulReading => {
                &[SubSection::CarefulReading1, SubSection::CarefulReading2]
            }
            ScoringGroup::Writing => &[SubSection::Writing],
            ScoringGroup::Translation => &[SubSection::Translation],
        }
    }

    pub fn domain(&self) -> Domain {
        match self {
            ScoringGroup::LongConversation | ScoringGroup::Passage | ScoringGroup::Lecture => {
                Domain::Listening
            }
            ScoringGroup::BankedCloze | ScoringGroup::Matching | ScoringGroup::CarefulReading => {
                Domain::Reading
            }
            ScoringGroup::Writing => Domain::Writing,
            ScoringGroup::Translation => Domain::Translation,
        }
    }

    /// Split groups (several passages or conversations) get partial-attempt normalization
    pub fn is_split(&self) -> bool {
        self.members().len() > 1
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoringGroup::LongConversation => "Long Conversation",
            ScoringGroup::Passage => "Passages",
            ScoringGroup::Lecture => "Lectures",
            ScoringGroup::BankedCloze => "Banked Cloze",
            ScoringGroup::Matching => "Matching",
            ScoringGroup::CarefulReading => "Careful Reading",
            ScoringGroup::Writing => "Writing",
            ScoringGroup::Translation => "Translation",
        }
    }
}

/// Per-item weights and item ceilings shared by the scorer and the normalizer.
///
/// `Default` is the official table; tests and config may supply another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringTable {
    weights: BTreeMap<ScoringGroup, f64>,
    max_counts: BTreeMap<SubSection, u32>,
}

impl ScoringTable {
    pub fn new(
        weights: BTreeMap<ScoringGroup, f64>,
        max_counts: BTreeMap<SubSection, u32>,
    ) -> Self {
        Self {
            weights,
            max_counts,
        }
    }

    pub fn weight(&self, group: ScoringGroup) -> f64 {
        self.weights.get(&group).copied().unwrap_or(0.0)
    }

    pub fn max_count(&self, sub: SubSection) -> u32 {
        self.max_counts.get(&sub).copied().unwrap_or(0)
    }

    pub fn group_max_items(&self, group: ScoringGroup) -> u32 {
        group.members().iter().map(|s| self.max_count(*s)).sum()
    }

    pub fn clamp(&self, sub: SubSection, raw: i64) -> u32 {
        raw.clamp(0, i64::from(self.max_count(sub))) as u32
    }

    pub fn with_weight(mut self, group: ScoringGroup, weight: f64) -> Self {
        self.weights.insert(group, weight);
        self
    }

    pub fn with_max_count(mut self, sub: SubSection, max: u32) -> Self {
        self.max_counts.insert(sub, max);
        self
    }
}

impl Default for ScoringTable {
    fn default() -> Self {
        let weights = BTreeMap::from([
            (ScoringGroup::LongConversation, 7.1),
            (ScoringGroup::Passage, 7.1),
            (ScoringGroup::Lecture, 14.2),
            (ScoringGroup::BankedCloze, 3.55),
            (ScoringGroup::Matching, 7.1),
            (ScoringGroup::CarefulReading, 14.2),
            // the 0-15 rubric score is scaled onto the composite with the same multiplier
            (ScoringGroup::Writing, 7.1),
            (ScoringGroup::Translation, 7.1),
        ]);
        let max_counts = BTreeMap::from([
            (SubSection::LongConversation1, 4),
            (SubSection::LongConversation2, 4),
            (SubSection::Passage1, 3),
            (SubSection::Passage2, 4),
            (SubSection::Lecture1, 3),
            (SubSection::Lecture2, 3),
            (SubSection::Lecture3, 4),
            (SubSection::BankedCloze, 10),
            (SubSection::Matching, 10),
            (SubSection::CarefulReading1, 5),
            (SubSection::CarefulReading2, 5),
            (SubSection::Writing, 15),
            (SubSection::Translation, 15),
        ]);
        Self::new(weights, max_counts)
    }
}
