use crate::scorer::{DomainScores, FULL_EXAM};
use crate::section::SubSection;
use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListeningCounts {
    pub long_conversation1: u32,
    pub long_conversation2: u32,
    pub passage1: u32,
    pub passage2: u32,
    pub lectures1: u32,
    pub lectures2: u32,
    pub lectures3: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadingCounts {
    pub banked_cloze: u32,
    pub matching: u32,
    pub careful_reading1: u32,
    pub careful_reading2: u32,
}

/// Writing and translation hold the 0-15 rubric score directly
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OtherCounts {
    pub writing: u32,
    pub translation: u32,
}

/// Raw item counts as stored on a record, grouped the way the history file keeps them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInputs {
    #[serde(default)]
    pub listening: ListeningCounts,
    #[serde(default)]
    pub reading: ReadingCounts,
    #[serde(default)]
    pub others: OtherCounts,
    /// Minutes per timed sub-section; absent on records written before timing existed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub durations: Option<BTreeMap<SubSection, u32>>,
}

impl SessionInputs {
    pub fn count(&self, sub: SubSection) -> u32 {
        match sub {
            SubSection::LongConversation1 => self.listening.long_conversation1,
            SubSection::LongConversation2 => self.listening.long_conversation2,
            SubSection::Passage1 => self.listening.passage1,
            SubSection::Passage2 => self.listening.passage2,
            SubSection::Lecture1 => self.listening.lectures1,
            SubSection::Lecture2 => self.listening.lectures2,
            SubSection::Lecture3 => self.listening.lectures3,
            SubSection::BankedCloze => self.reading.banked_cloze,
            SubSection::Matching => self.reading.matching,
            SubSection::CarefulReading1 => self.reading.careful_reading1,
            SubSection::CarefulReading2 => self.reading.careful_reading2,
            SubSection::Writing => self.others.writing,
            SubSection::Translation => self.others.translation,
        }
    }

    pub fn set_count(&mut self, sub: SubSection, value: u32) {
        let slot = match sub {
            SubSection::LongConversation1 => &mut self.listening.long_conversation1,
            SubSection::LongConversation2 => &mut self.listening.long_conversation2,
            SubSection::Passage1 => &mut self.listening.passage1,
            SubSection::Passage2 => &mut self.listening.passage2,
            SubSection::Lecture1 => &mut self.listening.lectures1,
            SubSection::Lecture2 => &mut self.listening.lectures2,
            SubSection::Lecture3 => &mut self.listening.lectures3,
            SubSection::BankedCloze => &mut self.reading.banked_cloze,
            SubSection::Matching => &mut self.reading.matching,
            SubSection::CarefulReading1 => &mut self.reading.careful_reading1,
            SubSection::CarefulReading2 => &mut self.reading.careful_reading2,
            SubSection::Writing => &mut self.others.writing,
            SubSection::Translation => &mut self.others.translation,
        };
        *slot = value;
    }

    pub fn duration(&self, sub: SubSection) -> u32 {
        self.durations
            .as_ref()
            .and_then(|d| d.get(&sub).copied())
            .unwrap_or(0)
    }
}

/// One saved practice entry. Scores and practice type are fixed at creation
/// and never re-derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    /// Epoch milliseconds
    pub timestamp: i64,
    #[serde(default)]
    pub duration_minutes: u32,
    pub practice_type: String,
    pub inputs: SessionInputs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<BTreeMap<SubSection, bool>>,
    pub score_listening: f64,
    pub score_reading: f64,
    pub score_writing: f64,
    pub score_translation: f64,
    pub total_score: f64,
}

impl SessionRecord {
    pub fn count(&self, sub: SubSection) -> u32 {
        self.inputs.count(sub)
    }

    pub fn duration(&self, sub: SubSection) -> u32 {
        self.inputs.duration(sub)
    }

    pub fn explicit_attempt(&self, sub: SubSection) -> Option<bool> {
        self.attempts.as_ref().and_then(|a| a.get(&sub).copied())
    }

    /// Whether `sub` was attempted in this session.
    ///
    /// Records saved before attempts were tracked carry no attempt map; for
    /// those a non-zero count is taken as an attempt and a zero as skipped.
    /// Stored history depends on this reading, so it must stay as is.
    pub fn is_attempted(&self, sub: SubSection) -> bool {
        self.explicit_attempt(sub)
            .unwrap_or_else(|| legacy_attempt_guess(self.count(sub)))
    }

    pub fn is_full_exam(&self) -> bool {
        self.practice_type == FULL_EXAM
    }

    pub fn scores(&self) -> DomainScores {
        DomainScores {
            listening: self.score_listening,
            reading: self.score_reading,
            writing: self.score_writing,
            translation: self.score_translation,
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Local>> {
        Local.timestamp_millis_opt(self.timestamp).single()
    }
}

fn legacy_attempt_guess(count: u32) -> bool {
    count > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY_JSON: &str = r#"{
        "id": "1700000000000",
        "timestamp": 1700000000000,
        "durationMinutes": 0,
        "practiceType": "Listening",
        "inputs": {
            "listening": {
                "longConversation1": 3, "longConversation2": 0,
                "passage1": 0, "passage2": 0,
                "lectures1": 0, "lectures2": 0, "lectures3": 0
            },
            "reading": { "bankedCloze": 0, "matching": 0, "carefulReading1": 0, "carefulReading2": 0 },
            "others": { "writing": 0, "translation": 0 }
        },
        "scoreListening": 21.299999999999997,
        "scoreReading": 0,
        "scoreWriting": 0,
        "scoreTranslation": 0,
        "totalScore": 21.299999999999997
    }"#;

    #[test]
    fn test_legacy_record_deserializes() {
        let record: SessionRecord = serde_json::from_str(LEGACY_JSON).unwrap();
        assert_eq!(record.attempts, None);
        assert_eq!(record.inputs.durations, None);
        assert_eq!(record.count(SubSection::LongConversation1), 3);
        assert_eq!(record.duration(SubSection::BankedCloze), 0);
        assert_eq!(record.total_score, 21.299999999999997);
    }

    #[test]
    fn test_legacy_attempt_fallback() {
        let record: SessionRecord = serde_json::from_str(LEGACY_JSON).unwrap();
        assert!(record.is_attempted(SubSection::LongConversation1));
        assert!(!record.is_attempted(SubSection::LongConversation2));
        assert_eq!(record.explicit_attempt(SubSection::LongConversation1), None);
    }

    #[test]
    fn test_explicit_attempt_wins_over_count() {
        let mut record: SessionRecord = serde_json::from_str(LEGACY_JSON).unwrap();
        record.attempts = Some(BTreeMap::from([
            (SubSection::LongConversation1, false),
            (SubSection::Writing, true),
        ]));
        assert!(!record.is_attempted(SubSection::LongConversation1));
        assert!(record.is_attempted(SubSection::Writing));
        // keys missing from the map still use the count
        assert!(!record.is_attempted(SubSection::Passage1));
    }

    #[test]
    fn test_serialized_shape_uses_history_keys() {
        let mut record: SessionRecord = serde_json::from_str(LEGACY_JSON).unwrap();
        record.inputs.durations = Some(BTreeMap::from([(SubSection::BankedCloze, 12)]));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["practiceType"], "Listening");
        assert_eq!(value["inputs"]["listening"]["longConversation1"], 3);
        assert_eq!(value["inputs"]["durations"]["r_bc"], 12);
        assert!(value.get("attempts").is_none());
    }

    #[test]
    fn test_set_count_addresses_each_sub_section() {
        let mut inputs = SessionInputs::default();
        for (i, sub) in SubSection::ALL.into_iter().enumerate() {
            inputs.set_count(sub, i as u32 + 1);
        }
        for (i, sub) in SubSection::ALL.into_iter().enumerate() {
            assert_eq!(inputs.count(sub), i as u32 + 1);
        }
    }

    #[test]
    fn test_created_at() {
        let record: SessionRecord = serde_json::from_str(LEGACY_JSON).unwrap();
        let created = record.created_at().unwrap();
        assert_eq!(created.timestamp_millis(), 1_700_000_000_000);
    }
}
