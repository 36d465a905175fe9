use assert_matches::assert_matches;
use cetlog::scorer::{validate, FULL_EXAM};
use cetlog::stats::{normalized_group_average, summarize};
use cetlog::store::{JsonSessionStore, SessionStore, SqliteSessionStore};
use cetlog::{
    Confirmation, RawInput, ScoreError, Scorer, ScoringGroup, ScoringTable, SessionRecord,
    SubSection,
};
use chrono::{Local, TimeZone};
use tempfile::tempdir;

/// End-to-end scoring scenarios: raw input through the scorer, into a store,
/// and back out through the normalizer.

fn at(ms: i64) -> chrono::DateTime<Local> {
    Local.timestamp_millis_opt(ms).unwrap()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn build(ms: i64, input: &RawInput) -> SessionRecord {
    Scorer::default()
        .build(input, Confirmation::ZeroScoresConfirmed, at(ms))
        .unwrap()
}

fn full_mock(ms: i64, per_item: u32) -> SessionRecord {
    let table = ScoringTable::default();
    let mut input = RawInput::new();
    for sub in SubSection::ALL {
        input.attempt(sub).set_count(sub, per_item.min(table.max_count(sub)));
        if sub.is_timed() {
            input.set_minutes(sub, 10);
        }
    }
    build(ms, &input)
}

#[test]
fn scenario_single_conversation_projects_to_group() {
    let mut input = RawInput::new();
    input
        .attempt(SubSection::LongConversation1)
        .set_count(SubSection::LongConversation1, 4);
    let record = build(1, &input);
    assert_eq!(record.practice_type, "Listening");
    assert!(close(record.score_listening, 28.4));

    let avg = normalized_group_average(
        &[record],
        ScoringGroup::LongConversation,
        &ScoringTable::default(),
    )
    .unwrap();
    assert!(close(avg, 4.0 * (8.0 / 4.0) * 7.1));
}

#[test]
fn scenario_one_careful_passage() {
    let mut input = RawInput::new();
    input
        .log_minutes(SubSection::CarefulReading1, 9)
        .set_count(SubSection::CarefulReading1, 3);
    let record = build(1, &input);
    let avg = normalized_group_average(
        &[record],
        ScoringGroup::CarefulReading,
        &ScoringTable::default(),
    )
    .unwrap();
    assert!(close(avg, 85.2));
}

#[test]
fn scenario_timed_zero_writing_and_translation_need_confirmation() {
    let mut input = RawInput::new();
    input
        .log_minutes(SubSection::Writing, 30)
        .log_minutes(SubSection::Translation, 30);
    let validation = validate(&input).unwrap();
    assert_eq!(
        validation.requires_confirmation,
        vec![SubSection::Writing, SubSection::Translation]
    );
    assert_matches!(
        Scorer::default().build(&input, Confirmation::Pending, at(1)),
        Err(ScoreError::UnconfirmedZeroScores(ids)) if ids.len() == 2
    );
}

#[test]
fn scenario_nothing_attempted_is_rejected() {
    let input = RawInput::new();
    assert_eq!(validate(&input), Err(ScoreError::NothingAttempted));
    assert_matches!(
        Scorer::default().build(&input, Confirmation::ZeroScoresConfirmed, at(1)),
        Err(ScoreError::NothingAttempted)
    );
}

#[test]
fn missing_duration_rejects_before_confirmation() {
    let mut input = RawInput::new();
    input.attempt(SubSection::Matching).attempt(SubSection::Lecture3);
    assert_eq!(
        validate(&input),
        Err(ScoreError::MissingDuration(vec![SubSection::Matching]))
    );
}

#[test]
fn summary_over_mixed_history() {
    let mut drill = RawInput::new();
    drill
        .log_minutes(SubSection::BankedCloze, 12)
        .set_count(SubSection::BankedCloze, 6);
    let records = vec![
        full_mock(1_000, 3),
        build(3_000, &drill),
        full_mock(2_000, 2),
    ];
    let summary = summarize(&records, &ScoringTable::default());

    assert_eq!(summary.overview.session_count, 3);
    assert!(summary.overview.best_full_score > 0.0);
    assert_eq!(summary.overview.best_full_score, records[0].total_score);
    assert!(close(
        summary.overview.mean_full_score,
        (records[0].total_score + records[2].total_score) / 2.0
    ));
    let latest = summary.overview.latest.as_ref().unwrap();
    assert_eq!(latest.practice_type, "Reading");

    let banked = summary
        .breakdown
        .iter()
        .find(|g| g.group == ScoringGroup::BankedCloze)
        .unwrap();
    assert!(close(banked.average.unwrap(), (3.0 + 2.0 + 6.0) * 3.55 / 3.0));
    assert!(records.iter().filter(|r| r.practice_type == FULL_EXAM).count() == 2);
}

#[test]
fn stored_records_keep_their_scores() {
    let dir = tempdir().unwrap();
    let records = vec![full_mock(1_000, 4), full_mock(2_000, 1)];

    let json = JsonSessionStore::with_path(dir.path().join("records.json"));
    json.save(&records).unwrap();
    assert_eq!(json.load(), records);

    let sqlite = SqliteSessionStore::open(dir.path().join("records.db")).unwrap();
    sqlite.save(&records).unwrap();
    let reloaded = sqlite.load();
    for (a, b) in records.iter().zip(&reloaded) {
        assert_eq!(a.total_score, b.total_score);
        assert_eq!(a.scores(), b.scores());
        assert_eq!(a.practice_type, b.practice_type);
    }
}

#[test]
fn corrupt_history_loads_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("records.json");
    std::fs::write(&path, "[{\"id\": 12").unwrap();
    let store = JsonSessionStore::with_path(&path);
    assert!(store.load().is_empty());
    let summary = summarize(&store.load(), &ScoringTable::default());
    assert_eq!(summary.overview.session_count, 0);
    assert!(summary.breakdown.iter().all(|g| g.average.is_none()));
}

#[test]
fn legacy_history_file_is_readable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("records.json");
    std::fs::write(
        &path,
        r#"[{
            "id": "1",
            "timestamp": 1700000000000,
            "durationMinutes": 0,
            "practiceType": "Reading",
            "inputs": {
                "listening": {},
                "reading": { "carefulReading2": 4 },
                "others": {}
            },
            "scoreListening": 0,
            "scoreReading": 56.8,
            "scoreWriting": 0,
            "scoreTranslation": 0,
            "totalScore": 56.8
        }]"#,
    )
    .unwrap();
    let records = JsonSessionStore::with_path(&path).load();
    assert_eq!(records.len(), 1);
    let avg = normalized_group_average(
        &records,
        ScoringGroup::CarefulReading,
        &ScoringTable::default(),
    )
    .unwrap();
    assert!(close(avg, 4.0 * 2.0 * 14.2));
}
