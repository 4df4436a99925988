use std::io::Cursor;
use std::sync::Arc;

use chrono::NaiveDate;

use super::common::*;
use crate::schedule::domain::{
    CompletionField, CompletionMap, CompletionStatus, ExamRecord, SelectionMap, UserProfile,
};
use crate::schedule::keys::{completion_key, legacy_completion_key};
use crate::schedule::loader::load_records_from_json;
use crate::schedule::store::{MemoryStore, Store, StoreKey};
use crate::schedule::{DeviationBand, ExamBoard, Phase, ScheduleError, ScheduleSession};

#[test]
fn opens_at_start_with_empty_state() {
    let (session, _) = open_session();

    assert_eq!(session.phase(), Phase::Start);
    assert_eq!(session.cursor(), 0);
    assert_eq!(session.current_date(), Some("1/22"));
    assert!(session.selections().is_empty());
    assert!(!session.all_selected());
    assert_eq!(session.profile(), &UserProfile::default());
}

#[test]
fn start_persists_profile_and_enters_selection() {
    let (mut session, store) = open_session();

    session.start(UserProfile::new("ハル", 64));

    assert_eq!(session.phase(), Phase::Select);
    assert_eq!(store.raw(StoreKey::UserName).as_deref(), Some("ハル"));
    assert_eq!(store.raw(StoreKey::UserDeviation).as_deref(), Some("64"));
}

#[test]
fn confirm_persists_and_advances_cursor() {
    let (mut session, store) = open_session();
    session.start(UserProfile::default());
    let choice = first_on(session.board(), "1/22");

    let phase = session.confirm("1/22", choice.clone()).expect("confirm succeeds");

    assert_eq!(phase, Phase::Select);
    assert_eq!(session.cursor(), 1);
    assert_eq!(session.selection("1/22"), Some(&choice));
    let persisted: SelectionMap =
        serde_json::from_str(&store.raw(StoreKey::Selections).expect("selections saved"))
            .expect("valid json");
    assert_eq!(persisted.get("1/22"), Some(&choice));
}

#[test]
fn confirming_last_date_moves_to_summary_only_when_all_selected() {
    let (mut session, _) = open_session();
    session.start(UserProfile::default());
    let last = first_on(session.board(), "2/11");

    let phase = session.confirm("2/11", last).expect("confirm succeeds");
    assert_eq!(phase, Phase::Select, "earlier dates still open");
    assert!(!session.finish());

    let first = first_on(session.board(), "1/22");
    session.confirm("1/22", first).expect("confirm succeeds");
    session
        .confirm("2/10", ExamRecord::decline("2/10"))
        .expect("decline succeeds");
    assert_eq!(session.cursor(), 2);

    let again = session.board().records_on("2/11")[1].clone();
    let phase = session.confirm("2/11", again).expect("confirm succeeds");
    assert_eq!(phase, Phase::Summary);
    assert!(session.all_selected());
}

#[test]
fn confirm_rejects_unknown_and_mismatched_dates() {
    let (mut session, _) = open_session();
    let record = first_on(session.board(), "2/10");

    let err = session
        .confirm("3/3", ExamRecord::decline("3/3"))
        .expect_err("unknown date rejected");
    assert_eq!(err, ScheduleError::UnknownDate("3/3".to_string()));

    let err = session
        .confirm("2/11", record)
        .expect_err("mismatched record rejected");
    assert!(matches!(err, ScheduleError::DateMismatch { .. }));
    assert!(session.selections().is_empty());
}

#[test]
fn decline_all_fills_remaining_dates_and_finishes() {
    let (mut session, _) = open_session();
    let chosen = first_on(session.board(), "2/10");
    session.confirm("2/10", chosen.clone()).expect("confirm succeeds");

    let declined = session.decline_all();

    assert_eq!(declined, vec!["1/22".to_string(), "2/11".to_string()]);
    assert_eq!(session.phase(), Phase::Summary);
    assert!(session.all_selected());
    assert!(session.selection("1/22").expect("filled").is_decline());
    assert_eq!(session.selection("2/10"), Some(&chosen));
}

#[test]
fn revisit_repositions_without_touching_selections() {
    let (mut session, _) = open_session();
    session.decline_all();
    let before = session.selections().clone();

    session.revisit("2/10").expect("known date");

    assert_eq!(session.phase(), Phase::Select);
    assert_eq!(session.current_date(), Some("2/10"));
    assert_eq!(session.selections(), &before);
    assert!(matches!(
        session.revisit("9/9"),
        Err(ScheduleError::UnknownDate(_))
    ));
}

#[test]
fn go_to_rejects_out_of_range_index() {
    let (mut session, _) = open_session();
    session.go_to(2).expect("in range");
    assert_eq!(session.current_date(), Some("2/11"));
    assert_eq!(
        session.go_to(3),
        Err(ScheduleError::CursorOutOfRange { index: 3, len: 3 })
    );
}

#[test]
fn toggle_persists_completion_map() {
    let (mut session, store) = open_session();
    let record = first_on(session.board(), "1/22");
    session.confirm("1/22", record.clone()).expect("confirm succeeds");

    let status = session
        .toggle_for_date("1/22", CompletionField::ApplyEnd)
        .expect("selection exists");

    assert!(status.apply_end_done);
    let persisted: CompletionMap =
        serde_json::from_str(&store.raw(StoreKey::Completions).expect("completions saved"))
            .expect("valid json");
    assert_eq!(persisted[&completion_key(&record)], status);
    assert_eq!(
        session.toggle_for_date("2/10", CompletionField::ApplyEnd),
        Err(ScheduleError::NotSelected("2/10".to_string()))
    );
}

#[test]
fn changing_a_selection_prunes_its_old_completion_entry() {
    let (mut session, _) = open_session();
    let first = session.board().records_on("2/10")[0].clone();
    let second = session.board().records_on("2/10")[1].clone();
    session.confirm("2/10", first.clone()).expect("confirm succeeds");
    session.toggle_completion(&completion_key(&first), CompletionField::ExamDate);

    session.confirm("2/10", second.clone()).expect("confirm succeeds");

    let map = session.completions().as_map();
    assert!(!map.contains_key(&completion_key(&first)));
    assert_eq!(map[&completion_key(&second)], CompletionStatus::default());
}

#[test]
fn reset_clears_everything_and_persists_empty_maps() {
    let (mut session, store) = open_session();
    session.decline_all();
    session
        .toggle_for_date("1/22", CompletionField::ExamDate)
        .expect("selection exists");

    session.reset();

    assert_eq!(session.phase(), Phase::Start);
    assert_eq!(session.cursor(), 0);
    assert!(session.selections().is_empty());
    assert!(session.completions().is_empty());
    assert_eq!(store.raw(StoreKey::Selections).as_deref(), Some("{}"));
    assert_eq!(store.raw(StoreKey::Completions).as_deref(), Some("{}"));
}

#[test]
fn open_migrates_legacy_completion_keys_from_store() {
    let store = Arc::new(MemoryStore::default());
    let chosen = record("慶應義塾", "2/10", "一般", Some(73));
    let mut selections = SelectionMap::new();
    selections.insert("2/10".to_string(), chosen.clone());
    let mut legacy = CompletionMap::new();
    legacy.insert(
        legacy_completion_key(&chosen),
        CompletionStatus {
            apply_start_done: true,
            ..CompletionStatus::default()
        },
    );
    legacy.insert("1/1__消えた学校".to_string(), CompletionStatus::default());
    store
        .save(StoreKey::Selections, &serde_json::to_string(&selections).expect("encode"))
        .expect("seed selections");
    store
        .save(StoreKey::Completions, &serde_json::to_string(&legacy).expect("encode"))
        .expect("seed completions");

    let session = ScheduleSession::open(board(), store.clone());

    let status = session.completions().status(&completion_key(&chosen));
    assert!(status.apply_start_done);
    assert_eq!(session.completions().len(), 1);
    let persisted: CompletionMap =
        serde_json::from_str(&store.raw(StoreKey::Completions).expect("rewritten"))
            .expect("valid json");
    assert_eq!(persisted.len(), 1);
    assert!(persisted.contains_key(&completion_key(&chosen)));
}

#[test]
fn migration_rewrites_same_sized_maps_with_different_keys() {
    let store = Arc::new(MemoryStore::default());
    let chosen = record("慶應義塾", "2/10", "一般", Some(73));
    let mut selections = SelectionMap::new();
    selections.insert("2/10".to_string(), chosen.clone());
    let mut legacy = CompletionMap::new();
    legacy.insert(legacy_completion_key(&chosen), CompletionStatus::default());
    store
        .save(StoreKey::Selections, &serde_json::to_string(&selections).expect("encode"))
        .expect("seed selections");
    store
        .save(StoreKey::Completions, &serde_json::to_string(&legacy).expect("encode"))
        .expect("seed completions");

    ScheduleSession::open(board(), store.clone());

    let persisted: CompletionMap =
        serde_json::from_str(&store.raw(StoreKey::Completions).expect("rewritten"))
            .expect("valid json");
    assert!(persisted.contains_key(&completion_key(&chosen)));
    assert!(!persisted.contains_key(&legacy_completion_key(&chosen)));
}

#[test]
fn offline_store_degrades_to_in_memory_state() {
    let mut session = ScheduleSession::open(board(), Arc::new(OfflineStore));
    assert!(session.selections().is_empty());
    assert_eq!(session.profile(), &UserProfile::default());

    let record = first_on(session.board(), "1/22");
    session.confirm("1/22", record.clone()).expect("confirm succeeds");
    assert_eq!(session.selection("1/22"), Some(&record));
}

#[test]
fn summary_lists_committed_schools_with_countdowns() {
    let (mut session, _) = open_session();
    session.start(UserProfile::new("ハル", 66));
    let chosen = first_on(session.board(), "2/10");
    session.confirm("2/10", chosen.clone()).expect("confirm succeeds");
    session.decline_all();
    session
        .toggle_for_date("2/10", CompletionField::ApplyStart)
        .expect("selection exists");

    let today = NaiveDate::from_ymd_opt(2025, 12, 15).expect("valid date");
    let summary = session.summary(today);

    assert_eq!(summary.len(), 1, "declined dates are omitted");
    let entry = &summary[0];
    assert_eq!(entry.record, chosen);
    assert_eq!(entry.key, completion_key(&chosen));
    assert_eq!(entry.band, DeviationBand::Reach);
    assert!(entry.status.apply_start_done);
    let labels: Vec<_> = entry.milestones.iter().map(|m| m.dday.as_str()).collect();
    assert_eq!(labels, vec!["D-5", "D-31", "D-57", "D-59"]);
    assert!(entry.milestones[0].done);
}

#[test]
fn summary_bands_loaded_records_with_extreme_deviations() {
    let payload = r#"[
        {"schoolName": "極端", "deviation": -3000000000, "examName": "一般", "examDate": "2/1"}
    ]"#;
    let records = load_records_from_json(Cursor::new(payload)).expect("json parses");
    assert_eq!(records[0].deviation, Some(i32::MIN));

    let store = Arc::new(MemoryStore::default());
    let mut session = ScheduleSession::open(ExamBoard::from_records(records.clone()), store);
    session.start(UserProfile::new("ハル", 60));
    session
        .confirm("2/1", records[0].clone())
        .expect("confirm succeeds");

    let today = NaiveDate::from_ymd_opt(2025, 12, 1).expect("valid date");
    let summary = session.summary(today);
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].band, DeviationBand::Below);
}
