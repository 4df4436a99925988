//! End-to-end scheduling scenarios driven only through the public API: records are loaded
//! from raw JSON, a session is persisted to disk and reopened, and the summary is checked.

use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use exam_planner::schedule::{
    completion_key, load_records_from_json, CompletionField, ExamBoard, FileStore, Phase,
    ScheduleSession, SortOrder, UserProfile,
};

const RECORDS: &str = r#"[
    {"schoolName": "渋谷教育学園幕張", "area": "千葉市", "deviation": 71, "examName": "1次", "applyStart": "12/15", "applyEnd": "1/16", "examDate": "1/22", "resultDate": "1/25", "annual": "O", "refund": "X"},
    {"schoolName": "栄東", "area": "さいたま市", "deviation": "64", "examName": "A日程", "applyStart": "12/1", "applyEnd": "1/8", "examDate": "1/10", "resultDate": "1/12"},
    {"schoolName": "開成", "area": "荒川区", "deviation": 72, "examName": "一般", "applyStart": "12/20", "applyEnd": "1/26", "examDate": "2/1", "resultDate": "2/3"},
    {"schoolName": "麻布", "area": "港区", "deviation": 69, "examName": "一般", "applyStart": "12/20", "applyEnd": "1/26", "examDate": "2/1", "resultDate": "2/2"},
    {"schoolName": "聖光学院", "deviation": null, "examName": "第1回", "examDate": "2/2"},
    {"schoolName": "未定校", "examDate": ""}
]"#;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("exam-planner-{name}-{}", std::process::id()));
    fs::remove_dir_all(&dir).ok();
    dir
}

fn board() -> ExamBoard {
    let records = load_records_from_json(Cursor::new(RECORDS)).expect("records load");
    ExamBoard::from_records(records)
}

#[test]
fn selections_survive_reopening_the_session() {
    let dir = scratch_dir("reopen");
    let store = Arc::new(FileStore::new(&dir));

    let mut session = ScheduleSession::open(board(), store.clone());
    assert_eq!(session.board().dates(), &["1/10", "1/22", "2/1", "2/2"]);
    session.start(UserProfile::new("  ", 68));
    assert_eq!(session.profile().name, "シア");

    let top = session.candidates(SortOrder::DeviationDesc);
    assert_eq!(top[0].school_name, "栄東");
    session.confirm("1/10", top[0].clone()).expect("confirm 1/10");

    let on_22 = session.candidates(SortOrder::NameAsc);
    session.confirm("1/22", on_22[0].clone()).expect("confirm 1/22");

    let on_feb_1 = session.candidates(SortOrder::DeviationDesc);
    assert_eq!(on_feb_1[0].school_name, "開成");
    session.confirm("2/1", on_feb_1[1].clone()).expect("confirm 2/1");

    let decline = session.decline_option().expect("cursor on 2/2");
    let phase = session.confirm("2/2", decline).expect("decline 2/2");
    assert_eq!(phase, Phase::Summary);

    session
        .toggle_for_date("2/1", CompletionField::ApplyEnd)
        .expect("2/1 selected");

    let reopened = ScheduleSession::open(board(), store);
    assert_eq!(reopened.profile().deviation, 68);
    assert!(reopened.all_selected());
    let azabu = reopened.selection("2/1").expect("persisted selection");
    assert_eq!(azabu.school_name, "麻布");
    assert!(reopened
        .completions()
        .status(&completion_key(azabu))
        .apply_end_done);

    let today = NaiveDate::from_ymd_opt(2025, 12, 31).expect("valid date");
    let summary = reopened.summary(today);
    let schools: Vec<_> = summary
        .iter()
        .map(|entry| entry.record.school_name.as_str())
        .collect();
    assert_eq!(schools, vec!["栄東", "渋谷教育学園幕張", "麻布"]);
    assert_eq!(summary[2].milestones[2].dday, "D-32");

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn reset_leaves_empty_state_on_disk() {
    let dir = scratch_dir("reset");
    let store = Arc::new(FileStore::new(&dir));

    let mut session = ScheduleSession::open(board(), store.clone());
    session.decline_all();
    session.reset();

    let reopened = ScheduleSession::open(board(), store);
    assert!(reopened.selections().is_empty());
    assert!(reopened.completions().is_empty());
    assert_eq!(reopened.phase(), Phase::Start);

    fs::remove_dir_all(&dir).ok();
}
