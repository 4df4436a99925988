use std::sync::Arc;

use crate::schedule::domain::ExamRecord;
use crate::schedule::store::{MemoryStore, Store, StoreError, StoreKey};
use crate::schedule::{ExamBoard, ScheduleSession};

pub(super) fn record(
    school: &str,
    exam_date: &str,
    exam_name: &str,
    deviation: Option<i32>,
) -> ExamRecord {
    ExamRecord {
        school_name: school.to_string(),
        area: "東京".to_string(),
        deviation,
        category: String::new(),
        exam_name: exam_name.to_string(),
        apply_start: "12/20".to_string(),
        apply_end: "1/15".to_string(),
        exam_date: exam_date.to_string(),
        result_date: "2/12".to_string(),
        annual: "O".to_string(),
        refund: "X".to_string(),
    }
}

pub(super) fn sample_records() -> Vec<ExamRecord> {
    vec![
        record("早稲田実業", "2/10", "一般", Some(70)),
        record("慶應義塾", "2/10", "一般", Some(73)),
        record("明大明治", "2/11", "一般", Some(66)),
        record("青山学院", "1/22", "推薦", Some(68)),
        record("明大明治", "2/11", "帰国", Some(64)),
    ]
}

pub(super) fn board() -> ExamBoard {
    ExamBoard::from_records(sample_records())
}

pub(super) fn open_session() -> (ScheduleSession<MemoryStore>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let session = ScheduleSession::open(board(), store.clone());
    (session, store)
}

pub(super) fn first_on(board: &ExamBoard, date: &str) -> ExamRecord {
    board
        .records_on(date)
        .first()
        .cloned()
        .expect("date has records")
}

/// Store whose every operation fails.
pub(super) struct OfflineStore;

impl Store for OfflineStore {
    fn load(&self, _key: StoreKey) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("disk offline".to_string()))
    }

    fn save(&self, _key: StoreKey, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("disk offline".to_string()))
    }
}
