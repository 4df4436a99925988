//! Calculator scenarios exercised through the public service facade and HTTP router.

mod common {
    use std::collections::{BTreeMap, HashMap};
    use std::sync::{Arc, Mutex};

    use exam_planner::calculator::{
        CalculatorService, CalculatorSnapshot, RepositoryError, School, SchoolId,
        SchoolRepository, SelectionEntry, UserId,
    };
    use exam_planner::config::CalculatorConfig;

    #[derive(Default)]
    pub(super) struct MemoryRepository {
        schools: Mutex<BTreeMap<SchoolId, School>>,
        selections: Mutex<HashMap<UserId, Vec<SelectionEntry>>>,
        snapshots: Mutex<HashMap<UserId, CalculatorSnapshot>>,
    }

    impl SchoolRepository for MemoryRepository {
        fn list(&self) -> Result<Vec<School>, RepositoryError> {
            Ok(self.schools.lock().expect("lock").values().cloned().collect())
        }

        fn fetch(&self, id: SchoolId) -> Result<Option<School>, RepositoryError> {
            Ok(self.schools.lock().expect("lock").get(&id).cloned())
        }

        fn insert(&self, school: School) -> Result<School, RepositoryError> {
            self.schools
                .lock()
                .expect("lock")
                .insert(school.id, school.clone());
            Ok(school)
        }

        fn update(&self, school: School) -> Result<(), RepositoryError> {
            self.schools.lock().expect("lock").insert(school.id, school);
            Ok(())
        }

        fn delete(&self, id: SchoolId) -> Result<bool, RepositoryError> {
            Ok(self.schools.lock().expect("lock").remove(&id).is_some())
        }

        fn selections(&self, user: UserId) -> Result<Vec<SelectionEntry>, RepositoryError> {
            Ok(self
                .selections
                .lock()
                .expect("lock")
                .get(&user)
                .cloned()
                .unwrap_or_default())
        }

        fn replace_selections(
            &self,
            user: UserId,
            entries: Vec<SelectionEntry>,
        ) -> Result<(), RepositoryError> {
            self.selections.lock().expect("lock").insert(user, entries);
            Ok(())
        }

        fn purge_selections(&self, school: SchoolId) -> Result<usize, RepositoryError> {
            let mut guard = self.selections.lock().expect("lock");
            let mut purged = 0;
            for entries in guard.values_mut() {
                let before = entries.len();
                entries.retain(|entry| entry.school_id != school);
                purged += before - entries.len();
            }
            Ok(purged)
        }

        fn snapshot(&self, user: UserId) -> Result<Option<CalculatorSnapshot>, RepositoryError> {
            Ok(self.snapshots.lock().expect("lock").get(&user).cloned())
        }

        fn save_snapshot(
            &self,
            user: UserId,
            snapshot: CalculatorSnapshot,
        ) -> Result<(), RepositoryError> {
            self.snapshots.lock().expect("lock").insert(user, snapshot);
            Ok(())
        }
    }

    pub(super) fn service() -> Arc<CalculatorService<MemoryRepository>> {
        Arc::new(CalculatorService::new(
            Arc::new(MemoryRepository::default()),
            &CalculatorConfig::default(),
        ))
    }
}

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use exam_planner::calculator::{
    calculator_router, compute_score, EvaluationRequest, ExamScores, InternalGrades, PassBand,
    SchoolDraft, ScoreInput, ScorePattern, SubjectWeights, UserId, DEFAULT_NAISHIN_MULTIPLIER,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn student_input() -> ScoreInput {
    ScoreInput {
        grades: InternalGrades {
            japanese: 5,
            math: 4,
            english: 5,
            social: 4,
            science: 4,
            tech_home: 3,
            pe: 4,
            music: 3,
            art: 4,
        },
        exams: ExamScores::from_values([85, 72, 90, 78, 75]),
        ..ScoreInput::default()
    }
}

#[test]
fn subject_weights_feed_both_patterns() {
    let input = ScoreInput {
        use_weights: true,
        weights: SubjectWeights {
            math: 2.0,
            science: 2.0,
            ..SubjectWeights::default()
        },
        ..student_input()
    };

    let simple = compute_score(&input, ScorePattern::Simple, DEFAULT_NAISHIN_MULTIPLIER)
        .expect("simple score");
    assert_eq!(simple.naishin_raw, 22 + 28);
    assert!((simple.naishin_scaled - 150.0).abs() < 1e-9);
    assert!((simple.test_weighted_total - 547.0).abs() < 1e-9);

    let ratio = compute_score(
        &input,
        ScorePattern::Ratio {
            test: 1.0,
            naishin: 1.0,
        },
        DEFAULT_NAISHIN_MULTIPLIER,
    )
    .expect("ratio score");
    let expected = 50.0 / 65.0 * 500.0 + 547.0 / 700.0 * 500.0;
    assert!((ratio.final_score - expected).abs() < 1e-9);
}

#[test]
fn service_evaluates_selected_schools_in_display_order() {
    let service = common::service();
    let user = UserId(11);
    let first = service
        .create_school(
            user,
            SchoolDraft::ratio("都立西", 7.0, 3.0).with_pass_rates(Some(720.0), Some(690.0)),
        )
        .expect("create");
    let second = service
        .create_school(user, SchoolDraft::simple("私立A").with_pass_rates(Some(560.0), None))
        .expect("create");
    service.add_selected(user, second.id, Some(2)).expect("select");
    service.add_selected(user, first.id, Some(1)).expect("select");

    let evaluation = service
        .evaluate(
            user,
            EvaluationRequest {
                input: Some(student_input()),
                adjusted_test_total: Some(420),
            },
        )
        .expect("evaluate");

    assert_eq!(evaluation.adjusted_exams.map(|e| e.total()), Some(420));
    let names: Vec<_> = evaluation
        .schools
        .iter()
        .map(|result| result.school.name.as_str())
        .collect();
    assert_eq!(names, vec!["都立西", "私立A"]);
    assert_eq!(evaluation.schools[1].verdict_60.band, PassBand::Unknown);
}

#[tokio::test]
async fn router_round_trips_schools_over_http() {
    let router = calculator_router(common::service());

    let response = router
        .clone()
        .oneshot(
            Request::post("/api/calculator/schools")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::to_vec(&json!({
                        "name": "都立国立",
                        "pattern_type": "ratio",
                        "ratio_test": 7,
                        "ratio_naishin": 3,
                        "pass_rate_80": 760
                    }))
                    .expect("encode"),
                ))
                .expect("request"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = router
        .oneshot(
            Request::get("/api/calculator/schools")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    let payload: Value = serde_json::from_slice(&body).expect("json payload");
    assert_eq!(payload["schools"][0]["name"], json!("都立国立"));
    assert_eq!(payload["schools"][0]["created_by"], json!(0));
    assert_eq!(payload["schools"][0]["pass_rate_60"], Value::Null);
}
