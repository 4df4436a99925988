use crate::infra::{parse_date, parse_list, InMemorySchoolRepository};
use chrono::{Local, NaiveDate};
use clap::{Args, ValueEnum};
use exam_planner::calculator::{
    rescale_exam_scores, AdditionalFlags, AdditionalScores, CalculatorService,
    CalculatorSnapshot, Evaluation, EvaluationRequest, ExamScores, InternalGrades, SchoolDraft,
    ScoreBreakdown, ScoreEngine, ScoreInput, ScorePattern, SpeakingGrade, SubjectWeights,
    ThresholdVerdict, UserId,
};
use exam_planner::config::{AppConfig, CalculatorConfig};
use exam_planner::error::AppError;
use exam_planner::schedule::{
    dday_label, load_records_from_json, load_records_from_path, sort_candidates, DeviationBand,
    ExamBoard, FileStore, MemoryStore, ScheduleError, ScheduleSession, SortOrder, Store,
    UserProfile,
};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

const DEMO_RECORDS: &str = r#"[
    {"schoolName": "栄東", "area": "さいたま市", "deviation": 64, "category": "一般", "examName": "A日程", "applyStart": "12/1", "applyEnd": "1/8", "examDate": "1/10", "resultDate": "1/12", "annual": "O", "refund": "O"},
    {"schoolName": "市川", "area": "市川市", "deviation": 66, "category": "一般", "examName": "第1回", "applyStart": "12/10", "applyEnd": "1/13", "examDate": "1/20", "resultDate": "1/22", "annual": "O", "refund": "X"},
    {"schoolName": "渋谷教育学園幕張", "area": "千葉市", "deviation": 71, "category": "一般", "examName": "1次", "applyStart": "12/15", "applyEnd": "1/16", "examDate": "1/22", "resultDate": "1/25", "annual": "X", "refund": "X"},
    {"schoolName": "開成", "area": "荒川区", "deviation": 72, "category": "一般", "examName": "一般", "applyStart": "12/20", "applyEnd": "1/26", "examDate": "2/1", "resultDate": "2/3", "annual": "X", "refund": "X"},
    {"schoolName": "巣鴨", "area": "豊島区", "deviation": 61, "category": "一般", "examName": "第1期", "applyStart": "12/20", "applyEnd": "1/30", "examDate": "2/1", "resultDate": "2/2", "annual": "O", "refund": "O"},
    {"schoolName": "本郷", "area": "豊島区", "deviation": 63, "category": "一般", "examName": "第2回", "applyStart": "12/20", "applyEnd": "2/4", "examDate": "2/5", "resultDate": "2/5", "annual": "O", "refund": "X"}
]"#;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum SortArg {
    NameAsc,
    NameDesc,
    DevAsc,
    #[default]
    DevDesc,
}

impl From<SortArg> for SortOrder {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::NameAsc => SortOrder::NameAsc,
            SortArg::NameDesc => SortOrder::NameDesc,
            SortArg::DevAsc => SortOrder::DeviationAsc,
            SortArg::DevDesc => SortOrder::DeviationDesc,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum PatternArg {
    #[default]
    Simple,
    Ratio,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum SpeakingArg {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl From<SpeakingArg> for SpeakingGrade {
    fn from(value: SpeakingArg) -> Self {
        match value {
            SpeakingArg::A => SpeakingGrade::A,
            SpeakingArg::B => SpeakingGrade::B,
            SpeakingArg::C => SpeakingGrade::C,
            SpeakingArg::D => SpeakingGrade::D,
            SpeakingArg::E => SpeakingGrade::E,
            SpeakingArg::F => SpeakingGrade::F,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct ScheduleReportArgs {
    /// Exam record file (.json, .csv, .tsv). Defaults to APP_SCHEDULE_DATA.
    #[arg(long)]
    pub(crate) data: Option<PathBuf>,
    /// Directory holding the saved plan. Defaults to APP_STORE_DIR.
    #[arg(long)]
    pub(crate) store_dir: Option<PathBuf>,
    /// Reporting date (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Candidate order within each date
    #[arg(long, value_enum, default_value_t = SortArg::DevDesc)]
    pub(crate) sort: SortArg,
    /// Record a decline for every date that has no choice yet
    #[arg(long)]
    pub(crate) decline_remaining: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Nine internal grades (1-5) in order: Japanese, math, English, social, science,
    /// tech/home, PE, music, art
    #[arg(long, value_parser = parse_list::<u8, 9>, default_value = "3,3,3,3,3,3,3,3,3")]
    pub(crate) grades: [u8; 9],
    /// Five exam scores (0-100): Japanese, math, English, social, science
    #[arg(long, value_parser = parse_list::<i32, 5>)]
    pub(crate) exams: [i32; 5],
    /// Five subject weights (0-3); omit to score without weighting
    #[arg(long, value_parser = parse_list::<f64, 5>)]
    pub(crate) weights: Option<[f64; 5]>,
    /// Aggregation pattern of the school
    #[arg(long, value_enum, default_value_t = PatternArg::Simple)]
    pub(crate) pattern: PatternArg,
    /// Exam share of the ratio pattern
    #[arg(long, default_value_t = 7.0)]
    pub(crate) ratio_test: f64,
    /// Internal-grade share of the ratio pattern
    #[arg(long, default_value_t = 3.0)]
    pub(crate) ratio_naishin: f64,
    /// Interview score (0-100)
    #[arg(long)]
    pub(crate) interview: Option<f64>,
    /// Essay score (0-100)
    #[arg(long)]
    pub(crate) essay: Option<f64>,
    /// Practical score (0-100)
    #[arg(long)]
    pub(crate) practical: Option<f64>,
    /// Fixed bonus (0-5)
    #[arg(long)]
    pub(crate) bonus: Option<f64>,
    /// Speaking test grade
    #[arg(long, value_enum)]
    pub(crate) speaking: Option<SpeakingArg>,
    /// 80% pass reference score
    #[arg(long)]
    pub(crate) pass_80: Option<f64>,
    /// 60% pass reference score
    #[arg(long)]
    pub(crate) pass_60: Option<f64>,
    /// Re-score with the raw exam total redistributed to this value (0-500)
    #[arg(long)]
    pub(crate) what_if_total: Option<i32>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the reporting date (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Baseline deviation used to pick schools (40-90)
    #[arg(long, default_value_t = 65)]
    pub(crate) deviation: i32,
    /// Skip the scoring portion of the demo
    #[arg(long)]
    pub(crate) skip_calculator: bool,
}

pub(crate) fn run_schedule_report(args: ScheduleReportArgs) -> Result<(), AppError> {
    let ScheduleReportArgs {
        data,
        store_dir,
        today,
        sort,
        decline_remaining,
    } = args;

    let config = AppConfig::load()?;
    let data = data.or(config.schedule.data_path).ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "no exam data file given (use --data or APP_SCHEDULE_DATA)",
        )
    })?;
    let store_dir = store_dir.unwrap_or(config.schedule.store_dir);
    let today = today.unwrap_or_else(|| Local::now().date_naive());

    let board = ExamBoard::from_records(load_records_from_path(&data)?);
    let mut session = ScheduleSession::open(board, Arc::new(FileStore::new(store_dir)));
    if decline_remaining {
        let declined = session.decline_all();
        println!("Declined {} undecided date(s)", declined.len());
    }

    render_schedule(&session, today, sort.into());
    Ok(())
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let engine = ScoreEngine::new(&config.calculator);

    let (pattern, input) = score_input_from_args(&args);
    let breakdown = engine.compute(&input, pattern)?;
    println!("Composite admission score");
    render_breakdown(&breakdown);
    render_verdicts(breakdown.final_score, args.pass_80, args.pass_60);

    if let Some(total) = args.what_if_total {
        let exams = rescale_exam_scores(&input.exams, total);
        let adjusted = engine.compute(&input.with_exams(exams), pattern)?;
        println!(
            "\nWhat-if raw exam total {}: subjects {:?}",
            exams.total(),
            exams.values()
        );
        render_breakdown(&adjusted);
        render_verdicts(adjusted.final_score, args.pass_80, args.pass_60);
    }

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        today,
        deviation,
        skip_calculator,
    } = args;
    let today = today.unwrap_or_else(|| Local::now().date_naive());

    println!("Exam planner demo");
    let records = load_records_from_json(Cursor::new(DEMO_RECORDS))?;
    let board = ExamBoard::from_records(records);
    let store = Arc::new(MemoryStore::default());
    let mut session = ScheduleSession::open(board, store);
    session.start(UserProfile::new("", deviation));
    auto_select(&mut session)?;
    render_schedule(&session, today, SortOrder::DeviationDesc);

    if !skip_calculator {
        run_calculator_demo()?;
    }
    Ok(())
}

/// Commits the strongest candidate within reach on each date, declining otherwise.
fn auto_select<S: Store + 'static>(session: &mut ScheduleSession<S>) -> Result<(), AppError> {
    let baseline = session.profile().deviation;
    while let Some(date) = session.current_date().map(str::to_string) {
        if session.selection(&date).is_some() {
            break;
        }
        let choice = session
            .candidates(SortOrder::DeviationDesc)
            .into_iter()
            .find(|record| {
                matches!(
                    DeviationBand::classify(record.deviation, baseline),
                    DeviationBand::Match | DeviationBand::Reach | DeviationBand::Safety
                )
            });
        let record = match choice {
            Some(record) => record,
            None => session
                .decline_option()
                .ok_or_else(|| ScheduleError::UnknownDate(date.clone()))?,
        };
        println!(
            "- {date}: {}",
            if record.is_decline() {
                "declined".to_string()
            } else {
                format!("{} {}", record.school_name, record.exam_name)
            }
        );
        session.confirm(&date, record)?;
    }
    Ok(())
}

fn run_calculator_demo() -> Result<(), AppError> {
    let repository = Arc::new(InMemorySchoolRepository::default());
    let service = CalculatorService::new(repository, &CalculatorConfig::default());
    let user = UserId::default();

    let drafts = [
        SchoolDraft::ratio("都立西", 7.0, 3.0).with_pass_rates(Some(760.0), Some(720.0)),
        SchoolDraft::ratio("都立新宿", 6.0, 4.0).with_pass_rates(Some(700.0), Some(660.0)),
        SchoolDraft::simple("私立A").with_pass_rates(Some(560.0), Some(520.0)),
    ];
    for draft in drafts {
        let school = service.create_school(user, draft)?;
        service.add_selected(user, school.id, None)?;
    }

    let input = demo_score_input();
    service.save_snapshot(user, CalculatorSnapshot::from_input(&input))?;

    println!("\nScore estimate for saved inputs");
    let evaluation = service.evaluate(user, EvaluationRequest::default())?;
    render_evaluation(&evaluation);

    let what_if = EvaluationRequest {
        input: None,
        adjusted_test_total: Some(input.exams.total() + 40),
    };
    println!("\nWhat-if: 40 more raw exam points");
    let evaluation = service.evaluate(user, what_if)?;
    render_evaluation(&evaluation);
    Ok(())
}

fn demo_score_input() -> ScoreInput {
    ScoreInput {
        grades: InternalGrades {
            japanese: 5,
            math: 4,
            english: 5,
            social: 4,
            science: 4,
            tech_home: 4,
            pe: 3,
            music: 4,
            art: 4,
        },
        exams: ExamScores::from_values([82, 74, 88, 79, 71]),
        additional: AdditionalScores {
            speaking: SpeakingGrade::B,
            ..AdditionalScores::default()
        },
        flags: AdditionalFlags {
            speaking: true,
            ..AdditionalFlags::default()
        },
        ..ScoreInput::default()
    }
}

fn score_input_from_args(args: &ScoreArgs) -> (ScorePattern, ScoreInput) {
    let [japanese, math, english, social, science, tech_home, pe, music, art] = args.grades;
    let grades = InternalGrades {
        japanese,
        math,
        english,
        social,
        science,
        tech_home,
        pe,
        music,
        art,
    };
    let weights = args.weights.map(|[japanese, math, english, social, science]| SubjectWeights {
        japanese,
        math,
        english,
        social,
        science,
    });

    let input = ScoreInput {
        grades,
        exams: ExamScores::from_values(args.exams),
        use_weights: weights.is_some(),
        weights: weights.unwrap_or_default(),
        additional: AdditionalScores {
            interview: args.interview.unwrap_or_default(),
            essay: args.essay.unwrap_or_default(),
            practical: args.practical.unwrap_or_default(),
            bonus: args.bonus.unwrap_or_default(),
            speaking: args.speaking.map(SpeakingGrade::from).unwrap_or_default(),
        },
        flags: AdditionalFlags {
            interview: args.interview.is_some(),
            essay: args.essay.is_some(),
            practical: args.practical.is_some(),
            bonus: args.bonus.is_some(),
            speaking: args.speaking.is_some(),
        },
    }
    .clamped();

    let pattern = match args.pattern {
        PatternArg::Simple => ScorePattern::Simple,
        PatternArg::Ratio => ScorePattern::Ratio {
            test: args.ratio_test,
            naishin: args.ratio_naishin,
        },
    };
    (pattern, input)
}

pub(crate) fn render_schedule<S: Store + 'static>(
    session: &ScheduleSession<S>,
    today: NaiveDate,
    order: SortOrder,
) {
    let profile = session.profile();
    println!(
        "\nExam plan for {} (deviation {}) as of {}",
        profile.name, profile.deviation, today
    );

    for date in session.board().dates() {
        let countdown = dday_label(date, today);
        match session.selection(date) {
            Some(record) if record.is_decline() => {
                println!("- {date} {countdown}: {}", record.school_name)
            }
            Some(record) => println!(
                "- {date} {countdown}: {} {} [{}]",
                record.school_name,
                record.exam_name,
                DeviationBand::classify(record.deviation, profile.deviation).label()
            ),
            None => {
                println!("- {date} {countdown}: undecided");
                let candidates = sort_candidates(session.board().records_on(date), order);
                for record in candidates {
                    let deviation = record
                        .deviation
                        .map(|value| value.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "    · {} {} (deviation {deviation}, {})",
                        record.school_name,
                        record.exam_name,
                        DeviationBand::classify(record.deviation, profile.deviation).label()
                    );
                }
            }
        }
    }

    let summary = session.summary(today);
    if summary.is_empty() {
        return;
    }
    println!("\nDeadlines");
    for entry in summary {
        println!("- {} {}", entry.record.school_name, entry.record.exam_name);
        for milestone in entry.milestones {
            let mark = if milestone.done { "x" } else { " " };
            println!(
                "    [{mark}] {} {} {}",
                milestone.label, milestone.date, milestone.dday
            );
        }
    }
}

fn render_breakdown(breakdown: &ScoreBreakdown) {
    println!(
        "- internal grades: {} raw ({} unweighted) of {}",
        breakdown.naishin_raw, breakdown.naishin_raw_no_weight, breakdown.naishin_max_raw
    );
    println!(
        "- exams: {} raw | {:.1} weighted",
        breakdown.test_raw_total, breakdown.test_weighted_total
    );
    println!("- additional: {:.1}", breakdown.extra_total);
    println!(
        "- final: {:.1} (grades {:.1} + exams {:.1} + additional {:.1})",
        breakdown.final_score, breakdown.naishin_final, breakdown.test_final, breakdown.extra_total
    );
}

fn render_verdicts(final_score: f64, pass_80: Option<f64>, pass_60: Option<f64>) {
    for (label, threshold) in [("80%", pass_80), ("60%", pass_60)] {
        let verdict = ThresholdVerdict::judge(Some(final_score), threshold);
        println!(
            "- {label} line: {} / {}",
            verdict.status.label(),
            verdict.band.label()
        );
    }
}

fn render_evaluation(evaluation: &Evaluation) {
    if let Some(exams) = evaluation.adjusted_exams {
        println!("Adjusted exam scores: {:?}", exams.values());
    }
    for result in &evaluation.schools {
        match result.final_score {
            Some(score) => println!(
                "- {} ({}): {:.1} | 80% {} / {} | 60% {} / {}",
                result.school.name,
                result.school.pattern_type.label(),
                score,
                result.verdict_80.status.label(),
                result.verdict_80.band.label(),
                result.verdict_60.status.label(),
                result.verdict_60.band.label()
            ),
            None => println!(
                "- {}: not scored ({})",
                result.school.name,
                result.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}
