use crate::demo::{
    run_demo, run_schedule_report, run_score, DemoArgs, ScheduleReportArgs, ScoreArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use exam_planner::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Exam Planner",
    about = "Plan entrance-exam dates and estimate admission scores from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect the exam-date plan stored on disk
    Schedule {
        #[command(subcommand)]
        command: ScheduleCommand,
    },
    /// Compute a composite admission score for one set of grades
    Score(ScoreArgs),
    /// Run an end-to-end CLI demo covering scheduling and scoring
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum ScheduleCommand {
    /// Print every exam date with its committed choice and deadline countdowns
    Report(ScheduleReportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Schedule {
            command: ScheduleCommand::Report(args),
        } => run_schedule_report(args),
        Command::Score(args) => run_score(args),
        Command::Demo(args) => run_demo(args),
    }
}
