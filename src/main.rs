use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod content;
mod curriculum;
mod daily;
mod error;
mod progress;
mod render;
mod report;

use cli::{Command, GenerateArgs, LmArgs, RootArgs, RunArgs, StatusArgs, TopicsArgs, WeekPlanArgs};
use config::{
    process_env, resolve_output_dir, ConfigFile, GenerationSettings, LmBackend, LmOverrides,
};
use curriculum::{Catalog, Grade};
use daily::{skip_to_next_topic, DailyRunner, OnDemandRequest, RunOptions, SkipOutcome};
use error::{curriculum_error, CurriculumError};
use progress::{project_week_plan, resolve_today, status_summary, ProgressStore};
use render::DocumentRenderer;

fn main() -> ExitCode {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            ExitCode::from(curriculum_error(&err).map_or(1, CurriculumError::exit_code))
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn report_error(err: &anyhow::Error) {
    eprintln!("error: {err:#}");
    match curriculum_error(err) {
        Some(CurriculumError::CorruptProgressState { grade, .. }) => {
            eprintln!("hint: fix the progress file by hand or run `dmath reset --grade {grade}` to start over");
        }
        Some(CurriculumError::GenerationFailure(_)) => {
            eprintln!("hint: progress was not changed; rerun once the LM backend is available");
        }
        Some(CurriculumError::TopicNotInGrade { grade, .. }) => {
            eprintln!("hint: run `dmath topics --grade {grade}` to list its topics");
        }
        _ => {}
    }
}

/// Everything a command needs, resolved once per invocation.
struct Workspace {
    output_dir: std::path::PathBuf,
    config: ConfigFile,
    store: ProgressStore,
}

impl Workspace {
    fn open(explicit_output_dir: Option<&Path>) -> Result<Self> {
        let output_dir = resolve_output_dir(explicit_output_dir, process_env)?;
        let config = ConfigFile::load(&output_dir)?;
        let catalog = Catalog::builtin().context("load built-in curriculum")?;
        let store = ProgressStore::new(output_dir.clone(), catalog);
        Ok(Self {
            output_dir,
            config,
            store,
        })
    }
}

fn run(args: RootArgs) -> Result<ExitCode> {
    let workspace = Workspace::open(args.output_dir.as_deref())?;
    tracing::debug!(output_dir = %workspace.output_dir.display(), "workspace resolved");
    match args.command {
        Command::Run(run_args) => cmd_run(&workspace, run_args),
        Command::Status(status_args) => cmd_status(&workspace, status_args),
        Command::WeekPlan(plan_args) => cmd_week_plan(&workspace, plan_args),
        Command::Reset(target) => cmd_reset(&workspace, target.grade),
        Command::NextTopic(target) => cmd_next_topic(&workspace, target.grade),
        Command::Topics(topics_args) => cmd_topics(&workspace, topics_args),
        Command::Generate(generate_args) => cmd_generate(&workspace, generate_args),
    }
}

fn generation_settings(workspace: &Workspace, lm: &LmArgs) -> GenerationSettings {
    let overrides = LmOverrides {
        lm_command: lm.lm.clone(),
        api_url: lm.api_url.clone(),
        model: lm.model.clone(),
    };
    let settings = GenerationSettings::resolve(&overrides, &workspace.config, process_env);
    match &settings.backend {
        LmBackend::Command(command) => tracing::info!(command = %command, "using LM command"),
        LmBackend::Http { api_url, model, .. } => {
            tracing::info!(api_url = %api_url, model = %model, "using LM HTTP endpoint")
        }
    }
    settings
}

fn cmd_run(workspace: &Workspace, args: RunArgs) -> Result<ExitCode> {
    let settings = generation_settings(workspace, &args.lm);
    let generator = settings.generator();
    let renderer = DocumentRenderer::new(workspace.output_dir.clone());
    let runner = DailyRunner::new(&workspace.store, generator.as_ref(), &renderer);

    let options = RunOptions {
        days_per_topic: workspace.config.days_per_topic(args.days_per_topic),
        num_problems: workspace.config.num_problems(args.num_problems)?,
        concept_guide: !args.no_concept_guide,
        worksheet: !args.no_worksheet,
        date: args.date.unwrap_or_else(|| Local::now().date_naive()),
    };

    let Some(grade) = args.grade else {
        return run_all_grades(workspace, &runner, &options, args.json);
    };
    let summary = runner.run_today(grade, &options)?;
    if args.json {
        report::print_json(&summary)?;
    } else {
        println!("{}", report::run_text(&summary, &workspace.output_dir));
    }
    Ok(ExitCode::SUCCESS)
}

fn run_all_grades(
    workspace: &Workspace,
    runner: &DailyRunner<'_>,
    options: &RunOptions,
    json: bool,
) -> Result<ExitCode> {
    let grades: Vec<Grade> = workspace.store.catalog().grades().collect();
    let outcomes = runner.run_grades(&grades, options);
    let failed = outcomes.iter().filter(|(_, outcome)| outcome.is_err()).count();

    if json {
        let entries: Vec<_> = outcomes
            .iter()
            .map(|(grade, outcome)| match outcome {
                Ok(summary) => serde_json::json!({ "grade": grade, "status": "success", "run": summary }),
                Err(err) => serde_json::json!({ "grade": grade, "status": "failed", "error": format!("{err:#}") }),
            })
            .collect();
        report::print_json(&entries)?;
    } else {
        for (grade, outcome) in &outcomes {
            match outcome {
                Ok(summary) => println!("{}\n", report::run_text(summary, &workspace.output_dir)),
                Err(err) => eprintln!("{}: failed: {err:#}", grade.display_name()),
            }
        }
        println!("{} of {} grades completed", outcomes.len() - failed, outcomes.len());
    }
    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cmd_status(workspace: &Workspace, args: StatusArgs) -> Result<ExitCode> {
    let record = workspace.store.load(args.target.grade)?;
    let summary = status_summary(&record)?;
    if args.json {
        report::print_json(&summary)?;
    } else {
        println!("{}", report::status_text(&summary));
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_week_plan(workspace: &Workspace, args: WeekPlanArgs) -> Result<ExitCode> {
    let record = workspace.store.load(args.target.grade)?;
    let days_per_topic = workspace.config.days_per_topic(args.days_per_topic);
    let plan = project_week_plan(&record, days_per_topic, args.days)?;
    if args.json {
        report::print_json(&plan)?;
    } else {
        println!("{}", report::week_plan_text(args.target.grade, &plan));
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_reset(workspace: &Workspace, grade: Grade) -> Result<ExitCode> {
    let record = workspace.store.reset(grade)?;
    println!("Progress reset for {}\n", grade.display_name());
    println!("{}", report::status_text(&status_summary(&record)?));
    Ok(ExitCode::SUCCESS)
}

fn cmd_next_topic(workspace: &Workspace, grade: Grade) -> Result<ExitCode> {
    match skip_to_next_topic(&workspace.store, grade)? {
        SkipOutcome::Advanced(record) => {
            println!("Advanced to next topic for {}\n", grade.display_name());
            println!("{}", report::status_text(&status_summary(&record)?));
        }
        SkipOutcome::AlreadyAtLastTopic(record) => {
            println!(
                "Already at the last topic for {} ({})",
                grade.display_name(),
                resolve_today(&record)?.display_name()
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_topics(workspace: &Workspace, args: TopicsArgs) -> Result<ExitCode> {
    println!("{}", report::topics_text(workspace.store.catalog(), args.grade)?);
    Ok(ExitCode::SUCCESS)
}

fn cmd_generate(workspace: &Workspace, args: GenerateArgs) -> Result<ExitCode> {
    let settings = generation_settings(workspace, &args.lm);
    let generator = settings.generator();
    let renderer = DocumentRenderer::new(workspace.output_dir.clone());
    let runner = DailyRunner::new(&workspace.store, generator.as_ref(), &renderer);

    let request = OnDemandRequest {
        grade: args.grade,
        topic: args.topic,
        difficulty: args.difficulty,
        num_problems: workspace.config.num_problems(args.num_problems)?,
        concept_guide: !args.no_concept_guide,
        worksheet: !args.no_worksheet,
        date: Local::now().date_naive(),
    };
    let summary = runner.generate_on_demand(&request)?;
    if args.json {
        report::print_json(&summary)?;
    } else {
        println!("{}", report::on_demand_text(&summary, &workspace.output_dir));
    }
    Ok(ExitCode::SUCCESS)
}
