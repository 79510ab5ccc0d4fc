use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

mod config;
mod db;
mod error;
mod matcher;
mod models;
mod report;
mod survey;

use config::Config;
use models::{MatchingRun, SurveyStatus, SurveyStudent};
use models::ResponseOrder;
use survey::{
    check_matching_preconditions, order_responses, survey_stats, validate_new_survey,
    validate_submission, SubmissionDraft,
};

#[derive(Parser)]
#[command(name = "roommate-matcher")]
#[command(about = "Dormitory roommate survey and matching tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo survey and the default student directory
    Seed,
    /// List the dormitory student directory
    Students,
    /// Remove a student from the directory
    DeleteStudent {
        #[arg(long)]
        id: String,
    },
    /// Create a survey with its enrolled students
    CreateSurvey {
        #[arg(long)]
        title: String,
        #[arg(long)]
        deadline: NaiveDate,
        /// Roster entry as `id:name:gender`, repeatable
        #[arg(long = "student", value_parser = parse_student, required = true)]
        students: Vec<SurveyStudent>,
        /// Activate the survey immediately
        #[arg(long)]
        deploy: bool,
    },
    /// Open a survey for responses and matching
    Deploy {
        #[arg(long)]
        survey: Uuid,
    },
    /// Mark a survey inactive
    Close {
        #[arg(long)]
        survey: Uuid,
    },
    /// List surveys with response counts
    Surveys,
    /// Show response statistics for one survey
    Status {
        #[arg(long)]
        survey: Uuid,
    },
    /// Submit a student's survey answers
    Submit {
        #[arg(long)]
        survey: Uuid,
        #[arg(long)]
        student_id: String,
        #[arg(long)]
        name: String,
        /// before6, 6to8, 8to10 or after10
        #[arg(long)]
        wakeup: Option<String>,
        /// before10, 10to12, 12to2 or after2
        #[arg(long)]
        bedtime: Option<String>,
        /// yes or no
        #[arg(long)]
        smoking: Option<String>,
        /// yes or no (snoring, teeth grinding)
        #[arg(long)]
        sleep_habits: Option<String>,
        #[arg(long)]
        mbti: Option<String>,
        #[arg(long)]
        major: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Pair respondents and store the result
    RunMatching {
        #[arg(long)]
        survey: Uuid,
        #[arg(long, value_enum, default_value_t = ResponseOrder::Roster)]
        order: ResponseOrder,
    },
    /// Print the stored matching result
    Results {
        #[arg(long)]
        survey: Uuid,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        survey: Uuid,
        #[arg(long, default_value = "matching-report.md")]
        out: PathBuf,
    },
}

fn parse_student(value: &str) -> Result<SurveyStudent, String> {
    let mut parts = value.splitn(3, ':').map(str::trim);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(id), Some(name), Some(gender))
            if !id.is_empty() && !name.is_empty() && !gender.is_empty() =>
        {
            Ok(SurveyStudent {
                id: id.to_string(),
                name: name.to_string(),
                gender: gender.to_string(),
            })
        }
        _ => Err(format!("expected `id:name:gender`, got `{value}`")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let survey_id = db::seed(&pool).await?;
            println!("Seed data inserted for survey {survey_id}.");
        }
        Commands::Students => {
            let students = db::list_students(&pool).await?;
            if students.is_empty() {
                println!("No students in the directory.");
                return Ok(());
            }

            for student in students {
                println!(
                    "- {} {} ({}) {} born {}, registered {}",
                    student.id,
                    student.name,
                    student.gender,
                    student.email,
                    student.birth_date,
                    student.register_date
                );
            }
        }
        Commands::DeleteStudent { id } => {
            db::delete_student(&pool, &id).await?;
            println!("Student {id} removed from the directory.");
        }
        Commands::CreateSurvey {
            title,
            deadline,
            students,
            deploy,
        } => {
            validate_new_survey(&title, &students)?;
            let status = if deploy {
                SurveyStatus::Active
            } else {
                SurveyStatus::Inactive
            };
            let survey_id =
                db::create_survey(&pool, title.trim(), deadline, status, &students).await?;
            println!(
                "Survey {survey_id} saved ({}) with {} students.",
                status.as_str(),
                students.len()
            );
        }
        Commands::Deploy { survey } => {
            db::set_survey_status(&pool, survey, SurveyStatus::Active).await?;
            println!("Survey {survey} is now active.");
        }
        Commands::Close { survey } => {
            db::set_survey_status(&pool, survey, SurveyStatus::Inactive).await?;
            println!("Survey {survey} is now inactive.");
        }
        Commands::Surveys => {
            let surveys = db::list_surveys(&pool).await?;
            if surveys.is_empty() {
                println!("No surveys yet.");
                return Ok(());
            }

            for overview in surveys {
                println!(
                    "- {} {} ({}, deadline {}) {}/{} responses{}",
                    overview.id,
                    overview.title,
                    overview.status.as_str(),
                    overview.deadline,
                    overview.completed,
                    overview.enrolled,
                    if overview.matching_executed {
                        ", matched"
                    } else {
                        ""
                    }
                );
            }
        }
        Commands::Status { survey } => {
            let survey = db::fetch_survey(&pool, survey).await?;
            let responses = db::fetch_responses(&pool, survey.id).await?;
            let stats = survey_stats(survey.students.len(), responses.len());
            println!(
                "{}: {} of {} students responded ({}%).",
                survey.title, stats.completed, stats.total, stats.rate
            );
        }
        Commands::Submit {
            survey,
            student_id,
            name,
            wakeup,
            bedtime,
            smoking,
            sleep_habits,
            mbti,
            major,
            notes,
        } => {
            let survey = db::fetch_survey(&pool, survey).await?;
            let draft = SubmissionDraft {
                student_id,
                student_name: name,
                wakeup,
                bedtime,
                smoking,
                sleep_habits,
                mbti,
                major,
                special_notes: notes,
            };
            let response = validate_submission(&draft, &survey.students, Utc::now())?;
            db::insert_response(&pool, survey.id, &response).await?;
            println!("Survey submitted for {}.", response.student_name);
        }
        Commands::RunMatching { survey, order } => {
            let survey = db::fetch_survey(&pool, survey).await?;
            let responses = db::fetch_responses(&pool, survey.id).await?;
            let ordered = order_responses(responses, &survey.students, order);
            check_matching_preconditions(&survey, &ordered)?;

            info!(survey_id = %survey.id, respondents = ordered.len(), %order, "running matcher");
            let outcome = matcher::match_responses(&ordered);
            let run = MatchingRun {
                survey_id: survey.id,
                executed_at: Utc::now(),
                order,
                pairs: outcome.pairs,
                unmatched: outcome.unmatched,
            };
            db::save_matching_run(&pool, &run).await?;

            println!(
                "Matching complete: {} pairs, {} unmatched.",
                run.pairs.len(),
                run.unmatched.len()
            );
        }
        Commands::Results { survey, json } => {
            let survey = db::fetch_survey(&pool, survey).await?;
            let Some(run) = db::fetch_matching_run(&pool, survey.id).await? else {
                println!("Matching has not been run for survey {}.", survey.title);
                return Ok(());
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&run)?);
                return Ok(());
            }

            if run.pairs.is_empty() {
                println!("Matching ran but no pairs cleared the threshold.");
            }
            for pair in &run.pairs {
                println!(
                    "- {} ({}) & {} ({}) score {} ({})",
                    pair.student_a_name,
                    pair.student_a_id,
                    pair.student_b_name,
                    pair.student_b_id,
                    pair.score,
                    report::score_band(pair.score)
                );
            }
            if !run.unmatched.is_empty() {
                println!("Unmatched: {}", run.unmatched.join(", "));
            }
        }
        Commands::Report { survey, out } => {
            let survey = db::fetch_survey(&pool, survey).await?;
            let responses = db::fetch_responses(&pool, survey.id).await?;
            let stats = survey_stats(survey.students.len(), responses.len());
            let run = db::fetch_matching_run(&pool, survey.id).await?;
            let report = report::build_report(&survey, &stats, run.as_ref());
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn student_entries_split_on_colons() {
        let student = parse_student("2024001: Minji Kim :F").unwrap();
        assert_eq!(student.id, "2024001");
        assert_eq!(student.name, "Minji Kim");
        assert_eq!(student.gender, "F");

        assert!(parse_student("2024001:Minji Kim").is_err());
        assert!(parse_student("2024001::F").is_err());
    }

    #[test]
    fn run_matching_defaults_to_roster_order() {
        let cli = Cli::try_parse_from([
            "roommate-matcher",
            "run-matching",
            "--survey",
            "6f1c2d8e-4b7a-4c1e-9d3f-2a5b8c7e1f04",
        ])
        .unwrap();

        match cli.command {
            Commands::RunMatching { order, .. } => assert_eq!(order, ResponseOrder::Roster),
            _ => panic!("expected run-matching"),
        }
    }

    #[test]
    fn delete_student_takes_a_directory_id() {
        let cli =
            Cli::try_parse_from(["roommate-matcher", "delete-student", "--id", "2024002"]).unwrap();

        match cli.command {
            Commands::DeleteStudent { id } => assert_eq!(id, "2024002"),
            _ => panic!("expected delete-student"),
        }
        assert!(Cli::try_parse_from(["roommate-matcher", "delete-student"]).is_err());
    }
}
