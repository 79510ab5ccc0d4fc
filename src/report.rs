use std::fmt::Write;

use crate::models::{MatchingRun, Survey, SurveyStats};

pub fn score_band(score: u8) -> &'static str {
    match score {
        90..=u8::MAX => "high",
        80..=89 => "medium",
        _ => "low",
    }
}

fn student_label(survey: &Survey, student_id: &str) -> String {
    survey
        .students
        .iter()
        .find(|s| s.id == student_id)
        .map(|s| format!("{} {}", s.id, s.name))
        .unwrap_or_else(|| student_id.to_string())
}

pub fn build_report(survey: &Survey, stats: &SurveyStats, run: Option<&MatchingRun>) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Roommate Matching Report");
    let _ = writeln!(
        output,
        "Survey: {} (status {}, deadline {})",
        survey.title,
        survey.status.as_str(),
        survey.deadline
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Responses");
    let _ = writeln!(
        output,
        "- {} of {} students completed the survey ({}%)",
        stats.completed, stats.total, stats.rate
    );

    let Some(run) = run else {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Matched Pairs");
        let _ = writeln!(output, "Matching has not been run for this survey yet.");
        return output;
    };

    let _ = writeln!(
        output,
        "- Matching executed {} using {} order",
        run.executed_at.format("%Y-%m-%d %H:%M UTC"),
        run.order
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Matched Pairs");

    if run.pairs.is_empty() {
        let _ = writeln!(output, "No pairs cleared the compatibility threshold.");
    } else {
        for (idx, pair) in run.pairs.iter().enumerate() {
            let _ = writeln!(
                output,
                "{}. {} {} & {} {}: score {} ({})",
                idx + 1,
                pair.student_a_id,
                pair.student_a_name,
                pair.student_b_id,
                pair.student_b_name,
                pair.score,
                score_band(pair.score)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Unmatched Students");

    if run.unmatched.is_empty() {
        let _ = writeln!(output, "Every respondent was paired.");
    } else {
        for student_id in &run.unmatched {
            let _ = writeln!(output, "- {}", student_label(survey, student_id));
        }
    }

    output
}
