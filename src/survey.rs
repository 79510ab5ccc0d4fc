use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::SurveyError;
use crate::models::{
    ResponseOrder, Survey, SurveyResponse, SurveyStats, SurveyStatus, SurveyStudent,
};

/// Raw survey form input before validation.
#[derive(Debug, Clone)]
pub struct SubmissionDraft {
    pub student_id: String,
    pub student_name: String,
    pub wakeup: Option<String>,
    pub bedtime: Option<String>,
    pub smoking: Option<String>,
    pub sleep_habits: Option<String>,
    pub mbti: Option<String>,
    pub major: Option<String>,
    pub special_notes: Option<String>,
}

fn required<T: FromStr>(field: &'static str, value: Option<&str>) -> Result<T, SurveyError> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(SurveyError::MissingAnswer(field))?;

    value.parse().map_err(|_| SurveyError::InvalidAnswer {
        field,
        value: value.to_string(),
    })
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Checks a new survey's title and roster before it is stored.
pub fn validate_new_survey(title: &str, students: &[SurveyStudent]) -> Result<(), SurveyError> {
    if title.trim().is_empty() {
        return Err(SurveyError::MissingTitle);
    }
    if students.is_empty() {
        return Err(SurveyError::EmptyRoster);
    }

    let mut seen = HashSet::new();
    for student in students {
        if student.id.is_empty() || student.name.is_empty() || student.gender.is_empty() {
            return Err(SurveyError::IncompleteStudent);
        }
        if !seen.insert(student.id.as_str()) {
            return Err(SurveyError::DuplicateStudent(student.id.clone()));
        }
    }
    Ok(())
}

pub fn validate_submission(
    draft: &SubmissionDraft,
    roster: &[SurveyStudent],
    submitted_at: DateTime<Utc>,
) -> Result<SurveyResponse, SurveyError> {
    let student_id = draft.student_id.trim();
    let student_name = draft.student_name.trim();

    if student_id.is_empty() || student_name.is_empty() {
        return Err(SurveyError::MissingIdentity);
    }

    let enrolled = roster
        .iter()
        .any(|s| s.id == student_id && s.name == student_name);
    if !enrolled {
        return Err(SurveyError::NotEnrolled {
            student_id: student_id.to_string(),
            student_name: student_name.to_string(),
        });
    }

    Ok(SurveyResponse {
        student_id: student_id.to_string(),
        student_name: student_name.to_string(),
        wakeup: required("wakeup", draft.wakeup.as_deref())?,
        bedtime: required("bedtime", draft.bedtime.as_deref())?,
        smoking: required("smoking", draft.smoking.as_deref())?,
        sleep_habits: required("sleepHabits", draft.sleep_habits.as_deref())?,
        mbti: optional(draft.mbti.as_deref()),
        major: optional(draft.major.as_deref()),
        special_notes: optional(draft.special_notes.as_deref()),
        submitted_at,
    })
}

pub fn require_survey<T>(found: Option<T>, survey_id: Uuid) -> Result<T, SurveyError> {
    found.ok_or(SurveyError::SurveyNotFound(survey_id))
}

/// Interprets the row count of an insert that skips existing submissions.
pub fn ensure_first_submission(rows_affected: u64, student_id: &str) -> Result<(), SurveyError> {
    if rows_affected == 0 {
        return Err(SurveyError::AlreadySubmitted(student_id.to_string()));
    }
    Ok(())
}

pub fn survey_stats(enrolled: usize, completed: usize) -> SurveyStats {
    let rate = if enrolled == 0 {
        0
    } else {
        (completed as f64 / enrolled as f64 * 100.0).round() as u32
    };

    SurveyStats {
        total: enrolled,
        completed,
        rate,
    }
}

pub fn check_matching_preconditions(
    survey: &Survey,
    responses: &[SurveyResponse],
) -> Result<(), SurveyError> {
    if survey.status != SurveyStatus::Active {
        return Err(SurveyError::SurveyInactive(survey.id));
    }
    if survey.students.len() < 2 {
        return Err(SurveyError::TooFewStudents(survey.students.len()));
    }
    if responses.len() < 2 {
        return Err(SurveyError::TooFewResponses(responses.len()));
    }
    Ok(())
}

/// Arranges responses for the matcher. Roster order drops responses from
/// students no longer enrolled.
pub fn order_responses(
    mut responses: Vec<SurveyResponse>,
    roster: &[SurveyStudent],
    order: ResponseOrder,
) -> Vec<SurveyResponse> {
    match order {
        ResponseOrder::Roster => {
            let positions: HashMap<&str, usize> = roster
                .iter()
                .enumerate()
                .map(|(idx, student)| (student.id.as_str(), idx))
                .collect();
            responses.retain(|r| positions.contains_key(r.student_id.as_str()));
            responses.sort_by_key(|r| positions[r.student_id.as_str()]);
        }
        ResponseOrder::Submission => {
            responses.sort_by(|a, b| {
                a.submitted_at
                    .cmp(&b.submitted_at)
                    .then_with(|| a.student_id.cmp(&b.student_id))
            });
        }
    }
    responses
}
