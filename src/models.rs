use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized token `{value}`")]
pub struct ParseTokenError {
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WakeTime {
    #[serde(rename = "before6")]
    Before6,
    #[serde(rename = "6to8")]
    From6To8,
    #[serde(rename = "8to10")]
    From8To10,
    #[serde(rename = "after10")]
    After10,
}

impl WakeTime {
    pub fn as_str(&self) -> &'static str {
        match self {
            WakeTime::Before6 => "before6",
            WakeTime::From6To8 => "6to8",
            WakeTime::From8To10 => "8to10",
            WakeTime::After10 => "after10",
        }
    }
}

impl FromStr for WakeTime {
    type Err = ParseTokenError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "before6" => Ok(WakeTime::Before6),
            "6to8" => Ok(WakeTime::From6To8),
            "8to10" => Ok(WakeTime::From8To10),
            "after10" => Ok(WakeTime::After10),
            other => Err(ParseTokenError {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for WakeTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bedtime {
    #[serde(rename = "before10")]
    Before10,
    #[serde(rename = "10to12")]
    From10To12,
    #[serde(rename = "12to2")]
    From12To2,
    #[serde(rename = "after2")]
    After2,
}

impl Bedtime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bedtime::Before10 => "before10",
            Bedtime::From10To12 => "10to12",
            Bedtime::From12To2 => "12to2",
            Bedtime::After2 => "after2",
        }
    }
}

impl FromStr for Bedtime {
    type Err = ParseTokenError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "before10" => Ok(Bedtime::Before10),
            "10to12" => Ok(Bedtime::From10To12),
            "12to2" => Ok(Bedtime::From12To2),
            "after2" => Ok(Bedtime::After2),
            other => Err(ParseTokenError {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Bedtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answer to the smoking and sleep-habit (snoring, teeth grinding) questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YesNo {
    Yes,
    No,
}

impl YesNo {
    pub fn as_str(&self) -> &'static str {
        match self {
            YesNo::Yes => "yes",
            YesNo::No => "no",
        }
    }
}

impl FromStr for YesNo {
    type Err = ParseTokenError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "yes" => Ok(YesNo::Yes),
            "no" => Ok(YesNo::No),
            other => Err(ParseTokenError {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for YesNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResponse {
    pub student_id: String,
    pub student_name: String,
    pub wakeup: WakeTime,
    pub bedtime: Bedtime,
    pub smoking: YesNo,
    pub sleep_habits: YesNo,
    pub mbti: Option<String>,
    pub major: Option<String>,
    pub special_notes: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurveyStatus {
    Active,
    Inactive,
}

impl SurveyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SurveyStatus::Active => "active",
            SurveyStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for SurveyStatus {
    type Err = ParseTokenError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(SurveyStatus::Active),
            "inactive" => Ok(SurveyStatus::Inactive),
            other => Err(ParseTokenError {
                value: other.to_string(),
            }),
        }
    }
}

/// Order in which responses are handed to the matcher. The matcher is
/// order-dependent, so the choice is recorded with every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResponseOrder {
    /// Enrollment order of the survey roster.
    Roster,
    /// Ascending submission time, ties broken by student id.
    Submission,
}

impl ResponseOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseOrder::Roster => "roster",
            ResponseOrder::Submission => "submission",
        }
    }
}

impl FromStr for ResponseOrder {
    type Err = ParseTokenError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "roster" => Ok(ResponseOrder::Roster),
            "submission" => Ok(ResponseOrder::Submission),
            other => Err(ParseTokenError {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ResponseOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry in the dormitory-wide student directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub gender: String,
    pub email: String,
    pub birth_date: NaiveDate,
    pub register_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyStudent {
    pub id: String,
    pub name: String,
    pub gender: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    pub id: Uuid,
    pub title: String,
    pub created_date: NaiveDate,
    pub deadline: NaiveDate,
    pub status: SurveyStatus,
    pub students: Vec<SurveyStudent>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyOverview {
    pub id: Uuid,
    pub title: String,
    pub deadline: NaiveDate,
    pub status: SurveyStatus,
    pub enrolled: i64,
    pub completed: i64,
    pub matching_executed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedPair {
    pub student_a_id: String,
    pub student_a_name: String,
    pub student_b_id: String,
    pub student_b_name: String,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    pub pairs: Vec<MatchedPair>,
    pub unmatched: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingRun {
    pub survey_id: Uuid,
    pub executed_at: DateTime<Utc>,
    pub order: ResponseOrder,
    pub pairs: Vec<MatchedPair>,
    pub unmatched: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SurveyStats {
    pub total: usize,
    pub completed: usize,
    pub rate: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_parse_from_their_wire_tokens() {
        assert_eq!("6to8".parse::<WakeTime>().unwrap(), WakeTime::From6To8);
        assert_eq!("12to2".parse::<Bedtime>().unwrap(), Bedtime::From12To2);
        assert_eq!("no".parse::<YesNo>().unwrap(), YesNo::No);
        assert_eq!(Bedtime::After2.to_string(), "after2");
    }

    #[test]
    fn unknown_tokens_are_rejected() {
        let err = "noon".parse::<WakeTime>().unwrap_err();
        assert_eq!(err.value, "noon");
        assert!("Yes".parse::<YesNo>().is_err());
    }

    #[test]
    fn run_order_round_trips_through_its_token() {
        assert_eq!("submission".parse::<ResponseOrder>().unwrap(), ResponseOrder::Submission);
        assert_eq!(ResponseOrder::Roster.to_string(), "roster");
        assert_eq!(
            serde_json::to_string(&ResponseOrder::Submission).unwrap(),
            "\"submission\""
        );

        let err = "alphabetical".parse::<ResponseOrder>().unwrap_err();
        assert_eq!(err.to_string(), "unrecognized token `alphabetical`");
        assert!("archived".parse::<SurveyStatus>().is_err());
    }

    #[test]
    fn serde_uses_wire_tokens() {
        let json = serde_json::to_string(&WakeTime::From8To10).unwrap();
        assert_eq!(json, "\"8to10\"");
        let parsed: Bedtime = serde_json::from_str("\"10to12\"").unwrap();
        assert_eq!(parsed, Bedtime::From10To12);
    }
}
