use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SurveyError {
    #[error("Survey {0} not found")]
    SurveyNotFound(Uuid),

    #[error("Student {0} not found in the directory")]
    StudentNotFound(String),

    #[error("Survey title is required")]
    MissingTitle,

    #[error("A survey needs at least one enrolled student")]
    EmptyRoster,

    #[error("Student {0} is already on the roster")]
    DuplicateStudent(String),

    #[error("Roster entries need an id, a name and a gender")]
    IncompleteStudent,

    #[error("Student id and name are both required")]
    MissingIdentity,

    #[error("Student {student_id} ({student_name}) is not enrolled in this survey")]
    NotEnrolled {
        student_id: String,
        student_name: String,
    },

    #[error("Required answer `{0}` is missing")]
    MissingAnswer(&'static str),

    #[error("Answer `{value}` is not valid for `{field}`")]
    InvalidAnswer { field: &'static str, value: String },

    #[error("Student {0} already submitted this survey; submissions cannot be edited")]
    AlreadySubmitted(String),

    #[error("Survey {0} is not active")]
    SurveyInactive(Uuid),

    #[error("Matching needs at least 2 enrolled students, found {0}")]
    TooFewStudents(usize),

    #[error("Matching needs at least 2 completed responses, found {0}")]
    TooFewResponses(usize),
}
