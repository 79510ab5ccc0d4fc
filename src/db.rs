use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::SurveyError;
use crate::survey::{ensure_first_submission, require_survey};
use crate::models::{
    Bedtime, MatchedPair, MatchingRun, Student, Survey, SurveyOverview, SurveyResponse,
    SurveyStatus, SurveyStudent, WakeTime, YesNo,
};

pub const SEED_SURVEY_ID: &str = "6f1c2d8e-4b7a-4c1e-9d3f-2a5b8c7e1f04";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<Uuid> {
    let survey_id = Uuid::parse_str(SEED_SURVEY_ID)?;
    let deadline = NaiveDate::from_ymd_opt(2026, 2, 27).context("invalid date")?;

    sqlx::query(
        r#"
        INSERT INTO roommate_matching.surveys (id, title, deadline, status)
        VALUES ($1, $2, $3, 'active')
        ON CONFLICT (id) DO UPDATE
        SET title = EXCLUDED.title, deadline = EXCLUDED.deadline, status = 'active'
        "#,
    )
    .bind(survey_id)
    .bind("Spring 2026 dormitory move-in")
    .bind(deadline)
    .execute(pool)
    .await?;

    let students = vec![
        ("2024001", "Minji Kim", "F"),
        ("2024002", "Seoyeon Park", "F"),
        ("2024003", "Jiwoo Lee", "F"),
        ("2024004", "Hana Choi", "F"),
        ("2024005", "Yuna Jung", "F"),
    ];

    for (position, (student_id, name, gender)) in students.into_iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO roommate_matching.survey_students
            (survey_id, student_id, full_name, gender, roster_position)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (survey_id, student_id) DO UPDATE
            SET full_name = EXCLUDED.full_name, gender = EXCLUDED.gender
            "#,
        )
        .bind(survey_id)
        .bind(student_id)
        .bind(name)
        .bind(gender)
        .bind(position as i32)
        .execute(pool)
        .await?;
    }

    let submitted_base = Utc
        .with_ymd_and_hms(2026, 2, 20, 9, 0, 0)
        .single()
        .context("invalid timestamp")?;
    let responses = vec![
        ("2024001", "Minji Kim", "6to8", "10to12", "no", "no", Some("ENFP"), Some("Economics")),
        ("2024002", "Seoyeon Park", "after10", "after2", "no", "yes", Some("INTP"), None),
        ("2024003", "Jiwoo Lee", "6to8", "10to12", "no", "no", Some("ISFJ"), Some("Biology")),
        ("2024004", "Hana Choi", "after10", "12to2", "no", "yes", Some("INTP"), Some("Physics")),
    ];

    for (offset, (student_id, name, wakeup, bedtime, smoking, sleep, mbti, major)) in
        responses.into_iter().enumerate()
    {
        sqlx::query(
            r#"
            INSERT INTO roommate_matching.survey_responses
            (survey_id, student_id, student_name, wakeup, bedtime, smoking, sleep_habits,
             mbti, major, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (survey_id, student_id) DO NOTHING
            "#,
        )
        .bind(survey_id)
        .bind(student_id)
        .bind(name)
        .bind(wakeup)
        .bind(bedtime)
        .bind(smoking)
        .bind(sleep)
        .bind(mbti)
        .bind(major)
        .bind(submitted_base + Duration::hours(offset as i64))
        .execute(pool)
        .await?;
    }

    let directory = seed_students(pool).await?;
    info!(%survey_id, directory, "seeded demo survey and student directory");
    Ok(survey_id)
}

pub async fn create_survey(
    pool: &PgPool,
    title: &str,
    deadline: NaiveDate,
    status: SurveyStatus,
    students: &[SurveyStudent],
) -> anyhow::Result<Uuid> {
    let survey_id = Uuid::new_v4();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO roommate_matching.surveys (id, title, deadline, status)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(survey_id)
    .bind(title)
    .bind(deadline)
    .bind(status.as_str())
    .execute(&mut *tx)
    .await?;

    for (position, student) in students.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO roommate_matching.survey_students
            (survey_id, student_id, full_name, gender, roster_position)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(survey_id)
        .bind(&student.id)
        .bind(&student.name)
        .bind(&student.gender)
        .bind(position as i32)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!(%survey_id, students = students.len(), "created survey");
    Ok(survey_id)
}

pub async fn set_survey_status(
    pool: &PgPool,
    survey_id: Uuid,
    status: SurveyStatus,
) -> anyhow::Result<()> {
    let result = sqlx::query("UPDATE roommate_matching.surveys SET status = $2 WHERE id = $1")
        .bind(survey_id)
        .bind(status.as_str())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(SurveyError::SurveyNotFound(survey_id).into());
    }
    Ok(())
}

pub async fn list_surveys(pool: &PgPool) -> anyhow::Result<Vec<SurveyOverview>> {
    let rows = sqlx::query(
        r#"
        SELECT s.id, s.title, s.deadline, s.status,
               (SELECT COUNT(*) FROM roommate_matching.survey_students st
                WHERE st.survey_id = s.id) AS enrolled,
               (SELECT COUNT(*) FROM roommate_matching.survey_responses r
                WHERE r.survey_id = s.id) AS completed,
               EXISTS (SELECT 1 FROM roommate_matching.matching_runs m
                       WHERE m.survey_id = s.id) AS matching_executed
        FROM roommate_matching.surveys s
        ORDER BY s.created_date DESC, s.title
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut surveys = Vec::with_capacity(rows.len());
    for row in rows {
        let status: String = row.get("status");
        surveys.push(SurveyOverview {
            id: row.get("id"),
            title: row.get("title"),
            deadline: row.get("deadline"),
            status: status.parse()?,
            enrolled: row.get("enrolled"),
            completed: row.get("completed"),
            matching_executed: row.get("matching_executed"),
        });
    }

    Ok(surveys)
}

pub async fn fetch_survey(pool: &PgPool, survey_id: Uuid) -> anyhow::Result<Survey> {
    let row = sqlx::query(
        r#"
        SELECT id, title, created_date, deadline, status
        FROM roommate_matching.surveys
        WHERE id = $1
        "#,
    )
    .bind(survey_id)
    .fetch_optional(pool)
    .await?;
    let row = require_survey(row, survey_id)?;

    let students = sqlx::query(
        r#"
        SELECT student_id, full_name, gender
        FROM roommate_matching.survey_students
        WHERE survey_id = $1
        ORDER BY roster_position
        "#,
    )
    .bind(survey_id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| SurveyStudent {
        id: row.get("student_id"),
        name: row.get("full_name"),
        gender: row.get("gender"),
    })
    .collect();

    let status: String = row.get("status");
    Ok(Survey {
        id: row.get("id"),
        title: row.get("title"),
        created_date: row.get("created_date"),
        deadline: row.get("deadline"),
        status: status.parse()?,
        students,
    })
}

pub async fn insert_response(
    pool: &PgPool,
    survey_id: Uuid,
    response: &SurveyResponse,
) -> anyhow::Result<()> {
    let result = sqlx::query(
        r#"
        INSERT INTO roommate_matching.survey_responses
        (survey_id, student_id, student_name, wakeup, bedtime, smoking, sleep_habits,
         mbti, major, special_notes, submitted_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (survey_id, student_id) DO NOTHING
        "#,
    )
    .bind(survey_id)
    .bind(&response.student_id)
    .bind(&response.student_name)
    .bind(response.wakeup.as_str())
    .bind(response.bedtime.as_str())
    .bind(response.smoking.as_str())
    .bind(response.sleep_habits.as_str())
    .bind(&response.mbti)
    .bind(&response.major)
    .bind(&response.special_notes)
    .bind(response.submitted_at)
    .execute(pool)
    .await?;

    ensure_first_submission(result.rows_affected(), &response.student_id)?;
    Ok(())
}

fn response_from_row(row: PgRow) -> anyhow::Result<SurveyResponse> {
    let wakeup: String = row.get("wakeup");
    let bedtime: String = row.get("bedtime");
    let smoking: String = row.get("smoking");
    let sleep_habits: String = row.get("sleep_habits");

    Ok(SurveyResponse {
        student_id: row.get("student_id"),
        student_name: row.get("student_name"),
        wakeup: wakeup.parse::<WakeTime>()?,
        bedtime: bedtime.parse::<Bedtime>()?,
        smoking: smoking.parse::<YesNo>()?,
        sleep_habits: sleep_habits.parse::<YesNo>()?,
        mbti: row.get("mbti"),
        major: row.get("major"),
        special_notes: row.get("special_notes"),
        submitted_at: row.get("submitted_at"),
    })
}

/// Responses come back in submission order; callers reorder as needed.
pub async fn fetch_responses(pool: &PgPool, survey_id: Uuid) -> anyhow::Result<Vec<SurveyResponse>> {
    let rows = sqlx::query(
        r#"
        SELECT student_id, student_name, wakeup, bedtime, smoking, sleep_habits,
               mbti, major, special_notes, submitted_at
        FROM roommate_matching.survey_responses
        WHERE survey_id = $1
        ORDER BY submitted_at, student_id
        "#,
    )
    .bind(survey_id)
    .fetch_all(pool)
    .await?;

    let responses = rows
        .into_iter()
        .map(response_from_row)
        .collect::<anyhow::Result<Vec<_>>>()?;
    debug!(%survey_id, count = responses.len(), "loaded survey responses");
    Ok(responses)
}

/// Replaces any earlier run for the survey.
pub async fn save_matching_run(pool: &PgPool, run: &MatchingRun) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM roommate_matching.matching_runs WHERE survey_id = $1")
        .bind(run.survey_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO roommate_matching.matching_runs
        (survey_id, executed_at, response_order, unmatched)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(run.survey_id)
    .bind(run.executed_at)
    .bind(run.order.as_str())
    .bind(&run.unmatched)
    .execute(&mut *tx)
    .await?;

    for (position, pair) in run.pairs.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO roommate_matching.matched_pairs
            (survey_id, position, student_a_id, student_a_name, student_b_id, student_b_name, score)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(run.survey_id)
        .bind(position as i32)
        .bind(&pair.student_a_id)
        .bind(&pair.student_a_name)
        .bind(&pair.student_b_id)
        .bind(&pair.student_b_name)
        .bind(i16::from(pair.score))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

struct StoredRun {
    executed_at: DateTime<Utc>,
    order: String,
    unmatched: Vec<String>,
}

struct StoredPair {
    student_a_id: String,
    student_a_name: String,
    student_b_id: String,
    student_b_name: String,
    score: i16,
}

/// A missing run row means matching was never executed; a run row with no
/// pair rows is an executed run that paired nobody.
fn assemble_run(
    survey_id: Uuid,
    stored: Option<StoredRun>,
    pairs: Vec<StoredPair>,
) -> anyhow::Result<Option<MatchingRun>> {
    let Some(stored) = stored else {
        return Ok(None);
    };

    let pairs = pairs
        .into_iter()
        .map(|pair| {
            Ok(MatchedPair {
                student_a_id: pair.student_a_id,
                student_a_name: pair.student_a_name,
                student_b_id: pair.student_b_id,
                student_b_name: pair.student_b_name,
                score: u8::try_from(pair.score).context("stored score out of range")?,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Some(MatchingRun {
        survey_id,
        executed_at: stored.executed_at,
        order: stored.order.parse()?,
        pairs,
        unmatched: stored.unmatched,
    }))
}

pub async fn fetch_matching_run(
    pool: &PgPool,
    survey_id: Uuid,
) -> anyhow::Result<Option<MatchingRun>> {
    let stored = sqlx::query(
        r#"
        SELECT executed_at, response_order, unmatched
        FROM roommate_matching.matching_runs
        WHERE survey_id = $1
        "#,
    )
    .bind(survey_id)
    .fetch_optional(pool)
    .await?
    .map(|row| StoredRun {
        executed_at: row.get("executed_at"),
        order: row.get("response_order"),
        unmatched: row.get("unmatched"),
    });

    let mut pairs = Vec::new();
    if stored.is_some() {
        pairs = sqlx::query(
            r#"
            SELECT student_a_id, student_a_name, student_b_id, student_b_name, score
            FROM roommate_matching.matched_pairs
            WHERE survey_id = $1
            ORDER BY position
            "#,
        )
        .bind(survey_id)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|row| StoredPair {
            student_a_id: row.get("student_a_id"),
            student_a_name: row.get("student_a_name"),
            student_b_id: row.get("student_b_id"),
            student_b_name: row.get("student_b_name"),
            score: row.get("score"),
        })
        .collect();
    }

    assemble_run(survey_id, stored, pairs)
}

pub fn default_students() -> Vec<Student> {
    let registered = NaiveDate::from_ymd_opt(2024, 10, 1);
    [
        ("2024001", "Kim Cheolsu", "M", "kim@university.ac.kr", (2005, 3, 15)),
        ("2024002", "Lee Younghee", "F", "lee@university.ac.kr", (2005, 7, 22)),
    ]
    .into_iter()
    .filter_map(|(id, name, gender, email, (y, m, d))| {
        Some(Student {
            id: id.to_string(),
            name: name.to_string(),
            gender: gender.to_string(),
            email: email.to_string(),
            birth_date: NaiveDate::from_ymd_opt(y, m, d)?,
            register_date: registered?,
        })
    })
    .collect()
}

pub async fn seed_students(pool: &PgPool) -> anyhow::Result<usize> {
    let mut inserted = 0usize;

    for student in default_students() {
        let result = sqlx::query(
            r#"
            INSERT INTO roommate_matching.students
            (id, full_name, gender, email, birth_date, register_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&student.id)
        .bind(&student.name)
        .bind(&student.gender)
        .bind(&student.email)
        .bind(student.birth_date)
        .bind(student.register_date)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}

pub async fn list_students(pool: &PgPool) -> anyhow::Result<Vec<Student>> {
    let rows = sqlx::query(
        r#"
        SELECT id, full_name, gender, email, birth_date, register_date
        FROM roommate_matching.students
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| Student {
            id: row.get("id"),
            name: row.get("full_name"),
            gender: row.get("gender"),
            email: row.get("email"),
            birth_date: row.get("birth_date"),
            register_date: row.get("register_date"),
        })
        .collect())
}

pub async fn delete_student(pool: &PgPool, student_id: &str) -> anyhow::Result<()> {
    let result = sqlx::query("DELETE FROM roommate_matching.students WHERE id = $1")
        .bind(student_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(SurveyError::StudentNotFound(student_id.to_string()).into());
    }
    info!(student_id, "deleted student from directory");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResponseOrder;

    fn stored_run(order: &str) -> StoredRun {
        StoredRun {
            executed_at: Utc.with_ymd_and_hms(2026, 2, 28, 10, 0, 0).unwrap(),
            order: order.to_string(),
            unmatched: vec!["2024002".to_string(), "2024004".to_string()],
        }
    }

    #[test]
    fn missing_run_row_means_matching_never_ran() {
        let run = assemble_run(Uuid::new_v4(), None, Vec::new()).unwrap();
        assert!(run.is_none());
    }

    #[test]
    fn run_without_pairs_is_still_an_executed_run() {
        let survey_id = Uuid::new_v4();
        let run = assemble_run(survey_id, Some(stored_run("roster")), Vec::new())
            .unwrap()
            .expect("executed run");

        assert_eq!(run.survey_id, survey_id);
        assert_eq!(run.order, ResponseOrder::Roster);
        assert!(run.pairs.is_empty());
        assert_eq!(run.unmatched.len(), 2);
    }

    #[test]
    fn stored_pairs_keep_their_order_and_scores() {
        let pairs = vec![
            StoredPair {
                student_a_id: "2024001".to_string(),
                student_a_name: "Minji Kim".to_string(),
                student_b_id: "2024003".to_string(),
                student_b_name: "Jiwoo Lee".to_string(),
                score: 85,
            },
            StoredPair {
                student_a_id: "2024002".to_string(),
                student_a_name: "Seoyeon Park".to_string(),
                student_b_id: "2024004".to_string(),
                student_b_name: "Hana Choi".to_string(),
                score: 75,
            },
        ];
        let run = assemble_run(Uuid::new_v4(), Some(stored_run("submission")), pairs)
            .unwrap()
            .expect("executed run");

        assert_eq!(run.order, ResponseOrder::Submission);
        let scores: Vec<u8> = run.pairs.iter().map(|p| p.score).collect();
        assert_eq!(scores, vec![85, 75]);
        assert_eq!(run.pairs[1].student_b_id, "2024004");
    }

    #[test]
    fn corrupt_stored_values_are_rejected() {
        let bad_score = vec![StoredPair {
            student_a_id: "a".to_string(),
            student_a_name: "A".to_string(),
            student_b_id: "b".to_string(),
            student_b_name: "B".to_string(),
            score: -1,
        }];
        assert!(assemble_run(Uuid::new_v4(), Some(stored_run("roster")), bad_score).is_err());
        assert!(assemble_run(Uuid::new_v4(), Some(stored_run("random")), Vec::new()).is_err());
    }

    #[test]
    fn default_directory_has_two_registered_students() {
        let students = default_students();
        let ids: Vec<&str> = students.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["2024001", "2024002"]);
        assert!(students
            .iter()
            .all(|s| s.register_date == NaiveDate::from_ymd_opt(2024, 10, 1).unwrap()));
        assert_eq!(
            students[1].birth_date,
            NaiveDate::from_ymd_opt(2005, 7, 22).unwrap()
        );
    }
}
