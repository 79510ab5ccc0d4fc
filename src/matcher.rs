use std::collections::HashSet;

use crate::models::{MatchOutcome, MatchedPair, SurveyResponse};

pub const WAKEUP_WEIGHT: u8 = 25;
pub const BEDTIME_WEIGHT: u8 = 25;
pub const SMOKING_WEIGHT: u8 = 20;
pub const SLEEP_HABITS_WEIGHT: u8 = 15;
pub const MBTI_WEIGHT: u8 = 15;

/// Pairs scoring below this are never committed.
pub const MIN_PAIR_SCORE: u8 = 50;

/// Rubric score for two respondents, symmetric and bounded by 100.
pub fn compatibility_score(a: &SurveyResponse, b: &SurveyResponse) -> u8 {
    let mut score = 0;

    if a.wakeup == b.wakeup {
        score += WAKEUP_WEIGHT;
    }
    if a.bedtime == b.bedtime {
        score += BEDTIME_WEIGHT;
    }
    if a.smoking == b.smoking {
        score += SMOKING_WEIGHT;
    }
    if a.sleep_habits == b.sleep_habits {
        score += SLEEP_HABITS_WEIGHT;
    }
    if shared_mbti(a, b) {
        score += MBTI_WEIGHT;
    }

    score
}

fn shared_mbti(a: &SurveyResponse, b: &SurveyResponse) -> bool {
    match (a.mbti.as_deref(), b.mbti.as_deref()) {
        (Some(left), Some(right)) => !left.is_empty() && left == right,
        _ => false,
    }
}

/// One left-to-right pass: each unused item commits to its best-scoring unused
/// successor, keeping the earliest candidate on ties. Returns index pairs with
/// their scores in commit order.
pub fn greedy_pairs<T, F>(items: &[T], score: F) -> Vec<(usize, usize, u8)>
where
    F: Fn(&T, &T) -> u8,
{
    let mut used = vec![false; items.len()];
    let mut pairs = Vec::new();

    for i in 0..items.len() {
        if used[i] {
            continue;
        }

        let mut best: Option<(usize, u8)> = None;
        for j in (i + 1)..items.len() {
            if used[j] {
                continue;
            }

            let candidate = score(&items[i], &items[j]);
            if best.map_or(true, |(_, best_score)| candidate > best_score) {
                best = Some((j, candidate));
            }
        }

        if let Some((j, best_score)) = best {
            if best_score >= MIN_PAIR_SCORE {
                used[i] = true;
                used[j] = true;
                pairs.push((i, j, best_score));
            }
        }
    }

    pairs
}

/// Pairs respondents in the order given. The caller owns ordering, validation
/// and the uniqueness of student ids.
pub fn match_responses(responses: &[SurveyResponse]) -> MatchOutcome {
    if responses.len() < 2 {
        return MatchOutcome {
            pairs: Vec::new(),
            unmatched: responses.iter().map(|r| r.student_id.clone()).collect(),
        };
    }

    let index_pairs = greedy_pairs(responses, compatibility_score);
    let mut used: HashSet<&str> = HashSet::new();
    let mut pairs = Vec::with_capacity(index_pairs.len());

    for (i, j, score) in index_pairs {
        let a = &responses[i];
        let b = &responses[j];
        used.insert(a.student_id.as_str());
        used.insert(b.student_id.as_str());
        pairs.push(MatchedPair {
            student_a_id: a.student_id.clone(),
            student_a_name: a.student_name.clone(),
            student_b_id: b.student_id.clone(),
            student_b_name: b.student_name.clone(),
            score,
        });
    }

    let unmatched = responses
        .iter()
        .filter(|r| !used.contains(r.student_id.as_str()))
        .map(|r| r.student_id.clone())
        .collect();

    MatchOutcome { pairs, unmatched }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bedtime, WakeTime, YesNo};
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn response(
        id: &str,
        wakeup: WakeTime,
        bedtime: Bedtime,
        smoking: YesNo,
        sleep_habits: YesNo,
        mbti: Option<&str>,
    ) -> SurveyResponse {
        SurveyResponse {
            student_id: id.to_string(),
            student_name: format!("Student {id}"),
            wakeup,
            bedtime,
            smoking,
            sleep_habits,
            mbti: mbti.map(str::to_string),
            major: None,
            special_notes: None,
            submitted_at: Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
        }
    }

    fn early_bird(id: &str) -> SurveyResponse {
        response(
            id,
            WakeTime::Before6,
            Bedtime::Before10,
            YesNo::No,
            YesNo::No,
            None,
        )
    }

    fn night_owl(id: &str) -> SurveyResponse {
        response(
            id,
            WakeTime::After10,
            Bedtime::After2,
            YesNo::Yes,
            YesNo::Yes,
            None,
        )
    }

    fn pair_ids(outcome: &MatchOutcome) -> Vec<(&str, &str, u8)> {
        outcome
            .pairs
            .iter()
            .map(|p| (p.student_a_id.as_str(), p.student_b_id.as_str(), p.score))
            .collect()
    }

    #[test]
    fn fewer_than_two_responses_leaves_everyone_unmatched() {
        let empty = match_responses(&[]);
        assert!(empty.pairs.is_empty());
        assert!(empty.unmatched.is_empty());

        let single = match_responses(&[early_bird("S1")]);
        assert!(single.pairs.is_empty());
        assert_eq!(single.unmatched, vec!["S1".to_string()]);
    }

    #[test]
    fn identical_routines_pair_and_outlier_is_left_over() {
        let responses = vec![early_bird("S1"), early_bird("S2"), night_owl("S3")];
        let outcome = match_responses(&responses);

        assert_eq!(pair_ids(&outcome), vec![("S1", "S2", 85)]);
        assert_eq!(outcome.unmatched, vec!["S3".to_string()]);
    }

    #[test]
    fn fully_different_answers_score_zero_and_stay_unmatched() {
        let a = response(
            "A",
            WakeTime::Before6,
            Bedtime::Before10,
            YesNo::No,
            YesNo::No,
            Some("INTJ"),
        );
        let b = night_owl("B");

        assert_eq!(compatibility_score(&a, &b), 0);
        let outcome = match_responses(&[a, b]);
        assert!(outcome.pairs.is_empty());
        assert_eq!(outcome.unmatched, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn shared_mbti_reaches_full_score() {
        let a = response(
            "A",
            WakeTime::From6To8,
            Bedtime::From10To12,
            YesNo::No,
            YesNo::Yes,
            Some("ENFP"),
        );
        let mut b = a.clone();
        b.student_id = "B".to_string();

        assert_eq!(compatibility_score(&a, &b), 100);
        assert_eq!(pair_ids(&match_responses(&[a, b])), vec![("A", "B", 100)]);
    }

    #[test]
    fn mbti_needs_both_sides_non_empty_and_exactly_equal() {
        let base = early_bird("A");
        let mut other = early_bird("B");

        other.mbti = Some("ENFP".to_string());
        assert_eq!(compatibility_score(&base, &other), 85);

        let mut lower = early_bird("C");
        lower.mbti = Some("enfp".to_string());
        assert_eq!(compatibility_score(&other, &lower), 85);

        let mut blank_a = early_bird("D");
        let mut blank_b = early_bird("E");
        blank_a.mbti = Some(String::new());
        blank_b.mbti = Some(String::new());
        assert_eq!(compatibility_score(&blank_a, &blank_b), 85);
    }

    #[test]
    fn score_is_the_weighted_sum_of_matching_terms() {
        let a = response(
            "A",
            WakeTime::Before6,
            Bedtime::From12To2,
            YesNo::No,
            YesNo::Yes,
            None,
        );
        let b = response(
            "B",
            WakeTime::Before6,
            Bedtime::After2,
            YesNo::No,
            YesNo::No,
            None,
        );
        assert_eq!(compatibility_score(&a, &b), WAKEUP_WEIGHT + SMOKING_WEIGHT);
        assert_eq!(compatibility_score(&b, &a), compatibility_score(&a, &b));
    }

    #[test]
    fn first_visitor_takes_its_local_best_not_the_global_optimum() {
        // A-B 60, A-C 70, B-C 55
        let scores = |x: &char, y: &char| match (*x.min(y), *x.max(y)) {
            ('A', 'B') => 60,
            ('A', 'C') => 70,
            ('B', 'C') => 55,
            _ => 0,
        };

        assert_eq!(greedy_pairs(&['A', 'B', 'C'], scores), vec![(0, 2, 70)]);
        assert_eq!(greedy_pairs(&['B', 'C', 'A'], scores), vec![(0, 2, 60)]);
        assert_eq!(greedy_pairs(&['B', 'C'], scores), vec![(0, 1, 55)]);
    }

    #[test]
    fn reordering_responses_changes_the_pairs() {
        let a = early_bird("A");
        let b = response(
            "B",
            WakeTime::Before6,
            Bedtime::From10To12,
            YesNo::No,
            YesNo::No,
            Some("ISTP"),
        );
        let c = response(
            "C",
            WakeTime::Before6,
            Bedtime::Before10,
            YesNo::No,
            YesNo::Yes,
            Some("ISTP"),
        );
        assert_eq!(compatibility_score(&a, &b), 60);
        assert_eq!(compatibility_score(&a, &c), 70);
        assert_eq!(compatibility_score(&b, &c), 60);

        let forward = match_responses(&[a.clone(), b.clone(), c.clone()]);
        assert_eq!(pair_ids(&forward), vec![("A", "C", 70)]);
        assert_eq!(forward.unmatched, vec!["B".to_string()]);

        let rotated = match_responses(&[b, c, a]);
        assert_eq!(pair_ids(&rotated), vec![("B", "C", 60)]);
        assert_eq!(rotated.unmatched, vec!["A".to_string()]);
    }

    #[test]
    fn ties_go_to_the_earliest_candidate() {
        let responses = vec![
            early_bird("S1"),
            early_bird("S2"),
            early_bird("S3"),
            early_bird("S4"),
        ];
        let outcome = match_responses(&responses);

        assert_eq!(pair_ids(&outcome), vec![("S1", "S2", 85), ("S3", "S4", 85)]);
        assert!(outcome.unmatched.is_empty());
    }

    #[test]
    fn an_unmatched_respondent_is_not_retried() {
        // S1 fits nobody; S2 and S3 still pair with each other afterwards.
        let responses = vec![night_owl("S1"), early_bird("S2"), early_bird("S3")];
        let outcome = match_responses(&responses);

        assert_eq!(pair_ids(&outcome), vec![("S2", "S3", 85)]);
        assert_eq!(outcome.unmatched, vec!["S1".to_string()]);
    }

    #[test]
    fn score_exactly_at_threshold_is_paired() {
        let a = early_bird("A");
        let b = response(
            "B",
            WakeTime::Before6,
            Bedtime::Before10,
            YesNo::Yes,
            YesNo::Yes,
            None,
        );
        assert_eq!(compatibility_score(&a, &b), MIN_PAIR_SCORE);
        assert_eq!(pair_ids(&match_responses(&[a, b])), vec![("A", "B", 50)]);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let responses = vec![
            early_bird("S1"),
            night_owl("S2"),
            early_bird("S3"),
            night_owl("S4"),
            early_bird("S5"),
        ];
        assert_eq!(match_responses(&responses), match_responses(&responses));
    }

    fn arb_response(id: usize) -> impl Strategy<Value = SurveyResponse> {
        (
            prop::sample::select(vec![
                WakeTime::Before6,
                WakeTime::From6To8,
                WakeTime::From8To10,
                WakeTime::After10,
            ]),
            prop::sample::select(vec![
                Bedtime::Before10,
                Bedtime::From10To12,
                Bedtime::From12To2,
                Bedtime::After2,
            ]),
            prop::bool::ANY,
            prop::bool::ANY,
            prop::option::of(prop::sample::select(vec!["", "ENFP", "ISTJ"])),
        )
            .prop_map(move |(wakeup, bedtime, smokes, snores, mbti)| {
                let yes_no = |flag: bool| if flag { YesNo::Yes } else { YesNo::No };
                response(
                    &format!("S{id}"),
                    wakeup,
                    bedtime,
                    yes_no(smokes),
                    yes_no(snores),
                    mbti,
                )
            })
    }

    fn arb_responses() -> impl Strategy<Value = Vec<SurveyResponse>> {
        (0usize..24).prop_flat_map(|len| (0..len).map(arb_response).collect::<Vec<_>>())
    }

    proptest! {
        #[test]
        fn pairs_and_unmatched_partition_the_input(responses in arb_responses()) {
            let outcome = match_responses(&responses);
            let mut seen: Vec<&str> = Vec::new();
            for pair in &outcome.pairs {
                seen.push(&pair.student_a_id);
                seen.push(&pair.student_b_id);
            }
            seen.extend(outcome.unmatched.iter().map(String::as_str));
            seen.sort_unstable();

            let mut expected: Vec<&str> =
                responses.iter().map(|r| r.student_id.as_str()).collect();
            expected.sort_unstable();
            prop_assert_eq!(seen, expected);
        }

        #[test]
        fn every_pair_clears_the_threshold(responses in arb_responses()) {
            for pair in match_responses(&responses).pairs {
                prop_assert!(pair.score >= MIN_PAIR_SCORE);
                prop_assert!(pair.score <= 100);
            }
        }

        #[test]
        fn score_is_symmetric(a in arb_response(0), b in arb_response(1)) {
            let forward = compatibility_score(&a, &b);
            prop_assert_eq!(forward, compatibility_score(&b, &a));
            prop_assert!(forward <= 100);
        }

        #[test]
        fn matching_is_deterministic(responses in arb_responses()) {
            prop_assert_eq!(match_responses(&responses), match_responses(&responses));
        }
    }
}
