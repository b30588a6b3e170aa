use rand::seq::SliceRandom;
use rand::Rng;

use crate::data::questions::{AnswerOption, Question};
use crate::narrative::conditions::StoryState;

/// Whether an answer can currently be offered.
///
/// A set unlock flag bypasses the clue requirement. Otherwise every required
/// clue must be discovered. An answer gated only by a flag stays closed until
/// that flag is set; an answer with no gate at all is always open.
pub fn is_answer_available(answer: &AnswerOption, state: StoryState<'_>) -> bool {
    let flag = answer
        .unlock_flag
        .as_deref()
        .map(str::trim)
        .filter(|flag| !flag.is_empty());
    if let Some(flag) = flag {
        if state.has_flag(flag) {
            return true;
        }
    }
    if !answer.required_clues.is_empty() {
        return state.has_all_clues(&answer.required_clues);
    }
    flag.is_none()
}

/// Shown on the board as soon as any answer, right or wrong, is available.
pub fn is_unlocked(question: &Question, state: StoryState<'_>) -> bool {
    question
        .answers()
        .any(|answer| is_answer_available(answer, state))
}

pub fn can_answer_correctly(question: &Question, state: StoryState<'_>) -> bool {
    is_answer_available(&question.correct, state)
}

/// Available answers, correct first, then incorrect in declaration order.
pub fn available_answers<'q>(question: &'q Question, state: StoryState<'_>) -> Vec<&'q AnswerOption> {
    question
        .answers()
        .filter(|answer| is_answer_available(answer, state))
        .collect()
}

/// Available answers in a uniformly random order.
pub fn shuffled_available_answers<'q, R: Rng + ?Sized>(
    question: &'q Question,
    state: StoryState<'_>,
    rng: &mut R,
) -> Vec<&'q AnswerOption> {
    let mut answers = available_answers(question, state);
    answers.shuffle(rng);
    answers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::clues::ClueId;
    use crate::data::questions::QuestionId;
    use crate::simulation::clues::ClueRegistry;
    use crate::simulation::flags::FlagStore;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashMap;

    fn question(correct: AnswerOption, incorrect: Vec<AnswerOption>) -> Question {
        Question {
            id: QuestionId(1),
            text: "The victim was struck with ___.".to_string(),
            correct,
            incorrect,
            category: String::new(),
            display_order: 0,
            on_correct: None,
            on_wrong: None,
        }
    }

    #[test]
    fn all_required_clues_must_be_found() {
        let flags = FlagStore::default();
        let mut clues = ClueRegistry::default();
        let answer = AnswerOption::new("the gardener").requiring([1, 2, 3]);
        for id in [1, 2] {
            clues.discover(ClueId(id));
            assert!(!is_answer_available(&answer, StoryState::new(&flags, &clues)));
        }
        clues.discover(ClueId(3));
        assert!(is_answer_available(&answer, StoryState::new(&flags, &clues)));
        clues.discover(ClueId(9));
        assert!(is_answer_available(&answer, StoryState::new(&flags, &clues)));
    }

    #[test]
    fn missing_any_single_clue_closes_the_answer() {
        let flags = FlagStore::default();
        let answer = AnswerOption::new("x").requiring([1, 2, 3]);
        for missing in [1, 2, 3] {
            let mut clues = ClueRegistry::default();
            for id in [1, 2, 3].into_iter().filter(|id| *id != missing) {
                clues.discover(ClueId(id));
            }
            assert!(!is_answer_available(&answer, StoryState::new(&flags, &clues)));
        }
    }

    #[test]
    fn ungated_answers_are_open_by_default() {
        let flags = FlagStore::default();
        let clues = ClueRegistry::default();
        assert!(is_answer_available(
            &AnswerOption::new("a knife"),
            StoryState::new(&flags, &clues)
        ));
    }

    #[test]
    fn unlock_flag_substitutes_for_clues() {
        let mut flags = FlagStore::default();
        let clues = ClueRegistry::default();
        let answer = AnswerOption::new("poison").requiring([4]).unlocked_by("lab_report");
        assert!(!is_answer_available(&answer, StoryState::new(&flags, &clues)));
        flags.set("lab_report");
        assert!(is_answer_available(&answer, StoryState::new(&flags, &clues)));
    }

    #[test]
    fn flag_only_answer_waits_for_its_flag() {
        let mut flags = FlagStore::default();
        let clues = ClueRegistry::default();
        let answer = AnswerOption::new("the heir").unlocked_by("read_will");
        assert!(!is_answer_available(&answer, StoryState::new(&flags, &clues)));
        flags.set("read_will");
        assert!(is_answer_available(&answer, StoryState::new(&flags, &clues)));
    }

    #[test]
    fn wrong_answer_unlocks_question_before_correct_one() {
        let flags = FlagStore::default();
        let mut clues = ClueRegistry::default();
        clues.discover(ClueId(1));
        clues.discover(ClueId(2));
        let q = question(
            AnswerOption::new("a hammer").requiring([5]),
            vec![AnswerOption::new("a knife")],
        );
        let state = StoryState::new(&flags, &clues);
        assert!(is_unlocked(&q, state));
        assert!(!can_answer_correctly(&q, state));
        let texts: Vec<&str> = available_answers(&q, state)
            .iter()
            .map(|a| a.text.as_str())
            .collect();
        assert_eq!(texts, vec!["a knife"]);
    }

    #[test]
    fn question_with_no_available_answer_stays_locked() {
        let flags = FlagStore::default();
        let clues = ClueRegistry::default();
        let q = question(
            AnswerOption::new("a").requiring([1]),
            vec![AnswerOption::new("b").unlocked_by("f")],
        );
        assert!(!is_unlocked(&q, StoryState::new(&flags, &clues)));
    }

    #[test]
    fn shuffle_is_a_permutation_and_roughly_uniform() {
        let flags = FlagStore::default();
        let clues = ClueRegistry::default();
        let q = question(
            AnswerOption::new("a"),
            vec![AnswerOption::new("b"), AnswerOption::new("c")],
        );
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut counts: HashMap<String, u32> = HashMap::new();
        let rounds = 6_000;
        for _ in 0..rounds {
            let order = shuffled_available_answers(&q, StoryState::new(&flags, &clues), &mut rng);
            assert_eq!(order.len(), 3);
            let key: String = order.iter().map(|a| a.text.as_str()).collect();
            *counts.entry(key).or_default() += 1;
        }
        assert_eq!(counts.len(), 6);
        for count in counts.values() {
            assert!((800..1200).contains(count), "skewed permutation count {}", count);
        }
    }
}
