use std::collections::{BTreeMap, BTreeSet};

use bevy_ecs::prelude::*;
use bevy_utils::tracing::{debug, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::AnswerPolicy;
use crate::core::observers::{ObserverId, Observers};
use crate::data::catalog::ContentLibrary;
use crate::data::dialogue::SequenceId;
use crate::data::questions::{Question, QuestionId};
use crate::deduction::answers::{
    can_answer_correctly, is_unlocked, shuffled_available_answers,
};
use crate::narrative::conditions::StoryState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub text: String,
    pub correct: bool,
}

/// Result of one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub question: QuestionId,
    pub correct: bool,
    /// The on-correct or on-wrong sequence, when the question configures one.
    pub follow_up: Option<SequenceId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    QuestionRevealed(QuestionId),
    AnswerSubmitted(Submission),
}

/// Deduction board state: explicit reveals and recorded answers.
#[derive(Resource, Debug)]
pub struct DeductionBoard {
    revealed: BTreeSet<QuestionId>,
    answers: BTreeMap<QuestionId, SubmittedAnswer>,
    policy: AnswerPolicy,
    rng: ChaCha8Rng,
    observers: Observers<DeductionBoard, BoardEvent>,
}

impl Default for DeductionBoard {
    fn default() -> Self {
        Self::new(AnswerPolicy::default(), 0)
    }
}

impl DeductionBoard {
    pub fn new(policy: AnswerPolicy, seed: u64) -> Self {
        Self {
            revealed: BTreeSet::new(),
            answers: BTreeMap::new(),
            policy,
            rng: ChaCha8Rng::seed_from_u64(seed),
            observers: Observers::default(),
        }
    }

    pub fn policy(&self) -> AnswerPolicy {
        self.policy
    }

    /// Force a question onto the board. Returns false if it was already revealed.
    pub fn reveal(&mut self, id: QuestionId) -> bool {
        if !self.revealed.insert(id) {
            return false;
        }
        debug!(question = id.0, "question revealed");
        self.observers.emit(self, &BoardEvent::QuestionRevealed(id));
        true
    }

    pub fn is_revealed(&self, id: QuestionId) -> bool {
        self.revealed.contains(&id)
    }

    pub fn is_visible(&self, question: &Question, state: StoryState<'_>) -> bool {
        self.is_revealed(question.id) || is_unlocked(question, state)
    }

    /// Visible questions ordered by category, then display order, then id.
    pub fn visible_questions<'a>(
        &self,
        library: &'a ContentLibrary,
        state: StoryState<'_>,
    ) -> Vec<&'a Question> {
        let mut questions: Vec<&Question> = library
            .questions
            .values()
            .filter(|question| self.is_visible(question, state))
            .collect();
        questions.sort_by(|a, b| {
            (a.category.as_str(), a.display_order, a.id).cmp(&(
                b.category.as_str(),
                b.display_order,
                b.id,
            ))
        });
        questions
    }

    pub fn by_category<'a>(
        &self,
        library: &'a ContentLibrary,
        state: StoryState<'_>,
    ) -> BTreeMap<&'a str, Vec<&'a Question>> {
        let mut grouped: BTreeMap<&str, Vec<&Question>> = BTreeMap::new();
        for question in self.visible_questions(library, state) {
            grouped
                .entry(question.category.as_str())
                .or_default()
                .push(question);
        }
        grouped
    }

    /// Answer texts to offer for a question, freshly shuffled.
    pub fn answer_choices(&mut self, question: &Question, state: StoryState<'_>) -> Vec<String> {
        shuffled_available_answers(question, state, &mut self.rng)
            .into_iter()
            .map(|answer| answer.text.clone())
            .collect()
    }

    /// Record an answer, replacing any earlier one for the same question.
    pub fn submit(&mut self, question: &Question, text: &str, state: StoryState<'_>) -> Submission {
        let text_matches = question.is_correct_text(text);
        let correct = if self.policy.enforce_availability {
            text_matches && can_answer_correctly(question, state)
        } else {
            text_matches
        };
        if text_matches && !correct {
            debug!(question = question.id.0, "correct text submitted before it was available");
        }
        if question.find_answer(text).is_none() {
            debug!(question = question.id.0, text, "submitted text is not a configured answer");
        }

        self.answers.insert(
            question.id,
            SubmittedAnswer {
                text: text.to_string(),
                correct,
            },
        );
        let follow_up = if correct {
            question.on_correct.clone()
        } else {
            question.on_wrong.clone()
        };
        let submission = Submission {
            question: question.id,
            correct,
            follow_up,
        };
        self.observers
            .emit(self, &BoardEvent::AnswerSubmitted(submission.clone()));
        submission
    }

    /// Submit by id, logging and doing nothing when the question is unknown.
    pub fn submit_by_id(
        &mut self,
        library: &ContentLibrary,
        id: QuestionId,
        text: &str,
        state: StoryState<'_>,
    ) -> Option<Submission> {
        let Some(question) = library.question(id) else {
            warn!(question = id.0, "answer submitted for unknown question");
            return None;
        };
        Some(self.submit(question, text, state))
    }

    pub fn answer(&self, id: QuestionId) -> Option<&SubmittedAnswer> {
        self.answers.get(&id)
    }

    pub fn answers(&self) -> &BTreeMap<QuestionId, SubmittedAnswer> {
        &self.answers
    }

    pub fn revealed(&self) -> impl Iterator<Item = QuestionId> + '_ {
        self.revealed.iter().copied()
    }

    /// Every visible question holds a correct answer.
    pub fn is_solved(&self, library: &ContentLibrary, state: StoryState<'_>) -> bool {
        let visible = self.visible_questions(library, state);
        !visible.is_empty()
            && visible
                .iter()
                .all(|q| self.answers.get(&q.id).map_or(false, |a| a.correct))
    }

    pub fn restore(
        &mut self,
        revealed: impl IntoIterator<Item = QuestionId>,
        answers: impl IntoIterator<Item = (QuestionId, SubmittedAnswer)>,
    ) {
        self.revealed = revealed.into_iter().collect();
        self.answers = answers.into_iter().collect();
    }

    pub fn clear(&mut self) {
        self.revealed.clear();
        self.answers.clear();
    }

    pub fn on_event(
        &mut self,
        callback: impl Fn(&DeductionBoard, &BoardEvent) + Send + Sync + 'static,
    ) -> ObserverId {
        self.observers.subscribe(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::clues::ClueId;
    use crate::data::questions::AnswerOption;
    use crate::simulation::clues::ClueRegistry;
    use crate::simulation::flags::FlagStore;

    fn weapon_question() -> Question {
        Question {
            id: QuestionId(1),
            text: "The victim was struck with ___.".to_string(),
            correct: AnswerOption::new("a hammer").requiring([5]),
            incorrect: vec![AnswerOption::new("a knife")],
            category: "Weapon".to_string(),
            display_order: 1,
            on_correct: Some(SequenceId::from("weapon_right")),
            on_wrong: Some(SequenceId::from("weapon_wrong")),
        }
    }

    fn scenario_clues() -> ClueRegistry {
        let mut clues = ClueRegistry::default();
        clues.discover(ClueId(1));
        clues.discover(ClueId(2));
        clues
    }

    #[test]
    fn gated_correct_text_is_wrong_under_enforcing_policy() {
        let flags = FlagStore::default();
        let clues = scenario_clues();
        let state = StoryState::new(&flags, &clues);
        let q = weapon_question();
        let mut board = DeductionBoard::default();

        assert!(is_unlocked(&q, state));
        assert!(!can_answer_correctly(&q, state));

        let knife = board.submit(&q, "a knife", state);
        assert!(!knife.correct);
        assert_eq!(knife.follow_up.as_ref().map(|s| s.as_str()), Some("weapon_wrong"));

        let hammer = board.submit(&q, "a hammer", state);
        assert!(!hammer.correct);
        assert_eq!(board.answer(q.id).map(|a| a.text.as_str()), Some("a hammer"));
    }

    #[test]
    fn trusting_policy_accepts_text_match() {
        let flags = FlagStore::default();
        let clues = scenario_clues();
        let state = StoryState::new(&flags, &clues);
        let mut board = DeductionBoard::new(
            AnswerPolicy {
                enforce_availability: false,
            },
            1,
        );
        let hammer = board.submit(&weapon_question(), "a hammer", state);
        assert!(hammer.correct);
        assert_eq!(hammer.follow_up.as_ref().map(|s| s.as_str()), Some("weapon_right"));
    }

    #[test]
    fn resubmission_overwrites_previous_answer() {
        let flags = FlagStore::default();
        let mut clues = scenario_clues();
        clues.discover(ClueId(5));
        let state = StoryState::new(&flags, &clues);
        let q = weapon_question();
        let mut board = DeductionBoard::default();
        board.submit(&q, "a knife", state);
        assert_eq!(board.answer(q.id).map(|a| a.correct), Some(false));
        let second = board.submit(&q, "a hammer", state);
        assert!(second.correct);
        assert_eq!(board.answers().len(), 1);
        assert_eq!(board.answer(q.id).map(|a| a.correct), Some(true));
    }

    #[test]
    fn revealed_question_is_visible_while_locked() {
        let flags = FlagStore::default();
        let clues = ClueRegistry::default();
        let state = StoryState::new(&flags, &clues);
        let mut locked = weapon_question();
        locked.incorrect = vec![AnswerOption::new("a rope").requiring([9])];
        let library = ContentLibrary {
            questions: [(locked.id, locked.clone())].into_iter().collect(),
            ..ContentLibrary::default()
        };
        let mut board = DeductionBoard::default();
        assert!(board.visible_questions(&library, state).is_empty());
        assert!(board.reveal(locked.id));
        assert!(!board.reveal(locked.id));
        assert_eq!(board.visible_questions(&library, state).len(), 1);
    }

    #[test]
    fn board_orders_by_category_then_display_order() {
        let flags = FlagStore::default();
        let clues = ClueRegistry::default();
        let state = StoryState::new(&flags, &clues);
        let make = |id: u32, category: &str, order: i32| Question {
            id: QuestionId(id),
            text: "___".to_string(),
            correct: AnswerOption::new("x"),
            incorrect: Vec::new(),
            category: category.to_string(),
            display_order: order,
            on_correct: None,
            on_wrong: None,
        };
        let library = ContentLibrary {
            questions: [
                make(1, "Motive", 2),
                make(2, "Motive", 1),
                make(3, "How", 5),
            ]
            .into_iter()
            .map(|q| (q.id, q))
            .collect(),
            ..ContentLibrary::default()
        };
        let board = DeductionBoard::default();
        let order: Vec<u32> = board
            .visible_questions(&library, state)
            .iter()
            .map(|q| q.id.0)
            .collect();
        assert_eq!(order, vec![3, 2, 1]);
        let grouped = board.by_category(&library, state);
        assert_eq!(grouped.keys().copied().collect::<Vec<_>>(), vec!["How", "Motive"]);
    }

    #[test]
    fn solved_when_every_visible_question_is_correct() {
        let flags = FlagStore::default();
        let mut clues = scenario_clues();
        clues.discover(ClueId(5));
        let state = StoryState::new(&flags, &clues);
        let q = weapon_question();
        let library = ContentLibrary {
            questions: [(q.id, q.clone())].into_iter().collect(),
            ..ContentLibrary::default()
        };
        let mut board = DeductionBoard::default();
        assert!(!board.is_solved(&library, state));
        board.submit(&q, "a hammer", state);
        assert!(board.is_solved(&library, state));
    }

    #[test]
    fn unknown_question_submission_is_a_no_op() {
        let flags = FlagStore::default();
        let clues = ClueRegistry::default();
        let mut board = DeductionBoard::default();
        let result = board.submit_by_id(
            &ContentLibrary::default(),
            QuestionId(99),
            "anything",
            StoryState::new(&flags, &clues),
        );
        assert!(result.is_none());
        assert!(board.answers().is_empty());
    }

    #[test]
    fn answer_choices_only_offer_available_answers() {
        let flags = FlagStore::default();
        let clues = scenario_clues();
        let mut board = DeductionBoard::default();
        let choices = board.answer_choices(&weapon_question(), StoryState::new(&flags, &clues));
        assert_eq!(choices, vec!["a knife".to_string()]);
    }
}
