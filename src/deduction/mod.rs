pub mod answers;
pub mod board;

pub use answers::{
    available_answers, can_answer_correctly, is_answer_available, is_unlocked,
    shuffled_available_answers,
};
pub use board::{BoardEvent, DeductionBoard, Submission, SubmittedAnswer};
