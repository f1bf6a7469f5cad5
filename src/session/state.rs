use rand::Rng;
use serde::{Deserialize, Serialize};

use super::messages::{pick_message, PASS_THRESHOLD};
use crate::models::{QuizArtifactData, QuizItem};

/// Screen currently shown to the quiz taker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "page", rename_all = "snake_case")]
pub enum Page {
    #[default]
    Landing,
    /// `position` indexes the eligible (non-flawed) items
    Taking { position: usize },
    Results,
    Review,
    Reference,
}

/// Answer slot for one item. Flawed items keep a slot but are never
/// answered or scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub item_index: usize,
    pub selected_option: Option<usize>,
    pub is_correct: Option<bool>,
    pub flawed: bool,
}

impl AnswerRecord {
    pub fn is_answered(&self) -> bool {
        self.selected_option.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub page: Page,
    pub answers: Vec<AnswerRecord>,
    /// Closing message chosen on entering the results page
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Start,
    OpenReference,
    Select(usize),
    Previous,
    Next,
    Finish,
    OpenReview,
    BackToResults,
    Retake,
    Home,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub correct: usize,
    pub eligible: usize,
    pub percent: f64,
}

impl Score {
    pub fn from_answers(answers: &[AnswerRecord]) -> Self {
        let eligible = answers.iter().filter(|a| !a.flawed).count();
        let correct = answers
            .iter()
            .filter(|a| !a.flawed && a.is_correct == Some(true))
            .count();
        let percent = if eligible > 0 {
            correct as f64 / eligible as f64 * 100.0
        } else {
            0.0
        };
        Self {
            correct,
            eligible,
            percent,
        }
    }

    pub fn passed(&self) -> bool {
        self.percent >= PASS_THRESHOLD
    }

    pub fn formatted_percent(&self) -> String {
        format!("{:.1}%", self.percent)
    }
}

/// Fresh answer slots, one per item
pub fn fresh_answers(quiz: &QuizArtifactData) -> Vec<AnswerRecord> {
    quiz.items
        .iter()
        .enumerate()
        .map(|(item_index, item)| AnswerRecord {
            item_index,
            selected_option: None,
            is_correct: None,
            flawed: item.flawed,
        })
        .collect()
}

/// Item shown at an eligible position, with its index in the full item list
pub fn item_at<'q>(quiz: &'q QuizArtifactData, position: usize) -> Option<(usize, &'q QuizItem)> {
    let index = *quiz.eligible_indices().get(position)?;
    quiz.items.get(index).map(|item| (index, item))
}

/// Apply one user event. Events that do not apply to the current page, or
/// would break an invariant, leave the state unchanged.
pub fn transition<R>(
    quiz: &QuizArtifactData,
    state: &SessionState,
    event: SessionEvent,
    rng: &mut R,
) -> SessionState
where
    R: Rng + ?Sized,
{
    let eligible = quiz.eligible_indices().len();
    let mut next = state.clone();

    match (state.page, event) {
        (Page::Landing, SessionEvent::Start) | (Page::Results, SessionEvent::Retake) => {
            next.answers = fresh_answers(quiz);
            next.message = None;
            if eligible == 0 {
                enter_results(&mut next, rng);
            } else {
                next.page = Page::Taking { position: 0 };
            }
        }
        (Page::Landing, SessionEvent::OpenReference) => next.page = Page::Reference,
        (Page::Reference, SessionEvent::Home) | (Page::Results, SessionEvent::Home) => {
            next.page = Page::Landing
        }
        (Page::Taking { position }, SessionEvent::Select(option)) => {
            let Some((index, item)) = item_at(quiz, position) else {
                return next;
            };
            if option >= item.options.len() {
                return next;
            }
            if let Some(record) = next.answers.get_mut(index) {
                if !record.is_answered() {
                    record.selected_option = Some(option);
                    record.is_correct = Some(option == item.correct_index);
                }
            }
        }
        (Page::Taking { position }, SessionEvent::Previous) if position > 0 => {
            next.page = Page::Taking {
                position: position - 1,
            };
        }
        (Page::Taking { position }, SessionEvent::Next)
            if position + 1 < eligible && is_answered_at(quiz, state, position) =>
        {
            next.page = Page::Taking {
                position: position + 1,
            };
        }
        (Page::Taking { position }, SessionEvent::Finish)
            if position + 1 == eligible && is_answered_at(quiz, state, position) =>
        {
            enter_results(&mut next, rng);
        }
        (Page::Results, SessionEvent::OpenReview) => next.page = Page::Review,
        (Page::Review, SessionEvent::BackToResults) => next.page = Page::Results,
        _ => {}
    }

    next
}

fn is_answered_at(quiz: &QuizArtifactData, state: &SessionState, position: usize) -> bool {
    item_at(quiz, position)
        .and_then(|(index, _)| state.answers.get(index))
        .is_some_and(AnswerRecord::is_answered)
}

fn enter_results<R: Rng + ?Sized>(state: &mut SessionState, rng: &mut R) {
    let score = Score::from_answers(&state.answers);
    state.message = Some(pick_message(score.passed(), rng).to_string());
    state.page = Page::Results;
}
