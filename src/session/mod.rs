//! Quiz-taking state machine shared by the terminal session and mirrored by
//! the runtime embedded in rendered artifacts.

pub mod messages;
pub mod state;
pub mod view;

pub use messages::*;
pub use state::*;
pub use view::*;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::models::QuizArtifactData;

/// A quiz being taken: immutable data plus the current session state
pub struct QuizSession {
    quiz: QuizArtifactData,
    state: SessionState,
    rng: StdRng,
}

impl QuizSession {
    pub fn new(quiz: QuizArtifactData, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            quiz,
            state: SessionState::default(),
            rng,
        }
    }

    pub fn dispatch(&mut self, event: SessionEvent) -> &SessionState {
        self.state = transition(&self.quiz, &self.state, event, &mut self.rng);
        &self.state
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn quiz(&self) -> &QuizArtifactData {
        &self.quiz
    }

    pub fn score(&self) -> Score {
        Score::from_answers(&self.state.answers)
    }

    pub fn render(&self, title: &str) -> String {
        view::render(&self.quiz, &self.state, title)
    }
}
