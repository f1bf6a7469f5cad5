use rand::seq::SliceRandom;
use rand::Rng;

/// Minimum score percentage that counts as a pass
pub const PASS_THRESHOLD: f64 = 60.0;

pub const SUCCESS_MESSAGES: [&str; 3] = [
    "Excellent work! You clearly know this material.",
    "Well done! Your preparation is paying off.",
    "Great result! Keep up the steady progress.",
];

pub const FAILURE_MESSAGES: [&str; 3] = [
    "Not quite there yet. Review the explanations and try again.",
    "Every attempt teaches something. Go over the material once more.",
    "Keep going! A second pass through the source will help.",
];

/// Pick a closing message uniformly from the pool matching the outcome
pub fn pick_message<R: Rng + ?Sized>(passed: bool, rng: &mut R) -> &'static str {
    let pool: &[&'static str] = if passed {
        &SUCCESS_MESSAGES
    } else {
        &FAILURE_MESSAGES
    };
    pool.choose(rng).copied().unwrap_or_default()
}
