use std::fmt::Write;

use super::state::{item_at, AnswerRecord, Page, Score, SessionEvent, SessionState};
use crate::models::{QuizArtifactData, QuizItem};

pub const FLAW_NOTICE: &str = "Note: this question is under review.";

fn option_letter(index: usize) -> char {
    (b'A'..=b'Z').nth(index).map(char::from).unwrap_or('?')
}

/// Render the current page as plain text for a terminal session
pub fn render(quiz: &QuizArtifactData, state: &SessionState, title: &str) -> String {
    let mut out = String::new();
    match state.page {
        Page::Landing => {
            let _ = writeln!(out, "{}", title);
            let _ = writeln!(
                out,
                "{} questions ({} in the quiz)",
                quiz.items.len(),
                quiz.eligible_indices().len()
            );
            let _ = writeln!(out, "\n[s] start quiz   [r] reference   [q] quit");
        }
        Page::Taking { position } => render_taking(&mut out, quiz, state, position),
        Page::Results => {
            let score = Score::from_answers(&state.answers);
            let _ = writeln!(out, "Results");
            let _ = writeln!(
                out,
                "Score: {} / {} ({})",
                score.correct,
                score.eligible,
                score.formatted_percent()
            );
            if let Some(message) = &state.message {
                let _ = writeln!(out, "{}", message);
            }
            let _ = writeln!(out, "\n[v] review   [r] retake   [h] home   [q] quit");
        }
        Page::Review => {
            let _ = writeln!(out, "Review");
            for (position, index) in quiz.eligible_indices().into_iter().enumerate() {
                let item = &quiz.items[index];
                let answer = state.answers.get(index);
                let _ = writeln!(out);
                write_item(&mut out, position + 1, item, answer);
                let verdict = match answer.and_then(|a| a.is_correct) {
                    Some(true) => "Correct",
                    Some(false) => "Incorrect",
                    None => "Not answered",
                };
                let _ = writeln!(out, "  {}", verdict);
            }
            let _ = writeln!(out, "\n[b] back to results");
        }
        Page::Reference => {
            let _ = writeln!(out, "Reference: all questions and answers");
            for (index, item) in quiz.items.iter().enumerate() {
                let _ = writeln!(out);
                if item.flawed {
                    let _ = writeln!(out, "{}", FLAW_NOTICE);
                }
                write_item(&mut out, index + 1, item, None);
            }
            let _ = writeln!(out, "\n[h] home");
        }
    }
    out
}

fn render_taking(out: &mut String, quiz: &QuizArtifactData, state: &SessionState, position: usize) {
    let Some((index, item)) = item_at(quiz, position) else {
        return;
    };
    let total = quiz.eligible_indices().len();
    let answer = state.answers.get(index).filter(|a| a.is_answered());

    let _ = writeln!(out, "Question {} of {}", position + 1, total);
    if let Some(case_text) = &item.case_text {
        let _ = writeln!(out, "Case: {}", case_text);
    }
    let _ = writeln!(out, "{}", item.prompt);
    if let Some(image) = item.image_ref {
        let _ = writeln!(out, "[image {}]", image + 1);
    }

    for (i, option) in item.options.iter().enumerate() {
        let marker = match answer {
            Some(_) if i == item.correct_index => "+",
            Some(a) if a.selected_option == Some(i) => "x",
            _ => " ",
        };
        let _ = writeln!(out, " {} {}. {}", marker, option_letter(i), option);
    }

    let mut actions = vec![];
    if let Some(a) = answer {
        if a.is_correct == Some(true) {
            let _ = writeln!(out, "\nCorrect!");
        } else {
            let _ = writeln!(
                out,
                "\nIncorrect. The correct answer is {}.",
                option_letter(item.correct_index)
            );
        }
        let _ = writeln!(out, "{}", item.explanation);
    } else if let Some(last) = item.options.len().checked_sub(1) {
        actions.push(format!("[a-{}] answer", option_letter(last).to_ascii_lowercase()));
    }
    if position > 0 {
        actions.push("[p] previous".to_string());
    }
    if answer.is_some() {
        if position + 1 < total {
            actions.push("[n] next".to_string());
        } else {
            actions.push("[f] finish".to_string());
        }
    }
    let _ = writeln!(out, "\n{}", actions.join("   "));
}

fn write_item(out: &mut String, number: usize, item: &QuizItem, answer: Option<&AnswerRecord>) {
    if let Some(case_text) = &item.case_text {
        let _ = writeln!(out, "Case: {}", case_text);
    }
    let _ = writeln!(out, "Question {}: {}", number, item.prompt);
    for (i, option) in item.options.iter().enumerate() {
        let marker = if i == item.correct_index {
            "+"
        } else if answer.and_then(|a| a.selected_option) == Some(i) {
            "x"
        } else {
            " "
        };
        let _ = writeln!(out, " {} {}. {}", marker, option_letter(i), option);
    }
    if !item.explanation.is_empty() {
        let _ = writeln!(out, "Explanation: {}", item.explanation);
    }
}

/// Map a line of terminal input to an event for the given page
pub fn parse_command(page: Page, input: &str) -> Option<SessionEvent> {
    let input = input.trim().to_ascii_lowercase();
    match (page, input.as_str()) {
        (Page::Landing, "s" | "start") => Some(SessionEvent::Start),
        (Page::Landing, "r" | "reference") => Some(SessionEvent::OpenReference),
        (Page::Taking { .. }, "p" | "prev" | "previous") => Some(SessionEvent::Previous),
        (Page::Taking { .. }, "n" | "next") => Some(SessionEvent::Next),
        (Page::Taking { .. }, "f" | "finish") => Some(SessionEvent::Finish),
        (Page::Taking { .. }, letter) if letter.len() == 1 => {
            let c = letter.as_bytes()[0];
            c.is_ascii_lowercase()
                .then(|| SessionEvent::Select((c - b'a') as usize))
        }
        (Page::Results, "v" | "review") => Some(SessionEvent::OpenReview),
        (Page::Results, "r" | "retake") => Some(SessionEvent::Retake),
        (Page::Results | Page::Reference, "h" | "home") => Some(SessionEvent::Home),
        (Page::Review, "b" | "back") => Some(SessionEvent::BackToResults),
        _ => None,
    }
}
