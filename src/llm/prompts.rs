use crate::models::{AuditVerdict, Difficulty, GenerationConfig, ItemPayload, QuizItem, SourceDocument};

use super::PromptPart;

/// Build the multi-part content for a request: instruction first, then the
/// source text, then every image in order
pub fn with_source(instruction: String, source: &SourceDocument) -> Vec<PromptPart> {
    let mut parts = Vec::with_capacity(source.images.len() + 2);
    parts.push(PromptPart::Text(instruction));
    parts.push(PromptPart::Text(source.text.clone()));
    parts.extend(source.images.iter().cloned().map(PromptPart::Image));
    parts
}

pub fn difficulty_directive(difficulty: Difficulty) -> String {
    match difficulty {
        Difficulty::Mix => "Create a mix of easy, medium, and hard questions.".to_string(),
        other => format!(
            "Ensure ALL questions generated are of **{}** difficulty.",
            other
        ),
    }
}

pub fn image_directive(image_count: usize) -> String {
    if image_count > 0 {
        format!(
            "You have been provided with {} images. You MUST create some questions based on these images. \
             When creating an image-based question, set 'imageIndex' to the 0-based index of the image you used. \
             For text-only questions, set 'imageIndex' to null.",
            image_count
        )
    } else {
        "No images were provided; do not attempt to create image-based questions.".to_string()
    }
}

/// Build the instruction for the generation request
pub fn build_generation_prompt(config: &GenerationConfig, image_count: usize) -> String {
    let custom = if config.custom_instructions.trim().is_empty() {
        "None provided. Adhere to standard question generation."
    } else {
        config.custom_instructions.as_str()
    };

    let mut prompt = String::new();
    prompt.push_str(
        "You are an expert quiz author. Based on the provided source text and images, generate a set of questions.\n\n",
    );
    prompt.push_str("## Source Content\n");
    prompt.push_str(&format!(
        "The source is provided in multi-part format: the text comes first, followed by {} images.\n\n",
        image_count
    ));
    prompt.push_str("## Your Task\n");
    prompt.push_str(&format!(
        "1. Generate exactly {} standalone multiple-choice questions.\n",
        config.mcq_count
    ));
    prompt.push_str(&format!(
        "2. Generate exactly {} case scenarios, each with exactly {} questions.\n",
        config.case_count, config.questions_per_case
    ));
    prompt.push_str(&format!("3. {}\n", image_directive(image_count)));
    prompt.push_str(&format!("4. {}\n", difficulty_directive(config.difficulty)));
    prompt.push_str(&format!("5. **Custom User Instructions:** {}\n", custom));
    prompt.push_str(
        "6. **Crucial:** All information (stems, options, explanations) must be derived strictly from the provided text and images. \
         Avoid phrases like \"According to the text\".\n",
    );
    prompt.push_str("7. Return the result in the specified JSON format.\n");
    prompt
}

/// Build the instruction for auditing one item
pub fn build_audit_prompt(item: &QuizItem) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "Act as a strict question auditor. Critically audit the following question based ONLY on the provided source text and images.\n",
    );
    prompt.push_str("Criteria:\n");
    prompt.push_str(
        "1. **Source Adherence:** Is ALL information (stem, options, explanation) derived strictly and accurately from the source content?\n",
    );
    prompt.push_str(
        "2. **Clarity & Validity:** Is the question clear? Is there only one unambiguously correct answer? Are distractors plausible but incorrect?\n",
    );
    prompt.push_str(
        "3. **Image Usage:** If 'imageIndex' is not null, does the question correctly relate to the specified image?\n\n",
    );
    prompt.push_str(
        "If valid, return {\"is_valid\": true, \"reason\": \"None\", \"flaw_type\": \"none\"}.\n",
    );
    prompt.push_str(
        "If flawed, return {\"is_valid\": false, \"reason\": \"<brief description>\", \"flaw_type\": \"<one of question, options, explanation, not_from_text, multiple_correct, no_correct>\"}.\n\n",
    );
    prompt.push_str(&format!("**Question to Audit:** {}\n", item_json(item)));
    prompt.push_str("Return your verdict as a JSON object.");
    prompt
}

/// Build the instruction for correcting an item the auditor rejected
pub fn build_correction_prompt(item: &QuizItem, verdict: &AuditVerdict) -> String {
    let mut prompt = String::new();
    prompt.push_str(&format!(
        "Based ONLY on the source text and images, correct the following question. \
         The auditor identified a flaw in the **{}**: \"{}\".\n",
        verdict.flaw_type.as_str(),
        verdict.reason
    ));
    prompt.push_str("Ensure the corrected question is accurate and has exactly one correct answer.\n");
    prompt.push_str("**Source content is provided in multi-part format.**\n");
    prompt.push_str(&format!("**Flawed Question:** {}\n", item_json(item)));
    prompt.push_str(
        "Return the complete, corrected question object in JSON under the key 'corrected_question'.",
    );
    prompt
}

/// Build the instruction for rewriting a flagged item's explanation
pub fn build_refinement_prompt(item: &QuizItem) -> String {
    let current = if item.explanation.trim().is_empty() {
        "None provided"
    } else {
        item.explanation.as_str()
    };

    let mut prompt = String::new();
    prompt.push_str(
        "Based ONLY on the source text and images, rewrite the explanation for this question to clearly and accurately justify why the specified correct answer is correct. \
         This question was flagged as flawed, so pay extra attention to accuracy.\n",
    );
    prompt.push_str("**Source content is provided in multi-part format.**\n");
    prompt.push_str(&format!("**Question:** {}\n", item.prompt));
    prompt.push_str(&format!(
        "**Correct Answer Option Content:** {}\n",
        item.correct_option()
    ));
    prompt.push_str(&format!("**Current Explanation (for context):** {}\n", current));
    prompt.push_str("Return the rewritten explanation in JSON with key 'new_explanation'.");
    prompt
}

/// Build the prompt for free-form questions about a document
pub fn build_answer_prompt(document: &str, question: &str) -> String {
    format!(
        "Based **only** on the following document, answer the user's question.\n\
         If the information is not in the document, state that you cannot find the answer in the provided text.\n\n\
         --- DOCUMENT START ---\n{}\n--- DOCUMENT END ---\n\n\
         QUESTION: \"{}\"\n",
        document, question
    )
}

fn item_json(item: &QuizItem) -> String {
    serde_json::to_string(&ItemPayload::from(item)).unwrap_or_else(|_| "{}".to_string())
}
