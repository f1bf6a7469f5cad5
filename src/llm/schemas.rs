//! Response schemas for the structured requests the pipeline makes.

use serde_json::{json, Value};

use crate::models::MAX_OPTIONS;

/// Schema for one generated question.
///
/// Option count and index range are left to item validation so one bad item
/// is dropped instead of failing the whole response.
pub fn item_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "question": {"type": "string"},
            "options": {
                "type": "array",
                "items": {"type": "string"}
            },
            "correctAnswerIndex": {"type": "integer"},
            "explanation": {"type": "string"},
            "imageIndex": {
                "type": ["integer", "null"],
                "description": "0-based index of the image used for this question, null if no image is used"
            }
        },
        "required": ["question", "options", "correctAnswerIndex", "explanation"]
    })
}

/// Schema for a whole generation response
pub fn generation_schema(questions_per_case: u32) -> Value {
    json!({
        "type": "object",
        "properties": {
            "mcqs": {
                "type": "array",
                "items": item_schema(),
                "description": "Standalone multiple-choice questions"
            },
            "caseScenarios": {
                "type": "array",
                "description": "Case scenarios with their own questions",
                "items": {
                    "type": "object",
                    "properties": {
                        "caseText": {"type": "string"},
                        "items": {
                            "type": "array",
                            "items": item_schema(),
                            "minItems": questions_per_case,
                            "maxItems": questions_per_case
                        }
                    },
                    "required": ["caseText", "items"]
                }
            }
        },
        "required": ["mcqs", "caseScenarios"]
    })
}

pub fn audit_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "is_valid": {"type": "boolean"},
            "reason": {"type": "string"},
            "flaw_type": {
                "type": "string",
                "enum": ["question", "options", "explanation", "not_from_text", "multiple_correct", "no_correct", "none"]
            }
        },
        "required": ["is_valid", "reason", "flaw_type"]
    })
}

/// Item schema with shape limits, for responses that carry a single item
fn strict_item_schema() -> Value {
    let mut schema = item_schema();
    schema["properties"]["options"]["minItems"] = json!(2);
    schema["properties"]["options"]["maxItems"] = json!(MAX_OPTIONS);
    schema["properties"]["correctAnswerIndex"]["minimum"] = json!(0);
    schema
}

pub fn correction_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "corrected_question": strict_item_schema()
        },
        "required": ["corrected_question"]
    })
}

pub fn refinement_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "new_explanation": {"type": "string"}
        },
        "required": ["new_explanation"]
    })
}
