use serde::{Deserialize, Serialize};

/// Options are answered by letter, so an item holds at most A to Z
pub const MAX_OPTIONS: usize = 26;

/// Reasons an item cannot be accepted into the pool
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ItemError {
    #[error("question text is empty")]
    EmptyPrompt,
    #[error("item needs at least 2 options, got {0}")]
    TooFewOptions(usize),
    #[error("item allows at most {MAX_OPTIONS} options, got {0}")]
    TooManyOptions(usize),
    #[error("correct index {index} is out of range for {options} options")]
    CorrectIndexOutOfRange { index: i64, options: usize },
}

/// A single multiple-choice question as carried through the pipeline and
/// embedded in the artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizItem {
    /// Question stem
    pub prompt: String,
    /// Answer options, fixed in length once created
    pub options: Vec<String>,
    /// Index of the correct option, always valid for `options`
    pub correct_index: usize,
    /// Why the correct option is correct
    pub explanation: String,
    /// Shared case narrative for case-grouped items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_text: Option<String>,
    /// Index into the artifact's image set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<usize>,
    /// Failed audit and could not be corrected automatically
    #[serde(default)]
    pub flawed: bool,
}

impl QuizItem {
    /// Create an item, enforcing the option/correct-index invariants
    pub fn new(
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_index: usize,
        explanation: impl Into<String>,
    ) -> Result<Self, ItemError> {
        let prompt = prompt.into();
        check_shape(&prompt, &options, correct_index as i64)?;

        Ok(Self {
            prompt,
            options,
            correct_index,
            explanation: explanation.into(),
            case_text: None,
            image_ref: None,
            flawed: false,
        })
    }

    /// Re-check the shape of an item that did not come through `new`,
    /// such as one deserialized from an artifact
    pub fn validate(&self) -> Result<(), ItemError> {
        check_shape(&self.prompt, &self.options, self.correct_index as i64)
    }

    pub fn with_case(mut self, case_text: impl Into<String>) -> Self {
        self.case_text = Some(case_text.into());
        self
    }

    pub fn with_image(mut self, image_ref: usize) -> Self {
        self.image_ref = Some(image_ref);
        self
    }

    pub fn flagged(mut self) -> Self {
        self.flawed = true;
        self
    }

    /// Text of the correct option
    pub fn correct_option(&self) -> &str {
        self.options
            .get(self.correct_index)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Short single-line preview of the question, for progress logs
    pub fn preview(&self, max_chars: usize) -> String {
        let flat: String = self.prompt.split_whitespace().collect::<Vec<_>>().join(" ");
        if flat.chars().count() <= max_chars {
            flat
        } else {
            let cut: String = flat.chars().take(max_chars).collect();
            format!("{}...", cut)
        }
    }
}

fn check_shape(prompt: &str, options: &[String], correct_index: i64) -> Result<(), ItemError> {
    if prompt.trim().is_empty() {
        return Err(ItemError::EmptyPrompt);
    }
    if options.len() < 2 {
        return Err(ItemError::TooFewOptions(options.len()));
    }
    if options.len() > MAX_OPTIONS {
        return Err(ItemError::TooManyOptions(options.len()));
    }
    if correct_index < 0 || correct_index as usize >= options.len() {
        return Err(ItemError::CorrectIndexOutOfRange {
            index: correct_index,
            options: options.len(),
        });
    }
    Ok(())
}

/// Case scenario produced during generation, flattened before later stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseGroup {
    pub case_text: String,
    pub items: Vec<QuizItem>,
}

impl CaseGroup {
    /// Flatten into pool items, each inheriting the case text
    pub fn flatten(self) -> impl Iterator<Item = QuizItem> {
        let case_text = self.case_text;
        self.items
            .into_iter()
            .map(move |item| item.with_case(case_text.clone()))
    }
}

/// Item shape exchanged with the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPayload {
    pub question: String,
    pub options: Vec<String>,
    #[serde(deserialize_with = "de_index")]
    pub correct_answer_index: i64,
    #[serde(default)]
    pub explanation: String,
    #[serde(
        default,
        deserialize_with = "de_opt_index",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_index: Option<i64>,
}

impl ItemPayload {
    /// Convert to a pool item. Image references outside `0..image_count`
    /// are dropped rather than rejected.
    pub fn into_item(self, image_count: usize) -> Result<QuizItem, ItemError> {
        check_shape(&self.question, &self.options, self.correct_answer_index)?;

        let image_ref = self
            .image_index
            .filter(|&i| i >= 0 && (i as usize) < image_count)
            .map(|i| i as usize);

        Ok(QuizItem {
            prompt: self.question,
            options: self.options,
            correct_index: self.correct_answer_index as usize,
            explanation: self.explanation,
            case_text: None,
            image_ref,
            flawed: false,
        })
    }
}

impl From<&QuizItem> for ItemPayload {
    fn from(item: &QuizItem) -> Self {
        Self {
            question: item.prompt.clone(),
            options: item.options.clone(),
            correct_answer_index: item.correct_index as i64,
            explanation: item.explanation.clone(),
            image_index: item.image_ref.map(|i| i as i64),
        }
    }
}

/// Accept integral JSON numbers written either as `2` or `2.0`
fn de_index<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    number_to_index(&value).ok_or_else(|| {
        serde::de::Error::custom(format!("expected an integer index, got {}", value))
    })
}

fn de_opt_index<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    number_to_index(&value).map(Some).ok_or_else(|| {
        serde::de::Error::custom(format!("expected an integer index or null, got {}", value))
    })
}

fn number_to_index(value: &serde_json::Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.is_finite())
            .map(|f| f as i64)
    })
}
