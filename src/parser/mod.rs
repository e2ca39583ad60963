use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Name used when the model output carries no usable recipe name.
pub const FALLBACK_RECIPE_NAME: &str = "Recipe from Social Media video";

const FALLBACK_INGREDIENT: &str = "See transcription";

/// Failures of the structured parser. Distinct from transport errors so the
/// caller can decide whether heuristic fallback is possible.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no JSON object found in model output")]
    MissingJson,
    #[error("model output is not a JSON object")]
    NotAnObject,
    #[error("malformed JSON in model output: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("recipe is missing a usable {0} list")]
    MissingField(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionStep {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    #[serde(rename = "recipeYield", skip_serializing_if = "Option::is_none")]
    pub recipe_yield: Option<String>,
    #[serde(rename = "totalTime", skip_serializing_if = "Option::is_none")]
    pub total_time: Option<String>,
    #[serde(rename = "recipeIngredient")]
    pub recipe_ingredient: Vec<String>,
    #[serde(rename = "recipeInstructions")]
    pub recipe_instructions: Vec<InstructionStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "orgURL", skip_serializing_if = "Option::is_none")]
    pub org_url: Option<String>,
}

/// Extract a recipe from free-form model output.
///
/// Strips markdown code fences, normalizes typographic quotes, takes the span
/// between the first `{` and the last `}` as the candidate JSON object and
/// requires non-empty ingredient and instruction lists.
pub fn structured_parse(text: &str) -> Result<Recipe, ParseError> {
    let cleaned = cleanup(text);
    debug!("Model output after cleanup: {}", cleaned);

    let start = cleaned.find('{').ok_or(ParseError::MissingJson)?;
    let end = cleaned.rfind('}').ok_or(ParseError::MissingJson)?;
    if end < start {
        return Err(ParseError::MissingJson);
    }

    let parsed: Value = serde_json::from_str(&cleaned[start..=end])?;
    let obj = parsed.as_object().ok_or(ParseError::NotAnObject)?;

    let recipe_ingredient: Vec<String> = match obj.get("recipeIngredient") {
        Some(Value::Array(items)) if !items.is_empty() => {
            items.iter().map(value_to_text).collect()
        }
        _ => return Err(ParseError::MissingField("recipeIngredient")),
    };

    let recipe_instructions = normalize_instructions(obj.get("recipeInstructions"))?;

    Ok(Recipe {
        name: obj
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| FALLBACK_RECIPE_NAME.to_string()),
        recipe_yield: obj.get("recipeYield").and_then(Value::as_str).map(str::to_string),
        total_time: obj.get("totalTime").and_then(Value::as_str).map(str::to_string),
        recipe_ingredient,
        recipe_instructions,
        description: obj.get("description").and_then(Value::as_str).map(str::to_string),
        org_url: None,
    })
}

/// Heuristic parser over the raw transcript. Never fails: fragments with a
/// numeral become ingredients, everything else becomes an instruction step.
pub fn naive_parse(text: &str) -> Recipe {
    let fragments: Vec<String> = text
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .map(str::to_string)
        .collect();

    let (ingredients, instructions): (Vec<String>, Vec<String>) = fragments
        .into_iter()
        .partition(|fragment| fragment.chars().any(|c| c.is_ascii_digit()));

    Recipe {
        name: FALLBACK_RECIPE_NAME.to_string(),
        recipe_yield: None,
        total_time: None,
        recipe_ingredient: if ingredients.is_empty() {
            vec![FALLBACK_INGREDIENT.to_string()]
        } else {
            ingredients
        },
        recipe_instructions: instructions
            .into_iter()
            .map(|text| InstructionStep { text })
            .collect(),
        description: None,
        org_url: None,
    }
}

/// Try the structured parser, fall back to the heuristic one on the raw
/// transcription. A parse failure never propagates to the caller.
pub fn parse_with_fallback(response: &str, transcription: &str) -> Recipe {
    match structured_parse(response) {
        Ok(recipe) => recipe,
        Err(e) => {
            warn!("Structured recipe parse failed: {}. Falling back to naive parser.", e);
            naive_parse(transcription)
        }
    }
}

fn cleanup(text: &str) -> String {
    text.replace("```json", "")
        .replace("```", "")
        .replace('\u{201c}', "\"")
        .replace('\u{201d}', "\"")
        .replace('\u{2018}', "'")
        .replace('\u{2019}', "'")
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn normalize_instructions(raw: Option<&Value>) -> Result<Vec<InstructionStep>, ParseError> {
    match raw {
        None | Some(Value::Null) => Err(ParseError::MissingField("recipeInstructions")),
        Some(Value::Array(items)) => {
            if items.is_empty() {
                return Err(ParseError::MissingField("recipeInstructions"));
            }
            Ok(items
                .iter()
                .map(|item| match item {
                    Value::Object(step) => InstructionStep {
                        text: step
                            .get("text")
                            .map(value_to_text)
                            .unwrap_or_else(|| value_to_text(item)),
                    },
                    other => InstructionStep {
                        text: value_to_text(other),
                    },
                })
                .collect())
        }
        // a bare scalar still counts as a single step
        Some(other) => {
            let text = value_to_text(other);
            if text.is_empty() {
                return Err(ParseError::MissingField("recipeInstructions"));
            }
            Ok(vec![InstructionStep { text }])
        }
    }
}
