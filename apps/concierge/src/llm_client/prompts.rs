// Shared prompt constants used by every upstream call.
// Feature-specific templates live in a prompts.rs alongside the feature.

/// System instruction that enforces a single JSON object in the answer.
/// Search grounding rules out a JSON response MIME type, so the constraint is
/// stated in words and the parser stays permissive.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured travel assistant. \
    You MUST answer with exactly one valid JSON object. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Common instruction on link and fact accuracy for grounded answers.
pub const GROUNDING_INSTRUCTION: &str = "\
    Use the search tool to confirm that every place, price and link you return exists today. \
    If you cannot confirm a link, leave the field empty. NEVER invent URLs.";
