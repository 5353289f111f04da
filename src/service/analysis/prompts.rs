//! Prompts for historical claim analysis

use super::schema::{ANALYSIS_SCHEMA, format_instructions};

/// Extra instructions appended when retrying after malformed output
const STRICT_SUFFIX: &str = r#"IMPORTANT: Your previous answer could not be parsed.
Respond with the JSON object only: no markdown, no code fences, no text before or after it.
Use a plain integer for "factScore" and "iconKey", true or false for "relevant",
and a full URL starting with https:// for "sourceUrl"."#;

/// Build the analysis prompt for a claim
///
/// `strict` selects the stricter variant used for a single retry after the
/// provider returned text that failed validation.
pub fn build_analysis_prompt(claim: &str, strict: bool) -> String {
    let mut prompt = format!(
        r#"You are a neutral historian who fact-checks claims about historical events, people and global conflicts.

Evaluate the claim below for historical accuracy.

You must:
- Judge the claim only on established historical evidence
- Explain the score in plain language, referencing the evidence
- Cite one reputable source URL that supports your explanation
- Pick the icon that best matches the topic of the claim
- Mark "relevant" as false if the claim is not about history

Always provide every field (factScore, explanation, iconKey, sourceUrl, relevant),
even when the claim is not relevant; give your best effort for each one.

## Claim
{claim}

## Output Format
{format_instructions}"#,
        claim = claim,
        format_instructions = format_instructions(ANALYSIS_SCHEMA),
    );

    if strict {
        prompt.push_str("\n\n");
        prompt.push_str(STRICT_SUFFIX);
    }

    prompt
}
