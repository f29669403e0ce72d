// src/core/prompts.rs — Evaluation and refinement prompt rendering

use super::types::EvaluationResult;

/// Prompt asking the evaluator to grade the current response.
///
/// `iteration` is 1-based.
pub fn build_eval_prompt(
    criteria: &str,
    original_request: &str,
    current_response: &str,
    iteration: u32,
) -> String {
    format!(
        "Evaluate the following response based on these criteria:\n\
         {criteria}\n\n\
         Original Request: {original_request}\n\
         Current Response (Iteration {iteration}): {current_response}\n\n\
         Provide your evaluation as a structured response with:\n\
         1. A quality rating (EXCELLENT, GOOD, FAIR, or POOR)\n\
         2. Specific feedback and suggestions\n\
         3. Whether improvement is needed (true/false)\n\
         4. Focus areas for improvement\n\n\
         Rate as EXCELLENT only if no improvements are needed.\n\
         Rate as GOOD if only minor improvements are possible.\n\
         Rate as FAIR if several improvements are needed.\n\
         Rate as POOR if major improvements are needed."
    )
}

/// Prompt asking the generator to improve on its previous response.
///
/// `iteration` is the 1-based number of the response being refined.
pub fn build_refinement_prompt(
    original_request: &str,
    current_response: &str,
    evaluation: &EvaluationResult,
    iteration: u32,
) -> String {
    format!(
        "Improve your previous response based on the evaluation feedback.\n\n\
         Original Request: {original_request}\n\n\
         Previous Response (Iteration {iteration}):\n\
         {current_response}\n\n\
         Quality Rating: {rating}\n\
         Feedback: {feedback}\n\
         Areas to Focus On: {focus}\n\n\
         Generate an improved version addressing the feedback while maintaining accuracy and relevance.",
        rating = evaluation.rating,
        feedback = evaluation.feedback,
        focus = evaluation.focus_areas.join(", "),
    )
}
