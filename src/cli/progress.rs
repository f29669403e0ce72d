// src/cli/progress.rs — Terminal progress renderer for refinement sessions

use crate::core::types::RefinementEvent;

/// One line of progress output for an event.
pub fn format_event(event: &RefinementEvent) -> String {
    match event {
        RefinementEvent::InitialResponse { messages } => {
            format!("[generate] initial response ({} message(s))", messages)
        }
        RefinementEvent::Evaluated {
            attempt,
            rating,
            needs_improvement,
            ..
        } => format!(
            "[eval {}] rating={} needs_improvement={}",
            attempt, rating, needs_improvement
        ),
        RefinementEvent::NewBest { attempt, rating } => {
            format!("[eval {}] new best ({})", attempt, rating)
        }
        RefinementEvent::AcceptableQuality {
            attempt,
            rating,
            min_rating,
            ..
        } => format!(
            "[eval {}] accepted: {} (min {})",
            attempt, rating, min_rating
        ),
        RefinementEvent::Refined { attempt, .. } => {
            format!("[refine {}] generated improved response", attempt)
        }
        RefinementEvent::Complete {
            evaluations,
            best_rating,
            decision,
        } => format!(
            "[done] best={} evaluations={} decision={}",
            best_rating, evaluations, decision
        ),
    }
}

/// Build a progress callback that writes formatted output to stderr.
///
/// stdout stays clean for the refined response.
pub fn terminal_progress() -> impl Fn(RefinementEvent) + Send + Sync + 'static {
    |event| eprintln!("{}", format_event(&event))
}
