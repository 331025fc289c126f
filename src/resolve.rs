use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

use crate::error::ClientError;
use crate::models::Task;
use crate::notify::Confirm;

/// Minimum similarity for a title to be suggested.
pub const FUZZY_MATCH_THRESHOLD: f64 = 0.3;

// Match score relative to the title matched against itself, so short
// references that hit a single letter score low.
fn similarity(matcher: &SkimMatcherV2, title: &str, reference: &str) -> Option<f64> {
    let score = matcher.fuzzy_match(title, reference)?;
    let full = matcher.fuzzy_match(title, title)?;
    (full > 0).then(|| score as f64 / full as f64)
}

/// Finds the task a command refers to: exact id, exact title, then the best
/// fuzzy title match once the user accepts the suggestion.
pub fn resolve_task(tasks: &[Task], reference: &str, confirm: &mut dyn Confirm) -> Result<Task, ClientError> {
    if let Some(task) = tasks.iter().find(|t| t.id == reference) {
        return Ok(task.clone());
    }
    if let Some(task) = tasks.iter().find(|t| t.title == reference) {
        return Ok(task.clone());
    }

    let matcher = SkimMatcherV2::default().ignore_case();
    let best = tasks
        .iter()
        .filter_map(|t| similarity(&matcher, &t.title, reference).map(|score| (score, t)))
        .filter(|(score, _)| *score >= FUZZY_MATCH_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0));

    match best {
        Some((score, task)) => {
            log::debug!("'{}' fuzzy-matched '{}' (similarity {:.2})", reference, task.title, score);
            let prompt = format!("'{}' not found. Did you mean '{}'?", reference, task.title);
            if confirm.confirm(&prompt) {
                Ok(task.clone())
            } else {
                Err(ClientError::NotFound(reference.to_string()))
            }
        }
        None => Err(ClientError::NotFound(reference.to_string())),
    }
}
