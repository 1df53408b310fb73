pub mod http;
pub mod planner;
pub mod python;
pub mod search;
pub mod vars;

use serde_json::{Map, Value};

/// Collect the payloads of all injected dependency results (`dep_*`),
/// ordered by parameter name.
pub(crate) fn dependency_results(params: &Map<String, Value>) -> Vec<(&str, &Map<String, Value>)> {
    let mut deps: Vec<(&str, &Map<String, Value>)> = params
        .iter()
        .filter_map(|(key, value)| {
            let id = key.strip_prefix(frog_core::schema::DEPENDENCY_PREFIX)?;
            Some((id, value.as_object()?))
        })
        .collect();
    deps.sort_by(|a, b| a.0.cmp(b.0));
    deps
}
