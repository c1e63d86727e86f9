//! Task log endpoints
//!
//! - `{base}/v2/tasks/{taskId}/eventstream?after={cursor}`
//! - `{base}/v2/tasks/{taskId}/events?after={cursor}`

use tasklog_foundation::{Error, Ordinal, Result, TaskId};
use url::Url;

pub const API_VERSION: &str = "v2";

pub fn eventstream_url(base: &Url, task_id: &TaskId, after: Option<Ordinal>) -> Result<Url> {
    task_url(base, task_id, "eventstream", after)
}

pub fn events_url(base: &Url, task_id: &TaskId, after: Option<Ordinal>) -> Result<Url> {
    task_url(base, task_id, "events", after)
}

fn task_url(base: &Url, task_id: &TaskId, leaf: &str, after: Option<Ordinal>) -> Result<Url> {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);

    url.path_segments_mut()
        .map_err(|_| Error::InvalidInput(format!("base URL cannot carry a path: {}", base)))?
        .pop_if_empty()
        .extend([API_VERSION, "tasks", task_id.as_str(), leaf]);

    if let Some(after) = after {
        url.query_pairs_mut()
            .append_pair("after", &after.to_string());
    }

    Ok(url)
}
