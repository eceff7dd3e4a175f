//! Presentation hints per tool
//!
//! Passed to the model together with a tool's raw result so the final
//! answer reads naturally. Unknown `(server, tool)` pairs get no hint.

pub fn tool_instruction(server: &str, tool: &str) -> &'static str {
    match (server, tool) {
        ("joke", "get_random_joke") => {
            "Open with a short friendly lead-in such as \"Here's one for you!\". \
             Put the setup on its own line, leave a blank line, then deliver the \
             punchline with a laughing emoji. Finish by offering another joke."
        }
        ("joke", "get_joke_by_index") => {
            "Acknowledge which joke number was asked for, then give the setup, a \
             blank line, and the punchline with an emoji. Offer to tell another \
             one by number."
        }
        ("joke", "count_jokes") => {
            "Say how many jokes are in the collection in one cheerful sentence and \
             invite the user to ask for one, at random or by number."
        }
        ("time", "get_current_time") => {
            "Start with \"The current time is\" followed by the human readable time, \
             including the day of the week. Add a short greeting that fits the time \
             of day (morning, afternoon, evening or late night) and a clock emoji."
        }
        ("time", "get_timestamp") => {
            "State the Unix timestamp prominently, explain in one sentence that it \
             counts seconds since January 1, 1970 UTC, and offer a readable time \
             if that would help."
        }
        ("argocd", "list_applications") => {
            "Present the applications as a compact list: name, then sync status \
             and health status. Call out anything OutOfSync or not Healthy first."
        }
        ("argocd", "get_application_status") => {
            "Summarise the application's sync status, health status and current \
             revision in two or three lines. If it is degraded or out of sync, say \
             so plainly and suggest checking history or syncing."
        }
        ("argocd", "get_application_history") => {
            "List the revisions newest first with their id, short revision hash and \
             deploy time. Mention that a rollback needs the revision id."
        }
        ("argocd", "sync_application") => {
            "Confirm the sync was triggered and relay any relevant line of the CLI \
             output. If it failed, quote the error briefly."
        }
        ("argocd", "rollback_application") => {
            "If the result is a rollback plan awaiting confirmation, restate the \
             target revision and ask the user to confirm explicitly. If the rollback \
             ran, report the outcome and the resulting sync and health status."
        }
        _ => "",
    }
}
