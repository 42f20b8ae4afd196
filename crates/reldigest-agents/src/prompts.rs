//! Standing instructions for the two agent roles, derived from the trailing
//! report window. Date filtering lives in these instructions and is
//! therefore the capability's judgment, not a verified predicate.

/// Instructions for the release-fetch agent.
pub fn fetch_agent_instructions(window_days: u32) -> String {
    format!(
        "You fetch release information from a given release-notes page URL.\n\
         Use your available tools to retrieve the page content, then compare \
         each entry against the current date and keep only entries published \
         within the last {window_days} days. Ignore anything outside that \
         window. If nothing was released within the last {window_days} days, \
         reply that there were no releases in that period."
    )
}

/// Instructions for the summarize agent.
pub fn summarize_agent_instructions(window_days: u32) -> String {
    format!(
        "You summarize release-note content collected from several services.\n\
         Include only entries released within the last {window_days} days.\n\
         Respond with Markdown only, in this format:\n\n\
         ## [Service name]\n\n\
         ### [Release date]\n\
         - [Summary of the released feature or fix]\n\
           - [Detail as a bullet point]\n"
    )
}
