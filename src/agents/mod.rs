//! The workflow agents.
//!
//! Each agent follows the same boundary discipline: a thin infallible
//! [`Agent::run`](crate::agent::Agent::run) wrapping a fallible body, with
//! failures recorded on the state under a domain prefix. Agents that can be
//! rerun after a fallback consume [`AgentState::rerun_directive`] and clear
//! the error surface once the recovered pass succeeds.

mod conversation;
mod fallback;
mod feedback;
mod moderation;
mod planning;
mod router;
mod specialist;

pub use conversation::ConversationAgent;
pub use fallback::FallbackAgent;
pub use feedback::FeedbackAgent;
pub use moderation::ContentModerationAgent;
pub use planning::PlanningAgent;
pub use router::RouterAgent;
pub use specialist::SpecialistAgent;

use crate::state::RerunDirective;

/// Generic user-visible apology substituted when an agent that owns the
/// response fails internally.
pub(crate) const APOLOGY: &str =
    "I'm sorry, I ran into a problem while handling your request. Please try again.";

/// Prompt addendum for a fallback-informed rerun. The agent must use the
/// suggested fix without surfacing the error or the fix to the user.
pub(crate) fn rerun_addendum(directive: &RerunDirective) -> String {
    format!(
        "\nYou are being rerun after a previous error.\n\
         Error: {}\n\
         Suggested fix: {}\n\
         Apply the fix to the original request, make sure the error does not \
         recur, and do not mention the error or the fix in your reply.",
        directive.original_error, directive.solution
    )
}
