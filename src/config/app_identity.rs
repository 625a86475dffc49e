//! Identity strings sent to upstream providers that key rate limits or
//! leaderboard listings off the calling application, e.g. OpenRouter's
//! `HTTP-Referer`/`X-Title` headers.

pub const OPENROUTER_HTTP_REFERER: &str = "https://agentstart.dev";
pub const OPENROUTER_TITLE: &str = "AgentStart Runtime";
