//! Integration suite: exercises the public facade end to end against real
//! git repositories and a scripted provider.

mod common;
mod events_flow;
mod quiz_flow;
