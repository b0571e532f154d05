// ABOUTME: Chat platform bridges for courier
// ABOUTME: Each platform turns its conversations into task messages and renders updates back

#[cfg(feature = "slack")]
pub mod slack;

#[cfg(feature = "slack")]
pub use slack::{SlackBridge, SlackRenderer, SlackThread};
