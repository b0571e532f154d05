// ABOUTME: Remote agent implementations beyond the A2A HTTP client.
// ABOUTME: Each implements the RemoteAgent trait.

pub mod mock;
