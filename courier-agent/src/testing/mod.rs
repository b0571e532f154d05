// ABOUTME: Test support for code that talks to remote agents.
// ABOUTME: Transcript recording and replay on top of any RemoteAgent.

pub mod recording;
