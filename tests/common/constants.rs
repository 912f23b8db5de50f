//! Shared constants for end-to-end tests

#![allow(dead_code)]

// ============================================================================
// Identities
// ============================================================================

pub const ALICE: &str = "alice";

pub const BOB: &str = "bob";

/// An identity nobody registers.
pub const GHOST: &str = "ghost";

// ============================================================================
// Opaque payloads
// ============================================================================

pub const OFFER_SDP: &str = "v=0\r\no=- 4611731400430051336 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n";

pub const ANSWER_SDP: &str = "v=0\r\no=- 1070498452563461290 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n";

pub const ICE_CANDIDATE: &str = "candidate:842163049 1 udp 1677729535 203.0.113.7 46154 typ srflx";

// ============================================================================
// Timing
// ============================================================================

/// Maximum time to wait for the server to start accepting requests
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Interval between readiness polls
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;

/// How long to wait for an expected message
pub const MESSAGE_TIMEOUT_MS: u64 = 5000;

/// How long a client must stay quiet for "no message" assertions
pub const SILENCE_WINDOW_MS: u64 = 300;
