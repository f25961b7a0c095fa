//! One-time code and invite code generation.
//!
//! Both generators take the randomness source as an explicit parameter so
//! tests can seed them; production call sites pass `rand::thread_rng()`.

use rand::Rng;

pub const INVITE_CODE_LEN: usize = 8;

/// 6-digit zero-padded numeric code gating an account-state transition
/// (activation, email change, password reset).
pub fn generate_verification_code<R: Rng>(rng: &mut R) -> String {
    format!("{:06}", rng.gen_range(0..1_000_000))
}

/// Candidate 8-character invite code (lowercase hex). Callers must
/// collision-check against the registry; the unique column is the
/// source of truth.
pub fn generate_invite_code<R: Rng>(rng: &mut R) -> String {
    format!("{:08x}", rng.gen::<u32>())
}
