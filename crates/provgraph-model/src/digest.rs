//! Canonical vertex content digests (versioned).
//!
//! Vertices are identified externally by a content digest over their
//! annotation map. The reverse id mapping and the boundary point lookups
//! both key on this digest, so it must be stable and deterministic.
//!
//! The v1 digest is **simple, deterministic, non-cryptographic**:
//!
//! - algorithm: **FNV-1a 64-bit**
//! - input: the annotation map rendered in key order as `key=value;` pairs
//! - output: `"vtxfnv1a64:<16 lowercase hex digits>"`
//!
//! Notes:
//! - This digest is **not** a security primitive. It is an identity tool for
//!   in-memory records whose annotation maps define their equality.
//! - Annotation maps are ordered (`BTreeMap`), so the rendering is canonical
//!   without an explicit sort pass.

use std::collections::BTreeMap;

/// Prefix used in serialized vertex digests.
pub const VERTEX_DIGEST_V1_PREFIX: &str = "vtxfnv1a64:";

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x00000100000001b3;

/// Compute the v1 content digest for an annotation map (FNV-1a 64-bit).
///
/// Properties:
/// - deterministic
/// - stable under insertion order (keys are folded in sorted map order)
/// - two maps collide in practice only when they are equal
pub fn vertex_digest_v1(annotations: &BTreeMap<String, String>) -> String {
    fn add(hash: &mut u64, s: &str) {
        for b in s.as_bytes() {
            *hash ^= (*b) as u64;
            *hash = hash.wrapping_mul(FNV_PRIME);
        }
    }

    let mut hash = FNV_OFFSET_BASIS;
    for (key, value) in annotations {
        add(&mut hash, key);
        add(&mut hash, "=");
        add(&mut hash, value);
        add(&mut hash, ";");
    }

    format!("{VERTEX_DIGEST_V1_PREFIX}{hash:016x}")
}
