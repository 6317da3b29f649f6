//! Canonical JSON encoding and SHA-256 hashing of a `Schema`, used for
//! `Plan::source_hash` (§4.5) and its re-verification before apply (§4.7).

use sha2::{Digest, Sha256};

use super::Schema;

/// Canonical encoding: `serde_json` with indexes/foreign_keys/policies
/// sorted by name (matching the Differ's own determinism rule, §4.4) and
/// no insignificant whitespace. Tables and columns keep source order, since
/// that order is itself part of what the hash should be sensitive to? No —
/// per §8 property 4 ("for all orderings of their child sets") only
/// *child sets* (indexes/FKs/policies) are order-insensitive; table and
/// column order are significant content, not incidental ordering, so they
/// are left as-is.
fn canonical_schema(schema: &Schema) -> Schema {
    let mut schema = schema.clone();
    for table in &mut schema.tables {
        table.indexes.sort_by(|a, b| a.name.cmp(&b.name));
        table.foreign_keys.sort_by(|a, b| a.name.cmp(&b.name));
        table.policies.sort_by(|a, b| a.name.cmp(&b.name));
    }
    schema
}

fn canonical_json(schema: &Schema) -> Vec<u8> {
    // serde_json::to_vec already omits insignificant whitespace; struct
    // field order is declaration order, which is fixed at compile time, so
    // this is already "sorted keys" in the sense that matters: stable
    // across runs of the same binary.
    serde_json::to_vec(&canonical_schema(schema)).expect("Schema serialization cannot fail")
}

/// 64 lowercase hex characters, per §3's `source_hash` invariant.
pub fn canonical_hash(schema: &Schema) -> String {
    let bytes = canonical_json(schema);
    let digest = Sha256::digest(&bytes);
    format!("{digest:x}")
}
