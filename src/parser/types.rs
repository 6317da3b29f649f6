//! Type normalization (§4.2 "Type normalization").
//!
//! Catalog-internal names are mapped to their standard SQL spelling; typmods
//! render as `(N)`/`(P,S)`; array bounds append `[]`. Both the raw
//! dialect-specific spelling and the normalized logical spelling are kept
//! side-by-side in [`crate::schema::TypeMetadata`].

/// Catalog-internal name -> standard name, exactly as listed in §4.2.
const CATALOG_ALIASES: &[(&str, &str)] = &[
    ("int2", "smallint"),
    ("int4", "integer"),
    ("int8", "bigint"),
    ("bool", "boolean"),
    ("float4", "real"),
    ("float8", "double precision"),
    ("timestamptz", "timestamp with time zone"),
    ("timetz", "time with time zone"),
    ("serial2", "smallserial"),
    ("serial4", "serial"),
    ("serial8", "bigserial"),
    ("bpchar", "char"),
];

/// Normalize a base type name (already lowercased, no modifiers/array
/// markers) to its standard spelling. Unknown names pass through unchanged.
pub fn normalize_base_type(name: &str) -> String {
    let lower = name.to_lowercase();
    CATALOG_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map(|(_, standard)| standard.to_string())
        .unwrap_or(lower)
}

/// Render a logical type string: normalized base name, typmod suffix, and
/// array-bound suffix, e.g. `normalize_base_type("int4")` + `modifiers=[10]`
/// + `array=true` -> `"integer(10)[]"`.
pub fn render_logical_type(raw_base: &str, modifiers: &[i64], array: bool) -> String {
    let mut rendered = normalize_base_type(raw_base);
    if !modifiers.is_empty() {
        let mods: Vec<String> = modifiers.iter().map(|m| m.to_string()).collect();
        rendered.push('(');
        rendered.push_str(&mods.join(","));
        rendered.push(')');
    }
    if array {
        rendered.push_str("[]");
    }
    rendered
}

/// Render the raw (as-declared) type string, preserving the original base
/// spelling rather than the normalized one — used for `TypeMetadata::raw`.
pub fn render_raw_type(raw_base: &str, modifiers: &[i64], array: bool) -> String {
    let mut rendered = raw_base.to_string();
    if !modifiers.is_empty() {
        let mods: Vec<String> = modifiers.iter().map(|m| m.to_string()).collect();
        rendered.push('(');
        rendered.push_str(&mods.join(","));
        rendered.push(')');
    }
    if array {
        rendered.push_str("[]");
    }
    rendered
}
