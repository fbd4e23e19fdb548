use std::collections::HashSet;

/// Bundler and URL prefixes stripped from stack frame paths. Longer variants
/// come first so `webpack:///` is not left with a stray slash.
const STRIPPED_PREFIXES: &[&str] = &[
    "webpack:///",
    "webpack://",
    "app:///",
    "app://",
    "~/",
    "./",
    "/",
];

/// Directories tried in front of the `src/`-rooted path, in order. The empty
/// root is the repository root itself.
pub const MONOREPO_ROOTS: &[&str] = &[
    "",
    "apps/web/",
    "apps/frontend/",
    "frontend/",
    "client/",
    "packages/web/",
];

/// Strip bundler prefixes and leading `/`, `~/`, `./` until none remain.
pub fn normalize_path(raw: &str) -> &str {
    let mut path = raw;
    while let Some(rest) = STRIPPED_PREFIXES
        .iter()
        .find_map(|prefix| path.strip_prefix(prefix))
    {
        path = rest;
    }
    path
}

/// Every guess for `path` (already normalized), before deduplication.
fn expand(path: &str) -> Vec<String> {
    let rooted = if path.starts_with("src/") {
        path.to_string()
    } else {
        format!("src/{path}")
    };
    let mut out = Vec::with_capacity(MONOREPO_ROOTS.len() + 1);
    out.push(path.to_string());
    out.extend(MONOREPO_ROOTS.iter().map(|root| format!("{root}{rooted}")));
    out
}

/// Ordered, deduplicated repository paths worth trying for a raw frame path.
/// Empty when the path normalizes to nothing.
pub fn build_path_candidates(raw: &str) -> Vec<String> {
    let path = normalize_path(raw);
    if path.is_empty() {
        return Vec::new();
    }
    let mut seen = HashSet::new();
    let mut candidates = expand(path);
    candidates.retain(|c| seen.insert(c.clone()));
    candidates
}
