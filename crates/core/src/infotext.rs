//! Generation-metadata ("infotext") parsing and hash merging.
//!
//! An infotext is the multi-line text block the host attaches to generated
//! images: the first line is the positive prompt, an optional
//! `Negative prompt:` segment follows, and the remaining lines carry
//! generation parameters. The parameters may contain a single
//! `Hashes: {...}` JSON fragment naming the resources that produced the
//! image by 10-character hash prefix; the sharing ecosystem parses this
//! exact textual convention, so replacement and append must preserve it
//! byte-for-byte.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Marker introducing the negative-prompt segment.
pub const NEGATIVE_PROMPT_MARKER: &str = "Negative prompt:";

/// Number of hash characters embedded per resource.
pub const SHORT_HASH_LEN: usize = 10;

/// Matches the `Hashes: {...}` fragment inside generation parameters.
static HASHES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Hashes:\s*(\{.*?\})").expect("valid regex"));

/// Characters that may immediately precede a whole-token match.
const TOKEN_BOUNDARY_BEFORE: &[char] = &[':', '(', '|', '[', ']'];

/// Characters that may immediately follow a whole-token match.
const TOKEN_BOUNDARY_AFTER: &[char] = &[':', ')', '|', '[', ']', ','];

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// A generation-metadata block split into its three segments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Infotext {
    pub prompt: String,
    pub negative_prompt: String,
    pub generation_params: String,
}

/// Split an infotext into prompt, negative prompt, and parameters.
///
/// The first line is the positive prompt. When the remainder starts with
/// [`NEGATIVE_PROMPT_MARKER`], that line (minus the marker) becomes the
/// negative prompt and everything after it the generation parameters;
/// otherwise the whole remainder is parameters.
pub fn parse_infotext(text: &str) -> Infotext {
    let trimmed = text.trim();
    let (prompt, rest) = match trimmed.split_once('\n') {
        Some((first, rest)) => (first.trim(), rest),
        None => (trimmed, ""),
    };

    let mut negative_prompt = "";
    let mut generation_params = rest;
    if rest.starts_with(NEGATIVE_PROMPT_MARKER) {
        let (neg_line, params) = rest.split_once('\n').unwrap_or((rest, ""));
        negative_prompt = neg_line[NEGATIVE_PROMPT_MARKER.len()..].trim();
        generation_params = params;
    }

    Infotext {
        prompt: prompt.to_string(),
        negative_prompt: negative_prompt.to_string(),
        generation_params: generation_params.to_string(),
    }
}

/// Truncate a full content hash to its embedded short form.
pub fn short_hash(hash: &str) -> &str {
    &hash[..hash.len().min(SHORT_HASH_LEN)]
}

// ---------------------------------------------------------------------------
// Whole-token search
// ---------------------------------------------------------------------------

/// Case-insensitive whole-token search for an embedding name.
///
/// A candidate occurrence counts only when bounded on the left by
/// start-of-text, whitespace, or one of `: ( | [ ]`, and on the right by
/// end-of-text, whitespace, or one of `: ) | [ ] ,`. This keeps
/// `easynegative` from matching inside `myeasynegative2`.
pub fn contains_token(haystack: &str, token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    let haystack = haystack.to_lowercase();
    let token = token.to_lowercase();

    let mut from = 0;
    while let Some(offset) = haystack[from..].find(&token) {
        let start = from + offset;
        let end = start + token.len();

        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| c.is_whitespace() || TOKEN_BOUNDARY_BEFORE.contains(&c));
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| c.is_whitespace() || TOKEN_BOUNDARY_AFTER.contains(&c));
        if before_ok && after_ok {
            return true;
        }

        from = start
            + haystack[start..]
                .chars()
                .next()
                .map(char::len_utf8)
                .unwrap_or(1);
    }
    false
}

// ---------------------------------------------------------------------------
// Hash merging
// ---------------------------------------------------------------------------

/// Merge resource hashes into an infotext's `Hashes:` fragment.
///
/// An existing fragment is parsed (malformed JSON counts as empty),
/// updated with `new_hashes` (new values overwrite existing keys) and
/// replaced in place. Without an existing fragment the merged JSON is
/// appended as `, Hashes: {...}`. Keys are emitted in sorted order, so
/// repeated merges are byte-stable.
pub fn merge_hashes(infotext: &str, new_hashes: &BTreeMap<String, String>) -> String {
    if let Some(caps) = HASHES_RE.captures(infotext) {
        let mut merged: BTreeMap<String, Value> =
            serde_json::from_str(&caps[1]).unwrap_or_default();
        for (key, hash) in new_hashes {
            merged.insert(key.clone(), Value::String(hash.clone()));
        }
        let fragment = format!("Hashes: {}", render_json(&merged));
        HASHES_RE
            .replace(infotext, regex::NoExpand(&fragment))
            .into_owned()
    } else {
        let map: BTreeMap<String, Value> = new_hashes
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        format!("{infotext}, Hashes: {}", render_json(&map))
    }
}

fn render_json(map: &BTreeMap<String, Value>) -> String {
    serde_json::to_string(map).expect("string-keyed map serializes to JSON")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
