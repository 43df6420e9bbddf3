//! Signature and body comparison primitives used to recover matches that
//! identifier-based superimposition lost.

use crate::tree::{Node, NodeKind};

/// Similarity ratio above which two bodies are considered similar.
pub const SIMILARITY_THRESHOLD: f64 = 0.7;

/// Collapses every whitespace run into a single space.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Removes all whitespace.
pub fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Text equality, optionally modulo whitespace.
pub fn texts_equal(a: &str, b: &str, ignore_whitespace: bool) -> bool {
    if ignore_whitespace {
        a == b || strip_whitespace(a) == strip_whitespace(b)
    } else {
        a == b
    }
}

/// Classic Levenshtein edit distance, two-row formulation.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// Normalized similarity of two texts: `1 - levenshtein / max(len)` over
/// whitespace-normalized content. Two empty texts are fully similar, an
/// empty text is fully dissimilar to a non-empty one.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize_whitespace(a);
    let b = normalize_whitespace(b);
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

/// The part of a declaration that is compared when looking for renamings:
/// the braced body, without the signature that precedes it. Declarations
/// without a block (fields, imports, abstract methods) compare whole.
pub fn comparison_body(node: &Node) -> &str {
    match node.kind {
        NodeKind::Method | NodeKind::Constructor | NodeKind::InitializerBlock => {
            node.body.find('{').map_or(node.body.as_str(), |open| &node.body[open..])
        }
        _ => node.body.as_str(),
    }
}

/// Identifier equality (identifiers are whitespace-normalized at parse time).
pub fn have_equal_signature(a: &Node, b: &Node) -> bool {
    a.kind == b.kind && a.identifier == b.identifier
}

/// Body equality, modulo whitespace when `ignore_whitespace` is set.
pub fn have_equal_body(a: &Node, b: &Node, ignore_whitespace: bool) -> bool {
    texts_equal(comparison_body(a), comparison_body(b), ignore_whitespace)
}

/// Same parameter list and return type, different name.
pub fn have_equal_signature_but_name(a: &Node, b: &Node) -> bool {
    a.kind == b.kind
        && a.kind.is_callable()
        && a.name != b.name
        && a.param_types == b.param_types
        && a.return_type == b.return_type
}

/// Are the bodies similar beyond the [`SIMILARITY_THRESHOLD`]?
pub fn have_similar_body(a: &Node, b: &Node) -> bool {
    similarity(comparison_body(a), comparison_body(b)) >= SIMILARITY_THRESHOLD
}

/// Is one body entirely contained in the other, whitespace aside?
/// Catches small extractions from a method into a renamed one.
/// The outer braces are peeled off first, otherwise the closing brace of the
/// smaller block would defeat the containment check.
pub fn one_contains_the_body_from_the_other(a: &Node, b: &Node) -> bool {
    let a = block_content(comparison_body(a));
    let b = block_content(comparison_body(b));
    !a.is_empty() && !b.is_empty() && (a.contains(&b) || b.contains(&a))
}

fn block_content(body: &str) -> String {
    let stripped = strip_whitespace(body);
    match stripped.strip_prefix('{').and_then(|rest| rest.strip_suffix('}')) {
        Some(inner) => inner.to_owned(),
        None => stripped,
    }
}

/// The disjunction used to match a base declaration against rename
/// candidates: equal signatures catch body-only edits, equal bodies catch
/// pure renames, the similarity clause catches edited renames with a stable
/// parameter list, and containment catches small extractions.
pub fn very_similar(a: &Node, b: &Node, ignore_whitespace: bool) -> bool {
    have_equal_signature(a, b)
        || have_equal_body(a, b, ignore_whitespace)
        || (have_similar_body(a, b) && have_equal_signature_but_name(a, b))
        || one_contains_the_body_from_the_other(a, b)
}
