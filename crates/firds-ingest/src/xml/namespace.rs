//! Namespace stripping for parsed element trees

use super::Element;

/// Closing delimiter of the `{uri}` qualifier in a tag
pub const NAMESPACE_SEPARATOR: char = '}';

/// The part of `tag` after the last namespace separator
pub fn local_name(tag: &str) -> &str {
    match tag.rfind(NAMESPACE_SEPARATOR) {
        Some(idx) => &tag[idx + NAMESPACE_SEPARATOR.len_utf8()..],
        None => tag,
    }
}

/// Rewrite every tag in the tree to its local name
///
/// Only tags change. Applying this twice gives the same tree as applying it
/// once.
pub fn strip_namespaces(root: &mut Element) {
    let mut pending = vec![root];
    while let Some(element) = pending.pop() {
        if element.tag.contains(NAMESPACE_SEPARATOR) {
            element.tag = local_name(&element.tag).to_string();
        }
        pending.extend(element.children.iter_mut());
    }
}
