//! Utilities for editing multi-valued provisioner attributes, i.e., lists of authorized cloud
//! accounts or projects.

/// `remove_elements` removes at most one occurrence of each value in `rems` from `list` and returns
/// the result.
///
/// Matching is exact. Removal swaps the matched element with the last element and truncates, so the
/// order of the surviving elements is **not** preserved. Callers that need a stable order must sort
/// the result.
///
/// ```
/// use provstore::remove_elements;
/// let list = vec!["a".to_string(), "b".to_string(), "c".to_string()];
/// let mut r = remove_elements(list, &["a".to_string()]);
/// r.sort();
/// assert_eq!(r, vec!["b".to_string(), "c".to_string()]);
/// ```
pub fn remove_elements(mut list: Vec<String>, rems: &[String]) -> Vec<String> {
    if list.is_empty() {
        return list;
    }
    for rem in rems {
        if let Some(i) = list.iter().position(|elem| elem == rem) {
            list.swap_remove(i);
        }
    }
    list
}

/// `merge_elements` appends `adds` to `list` then applies [`remove_elements`] using `rems`.
pub fn merge_elements(mut list: Vec<String>, adds: &[String], rems: &[String]) -> Vec<String> {
    list.extend_from_slice(adds);
    remove_elements(list, rems)
}

#[cfg(test)]
fn strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

#[test]
fn remove_from_empty() {
    assert!(remove_elements(vec![], &strings(&["a", "b"])).is_empty());
    assert!(remove_elements(vec![], &[]).is_empty());
}

#[test]
fn remove_swaps_with_last() {
    let r = remove_elements(strings(&["a", "b", "c", "d"]), &strings(&["a"]));
    assert_eq!(r, strings(&["d", "b", "c"]));
}

#[test]
fn remove_one_occurrence_per_entry() {
    let r = remove_elements(strings(&["a", "b", "a"]), &strings(&["a"]));
    assert_eq!(2, r.len());
    assert!(r.contains(&"a".to_string()));

    let r = remove_elements(strings(&["a", "b", "a"]), &strings(&["a", "a"]));
    assert_eq!(r, strings(&["b"]));
}

#[test]
fn remove_ignores_unmatched() {
    let current = strings(&["111", "222", "333"]);
    let rems = strings(&["222", "444", "555"]);
    let mut r = remove_elements(current.clone(), &rems);
    let matched = rems.iter().filter(|r| current.contains(r)).count();
    assert_eq!(current.len() - matched, r.len());
    assert!(!r.contains(&"222".to_string()));
    r.sort();
    assert_eq!(r, strings(&["111", "333"]));
}

#[test]
fn remove_is_case_sensitive() {
    let r = remove_elements(strings(&["Project"]), &strings(&["project"]));
    assert_eq!(r, strings(&["Project"]));
}

#[test]
fn merge_adds_then_removes() {
    let mut r = merge_elements(
        strings(&["111", "222"]),
        &strings(&["333", "444"]),
        &strings(&["111", "444"]),
    );
    r.sort();
    assert_eq!(r, strings(&["222", "333"]));

    // removal of a value added in the same call
    let r = merge_elements(vec![], &strings(&["x"]), &strings(&["x"]));
    assert!(r.is_empty());
}
