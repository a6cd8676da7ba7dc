use serde::{Deserialize, Serialize};
use sqlx::types::Json;

/// A single Program Learning Outcome entry. Stored inside the department
/// document as `{"PLO": "..."}` with no identifier of its own, so equality
/// for edit/delete is structural.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Plo {
    #[serde(rename = "PLO")]
    pub plo: String,
}

/// Department record. Created and deleted outside this system; the only
/// mutation this service performs is on the `plos` array.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Department {
    pub department_id: String,
    pub department_name: String,
    pub faculty_id: String,
    pub image: Option<String>,
    pub quantity: Option<i32>,
    pub plos: Json<Vec<Plo>>,
}

/// Appends `new` unless an equal element is already present (array-union
/// semantics). Returns true if the list changed.
pub fn union_plo(plos: &mut Vec<Plo>, new: Plo) -> bool {
    if plos.contains(&new) {
        return false;
    }
    plos.push(new);
    true
}

/// Removes every element equal to `target`, preserving the order of the
/// survivors. Returns the number of elements removed.
pub fn remove_plo(plos: &mut Vec<Plo>, target: &Plo) -> usize {
    let before = plos.len();
    plos.retain(|p| p != target);
    before - plos.len()
}

/// Replaces `old` with `new`: all instances of `old` are removed, then `new`
/// is unioned in. A structurally equal pair is a no-op.
pub fn replace_plo(plos: &mut Vec<Plo>, old: &Plo, new: Plo) {
    if *old == new {
        return;
    }
    remove_plo(plos, old);
    union_plo(plos, new);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plo(text: &str) -> Plo {
        Plo {
            plo: text.to_string(),
        }
    }

    #[test]
    fn union_appends_when_absent() {
        let mut plos = vec![plo("A")];
        assert!(union_plo(&mut plos, plo("B")));
        assert_eq!(plos, vec![plo("A"), plo("B")]);
    }

    #[test]
    fn union_is_a_noop_when_present() {
        let mut plos = vec![plo("A"), plo("B")];
        assert!(!union_plo(&mut plos, plo("A")));
        assert_eq!(plos, vec![plo("A"), plo("B")]);
    }

    #[test]
    fn remove_drops_all_equal_instances() {
        let mut plos = vec![plo("A"), plo("B"), plo("A")];
        assert_eq!(remove_plo(&mut plos, &plo("A")), 2);
        assert_eq!(plos, vec![plo("B")]);
    }

    #[test]
    fn remove_preserves_order_of_survivors() {
        let mut plos = vec![plo("A"), plo("B"), plo("C")];
        remove_plo(&mut plos, &plo("B"));
        assert_eq!(plos, vec![plo("A"), plo("C")]);
    }

    #[test]
    fn replace_removes_old_and_unions_new() {
        let mut plos = vec![plo("A"), plo("B")];
        replace_plo(&mut plos, &plo("A"), plo("C"));
        assert_eq!(plos, vec![plo("B"), plo("C")]);
    }

    #[test]
    fn replace_with_equal_value_is_a_noop() {
        let mut plos = vec![plo("A"), plo("A"), plo("B")];
        replace_plo(&mut plos, &plo("A"), plo("A"));
        assert_eq!(plos, vec![plo("A"), plo("A"), plo("B")]);
    }

    #[test]
    fn replace_does_not_duplicate_an_existing_target() {
        let mut plos = vec![plo("A"), plo("B")];
        replace_plo(&mut plos, &plo("A"), plo("B"));
        assert_eq!(plos, vec![plo("B")]);
    }

    #[test]
    fn plo_serializes_with_uppercase_key() {
        let json = serde_json::to_string(&plo("outcome")).unwrap();
        assert_eq!(json, r#"{"PLO":"outcome"}"#);
    }
}
