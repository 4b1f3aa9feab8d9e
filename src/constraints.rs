//! `@one` / `@any` / `@all` / `@dep` presence rules.
//!
//! The same evaluator serves both instance checks (is the data's key set
//! acceptable?) and the static satisfiability search, which feeds it every
//! presence assignment over the names involved.

use serde_json::{Map, Value};

use crate::config::SAT_MIN_VARS;
use crate::error::SchemaError;
use crate::ir::{Constraints, ObjectType, Presence};

/// First rule violated when exactly the names for which `present` holds
/// are present, as a message.
pub fn violation(c: &Constraints, present: &dyn Fn(&str) -> bool) -> Option<String> {
    for group in &c.one {
        let n = group.iter().filter(|p| present(p.as_str())).count();
        if n != 1 {
            return Some(format!("exactly one of {group:?} must be present, found {n}"));
        }
    }
    for group in &c.any {
        if !group.iter().any(|p| present(p.as_str())) {
            return Some(format!("at least one of {group:?} must be present"));
        }
    }
    for group in &c.all {
        let n = group.iter().filter(|p| present(p.as_str())).count();
        if n != 0 && n != group.len() {
            return Some(format!("all or none of {group:?} must be present"));
        }
    }
    for (name, deps) in &c.dep {
        if present(name.as_str()) {
            if let Some(d) = deps.iter().find(|d| !present(d.as_str())) {
                return Some(format!("`{name}` requires `{d}` to be present"));
            }
        }
    }
    None
}

/// Instance check against the keys of `map`.
pub fn check_presence(c: &Constraints, map: &Map<String, Value>) -> Result<(), String> {
    if c.is_empty() {
        return Ok(());
    }
    match violation(c, &|name: &str| map.contains_key(name)) {
        Some(msg) => Err(msg),
        None => Ok(()),
    }
}

/// Brute-force search for a presence assignment that satisfies every rule.
/// Fewer than `SAT_MIN_VARS` or more than `max_vars` distinct names are
/// assumed satisfiable.
pub fn satisfiable(c: &Constraints, max_vars: usize) -> bool {
    let names = c.names();
    let n = names.len();
    if n < SAT_MIN_VARS || n > max_vars || n >= u64::BITS as usize {
        return true;
    }
    (0u64..1 << n).any(|mask| {
        let present = |name: &str| {
            names
                .iter()
                .position(|x| *x == name)
                .is_some_and(|i| mask & (1 << i) != 0)
        };
        violation(c, &present).is_none()
    })
}

/// Every name a rule mentions must be one of `obj`'s own optional
/// properties without a default.
pub fn check_references(obj: &ObjectType) -> Result<(), SchemaError> {
    let groups = [("@one", &obj.constraints.one), ("@any", &obj.constraints.any), ("@all", &obj.constraints.all)];
    let mentioned = groups
        .iter()
        .flat_map(|(tag, gs)| gs.iter().flatten().map(move |p| (*tag, p)))
        .chain(
            obj.constraints
                .dep
                .iter()
                .flat_map(|(k, vs)| std::iter::once(k).chain(vs).map(|p| ("@dep", p))),
        );

    for (tag, name) in mentioned {
        let ok = obj
            .property(name)
            .is_some_and(|p| p.presence == Presence::Optional);
        if !ok {
            return Err(SchemaError::BadConstraint {
                constraint: tag.to_string(),
                property: name.clone(),
            });
        }
    }
    Ok(())
}
