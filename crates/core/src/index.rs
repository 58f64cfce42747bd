//! Name-based lookup over a [`ProjectFacts`] value.
//!
//! Class hierarchies may form cycles (or reference classes the extractor
//! never saw), so bases are stored as names and resolved here on demand.

use crate::facts::{Class, Function, Module, ProjectFacts};
use std::collections::{BTreeSet, HashMap};

/// Borrowing index over one facts value. Cheap to build, never outlives it.
pub struct FactsIndex<'a> {
    facts: &'a ProjectFacts,
    classes: HashMap<&'a str, Vec<(&'a Module, &'a Class)>>,
    subclasses: HashMap<&'a str, BTreeSet<&'a str>>,
}

impl<'a> FactsIndex<'a> {
    pub fn new(facts: &'a ProjectFacts) -> Self {
        let mut classes: HashMap<&str, Vec<(&Module, &Class)>> = HashMap::new();
        let mut subclasses: HashMap<&str, BTreeSet<&str>> = HashMap::new();

        for (module, class) in facts.classes() {
            classes.entry(class.name.as_str()).or_default().push((module, class));
            for base in &class.bases {
                subclasses
                    .entry(base_name(base))
                    .or_default()
                    .insert(class.name.as_str());
            }
        }

        Self {
            facts,
            classes,
            subclasses,
        }
    }

    /// All definitions of a class name (names may repeat across modules).
    pub fn class(&self, name: &str) -> &[(&'a Module, &'a Class)] {
        self.classes
            .get(base_name(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Bases of `class` that are defined in this project.
    pub fn resolve_bases(&self, class: &Class) -> Vec<&'a Class> {
        class
            .bases
            .iter()
            .flat_map(|base| self.class(base).iter().map(|(_, c)| *c))
            .collect()
    }

    /// Names of project classes that list `name` as a base, sorted.
    pub fn subclasses(&self, name: &str) -> Vec<&'a str> {
        self.subclasses
            .get(name)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Whether the class extends something or is extended by something.
    pub fn in_hierarchy(&self, class: &Class) -> bool {
        !class.bases.is_empty() || self.subclasses.contains_key(class.name.as_str())
    }

    /// Whether `function` in `module` is the project's designated entry point.
    ///
    /// Declared entry points win; only when none are declared does a
    /// module-level `main` count.
    pub fn is_entry_point(&self, module: &Module, function: &Function) -> bool {
        let entry_points = &self.facts.structure.entry_points;
        if entry_points.is_empty() {
            return function.name == "main";
        }
        entry_points.iter().any(|ep| {
            ep.module == module.name && ep.function.as_deref() == Some(function.name.as_str())
        })
    }

    /// Whether `class` is the application object of a main module.
    pub fn is_entry_class(&self, module: &Module, class: &Class) -> bool {
        module.is_main && matches!(class.name.as_str(), "Main" | "App" | "Application")
    }
}

/// `pkg.mod.Base` and `Base[T]` both resolve to `Base`.
fn base_name(name: &str) -> &str {
    let name = name.split('[').next().unwrap_or(name);
    name.rsplit('.').next().unwrap_or(name).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::{EntryPoint, Structure};

    fn class(name: &str, bases: &[&str]) -> Class {
        Class {
            name: name.into(),
            bases: bases.iter().map(|b| b.to_string()).collect(),
            ..Default::default()
        }
    }

    fn facts() -> ProjectFacts {
        ProjectFacts {
            structure: Structure {
                modules: vec![Module {
                    name: "shapes".into(),
                    classes: vec![
                        class("Shape", &[]),
                        class("Circle", &["Shape"]),
                        class("Square", &["shapes.Shape"]),
                        class("Loner", &[]),
                        // cycle: A <- B <- A
                        class("A", &["B"]),
                        class("B", &["A"]),
                    ],
                    functions: vec![Function {
                        name: "cli".into(),
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                entry_points: vec![EntryPoint {
                    name: "shapes".into(),
                    module: "shapes".into(),
                    function: Some("cli".into()),
                }],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn subclasses_resolve_qualified_bases() {
        let facts = facts();
        let index = FactsIndex::new(&facts);
        assert_eq!(index.subclasses("Shape"), vec!["Circle", "Square"]);
        assert!(index.subclasses("Loner").is_empty());
    }

    #[test]
    fn hierarchy_membership() {
        let facts = facts();
        let index = FactsIndex::new(&facts);
        let (_, shape) = index.class("Shape")[0];
        let (_, loner) = index.class("Loner")[0];
        assert!(index.in_hierarchy(shape));
        assert!(!index.in_hierarchy(loner));
    }

    #[test]
    fn cycles_resolve_without_recursion() {
        let facts = facts();
        let index = FactsIndex::new(&facts);
        let (_, a) = index.class("A")[0];
        let bases = index.resolve_bases(a);
        assert_eq!(bases.len(), 1);
        assert_eq!(bases[0].name, "B");
        assert_eq!(index.resolve_bases(bases[0])[0].name, "A");
    }

    #[test]
    fn declared_entry_point_is_recognised() {
        let facts = facts();
        let index = FactsIndex::new(&facts);
        let module = &facts.structure.modules[0];
        assert!(index.is_entry_point(module, &module.functions[0]));
    }

    #[test]
    fn main_is_not_an_entry_point_when_another_is_declared() {
        let mut facts = facts();
        facts.structure.modules[0].functions.push(Function {
            name: "main".into(),
            ..Default::default()
        });
        let index = FactsIndex::new(&facts);
        let module = &facts.structure.modules[0];
        assert!(index.is_entry_point(module, &module.functions[0]));
        assert!(!index.is_entry_point(module, &module.functions[1]));
    }

    #[test]
    fn main_is_the_fallback_entry_point() {
        let mut facts = facts();
        facts.structure.entry_points.clear();
        facts.structure.modules[0].functions.push(Function {
            name: "main".into(),
            ..Default::default()
        });
        let index = FactsIndex::new(&facts);
        let module = &facts.structure.modules[0];
        assert!(!index.is_entry_point(module, &module.functions[0]));
        assert!(index.is_entry_point(module, &module.functions[1]));
    }
}
