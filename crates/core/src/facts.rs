//! Project facts model: everything the structural extractor learned about a
//! project.
//!
//! Built once per run from the extractor's JSON and never mutated afterwards.
//! Cross references (class bases, entry points) are stored as names and
//! resolved through [`crate::index::FactsIndex`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The aggregate root handed to the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectFacts {
    pub metadata: ProjectMetadata,

    #[serde(default)]
    pub dependencies: Dependencies,

    #[serde(default)]
    pub structure: Structure,

    #[serde(default)]
    pub examples: Vec<CodeExample>,

    #[serde(default)]
    pub configuration: Configuration,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<TestSuite>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<Documentation>,
}

/// What kind of project was extracted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectKind {
    Library,
    Application,
    CliTool,
    WebApplication,
    Api,
    Package,
    #[default]
    Unknown,
}

impl std::fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Library => "library",
            Self::Application => "application",
            Self::CliTool => "cli_tool",
            Self::WebApplication => "web_application",
            Self::Api => "api",
            Self::Package => "package",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectMetadata {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    /// Required language/runtime version, e.g. `>=3.9`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_version: Option<String>,

    #[serde(default)]
    pub kind: ProjectKind,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classifiers: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dependencies {
    #[serde(default)]
    pub production: Vec<String>,

    #[serde(default)]
    pub development: Vec<String>,

    /// Optional dependency groups (extras).
    #[serde(default)]
    pub optional: BTreeMap<String, Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_requires: Option<String>,
}

impl Dependencies {
    /// Every dependency, sorted and de-duplicated.
    pub fn all(&self) -> Vec<&str> {
        let mut all: Vec<&str> = self
            .production
            .iter()
            .chain(&self.development)
            .chain(self.optional.values().flatten())
            .map(String::as_str)
            .collect();
        all.sort_unstable();
        all.dedup();
        all
    }

    pub fn is_empty(&self) -> bool {
        self.production.is_empty() && self.development.is_empty() && self.optional.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Structure {
    #[serde(default)]
    pub root_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_package: Option<String>,

    #[serde(default)]
    pub modules: Vec<Module>,

    #[serde(default)]
    pub entry_points: Vec<EntryPoint>,

    #[serde(default)]
    pub total_files: usize,

    #[serde(default)]
    pub total_lines: usize,
}

/// A declared entry point (console script, `main` function, …).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryPoint {
    pub name: String,
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Module {
    pub name: String,

    #[serde(default)]
    pub file_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,

    #[serde(default)]
    pub classes: Vec<Class>,

    #[serde(default)]
    pub functions: Vec<Function>,

    #[serde(default)]
    pub constants: Vec<Constant>,

    #[serde(default)]
    pub imports: Vec<Import>,

    #[serde(default)]
    pub is_package: bool,

    /// The module is run directly (`__main__`, `main.rs`, …).
    #[serde(default)]
    pub is_main: bool,

    #[serde(default)]
    pub line_count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Class {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,

    #[serde(default)]
    pub methods: Vec<Function>,

    /// Names of the classes this one extends. Resolved lazily through the
    /// facts index, never by reference.
    #[serde(default)]
    pub bases: Vec<String>,

    #[serde(default)]
    pub decorators: Vec<String>,

    #[serde(default)]
    pub is_abstract: bool,

    #[serde(default)]
    pub is_dataclass: bool,

    #[serde(default)]
    pub is_enum: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

impl Class {
    pub fn is_private(&self) -> bool {
        self.name.starts_with('_')
    }

    pub fn public_methods(&self) -> impl Iterator<Item = &Function> {
        self.methods.iter().filter(|m| m.is_public)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub name: String,

    #[serde(default)]
    pub signature: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,

    #[serde(default = "default_true")]
    pub is_public: bool,

    #[serde(default)]
    pub is_async: bool,

    #[serde(default)]
    pub is_property: bool,

    #[serde(default)]
    pub is_classmethod: bool,

    #[serde(default)]
    pub is_staticmethod: bool,

    #[serde(default)]
    pub decorators: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for Function {
    fn default() -> Self {
        Self {
            name: String::new(),
            signature: String::new(),
            docstring: None,
            is_public: true,
            is_async: false,
            is_property: false,
            is_classmethod: false,
            is_staticmethod: false,
            decorators: vec![],
            return_type: None,
        }
    }
}

impl Function {
    /// `__name__`-style special members.
    pub fn is_magic(&self) -> bool {
        self.name.len() > 4 && self.name.starts_with("__") && self.name.ends_with("__")
    }

    /// Leading-underscore members that are not special members.
    pub fn is_private(&self) -> bool {
        !self.is_public || (self.name.starts_with('_') && !self.is_magic())
    }

    /// The signature, or the bare name when the extractor did not record one.
    pub fn display_signature(&self) -> &str {
        if self.signature.trim().is_empty() {
            &self.name
        } else {
            &self.signature
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Constant {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Import {
    pub module: String,

    #[serde(default)]
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeExample {
    #[serde(default)]
    pub title: String,

    pub code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,

    /// `usage`, `basic_usage`, `configuration`, `test`, …
    #[serde(default = "default_example_type")]
    pub example_type: String,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_true")]
    pub is_executable: bool,
}

fn default_example_type() -> String {
    "usage".into()
}
fn default_language() -> String {
    "python".into()
}

impl CodeExample {
    pub fn new(title: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            code: code.into(),
            description: None,
            file_path: None,
            example_type: default_example_type(),
            language: default_language(),
            is_executable: true,
        }
    }

    pub fn with_type(mut self, example_type: impl Into<String>) -> Self {
        self.example_type = example_type.into();
        self
    }

    /// Usage derived from the project's test suite.
    pub fn is_test_derived(&self) -> bool {
        self.example_type == "test"
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub config_files: Vec<String>,

    /// Environment variable name → description.
    #[serde(default)]
    pub environment_variables: BTreeMap<String, String>,

    #[serde(default)]
    pub default_settings: serde_json::Map<String, serde_json::Value>,

    #[serde(default)]
    pub config_examples: Vec<CodeExample>,
}

impl Configuration {
    pub fn is_empty(&self) -> bool {
        self.config_files.is_empty()
            && self.environment_variables.is_empty()
            && self.default_settings.is_empty()
            && self.config_examples.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestSuite {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,

    #[serde(default)]
    pub test_files: Vec<String>,

    #[serde(default)]
    pub total_tests: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Documentation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme_file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog_file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_file: Option<String>,

    #[serde(default)]
    pub doc_files: Vec<String>,
}

/// Counts over the facts, for logs and the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactsSummary {
    pub modules: usize,
    pub classes: usize,
    pub public_classes: usize,
    pub functions: usize,
    pub public_functions: usize,
    pub methods: usize,
    pub dependencies: usize,
    pub examples: usize,
}

// ── Traversal ─────────────────────────────────────────────────────────────

impl ProjectFacts {
    /// Parse the extractor's JSON output.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.structure.modules.iter()
    }

    /// Every class with its owning module.
    pub fn classes(&self) -> impl Iterator<Item = (&Module, &Class)> {
        self.modules()
            .flat_map(|m| m.classes.iter().map(move |c| (m, c)))
    }

    /// Every module-level function with its owning module.
    pub fn functions(&self) -> impl Iterator<Item = (&Module, &Function)> {
        self.modules()
            .flat_map(|m| m.functions.iter().map(move |f| (m, f)))
    }

    /// Every method with its owning module and class.
    pub fn methods(&self) -> impl Iterator<Item = (&Module, &Class, &Function)> {
        self.classes()
            .flat_map(|(m, c)| c.methods.iter().map(move |f| (m, c, f)))
    }

    pub fn examples(&self) -> impl Iterator<Item = &CodeExample> {
        self.examples.iter()
    }

    pub fn summary(&self) -> FactsSummary {
        FactsSummary {
            modules: self.structure.modules.len(),
            classes: self.classes().count(),
            public_classes: self.classes().filter(|(_, c)| !c.is_private()).count(),
            functions: self.functions().count(),
            public_functions: self.functions().filter(|(_, f)| !f.is_private()).count(),
            methods: self.methods().count(),
            dependencies: self.dependencies.all().len(),
            examples: self.examples.len(),
        }
    }

    /// Structural well-formedness problems. Never fails: callers decide what
    /// to do with the list.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        for (i, module) in self.structure.modules.iter().enumerate() {
            if module.name.trim().is_empty() {
                issues.push(format!(
                    "module #{i} has an empty name ({} classes, {} functions left out)",
                    module.classes.len(),
                    module.functions.len()
                ));
            }
            for (j, class) in module.classes.iter().enumerate() {
                if class.name.trim().is_empty() {
                    issues.push(format!("class #{j} in module '{}' has an empty name", module.name));
                }
                for (k, method) in class.methods.iter().enumerate() {
                    if method.name.trim().is_empty() {
                        issues.push(format!(
                            "method #{k} of class '{}' in module '{}' has an empty name",
                            class.name, module.name
                        ));
                    }
                }
            }
            for (j, function) in module.functions.iter().enumerate() {
                if function.name.trim().is_empty() {
                    issues.push(format!(
                        "function #{j} in module '{}' has an empty name",
                        module.name
                    ));
                }
            }
        }
        for (i, example) in self.examples.iter().enumerate() {
            if example.code.trim().is_empty() {
                issues.push(format!("example #{i} ('{}') has no code", example.title));
            }
        }
        for (i, example) in self.configuration.config_examples.iter().enumerate() {
            if example.code.trim().is_empty() {
                issues.push(format!("configuration example #{i} ('{}') has no code", example.title));
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProjectFacts {
        ProjectFacts {
            metadata: ProjectMetadata {
                name: "sample".into(),
                ..Default::default()
            },
            dependencies: Dependencies {
                production: vec!["requests".into(), "click".into()],
                development: vec!["pytest".into(), "click".into()],
                ..Default::default()
            },
            structure: Structure {
                modules: vec![Module {
                    name: "sample.main".into(),
                    classes: vec![Class {
                        name: "App".into(),
                        methods: vec![
                            Function {
                                name: "run".into(),
                                ..Default::default()
                            },
                            Function {
                                name: "_helper".into(),
                                ..Default::default()
                            },
                        ],
                        ..Default::default()
                    }],
                    functions: vec![Function {
                        name: "main".into(),
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn dependencies_are_deduplicated() {
        let facts = sample();
        assert_eq!(facts.dependencies.all(), vec!["click", "pytest", "requests"]);
    }

    #[test]
    fn traversal_visits_everything() {
        let facts = sample();
        assert_eq!(facts.classes().count(), 1);
        assert_eq!(facts.methods().count(), 2);
        assert_eq!(facts.functions().count(), 1);
        let summary = facts.summary();
        assert_eq!(summary.public_functions, 1);
        assert_eq!(summary.dependencies, 3);
    }

    #[test]
    fn magic_methods_are_not_private() {
        let init = Function {
            name: "__init__".into(),
            ..Default::default()
        };
        assert!(init.is_magic());
        assert!(!init.is_private());

        let helper = Function {
            name: "_helper".into(),
            ..Default::default()
        };
        assert!(helper.is_private());
    }

    #[test]
    fn validate_reports_empty_names() {
        let mut facts = sample();
        facts.structure.modules[0].functions.push(Function::default());
        let issues = facts.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("empty name"));
    }

    #[test]
    fn validate_reports_examples_without_code() {
        let mut facts = sample();
        facts.examples.push(CodeExample::new("blank", "  \n"));
        facts
            .configuration
            .config_examples
            .push(CodeExample::new("env", ""));
        let issues = facts.validate();
        assert_eq!(issues.len(), 2);
        assert!(issues[0].starts_with("example #"));
        assert!(issues[0].contains("('blank') has no code"));
        assert!(issues[1].starts_with("configuration example #0"));
    }

    #[test]
    fn parses_minimal_extractor_json() {
        let json = r#"{
            "metadata": {"name": "tiny"},
            "structure": {"modules": [{"name": "tiny", "functions": [{"name": "go"}]}]},
            "examples": [{"code": "tiny.go()"}]
        }"#;
        let facts = ProjectFacts::from_json(json).unwrap();
        assert_eq!(facts.metadata.name, "tiny");
        assert!(facts.structure.modules[0].functions[0].is_public);
        assert_eq!(facts.examples[0].example_type, "usage");
        assert!(facts.configuration.is_empty());
    }
}
