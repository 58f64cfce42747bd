//! Priority scoring.
//!
//! Facts are first flattened into [`Candidate`]s in a fixed order, each with
//! a stable id. Scoring a candidate is a pure function of that candidate, so
//! [`PriorityScorer::score_all`] can spread the work over scoped threads and
//! still return results in candidate order.
//!
//! A score is a base priority for the item kind times a product of
//! independent modifiers. Each applied modifier leaves a reason behind.

use crate::item::ScoredItem;
use crate::token::TokenCounter;
use docpack_config::ScoringConfig;
use docpack_core::{
    Class, CodeExample, Configuration, Dependencies, Documentation, FactsIndex, Function,
    ItemType, Module, ProjectFacts, ProjectMetadata, TestSuite,
};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

/// Below this many candidates, automatic threading stays single-threaded.
const PARALLEL_THRESHOLD: usize = 64;

// ── Candidates ────────────────────────────────────────────────────────────

/// A fact that may end up in the output, with its id and group key.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    id: String,
    group: String,
    source: Source<'a>,
}

/// What a candidate was built from. Hierarchy facts are resolved at
/// enumeration time so scoring never touches the index.
#[derive(Debug, Clone)]
pub enum Source<'a> {
    Metadata {
        metadata: &'a ProjectMetadata,
        documentation: Option<&'a Documentation>,
        tests: Option<&'a TestSuite>,
    },
    Dependencies(&'a Dependencies),
    Module(&'a Module),
    Class {
        class: &'a Class,
        in_hierarchy: bool,
        subclasses: usize,
        entry: bool,
    },
    Method {
        method: &'a Function,
    },
    Function {
        function: &'a Function,
        entry_point: bool,
    },
    Example(&'a CodeExample),
    Configuration(&'a Configuration),
    ConfigurationExample(&'a CodeExample),
}

impl<'a> Candidate<'a> {
    pub fn item_id(&self) -> &str {
        &self.id
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn source(&self) -> &Source<'a> {
        &self.source
    }

    pub fn item_type(&self) -> ItemType {
        match &self.source {
            Source::Metadata { .. } => ItemType::Metadata,
            Source::Dependencies(_) => ItemType::Dependencies,
            Source::Module(_) => ItemType::Module,
            Source::Class { .. } => ItemType::Class,
            Source::Method { .. } => ItemType::Method,
            Source::Function { .. } => ItemType::Function,
            Source::Example(e) if e.is_test_derived() => ItemType::TestUsage,
            Source::Example(_) => ItemType::Example,
            Source::Configuration(_) => ItemType::Configuration,
            Source::ConfigurationExample(_) => ItemType::ConfigurationExample,
        }
    }

    /// The text that is counted and, if selected, emitted.
    pub fn render(&self) -> String {
        match &self.source {
            Source::Metadata {
                metadata,
                documentation,
                tests,
            } => render_metadata(metadata, *documentation, *tests),
            Source::Dependencies(deps) => render_dependencies(deps),
            Source::Module(module) => render_module(module),
            Source::Class { class, .. } => render_class(class),
            Source::Method { method } => render_function(method),
            Source::Function { function, .. } => render_function(function),
            Source::Example(example) | Source::ConfigurationExample(example) => {
                render_example(example)
            }
            Source::Configuration(config) => render_configuration(config),
        }
    }
}

/// Candidates in enumeration order.
///
/// Facts that cannot become items (empty names, examples without code) are
/// left out here and reported by [`ProjectFacts::validate`].
#[derive(Debug, Default)]
pub struct CandidateSet<'a> {
    pub candidates: Vec<Candidate<'a>>,
}

impl<'a> CandidateSet<'a> {
    /// Flatten `facts` into candidates: metadata, dependencies, modules,
    /// classes with their methods, module functions, examples, configuration.
    pub fn enumerate(facts: &'a ProjectFacts, index: &FactsIndex<'a>) -> Self {
        let mut set = Builder::default();

        set.push(
            "metadata".into(),
            None,
            Source::Metadata {
                metadata: &facts.metadata,
                documentation: facts.documentation.as_ref(),
                tests: facts.tests.as_ref(),
            },
        );

        if !facts.dependencies.is_empty() {
            set.push("dependencies".into(), None, Source::Dependencies(&facts.dependencies));
        }

        let modules: Vec<&Module> = facts
            .modules()
            .filter(|m| !m.name.trim().is_empty())
            .collect();

        for &module in &modules {
            set.push(
                format!("module:{}", module.name),
                Some(module.name.as_str()),
                Source::Module(module),
            );
        }

        for &module in &modules {
            for class in &module.classes {
                if class.name.trim().is_empty() {
                    continue;
                }
                set.push(
                    format!("class:{}:{}", module.name, class.name),
                    Some(module.name.as_str()),
                    Source::Class {
                        class,
                        in_hierarchy: index.in_hierarchy(class),
                        subclasses: index.subclasses(&class.name).len(),
                        entry: index.is_entry_class(module, class),
                    },
                );
                for method in &class.methods {
                    if method.name.trim().is_empty() {
                        continue;
                    }
                    set.push(
                        format!("method:{}:{}:{}", module.name, class.name, method.name),
                        Some(module.name.as_str()),
                        Source::Method { method },
                    );
                }
            }
        }

        for &module in &modules {
            for function in &module.functions {
                if function.name.trim().is_empty() {
                    continue;
                }
                set.push(
                    format!("function:{}:{}", module.name, function.name),
                    Some(module.name.as_str()),
                    Source::Function {
                        function,
                        entry_point: index.is_entry_point(module, function),
                    },
                );
            }
        }

        for (i, example) in facts.examples().enumerate() {
            if example.code.trim().is_empty() {
                continue;
            }
            set.push(format!("example:{i:04}"), None, Source::Example(example));
        }

        let config = &facts.configuration;
        if !config.config_files.is_empty()
            || !config.environment_variables.is_empty()
            || !config.default_settings.is_empty()
        {
            set.push("configuration".into(), None, Source::Configuration(config));
        }
        for (i, example) in config.config_examples.iter().enumerate() {
            if example.code.trim().is_empty() {
                continue;
            }
            set.push(
                format!("configuration:example:{i:04}"),
                None,
                Source::ConfigurationExample(example),
            );
        }

        set.finish()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

#[derive(Default)]
struct Builder<'a> {
    candidates: Vec<Candidate<'a>>,
    seen: HashMap<String, usize>,
}

impl<'a> Builder<'a> {
    /// Repeated ids (same class name twice in a module) get a `#n` suffix.
    fn push(&mut self, id: String, group: Option<&str>, source: Source<'a>) {
        let n = self.seen.entry(id.clone()).or_insert(0);
        *n += 1;
        let id = if *n == 1 { id } else { format!("{id}#{n}") };
        let group = group.map(str::to_string).unwrap_or_else(|| id.clone());
        self.candidates.push(Candidate { id, group, source });
    }

    fn finish(self) -> CandidateSet<'a> {
        CandidateSet {
            candidates: self.candidates,
        }
    }
}

// ── Scoring ───────────────────────────────────────────────────────────────

/// Running product of a base priority and its modifiers.
struct Priority {
    value: f64,
    reasons: Vec<String>,
}

impl Priority {
    fn base(value: f64) -> Self {
        Self {
            value,
            reasons: Vec::new(),
        }
    }

    fn apply(&mut self, factor: f64, reason: impl Into<String>) {
        self.value *= factor;
        self.reasons.push(reason.into());
    }

    fn note(&mut self, reason: impl Into<String>) {
        self.reasons.push(reason.into());
    }
}

pub struct PriorityScorer {
    config: ScoringConfig,
    keywords: Vec<String>,
    frameworks: Vec<(String, Vec<String>)>,
    counter: Arc<TokenCounter>,
}

impl PriorityScorer {
    pub fn new(config: ScoringConfig, counter: Arc<TokenCounter>) -> Self {
        let keywords = config
            .important_keywords
            .iter()
            .map(|k| k.to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        let frameworks = config
            .framework_patterns
            .iter()
            .map(|(name, patterns)| {
                (
                    name.clone(),
                    patterns.iter().map(|p| p.to_lowercase()).collect(),
                )
            })
            .collect();
        Self {
            config,
            keywords,
            frameworks,
            counter,
        }
    }

    pub fn counter(&self) -> &Arc<TokenCounter> {
        &self.counter
    }

    /// Score one candidate: render, count, prioritize.
    pub fn score(&self, candidate: &Candidate<'_>) -> ScoredItem {
        let item_type = candidate.item_type();
        let content = candidate.render();
        let token_count = self.counter.count(&content, item_type.content_kind());
        let priority = self.priority(candidate.source());

        ScoredItem::new(
            candidate.item_id(),
            item_type,
            content,
            token_count,
            priority.value,
            priority.reasons,
        )
        .with_group(candidate.group())
    }

    /// Score every candidate, on up to `threads` scoped workers (`0` picks
    /// automatically). Output order matches input order.
    pub fn score_all(&self, candidates: &[Candidate<'_>], threads: usize) -> Vec<ScoredItem> {
        let workers = worker_count(threads, candidates.len());
        if workers <= 1 {
            return candidates.iter().map(|c| self.score(c)).collect();
        }

        let chunk = candidates.len().div_ceil(workers);
        tracing::debug!(workers, chunk, candidates = candidates.len(), "Scoring in parallel");

        std::thread::scope(|scope| {
            let handles: Vec<_> = candidates
                .chunks(chunk)
                .map(|part| {
                    scope.spawn(move || part.iter().map(|c| self.score(c)).collect::<Vec<_>>())
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect()
        })
    }

    fn priority(&self, source: &Source<'_>) -> Priority {
        let cfg = &self.config;
        match source {
            Source::Metadata { .. } => {
                let mut p = Priority::base(cfg.metadata);
                p.note("project_metadata");
                p
            }
            Source::Dependencies(_) => {
                let mut p = Priority::base(cfg.dependencies);
                p.note("dependencies");
                p
            }
            Source::Module(module) => {
                let mut p = Priority::base(cfg.module);
                if documented(module.docstring.as_deref(), cfg.class_doc_min_chars) {
                    p.apply(cfg.well_documented_class, "well_documented");
                }
                if self.has_keyword(&module.name) {
                    p.apply(cfg.keyword_member, "important_keyword");
                }
                if module.is_main {
                    p.apply(cfg.entry_point_bonus, "entry_point");
                }
                p
            }
            Source::Class {
                class,
                in_hierarchy,
                subclasses,
                entry,
            } => {
                let private = class.is_private();
                let mut p = Priority::base(if private {
                    cfg.private_member
                } else {
                    cfg.public_class
                });
                if documented(class.docstring.as_deref(), cfg.class_doc_min_chars) {
                    p.apply(cfg.well_documented_class, "well_documented");
                }
                if *in_hierarchy {
                    p.apply(cfg.inheritance, "has_inheritance");
                }
                if *subclasses > 0 {
                    p.note(format!("extended_by:{subclasses}"));
                }
                if let Some(framework) = self.framework(&class_text(class)) {
                    p.apply(cfg.framework_class, format!("framework_{framework}"));
                }
                if self.has_keyword(&class.name) {
                    p.apply(cfg.keyword_class, "important_keyword");
                }
                if *entry {
                    p.apply(cfg.entry_point_bonus, "entry_point");
                }
                if private {
                    p.apply(cfg.private_class, "private");
                }
                p
            }
            Source::Method { method } => self.member_priority(method, false),
            Source::Function {
                function,
                entry_point,
            } => self.member_priority(function, *entry_point),
            Source::Example(example) => {
                let mut p = if example.is_test_derived() {
                    let mut p = Priority::base(cfg.test_usage);
                    p.note("test_usage");
                    p
                } else {
                    let mut p = Priority::base(cfg.example);
                    p.note("code_example");
                    p
                };
                if example.example_type == "basic_usage" {
                    p.apply(cfg.basic_usage, "basic_usage");
                }
                if example.is_executable {
                    p.apply(cfg.executable, "executable");
                }
                p
            }
            Source::Configuration(_) => {
                let mut p = Priority::base(cfg.configuration);
                p.note("configuration");
                p
            }
            Source::ConfigurationExample(_) => {
                let mut p = Priority::base(cfg.configuration);
                p.note("configuration");
                p.note("code_example");
                p
            }
        }
    }

    /// Methods and module functions share one rule set.
    fn member_priority(&self, f: &Function, entry_point: bool) -> Priority {
        let cfg = &self.config;
        let private = f.is_private();

        let mut p = if entry_point {
            Priority::base(cfg.entry_point)
        } else if f.is_magic() {
            let mut p = Priority::base(cfg.magic_method);
            p.note("magic_method");
            p
        } else if f.is_property {
            let mut p = Priority::base(cfg.property);
            p.note("property");
            p
        } else if private {
            Priority::base(cfg.private_member)
        } else {
            Priority::base(cfg.public_function)
        };

        if documented(f.docstring.as_deref(), cfg.member_doc_min_chars) {
            p.apply(cfg.well_documented_member, "well_documented");
        }
        if self.has_keyword(&f.name) {
            p.apply(cfg.keyword_member, "important_keyword");
        }
        if let Some(framework) = self.framework(&function_text(f)) {
            p.apply(cfg.framework_member, format!("framework_{framework}"));
        }
        if entry_point {
            p.apply(cfg.entry_point_bonus, "entry_point");
        }
        if private {
            p.apply(cfg.private_member_penalty, "private");
        }
        p
    }

    fn has_keyword(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.keywords.iter().any(|k| name.contains(k.as_str()))
    }

    /// First framework (by name) with a pattern in `text`.
    fn framework(&self, text: &str) -> Option<&str> {
        let text = text.to_lowercase();
        self.frameworks
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|p| !p.is_empty() && text.contains(p.as_str())))
            .map(|(name, _)| name.as_str())
    }
}

fn worker_count(requested: usize, items: usize) -> usize {
    let n = match requested {
        0 if items < PARALLEL_THRESHOLD => 1,
        0 => std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1),
        n => n,
    };
    n.clamp(1, items.max(1))
}

fn documented(doc: Option<&str>, min_chars: usize) -> bool {
    doc.is_some_and(|d| d.trim().chars().count() > min_chars)
}

fn class_text(class: &Class) -> String {
    let mut text = class.name.clone();
    for part in class.bases.iter().chain(&class.decorators) {
        text.push(' ');
        text.push_str(part);
    }
    if let Some(doc) = &class.docstring {
        text.push(' ');
        text.push_str(doc);
    }
    text
}

fn function_text(f: &Function) -> String {
    let mut text = format!("{} {}", f.name, f.signature);
    for decorator in &f.decorators {
        text.push(' ');
        text.push_str(decorator);
    }
    if let Some(doc) = &f.docstring {
        text.push(' ');
        text.push_str(doc);
    }
    text
}

// ── Rendering ─────────────────────────────────────────────────────────────

fn push_docstring(out: &mut String, doc: Option<&str>, indent: &str) {
    let Some(doc) = doc.map(str::trim).filter(|d| !d.is_empty()) else {
        return;
    };
    if doc.contains('\n') {
        let _ = writeln!(out, "{indent}\"\"\"");
        for line in doc.lines() {
            let _ = writeln!(out, "{indent}{}", line.trim_end());
        }
        let _ = writeln!(out, "{indent}\"\"\"");
    } else {
        let _ = writeln!(out, "{indent}\"\"\"{doc}\"\"\"");
    }
}

fn push_decorators(out: &mut String, decorators: &[String]) {
    for d in decorators {
        let _ = writeln!(out, "@{}", d.trim_start_matches('@'));
    }
}

fn render_class(class: &Class) -> String {
    let mut out = String::new();
    push_decorators(&mut out, &class.decorators);
    if class.bases.is_empty() {
        let _ = writeln!(out, "class {}:", class.name);
    } else {
        let _ = writeln!(out, "class {}({}):", class.name, class.bases.join(", "));
    }
    push_docstring(&mut out, class.docstring.as_deref(), "    ");

    let flags: Vec<&str> = [
        (class.is_abstract, "abstract"),
        (class.is_dataclass, "dataclass"),
        (class.is_enum, "enum"),
    ]
    .into_iter()
    .filter_map(|(set, name)| set.then_some(name))
    .collect();
    if !flags.is_empty() {
        let _ = writeln!(out, "    # {}", flags.join(", "));
    }

    let methods: Vec<&str> = class.public_methods().map(|m| m.name.as_str()).collect();
    if !methods.is_empty() {
        let _ = writeln!(out, "    # methods: {}", methods.join(", "));
    }
    out.trim_end().to_string()
}

fn render_function(f: &Function) -> String {
    let mut out = String::new();
    push_decorators(&mut out, &f.decorators);

    let mut signature = f.display_signature().trim().to_string();
    if f.is_async && !signature.starts_with("async") {
        signature.insert_str(0, "async ");
    }
    if let Some(ret) = &f.return_type {
        if !signature.contains("->") {
            let _ = write!(signature, " -> {ret}");
        }
    }
    let _ = writeln!(out, "{signature}");
    push_docstring(&mut out, f.docstring.as_deref(), "    ");
    out.trim_end().to_string()
}

fn render_module(module: &Module) -> String {
    let mut out = if module.file_path.is_empty() {
        format!("module {}", module.name)
    } else {
        format!("module {} ({})", module.name, module.file_path)
    };
    if let Some(doc) = module.docstring.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        let _ = write!(out, "\n\n{doc}");
    }

    let mut listing = Vec::new();
    if !module.classes.is_empty() {
        let names: Vec<&str> = module.classes.iter().map(|c| c.name.as_str()).collect();
        listing.push(format!("classes: {}", names.join(", ")));
    }
    if !module.functions.is_empty() {
        let names: Vec<&str> = module.functions.iter().map(|f| f.name.as_str()).collect();
        listing.push(format!("functions: {}", names.join(", ")));
    }
    if !module.constants.is_empty() {
        let consts: Vec<String> = module
            .constants
            .iter()
            .map(|c| match (&c.type_hint, &c.value) {
                (Some(t), Some(v)) => format!("{}: {t} = {v}", c.name),
                (None, Some(v)) => format!("{} = {v}", c.name),
                (Some(t), None) => format!("{}: {t}", c.name),
                (None, None) => c.name.clone(),
            })
            .collect();
        listing.push(format!("constants: {}", consts.join(", ")));
    }
    if !module.imports.is_empty() {
        let imports: Vec<String> = module
            .imports
            .iter()
            .map(|i| {
                if i.names.is_empty() {
                    i.module.clone()
                } else {
                    format!("{} ({})", i.module, i.names.join(", "))
                }
            })
            .collect();
        listing.push(format!("imports: {}", imports.join(", ")));
    }
    if !listing.is_empty() {
        let _ = write!(out, "\n\n{}", listing.join("\n"));
    }
    out
}

fn render_example(example: &CodeExample) -> String {
    let mut out = String::new();
    if !example.title.trim().is_empty() {
        let _ = writeln!(out, "# {}", example.title.trim());
    }
    if let Some(description) = &example.description {
        for line in description.lines().filter(|l| !l.trim().is_empty()) {
            let _ = writeln!(out, "# {}", line.trim());
        }
    }
    out.push_str(example.code.trim_end());
    out
}

fn render_metadata(
    metadata: &ProjectMetadata,
    documentation: Option<&Documentation>,
    tests: Option<&TestSuite>,
) -> String {
    let mut lines = Vec::new();
    let name = if metadata.name.trim().is_empty() {
        "unknown"
    } else {
        metadata.name.trim()
    };
    lines.push(format!("name: {name}"));

    let optional = [
        ("description", &metadata.description),
        ("version", &metadata.version),
        ("license", &metadata.license),
        ("homepage", &metadata.homepage),
        ("repository", &metadata.repository),
        ("requires", &metadata.language_version),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            lines.push(format!("{key}: {value}"));
        }
    }
    match (&metadata.author, &metadata.author_email) {
        (Some(a), Some(e)) => lines.push(format!("author: {a} <{e}>")),
        (Some(a), None) => lines.push(format!("author: {a}")),
        (None, Some(e)) => lines.push(format!("author: <{e}>")),
        (None, None) => {}
    }
    lines.push(format!("kind: {}", metadata.kind));
    if !metadata.keywords.is_empty() {
        lines.push(format!("keywords: {}", metadata.keywords.join(", ")));
    }
    if !metadata.classifiers.is_empty() {
        lines.push("classifiers:".into());
        lines.extend(metadata.classifiers.iter().map(|c| format!("  - {c}")));
    }

    if let Some(docs) = documentation {
        for (key, value) in [
            ("readme", &docs.readme_file),
            ("changelog", &docs.changelog_file),
            ("license_file", &docs.license_file),
        ] {
            if let Some(value) = value {
                lines.push(format!("{key}: {value}"));
            }
        }
        if !docs.doc_files.is_empty() {
            lines.push(format!("docs: {}", docs.doc_files.join(", ")));
        }
    }
    if let Some(tests) = tests {
        let framework = tests.framework.as_deref().unwrap_or("unknown");
        lines.push(format!(
            "tests: {framework} ({} tests in {} files)",
            tests.total_tests,
            tests.test_files.len()
        ));
    }
    lines.join("\n")
}

fn render_dependencies(deps: &Dependencies) -> String {
    let mut lines = Vec::new();
    if !deps.production.is_empty() {
        lines.push(format!("production: {}", deps.production.join(", ")));
    }
    if !deps.development.is_empty() {
        lines.push(format!("development: {}", deps.development.join(", ")));
    }
    if !deps.optional.is_empty() {
        lines.push("optional:".into());
        for (group, names) in &deps.optional {
            lines.push(format!("  {group}: {}", names.join(", ")));
        }
    }
    if let Some(requires) = &deps.language_requires {
        lines.push(format!("requires: {requires}"));
    }
    lines.join("\n")
}

fn render_configuration(config: &Configuration) -> String {
    let mut lines = Vec::new();
    if !config.config_files.is_empty() {
        lines.push(format!("config_files: {}", config.config_files.join(", ")));
    }
    if !config.environment_variables.is_empty() {
        lines.push("environment:".into());
        for (name, description) in &config.environment_variables {
            lines.push(format!("  {name}: {description}"));
        }
    }
    if !config.default_settings.is_empty() {
        lines.push("defaults:".into());
        let pretty = serde_json::to_string_pretty(&config.default_settings).unwrap_or_default();
        lines.extend(pretty.lines().map(|l| format!("  {l}")));
    }
    lines.join("\n")
}
