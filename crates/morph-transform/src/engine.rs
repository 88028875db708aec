//! # Transformation Engine
//!
//! Policy-driven rewriting of schema trees. A [`Rule`] names a structural
//! pattern (`from`), a replacement function (`to`), and traversal flags.
//! [`replace_schema`] applies a list of rules as independent sequential
//! passes over the whole tree.
//!
//! ## Traversal
//!
//! Depth-first and top-down, driven by an explicit task stack:
//!
//! - `root_only`: test the root, replace it on a match, never descend.
//! - `exclude_root`: never replace the root, but descend into it.
//! - A node carrying a coercion tag is never descended into. Only a rule
//!   whose `from` carries the same tag replaces it.
//! - On a match, children are rewritten first and `to` receives the node
//!   with its rewritten children. Two flags halt instead: `only_first`
//!   (the match has the configured kind) and `until_object_found` (the node
//!   is a non-root object). A halting match hands `to` the original node
//!   and leaves everything beneath it untouched.
//! - `until_object_found` also stops descent beneath unmatched non-root
//!   objects.
//! - Codec wrappers are transparent: they are matched by their inner kind
//!   and descent continues with the inner node's children.
//! - References and foreign nodes are never rewritten.
//!
//! ## Sharing and cycles
//!
//! Inputs are never mutated. Unchanged branches keep their identity, and
//! each shared sub-node is rewritten once per pass. A node met again while
//! it is still being rewritten is returned unchanged, which bounds the walk
//! on any graph.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use morph_core::{Kind, Schema, WrapperKind};

use crate::error::TransformError;

/// Replacement function. `None` leaves an explicit null marker
/// ([`Schema::invalidated`]) in place of the matched node.
pub type ReplaceFn = Arc<dyn Fn(&Schema) -> Option<Schema> + Send + Sync>;

/// A single rewrite rule.
#[derive(Clone)]
pub struct Rule {
    from: Schema,
    to: ReplaceFn,
    root_only: bool,
    exclude_root: bool,
    only_first: Option<Kind>,
    until_object_found: bool,
}

impl Rule {
    /// A rule replacing nodes shaped like `from` with `to(node)`.
    pub fn new<F>(from: Schema, to: F) -> Self
    where
        F: Fn(&Schema) -> Option<Schema> + Send + Sync + 'static,
    {
        Self {
            from,
            to: Arc::new(to),
            root_only: false,
            exclude_root: false,
            only_first: None,
            until_object_found: false,
        }
    }

    /// Only the root is tested; nothing beneath it is visited.
    pub fn root_only(mut self) -> Self {
        self.root_only = true;
        self
    }

    /// The root is never replaced.
    pub fn exclude_root(mut self) -> Self {
        self.exclude_root = true;
        self
    }

    /// Stop beneath the first match of `kind` on each branch.
    pub fn only_first(mut self, kind: Kind) -> Self {
        self.only_first = Some(kind);
        self
    }

    /// Stop beneath the first non-root object on each branch.
    pub fn until_object_found(mut self) -> Self {
        self.until_object_found = true;
        self
    }

    /// The pattern node.
    pub fn pattern(&self) -> &Schema {
        &self.from
    }

    /// Check the flag combination.
    ///
    /// # Errors
    ///
    /// Returns `TransformError::ConflictingFlags` when `root_only` is set
    /// together with `exclude_root`, `only_first`, or `until_object_found`.
    pub fn validate(&self) -> Result<(), TransformError> {
        if !self.root_only {
            return Ok(());
        }
        let conflict = if self.exclude_root {
            Some("exclude_root")
        } else if self.only_first.is_some() {
            Some("only_first")
        } else if self.until_object_found {
            Some("until_object_found")
        } else {
            None
        };
        match conflict {
            Some(second) => Err(TransformError::ConflictingFlags {
                first: "root_only",
                second,
            }),
            None => Ok(()),
        }
    }

    /// Whether `node` has the pattern's shape.
    ///
    /// Untagged patterns compare kinds (including primitive sub-kind) and
    /// never match tagged nodes. Tagged patterns match nodes with the same
    /// tag. Constraints and metadata are ignored.
    pub fn matches(&self, node: &Schema) -> bool {
        match (self.from.coercion(), node.coercion()) {
            (None, None) => self.from.kind() == node.kind(),
            (Some(want), Some(have)) => want == have,
            _ => false,
        }
    }

    fn replace(&self, node: &Schema) -> Schema {
        (self.to)(node).unwrap_or_else(Schema::invalidated)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("from", &self.from.kind())
            .field("root_only", &self.root_only)
            .field("exclude_root", &self.exclude_root)
            .field("only_first", &self.only_first)
            .field("until_object_found", &self.until_object_found)
            .finish_non_exhaustive()
    }
}

/// A validated, shareable list of rules.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Validate and bundle rules.
    ///
    /// # Errors
    ///
    /// Returns the first rule's `TransformError::ConflictingFlags`.
    pub fn new(rules: Vec<Rule>) -> Result<Self, TransformError> {
        for rule in &rules {
            rule.validate()?;
        }
        Ok(Self { rules })
    }

    /// Bundle rules whose flags are known to be compatible.
    pub(crate) fn trusted(rules: Vec<Rule>) -> Self {
        debug_assert!(rules.iter().all(|r| r.validate().is_ok()));
        Self { rules }
    }

    /// The rules, in pass order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply every rule as a sequential pass.
    pub fn apply(&self, schema: Option<&Schema>) -> Option<Schema> {
        schema.map(|s| run_passes(s, &self.rules))
    }
}

/// Rewrite `schema` with `rules`, one full pass per rule, in order.
///
/// `None` input yields `None`. A node lacking the inspected structure is
/// returned unchanged.
///
/// # Errors
///
/// Returns `TransformError::ConflictingFlags` before any traversal when a
/// rule combines `root_only` with another traversal flag.
pub fn replace_schema(
    schema: Option<&Schema>,
    rules: &[Rule],
) -> Result<Option<Schema>, TransformError> {
    for rule in rules {
        rule.validate()?;
    }
    Ok(schema.map(|s| run_passes(s, rules)))
}

fn run_passes(schema: &Schema, rules: &[Rule]) -> Schema {
    rules
        .iter()
        .fold(schema.clone(), |acc, rule| Pass::new(rule).run(&acc))
}

#[derive(Debug, Clone, Copy)]
enum Finish {
    Keep,
    Replace,
}

enum Task {
    Visit {
        node: Schema,
        root: bool,
    },
    Assemble {
        node: Schema,
        arity: usize,
        finish: Finish,
        memo: bool,
    },
}

struct Pass<'r> {
    rule: &'r Rule,
    memo: HashMap<usize, Schema>,
    in_progress: HashSet<usize>,
}

impl<'r> Pass<'r> {
    fn new(rule: &'r Rule) -> Self {
        Self {
            rule,
            memo: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    fn run(mut self, root: &Schema) -> Schema {
        let mut tasks = vec![Task::Visit {
            node: root.clone(),
            root: true,
        }];
        let mut results: Vec<Schema> = Vec::new();

        while let Some(task) = tasks.pop() {
            match task {
                Task::Visit { node, root } => self.visit(node, root, &mut tasks, &mut results),
                Task::Assemble {
                    node,
                    arity,
                    finish,
                    memo,
                } => {
                    let children = results.split_off(results.len().saturating_sub(arity));
                    let rebuilt = node.with_children(children);
                    let out = match finish {
                        Finish::Keep => rebuilt,
                        Finish::Replace => self.rule.replace(&rebuilt),
                    };
                    if memo {
                        self.in_progress.remove(&node.id());
                        self.memo.insert(node.id(), out.clone());
                    }
                    results.push(out);
                }
            }
        }

        results.pop().unwrap_or_else(|| root.clone())
    }

    fn visit(&mut self, node: Schema, root: bool, tasks: &mut Vec<Task>, results: &mut Vec<Schema>) {
        let rule = self.rule;

        if root && rule.root_only {
            let out = if rule.matches(&node) {
                rule.replace(&node)
            } else {
                node
            };
            results.push(out);
            return;
        }

        if let Some(done) = self.memo.get(&node.id()) {
            results.push(done.clone());
            return;
        }
        if self.in_progress.contains(&node.id()) {
            results.push(node);
            return;
        }

        let skip_root = root && rule.exclude_root;

        if node.coercion().is_some() {
            let out = if !skip_root && rule.matches(&node) {
                rule.replace(&node)
            } else {
                node.clone()
            };
            self.finish_leaf(&node, out, results);
            return;
        }

        let matched = !skip_root && rule.matches(&node);
        let object_stop = rule.until_object_found && !root && node.kind() == Kind::Object;

        if matched {
            let halts = rule.only_first == Some(node.kind()) || object_stop;
            if halts {
                let out = rule.replace(&node);
                self.finish_leaf(&node, out, results);
            } else {
                self.descend(node, Finish::Replace, tasks);
            }
        } else if object_stop {
            self.finish_leaf(&node, node.clone(), results);
        } else {
            self.descend(node, Finish::Keep, tasks);
        }
    }

    fn finish_leaf(&mut self, node: &Schema, out: Schema, results: &mut Vec<Schema>) {
        self.memo.insert(node.id(), out.clone());
        results.push(out);
    }

    /// Schedule reassembly of `node` after its children are visited.
    /// Codec wrappers pass through to the children of what they wrap.
    fn descend(&mut self, node: Schema, finish: Finish, tasks: &mut Vec<Task>) {
        self.in_progress.insert(node.id());

        let mut current = node;
        let mut finish = finish;
        let mut memo = true;
        loop {
            let children = current.children();
            tasks.push(Task::Assemble {
                node: current.clone(),
                arity: children.len(),
                finish,
                memo,
            });

            let codec_inner = current
                .as_wrapper()
                .filter(|w| w.kind() == WrapperKind::Codec)
                .map(|w| w.inner().clone());
            match codec_inner {
                Some(inner) => {
                    current = inner;
                    finish = Finish::Keep;
                    memo = false;
                }
                None => {
                    for child in children.into_iter().rev() {
                        tasks.push(Task::Visit {
                            node: child,
                            root: false,
                        });
                    }
                    return;
                }
            }
        }
    }
}
