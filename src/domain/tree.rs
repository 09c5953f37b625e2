//! Tree-shaped rendering of a hierarchy for display.
//!
//! Rows are produced depth-first, pre-order, by an explicit stack of
//! `(code, pipes)` frames. In a DAG a code reachable by several paths from
//! the starting code is yielded once per path.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use itertools::Itertools;
use serde::Serialize;

use crate::domain::coding_system::CodingSystem;
use crate::domain::entities::Code;
use crate::domain::hierarchy::Hierarchy;

/// One column of the indentation drawn to the left of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Glyph {
    /// `├` a sibling follows
    Tee,
    /// `└` last sibling
    Elbow,
    /// `│` an ancestor at this level has further siblings below
    Pipe,
    /// ` ` nothing left at this level
    Blank,
}

impl Glyph {
    pub fn as_char(self) -> char {
        match self {
            Glyph::Tee => '├',
            Glyph::Elbow => '└',
            Glyph::Pipe => '│',
            Glyph::Blank => ' ',
        }
    }

    /// Glyph continuing this column on the rows below the current one.
    fn continuation(self) -> Self {
        match self {
            Glyph::Elbow | Glyph::Blank => Glyph::Blank,
            Glyph::Tee | Glyph::Pipe => Glyph::Pipe,
        }
    }
}

impl fmt::Display for Glyph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeRow {
    pub code: Code,
    pub term: String,
    pub pipes: Vec<Glyph>,
    pub included: bool,
}

impl TreeRow {
    pub fn depth(&self) -> usize {
        self.pipes.len()
    }

    pub fn prefix(&self) -> String {
        self.pipes.iter().map(|g| g.as_char()).collect()
    }
}

/// Rows for one code type, e.g. all disorders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeTable {
    pub heading: String,
    pub rows: Vec<TreeRow>,
}

/// Everything needed to lay out rows: the hierarchy, the codes shown as
/// included, and the display terms that order siblings.
#[derive(Debug, Clone, Copy)]
pub struct TreePresenter<'a> {
    hierarchy: &'a Hierarchy,
    included: &'a BTreeSet<Code>,
    terms: &'a BTreeMap<Code, String>,
    coding_system: CodingSystem,
}

impl<'a> TreePresenter<'a> {
    pub fn new(
        hierarchy: &'a Hierarchy,
        included: &'a BTreeSet<Code>,
        terms: &'a BTreeMap<Code, String>,
    ) -> Self {
        Self {
            hierarchy,
            included,
            terms,
            coding_system: CodingSystem::SnomedCt,
        }
    }

    /// Coding system supplying the term for codes missing from `terms`.
    pub fn with_coding_system(mut self, coding_system: CodingSystem) -> Self {
        self.coding_system = coding_system;
        self
    }

    pub fn term(&self, code: &str) -> &'a str {
        self.coding_system.lookup_term(code, self.terms)
    }

    /// Siblings in display order: by term, then by code.
    fn sorted_children(&self, code: &str) -> Vec<&'a str> {
        self.hierarchy
            .children(code)
            .iter()
            .map(String::as_str)
            .sorted_by(|a, b| self.term(a).cmp(self.term(b)).then_with(|| a.cmp(b)))
            .collect()
    }

    pub fn rows(&self, root: &'a str) -> TreeRows<'a> {
        TreeRows {
            presenter: *self,
            stack: vec![Frame {
                code: root,
                pipes: Vec::new(),
            }],
        }
    }

    /// One table per code type, headings title-cased, ancestors in term order.
    pub fn tables(&self, ancestors_by_type: &'a BTreeMap<String, BTreeSet<Code>>) -> Vec<TreeTable> {
        ancestors_by_type
            .iter()
            .map(|(code_type, ancestors)| TreeTable {
                heading: title_case(code_type),
                rows: ancestors
                    .iter()
                    .map(String::as_str)
                    .sorted_by(|a, b| self.term(a).cmp(self.term(b)).then_with(|| a.cmp(b)))
                    .flat_map(|ancestor| self.rows(ancestor))
                    .collect(),
            })
            .collect()
    }
}

struct Frame<'a> {
    code: &'a str,
    pipes: Vec<Glyph>,
}

/// Lazy, one-shot iterator over the rows below a starting code.
pub struct TreeRows<'a> {
    presenter: TreePresenter<'a>,
    stack: Vec<Frame<'a>>,
}

impl Iterator for TreeRows<'_> {
    type Item = TreeRow;

    fn next(&mut self) -> Option<Self::Item> {
        let Frame { code, pipes } = self.stack.pop()?;
        let presenter = self.presenter;

        let mut base = pipes.clone();
        if let Some(last) = base.last_mut() {
            *last = last.continuation();
        }

        let children = presenter.sorted_children(code);
        let last_ix = children.len().saturating_sub(1);
        // reversed so the first child is popped first
        for (ix, child) in children.into_iter().enumerate().rev() {
            let mut child_pipes = base.clone();
            child_pipes.push(if ix == last_ix { Glyph::Elbow } else { Glyph::Tee });
            self.stack.push(Frame {
                code: child,
                pipes: child_pipes,
            });
        }

        Some(TreeRow {
            code: code.to_string(),
            term: presenter.term(code).to_string(),
            pipes,
            included: presenter.included.contains(code),
        })
    }
}

/// Rows for `root` and all its descendants, siblings ordered by term.
pub fn tree_rows<'a>(
    root: &'a str,
    hierarchy: &'a Hierarchy,
    included: &'a BTreeSet<Code>,
    terms: &'a BTreeMap<Code, String>,
) -> TreeRows<'a> {
    TreePresenter::new(hierarchy, included, terms).rows(root)
}

/// `"body structure"` -> `"Body Structure"`
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}
