//! Pre-order traversal with contexts
//!
//! `walk` yields every element of a subtree in pre-order, together with the
//! context matchers need: the ancestor path from the root of the walk, the
//! element's coordinates within the nearest enclosing table, its position
//! among its siblings, and the positional path that identifies it during a
//! rebuild. The walker is a plain iterator, so traversals are lazy and can be
//! restarted or started at any subtree.

use crate::elements::{ElementRef, PathStep};

/// One element as seen during traversal.
#[derive(Debug, Clone, Copy)]
pub struct Entry<'a> {
    pub element: ElementRef<'a>,
    /// Coordinates within the nearest enclosing table, if any.
    pub table_pos: Option<(usize, usize)>,
    /// Position among the parent's children.
    pub index: usize,
    /// Number of children of the parent.
    pub count: usize,
}

impl<'a> Entry<'a> {
    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 == self.count
    }
}

/// A traversal step: the element plus its full context.
#[derive(Debug, Clone)]
pub struct Visit<'a> {
    pub entry: Entry<'a>,
    /// Entries from the walk root down to the parent.
    pub ancestors: Vec<Entry<'a>>,
    /// Steps from the walk root to this element.
    pub path: Vec<PathStep>,
}

impl<'a> Visit<'a> {
    pub fn element(&self) -> ElementRef<'a> {
        self.entry.element
    }
}

struct Frame<'a> {
    entry: Entry<'a>,
    step: Option<PathStep>,
    children: Vec<(PathStep, ElementRef<'a>)>,
    next: usize,
}

/// Lazy pre-order walker over a subtree.
pub struct Walker<'a> {
    stack: Vec<Frame<'a>>,
    yield_root: bool,
}

/// Walk a subtree in pre-order, starting with (and including) `root`.
pub fn walk(root: ElementRef<'_>) -> Walker<'_> {
    Walker {
        stack: vec![Frame {
            entry: Entry {
                element: root,
                table_pos: None,
                index: 0,
                count: 1,
            },
            step: None,
            children: root.children(),
            next: 0,
        }],
        yield_root: true,
    }
}

impl<'a> Iterator for Walker<'a> {
    type Item = Visit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.yield_root {
            self.yield_root = false;
            let root = self.stack.first()?;
            return Some(Visit {
                entry: root.entry,
                ancestors: Vec::new(),
                path: Vec::new(),
            });
        }
        loop {
            match self.stack.last_mut() {
                None => return None,
                Some(top) if top.next >= top.children.len() => {
                    self.stack.pop();
                }
                Some(top) => {
                    let index = top.next;
                    let count = top.children.len();
                    let (step, child) = top.children[index];
                    let parent_pos = top.entry.table_pos;
                    top.next += 1;

                    let table_pos = match step {
                        PathStep::Cell(row, col) => Some((row, col)),
                        _ => parent_pos,
                    };
                    let entry = Entry {
                        element: child,
                        table_pos,
                        index,
                        count,
                    };
                    self.stack.push(Frame {
                        entry,
                        step: Some(step),
                        children: child.children(),
                        next: 0,
                    });
                    let ancestors = self.stack[..self.stack.len() - 1]
                        .iter()
                        .map(|frame| frame.entry)
                        .collect();
                    let path = self.stack[1..]
                        .iter()
                        .filter_map(|frame| frame.step)
                        .collect();
                    return Some(Visit {
                        entry,
                        ancestors,
                        path,
                    });
                }
            }
        }
    }
}
