//! Walking nested sub-process profiles.
//!
//! Profiles nest through their `processes`, and a corrupted or adversarial
//! file can nest arbitrarily deep. Both helpers here keep their pending
//! work on the heap instead of recursing.

use crate::legacy::ProfileV5;
use crate::profile::Profile;

pub trait ProcessTree: Sized {
    fn subprocesses_mut(&mut self) -> &mut Vec<Self>;
}

impl ProcessTree for ProfileV5 {
    fn subprocesses_mut(&mut self) -> &mut Vec<Self> {
        &mut self.processes
    }
}

impl ProcessTree for Profile {
    fn subprocesses_mut(&mut self) -> &mut Vec<Self> {
        &mut self.processes
    }
}

/// Calls `f` on `root` and on every profile nested below it, parents before
/// children, siblings in order.
pub fn for_each_process_mut<P: ProcessTree, E>(
    root: &mut P,
    mut f: impl FnMut(&mut P) -> Result<(), E>,
) -> Result<(), E> {
    let mut pending = vec![root];
    while let Some(process) = pending.pop() {
        f(process)?;
        pending.extend(process.subprocesses_mut().iter_mut().rev());
    }
    Ok(())
}

struct Frame<A, P, B> {
    parent: P,
    children: std::vec::IntoIter<A>,
    converted_children: Vec<B>,
}

/// Converts a tree of `A` nodes into a tree of `B` nodes, bottom-up.
///
/// `split` takes a node apart into its own converted part and its
/// unconverted children. Once all of a node's children are converted,
/// `join` assembles the converted node from both. Children keep their
/// order.
pub fn convert_process_tree<A, P, B, E>(
    root: A,
    mut split: impl FnMut(A) -> Result<(P, Vec<A>), E>,
    mut join: impl FnMut(P, Vec<B>) -> Result<B, E>,
) -> Result<B, E> {
    let mut descend = |node: A| -> Result<Frame<A, P, B>, E> {
        let (parent, children) = split(node)?;
        Ok(Frame {
            parent,
            converted_children: Vec::with_capacity(children.len()),
            children: children.into_iter(),
        })
    };

    let mut ancestors = Vec::new();
    let mut frame = descend(root)?;
    loop {
        if let Some(child) = frame.children.next() {
            ancestors.push(frame);
            frame = descend(child)?;
            continue;
        }
        let converted = join(frame.parent, frame.converted_children)?;
        match ancestors.pop() {
            Some(parent_frame) => {
                frame = parent_frame;
                frame.converted_children.push(converted);
            }
            None => return Ok(converted),
        }
    }
}
