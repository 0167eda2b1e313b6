//! Cursor registry behind `each`.
//!
//! Every running `each` call owns one cursor in the registry of the container
//! it iterates. A cursor stores the index of the next child to visit. Mutation
//! methods on that container shift every cursor whose next index lies after
//! the affected position, so an iteration in progress neither skips nor
//! revisits children:
//!
//! - inserting at or before the child being visited moves the cursor past the
//!   new nodes (they are not visited in this pass);
//! - inserting after it leaves the cursor alone (the new nodes come up later);
//! - removing the visited child or an earlier one pulls the cursor back so the
//!   next unvisited child is not skipped.
//!
//! Cursors are released by [`CursorGuard`] when the `each` call returns,
//! errors out or unwinds.

use crate::node::Node;
use crate::walk::Flow;
use tracing::trace;

pub(crate) type CursorId = u64;

#[derive(Debug, Default)]
pub(crate) struct Cursors {
    last_id: CursorId,
    // (cursor id, index of the next child to visit)
    active: Vec<(CursorId, usize)>,
}

impl Cursors {
    fn open(&mut self) -> CursorId {
        self.last_id += 1;
        self.active.push((self.last_id, 0));
        self.last_id
    }

    fn release(&mut self, id: CursorId) {
        self.active.retain(|(cursor, _)| *cursor != id);
    }

    fn next_of(&self, id: CursorId) -> Option<usize> {
        self.active
            .iter()
            .find(|(cursor, _)| *cursor == id)
            .map(|(_, next)| *next)
    }

    fn set_next(&mut self, id: CursorId, next: usize) {
        if let Some(entry) = self.active.iter_mut().find(|(cursor, _)| *cursor == id) {
            entry.1 = next;
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.active.len()
    }

    /// `count` children were spliced in at index `at`
    pub(crate) fn shift_inserted(&mut self, at: usize, count: usize) {
        for (_, next) in self.active.iter_mut() {
            if at < *next {
                *next += count;
            }
        }
    }

    /// The child at index `at` was removed
    pub(crate) fn shift_removed(&mut self, at: usize) {
        for (_, next) in self.active.iter_mut() {
            if at < *next {
                *next -= 1;
            }
        }
    }

    /// All `count` children were removed
    pub(crate) fn shift_cleared(&mut self, count: usize) {
        for (_, next) in self.active.iter_mut() {
            *next = next.saturating_sub(count);
        }
    }
}

/// Scoped registration of one cursor on one container
pub(crate) struct CursorGuard {
    owner: Node,
    id: CursorId,
}

impl CursorGuard {
    /// `None` when the container has no child list to iterate
    pub(crate) fn open(owner: &Node) -> Option<Self> {
        let id = owner.inner_mut().children.as_mut()?.cursors.open();
        Some(Self {
            owner: owner.clone(),
            id,
        })
    }

    /// Next child to visit and its current index, reading the live child list
    pub(crate) fn advance(&self) -> Option<(Node, usize)> {
        let mut inner = self.owner.inner_mut();
        let children = inner.children.as_mut()?;
        let index = children.cursors.next_of(self.id)?;
        let child = children.nodes.get(index)?.clone();
        children.cursors.set_next(self.id, index + 1);
        Some((child, index))
    }
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        // A borrow can only be outstanding here while unwinding out of a
        // panic inside a tree method; the whole tree is suspect by then.
        if let Ok(mut inner) = self.owner.0.try_borrow_mut() {
            if let Some(children) = inner.children.as_mut() {
                children.cursors.release(self.id);
            }
        }
    }
}

/// Visit the children of `container` one level deep, tolerating mutation of
/// `container` from inside `visit`.
pub(crate) fn each_child<E>(
    container: &Node,
    visit: &mut dyn FnMut(&Node, usize) -> Result<Flow, E>,
) -> Result<Flow, E> {
    let Some(guard) = CursorGuard::open(container) else {
        return Ok(Flow::Continue);
    };
    trace!(container = ?container, cursor = guard.id, "each started");

    while let Some((child, index)) = guard.advance() {
        if visit(&child, index)?.is_stop() {
            trace!(container = ?container, index, "each stopped");
            return Ok(Flow::Stop);
        }
    }
    Ok(Flow::Continue)
}
