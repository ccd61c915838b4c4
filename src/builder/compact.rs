//! Stack compaction.
//!
//! A single left-to-right scan that folds maximal runs of contiguous plain
//! `ADD` steps into one `STACK` node. Runs shorter than the minimum stack
//! size are left as they are, and every other node keeps its position.

use uuid::Uuid;

use crate::node::StepNode;

/// Allocates an id for a new stack node.
#[must_use]
pub fn fresh_stack_id() -> String {
    format!("stack-{}", Uuid::new_v4().simple())
}

/// Folds runs of at least `min_stack_size` contiguous `ADD` steps into stacks.
#[must_use]
pub fn compact(nodes: Vec<StepNode>, min_stack_size: usize) -> Vec<StepNode> {
    let min_stack_size = min_stack_size.max(2);
    let mut out = Vec::with_capacity(nodes.len());
    let mut run: Vec<StepNode> = Vec::new();

    for node in nodes {
        if node.is_add_step() {
            run.push(node);
            continue;
        }
        close_run(&mut run, &mut out, min_stack_size);
        out.push(node);
    }
    close_run(&mut run, &mut out, min_stack_size);
    out
}

fn close_run(run: &mut Vec<StepNode>, out: &mut Vec<StepNode>, min_stack_size: usize) {
    if run.len() >= min_stack_size {
        let members = std::mem::take(run);
        let stack = StepNode::stack(fresh_stack_id(), members);
        tracing::debug!(stack_id = %stack.id, members = stack.children.len(), "stacked add steps");
        out.push(stack);
    } else {
        out.append(run);
    }
}
