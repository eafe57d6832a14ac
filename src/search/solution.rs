use super::node::NodePtr;
use crate::problem::Problem;

/// Paint the binary matrix owned by an incumbent. Each node on the
/// parent chain owns the interval range between its parent's depth and
/// its own; the root child owns the prefix. Without an incumbent the
/// matrix stays all zero.
pub fn reconstruct(problem: &Problem, incumbent: Option<&NodePtr>) -> Vec<Vec<u8>> {
    let mut b_bin = vec![vec![0u8; problem.n_t()]; problem.n_c()];
    let mut cursor = incumbent;
    while let Some(node) = cursor {
        let begin = node.parent().map(|p| p.depth()).unwrap_or(0);
        if node.b_active() < problem.n_c() {
            for t in begin..node.depth() {
                b_bin[node.b_active()][t] = 1;
            }
        }
        cursor = node.parent();
    }
    b_bin
}
