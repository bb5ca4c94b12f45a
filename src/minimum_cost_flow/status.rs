#[derive(Default, PartialEq, Eq, Debug, Clone, Copy)]
pub enum Status {
    #[default]
    NotSolved,
    Unbalanced,
    Infeasible,
    Optimal,
    // stopped early by an approximate termination policy
    Approximate,
}
