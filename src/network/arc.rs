use num_traits::NumAssign;
use std::fmt::Debug;
use std::ops::Neg;

/// One logical edge `src -> dst`.
///
/// `capacity` is the forward residual capacity; the reverse residual capacity is the flow
/// `initial_capacity - capacity`, and the reverse arc costs `-cost`.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Arc<Flow> {
    src: usize,
    dst: usize,
    capacity: Flow,
    initial_capacity: Flow,
    cost: Flow,
}

impl<Flow> Arc<Flow>
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy,
{
    pub fn new(src: usize, dst: usize, capacity: Flow, cost: Flow) -> Self {
        Arc { src, dst, capacity, initial_capacity: capacity, cost }
    }

    #[inline]
    pub fn src(&self) -> usize {
        self.src
    }

    #[inline]
    pub fn dst(&self) -> usize {
        self.dst
    }

    #[inline]
    pub fn capacity(&self) -> Flow {
        self.capacity
    }

    #[inline]
    pub fn initial_capacity(&self) -> Flow {
        self.initial_capacity
    }

    #[inline]
    pub fn cost(&self) -> Flow {
        self.cost
    }

    #[inline]
    pub fn flow(&self) -> Flow {
        self.initial_capacity - self.capacity
    }

    pub fn opposite(&self, id: usize) -> usize {
        debug_assert!(id == self.src || id == self.dst);
        if id == self.src {
            self.dst
        } else {
            self.src
        }
    }

    /// Residual capacity when the arc is traversed starting at `from`.
    #[inline]
    pub fn residual_capacity(&self, from: usize) -> Flow {
        if from == self.src {
            self.capacity
        } else {
            debug_assert_eq!(from, self.dst);
            self.flow()
        }
    }

    /// Cost when the arc is traversed starting at `from`.
    #[inline]
    pub fn directed_cost(&self, from: usize) -> Flow {
        if from == self.src {
            self.cost
        } else {
            -self.cost
        }
    }

    #[inline]
    pub fn reduced_cost(&self, from: usize, potentials: &[Flow]) -> Flow {
        self.directed_cost(from) - potentials[from] + potentials[self.opposite(from)]
    }

    // positive amount increases the flow from src to dst
    #[inline]
    pub(crate) fn push_flow(&mut self, amount: Flow) {
        self.capacity -= amount;
    }

    // returns whether the current flow still fits into the new capacity
    pub(crate) fn set_capacity(&mut self, new_capacity: Flow) -> bool {
        self.capacity += new_capacity - self.initial_capacity;
        self.initial_capacity = new_capacity;
        self.capacity >= Flow::zero()
    }

    pub(crate) fn set_cost(&mut self, cost: Flow) {
        self.cost = cost;
    }
}
