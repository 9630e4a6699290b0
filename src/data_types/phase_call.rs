use crate::data_types::variants::Sample;

/// The number of informative sites supporting each sample for a read name
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SampleCount {
    pub count_a: u64,
    pub count_b: u64
}

impl SampleCount {
    pub fn new(count_a: u64, count_b: u64) -> SampleCount {
        SampleCount { count_a, count_b }
    }

    /// Adds a single vote; `None` votes are ignored.
    pub fn add_vote(&mut self, sample: Option<Sample>) {
        match sample {
            Some(Sample::A) => self.count_a += 1,
            Some(Sample::B) => self.count_b += 1,
            None => {}
        }
    }
}

/// How decisively a read was assigned
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Support {
    /// the losing sample had zero votes
    Unique,
    /// both samples had votes, but one had more
    Majority
}

/// Which output stream an alignment is written to
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, strum_macros::Display)]
pub enum PhasedOutput {
    SampleA=0,
    SampleB,
    Ambiguous
}

/// The final decision for a read name.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PhaseCall {
    AssignedA(Support),
    AssignedB(Support),
    Ambiguous
}

impl PhaseCall {
    /// Majority rule with ties (including 0-0) going to ambiguous.
    pub fn from_counts(counts: SampleCount) -> PhaseCall {
        let SampleCount { count_a, count_b } = counts;
        if count_a > count_b {
            PhaseCall::AssignedA(if count_b == 0 { Support::Unique } else { Support::Majority })
        } else if count_a < count_b {
            PhaseCall::AssignedB(if count_a == 0 { Support::Unique } else { Support::Majority })
        } else {
            PhaseCall::Ambiguous
        }
    }

    pub fn output(&self) -> PhasedOutput {
        match self {
            PhaseCall::AssignedA(_) => PhasedOutput::SampleA,
            PhaseCall::AssignedB(_) => PhasedOutput::SampleB,
            PhaseCall::Ambiguous => PhasedOutput::Ambiguous
        }
    }

    /// Short label used in the read summary table
    pub fn label(&self) -> &'static str {
        match self {
            PhaseCall::AssignedA(Support::Unique) => "A_unique",
            PhaseCall::AssignedA(Support::Majority) => "A_majority",
            PhaseCall::AssignedB(Support::Unique) => "B_unique",
            PhaseCall::AssignedB(Support::Majority) => "B_majority",
            PhaseCall::Ambiguous => "ambiguous"
        }
    }
}
