//! Cohort grouping
//!
//! Splits one race's results into rating cohorts (divisions), pads small
//! divisions to a virtual size and optionally extends each division's
//! comparison set with its neighbouring age bands.

pub mod division;
pub mod grouper;

pub use division::{DivisionKey, Gender};
pub use grouper::{Cohort, CohortGrouper};
