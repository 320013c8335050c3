//! # Assignment controller
//!
//! Reachability graph, scoring, min-cost matching, and churn policy for the
//! dynamic station/edge assignment.

pub mod controller;
pub mod flow;
pub mod model;

pub use controller::AssignmentController;
pub use model::{Directive, EdgeServer, Station};
