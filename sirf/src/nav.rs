//! GPS navigation data carried by 50 bps subframes.
//!
//! [`subframe`] turns the raw words of subframes 1 to 3 into records.
//! [`NavSubframeValidator`] keeps, per PRN, the latest subframes that agree
//! on their issue of data.

pub mod subframe;
mod validator;

pub use subframe::{Subframe, Subframe1, Subframe2, Subframe3};
pub use validator::{ChangeFlags, NavSubframeValidator, NavigationRecord, SatelliteNavState};
