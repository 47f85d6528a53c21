//! Projection families and grid geometry.
//!
//! A `Grid` is a projection descriptor plus fixed column/row counts.
//! The closed `Projection` union covers exactly the families the
//! assembly pipeline handles; matching on it is exhaustive by
//! construction. All projections map between geographic coordinates
//! (lat/lon degrees) and a per-family world coordinate system (degrees
//! for the lat/lon families, meters for the conformal ones); the grid
//! then lays its samples corner-inclusive over the projected area.

pub mod error;
pub mod grid;
pub mod lambert;
pub mod latlon;
pub mod mercator;
pub mod polar;

pub use error::{ProjectionError, Result};
pub use grid::{Grid, Projection};
pub use lambert::LambertConformal;
pub use latlon::{RegularLatLon, RotatedLatLon};
pub use mercator::Mercator;
pub use polar::PolarStereographic;

/// Mean Earth radius in meters, shared by the conformal families.
pub const EARTH_RADIUS: f64 = 6_371_229.0;
