pub mod geojson;
pub mod patch;
pub mod zone;

pub use geojson::{Feature, FeatureCollection, Geometry, Position};
pub use patch::PatchOperation;
pub use zone::{PlanRequest, Zone, ZoneInput};
