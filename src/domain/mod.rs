// Domain layer: data model and ports (interfaces) implemented by adapters.

pub mod model;
pub mod ports;
