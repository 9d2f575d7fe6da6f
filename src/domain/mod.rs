// Domain layer: request/response models of the settlement service and the ports
// (interfaces) the client depends on.

pub mod model;
pub mod ports;
