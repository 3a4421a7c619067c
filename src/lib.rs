// Closed-loop flow rate control for a pressurized reservoir with a pinch valve
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
