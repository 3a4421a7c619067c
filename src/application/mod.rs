// Application layer - Control use cases and the ports they depend on
pub mod actuator_dispatcher;
pub mod control_loop;
pub mod flow_controller;
pub mod measurement_source;
pub mod measurement_store;
pub mod valve_actuator;

#[cfg(test)]
pub(crate) mod test_support;
