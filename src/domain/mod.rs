// Domain layer - Control law and flow/valve models
pub mod flow;
pub mod pid;
pub mod valve;
