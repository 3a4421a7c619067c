// PID walkthrough - steps the compensator by hand and prints each output
use flow_rate_control::domain::pid::{PidController, PidGains};

const TARGET: f64 = 35.0;

fn main() {
    let mut pid = PidController::new(PidGains::new(10.0, 1.0, 1.0).with_bias(TARGET));

    // (t, process variable, setpoint)
    let samples = [
        (0.0, 20.0, TARGET),
        (1.0, 24.0, TARGET),
        (2.0, 29.5, TARGET),
        (3.0, 33.0, TARGET),
        (4.0, 35.5, TARGET),
        (5.0, 35.0, TARGET),
    ];

    for (t, pv, sp) in samples {
        let mv = pid.update(t, pv, sp);
        println!("t={:>4.1}  pv={:>5.1}  sp={:>5.1}  mv={:>8.2}", t, pv, sp, mv);
    }
}
