// PID compensator - three-term feedback law with explicit step function

/// Gains and baseline bias of a PID compensator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub bias: f64,
}

impl PidGains {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            bias: 0.0,
        }
    }

    pub fn with_bias(mut self, bias: f64) -> Self {
        self.bias = bias;
        self
    }
}

/// Standard PID law evaluated once per call to [`PidController::update`].
///
/// State (previous error, previous timestamp, running integral) is only
/// written after the output has been computed from the current error.
#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    integral_limit: Option<f64>,
    default_dt: f64,

    integral: f64,
    prev_error: f64,
    prev_time: Option<f64>,
}

impl PidController {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            integral_limit: None,
            default_dt: 1.0,
            integral: 0.0,
            prev_error: 0.0,
            prev_time: None,
        }
    }

    /// Clamp the running integral to `[-limit, limit]` after each accumulation
    pub fn with_integral_limit(mut self, limit: Option<f64>) -> Self {
        self.integral_limit = limit.map(f64::abs);
        self
    }

    /// Elapsed time assumed for the first evaluation, when no previous timestamp exists
    pub fn with_default_dt(mut self, dt: f64) -> Self {
        self.default_dt = dt;
        self
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn last_error(&self) -> f64 {
        self.prev_error
    }

    /// Compute the manipulated variable for time `t` (seconds), process variable and setpoint.
    pub fn update(&mut self, t: f64, process_variable: f64, setpoint: f64) -> f64 {
        let error = setpoint - process_variable;
        let dt = match self.prev_time {
            Some(prev) => t - prev,
            None => self.default_dt,
        };

        let proportional = self.gains.kp * error;

        // dt <= 0 means duplicate or reordered timestamps: hold I, drop D
        let derivative = if dt > 0.0 {
            self.integral += self.gains.ki * error * dt;
            if let Some(limit) = self.integral_limit {
                self.integral = self.integral.clamp(-limit, limit);
            }
            self.gains.kd * (error - self.prev_error) / dt
        } else {
            tracing::warn!(t, dt, "Non-positive PID time step, skipping integral and derivative");
            0.0
        };

        let output = self.gains.bias + proportional + self.integral + derivative;

        self.prev_error = error;
        self.prev_time = Some(t);

        output
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = 0.0;
        self.prev_time = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_error_gives_bias() {
        let mut pid = PidController::new(PidGains::new(2.0, 1.0, 2.0));
        assert_eq!(pid.update(0.0, 0.0, 0.0), 0.0);

        let mut biased = PidController::new(PidGains::new(2.0, 1.0, 2.0).with_bias(35.0));
        assert_eq!(biased.update(0.0, 10.0, 10.0), 35.0);
    }

    #[test]
    fn test_three_terms() {
        let mut pid = PidController::new(PidGains::new(2.0, 1.0, 2.0)).with_default_dt(1.0);

        // e = 5, P = 10, I = 5, D = 2 * 5 / 1
        let first = pid.update(0.0, 5.0, 10.0);
        assert_eq!(first, 25.0);

        // e = 4, dt = 0.5, P = 8, I = 5 + 2 = 7, D = 2 * (4 - 5) / 0.5 = -4
        let second = pid.update(0.5, 6.0, 10.0);
        assert_eq!(second, 11.0);
        assert_eq!(pid.integral(), 7.0);
        assert_eq!(pid.last_error(), 4.0);
    }

    #[test]
    fn test_integral_accumulates_without_limit() {
        let mut pid = PidController::new(PidGains::new(0.0, 1.0, 0.0));
        for t in 0..100 {
            pid.update(t as f64, 0.0, 10.0);
        }
        assert_eq!(pid.integral(), 1000.0);
    }

    #[test]
    fn test_integral_limit_clamps_windup() {
        let mut pid = PidController::new(PidGains::new(0.0, 1.0, 0.0)).with_integral_limit(Some(50.0));
        for t in 0..100 {
            pid.update(t as f64, 0.0, 10.0);
        }
        assert_eq!(pid.integral(), 50.0);

        for t in 100..200 {
            pid.update(t as f64, 20.0, 10.0);
        }
        assert_eq!(pid.integral(), -50.0);
    }

    #[test]
    fn test_duplicate_timestamp_is_finite() {
        let mut pid = PidController::new(PidGains::new(1.0, 1.0, 1.0));
        pid.update(3.0, 0.0, 1.0);
        let integral = pid.integral();

        let output = pid.update(3.0, 0.0, 2.0);
        assert!(output.is_finite());
        assert_eq!(pid.integral(), integral);
        assert_eq!(output, 2.0 + integral);

        // Going backwards in time behaves the same way
        let output = pid.update(2.0, 0.0, 2.0);
        assert!(output.is_finite());
        assert_eq!(pid.integral(), integral);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut pid = PidController::new(PidGains::new(1.0, 1.0, 1.0));
        pid.update(0.0, 0.0, 5.0);
        pid.update(1.0, 1.0, 5.0);
        pid.reset();

        assert_eq!(pid.integral(), 0.0);
        assert_eq!(pid.last_error(), 0.0);
        assert_eq!(pid.update(10.0, 5.0, 5.0), 0.0);
    }

    #[test]
    fn test_closed_loop_converges_on_first_order_plant() {
        // y[k+1] = 0.9 y[k] + 0.1 u[k], unit DC gain
        let mut pid = PidController::new(PidGains::new(0.5, 0.2, 0.0));
        let setpoint = 10.0;
        let mut y = 0.0;

        for k in 0..1000 {
            let u = pid.update(k as f64, y, setpoint);
            y = 0.9 * y + 0.1 * u;
        }

        assert!((y - setpoint).abs() < 1e-6, "plant settled at {y}");
    }
}
