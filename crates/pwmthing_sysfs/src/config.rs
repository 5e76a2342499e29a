use serde::Deserialize;

fn default_maximum() -> f64 {
    100.0
}

///Hardware side of one PWM output. Values are taken as configured; a bad chip or pin index
///surfaces when the channel is opened, not here.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PwmChannelConfig {
    pub chip: u32,
    pub pin: u32,
    //seconds
    pub period: f64,
    //percent
    pub duty_cycle: f64,
}

impl Default for PwmChannelConfig {
    fn default() -> Self {
        Self {
            chip: 0,
            pin: 0,
            period: 1.0,
            duty_cycle: 0.5,
        }
    }
}

impl PwmChannelConfig {
    pub fn frequency(&self) -> f64 {
        1.0 / self.period
    }
}

///Configuration for one duty cycle property. A missing `pwm` block falls back to pin 0 of
///chip 0 with the default period and duty cycle.
#[derive(Debug, Clone, Deserialize)]
pub struct PwmOutPropertyConfig {
    #[serde(default)]
    pub pwm: PwmChannelConfig,
    #[serde(default)]
    pub minimum: f64,
    #[serde(default = "default_maximum")]
    pub maximum: f64,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_resolves_to_defaults() {
        let cfg: PwmOutPropertyConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.pwm.chip, 0);
        assert_eq!(cfg.pwm.pin, 0);
        assert_eq!(cfg.pwm.period, 1.0);
        assert_eq!(cfg.pwm.duty_cycle, 0.5);
        assert_eq!(cfg.minimum, 0.0);
        assert_eq!(cfg.maximum, 100.0);
        assert!(cfg.title.is_none());
        assert!(cfg.description.is_none());
    }

    #[test]
    fn partial_pwm_block_keeps_remaining_defaults() {
        let cfg: PwmOutPropertyConfig =
            serde_json::from_str(r#"{"pwm":{"chip":2,"period":2.0}}"#).unwrap();
        assert_eq!(cfg.pwm.chip, 2);
        assert_eq!(cfg.pwm.pin, 0);
        assert_eq!(cfg.pwm.period, 2.0);
        assert_eq!(cfg.pwm.duty_cycle, 0.5);
    }

    #[test]
    fn frequency_is_the_reciprocal_of_the_period() {
        let pwm = PwmChannelConfig {
            period: 2.0,
            ..PwmChannelConfig::default()
        };
        assert_eq!(pwm.frequency(), 0.5);
    }
}
