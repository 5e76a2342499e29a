use std::future::Future;

use sysfs_pwm::Pwm;

use crate::error::PwmError;

///Control surface of one PWM output channel. Commands take whole microseconds, the resolution
///the rest of the system works in. Every asynchronous operation completes before the caller may
///issue the next one; `unexport` is synchronous and must be safe to call on a channel that was
///never exported.
pub trait PwmChannel {
    fn export(&mut self) -> impl Future<Output = Result<(), PwmError>> + Send;
    fn set_period_us(&mut self, usec: u64) -> impl Future<Output = Result<(), PwmError>> + Send;
    fn set_duty_cycle_us(&mut self, usec: u64)
        -> impl Future<Output = Result<(), PwmError>> + Send;
    fn set_enable(&mut self, enabled: bool) -> impl Future<Output = Result<(), PwmError>> + Send;
    fn unexport(&mut self) -> Result<(), PwmError>;
}

//The sysfs files take nanoseconds; an oversized value surfaces as an error instead of wrapping.
fn usec_to_nsec(usec: u64) -> Result<u32, PwmError> {
    usec.checked_mul(1000)
        .and_then(|nsec| u32::try_from(nsec).ok())
        .ok_or_else(|| {
            PwmError::from(format!(
                "{} usec is out of range for the sysfs pwm interface",
                usec
            ))
        })
}

///A PWM channel exposed through the Linux sysfs interface, addressed by chip and pin index.
pub struct SysfsPwmChannel {
    chip: u32,
    pin: u32,
    pwm: Pwm,
    exported: bool,
}

impl SysfsPwmChannel {
    pub fn new(chip: u32, pin: u32) -> Result<Self, PwmError> {
        let pwm = Pwm::new(chip, pin)?;
        Ok(SysfsPwmChannel {
            chip,
            pin,
            pwm,
            exported: false,
        })
    }

    pub fn chip(&self) -> u32 {
        self.chip
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }
}

impl PwmChannel for SysfsPwmChannel {
    async fn export(&mut self) -> Result<(), PwmError> {
        self.pwm.export()?;
        self.exported = true;
        Ok(())
    }

    async fn set_period_us(&mut self, usec: u64) -> Result<(), PwmError> {
        Ok(self.pwm.set_period_ns(usec_to_nsec(usec)?)?)
    }

    async fn set_duty_cycle_us(&mut self, usec: u64) -> Result<(), PwmError> {
        Ok(self.pwm.set_duty_cycle_ns(usec_to_nsec(usec)?)?)
    }

    async fn set_enable(&mut self, enabled: bool) -> Result<(), PwmError> {
        Ok(self.pwm.enable(enabled)?)
    }

    fn unexport(&mut self) -> Result<(), PwmError> {
        if !self.exported {
            return Ok(());
        }
        self.exported = false;
        Ok(self.pwm.unexport()?)
    }
}
