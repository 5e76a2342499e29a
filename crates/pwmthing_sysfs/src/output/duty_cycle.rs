use std::sync::Arc;

use pwmthing_core::error::BuildError;
use pwmthing_core::{Property, PropertyMetadata, PropertyValue};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::channel::PwmChannel;
use crate::config::{PwmChannelConfig, PwmOutPropertyConfig};
use crate::error::PwmError;

const DUTY_CYCLE_QUEUE_SIZE: usize = 16;

///Lifecycle of the hardware channel behind a duty cycle property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Unopened,
    Opening,
    PeriodSet,
    DutyCycleSet,
    Enabled,
    Failed,
    Closed,
}

fn period_usec(period_secs: f64) -> u64 {
    (period_secs * 1_000_000.0) as u64
}

//The hardware takes whole microseconds; fractional values truncate, never round to nearest.
fn duty_cycle_usec(period_secs: f64, percent: f64) -> u64 {
    (period_secs * 1_000_000.0 * (percent / 100.0)).floor() as u64
}

///Adapts one PWM channel to a writable duty cycle property. Construction opens the channel and
///configures period, duty cycle and enable in that order; once the channel is enabled, external
///writes to the property value are forwarded to the hardware as duty cycle commands. `close`
///releases the channel.
pub struct PwmOutProperty<C: PwmChannel + Send + 'static> {
    property: Property,
    config: PwmChannelConfig,
    channel: Arc<Mutex<C>>,
    state: ChannelState,
    pub join_handle: JoinHandle<()>,
}

impl<C> PwmOutProperty<C>
where
    C: PwmChannel + Send + 'static,
{
    pub async fn try_build(
        name: &str,
        cfg: &PwmOutPropertyConfig,
        channel: C,
        cancel_token: CancellationToken,
    ) -> Result<Self, BuildError> {
        let metadata = PropertyMetadata {
            type_tag: "LevelProperty".to_string(),
            title: cfg
                .title
                .clone()
                .unwrap_or_else(|| format!("PWM: {} (duty cycle)", name)),
            description: cfg
                .description
                .clone()
                .unwrap_or_else(|| "PWM duty cycle".to_string()),
            minimum: cfg.minimum,
            maximum: cfg.maximum,
            unit: "percent".to_string(),
            read_only: false,
        };
        let value = Arc::new(PropertyValue::new(cfg.pwm.duty_cycle));

        let channel = Arc::new(Mutex::new(channel));
        let (duty_tx, duty_rx) = mpsc::channel(DUTY_CYCLE_QUEUE_SIZE);
        let join_handle =
            spawn_duty_cycle_writer(name.to_string(), channel.clone(), cancel_token, duty_rx);

        let mut property = PwmOutProperty {
            property: Property::new(name.to_string(), metadata, value),
            config: cfg.pwm.clone(),
            channel,
            state: ChannelState::Unopened,
            join_handle,
        };
        property.initialize().await?;
        property.install_forwarder(duty_tx);
        Ok(property)
    }

    //The four hardware commands are strictly ordered; each one is awaited before the next is
    //issued because drivers reject a duty cycle longer than the currently configured period.
    async fn initialize(&mut self) -> Result<(), BuildError> {
        let name = self.property.name().to_string();
        let config = self.config.clone();
        let channel = self.channel.clone();
        let mut channel = channel.lock().await;

        self.state = ChannelState::Opening;
        debug!(
            "{}: opening pwm channel (chip {} pin {})",
            name, config.chip, config.pin
        );
        if let Err(err) = channel.export().await {
            self.state = ChannelState::Failed;
            error!("{}: error opening pwm channel: {:?}", name, err);
            return Err(BuildError::from_string(format!(
                "{}: could not open pwm chip {} pin {}: {:?}",
                name, config.chip, config.pin, err
            )));
        }

        debug!("{}: frequency is {} Hz", name, config.frequency());
        let period_us = period_usec(config.period);
        let duty_us = duty_cycle_usec(config.period, config.duty_cycle);

        if let Err(err) = channel.set_period_us(period_us).await {
            return Err(self.abort_configure(&mut channel, "set period", err));
        }
        self.state = ChannelState::PeriodSet;
        if let Err(err) = channel.set_duty_cycle_us(duty_us).await {
            return Err(self.abort_configure(&mut channel, "set duty cycle", err));
        }
        self.state = ChannelState::DutyCycleSet;
        if let Err(err) = channel.set_enable(true).await {
            return Err(self.abort_configure(&mut channel, "set enable", err));
        }
        self.state = ChannelState::Enabled;
        info!("{}: enabled", name);
        Ok(())
    }

    //Configuration failures are fatal: a channel left enabled with an unknown period is worse
    //than no channel at all, so the half configured channel is released and construction aborts.
    fn abort_configure(&mut self, channel: &mut C, step: &str, err: PwmError) -> BuildError {
        self.state = ChannelState::Failed;
        let name = self.property.name();
        error!("{}: error during {}: {:?}", name, step, err);
        if let Err(unexport_err) = channel.unexport() {
            error!("{}: error releasing pwm channel: {:?}", name, unexport_err);
        }
        BuildError::from_string(format!("{}: {} failed: {:?}", name, step, err))
    }

    fn install_forwarder(&self, duty_tx: mpsc::Sender<u64>) {
        let name = self.property.name().to_string();
        let period_secs = self.config.period;
        self.property.value().set_forwarder(Box::new(move |percent| {
            let usec = duty_cycle_usec(period_secs, percent);
            if let Err(err) = duty_tx.try_send(usec) {
                warn!("{}: dropping duty cycle update: {}", name, err);
            }
        }));
    }

    pub fn name(&self) -> &str {
        self.property.name()
    }

    pub fn metadata(&self) -> &PropertyMetadata {
        self.property.metadata()
    }

    ///The observable value backing this property. Writes flow to the hardware while the channel
    ///is enabled.
    pub fn value(&self) -> Arc<PropertyValue> {
        self.property.value().clone()
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    ///Release the hardware channel. Safe to call repeatedly and safe to call on a channel that
    ///never finished opening; a failed release is reported as an error value, never a panic,
    ///and the channel still counts as closed.
    pub async fn close(&mut self) -> Result<(), PwmError> {
        debug!("{}: close", self.name());
        if self.state == ChannelState::Closed {
            return Ok(());
        }
        self.state = ChannelState::Closed;
        self.property.value().clear_forwarder();
        let res = {
            let mut channel = self.channel.lock().await;
            channel.unexport()
        };
        match res {
            Ok(()) => {
                info!("{}: closed", self.name());
                Ok(())
            }
            Err(err) => {
                error!("{}: error closing pwm channel: {:?}", self.name(), err);
                Err(err)
            }
        }
    }
}

fn spawn_duty_cycle_writer<C>(
    name: String,
    channel: Arc<Mutex<C>>,
    cancel_token: CancellationToken,
    mut duty_rx: mpsc::Receiver<u64>,
) -> JoinHandle<()>
where
    C: PwmChannel + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                next = duty_rx.recv() => match next {
                    Some(usec) => {
                        let mut channel = channel.lock().await;
                        match channel.set_duty_cycle_us(usec).await {
                            Ok(()) => debug!("{}: set duty cycle: usec={}", name, usec),
                            Err(err) => error!("{}: error setting duty cycle: {:?}", name, err),
                        }
                    }
                    None => break,
                },
            }
        }
        debug!("{}: duty cycle writer shutting down", name);
    })
}
