use std::collections::HashMap;

use futures_util::future::join_all;
use pwmthing_core::error::BuildError;
use pwmthing_sysfs::channel::SysfsPwmChannel;
use pwmthing_sysfs::config::PwmOutPropertyConfig;
use pwmthing_sysfs::output::duty_cycle::PwmOutProperty;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Deserialize, Debug, Default)]
pub struct Metadata {
    pub name: Option<String>,
    pub description: Option<String>,
}

///Top level configuration: optional metadata plus one PWM output property per named entry.
#[derive(Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default)]
    pub metadata: Metadata,
    pub outputs: HashMap<String, PwmOutPropertyConfig>,
}

impl AppConfig {
    ///Build every configured output, then run until ctrl-c. Channels are released on the way
    ///out; a failed release is reported but does not abort the remaining teardown.
    pub async fn start(self) -> Result<(), BuildError> {
        let cancel_token = CancellationToken::new();

        let mut properties = Vec::with_capacity(self.outputs.len());
        for (name, cfg) in &self.outputs {
            let channel = SysfsPwmChannel::new(cfg.pwm.chip, cfg.pwm.pin)?;
            let property =
                PwmOutProperty::try_build(name, cfg, channel, cancel_token.clone()).await?;
            info!("{}: output ready", name);
            properties.push(property);
        }

        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("error waiting for the shutdown signal: {}", err);
        }
        info!("shutting down ...");
        cancel_token.cancel();

        let mut close_errs = Vec::new();
        let mut join_handles = Vec::with_capacity(properties.len());
        for mut property in properties {
            if let Err(err) = property.close().await {
                close_errs.push(BuildError::from_string(format!(
                    "{}: close failed: {:?}",
                    property.name(),
                    err
                )));
            }
            join_handles.push(property.join_handle);
        }
        join_all(join_handles).await;

        if close_errs.is_empty() {
            Ok(())
        } else {
            Err(BuildError::from_errs(close_errs))
        }
    }
}
