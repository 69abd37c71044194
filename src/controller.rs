// controller.rs

use std::sync::Arc;

use async_trait::async_trait;
use tracing::*;

use crate::*;

pub const STUB_TEMPERATURE: Kelvin = Kelvin(290.0);
pub const STUB_SETPOINT: Kelvin = Kelvin(310.0);

/// Connection to the temperature controller process.
#[async_trait]
pub trait ControllerClient: Send + Sync {
    async fn read_temperature(&self) -> anyhow::Result<Kelvin>;
    async fn read_setpoint(&self) -> anyhow::Result<Kelvin>;
    async fn write_setpoint(&self, setpoint: Kelvin) -> anyhow::Result<()>;
}

/// Placeholder until the controller speaks over the network.
#[derive(Debug, Default)]
pub struct StubController;

#[async_trait]
impl ControllerClient for StubController {
    async fn read_temperature(&self) -> anyhow::Result<Kelvin> {
        Ok(STUB_TEMPERATURE)
    }

    async fn read_setpoint(&self) -> anyhow::Result<Kelvin> {
        Ok(STUB_SETPOINT)
    }

    async fn write_setpoint(&self, setpoint: Kelvin) -> anyhow::Result<()> {
        info!("Stub controller ignoring setpoint {} K", setpoint.0);
        Ok(())
    }
}

/// Controller readings and writes expressed in the user's display unit.
#[derive(Clone)]
pub struct ControllerManager {
    client: Arc<dyn ControllerClient>,
    settings: Arc<SettingsStore>,
}

impl ControllerManager {
    pub fn new(client: Arc<dyn ControllerClient>, settings: Arc<SettingsStore>) -> Self {
        Self { client, settings }
    }

    pub async fn unit_suffix(&self) -> &'static str {
        self.settings.units().await.suffix()
    }

    pub async fn temperature(&self) -> anyhow::Result<f64> {
        let k = self.client.read_temperature().await?;
        Ok(from_kelvin(k.0, self.settings.units().await))
    }

    pub async fn setpoint(&self) -> anyhow::Result<f64> {
        let k = self.client.read_setpoint().await?;
        Ok(from_kelvin(k.0, self.settings.units().await))
    }

    /// Both readings in one go, for the pages and `/temp`.
    pub async fn readings(&self) -> anyhow::Result<TempValues> {
        let temperature = self.client.read_temperature().await?;
        let setpoint = self.client.read_setpoint().await?;
        Ok(TempValues::new(self.settings.units().await, temperature, setpoint))
    }

    /// `value` is in the current display unit.
    pub async fn put_setpoint(&self, value: f64) -> anyhow::Result<Kelvin> {
        let units = self.settings.units().await;
        let k = Kelvin(to_kelvin(value, units));
        debug!("Setpoint {value}{} -> {} K", units.suffix(), k.0);
        self.client.write_setpoint(k).await?;
        Ok(k)
    }
}


// EOF
