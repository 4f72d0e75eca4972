//! Device implementations

pub mod pisugar2;
pub mod pisugar3;
pub mod software;

use crate::config::{Config, DeviceConfig, HardwareModel};
use crate::core::driver::SampleReader;
use crate::error::{Error, Result};
use crate::transport::RegisterBus;
use pisugar2::{Chip, Pisugar2Reader};
use pisugar3::Pisugar3Reader;

/// Create a sample reader based on configuration
pub fn create_reader(config: &Config) -> Result<Box<dyn SampleReader>> {
    let chip = match config.device.model {
        HardwareModel::StandardCurve => Chip::Ip5209,
        HardwareModel::ProCurve => Chip::Ip5312,
        HardwareModel::DirectRegister => return Ok(Box::new(Pisugar3Reader::new())),
        HardwareModel::SoftwareOnly => {
            return Err(Error::NotSupported(
                "software battery has no sample reader".to_string(),
            ));
        }
    };
    let curve = config
        .curve()?
        .ok_or_else(|| Error::Config(format!("no capacity curve for {}", config.device.model)))?;
    Ok(Box::new(Pisugar2Reader::with_curve(chip, curve)))
}

/// Open the register bus for the configured device
#[cfg(feature = "i2c")]
pub fn open_bus(device: &DeviceConfig) -> Result<Box<dyn RegisterBus>> {
    let bus = crate::transport::I2cBus::open(device.i2c_bus, device.address())?;
    Ok(Box::new(bus))
}

/// Open the register bus for the configured device
#[cfg(not(feature = "i2c"))]
pub fn open_bus(device: &DeviceConfig) -> Result<Box<dyn RegisterBus>> {
    Err(Error::TransportUnavailable(format!(
        "built without the i2c feature, cannot open bus {} for {}",
        device.i2c_bus, device.model
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(model: &str, extra: &str) -> Config {
        Config::from_toml(&format!("[device]\nmodel = \"{}\"\n{}", model, extra)).unwrap()
    }

    #[test]
    fn test_reader_per_model() {
        let reader = create_reader(&config("ip5209", "")).unwrap();
        assert_eq!(reader.model(), HardwareModel::StandardCurve);
        assert!(reader.curve().is_some());

        let reader = create_reader(&config("ip5312", "")).unwrap();
        assert_eq!(reader.model(), HardwareModel::ProCurve);
        assert_eq!(reader.curve().unwrap().points()[0], (4100, 100));

        let reader = create_reader(&config("pisugar3", "")).unwrap();
        assert_eq!(reader.model(), HardwareModel::DirectRegister);
        assert!(reader.curve().is_none());

        assert!(matches!(
            create_reader(&config("software", "")),
            Err(Error::NotSupported(_))
        ));
    }

    #[test]
    fn test_custom_curve_reaches_reader() {
        let cfg = config(
            "ip5209",
            "[monitor]\nbattery_curve = [[4000, 100], [3500, 0]]\n",
        );
        let reader = create_reader(&cfg).unwrap();
        assert_eq!(reader.curve().unwrap().points(), &[(4000, 100), (3500, 0)]);
    }
}
