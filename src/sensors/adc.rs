//! ADC fallback measurement path.
//!
//! Used when no INA219 answers.  Each channel is `raw / 4095` scaled
//! linearly through [`AdcConfig`]; an unconfigured channel reads NaN.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: the composition root supplies a oneshot ADC reader.
//! On host/test: [`NoAdc`] or a test double.

use crate::config::AdcConfig;
use crate::pins::ADC_FULL_SCALE;

/// Raw access to one ADC conversion.  `None` on a failed conversion.
pub trait AdcReader {
    fn read_raw(&mut self, gpio: i32) -> Option<u16>;
}

/// Reader for boards without analog channels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAdc;

impl AdcReader for NoAdc {
    fn read_raw(&mut self, _gpio: i32) -> Option<u16> {
        None
    }
}

/// An absent reader behaves like [`NoAdc`].
impl<A: AdcReader> AdcReader for Option<A> {
    fn read_raw(&mut self, gpio: i32) -> Option<u16> {
        self.as_mut().and_then(|r| r.read_raw(gpio))
    }
}

pub struct AdcFallback<A> {
    reader: A,
    cfg: AdcConfig,
}

impl<A: AdcReader> AdcFallback<A> {
    pub fn new(reader: A, cfg: AdcConfig) -> Self {
        Self { reader, cfg }
    }

    pub fn voltage_v(&mut self) -> f32 {
        self.read_scaled(self.cfg.voltage_pin, self.cfg.voltage_scale, self.cfg.voltage_offset)
    }

    pub fn current_a(&mut self) -> f32 {
        self.read_scaled(self.cfg.current_pin, self.cfg.current_scale, self.cfg.current_offset)
    }

    fn read_scaled(&mut self, pin: Option<i32>, scale: f32, offset: f32) -> f32 {
        let Some(raw) = pin.and_then(|gpio| self.reader.read_raw(gpio)) else {
            return f32::NAN;
        };
        let x = f32::from(raw.min(ADC_FULL_SCALE)) / f32::from(ADC_FULL_SCALE);
        x * scale + offset
    }
}

// ── ESP-IDF oneshot reader ────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use self::oneshot::OneshotAdc;

#[cfg(target_os = "espidf")]
mod oneshot {
    use esp_idf_svc::sys::*;
    use log::{info, warn};

    use super::AdcReader;
    use crate::error::SensorError;

    /// ADC1 in oneshot mode, 12 dB attenuation, 12-bit.  Channels are
    /// configured lazily on first read of a GPIO.
    pub struct OneshotAdc {
        handle: adc_oneshot_unit_handle_t,
    }

    // SAFETY: the handle is only used through `&mut self`, and the adapter
    // that owns this reader sits behind the station mutex.
    unsafe impl Send for OneshotAdc {}

    impl OneshotAdc {
        pub fn new() -> Result<Self, SensorError> {
            let init_cfg = adc_oneshot_unit_init_cfg_t {
                unit_id: adc_unit_t_ADC_UNIT_1,
                ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
                ..Default::default()
            };
            let mut handle: adc_oneshot_unit_handle_t = core::ptr::null_mut();
            // SAFETY: both pointers are valid for the duration of the call.
            let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &mut handle) };
            if ret != ESP_OK as i32 {
                warn!("ADC1 init failed (rc={})", ret);
                return Err(SensorError::NotConfigured);
            }
            info!("ADC1 oneshot unit ready");
            Ok(Self { handle })
        }

        fn channel_for(&mut self, gpio: i32) -> Option<adc_channel_t> {
            let mut unit: adc_unit_t = 0;
            let mut channel: adc_channel_t = 0;
            // SAFETY: out-pointers are valid locals.
            let ret = unsafe { adc_oneshot_io_to_channel(gpio, &mut unit, &mut channel) };
            if ret != ESP_OK as i32 || unit != adc_unit_t_ADC_UNIT_1 {
                return None;
            }
            let chan_cfg = adc_oneshot_chan_cfg_t {
                atten: adc_atten_t_ADC_ATTEN_DB_12,
                bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
            };
            // SAFETY: handle was created by adc_oneshot_new_unit.
            let ret = unsafe { adc_oneshot_config_channel(self.handle, channel, &chan_cfg) };
            (ret == ESP_OK as i32).then_some(channel)
        }
    }

    impl AdcReader for OneshotAdc {
        fn read_raw(&mut self, gpio: i32) -> Option<u16> {
            let channel = self.channel_for(gpio)?;
            let mut raw: i32 = 0;
            // SAFETY: handle is live, channel configured above.
            let ret = unsafe { adc_oneshot_read(self.handle, channel, &mut raw) };
            (ret == ESP_OK as i32).then(|| raw.max(0) as u16)
        }
    }

    impl Drop for OneshotAdc {
        fn drop(&mut self) {
            // SAFETY: handle is live and not used after this.
            unsafe {
                adc_oneshot_del_unit(self.handle);
            }
        }
    }
}
