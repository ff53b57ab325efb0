//! WiFi bring-up: station first, access point fallback.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: [`start`] drives `esp_idf_svc::wifi`.
//! - **all other targets**: only the credential checks and the link plan
//!   exist, so they stay testable on the host.
//!
//! There is no reconnect loop.  A station that drops its link stays down
//! until reboot; the run itself never depends on the network.

use core::fmt;

use crate::config::NetConfig;

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiError {
    InvalidSsid,
    InvalidPassword,
}

impl fmt::Display for WifiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
        }
    }
}

impl core::error::Error for WifiError {}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

pub fn validate_ssid(ssid: &str) -> Result<(), WifiError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(WifiError::InvalidSsid);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), WifiError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(WifiError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Link plan
// ───────────────────────────────────────────────────────────────

/// What [`start`] will attempt for a given configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPlan {
    Disabled,
    /// Join the configured network, open the AP if that times out.
    StationThenAp,
    AccessPointOnly,
}

/// Decide the link plan.  Bad station credentials skip the station
/// attempt; bad AP credentials are an error since there is nothing left
/// to fall back to.
pub fn plan(net: &NetConfig) -> Result<LinkPlan, WifiError> {
    if !net.enabled {
        return Ok(LinkPlan::Disabled);
    }
    validate_ssid(&net.ap_ssid)?;
    validate_password(&net.ap_password)?;

    let sta_ok = validate_ssid(&net.sta_ssid).is_ok() && validate_password(&net.sta_password).is_ok();
    if sta_ok {
        Ok(LinkPlan::StationThenAp)
    } else {
        Ok(LinkPlan::AccessPointOnly)
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF driver
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use self::espidf::start;

#[cfg(target_os = "espidf")]
mod espidf {
    use anyhow::Result;
    use esp_idf_hal::delay::FreeRtos;
    use esp_idf_hal::modem::Modem;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::wifi::{
        AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration, EspWifi,
    };
    use log::{info, warn};

    use super::{LinkPlan, plan};
    use crate::adapters::time::MonotonicClock;
    use crate::config::NetConfig;
    use crate::phase::clock::elapsed_ms;

    const STA_POLL_MS: u32 = 300;

    /// Bring the link up per [`plan`].  Returns the driver, which must be
    /// kept alive for the link to stay up, or `None` when WiFi is disabled.
    pub fn start(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        net: &NetConfig,
    ) -> Result<Option<EspWifi<'static>>> {
        let link = plan(net)?;
        if link == LinkPlan::Disabled {
            info!("WIFI | disabled");
            return Ok(None);
        }

        let mut wifi = EspWifi::new(modem, sysloop, Some(nvs))?;

        if link == LinkPlan::StationThenAp {
            if join_station(&mut wifi, net)? {
                return Ok(Some(wifi));
            }
            warn!("WIFI | STA '{}' failed, falling back to AP", net.sta_ssid);
            wifi.stop()?;
        }

        open_access_point(&mut wifi, net)?;
        Ok(Some(wifi))
    }

    fn join_station(wifi: &mut EspWifi<'static>, net: &NetConfig) -> Result<bool> {
        let auth_method = if net.sta_password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: net.sta_ssid.clone(),
            password: net.sta_password.clone(),
            auth_method,
            ..Default::default()
        }))?;
        wifi.start()?;
        info!("WIFI | connecting to '{}'", net.sta_ssid);
        if let Err(e) = wifi.connect() {
            warn!("WIFI | connect request failed: {}", e);
            return Ok(false);
        }

        let clock = MonotonicClock::new();
        let t0 = clock.now_ms();
        while !wifi.is_up()? {
            if elapsed_ms(clock.now_ms(), t0) >= net.sta_timeout_ms {
                return Ok(false);
            }
            FreeRtos::delay_ms(STA_POLL_MS);
        }

        let ip = wifi.sta_netif().get_ip_info()?.ip;
        info!("WIFI | STA connected, IP {}", ip);
        Ok(true)
    }

    fn open_access_point(wifi: &mut EspWifi<'static>, net: &NetConfig) -> Result<()> {
        let auth_method = if net.ap_password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        wifi.set_configuration(&Configuration::AccessPoint(AccessPointConfiguration {
            ssid: net.ap_ssid.clone(),
            password: net.ap_password.clone(),
            channel: net.ap_channel,
            auth_method,
            ..Default::default()
        }))?;
        wifi.start()?;

        let ip = wifi.ap_netif().get_ip_info()?.ip;
        info!("WIFI | AP '{}' up, IP {}", net.ap_ssid, ip);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn net(sta_ssid: &str, sta_pass: &str) -> NetConfig {
        let mut n = NetConfig::default();
        n.sta_ssid.clear();
        n.sta_ssid.push_str(sta_ssid).unwrap();
        n.sta_password.clear();
        n.sta_password.push_str(sta_pass).unwrap();
        n
    }

    #[test]
    fn rejects_empty_ssid() {
        assert_eq!(validate_ssid(""), Err(WifiError::InvalidSsid));
    }

    #[test]
    fn rejects_control_characters() {
        assert_eq!(validate_ssid("Lab\nNet"), Err(WifiError::InvalidSsid));
    }

    #[test]
    fn rejects_short_password() {
        assert_eq!(validate_password("short"), Err(WifiError::InvalidPassword));
    }

    #[test]
    fn accepts_open_network() {
        assert!(validate_password("").is_ok());
    }

    #[test]
    fn no_station_ssid_goes_straight_to_ap() {
        assert_eq!(plan(&net("", "")), Ok(LinkPlan::AccessPointOnly));
    }

    #[test]
    fn bad_station_password_goes_straight_to_ap() {
        assert_eq!(plan(&net("LabNet", "1234")), Ok(LinkPlan::AccessPointOnly));
    }

    #[test]
    fn valid_station_tried_first() {
        assert_eq!(plan(&net("LabNet", "password1")), Ok(LinkPlan::StationThenAp));
    }

    #[test]
    fn disabled_skips_everything() {
        let mut n = net("LabNet", "password1");
        n.enabled = false;
        n.ap_ssid.clear();
        assert_eq!(plan(&n), Ok(LinkPlan::Disabled));
    }

    #[test]
    fn bad_ap_credentials_are_fatal() {
        let mut n = net("", "");
        n.ap_password.push_str("123").unwrap();
        assert_eq!(plan(&n), Err(WifiError::InvalidPassword));
    }
}
