//! mDNS advertisement of the control surface.
//!
//! Publishes `<hostname>.local` and an `_http._tcp` service on the HTTP
//! port, so the tester is reachable as `http://batterytester.local`.
//! Uses the ESP-IDF mDNS component on device and is a no-op on host.

use log::info;

const MDNS_INSTANCE: &[u8] = b"Battery Cycler\0";
const MDNS_SERVICE_TYPE: &[u8] = b"_http\0";
const MDNS_SERVICE_PROTO: &[u8] = b"_tcp\0";

/// mDNS advertisement adapter.
pub struct MdnsAdapter {
    hostname: heapless::String<24>,
    port: u16,
    active: bool,
}

impl MdnsAdapter {
    pub fn new(hostname: heapless::String<24>, port: u16) -> Self {
        Self {
            hostname,
            port,
            active: false,
        }
    }

    /// Whether mDNS is currently advertising.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Start advertising.  Call once the link has an IP.
    pub fn start(&mut self) {
        if self.active {
            return;
        }
        if self.platform_start() {
            self.active = true;
            info!("mDNS | http://{}.local:{}", self.hostname, self.port);
        }
    }

    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.platform_stop();
        self.active = false;
        info!("mDNS | stopped");
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_start(&self) -> bool {
        use esp_idf_svc::sys::{
            ESP_OK, mdns_hostname_set, mdns_init, mdns_instance_name_set, mdns_service_add,
        };

        let mut hostname_buf = [0u8; 25];
        let hb = self.hostname.as_bytes();
        hostname_buf[..hb.len()].copy_from_slice(hb);

        // SAFETY: every pointer is a NUL-terminated buffer that outlives
        // the call; the component copies what it keeps.
        unsafe {
            let ret = mdns_init();
            if ret != ESP_OK as i32 {
                log::error!("mDNS | mdns_init failed ({})", ret);
                return false;
            }
            mdns_hostname_set(hostname_buf.as_ptr().cast());
            mdns_instance_name_set(MDNS_INSTANCE.as_ptr().cast());
            let ret = mdns_service_add(
                MDNS_INSTANCE.as_ptr().cast(),
                MDNS_SERVICE_TYPE.as_ptr().cast(),
                MDNS_SERVICE_PROTO.as_ptr().cast(),
                self.port,
                core::ptr::null_mut(),
                0,
            );
            if ret != ESP_OK as i32 {
                log::warn!("mDNS | service add failed ({})", ret);
            }
        }
        true
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&self) -> bool {
        info!(
            "mDNS(sim): {}.local {}.{}:{}",
            self.hostname,
            service_label(MDNS_SERVICE_TYPE),
            service_label(MDNS_SERVICE_PROTO),
            self.port
        );
        true
    }

    #[cfg(target_os = "espidf")]
    fn platform_stop(&self) {
        // SAFETY: only reached after a successful mdns_init.
        unsafe {
            esp_idf_svc::sys::mdns_free();
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_stop(&self) {
        info!("mDNS(sim): unregistered");
    }
}

#[cfg(not(target_os = "espidf"))]
fn service_label(raw: &[u8]) -> &str {
    core::str::from_utf8(raw.strip_suffix(b"\0").unwrap_or(raw)).unwrap_or("")
}
