//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements              | Connects to                  |
//! |------------|-------------------------|------------------------------|
//! | `hardware` | OutputPort, MeasurePort | relays, INA219 / ADC / model |
//! | `log_sink` | EventSink               | Serial log output            |
//! | `time`     | wrapping ms clock       | ESP32 system timer           |
//! | `wifi`     | link bring-up           | ESP-IDF WiFi STA / AP        |
//! | `mdns`     | service advertisement   | ESP-IDF mDNS                 |
//! | `http`     | control surface         | ESP-IDF HTTP server          |

pub mod hardware;
#[cfg(target_os = "espidf")]
pub mod http;
pub mod log_sink;
pub mod mdns;
pub mod time;
pub mod wifi;
