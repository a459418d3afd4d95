//! Gamepad subsystem bring-up.
//!
//! [`GamepadSubsystem`] is the process-wide device layer as an explicit handle: construct
//! it once at startup, ask it for controllers, drop it at exit. Failing to construct it is
//! fatal for the host.

use crate::device::Device;
use crate::error::InitError;

/// Identity of an enumerated game controller.
///
/// Fields are best-effort; unknown values remain `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControllerInfo {
    /// Bus hint such as `"usb"` or `"xinput"`.
    pub bus: Option<String>,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub product_string: Option<String>,
    pub serial_number: Option<String>,
    /// OS path. Diagnostic first, identity second.
    pub path: Option<String>,
}

/// Handle to the initialized device layer.
pub struct GamepadSubsystem {
    #[cfg(feature = "hid")]
    api: hidapi::HidApi,
    #[cfg(all(feature = "gilrs", not(target_os = "windows")))]
    pads: crate::backends::gilrs_pads::GilrsPump,
    controllers: Vec<ControllerInfo>,
}

impl GamepadSubsystem {
    /// Bring the device layer up and enumerate game controllers.
    pub fn init() -> Result<Self, InitError> {
        #[cfg(feature = "hid")]
        let api = hidapi::HidApi::new()?;
        #[cfg(feature = "hid")]
        let controllers = enumerate(&api);
        #[cfg(not(feature = "hid"))]
        let controllers = Vec::new();

        #[cfg(all(feature = "gilrs", not(target_os = "windows")))]
        let pads = crate::backends::gilrs_pads::GilrsPump::start()?;
        #[cfg(all(feature = "gilrs", not(target_os = "windows")))]
        for name in pads.connected() {
            log::info!("gamepad available: {name}");
        }

        log::info!(
            "gamepad subsystem up, {} HID controller(s) enumerated",
            controllers.len()
        );
        Ok(Self {
            #[cfg(feature = "hid")]
            api,
            #[cfg(all(feature = "gilrs", not(target_os = "windows")))]
            pads,
            controllers,
        })
    }

    /// Controllers found during [`init`](Self::init) or the last [`refresh`](Self::refresh).
    pub fn enumerated(&self) -> &[ControllerInfo] {
        &self.controllers
    }

    /// Re-enumerate HID controllers.
    pub fn refresh(&mut self) -> Result<(), InitError> {
        #[cfg(feature = "hid")]
        {
            self.api.refresh_devices()?;
            self.controllers = enumerate(&self.api);
        }
        Ok(())
    }

    /// Open every pollable controller.
    ///
    /// On Windows these are the four XInput slots. Elsewhere they are the pads gilrs
    /// reports as connected.
    pub fn controllers(&self) -> Vec<Box<dyn Device>> {
        #[allow(unused_mut)]
        let mut out: Vec<Box<dyn Device>> = Vec::new();

        #[cfg(target_os = "windows")]
        out.extend(crate::backends::windows::open_xinput_slots());

        #[cfg(all(feature = "gilrs", not(target_os = "windows")))]
        out.extend(self.pads.open_devices());

        if out.is_empty() && !self.controllers.is_empty() {
            log::warn!(
                "{} controller(s) enumerated but no pollable backend on this platform",
                self.controllers.len()
            );
        }
        out
    }
}

impl Drop for GamepadSubsystem {
    fn drop(&mut self) {
        log::debug!("gamepad subsystem shut down");
    }
}

#[cfg(feature = "hid")]
fn enumerate(api: &hidapi::HidApi) -> Vec<ControllerInfo> {
    api.device_list()
        .filter(|info| is_game_controller(info))
        .map(controller_info)
        .collect()
}

/// Accept Generic Desktop joysticks (0x04) and gamepads (0x05).
///
/// XInput HID-compat endpoints (`IG_` in the path) are skipped, XInput reports those.
#[cfg(feature = "hid")]
fn is_game_controller(info: &hidapi::DeviceInfo) -> bool {
    if info.usage_page() != 0x01 || !matches!(info.usage(), 0x04 | 0x05) {
        return false;
    }
    !info.path().to_string_lossy().contains("IG_")
}

#[cfg(feature = "hid")]
fn controller_info(info: &hidapi::DeviceInfo) -> ControllerInfo {
    ControllerInfo {
        bus: Some("usb".into()),
        vid: Some(info.vendor_id()),
        pid: Some(info.product_id()),
        product_string: info.product_string().map(|s| s.to_string()),
        serial_number: info.serial_number().map(|s| s.to_string()),
        path: Some(info.path().to_string_lossy().to_string()),
    }
}
