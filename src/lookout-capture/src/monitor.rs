//! Monitor enumeration and virtual-desktop geometry

use lookout_raster::{Point, Position, Rect};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CaptureError, Result};

/// A display's placement on the virtual desktop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorGeometry {
    /// Position in this enumeration pass; not stable across passes
    pub index: usize,
    /// Device name as reported by the OS
    pub name: String,
    /// Pixel rectangle relative to the virtual desktop origin
    pub rect: Rect,
}

/// Result of resolving a virtual-desktop point to a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointLocation {
    pub index: usize,
    /// Point relative to the monitor's top-left corner
    pub local: Point,
}

/// Something that can list the attached displays
pub trait DisplaySource {
    /// Enumerate displays in the source's native order
    fn enumerate(&self) -> Result<Vec<MonitorGeometry>>;
}

impl<T: DisplaySource + ?Sized> DisplaySource for Box<T> {
    fn enumerate(&self) -> Result<Vec<MonitorGeometry>> {
        (**self).enumerate()
    }
}

impl<T: DisplaySource + ?Sized> DisplaySource for &T {
    fn enumerate(&self) -> Result<Vec<MonitorGeometry>> {
        (**self).enumerate()
    }
}

/// Displays reported by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDisplays;

impl DisplaySource for SystemDisplays {
    fn enumerate(&self) -> Result<Vec<MonitorGeometry>> {
        let monitors = enumerate_system()?;
        info!("enumerated {} monitors", monitors.len());
        Ok(monitors)
    }
}

/// Walk display devices with GDI, keeping those attached to the desktop
#[cfg(windows)]
fn enumerate_system() -> Result<Vec<MonitorGeometry>> {
    use windows::core::PCWSTR;
    use windows::Win32::Graphics::Gdi::{
        EnumDisplayDevicesW, EnumDisplaySettingsW, DEVMODEW, DISPLAY_DEVICEW,
        DISPLAY_DEVICE_ATTACHED_TO_DESKTOP, ENUM_CURRENT_SETTINGS,
    };

    let mut monitors = Vec::new();
    let mut device_index = 0u32;

    loop {
        let mut device = DISPLAY_DEVICEW {
            cb: std::mem::size_of::<DISPLAY_DEVICEW>() as u32,
            ..Default::default()
        };
        let found = unsafe { EnumDisplayDevicesW(PCWSTR::null(), device_index, &mut device, 0) };
        if !found.as_bool() {
            break;
        }
        device_index += 1;

        if device.StateFlags.0 & DISPLAY_DEVICE_ATTACHED_TO_DESKTOP.0 == 0 {
            continue;
        }

        let mut mode = DEVMODEW {
            dmSize: std::mem::size_of::<DEVMODEW>() as u16,
            ..Default::default()
        };
        let has_mode = unsafe {
            EnumDisplaySettingsW(
                PCWSTR(device.DeviceName.as_ptr()),
                ENUM_CURRENT_SETTINGS,
                &mut mode,
            )
        };
        if !has_mode.as_bool() {
            continue;
        }

        let name = String::from_utf16_lossy(
            &device.DeviceName[..device
                .DeviceName
                .iter()
                .position(|&c| c == 0)
                .unwrap_or(device.DeviceName.len())],
        );
        // dmPosition is relative to the primary display's origin
        let position = unsafe { mode.Anonymous1.Anonymous2.dmPosition };
        let rect = Rect::new(position.x, position.y, mode.dmPelsWidth, mode.dmPelsHeight);

        debug!("found monitor: {} at {}", name, rect);
        monitors.push(MonitorGeometry {
            index: monitors.len(),
            name,
            rect,
        });
    }

    Ok(monitors)
}

#[cfg(not(windows))]
fn enumerate_system() -> Result<Vec<MonitorGeometry>> {
    let enumeration = |e: xcap::XCapError| CaptureError::Enumeration(e.to_string());

    let mut monitors = Vec::new();
    for monitor in xcap::Monitor::all().map_err(enumeration)? {
        let name = monitor.name().map_err(enumeration)?;
        let rect = Rect::new(
            monitor.x().map_err(enumeration)?,
            monitor.y().map_err(enumeration)?,
            monitor.width().map_err(enumeration)?,
            monitor.height().map_err(enumeration)?,
        );
        debug!("found monitor: {} at {}", name, rect);
        monitors.push(MonitorGeometry {
            index: monitors.len(),
            name,
            rect,
        });
    }
    Ok(monitors)
}

/// A fixed monitor layout, used for configured layouts and tests
#[derive(Debug, Clone, Default)]
pub struct StaticDisplays {
    rects: Vec<Rect>,
}

impl StaticDisplays {
    pub fn new(rects: Vec<Rect>) -> Self {
        Self { rects }
    }
}

impl DisplaySource for StaticDisplays {
    fn enumerate(&self) -> Result<Vec<MonitorGeometry>> {
        Ok(self
            .rects
            .iter()
            .enumerate()
            .map(|(index, rect)| MonitorGeometry {
                index,
                name: format!("static-{}", index),
                rect: *rect,
            })
            .collect())
    }
}

/// Maps between monitor-local and virtual-desktop coordinates.
///
/// Every query re-enumerates the source; nothing is cached because displays
/// can be attached or rearranged between calls.
pub struct DisplayResolver<S = SystemDisplays> {
    source: S,
}

impl DisplayResolver<SystemDisplays> {
    pub fn system() -> Self {
        Self::new(SystemDisplays)
    }
}

impl<S: DisplaySource> DisplayResolver<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// All displays in enumeration order
    pub fn monitors(&self) -> Result<Vec<MonitorGeometry>> {
        self.source.enumerate()
    }

    pub fn display_count(&self) -> Result<usize> {
        Ok(self.monitors()?.len())
    }

    /// Virtual-desktop rectangle of display `index`
    pub fn display_rect(&self, index: usize) -> Result<Rect> {
        let monitors = self.monitors()?;
        let count = monitors.len();
        monitors
            .into_iter()
            .nth(index)
            .map(|m| m.rect)
            .ok_or(CaptureError::InvalidDisplay { index, count })
    }

    /// First monitor (in enumeration order) containing `point`.
    ///
    /// Overlapping (mirrored) monitors resolve to the earliest one. `None`
    /// when no monitor contains the point.
    pub fn locate_point(&self, point: Point) -> Result<Option<PointLocation>> {
        let location = self
            .monitors()?
            .into_iter()
            .find(|m| m.rect.contains(point))
            .map(|m| PointLocation {
                index: m.index,
                local: Point::new(point.x - m.rect.x, point.y - m.rect.y),
            });
        debug!("located {} -> {:?}", point, location);
        Ok(location)
    }

    /// Absolute virtual-desktop point for a position given relative to
    /// display `index`
    pub fn to_virtual(&self, index: usize, position: &Position) -> Result<Point> {
        let origin = self.display_rect(index)?.top_left();
        let center = position.center();
        Ok(center.offset(origin.x, origin.y))
    }
}

impl Default for DisplayResolver<SystemDisplays> {
    fn default() -> Self {
        Self::system()
    }
}
